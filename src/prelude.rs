/*!
Re-export of common values and datatypes used for building chains and
computing strategies. Must be imported manually.

```
use forking_game::prelude::*;
```
*/

use crate::{block, blockchain, miner, search, solver, strategy, verify};

pub use block::Block;

pub use blockchain::{Blockchain, ChainError};

pub use miner::{Miner, MinerId, MinerType, TypeCounts};

pub use search::{optimal_strategies, SearchError};

pub use solver::{
    equilibrium_strategies, payoff_matrix, PayoffMatrix, SolverError,
};

pub use strategy::{
    conservative_strategy, decision_relevant_payoff,
    longest_chain_strategies, naive_strategies, strategies,
};

pub use verify::{Counterexample, VerifyError};

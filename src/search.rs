//! Multi-stage lookahead search for a single miner's best target.
//!
//! [optimal_strategies] evaluates every currently childless block as a
//! mining target for one distinguished miner, looking several stages into
//! the future. Intermediate stages assume the miner keeps winning (a
//! losing stage makes the choice inconsequential, so only the winning
//! branch carries decision weight), while the final stage is closed out
//! exactly: every opponent plays its own oracle and the stage winner is
//! drawn uniformly.
//!
//! The always-winning assumption is known to create spurious ties between
//! branches of different length; the chain-length post-filter below
//! removes those, but it is a partial correction, not an optimality
//! proof.

use thiserror::Error;

use crate::{
    blockchain::{Blockchain, ChainError},
    miner::MinerId,
    strategy,
};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(
        "lookahead requires at least 2 remaining stages, got {stages}; \
         with one stage left, query the naive oracle directly"
    )]
    TooFewStages { stages: usize },
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Finds every childless block at which `miner` can mine to maximize its
/// expected payoff at the end of stage `extended_horizon`, assuming all
/// other miners follow their assigned strategies and each stage's winner
/// is drawn uniformly. The returned heights all carry the same expected
/// payoff; the miner is indifferent between them.
pub fn optimal_strategies(
    chain: &Blockchain,
    miner: MinerId,
    extended_horizon: usize,
) -> Result<Vec<usize>, SearchError> {
    let stages = extended_horizon.saturating_sub(chain.horizon());
    if stages < 2 {
        return Err(SearchError::TooFewStages { stages });
    }

    // Mining behind the frontier only deepens a fork, which can never beat
    // extending a leaf; childless blocks are the only candidates.
    let mut scored = Vec::new();
    for target in chain.leaves() {
        scored.push((target, assume_win(chain, miner, target, stages)?));
    }

    let best = scored
        .iter()
        .map(|&(_, payoff)| payoff)
        .fold(f64::NEG_INFINITY, f64::max);
    let tied = scored
        .into_iter()
        .filter(|&(_, payoff)| payoff == best)
        .map(|(target, _)| target)
        .collect();

    Ok(retain_longest(chain, tied))
}

/// Expected payoff of mining at `target` with `stages_left` stages to go,
/// under the assumption that `miner` wins every stage except the last.
fn assume_win(
    chain: &Blockchain,
    miner: MinerId,
    target: usize,
    stages_left: usize,
) -> Result<f64, SearchError> {
    let stages_left = stages_left - 1;
    let extended = chain.extend(miner, target)?;

    if stages_left > 1 {
        let mut best = f64::NEG_INFINITY;
        for next in extended.leaves() {
            best = best.max(assume_win(&extended, miner, next, stages_left)?);
        }

        Ok(best)
    } else {
        final_stage_value(&extended, miner)
    }
}

/// Exact closure of the last stage: each miner wins with probability
/// `1/n` and, on winning, picks uniformly among its oracle's candidate
/// targets. The distinguished miner plays the naive oracle here
/// regardless of its assigned type, since myopia is exact when no stage
/// follows.
fn final_stage_value(
    chain: &Blockchain,
    miner: MinerId,
) -> Result<f64, SearchError> {
    let n = chain.num_miners() as f64;

    let mut value = 0.0;
    for m in chain.miners() {
        let targets = if m.id == miner {
            strategy::naive_strategies(chain, m.id, chain.horizon())
        } else {
            strategy::strategies(chain, m)
        };

        let prob = (1.0 / n) * (1.0 / targets.len() as f64);
        for &target in &targets {
            let end_state = chain.extend(m.id, target)?;
            value += prob * end_state.expected_payoff(miner);
        }
    }

    Ok(value)
}

/// Among payoff-tied candidates, keeps only those whose current chain is
/// already of maximal length. The shorter chains in such a tie owe their
/// score entirely to the always-winning assumption.
fn retain_longest(chain: &Blockchain, candidates: Vec<usize>) -> Vec<usize> {
    let max_length = candidates
        .iter()
        .map(|&t| chain.chain_length(t))
        .max()
        .unwrap_or(0);

    candidates
        .into_iter()
        .filter(|&t| chain.chain_length(t) == max_length)
        .collect()
}

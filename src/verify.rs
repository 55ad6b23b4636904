//! Exhaustive verification of conjectured equilibrium properties.
//!
//! For small horizons, every combinatorially legal base chain can be
//! enumerated and the solver driven over each, checking a conjecture
//! against all equilibrium continuations. Each check stops at the first
//! violation it finds and reports the base chain it occurred under; a
//! clean sweep returns `None`.
//!
//! Only the first stage winner is pinned to miner 0 when enumerating
//! winner sequences: relabeling the two players maps any other game onto
//! an enumerated one, as long as the property itself is checked for both
//! players.

#[cfg(feature = "rayon")]
use rayon::prelude::*;
use thiserror::Error;

use crate::{
    blockchain::{Blockchain, ChainError},
    miner::{MinerId, TypeCounts},
    solver::{self, SolverError},
};

/// A base chain under which a conjectured property failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counterexample {
    pub parents: Vec<usize>,
    pub winners: Vec<usize>,
}

impl Counterexample {
    fn of(chain: &Blockchain) -> Self {
        Counterexample {
            parents: chain.parents(),
            winners: chain.winners().iter().map(|w| w.0).collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Every parent array describing a legal chain of `stages` mined blocks:
/// the block of stage `t + 1` may point to any height in `0..=t`. There
/// are `stages!` such arrays.
pub fn legal_parent_arrays(stages: usize) -> Vec<Vec<usize>> {
    let count: usize = (1..=stages).product();

    (0..count)
        .map(|mut k| {
            let mut parents = vec![0; stages];
            for (t, parent) in parents.iter_mut().enumerate() {
                let radix = t + 1;
                *parent = k % radix;
                k /= radix;
            }
            parents
        })
        .collect()
}

/// Every winner sequence of length `stages` over `num_miners` miners in
/// which miner 0 wins the first stage.
pub fn winner_arrays(stages: usize, num_miners: usize) -> Vec<Vec<usize>> {
    if stages == 0 {
        return vec![vec![]];
    }

    let count = num_miners.pow(stages as u32 - 1);
    (0..count)
        .map(|mut k| {
            let mut winners = vec![0; stages];
            for winner in winners.iter_mut().skip(1) {
                *winner = k % num_miners;
                k /= num_miners;
            }
            winners
        })
        .collect()
}

/// Checks that equilibrium play never moves a miner onto a strictly
/// shorter branch than the one it mined on a stage earlier, over every
/// legal two-player base chain of a `horizon`-stage game.
pub fn check_shorter_branch_switch(
    horizon: usize,
) -> Result<Option<Counterexample>, VerifyError> {
    let counts = TypeCounts::all_naive(2);

    for stages in 1..horizon.saturating_sub(1) {
        let parent_sets = legal_parent_arrays(stages);
        let winner_sets = winner_arrays(stages, 2);

        let found = first_violation(&parent_sets, |parents| {
            for winners in &winner_sets {
                let base = Blockchain::new(counts, parents, winners)?;
                let equilibria =
                    solver::payoff_matrix(&base, horizon)?.equilibria();

                for (r, c) in equilibria {
                    let lengths = [base.chain_length(r), base.chain_length(c)];

                    for (winner, target) in [(MinerId(0), r), (MinerId(1), c)]
                    {
                        let extended = base.extend(winner, target)?;
                        let next = solver::payoff_matrix(&extended, horizon)?
                            .equilibria();

                        for (r_next, c_next) in next {
                            if extended.chain_length(r_next) < lengths[0]
                                || extended.chain_length(c_next) < lengths[1]
                            {
                                return Ok(Some(Counterexample::of(&base)));
                            }
                        }
                    }
                }
            }

            Ok(None)
        })?;

        if found.is_some() {
            return Ok(found);
        }
    }

    Ok(None)
}

/// Checks that a miner never leaves the branch carrying its first won
/// block. Base chains are every legal history in which only miner 0 has
/// won; the descent then follows every equilibrium path after miner 1
/// wins its first block and watches miner 1's targets.
pub fn check_first_win_branch(
    horizon: usize,
) -> Result<Option<Counterexample>, VerifyError> {
    let counts = TypeCounts::all_naive(2);

    for stages in 1..horizon.saturating_sub(1) {
        let winners = vec![0; stages];

        let found = first_violation(&legal_parent_arrays(stages), |parents| {
            let base = Blockchain::new(counts, parents, &winners)?;
            let equilibria =
                solver::payoff_matrix(&base, horizon)?.equilibria();

            for (_, c) in equilibria {
                let first_win = base.horizon() + 1;
                if abandons_first_win(&base, horizon, MinerId(1), c, first_win)?
                {
                    return Ok(Some(Counterexample::of(&base)));
                }
            }

            Ok(None)
        })?;

        if found.is_some() {
            return Ok(found);
        }
    }

    Ok(None)
}

fn abandons_first_win(
    chain: &Blockchain,
    horizon: usize,
    winner: MinerId,
    target: usize,
    first_win: usize,
) -> Result<bool, VerifyError> {
    let extended = chain.extend(winner, target)?;
    if extended.horizon() == horizon {
        return Ok(false);
    }

    let equilibria = solver::payoff_matrix(&extended, horizon)?.equilibria();
    for (r, c) in equilibria {
        if !extended.on_same_branch(first_win, c) {
            return Ok(true);
        }
        if abandons_first_win(&extended, horizon, MinerId(0), r, first_win)? {
            return Ok(true);
        }
        if abandons_first_win(&extended, horizon, MinerId(1), c, first_win)? {
            return Ok(true);
        }
    }

    Ok(false)
}

/// Checks that no equilibrium has a miner repeat a target height that has
/// just received a child block, over every legal two-player base chain of
/// a `horizon`-stage game.
pub fn check_monotonicity(
    horizon: usize,
) -> Result<Option<Counterexample>, VerifyError> {
    let counts = TypeCounts::all_naive(2);

    for stages in 1..horizon.saturating_sub(1) {
        let parent_sets = legal_parent_arrays(stages);
        let winner_sets = winner_arrays(stages, 2);

        let found = first_violation(&parent_sets, |parents| {
            for winners in &winner_sets {
                let base = Blockchain::new(counts, parents, winners)?;
                let equilibria =
                    solver::payoff_matrix(&base, horizon)?.equilibria();

                for (r, c) in equilibria {
                    for (winner, target) in [(MinerId(0), r), (MinerId(1), c)]
                    {
                        let extended = base.extend(winner, target)?;
                        let occupied =
                            extended[extended.horizon()].parent.unwrap();
                        let next = solver::payoff_matrix(&extended, horizon)?
                            .equilibria();

                        for (r_next, c_next) in next {
                            let repeats = (r_next == r && r_next == occupied)
                                || (c_next == c && c_next == occupied);
                            if repeats {
                                return Ok(Some(Counterexample::of(&base)));
                            }
                        }
                    }
                }
            }

            Ok(None)
        })?;

        if found.is_some() {
            return Ok(found);
        }
    }

    Ok(None)
}

/// Checks that every on-path subgame of the two-player game starting from
/// the single-block base chain has exactly one pure equilibrium, following
/// equilibrium play for either stage winner up to the final stage.
///
/// ## Panics
/// Panics if `horizon <= 2`; shorter games have no on-path stage beyond
/// the base chain.
pub fn check_on_path_uniqueness(
    horizon: usize,
) -> Result<Option<Counterexample>, VerifyError> {
    assert!(
        horizon > 2,
        "on-path uniqueness needs a horizon beyond the base chain"
    );

    // W.l.o.g. miner 0 wins the first stage.
    let base = Blockchain::new(TypeCounts::all_naive(2), &[0], &[0])?;

    unique_along_path(&base, horizon)
}

fn unique_along_path(
    chain: &Blockchain,
    horizon: usize,
) -> Result<Option<Counterexample>, VerifyError> {
    let equilibria = solver::payoff_matrix(chain, horizon)?.equilibria();
    if equilibria.len() != 1 {
        return Ok(Some(Counterexample::of(chain)));
    }
    if chain.horizon() + 1 == horizon {
        return Ok(None);
    }

    let (r, c) = equilibria[0];
    for (winner, target) in [(MinerId(0), r), (MinerId(1), c)] {
        let extended = chain.extend(winner, target)?;
        if let Some(found) = unique_along_path(&extended, horizon)? {
            return Ok(Some(found));
        }
    }

    Ok(None)
}

/// Runs `check` over `items`, returning the first counterexample or error
/// in item order. With the `rayon` feature the sweep runs in parallel;
/// `find_map_first` keeps the reported result identical to the sequential
/// one.
fn first_violation<T, F>(
    items: &[T],
    check: F,
) -> Result<Option<Counterexample>, VerifyError>
where
    T: Sync,
    F: Fn(&T) -> Result<Option<Counterexample>, VerifyError> + Sync,
{
    let flip = |result: Result<Option<Counterexample>, VerifyError>| {
        match result {
            Ok(None) => None,
            Ok(Some(found)) => Some(Ok(found)),
            Err(e) => Some(Err(e)),
        }
    };

    #[cfg(feature = "rayon")]
    let found = items.par_iter().find_map_first(|item| flip(check(item)));
    #[cfg(not(feature = "rayon"))]
    let found = items.iter().find_map(|item| flip(check(item)));

    found.transpose()
}

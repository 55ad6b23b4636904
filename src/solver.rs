//! Backward-induction solver for the two-player simultaneous-move game.
//!
//! At every stage both players pick a target height at the same time, a
//! fair coin decides who wins the stage, and the winner's block is
//! appended. [payoff_matrix] computes the expected-payoff matrix of this
//! game by recursing to the terminal stage and folding continuation
//! subgames back through their pure-strategy Nash equilibria.

use std::fmt::Display;

use thiserror::Error;

use crate::{
    blockchain::{Blockchain, ChainError},
    miner::MinerId,
};

/// Expected-payoff matrix of a subgame. Rows are the first player's
/// candidate targets, columns the second player's; both range over every
/// height of the chain the subgame starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct PayoffMatrix {
    dim: usize,
    /// Row-major `[player 0, player 1]` payoff pairs.
    cells: Vec<[f64; 2]>,
}

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("the subgame solver supports exactly 2 miners, got {0}")]
    TwoPlayersRequired(usize),
    #[error(
        "target horizon {target} leaves no stage to play from horizon {horizon}"
    )]
    HorizonTooSmall { target: usize, horizon: usize },
    #[error(
        "continuation subgame at horizon {horizon} has no pure-strategy Nash equilibrium"
    )]
    NoPureEquilibrium { horizon: usize },
    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl PayoffMatrix {
    fn zeros(dim: usize) -> Self {
        PayoffMatrix { dim, cells: vec![[0.0; 2]; dim * dim] }
    }

    /// Number of candidate targets per player.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The `[player 0, player 1]` expected payoffs when player 0 mines at
    /// `r` and player 1 mines at `c`.
    #[inline]
    pub fn get(&self, r: usize, c: usize) -> [f64; 2] {
        self.cells[r * self.dim + c]
    }

    #[inline]
    fn set(&mut self, r: usize, c: usize, value: [f64; 2]) {
        self.cells[r * self.dim + c] = value;
    }

    /// All pure-strategy Nash equilibria of this matrix, in row-major
    /// order. A cell is an equilibrium iff its row maximizes player 0's
    /// payoff within its column and its column maximizes player 1's payoff
    /// within its row.
    pub fn equilibria(&self) -> Vec<(usize, usize)> {
        let dim = self.dim;

        // best0[c] marks the rows that are best responses in column c;
        // best1[r] marks the columns that are best responses in row r.
        let mut best0 = vec![vec![false; dim]; dim];
        let mut best1 = vec![vec![false; dim]; dim];
        for i in 0..dim {
            let col_max = (0..dim)
                .map(|r| self.get(r, i)[0])
                .fold(f64::NEG_INFINITY, f64::max);
            for r in 0..dim {
                best0[i][r] = self.get(r, i)[0] == col_max;
            }

            let row_max = (0..dim)
                .map(|c| self.get(i, c)[1])
                .fold(f64::NEG_INFINITY, f64::max);
            for c in 0..dim {
                best1[i][c] = self.get(i, c)[1] == row_max;
            }
        }

        let mut equilibria = vec![];
        for r in 0..dim {
            for c in 0..dim {
                if best0[c][r] && best1[r][c] {
                    equilibria.push((r, c));
                }
            }
        }

        equilibria
    }
}

impl Display for PayoffMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for r in 0..self.dim {
            for c in 0..self.dim {
                let [p0, p1] = self.get(r, c);
                write!(f, "({:.4}, {:.4})", p0, p1)?;
                if c != self.dim - 1 {
                    write!(f, " ")?;
                }
            }
            if r != self.dim - 1 {
                writeln!(f)?;
            }
        }

        Ok(())
    }
}

/// Computes the payoff matrix of the subgame starting at `chain` and
/// ending after stage `target_horizon`, by backward induction.
///
/// Continuation subgames are folded back as the uniform average over all
/// of their pure equilibria; a continuation without any is reported as
/// [SolverError::NoPureEquilibrium] rather than averaged over nothing.
pub fn payoff_matrix(
    chain: &Blockchain,
    target_horizon: usize,
) -> Result<PayoffMatrix, SolverError> {
    if chain.num_miners() != 2 {
        return Err(SolverError::TwoPlayersRequired(chain.num_miners()));
    }
    if target_horizon <= chain.horizon() {
        return Err(SolverError::HorizonTooSmall {
            target: target_horizon,
            horizon: chain.horizon(),
        });
    }

    induce(chain, target_horizon)
}

/// Equilibrium target pairs of the game starting at `chain` and ending
/// after stage `target_horizon`. The root matrix itself may have no pure
/// equilibrium, in which case the returned set is empty; only
/// continuation subgames make that condition an error.
pub fn equilibrium_strategies(
    chain: &Blockchain,
    target_horizon: usize,
) -> Result<Vec<(usize, usize)>, SolverError> {
    Ok(payoff_matrix(chain, target_horizon)?.equilibria())
}

fn induce(
    chain: &Blockchain,
    target_horizon: usize,
) -> Result<PayoffMatrix, SolverError> {
    let dim = chain.horizon() + 1;

    if target_horizon == dim {
        return final_matrix(chain);
    }

    // Continuation values depend on one move only: player 0's extension on
    // the row target, player 1's on the column target.
    let mut row_values = Vec::with_capacity(dim);
    let mut col_values = Vec::with_capacity(dim);
    for t in 0..dim {
        row_values
            .push(continuation_value(chain, MinerId(0), t, target_horizon)?);
        col_values
            .push(continuation_value(chain, MinerId(1), t, target_horizon)?);
    }

    let mut matrix = PayoffMatrix::zeros(dim);
    for r in 0..dim {
        for c in 0..dim {
            let value = [
                0.5 * (row_values[r][0] + col_values[c][0]),
                0.5 * (row_values[r][1] + col_values[c][1]),
            ];
            matrix.set(r, c, value);
        }
    }

    Ok(matrix)
}

/// Solves the subgame reached when `winner` mines at `target`, and returns
/// its value as the uniform average over all of its pure equilibria.
fn continuation_value(
    chain: &Blockchain,
    winner: MinerId,
    target: usize,
    target_horizon: usize,
) -> Result<[f64; 2], SolverError> {
    let extended = chain.extend(winner, target)?;
    let matrix = induce(&extended, target_horizon)?;

    let equilibria = matrix.equilibria();
    if equilibria.is_empty() {
        return Err(SolverError::NoPureEquilibrium {
            horizon: extended.horizon(),
        });
    }

    let mut sum = [0.0; 2];
    for &(r, c) in &equilibria {
        let cell = matrix.get(r, c);
        sum[0] += cell[0];
        sum[1] += cell[1];
    }

    let count = equilibria.len() as f64;
    Ok([sum[0] / count, sum[1] / count])
}

/// Terminal-stage matrix: one block remains, and each cell is the fair
/// average of the two one-step extensions (row player wins / column player
/// wins), valued by the expected payoff over the resulting longest chains.
fn final_matrix(chain: &Blockchain) -> Result<PayoffMatrix, SolverError> {
    let dim = chain.horizon() + 1;

    let mut row_values = Vec::with_capacity(dim);
    let mut col_values = Vec::with_capacity(dim);
    for t in 0..dim {
        let ext0 = chain.extend(MinerId(0), t)?;
        row_values.push([
            ext0.expected_payoff(MinerId(0)),
            ext0.expected_payoff(MinerId(1)),
        ]);

        let ext1 = chain.extend(MinerId(1), t)?;
        col_values.push([
            ext1.expected_payoff(MinerId(0)),
            ext1.expected_payoff(MinerId(1)),
        ]);
    }

    let mut matrix = PayoffMatrix::zeros(dim);
    for r in 0..dim {
        for c in 0..dim {
            let value = [
                0.5 * (row_values[r][0] + col_values[c][0]),
                0.5 * (row_values[r][1] + col_values[c][1]),
            ];
            matrix.set(r, c, value);
        }
    }

    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::{
        equilibrium_strategies, payoff_matrix, PayoffMatrix, SolverError,
    };
    use crate::{blockchain::Blockchain, miner::TypeCounts};

    fn base_chain() -> Blockchain {
        Blockchain::new(TypeCounts::all_naive(2), &[0], &[0]).unwrap()
    }

    #[test]
    fn requires_two_players() {
        let chain =
            Blockchain::new(TypeCounts::all_naive(3), &[0], &[0]).unwrap();

        assert!(matches!(
            payoff_matrix(&chain, 3),
            Err(SolverError::TwoPlayersRequired(3))
        ));
    }

    #[test]
    fn requires_a_stage_to_play() {
        let chain = base_chain();

        assert!(matches!(
            payoff_matrix(&chain, 1),
            Err(SolverError::HorizonTooSmall { target: 1, horizon: 1 })
        ));
    }

    #[test]
    fn final_stage_matrix_values() {
        // One stage left after a single block won by miner 0. Extending
        // the tip dominates for both players.
        let matrix = payoff_matrix(&base_chain(), 2).unwrap();

        assert_eq!(matrix.dim(), 2);
        assert_eq!(matrix.get(0, 0), [0.75, 0.25]);
        assert_eq!(matrix.get(0, 1), [1.0, 0.5]);
        assert_eq!(matrix.get(1, 0), [1.25, 0.25]);
        assert_eq!(matrix.get(1, 1), [1.5, 0.5]);
        assert_eq!(matrix.equilibria(), vec![(1, 1)]);
    }

    #[test]
    fn two_stage_induction_values() {
        // Two stages left: the equilibrium still extends the tip, and the
        // root value folds the continuation equilibria back at even odds.
        let matrix = payoff_matrix(&base_chain(), 3).unwrap();

        assert_eq!(matrix.dim(), 2);
        assert_eq!(matrix.get(1, 1), [2.0, 1.0]);
        assert_eq!(equilibrium_strategies(&base_chain(), 3).unwrap(), vec![(1, 1)]);
    }

    #[test]
    fn equilibria_are_mutual_best_responses() {
        let chain = Blockchain::new(
            TypeCounts::all_naive(2),
            &[0, 0],
            &[0, 1],
        )
        .unwrap();
        let matrix = payoff_matrix(&chain, 4).unwrap();
        let equilibria = matrix.equilibria();

        assert!(!equilibria.is_empty());
        for (r, c) in equilibria {
            let cell = matrix.get(r, c);
            for other in 0..matrix.dim() {
                assert!(matrix.get(other, c)[0] <= cell[0]);
                assert!(matrix.get(r, other)[1] <= cell[1]);
            }
        }
    }

    #[test]
    fn no_equilibrium_matrix_yields_empty_set() {
        // Matching pennies has no pure-strategy equilibrium.
        let matrix = PayoffMatrix {
            dim: 2,
            cells: vec![[1.0, 0.0], [0.0, 1.0], [0.0, 1.0], [1.0, 0.0]],
        };

        assert!(matrix.equilibria().is_empty());
    }
}

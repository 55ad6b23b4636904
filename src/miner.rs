//! Definitions for representations of blockchain miners.

use std::fmt::Display;

/// A unique identifier assigned to each [Miner]. Miner indices run from 0 to
/// one less than the number of miners in the game.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct MinerId(pub usize);

impl From<usize> for MinerId {
    fn from(value: usize) -> Self {
        MinerId(value)
    }
}

impl Display for MinerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The mining strategy a [Miner] follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinerType {
    /// Always extends the canonical branch, ignoring any forks that win
    /// out later.
    Conservative,
    /// Extends a longest chain, preferring the tip under which it has won
    /// the most blocks.
    LongestChain,
    /// Maximizes the decision-relevant payoff as if the game ended after
    /// the current stage.
    Naive,
}

/// A participant in the mining game. The record of won stages is derived
/// from the chain's winners sequence at construction and is never updated
/// independently of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Miner {
    pub id: MinerId,
    pub strategy: MinerType,
    /// `wins[t]` is true iff this miner won stage `t + 1` (mined the block
    /// at height `t + 1`).
    wins: Vec<bool>,
}

impl Miner {
    pub fn new(id: MinerId, strategy: MinerType, winners: &[MinerId]) -> Self {
        let wins = winners.iter().map(|&w| w == id).collect();

        Miner { id, strategy, wins }
    }

    /// Returns true iff this miner won the 1-based stage `stage`.
    #[inline]
    pub fn won(&self, stage: usize) -> bool {
        stage >= 1 && self.wins.get(stage - 1).copied().unwrap_or(false)
    }

    /// The 1-based stages this miner won, in ascending order.
    pub fn won_stages(&self) -> Vec<usize> {
        self.wins
            .iter()
            .enumerate()
            .filter(|(_, &won)| won)
            .map(|(t, _)| t + 1)
            .collect()
    }
}

impl Display for Miner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let strategy = match self.strategy {
            MinerType::Conservative => "conservative",
            MinerType::LongestChain => "longestchain",
            MinerType::Naive => "naive",
        };

        write!(
            f,
            "miner {} ({}), wins rounds {:?}",
            self.id,
            strategy,
            self.won_stages()
        )
    }
}

/// Number of miners of each [MinerType] taking part in a game. Miner
/// indices are assigned in declaration order: all conservative miners
/// first, then all longest-chain miners, then all naive miners.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TypeCounts {
    pub conservative: usize,
    pub longest_chain: usize,
    pub naive: usize,
}

impl TypeCounts {
    pub fn new(conservative: usize, longest_chain: usize, naive: usize) -> Self {
        TypeCounts { conservative, longest_chain, naive }
    }

    /// A lineup of `n` naive miners. Useful for solver games, where both
    /// players are strategic and the assigned type never gets consulted.
    pub fn all_naive(n: usize) -> Self {
        TypeCounts { conservative: 0, longest_chain: 0, naive: n }
    }

    /// Total number of miners described by these counts.
    #[inline]
    pub fn total(&self) -> usize {
        self.conservative + self.longest_chain + self.naive
    }

    /// The strategy assigned to each miner index, in order.
    pub fn assignments(&self) -> impl Iterator<Item = MinerType> {
        use std::iter::repeat;

        repeat(MinerType::Conservative)
            .take(self.conservative)
            .chain(repeat(MinerType::LongestChain).take(self.longest_chain))
            .chain(repeat(MinerType::Naive).take(self.naive))
    }
}

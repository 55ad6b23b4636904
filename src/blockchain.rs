use std::{cmp::Ordering, fmt::Display, ops::Index};

use rand::{rngs::StdRng, SeedableRng};
use thiserror::Error;

use crate::{
    block::Block,
    draw,
    miner::{Miner, MinerId, MinerType, TypeCounts},
};

/// Representation of the full block history of a finite-horizon mining
/// game: a tree of `horizon + 1` [Blocks](Block) indexed by height, the
/// sequence of stage winners, and the set of [Miners](Miner) playing.
///
/// A `Blockchain` is immutable once built. [Blockchain::extend] and
/// [Blockchain::shorten] return new instances and leave the source
/// untouched, so hypothetical futures built during game-tree evaluation
/// can never corrupt the state they branched from.
#[derive(Debug, Clone)]
pub struct Blockchain {
    /// Number of stages played so far.
    horizon: usize,
    /// All blocks, indexed by height. `blocks[0]` is the genesis block.
    blocks: Vec<Block>,
    /// Miners playing on this chain, indexed by [MinerId].
    miners: Vec<Miner>,
    /// `winners[t]` is the miner that won stage `t + 1`.
    winners: Vec<MinerId>,
    /// All maximal-length genesis-to-leaf paths at the stored horizon.
    longest_chains: Vec<Vec<usize>>,
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("miner type counts sum to {counts}, not the miner count {miners}")]
    MinerCountMismatch { counts: usize, miners: usize },
    #[error("{parents} parent entries given for {winners} winner entries")]
    LengthMismatch { parents: usize, winners: usize },
    #[error("block {height} lists parent {parent}, which is not below it")]
    ParentAboveBlock { height: usize, parent: usize },
    #[error("block {height} lists winner {winner}, but there are only {miners} miners")]
    WinnerOutOfRange { height: usize, winner: usize, miners: usize },
    #[error("cannot append at height {target} on a chain of horizon {horizon}")]
    TargetBeyondHorizon { target: usize, horizon: usize },
    #[error("cannot shorten a chain containing only the genesis block")]
    ShortenedGenesis,
}

impl Blockchain {
    /// Creates a chain from an explicit history. `parents[t]` is the parent
    /// height of the block mined in stage `t + 1`, and `winners[t]` the
    /// index of the miner that won that stage. Fails fast on a malformed
    /// specification; nothing is silently corrected.
    pub fn new(
        counts: TypeCounts,
        parents: &[usize],
        winners: &[usize],
    ) -> Result<Self, ChainError> {
        use ChainError::*;

        if parents.len() != winners.len() {
            return Err(LengthMismatch {
                parents: parents.len(),
                winners: winners.len(),
            });
        }

        let num_miners = counts.total();
        let mut blocks = vec![Block::genesis()];
        for (t, (&parent, &winner)) in parents.iter().zip(winners).enumerate() {
            let height = t + 1;
            if parent > t {
                return Err(ParentAboveBlock { height, parent });
            }
            if winner >= num_miners {
                return Err(WinnerOutOfRange {
                    height,
                    winner,
                    miners: num_miners,
                });
            }
            blocks.push(Block::new(height, parent, MinerId(winner)));
        }

        let winners = winners.iter().map(|&w| MinerId(w)).collect();
        Ok(Self::assemble(counts.assignments(), blocks, winners))
    }

    /// Creates a chain of the given horizon with randomly drawn winners and
    /// parents. Replaying the same seed reproduces the same chain.
    pub fn random(
        horizon: usize,
        num_miners: usize,
        counts: TypeCounts,
        seed: u64,
    ) -> Result<Self, ChainError> {
        if counts.total() != num_miners {
            return Err(ChainError::MinerCountMismatch {
                counts: counts.total(),
                miners: num_miners,
            });
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let winners = draw::winners(&mut rng, horizon, num_miners);
        let parents = draw::parents(&mut rng, horizon);

        Self::new(counts, &parents, &winners)
    }

    /// Builds a new chain with one block appended atop `target`, won by
    /// `winner`. The source chain is not modified.
    pub fn extend(
        &self,
        winner: MinerId,
        target: usize,
    ) -> Result<Self, ChainError> {
        if target > self.horizon {
            return Err(ChainError::TargetBeyondHorizon {
                target,
                horizon: self.horizon,
            });
        }
        if winner.0 >= self.miners.len() {
            return Err(ChainError::WinnerOutOfRange {
                height: self.horizon + 1,
                winner: winner.0,
                miners: self.miners.len(),
            });
        }

        let mut blocks = self.blocks.clone();
        blocks.push(Block::new(self.horizon + 1, target, winner));
        let mut winners = self.winners.clone();
        winners.push(winner);

        let types: Vec<_> = self.miners.iter().map(|m| m.strategy).collect();
        Ok(Self::assemble(types, blocks, winners))
    }

    /// Builds a new chain with the most recent block dropped.
    pub fn shorten(&self) -> Result<Self, ChainError> {
        if self.horizon == 0 {
            return Err(ChainError::ShortenedGenesis);
        }

        let mut blocks = self.blocks.clone();
        blocks.pop();
        let mut winners = self.winners.clone();
        winners.pop();

        let types: Vec<_> = self.miners.iter().map(|m| m.strategy).collect();
        Ok(Self::assemble(types, blocks, winners))
    }

    fn assemble(
        types: impl IntoIterator<Item = MinerType>,
        blocks: Vec<Block>,
        winners: Vec<MinerId>,
    ) -> Self {
        let miners = types
            .into_iter()
            .enumerate()
            .map(|(i, strategy)| Miner::new(MinerId(i), strategy, &winners))
            .collect();

        let horizon = blocks.len() - 1;
        let mut chain = Blockchain {
            horizon,
            blocks,
            miners,
            winners,
            longest_chains: vec![],
        };
        chain.longest_chains = chain.longest_chains_at(horizon);

        chain
    }

    #[inline]
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    #[inline]
    pub fn num_miners(&self) -> usize {
        self.miners.len()
    }

    #[inline]
    pub fn miners(&self) -> &[Miner] {
        &self.miners
    }

    #[inline]
    pub fn winners(&self) -> &[MinerId] {
        &self.winners
    }

    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Parent heights of the non-genesis blocks, in height order. Together
    /// with [Blockchain::winners] this is the explicit history the chain
    /// was built from.
    pub fn parents(&self) -> Vec<usize> {
        self.blocks[1..].iter().map(|b| b.parent.unwrap()).collect()
    }

    /// All maximal-length genesis-to-leaf paths at the stored horizon,
    /// precomputed at construction.
    #[inline]
    pub fn longest_chains(&self) -> &[Vec<usize>] {
        &self.longest_chains
    }

    /// Returns true iff `t` has a child at height `bound` or below.
    pub fn has_child_within(&self, t: usize, bound: usize) -> bool {
        (t + 1..=bound).any(|s| self.blocks[s].parent == Some(t))
    }

    /// Returns true iff no block on the chain points to `t` as its parent.
    #[inline]
    pub fn is_childless(&self, t: usize) -> bool {
        !self.has_child_within(t, self.horizon)
    }

    /// Heights of all childless blocks, in ascending order. Never empty.
    pub fn leaves(&self) -> Vec<usize> {
        (0..=self.horizon).filter(|&t| self.is_childless(t)).collect()
    }

    /// Heights of all blocks on the path from genesis to `t`, ascending and
    /// including both endpoints.
    ///
    /// ## Panics
    /// Panics if `t` exceeds [Blockchain::horizon].
    pub fn ancestors_of(&self, t: usize) -> Vec<usize> {
        let mut path = vec![t];
        let mut curr = t;
        while let Some(parent) = self.blocks[curr].parent {
            path.push(parent);
            curr = parent;
        }

        path.reverse();
        path
    }

    /// Number of blocks on the path from genesis to `t`, inclusive.
    pub fn chain_length(&self, t: usize) -> usize {
        let mut length = 1;
        let mut curr = t;
        while let Some(parent) = self.blocks[curr].parent {
            length += 1;
            curr = parent;
        }

        length
    }

    /// Returns true iff `t` and `s` lie on a common root-to-leaf path.
    pub fn on_same_branch(&self, t: usize, s: usize) -> bool {
        let (low, high) = if t <= s { (t, s) } else { (s, t) };

        self.ancestors_of(high).contains(&low)
    }

    /// The canonical chain within `[0, t]`: starting from genesis, descend
    /// to the lowest-height child at every step, so the first-created
    /// branch wins. Returns an ascending sequence of heights starting at 0.
    pub fn original_chain(&self, t: usize) -> Vec<usize> {
        let mut chain = vec![0];
        let mut curr = 0;
        while let Some(child) =
            (curr + 1..=t).find(|&s| self.blocks[s].parent == Some(curr))
        {
            chain.push(child);
            curr = child;
        }

        chain
    }

    /// Every maximal-length genesis-to-leaf path within `[0, t]`, in
    /// ascending order of leaf height. Ties are all retained. At least one
    /// path is returned, since genesis itself is a leaf on an empty chain.
    ///
    /// Quadratic in `t`; horizons in this model are small enough that the
    /// child scan per block is not worth indexing.
    pub fn longest_chains_at(&self, t: usize) -> Vec<Vec<usize>> {
        let mut longest: Vec<Vec<usize>> = vec![];
        let mut best = 0;

        for leaf in 0..=t {
            if self.has_child_within(leaf, t) {
                continue;
            }
            let path = self.ancestors_of(leaf);
            match path.len().cmp(&best) {
                Ordering::Greater => {
                    best = path.len();
                    longest = vec![path];
                }
                Ordering::Equal => longest.push(path),
                Ordering::Less => (),
            }
        }

        longest
    }

    /// Number of blocks won by `miner` on the path from genesis to `t`,
    /// excluding genesis.
    pub fn payoff(&self, miner: MinerId, t: usize) -> usize {
        let mut payoff = 0;
        let mut curr = t;
        while let Some(parent) = self.blocks[curr].parent {
            if self.winners[curr - 1] == miner {
                payoff += 1;
            }
            curr = parent;
        }

        payoff
    }

    /// Determines whether a block appended atop the chain ending in `t`
    /// would lie on a (co-)longest chain one stage from now, judged against
    /// the longest chains at the stored horizon. Also returns the number of
    /// longest chains there would then be: the current count plus one when
    /// the new chain joins the tie group, exactly one when it takes over,
    /// and the unchanged count when it falls short.
    pub fn will_be_longest_chain(&self, t: usize) -> (bool, usize) {
        let l = self.longest_chains.len();
        let length_longest = self.longest_chains[0].len();
        let length_future = self.chain_length(t) + 1;

        match length_future.cmp(&length_longest) {
            Ordering::Greater => (true, 1),
            Ordering::Equal => (true, l + 1),
            Ordering::Less => (false, l),
        }
    }

    /// Expected payoff of `miner` if the game ended now: the mean of its
    /// payoff over all currently-longest chains, each drawn with equal
    /// probability.
    pub fn expected_payoff(&self, miner: MinerId) -> f64 {
        let total: usize = self
            .longest_chains
            .iter()
            .map(|chain| self.payoff(miner, *chain.last().unwrap()))
            .sum();

        total as f64 / self.longest_chains.len() as f64
    }
}

impl Index<usize> for Blockchain {
    type Output = Block;

    fn index(&self, height: usize) -> &Self::Output {
        &self.blocks[height]
    }
}

impl Display for Blockchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for block in &self.blocks {
            writeln!(f, "{}", block)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Blockchain, ChainError};
    use crate::miner::{MinerId, TypeCounts};

    fn two_naive() -> TypeCounts {
        TypeCounts::all_naive(2)
    }

    #[test]
    fn rejects_length_mismatch() {
        let result = Blockchain::new(two_naive(), &[0, 1], &[0]);

        assert!(matches!(result, Err(ChainError::LengthMismatch { .. })));
    }

    #[test]
    fn rejects_parent_at_or_above_block() {
        let result = Blockchain::new(two_naive(), &[0, 2], &[0, 1]);

        assert!(matches!(
            result,
            Err(ChainError::ParentAboveBlock { height: 2, parent: 2 })
        ));
    }

    #[test]
    fn rejects_unknown_winner() {
        let result = Blockchain::new(two_naive(), &[0], &[2]);

        assert!(matches!(
            result,
            Err(ChainError::WinnerOutOfRange { winner: 2, .. })
        ));
    }

    #[test]
    fn rejects_count_total_mismatch() {
        let result = Blockchain::random(3, 3, two_naive(), 0);

        assert!(matches!(
            result,
            Err(ChainError::MinerCountMismatch { counts: 2, miners: 3 })
        ));
    }

    #[test]
    fn linear_chain_queries() {
        let chain =
            Blockchain::new(two_naive(), &[0, 1], &[0, 1]).unwrap();

        assert_eq!(chain.horizon(), 2);
        assert_eq!(chain.original_chain(2), vec![0, 1, 2]);
        assert_eq!(chain.longest_chains(), &[vec![0, 1, 2]]);
        assert_eq!(chain.payoff(MinerId(0), 2), 1);
        assert_eq!(chain.payoff(MinerId(1), 2), 1);
        assert_eq!(chain.leaves(), vec![2]);
    }

    #[test]
    fn extension_is_append_only() {
        let chain =
            Blockchain::new(two_naive(), &[0, 1], &[0, 1]).unwrap();
        let extended = chain.extend(MinerId(0), 2).unwrap();

        assert_eq!(extended.horizon(), 3);
        assert_eq!(extended.longest_chains(), &[vec![0, 1, 2, 3]]);
        assert_eq!(extended.payoff(MinerId(0), 3), 2);

        // The source chain is unaffected.
        assert_eq!(chain.horizon(), 2);
        assert_eq!(chain.longest_chains(), &[vec![0, 1, 2]]);
    }

    #[test]
    fn forked_chain_has_tied_longest_chains() {
        let chain =
            Blockchain::new(two_naive(), &[0, 0], &[0, 1]).unwrap();

        assert_eq!(chain.longest_chains(), &[vec![0, 1], vec![0, 2]]);
        assert_eq!(chain.original_chain(2), vec![0, 1]);
        assert_eq!(chain.leaves(), vec![1, 2]);
        assert_eq!(chain.expected_payoff(MinerId(0)), 0.5);
    }

    #[test]
    fn ancestry_closure() {
        let chain = Blockchain::new(
            TypeCounts::all_naive(3),
            &[0, 0, 2, 1, 3],
            &[0, 1, 2, 0, 1],
        )
        .unwrap();

        for t in 0..=chain.horizon() {
            let path = chain.ancestors_of(t);
            assert_eq!(path.len(), chain.chain_length(t));
            assert_eq!(path[0], 0);
            assert_eq!(*path.last().unwrap(), t);
            for pair in path.windows(2) {
                assert!(pair[0] < pair[1]);
                assert_eq!(chain[pair[1]].parent, Some(pair[0]));
            }
        }
    }

    #[test]
    fn payoff_conservation_on_longest_chain() {
        let chain = Blockchain::new(
            TypeCounts::all_naive(3),
            &[0, 0, 2, 1, 3],
            &[0, 1, 2, 0, 1],
        )
        .unwrap();

        for paths in chain.longest_chains() {
            let tip = *paths.last().unwrap();
            let total: usize = (0..chain.num_miners())
                .map(|i| chain.payoff(MinerId(i), tip))
                .sum();
            assert_eq!(total, chain.chain_length(tip) - 1);
        }
    }

    #[test]
    fn will_be_longest_chain_three_cases() {
        // Fork of two tied chains of length 2, plus the tail block 3 on
        // top of block 1.
        let chain =
            Blockchain::new(two_naive(), &[0, 0, 1], &[0, 1, 0]).unwrap();

        assert_eq!(chain.longest_chains(), &[vec![0, 1, 3]]);
        // Appending atop block 3 strictly overtakes.
        assert_eq!(chain.will_be_longest_chain(3), (true, 1));
        // Appending atop block 2 joins the tie group.
        assert_eq!(chain.will_be_longest_chain(2), (true, 2));
        // Appending atop genesis falls short.
        assert_eq!(chain.will_be_longest_chain(0), (false, 1));
    }

    #[test]
    fn shorten_drops_newest_block() {
        let chain =
            Blockchain::new(two_naive(), &[0, 1], &[0, 1]).unwrap();
        let shortened = chain.shorten().unwrap();

        assert_eq!(shortened.horizon(), 1);
        assert_eq!(shortened.winners(), &[MinerId(0)]);

        let genesis_only = shortened.shorten().unwrap();
        assert!(matches!(
            genesis_only.shorten(),
            Err(ChainError::ShortenedGenesis)
        ));
    }

    #[test]
    fn same_seed_reproduces_chain() {
        let a = Blockchain::random(6, 3, TypeCounts::all_naive(3), 9).unwrap();
        let b = Blockchain::random(6, 3, TypeCounts::all_naive(3), 9).unwrap();
        let c = Blockchain::random(6, 3, TypeCounts::all_naive(3), 10).unwrap();

        assert_eq!(a.parents(), b.parents());
        assert_eq!(a.winners(), b.winners());
        // A different seed should disagree somewhere on a 6-stage chain.
        assert!(
            a.parents() != c.parents() || a.winners() != c.winners()
        );
    }
}

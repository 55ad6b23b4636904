use std::fmt::Display;

use crate::miner::MinerId;

/// A single block in the chain's history. Blocks are identified by their
/// height, which is also the stage of the game in which they were mined
/// (the genesis block sits at height 0 and belongs to no stage).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// The stage this block was mined in.
    pub height: usize,
    /// Height of this block's parent. `None` for the genesis block.
    pub parent: Option<usize>,
    /// The miner that won the stage this block was mined in. `None` for the
    /// genesis block.
    pub winner: Option<MinerId>,
}

impl Block {
    /// Creates a non-genesis block. `parent` must be strictly less than
    /// `height`; [Blockchain](crate::blockchain::Blockchain) construction
    /// enforces this.
    pub fn new(height: usize, parent: usize, winner: MinerId) -> Self {
        Block { height, parent: Some(parent), winner: Some(winner) }
    }

    /// Creates the genesis block.
    pub fn genesis() -> Self {
        Block { height: 0, parent: None, winner: None }
    }

    /// Returns true iff this is the genesis block.
    #[inline]
    pub fn is_genesis(&self) -> bool {
        self.parent.is_none()
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.parent, self.winner) {
            (Some(parent), Some(winner)) => write!(
                f,
                "block {} mined by miner {}, parent is block {}",
                self.height, winner, parent
            ),
            _ => write!(f, "block 0 (genesis)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Block;
    use crate::miner::MinerId;

    #[test]
    fn genesis_has_no_parent() {
        let genesis = Block::genesis();

        assert!(genesis.is_genesis());
        assert_eq!(genesis.height, 0);
        assert_eq!(genesis.winner, None);
    }

    #[test]
    fn display_names_winner_and_parent() {
        let block = Block::new(3, 1, MinerId(0));

        assert_eq!(
            block.to_string(),
            "block 3 mined by miner 0, parent is block 1"
        );
    }
}

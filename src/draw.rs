//! Random sampling of winner and parent sequences for chain construction.
//!
//! The game core is deterministic; every random draw happens here, against
//! a caller-supplied seeded generator, so a simulation can be replayed
//! exactly from its seed.

use rand::Rng;

/// Draws a winner index for each of `horizon` stages, uniformly over the
/// `num_miners` miners.
pub fn winners<R: Rng>(
    rng: &mut R,
    horizon: usize,
    num_miners: usize,
) -> Vec<usize> {
    (0..horizon).map(|_| rng.gen_range(0..num_miners)).collect()
}

/// Draws a parent height for each of `horizon` stages, uniformly over the
/// blocks that exist when the stage is played (the block of stage `t + 1`
/// may point to any height in `0..=t`).
pub fn parents<R: Rng>(rng: &mut R, horizon: usize) -> Vec<usize> {
    (0..horizon).map(|t| rng.gen_range(0..=t)).collect()
}

//! The miner strategy oracles.
//!
//! Each oracle is a pure function of a [Blockchain] that returns every
//! candidate target height its strategy is indifferent between. Ties are
//! never collapsed here; a caller that needs a single target decides how
//! to break them (uniformly at random or otherwise).

use crate::{
    blockchain::Blockchain,
    miner::{Miner, MinerId, MinerType},
};

/// Target of every conservative miner: the tip of the canonical chain.
pub fn conservative_strategy(chain: &Blockchain) -> usize {
    *chain.original_chain(chain.horizon()).last().unwrap()
}

/// Targets of a longest-chain miner: the single longest tip, or, among
/// tied longest chains, every tip under which `miner` has won the most
/// blocks.
pub fn longest_chain_strategies(
    chain: &Blockchain,
    miner: MinerId,
) -> Vec<usize> {
    let chains = chain.longest_chains();
    if chains.len() == 1 {
        return vec![*chains[0].last().unwrap()];
    }

    let payoffs: Vec<usize> = chains
        .iter()
        .map(|c| chain.payoff(miner, *c.last().unwrap()))
        .collect();
    let best = *payoffs.iter().max().unwrap();

    chains
        .iter()
        .zip(&payoffs)
        .filter(|&(_, &p)| p == best)
        .map(|(c, _)| *c.last().unwrap())
        .collect()
}

/// The payoff `miner` would collect for mining atop `t`, conditional on
/// winning the stage. Losing makes the choice of target inconsequential,
/// so only this conditional value has to be compared across targets; the
/// uniform win probability is dropped since it does not affect the
/// arg-max.
///
/// A target that cannot produce a (co-)longest chain is worth nothing:
/// even a win there is outgrown elsewhere. A target that produces the
/// unique longest chain is worth the win plus the blocks `miner` already
/// holds below it. A target that joins a group of `l` tied chains is worth
/// the uniform mixture over the group, any of which may end up canonical.
pub fn decision_relevant_payoff(
    chain: &Blockchain,
    miner: MinerId,
    t: usize,
) -> f64 {
    let (will_be_longest, l) = chain.will_be_longest_chain(t);
    if !will_be_longest {
        return 0.0;
    }

    let v_star = (1 + chain.payoff(miner, t)) as f64;
    if l == 1 {
        return v_star;
    }

    let others: usize = chain
        .longest_chains()
        .iter()
        .map(|c| chain.payoff(miner, *c.last().unwrap()))
        .sum();

    (v_star + others as f64) / l as f64
}

/// Targets of a naive miner: every height in `[0, t_max]` maximizing the
/// decision-relevant payoff.
pub fn naive_strategies(
    chain: &Blockchain,
    miner: MinerId,
    t_max: usize,
) -> Vec<usize> {
    let values: Vec<f64> = (0..=t_max)
        .map(|t| decision_relevant_payoff(chain, miner, t))
        .collect();
    let best = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    (0..=t_max).filter(|&t| values[t] == best).collect()
}

/// Candidate targets of `miner` at the stored horizon, according to its
/// assigned strategy.
pub fn strategies(chain: &Blockchain, miner: &Miner) -> Vec<usize> {
    match miner.strategy {
        MinerType::Conservative => vec![conservative_strategy(chain)],
        MinerType::LongestChain => {
            longest_chain_strategies(chain, miner.id)
        }
        MinerType::Naive => {
            naive_strategies(chain, miner.id, chain.horizon())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        conservative_strategy, decision_relevant_payoff,
        longest_chain_strategies, naive_strategies, strategies,
    };
    use crate::{
        blockchain::Blockchain,
        miner::{MinerId, TypeCounts},
    };

    #[test]
    fn conservative_follows_first_created_branch() {
        // Block 1 and block 2 both fork off genesis; block 3 extends the
        // earlier block 1, so the canonical chain runs through it.
        let chain = Blockchain::new(
            TypeCounts::all_naive(2),
            &[0, 0, 1],
            &[0, 1, 0],
        )
        .unwrap();

        assert_eq!(conservative_strategy(&chain), 3);

        let fork =
            Blockchain::new(TypeCounts::all_naive(2), &[0, 0], &[0, 1])
                .unwrap();
        assert_eq!(conservative_strategy(&fork), 1);
    }

    #[test]
    fn longest_chain_prefers_own_blocks() {
        let fork =
            Blockchain::new(TypeCounts::all_naive(3), &[0, 0], &[0, 1])
                .unwrap();

        // Miner 0 won block 1, miner 1 won block 2; miner 2 won nothing
        // and is indifferent between the tied tips.
        assert_eq!(longest_chain_strategies(&fork, MinerId(0)), vec![1]);
        assert_eq!(longest_chain_strategies(&fork, MinerId(1)), vec![2]);
        assert_eq!(longest_chain_strategies(&fork, MinerId(2)), vec![1, 2]);
    }

    #[test]
    fn longest_chain_single_chain_ignores_payoffs() {
        let chain =
            Blockchain::new(TypeCounts::all_naive(2), &[0, 1], &[1, 1])
                .unwrap();

        assert_eq!(longest_chain_strategies(&chain, MinerId(0)), vec![2]);
    }

    #[test]
    fn decision_relevant_payoff_cases() {
        let chain =
            Blockchain::new(TypeCounts::all_naive(2), &[0, 1], &[0, 1])
                .unwrap();

        // Appending atop the tip makes the unique longest chain.
        assert_eq!(decision_relevant_payoff(&chain, MinerId(0), 2), 2.0);
        // Appending atop block 1 joins a two-way tie: the new chain pays
        // 1 + 1, the existing one pays 1.
        assert_eq!(decision_relevant_payoff(&chain, MinerId(0), 1), 1.5);
        // Appending atop genesis can never catch up.
        assert_eq!(decision_relevant_payoff(&chain, MinerId(0), 0), 0.0);
    }

    #[test]
    fn naive_takes_unique_best_target() {
        let chain =
            Blockchain::new(TypeCounts::all_naive(2), &[0, 1], &[0, 1])
                .unwrap();

        assert_eq!(naive_strategies(&chain, MinerId(0), 2), vec![2]);
    }

    #[test]
    fn naive_preserves_ties() {
        let fork =
            Blockchain::new(TypeCounts::all_naive(3), &[0, 0], &[0, 1])
                .unwrap();

        // Miner 2 holds no blocks on either branch: winning atop tip 1 or
        // tip 2 is worth exactly one block either way.
        assert_eq!(naive_strategies(&fork, MinerId(2), 2), vec![1, 2]);
        // Miner 0 strictly prefers building on its own block.
        assert_eq!(naive_strategies(&fork, MinerId(0), 2), vec![1]);
    }

    #[test]
    fn dispatch_follows_assigned_type() {
        // One conservative, one longest-chain, one naive miner.
        let chain = Blockchain::new(
            TypeCounts::new(1, 1, 1),
            &[0, 0],
            &[1, 2],
        )
        .unwrap();

        let targets: Vec<_> = chain
            .miners()
            .iter()
            .map(|m| strategies(&chain, m))
            .collect();

        assert_eq!(targets[0], vec![1]); // canonical branch
        assert_eq!(targets[1], vec![1]); // its own winning branch
        assert_eq!(targets[2], vec![2]); // its own winning branch
    }
}

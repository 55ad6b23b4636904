use std::error::Error;

use forking_game::{prelude::*, search, strategy};

fn main() -> Result<(), Box<dyn Error>> {
    let horizon = 6;
    let num_miners = 3;
    let chain = Blockchain::random(
        horizon,
        num_miners,
        TypeCounts::new(1, 1, 1),
        9,
    )?;

    for miner in chain.miners() {
        println!("{}", miner);
    }
    println!();
    print!("{}", chain);

    println!("\noriginal chain {:?}", chain.original_chain(horizon));
    println!("longest chains {:?}", chain.longest_chains());

    let miner = MinerId(num_miners - 1);
    println!("\npayoff for miner {} in all chains and subchains:", miner);
    for t in 0..=horizon {
        println!(
            "the payoff for the chain ending in block {} is {}",
            t,
            chain.payoff(miner, t)
        );
    }

    println!(
        "\nall conservative miners mine at block {} in the next stage",
        strategy::conservative_strategy(&chain)
    );
    println!(
        "longest-chain miner {} mines at {:?} in the next stage",
        miner,
        strategy::longest_chain_strategies(&chain, miner)
    );
    println!(
        "naive miner {} mines at {:?} in the next stage",
        miner,
        strategy::naive_strategies(&chain, miner, horizon)
    );

    let optimal = search::optimal_strategies(&chain, miner, horizon + 3)?;
    println!(
        "\nlooking three stages ahead, miner {} optimally mines at {:?}",
        miner, optimal
    );

    Ok(())
}

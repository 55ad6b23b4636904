use std::{error::Error, time::Instant};

use forking_game::{prelude::*, solver};

fn main() -> Result<(), Box<dyn Error>> {
    let horizon = 4;
    let chain =
        Blockchain::new(TypeCounts::all_naive(2), &[0, 0, 2], &[0, 1, 1])?;

    print!("{}", chain);

    let start = Instant::now();
    let matrix = solver::payoff_matrix(&chain, horizon)?;

    println!("\n{}", matrix);
    println!("\nnash strategy pair(s): {:?}", matrix.equilibria());
    println!("Elapsed time: {:.4} secs", start.elapsed().as_secs_f64());

    Ok(())
}

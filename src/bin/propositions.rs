use std::{error::Error, time::Instant};

use forking_game::verify::{self, Counterexample};

fn report(name: &str, result: Option<Counterexample>) {
    match result {
        None => println!("{}: no counterexample found", name),
        Some(found) => println!(
            "{}: counterexample at parents {:?}, winners {:?}",
            name, found.parents, found.winners
        ),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let horizon = 5;
    let start = Instant::now();

    report(
        "switching to a shorter branch",
        verify::check_shorter_branch_switch(horizon)?,
    );
    report(
        "leaving the first-win branch",
        verify::check_first_win_branch(horizon)?,
    );
    report("repeat on occupied target", verify::check_monotonicity(horizon)?);
    report(
        "multiple on-path equilibria",
        verify::check_on_path_uniqueness(horizon)?,
    );

    println!("Elapsed time: {:.4} secs", start.elapsed().as_secs_f64());

    Ok(())
}

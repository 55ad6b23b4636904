//! CSV persistence of a chain's structure.
//!
//! A chain is written as three rows over its mined blocks: heights,
//! parent heights, and winner indices. The genesis block carries no data
//! of its own and is omitted.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use crate::blockchain::Blockchain;

/// Writes the three-row CSV representation of `chain` to `out`.
pub fn write_csv<W: Write>(chain: &Blockchain, out: &mut W) -> io::Result<()> {
    let heights: Vec<String> =
        (1..=chain.horizon()).map(|t| t.to_string()).collect();
    let parents: Vec<String> =
        chain.parents().iter().map(|p| p.to_string()).collect();
    let winners: Vec<String> =
        chain.winners().iter().map(|w| w.to_string()).collect();

    writeln!(out, "{}", heights.join(","))?;
    writeln!(out, "{}", parents.join(","))?;
    writeln!(out, "{}", winners.join(","))?;

    Ok(())
}

/// Writes the three-row CSV representation of `chain` to a file at
/// `path`, creating or truncating it.
pub fn to_csv<P: AsRef<Path>>(chain: &Blockchain, path: P) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);

    write_csv(chain, &mut out)
}

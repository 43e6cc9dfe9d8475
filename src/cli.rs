//! `clap` argument definitions for the REPL driver (spec SPEC_FULL §B
//! "CLI surface").

use clap::Parser;

#[derive(Parser, Debug)]
#[clap(
    name = "distcalc",
    version,
    about = "A spreadsheet engine whose cells hold probability distributions instead of scalars"
)]
pub struct Cli {
    /// Load a persisted graph from this JSON file on startup.
    #[clap(short, long)]
    pub load: Option<String>,

    /// Run commands from this file instead of reading stdin.
    #[clap(short, long)]
    pub script: Option<String>,

    /// Maximum components any cell's distribution may carry before the
    /// reducer compresses it.
    #[clap(long, default_value_t = 200)]
    pub max_components: usize,

    /// Seed the shared RNG for reproducible RESAMPLE/Monte Carlo runs.
    #[clap(long)]
    pub seed: Option<u64>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

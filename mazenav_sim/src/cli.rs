// mazenav_sim/src/cli.rs

use clap::Parser;
use std::path::PathBuf;

/// Mazenav: a differential-drive robot localizing itself in a grid maze.
///
/// This struct defines the command-line arguments of the headless runner.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(short, long, default_value = "assets/scenarios/default.toml")]
    pub scenario: PathBuf,

    /// Overrides the number of steps from the scenario.
    #[arg(long)]
    pub steps: Option<usize>,

    /// Overrides the PRNG seed from the scenario.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log filter used when `RUST_LOG` is not set (e.g. `info`, `mazenav_core=debug`).
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

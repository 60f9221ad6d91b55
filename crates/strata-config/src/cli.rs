//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Strata command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "strata", about = "Procedural mineral deposit generation")]
pub struct CliArgs {
    /// World seed.
    #[arg(long, allow_hyphen_values = true)]
    pub seed: Option<i64>,

    /// Chunks generated around the origin in each direction.
    #[arg(long)]
    pub chunk_radius: Option<u32>,

    /// Directory of deposit definition files.
    #[arg(long)]
    pub deposits_dir: Option<PathBuf>,

    /// Worker threads for the deposit pass.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.world.seed = seed;
        }
        if let Some(radius) = args.chunk_radius {
            self.world.chunk_radius = radius;
        }
        if let Some(ref dir) = args.deposits_dir {
            self.deposits.dir = dir.clone();
        }
        if let Some(workers) = args.workers {
            self.world.workers = workers;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

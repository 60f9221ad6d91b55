//! Settings for the deposit generator, persisted to disk as RON.
//!
//! Values load from `config.ron`, then command-line flags override them.
//! Unknown or missing fields fall back to defaults so old files keep loading.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, DepositsConfig, WorldConfig, default_config_dir};
pub use error::ConfigError;

//! Deposit loading errors and configuration warnings.

use std::path::PathBuf;

/// Errors that stop a deposit definition from loading.
#[derive(Debug, thiserror::Error)]
pub enum DepositError {
    /// Failed to read a definition file or directory.
    #[error("failed to read deposits from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid JSON array of deposit variants.
    #[error("failed to parse deposit file {file}: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    /// A variant's `attributes` blob does not fit its generator.
    #[error("invalid attributes for deposit in file {file}: {source}")]
    InvalidAttributes {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    /// No generator is registered for the variant's tag.
    #[error("deposit in file {file} uses unknown generator '{tag}'")]
    UnknownGenerator { file: String, tag: String },
}

/// Non-fatal configuration problems found during generator init.
///
/// The generator stays usable: it either falls back to a default or never
/// places anything.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DepositWarning {
    #[error("deposit {file} has no radius property defined, defaulting to uniform radius 10")]
    MissingRadius { file: String },

    #[error(
        "deposit {file} has climate conditions and a radius of 32 blocks or more, \
         which is not supported, defaulting to uniform radius 10"
    )]
    ClimateRadiusTooLarge { file: String },

    #[error("deposit in file {file}, no such blocks found by code/wildcard '{code}', deposit will never spawn")]
    NoMatchingBlocks { file: String, code: String },

    #[error("deposit in file {file} has no inBlock defined, it will never spawn")]
    MissingInBlock { file: String },

    #[error("deposit {file} has no depth defined, defaulting to {default}")]
    MissingDepth { file: String, default: f32 },
}

/// Logs every warning and hands the list back.
pub(crate) fn log_warnings(warnings: Vec<DepositWarning>) -> Vec<DepositWarning> {
    for warning in &warnings {
        tracing::warn!("{warning}");
    }
    warnings
}

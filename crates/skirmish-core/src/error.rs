//! Error types for encounter setup and data loading.
//!
//! Combat itself never fails: unreachable cells, missing targets and
//! stalemates are ordinary outcomes. Errors only surface while turning
//! external data into creatures and parties.

use thiserror::Error;

use crate::dice::DiceError;

/// Result type alias using [`SkirmishError`].
pub type Result<T> = std::result::Result<T, SkirmishError>;

/// Top-level error type for the skirmish engine.
#[derive(Debug, Error)]
pub enum SkirmishError {
    /// A damage formula could not be parsed.
    #[error("invalid dice formula: {0}")]
    Dice(#[from] DiceError),

    /// No stat block with this name is known.
    #[error("unknown creature: {0}")]
    UnknownCreature(String),

    /// A party was given no members.
    #[error("party '{0}' has no members")]
    EmptyParty(String),

    /// Stat-block or config data failed to parse.
    #[error("failed to parse {what}: {source}")]
    DataParse {
        /// What was being parsed.
        what: String,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },

    /// A data file could not be read.
    #[error("failed to read '{path}': {source}")]
    Io {
        /// Path of the file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

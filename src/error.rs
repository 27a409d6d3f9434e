//! Error types for buildflow
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Settings loading/parsing errors
#[derive(Error, Debug)]
pub enum SettingsError {
    /// IO error while reading the settings file
    #[error("Failed to read settings file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },

    /// Settings parse error
    #[error("Failed to parse settings: {source}")]
    Parse {
        #[from]
        source: toml::de::Error,
    },
}

/// Active-counter bookkeeping errors
///
/// These indicate a programmer error in the orchestration core, never bad
/// user input. The facade logs them and force-fails the affected run
/// instead of crashing the host.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CounterError {
    /// Decrement below zero
    #[error("Active-counter underflow for {entity}")]
    Underflow { entity: String },
}

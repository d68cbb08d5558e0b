//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure that can stop the host before or
//! during the frame loop. Faults inside a running game (audio, a missing
//! save) are handled by the presentation and never reach this type.

use daggorath_core::config::ConfigError;
use daggorath_presentation::PersistError;

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The save directory could not be prepared or read.
    #[error("save store error: {source}")]
    Persist {
        /// The underlying persistence error.
        #[from]
        source: PersistError,
    },

    /// The logging subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}

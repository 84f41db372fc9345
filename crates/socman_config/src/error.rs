//! Error types for configuration loading and validation.

use std::path::PathBuf;

/// Errors that can occur when loading `socman.toml` or `unit.toml` files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading a configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The project file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A unit declaration file could not be parsed.
    #[error("failed to parse unit declarations in {}: {reason}", path.display())]
    DeclParseError {
        /// The declaration file.
        path: PathBuf,
        /// The parser message.
        reason: String,
    },

    /// A required field is missing from the configuration.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}

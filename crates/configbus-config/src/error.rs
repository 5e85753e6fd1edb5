//! Configuration error types.

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path of the file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A config file is not valid TOML or does not match the schema.
    #[error("failed to parse config {path}: {source}")]
    ParseError {
        /// Path of the file (or a placeholder for embedded/merged sources).
        path: String,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// An environment variable override could not be parsed.
    #[error("invalid value for environment variable {var}: {message}")]
    EnvError {
        /// Name of the variable.
        var: String,
        /// What was wrong with it.
        message: String,
    },

    /// A value is out of range or violates a cross-field rule.
    #[error("invalid config value for {field}: {message}")]
    ValidationError {
        /// Dotted path of the offending field.
        field: String,
        /// What was wrong with it.
        message: String,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

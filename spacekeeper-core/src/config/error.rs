//! Configuration error types

use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment override holds a value that does not parse
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },

    /// Config file could not be read
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed
    #[error("failed to parse config file: {0}")]
    Parse(String),

    /// A setting fails semantic validation
    #[error("invalid configuration: {0}")]
    Validation(String),
}

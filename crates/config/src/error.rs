//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Validation error - required field missing or empty
    #[error("configuration section '{section}' is missing required field '{field}'")]
    MissingField {
        section: &'static str,
        field: &'static str,
    },

    /// Validation error - invalid value
    #[error("configuration section '{section}' has invalid {field}: {message}")]
    InvalidValue {
        section: &'static str,
        field: &'static str,
        message: String,
    },

    /// Validation error - malformed broker address
    #[error("invalid broker address '{broker}': expected host:port")]
    InvalidBroker { broker: String },
}

impl ConfigError {
    /// Create a MissingField error
    pub fn missing_field(section: &'static str, field: &'static str) -> Self {
        Self::MissingField { section, field }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(
        section: &'static str,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            section,
            field,
            message: message.into(),
        }
    }

    /// Create an InvalidBroker error
    pub fn invalid_broker(broker: impl Into<String>) -> Self {
        Self::InvalidBroker {
            broker: broker.into(),
        }
    }
}

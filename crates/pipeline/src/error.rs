//! Pipeline error types

use thiserror::Error;

/// Errors surfaced by pipeline construction.
///
/// Once running, the pipeline never propagates errors to its caller -
/// failures are classified and handled internally (retry, fallback log,
/// or self-disable). Only building the service can fail.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration failed validation
    #[error(transparent)]
    Config(#[from] execlog_config::ConfigError),

    /// Queue construction rejected its capacity
    #[error("invalid queue capacity: {0}")]
    QueueCapacity(String),

    /// Breaker construction rejected a parameter
    #[error("invalid breaker parameter: {0}")]
    BreakerParameter(String),
}

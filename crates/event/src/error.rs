//! Record validation errors

use thiserror::Error;

/// Structural problems found when validating a built record.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record type must be 'track', got '{0}'")]
    InvalidType(String),

    #[error("event name is empty")]
    EmptyEvent,

    #[error("message id is the nil UUID")]
    NilMessageId,

    #[error("record has neither userId nor anonymousId")]
    MissingIdentity,

    #[error("involves must reference the execution and its workflow, got {0} entries")]
    InvalidInvolves(usize),
}

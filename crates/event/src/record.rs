//! The execution record wire payload
//!
//! An [`ExecutionRecord`] is a "track"-style analytics envelope with
//! extensions. Serialized field names are the wire contract: top-level
//! fields are camelCase, nested facets snake_case. Optional fields are
//! omitted entirely rather than serialized as null.
//!
//! Records are immutable once built - construction goes through
//! [`build_event`](crate::build_event), and nothing mutates a record
//! afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::{iso_millis, iso_millis_opt};

/// The literal `type` value carried by every record.
pub const TRACK_TYPE: &str = "track";

/// The standardized analytics record delivered to Kafka.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Always `"track"`.
    #[serde(rename = "type")]
    pub record_type: String,

    /// Event name: `Workflow Started` / `Completed` / `Failed` / `Cancelled`.
    pub event: String,

    /// Identified user, when the execution carries one.
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Derived anonymous identity when no user is present.
    /// Exactly one of `user_id` / `anonymous_id` is set.
    #[serde(rename = "anonymousId", skip_serializing_if = "Option::is_none")]
    pub anonymous_id: Option<String>,

    /// Record creation time, ISO-8601 UTC with millisecond precision.
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,

    /// Version-4 UUID, unique per record. Consumers deduplicate on this.
    #[serde(rename = "messageId")]
    pub message_id: Uuid,

    /// Low-cardinality facets.
    pub dimensions: Dimensions,

    /// Boolean facets.
    pub flags: Flags,

    /// Numeric facets.
    pub metrics: RecordMetrics,

    /// Free-form labels, ordered; may be empty.
    pub tags: Vec<String>,

    /// Entity references, ordered: the execution, then its workflow.
    pub involves: Vec<Involved>,

    /// High-cardinality attributes.
    pub properties: RecordProperties,

    /// Emitting application / library / instance identity.
    pub context: RecordContext,
}

/// Low-cardinality dimensions suitable for grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub execution_mode: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_type: Option<String>,

    pub workflow_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

/// Boolean facets of the execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    pub is_manual_execution: bool,
    pub is_retry: bool,
}

/// Numeric facets of the execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetrics {
    /// Number of nodes in the workflow; 0 when the descriptor has none.
    pub node_count: u32,

    /// `finished_at - started_at` in integer milliseconds.
    /// Present only on completion/failure/cancellation events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// A referenced entity: the execution itself or its workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Involved {
    pub role: String,
    pub id: String,
    pub id_type: String,
}

impl Involved {
    pub fn execution(id: impl Into<String>) -> Self {
        Self {
            role: "WorkflowExecution".into(),
            id: id.into(),
            id_type: "n8n".into(),
        }
    }

    pub fn workflow(id: impl Into<String>) -> Self {
        Self {
            role: "Workflow".into(),
            id: id.into(),
            id_type: "n8n".into(),
        }
    }
}

/// High-cardinality attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_node: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_of: Option<String>,

    #[serde(with = "iso_millis")]
    pub started_at: DateTime<Utc>,

    #[serde(with = "iso_millis_opt", skip_serializing_if = "Option::is_none", default)]
    pub finished_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_stack: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_node_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_node_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_version: Option<String>,
}

/// Fixed identity block describing the emitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordContext {
    pub app: AppInfo,
    pub library: LibraryInfo,
    pub instance: InstanceInfo,
    pub n8n: EngineContext,
}

/// The host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
}

/// This library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryInfo {
    pub name: String,
    pub version: String,
}

/// The emitting process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceInfo {
    pub id: String,

    /// `main` or `worker`.
    #[serde(rename = "type")]
    pub instance_type: String,
}

/// Engine-specific context nested under `context.n8n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineContext {
    pub execution_mode: String,
    pub instance_type: String,
}

#[cfg(test)]
#[path = "record_test.rs"]
mod record_test;

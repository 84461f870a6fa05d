//! Execution record model and event builder
//!
//! Transforms host workflow execution data into the standardized analytics
//! record that the delivery pipeline ships to Kafka.
//!
//! # Overview
//!
//! - [`ExecutionRecord`] - the wire payload: a "track"-style envelope with
//!   low-cardinality dimensions, boolean flags, numeric metrics, entity
//!   references, and high-cardinality properties
//! - [`ExecutionContext`] - the input handed over by the workflow engine
//!   (execution id, workflow descriptor, mode, timestamps, run summary)
//! - [`build_event`] - the pure transformer from context to record
//! - [`validate_record`] - structural validation of a built record
//!
//! # Example
//!
//! ```
//! use execlog_event::{build_event, BuildInfo, EventKind, ExecutionContext, WorkflowDescriptor};
//! use chrono::Utc;
//!
//! let ctx = ExecutionContext {
//!     execution_id: "exec-456".into(),
//!     workflow: WorkflowDescriptor {
//!         id: "workflow-123".into(),
//!         name: "Test Workflow".into(),
//!         nodes: Vec::new(),
//!         version_id: None,
//!     },
//!     mode: "manual".into(),
//!     user_id: Some("user-789".into()),
//!     retry_of: None,
//!     started_at: Utc::now(),
//!     finished_at: None,
//!     run: None,
//! };
//!
//! let record = build_event(EventKind::Started, &ctx, &BuildInfo::default()).unwrap();
//! assert_eq!(record.event, "Workflow Started");
//! ```

mod builder;
mod context;
mod error;
mod record;
pub mod time;

pub use builder::{build_event, classify_run_error, derive_trigger_type, normalize_status,
    validate_record, BuildInfo, EventKind, InstanceType};
pub use context::{ErrorNode, ExecutionContext, RunError, RunSummary, WorkflowDescriptor,
    WorkflowNode};
pub use error::RecordError;
pub use record::{AppInfo, Dimensions, EngineContext, ExecutionRecord, Flags, InstanceInfo,
    Involved, LibraryInfo, RecordContext, RecordMetrics, RecordProperties, TRACK_TYPE};

/// Name reported in the record's `context.library` block.
pub const LIBRARY_NAME: &str = "n8n-kafka-execution-logger";

/// Version reported in the record's `context.library` block.
pub const LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");

//! Execution context handed over by the workflow engine
//!
//! The lifecycle adapter assembles an [`ExecutionContext`] from host data
//! at each lifecycle callback; the event builder consumes it. The types
//! here deliberately mirror what the engine exposes, not the wire format.

use chrono::{DateTime, Utc};

/// Everything the event builder needs about one workflow execution.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Engine-assigned execution identifier.
    pub execution_id: String,

    /// The workflow being executed.
    pub workflow: WorkflowDescriptor,

    /// Execution mode as reported by the engine
    /// (`manual`, `trigger`, `webhook`, `cli`, `retry`, ...).
    pub mode: String,

    /// Identified user, when the execution carries one.
    pub user_id: Option<String>,

    /// Execution id this run retries, when it is a retry.
    pub retry_of: Option<String>,

    pub started_at: DateTime<Utc>,

    /// Set on completion/failure/cancellation callbacks.
    pub finished_at: Option<DateTime<Utc>>,

    /// Run outcome summary, present once the run has finished.
    pub run: Option<RunSummary>,
}

/// The workflow the execution belongs to.
#[derive(Debug, Clone, Default)]
pub struct WorkflowDescriptor {
    pub id: String,
    pub name: String,
    pub nodes: Vec<WorkflowNode>,
    pub version_id: Option<String>,
}

/// A node of the workflow, as far as event construction cares.
#[derive(Debug, Clone)]
pub struct WorkflowNode {
    pub name: String,

    /// Engine node type string, e.g. `n8n-nodes-base.scheduleTrigger`.
    pub node_type: String,
}

/// Outcome of a finished run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Engine status string (`success`, `error`, `canceled`, `crashed`, ...).
    pub status: Option<String>,

    pub error: Option<RunError>,
}

/// Error carried by a failed run.
#[derive(Debug, Clone, Default)]
pub struct RunError {
    /// Declared error type name, e.g. `NodeOperationError`.
    pub name: Option<String>,

    pub message: Option<String>,

    pub stack: Option<String>,

    /// The node the error originated from, when known.
    pub node: Option<ErrorNode>,
}

/// Node reference attached to a run error.
#[derive(Debug, Clone)]
pub struct ErrorNode {
    pub id: String,
    pub name: String,
}

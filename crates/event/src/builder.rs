//! Pure transformation from execution context to execution record
//!
//! `build_event` has no side effects beyond reading the clock and drawing
//! a fresh UUID; everything else is a function of its inputs. Host and
//! process identity is captured once in a [`BuildInfo`] and reused for
//! every record.

use chrono::Utc;
use uuid::Uuid;

use crate::context::{ExecutionContext, RunError};
use crate::error::RecordError;
use crate::record::{AppInfo, Dimensions, EngineContext, ExecutionRecord, Flags, InstanceInfo,
    Involved, LibraryInfo, RecordContext, RecordMetrics, RecordProperties, TRACK_TYPE};
use crate::{LIBRARY_NAME, LIBRARY_VERSION};

/// Lifecycle event kinds observed from the workflow engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Started,
    Completed,
    Failed,
    Cancelled,
}

impl EventKind {
    /// Wire event name for this kind.
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::Started => "Workflow Started",
            Self::Completed => "Workflow Completed",
            Self::Failed => "Workflow Failed",
            Self::Cancelled => "Workflow Cancelled",
        }
    }

    /// Duration is reported only for events that end a run.
    const fn is_terminal(self) -> bool {
        !matches!(self, Self::Started)
    }
}

/// Whether this process is the engine's main instance or a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstanceType {
    #[default]
    Main,
    Worker,
}

impl InstanceType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Worker => "worker",
        }
    }
}

/// Host and process identity baked into every record's `context` block.
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Host engine version, reported under `context.app.version`.
    pub host_version: String,

    /// Stable instance identifier (hostname or operator override).
    pub instance_id: String,

    pub instance_type: InstanceType,

    /// Deployment environment label, when the operator sets one.
    pub environment: Option<String>,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            host_version: "unknown".into(),
            instance_id: "unknown".into(),
            instance_type: InstanceType::Main,
            environment: None,
        }
    }
}

impl BuildInfo {
    /// Collect identity from the process environment.
    ///
    /// Instance id: `N8N_INSTANCE_ID`, then `HOSTNAME`, then `"unknown"`.
    /// Instance type: worker when `N8N_PROCESS_TYPE` equals `worker`.
    pub fn from_env(host_version: impl Into<String>) -> Self {
        let instance_id = std::env::var("N8N_INSTANCE_ID")
            .or_else(|_| std::env::var("HOSTNAME"))
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unknown".into());

        let instance_type = match std::env::var("N8N_PROCESS_TYPE").as_deref() {
            Ok("worker") => InstanceType::Worker,
            _ => InstanceType::Main,
        };

        let environment = std::env::var("N8N_ENVIRONMENT")
            .ok()
            .filter(|s| !s.is_empty());

        Self {
            host_version: host_version.into(),
            instance_id,
            instance_type,
            environment,
        }
    }
}

/// Build the standardized record for one lifecycle event.
///
/// Pure except for the clock (`timestamp`) and a fresh v4 UUID
/// (`messageId`). The result is validated before it is returned.
pub fn build_event(
    kind: EventKind,
    ctx: &ExecutionContext,
    info: &BuildInfo,
) -> Result<ExecutionRecord, RecordError> {
    let status = ctx
        .run
        .as_ref()
        .and_then(|run| run.status.as_deref())
        .map(normalize_status);

    let run_error = ctx.run.as_ref().and_then(|run| run.error.as_ref());

    let duration_ms = match (kind.is_terminal(), ctx.finished_at) {
        (true, Some(finished)) => {
            Some((finished - ctx.started_at).num_milliseconds().max(0) as u64)
        }
        _ => None,
    };

    let (user_id, anonymous_id) = match &ctx.user_id {
        Some(user) => (Some(user.clone()), None),
        None => (None, Some(anonymous_id(&ctx.execution_id))),
    };

    let (trigger_type, trigger_node) = derive_trigger_type(ctx);

    let mut dimensions = Dimensions {
        execution_mode: ctx.mode.clone(),
        status,
        version: Some(info.host_version.clone()),
        environment: info.environment.clone(),
        trigger_type: Some(trigger_type),
        workflow_name: ctx.workflow.name.clone(),
        error_type: None,
    };

    let mut properties = RecordProperties {
        trigger_node,
        retry_of: ctx.retry_of.clone(),
        started_at: ctx.started_at,
        finished_at: ctx.finished_at,
        error_message: None,
        error_stack: None,
        error_node_id: None,
        error_node_name: None,
        workflow_version: ctx.workflow.version_id.clone(),
    };

    if kind == EventKind::Failed
        && let Some(err) = run_error
    {
        dimensions.error_type = Some(classify_run_error(err));
        properties.error_message = err.message.clone();
        properties.error_stack = err.stack.clone();
        if let Some(node) = &err.node {
            properties.error_node_id = Some(node.id.clone());
            properties.error_node_name = Some(node.name.clone());
        }
    }

    let record = ExecutionRecord {
        record_type: TRACK_TYPE.into(),
        event: kind.event_name().into(),
        user_id,
        anonymous_id,
        timestamp: Utc::now(),
        message_id: Uuid::new_v4(),
        dimensions,
        flags: Flags {
            is_manual_execution: ctx.mode == "manual",
            is_retry: ctx.retry_of.is_some(),
        },
        metrics: RecordMetrics {
            node_count: ctx.workflow.nodes.len() as u32,
            duration_ms,
        },
        tags: Vec::new(),
        involves: vec![
            Involved::execution(&ctx.execution_id),
            Involved::workflow(&ctx.workflow.id),
        ],
        properties,
        context: RecordContext {
            app: AppInfo {
                name: "n8n".into(),
                version: info.host_version.clone(),
            },
            library: LibraryInfo {
                name: LIBRARY_NAME.into(),
                version: LIBRARY_VERSION.into(),
            },
            instance: InstanceInfo {
                id: info.instance_id.clone(),
                instance_type: info.instance_type.as_str().into(),
            },
            n8n: EngineContext {
                execution_mode: ctx.mode.clone(),
                instance_type: info.instance_type.as_str().into(),
            },
        },
    };

    validate_record(&record)?;
    Ok(record)
}

/// Normalize an engine run status to the wire vocabulary.
///
/// `canceled` and `crashed` are folded into `cancelled` and `error`;
/// `waiting` and `running` pass through; anything else is preserved.
pub fn normalize_status(status: &str) -> String {
    match status {
        "canceled" => "cancelled".into(),
        "crashed" => "error".into(),
        other => other.into(),
    }
}

/// Derive `(trigger_type, trigger_node)` from the execution mode.
///
/// `manual`/`webhook`/`cli` map to themselves. For `trigger` mode the
/// workflow's nodes are inspected: a cron/schedule node wins over a
/// webhook node, which wins over the generic `trigger`. Other modes pass
/// through unchanged.
pub fn derive_trigger_type(ctx: &ExecutionContext) -> (String, Option<String>) {
    match ctx.mode.as_str() {
        "manual" | "webhook" | "cli" => (ctx.mode.clone(), None),
        "trigger" => {
            let mut webhook_node = None;
            for node in &ctx.workflow.nodes {
                let ty = node.node_type.to_lowercase();
                if ty.contains("cron") || ty.contains("schedule") {
                    return ("schedule".into(), Some(node.name.clone()));
                }
                if webhook_node.is_none() && ty.contains("webhook") {
                    webhook_node = Some(node.name.clone());
                }
            }
            match webhook_node {
                Some(name) => ("webhook".into(), Some(name)),
                None => ("trigger".into(), None),
            }
        }
        other => (other.into(), None),
    }
}

/// Classify a run error into a short type label.
///
/// The error's declared type name wins; otherwise well-known errno
/// substrings are recognized.
pub fn classify_run_error(err: &RunError) -> String {
    if let Some(name) = &err.name
        && !name.is_empty()
    {
        return name.clone();
    }

    let message = err.message.as_deref().unwrap_or_default();
    if message.contains("ECONNREFUSED") {
        "ConnectionRefused".into()
    } else if message.contains("ETIMEDOUT") {
        "Timeout".into()
    } else if message.contains("ENOTFOUND") {
        "DNSError".into()
    } else {
        "Unknown".into()
    }
}

/// Validate a built record's structural invariants.
pub fn validate_record(record: &ExecutionRecord) -> Result<(), RecordError> {
    if record.record_type != TRACK_TYPE {
        return Err(RecordError::InvalidType(record.record_type.clone()));
    }
    if record.event.is_empty() {
        return Err(RecordError::EmptyEvent);
    }
    if record.message_id.is_nil() {
        return Err(RecordError::NilMessageId);
    }
    if record.user_id.is_none() && record.anonymous_id.is_none() {
        return Err(RecordError::MissingIdentity);
    }
    if record.involves.len() != 2 {
        return Err(RecordError::InvalidInvolves(record.involves.len()));
    }
    Ok(())
}

/// Anonymous identity derived from the execution id.
fn anonymous_id(execution_id: &str) -> String {
    let prefix: String = execution_id.chars().take(8).collect();
    format!("anon_{prefix}")
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod builder_test;

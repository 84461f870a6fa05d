//! Tests for the event builder

use chrono::{TimeZone, Utc};

use super::*;
use crate::context::{ErrorNode, ExecutionContext, RunError, RunSummary, WorkflowDescriptor,
    WorkflowNode};

fn node(name: &str, node_type: &str) -> WorkflowNode {
    WorkflowNode {
        name: name.into(),
        node_type: node_type.into(),
    }
}

fn base_context() -> ExecutionContext {
    ExecutionContext {
        execution_id: "exec-456".into(),
        workflow: WorkflowDescriptor {
            id: "workflow-123".into(),
            name: "Test Workflow".into(),
            nodes: vec![
                node("Start", "n8n-nodes-base.start"),
                node("HTTP Request", "n8n-nodes-base.httpRequest"),
            ],
            version_id: Some("1".into()),
        },
        mode: "manual".into(),
        user_id: Some("user-789".into()),
        retry_of: None,
        started_at: Utc.with_ymd_and_hms(2023, 1, 1, 10, 0, 0).unwrap(),
        finished_at: None,
        run: None,
    }
}

#[test]
fn test_start_event_happy_path() {
    let ctx = base_context();
    let record = build_event(EventKind::Started, &ctx, &BuildInfo::default()).unwrap();

    assert_eq!(record.record_type, "track");
    assert_eq!(record.event, "Workflow Started");
    assert_eq!(record.user_id.as_deref(), Some("user-789"));
    assert!(record.anonymous_id.is_none());
    assert_eq!(record.dimensions.execution_mode, "manual");
    assert_eq!(record.dimensions.workflow_name, "Test Workflow");
    assert!(record.flags.is_manual_execution);
    assert!(!record.flags.is_retry);
    assert_eq!(record.metrics.node_count, 2);
    assert_eq!(record.metrics.duration_ms, None);
    assert_eq!(record.properties.workflow_version.as_deref(), Some("1"));
    assert_eq!(record.involves.len(), 2);
    assert_eq!(record.involves[0].role, "WorkflowExecution");
    assert_eq!(record.involves[0].id, "exec-456");
    assert_eq!(record.involves[1].role, "Workflow");
    assert_eq!(record.involves[1].id, "workflow-123");
}

#[test]
fn test_completed_event_duration() {
    let mut ctx = base_context();
    ctx.finished_at = Some(Utc.with_ymd_and_hms(2023, 1, 1, 10, 1, 30).unwrap());
    ctx.run = Some(RunSummary {
        status: Some("success".into()),
        error: None,
    });

    let record = build_event(EventKind::Completed, &ctx, &BuildInfo::default()).unwrap();

    assert_eq!(record.event, "Workflow Completed");
    assert_eq!(record.dimensions.status.as_deref(), Some("success"));
    assert_eq!(record.metrics.duration_ms, Some(90_000));
}

#[test]
fn test_started_event_never_reports_duration() {
    let mut ctx = base_context();
    ctx.finished_at = Some(Utc.with_ymd_and_hms(2023, 1, 1, 10, 1, 30).unwrap());

    let record = build_event(EventKind::Started, &ctx, &BuildInfo::default()).unwrap();
    assert_eq!(record.metrics.duration_ms, None);
}

#[test]
fn test_failed_event_with_node_error() {
    let mut ctx = base_context();
    ctx.finished_at = Some(Utc.with_ymd_and_hms(2023, 1, 1, 10, 0, 5).unwrap());
    ctx.run = Some(RunSummary {
        status: Some("error".into()),
        error: Some(RunError {
            name: Some("NodeOperationError".into()),
            message: Some("HTTP request failed".into()),
            stack: Some("NodeOperationError: HTTP request failed\n  at ...".into()),
            node: Some(ErrorNode {
                id: "node-2".into(),
                name: "HTTP Request".into(),
            }),
        }),
    });

    let record = build_event(EventKind::Failed, &ctx, &BuildInfo::default()).unwrap();

    assert_eq!(record.event, "Workflow Failed");
    assert_eq!(record.dimensions.status.as_deref(), Some("error"));
    assert_eq!(record.dimensions.error_type.as_deref(), Some("NodeOperationError"));
    assert_eq!(record.properties.error_message.as_deref(), Some("HTTP request failed"));
    assert_eq!(record.properties.error_node_id.as_deref(), Some("node-2"));
    assert_eq!(record.properties.error_node_name.as_deref(), Some("HTTP Request"));
    assert!(record.properties.error_stack.is_some());
}

#[test]
fn test_cancelled_event_status_normalization() {
    let mut ctx = base_context();
    ctx.finished_at = Some(Utc.with_ymd_and_hms(2023, 1, 1, 10, 0, 10).unwrap());
    ctx.run = Some(RunSummary {
        status: Some("canceled".into()),
        error: None,
    });

    let record = build_event(EventKind::Cancelled, &ctx, &BuildInfo::default()).unwrap();
    assert_eq!(record.event, "Workflow Cancelled");
    assert_eq!(record.dimensions.status.as_deref(), Some("cancelled"));
}

#[test]
fn test_status_normalization_table() {
    assert_eq!(normalize_status("success"), "success");
    assert_eq!(normalize_status("error"), "error");
    assert_eq!(normalize_status("cancelled"), "cancelled");
    assert_eq!(normalize_status("canceled"), "cancelled");
    assert_eq!(normalize_status("crashed"), "error");
    assert_eq!(normalize_status("waiting"), "waiting");
    assert_eq!(normalize_status("running"), "running");
    assert_eq!(normalize_status("something-new"), "something-new");
}

#[test]
fn test_retry_flags() {
    let mut ctx = base_context();
    ctx.mode = "retry".into();
    ctx.retry_of = Some("exec-123".into());

    let record = build_event(EventKind::Started, &ctx, &BuildInfo::default()).unwrap();

    assert!(record.flags.is_retry);
    assert!(!record.flags.is_manual_execution);
    assert_eq!(record.properties.retry_of.as_deref(), Some("exec-123"));
    assert_eq!(record.dimensions.trigger_type.as_deref(), Some("retry"));
}

#[test]
fn test_anonymous_id_when_no_user() {
    let mut ctx = base_context();
    ctx.user_id = None;

    let record = build_event(EventKind::Started, &ctx, &BuildInfo::default()).unwrap();

    assert!(record.user_id.is_none());
    assert_eq!(record.anonymous_id.as_deref(), Some("anon_exec-456"));
}

#[test]
fn test_anonymous_id_short_execution_id() {
    let mut ctx = base_context();
    ctx.user_id = None;
    ctx.execution_id = "ab".into();

    let record = build_event(EventKind::Started, &ctx, &BuildInfo::default()).unwrap();
    assert_eq!(record.anonymous_id.as_deref(), Some("anon_ab"));
}

#[test]
fn test_trigger_type_schedule_wins() {
    let mut ctx = base_context();
    ctx.mode = "trigger".into();
    ctx.workflow.nodes = vec![
        node("Webhook", "n8n-nodes-base.webhook"),
        node("Every Morning", "n8n-nodes-base.scheduleTrigger"),
    ];

    let (trigger_type, trigger_node) = derive_trigger_type(&ctx);
    assert_eq!(trigger_type, "schedule");
    assert_eq!(trigger_node.as_deref(), Some("Every Morning"));
}

#[test]
fn test_trigger_type_cron_counts_as_schedule() {
    let mut ctx = base_context();
    ctx.mode = "trigger".into();
    ctx.workflow.nodes = vec![node("Cron", "n8n-nodes-base.cron")];

    let (trigger_type, _) = derive_trigger_type(&ctx);
    assert_eq!(trigger_type, "schedule");
}

#[test]
fn test_trigger_type_webhook_fallback() {
    let mut ctx = base_context();
    ctx.mode = "trigger".into();
    ctx.workflow.nodes = vec![
        node("Set", "n8n-nodes-base.set"),
        node("Incoming", "n8n-nodes-base.webhook"),
    ];

    let (trigger_type, trigger_node) = derive_trigger_type(&ctx);
    assert_eq!(trigger_type, "webhook");
    assert_eq!(trigger_node.as_deref(), Some("Incoming"));
}

#[test]
fn test_trigger_type_generic_trigger() {
    let mut ctx = base_context();
    ctx.mode = "trigger".into();
    ctx.workflow.nodes = vec![node("Set", "n8n-nodes-base.set")];

    let (trigger_type, trigger_node) = derive_trigger_type(&ctx);
    assert_eq!(trigger_type, "trigger");
    assert!(trigger_node.is_none());
}

#[test]
fn test_trigger_type_direct_modes() {
    for mode in ["manual", "webhook", "cli"] {
        let mut ctx = base_context();
        ctx.mode = mode.into();
        let (trigger_type, _) = derive_trigger_type(&ctx);
        assert_eq!(trigger_type, mode);
    }
}

#[test]
fn test_classify_run_error_prefers_name() {
    let err = RunError {
        name: Some("NodeOperationError".into()),
        message: Some("ECONNREFUSED 127.0.0.1:80".into()),
        ..Default::default()
    };
    assert_eq!(classify_run_error(&err), "NodeOperationError");
}

#[test]
fn test_classify_run_error_errno_substrings() {
    for (message, expected) in [
        ("connect ECONNREFUSED 10.0.0.1:443", "ConnectionRefused"),
        ("request ETIMEDOUT", "Timeout"),
        ("getaddrinfo ENOTFOUND example.invalid", "DNSError"),
        ("something else entirely", "Unknown"),
    ] {
        let err = RunError {
            message: Some(message.into()),
            ..Default::default()
        };
        assert_eq!(classify_run_error(&err), expected, "message: {message}");
    }
}

#[test]
fn test_zero_nodes() {
    let mut ctx = base_context();
    ctx.workflow.nodes.clear();

    let record = build_event(EventKind::Started, &ctx, &BuildInfo::default()).unwrap();
    assert_eq!(record.metrics.node_count, 0);
}

#[test]
fn test_built_records_always_validate() {
    // Property: validate(build(ctx)) holds for any non-pathological context.
    let mut contexts = vec![base_context()];

    let mut anon = base_context();
    anon.user_id = None;
    contexts.push(anon);

    let mut failed = base_context();
    failed.run = Some(RunSummary {
        status: Some("crashed".into()),
        error: Some(RunError::default()),
    });
    failed.finished_at = Some(failed.started_at);
    contexts.push(failed);

    for ctx in &contexts {
        for kind in [
            EventKind::Started,
            EventKind::Completed,
            EventKind::Failed,
            EventKind::Cancelled,
        ] {
            let record = build_event(kind, ctx, &BuildInfo::default()).unwrap();
            validate_record(&record).unwrap();
        }
    }
}

#[test]
fn test_context_block_identity() {
    let info = BuildInfo {
        host_version: "1.64.0".into(),
        instance_id: "host-a".into(),
        instance_type: InstanceType::Worker,
        environment: Some("production".into()),
    };

    let record = build_event(EventKind::Started, &base_context(), &info).unwrap();

    assert_eq!(record.context.app.name, "n8n");
    assert_eq!(record.context.app.version, "1.64.0");
    assert_eq!(record.context.library.name, crate::LIBRARY_NAME);
    assert_eq!(record.context.instance.id, "host-a");
    assert_eq!(record.context.instance.instance_type, "worker");
    assert_eq!(record.context.n8n.execution_mode, "manual");
    assert_eq!(record.context.n8n.instance_type, "worker");
    assert_eq!(record.dimensions.environment.as_deref(), Some("production"));
    assert_eq!(record.dimensions.version.as_deref(), Some("1.64.0"));
}

#[test]
fn test_unique_message_ids() {
    let ctx = base_context();
    let a = build_event(EventKind::Started, &ctx, &BuildInfo::default()).unwrap();
    let b = build_event(EventKind::Started, &ctx, &BuildInfo::default()).unwrap();
    assert_ne!(a.message_id, b.message_id);
}

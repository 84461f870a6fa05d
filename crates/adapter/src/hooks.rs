//! Workflow lifecycle hooks
//!
//! Handlers registered here run inside the engine's execution path. The
//! contract is absolute: build the record, hand it to a spawned task,
//! swallow anything that goes wrong. The engine proceeds exactly as if
//! no logger were present.

use std::sync::Arc;

use tracing::{debug, warn};

use execlog_event::{build_event, BuildInfo, EventKind, ExecutionContext};
use execlog_pipeline::PipelineService;

/// Hook name for the start-of-execution callback.
pub const WORKFLOW_EXECUTE_BEFORE: &str = "workflowExecuteBefore";

/// Hook name for the end-of-execution callback.
pub const WORKFLOW_EXECUTE_AFTER: &str = "workflowExecuteAfter";

/// A registered lifecycle handler. The host invokes it with the
/// execution context it assembled for the callback.
pub type LifecycleHandler = Box<dyn Fn(ExecutionContext) + Send + Sync>;

/// The host's handler registration surface.
pub trait LifecycleRegistry {
    fn add_handler(&mut self, name: &'static str, handler: LifecycleHandler);
}

/// Subscribes to workflow lifecycle events and forwards them to the
/// pipeline asynchronously.
pub struct LifecycleAdapter {
    pipeline: Arc<PipelineService>,
    build_info: BuildInfo,
}

impl LifecycleAdapter {
    pub fn new(pipeline: Arc<PipelineService>, build_info: BuildInfo) -> Arc<Self> {
        Arc::new(Self {
            pipeline,
            build_info,
        })
    }

    /// Register both lifecycle handlers with the host.
    pub fn register(self: Arc<Self>, registry: &mut dyn LifecycleRegistry) {
        let adapter = Arc::clone(&self);
        registry.add_handler(
            WORKFLOW_EXECUTE_BEFORE,
            Box::new(move |ctx| adapter.on_start(ctx)),
        );

        registry.add_handler(
            WORKFLOW_EXECUTE_AFTER,
            Box::new(move |ctx| self.on_finish(ctx)),
        );

        debug!("workflow lifecycle handlers registered");
    }

    /// `workflowExecuteBefore`: always a Started event.
    fn on_start(&self, ctx: ExecutionContext) {
        self.dispatch(EventKind::Started, ctx);
    }

    /// `workflowExecuteAfter`: the run status picks the event kind.
    fn on_finish(&self, ctx: ExecutionContext) {
        let status = ctx
            .run
            .as_ref()
            .and_then(|run| run.status.as_deref())
            .unwrap_or_default();

        let kind = match status {
            "success" => EventKind::Completed,
            "canceled" | "cancelled" => EventKind::Cancelled,
            _ => EventKind::Failed,
        };

        self.dispatch(kind, ctx);
    }

    /// Build the record and fire-and-forget it into the pipeline. The
    /// host never awaits this and never sees an error from it.
    fn dispatch(&self, kind: EventKind, ctx: ExecutionContext) {
        let record = match build_event(kind, &ctx, &self.build_info) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    execution_id = %ctx.execution_id,
                    error = %e,
                    "could not build execution record"
                );
                return;
            }
        };

        // Hand off to the runtime; if there is none (host tearing down)
        // the record is dropped rather than raising into the engine.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(
                execution_id = %ctx.execution_id,
                "no async runtime available, dropping execution record"
            );
            return;
        };

        let pipeline = Arc::clone(&self.pipeline);
        handle.spawn(async move {
            pipeline.ingest(record).await;
        });
    }
}

#[cfg(test)]
#[path = "hooks_test.rs"]
mod hooks_test;

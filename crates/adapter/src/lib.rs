//! Host lifecycle bindings
//!
//! The delivery pipeline knows nothing about the workflow engine; this
//! crate is the glue. Two small seams abstract the host:
//!
//! - [`LifecycleRegistry`] - where workflow start/finish handlers are
//!   registered (`workflowExecuteBefore` / `workflowExecuteAfter`)
//! - [`EventBus`] - where process-level signals arrive
//!   (`server-started`, `shutdown`)
//!
//! The [`LifecycleAdapter`] turns lifecycle callbacks into pipeline
//! ingestion, always on a spawned task so the engine's execution path
//! never waits, and never lets an error escape back into the host. The
//! [`IntegrationService`] binds pipeline startup and shutdown to the
//! host's process signals, gated on Kafka actually being configured.

mod hooks;
mod integration;

pub use hooks::{LifecycleAdapter, LifecycleHandler, LifecycleRegistry, WORKFLOW_EXECUTE_AFTER,
    WORKFLOW_EXECUTE_BEFORE};
pub use integration::{EventBus, IntegrationService, SERVER_STARTED, SHUTDOWN};

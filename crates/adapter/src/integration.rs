//! Process-level integration
//!
//! Binds the pipeline's lifecycle to the host's event bus: initialize
//! on `server-started`, tear down on `shutdown`. Both bindings are
//! idempotent - hosts are known to emit signals more than once.
//!
//! Startup is gated on Kafka actually being configured (enable flag set
//! and brokers present); otherwise the service logs one structured
//! warning and stays dormant.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use execlog_config::PipelineConfig;
use execlog_pipeline::PipelineService;

/// Bus event emitted when the host finishes booting.
pub const SERVER_STARTED: &str = "server-started";

/// Bus event emitted when the host begins shutting down.
pub const SHUTDOWN: &str = "shutdown";

/// The host's process-event surface.
pub trait EventBus {
    fn on(&mut self, event: &'static str, handler: Box<dyn Fn() + Send + Sync>);
}

/// Binds pipeline startup/shutdown to host signals.
pub struct IntegrationService {
    pipeline: Arc<PipelineService>,
    config: PipelineConfig,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl IntegrationService {
    pub fn new(pipeline: Arc<PipelineService>, config: PipelineConfig) -> Arc<Self> {
        Arc::new(Self {
            pipeline,
            config,
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        })
    }

    /// Subscribe to the host's start and shutdown signals.
    pub fn bind(self: Arc<Self>, bus: &mut dyn EventBus) {
        let service = Arc::clone(&self);
        bus.on(SERVER_STARTED, Box::new(move || service.on_server_started()));

        bus.on(SHUTDOWN, Box::new(move || self.on_shutdown()));
    }

    /// Handle `server-started`. Repeated signals are absorbed.
    pub fn on_server_started(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        if !self.config.kafka_configured() {
            warn!(
                enabled = self.config.enabled,
                brokers = self.config.kafka.brokers.len(),
                "kafka execution logging not configured; staying dormant"
            );
            return;
        }

        info!("starting execution log pipeline");
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime available, cannot start pipeline");
            return;
        };
        let pipeline = Arc::clone(&self.pipeline);
        handle.spawn(async move {
            pipeline.initialize().await;
        });
    }

    /// Handle `shutdown`. Repeated signals are absorbed.
    pub fn on_shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let pipeline = Arc::clone(&self.pipeline);
        handle.spawn(async move {
            pipeline.shutdown().await;
        });
    }
}

#[cfg(test)]
#[path = "integration_test.rs"]
mod integration_test;

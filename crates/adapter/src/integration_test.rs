//! Tests for the integration service

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use execlog_config::PipelineConfig;
use execlog_pipeline::testing::MockProducer;
use execlog_pipeline::{EventProducer, PipelineService};

use super::*;

/// Bus double capturing subscriptions by event name.
#[derive(Default)]
struct RecordingBus {
    handlers: HashMap<&'static str, Box<dyn Fn() + Send + Sync>>,
}

impl EventBus for RecordingBus {
    fn on(&mut self, event: &'static str, handler: Box<dyn Fn() + Send + Sync>) {
        self.handlers.insert(event, handler);
    }
}

impl RecordingBus {
    fn emit(&self, event: &str) {
        self.handlers[event]();
    }
}

fn config(dir: &TempDir, enabled: bool) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.enabled = enabled;
    config.queue.flush_interval_ms = 60_000;
    config.fallback.directory = dir.path().to_path_buf();
    config
}

fn wired(
    dir: &TempDir,
    enabled: bool,
) -> (Arc<MockProducer>, Arc<PipelineService>, RecordingBus) {
    let config = config(dir, enabled);
    let mock = Arc::new(MockProducer::new());
    let pipeline =
        PipelineService::with_producer(config.clone(), Box::new(Arc::clone(&mock))).unwrap();

    let service = IntegrationService::new(Arc::clone(&pipeline), config);
    let mut bus = RecordingBus::default();
    service.bind(&mut bus);

    (mock, pipeline, bus)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn test_binds_start_and_shutdown() {
    let dir = TempDir::new().unwrap();
    let (_mock, _pipeline, bus) = wired(&dir, true);

    assert!(bus.handlers.contains_key(SERVER_STARTED));
    assert!(bus.handlers.contains_key(SHUTDOWN));
}

#[tokio::test]
async fn test_server_started_initializes_once() {
    let dir = TempDir::new().unwrap();
    let (mock, pipeline, bus) = wired(&dir, true);

    bus.emit(SERVER_STARTED);
    bus.emit(SERVER_STARTED);
    bus.emit(SERVER_STARTED);
    settle().await;

    // Repeated signals are absorbed: one connect, pipeline live.
    assert_eq!(mock.connect_calls(), 1);
    assert!(pipeline.is_enabled());
}

#[tokio::test]
async fn test_unconfigured_stays_dormant() {
    let dir = TempDir::new().unwrap();
    let (mock, pipeline, bus) = wired(&dir, false);

    bus.emit(SERVER_STARTED);
    settle().await;

    assert_eq!(mock.connect_calls(), 0);
    assert!(!pipeline.is_enabled());
}

#[tokio::test]
async fn test_shutdown_signal_tears_down() {
    let dir = TempDir::new().unwrap();
    let (mock, pipeline, bus) = wired(&dir, true);

    bus.emit(SERVER_STARTED);
    settle().await;
    assert!(pipeline.is_enabled());

    bus.emit(SHUTDOWN);
    bus.emit(SHUTDOWN);
    settle().await;

    assert!(!pipeline.is_enabled());
    assert!(!mock.is_connected());
}

//! Test support: a scriptable in-memory producer
//!
//! Used by this crate's own tests and by downstream crates that need a
//! pipeline without a broker. Outcomes are scripted per call; everything
//! the producer saw is recorded for assertions.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use execlog_event::{build_event, BuildInfo, EventKind, ExecutionContext, ExecutionRecord,
    WorkflowDescriptor};

use crate::producer::{EventProducer, ProducerError};

/// Scriptable producer standing in for Kafka.
///
/// By default every operation succeeds. Queue failures with
/// [`fail_next_send`](Self::fail_next_send) /
/// [`fail_next_connect`](Self::fail_next_connect); each scripted outcome
/// is consumed by exactly one call, after which the default applies again.
#[derive(Debug, Default)]
pub struct MockProducer {
    connected: AtomicBool,
    connect_calls: AtomicU64,
    send_calls: AtomicU64,
    connect_script: Mutex<VecDeque<ProducerError>>,
    send_script: Mutex<VecDeque<ProducerError>>,
    sent: Mutex<Vec<ExecutionRecord>>,
    batches: Mutex<Vec<usize>>,
}

impl MockProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A producer that starts connected.
    pub fn connected() -> Self {
        let producer = Self::new();
        producer.connected.store(true, Ordering::SeqCst);
        producer
    }

    /// Script the next send (or batch send) to fail.
    pub fn fail_next_send(&self, error: ProducerError) {
        self.send_script.lock().push_back(error);
    }

    /// Script the next connect to fail.
    pub fn fail_next_connect(&self, error: ProducerError) {
        self.connect_script.lock().push_back(error);
    }

    /// Every record ever handed to `send` / `send_batch`, in order.
    pub fn sent(&self) -> Vec<ExecutionRecord> {
        self.sent.lock().clone()
    }

    /// Batch sizes seen by `send_batch`.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().clone()
    }

    pub fn send_calls(&self) -> u64 {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn connect_calls(&self) -> u64 {
        self.connect_calls.load(Ordering::SeqCst)
    }

    /// Force the connected flag, bypassing connect().
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventProducer for MockProducer {
    async fn connect(&self) -> Result<(), ProducerError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.connect_script.lock().pop_front() {
            self.connected.store(false, Ordering::SeqCst);
            return Err(error);
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    async fn send(&self, record: &ExecutionRecord) -> Result<(), ProducerError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.send_script.lock().pop_front() {
            return Err(error);
        }
        self.sent.lock().push(record.clone());
        Ok(())
    }

    async fn send_batch(&self, records: &[ExecutionRecord]) -> Result<(), ProducerError> {
        if records.is_empty() {
            return Ok(());
        }
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.send_script.lock().pop_front() {
            return Err(error);
        }
        self.batches.lock().push(records.len());
        self.sent.lock().extend(records.iter().cloned());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Build a minimal valid record for tests, keyed by execution id.
pub fn sample_record(execution_id: &str) -> ExecutionRecord {
    let ctx = ExecutionContext {
        execution_id: execution_id.into(),
        workflow: WorkflowDescriptor {
            id: format!("workflow-{execution_id}"),
            name: "Test Workflow".into(),
            nodes: Vec::new(),
            version_id: None,
        },
        mode: "manual".into(),
        user_id: Some("user-1".into()),
        retry_of: None,
        started_at: chrono::Utc::now(),
        finished_at: None,
        run: None,
    };
    build_event(EventKind::Started, &ctx, &BuildInfo::default())
        .expect("sample record must validate")
}

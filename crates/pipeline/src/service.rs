//! Pipeline service - ingestion, batching, and lifecycle
//!
//! Owns every moving part of the delivery path: the bounded queue, the
//! circuit breaker, the producer, the health metrics, and the fallback
//! log. One service instance is shared (`Arc`) between the many host
//! tasks calling [`ingest`](PipelineService::ingest) and the single
//! flusher task draining the queue.
//!
//! Nothing in here returns an error to the caller once the service is
//! built: failures are classified and either retried, written to the
//! fallback log, or - for configuration/authentication failures - cause
//! the pipeline to disable itself until the process restarts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use execlog_config::PipelineConfig;
use execlog_event::ExecutionRecord;

use crate::breaker::{BreakerState, CircuitBreaker};
use crate::classify::{classify, classify_text, Categorized};
use crate::error::PipelineError;
use crate::fallback::FallbackLog;
use crate::metrics::{HealthMetrics, HealthSnapshot};
use crate::producer::{EventProducer, KafkaProducer};
use crate::queue::MessageQueue;

/// The non-blocking delivery pipeline.
pub struct PipelineService {
    config: PipelineConfig,
    queue: MessageQueue<ExecutionRecord>,
    breaker: CircuitBreaker,
    producer: Box<dyn EventProducer>,
    metrics: HealthMetrics,
    fallback: FallbackLog,
    initialized: AtomicBool,
    enabled: AtomicBool,
    shutting_down: AtomicBool,
    flusher: Mutex<Option<JoinHandle<()>>>,

    /// Back-reference handed to the flusher task.
    weak: Weak<PipelineService>,
}

impl PipelineService {
    /// Build the service with a real Kafka producer.
    ///
    /// # Errors
    ///
    /// Fails only on invalid configuration.
    pub fn new(config: PipelineConfig) -> Result<Arc<Self>, PipelineError> {
        let producer = Box::new(KafkaProducer::new(
            config.kafka.clone(),
            config.timeouts.clone(),
        ));
        Self::with_producer(config, producer)
    }

    /// Build the service around any producer - tests inject the mock.
    pub fn with_producer(
        config: PipelineConfig,
        producer: Box<dyn EventProducer>,
    ) -> Result<Arc<Self>, PipelineError> {
        config.validate()?;

        let queue = MessageQueue::new(config.queue.max_size)?;
        let breaker = CircuitBreaker::from_config(&config.breaker)?;
        let fallback = FallbackLog::new(&config.fallback);
        let enabled = config.enabled;

        Ok(Arc::new_cyclic(|weak| Self {
            queue,
            breaker,
            metrics: HealthMetrics::new(),
            fallback,
            producer,
            enabled: AtomicBool::new(enabled),
            initialized: AtomicBool::new(false),
            shutting_down: AtomicBool::new(false),
            flusher: Mutex::new(None),
            weak: weak.clone(),
            config,
        }))
    }

    /// Bring the pipeline up: connect, start the flusher, mark ready.
    ///
    /// Never raises. A configuration or authentication failure on the
    /// initial connect disables the pipeline; any other failure logs a
    /// warning and lets records queue until connectivity returns.
    pub async fn initialize(&self) {
        if !self.config.enabled {
            info!("execution logging disabled by configuration");
            return;
        }
        if self.initialized.load(Ordering::SeqCst) {
            return;
        }

        match self.breaker.execute(|| self.producer.connect()).await {
            Ok(()) => {
                info!(topic = %self.config.kafka.topic, "execution log pipeline connected");
            }
            Err(e) => {
                let categorized = classify(&e);
                categorized.log();
                if categorized.category.disables_pipeline() {
                    self.disable(&categorized);
                    return;
                }
                warn!(
                    category = %categorized.category,
                    "initial kafka connect failed; records will queue until connectivity returns"
                );
            }
        }

        self.spawn_flusher();
        self.initialized.store(true, Ordering::SeqCst);
        info!(
            flush_interval_ms = self.config.queue.flush_interval_ms,
            batch_size = self.config.queue.batch_size,
            queue_max = self.config.queue.max_size,
            "execution log pipeline initialized"
        );
    }

    /// Accept one record from the host, without ever blocking it.
    ///
    /// Fast path: breaker closed, producer connected, queue empty - the
    /// record is sent immediately. Otherwise it is queued for the
    /// flusher; on overflow the evicted record goes to the fallback log.
    pub async fn ingest(&self, record: ExecutionRecord) {
        if !self.is_enabled() {
            return;
        }

        self.metrics.set_queue_depth(self.queue.len());
        self.metrics.set_breaker_state(self.breaker.state());

        let fast_path = self.breaker.state() == BreakerState::Closed
            && self.producer.is_connected()
            && self.queue.is_empty();

        if fast_path {
            match self.breaker.execute(|| self.producer.send(&record)).await {
                Ok(()) => {
                    self.metrics.record_success();
                    return;
                }
                Err(e) => {
                    let categorized = classify(&e);
                    categorized.log();
                    self.metrics.record_failure();

                    if !categorized.should_retry {
                        if categorized.should_fallback {
                            self.fallback.log_record(
                                &format!("Immediate send failed: {}", categorized.category.upper()),
                                &record,
                            );
                        }
                        // Deterministic failures (serialization) drop here.
                        return;
                    }
                    // Retryable: fall through to the queue.
                }
            }
        }

        self.enqueue_with_overflow(record);
        self.metrics.set_queue_depth(self.queue.len());
    }

    /// Drain one batch through the breaker. Called by the flusher tick
    /// and by the shutdown drain.
    pub async fn flush(&self) {
        if self.queue.is_empty() {
            return;
        }
        if self.breaker.state() == BreakerState::Open {
            // The breaker's own timeout gates the next attempt.
            return;
        }

        if !self.producer.is_connected() {
            match self.breaker.execute(|| self.producer.connect()).await {
                Ok(()) => info!("kafka reconnected"),
                Err(e) => {
                    let categorized = classify(&e);
                    categorized.log();
                    if categorized.category.disables_pipeline() {
                        self.disable(&categorized);
                    }
                    return;
                }
            }
        }

        let batch = self.queue.dequeue_batch(self.config.queue.batch_size);
        if batch.is_empty() {
            return;
        }

        let result = self
            .breaker
            .execute(|| async {
                if let [record] = batch.as_slice() {
                    self.producer.send(record).await
                } else {
                    self.producer.send_batch(&batch).await
                }
            })
            .await;

        match result {
            Ok(()) => {
                self.metrics.record_success();
                debug!(count = batch.len(), "flushed batch");
            }
            Err(e) => {
                let categorized = classify(&e);
                categorized.log();
                self.metrics.record_failure();
                self.handle_batch_failure(batch, &categorized);
            }
        }

        self.metrics.set_queue_depth(self.queue.len());
        self.metrics.set_breaker_state(self.breaker.state());
    }

    /// Stop the flusher, drain what we can, disconnect. Idempotent;
    /// never raises.
    pub async fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(handle) = self.flusher.lock().take() {
            handle.abort();
        }

        // Best-effort final drain: keep flushing while progress is made.
        let mut remaining = self.queue.len();
        while remaining > 0 {
            self.flush().await;
            let now = self.queue.len();
            if now >= remaining {
                break;
            }
            remaining = now;
        }

        if !self.queue.is_empty() {
            warn!(
                queued = self.queue.len(),
                "shutting down with undelivered records"
            );
        }

        self.producer.disconnect().await;
        self.initialized.store(false, Ordering::SeqCst);
        self.metrics.snapshot().log_summary();
        info!("execution log pipeline shut down");
    }

    /// The pipeline accepts records only when initialized and enabled.
    pub fn is_enabled(&self) -> bool {
        self.initialized.load(Ordering::SeqCst) && self.enabled.load(Ordering::SeqCst)
    }

    /// Independent copy of the current health metrics.
    pub fn health(&self) -> HealthSnapshot {
        self.metrics.snapshot()
    }

    /// Records currently waiting for the flusher.
    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }

    fn spawn_flusher(&self) {
        let Some(service) = self.weak.upgrade() else {
            return;
        };
        let interval = self.config.queue.flush_interval();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately; skip it so the first
            // real flush happens one interval after startup.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if service.shutting_down.load(Ordering::SeqCst) {
                    break;
                }
                service.flush().await;
            }
        });

        *self.flusher.lock() = Some(handle);
    }

    fn enqueue_with_overflow(&self, record: ExecutionRecord) {
        if let Some(dropped) = self.queue.enqueue(record) {
            let categorized = classify_text("queue full - message dropped");
            categorized.log();
            self.metrics.record_failure();
            self.fallback
                .log_record("Queue overflow - message dropped", &dropped);
        }
    }

    fn handle_batch_failure(&self, batch: Vec<ExecutionRecord>, categorized: &Categorized) {
        if categorized.should_retry {
            // Re-enqueue at the tail; ordering relative to later arrivals
            // is traded for at-least-once delivery.
            for record in batch {
                self.enqueue_with_overflow(record);
            }
        } else if categorized.should_fallback {
            self.fallback.log_batch(
                &format!("Send failed: {}", categorized.category.upper()),
                &batch,
            );
        }

        // Authentication/configuration failures disable the pipeline no
        // matter which branch the batch took.
        if categorized.category.disables_pipeline() {
            self.disable(categorized);
        }
    }

    fn disable(&self, categorized: &Categorized) {
        self.enabled.store(false, Ordering::SeqCst);
        tracing::error!(
            category = %categorized.category,
            "disabling execution log pipeline until restart"
        );
    }
}

impl std::fmt::Debug for PipelineService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineService")
            .field("enabled", &self.is_enabled())
            .field("queue_depth", &self.queue.len())
            .field("breaker", &self.breaker.state().as_str())
            .finish()
    }
}

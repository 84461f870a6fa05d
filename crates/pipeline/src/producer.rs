//! Producer seam and Kafka implementation
//!
//! The pipeline talks to an [`EventProducer`] trait, never to the Kafka
//! client directly - tests swap in the scriptable mock from
//! [`testing`](crate::testing). The real implementation wraps
//! `rdkafka`'s `FutureProducer` with per-operation timeouts and maps
//! client failures onto [`ProducerError`] variants whose wording drives
//! the error classifier.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use thiserror::Error;
use tracing::{debug, info, warn};

use execlog_config::{KafkaConfig, TimeoutConfig};
use execlog_event::ExecutionRecord;

/// Failures surfaced by a producer operation.
///
/// Display strings are part of the contract: the classifier routes on
/// them (`connection failed` -> connection, `timed out` -> timeout, ...).
#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("{operation} timed out: {message}")]
    Timeout {
        operation: &'static str,
        message: String,
    },

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("unknown topic '{topic}': {message}")]
    Topic { topic: String, message: String },

    #[error("send failed: {0}")]
    Send(String),
}

impl ProducerError {
    fn budget(operation: &'static str, timeout: std::time::Duration) -> Self {
        Self::Timeout {
            operation,
            message: format!("exceeded {} ms budget", timeout.as_millis()),
        }
    }
}

/// Abstract producer the pipeline is written against.
#[async_trait]
pub trait EventProducer: Send + Sync {
    /// Establish the connection. Idempotent.
    async fn connect(&self) -> Result<(), ProducerError>;

    /// Tear the connection down. Idempotent, never fails; afterwards
    /// `is_connected()` is false.
    async fn disconnect(&self);

    /// Deliver a single record.
    async fn send(&self, record: &ExecutionRecord) -> Result<(), ProducerError>;

    /// Deliver a batch. An empty batch is a no-op.
    async fn send_batch(&self, records: &[ExecutionRecord]) -> Result<(), ProducerError>;

    /// Last-known connection state.
    fn is_connected(&self) -> bool;
}

#[async_trait]
impl<P: EventProducer + ?Sized> EventProducer for std::sync::Arc<P> {
    async fn connect(&self) -> Result<(), ProducerError> {
        (**self).connect().await
    }

    async fn disconnect(&self) {
        (**self).disconnect().await
    }

    async fn send(&self, record: &ExecutionRecord) -> Result<(), ProducerError> {
        (**self).send(record).await
    }

    async fn send_batch(&self, records: &[ExecutionRecord]) -> Result<(), ProducerError> {
        (**self).send_batch(records).await
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

/// Kafka producer with typed errors and bounded operations.
///
/// Each record becomes one Kafka message: key = `messageId`, value =
/// compact JSON, message timestamp = the record's timestamp in epoch-ms.
pub struct KafkaProducer {
    kafka: KafkaConfig,
    timeouts: TimeoutConfig,
    inner: Mutex<Option<FutureProducer>>,
    connected: AtomicBool,
}

impl KafkaProducer {
    pub fn new(kafka: KafkaConfig, timeouts: TimeoutConfig) -> Self {
        Self {
            kafka,
            timeouts,
            inner: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", self.kafka.brokers.join(","))
            .set("client.id", &self.kafka.client_id)
            .set("message.timeout.ms", self.timeouts.send_ms.to_string());

        // SASL applies only when credentials are configured.
        let protocol = match (self.kafka.ssl, self.kafka.auth.is_some()) {
            (true, true) => "sasl_ssl",
            (true, false) => "ssl",
            (false, true) => "sasl_plaintext",
            (false, false) => "plaintext",
        };
        config.set("security.protocol", protocol);

        if let Some(auth) = &self.kafka.auth {
            config
                .set("sasl.mechanisms", auth.mechanism.as_str())
                .set("sasl.username", &auth.username)
                .set("sasl.password", &auth.password);
        }

        config
    }

    fn current(&self) -> Result<FutureProducer, ProducerError> {
        self.inner
            .lock()
            .clone()
            .ok_or_else(|| ProducerError::Send("producer is not connected".into()))
    }

    fn serialize(record: &ExecutionRecord) -> Result<(String, String, i64), ProducerError> {
        let payload = serde_json::to_string(record)
            .map_err(|e| ProducerError::Serialization(e.to_string()))?;
        Ok((
            record.message_id.to_string(),
            payload,
            record.timestamp.timestamp_millis(),
        ))
    }

    fn map_kafka_error(&self, operation: &'static str, error: &KafkaError) -> ProducerError {
        let text = error.to_string();
        let lower = text.to_lowercase();

        if lower.contains("sasl") || lower.contains("authentic") || lower.contains("authoriz") {
            ProducerError::Authentication(text)
        } else if lower.contains("timed out") || lower.contains("timeout") {
            ProducerError::Timeout {
                operation,
                message: text,
            }
        } else if lower.contains("unknown topic") {
            ProducerError::Topic {
                topic: self.kafka.topic.clone(),
                message: text,
            }
        } else if operation == "connect" || lower.contains("transport") || lower.contains("broker")
        {
            ProducerError::Connection(text)
        } else {
            ProducerError::Send(text)
        }
    }
}

#[async_trait]
impl EventProducer for KafkaProducer {
    async fn connect(&self) -> Result<(), ProducerError> {
        if self.is_connected() {
            return Ok(());
        }

        let producer: FutureProducer = self
            .client_config()
            .create()
            .map_err(|e| self.map_kafka_error("connect", &e))?;

        // The client is lazy; prove connectivity by fetching topic
        // metadata within the connect budget.
        let timeout = self.timeouts.connect();
        let probe = producer.clone();
        let topic = self.kafka.topic.clone();
        let metadata = tokio::time::timeout(
            timeout,
            tokio::task::spawn_blocking(move || {
                probe.client().fetch_metadata(Some(&topic), timeout)
            }),
        )
        .await;

        match metadata {
            Err(_) => Err(ProducerError::budget("connect", timeout)),
            Ok(Err(join_error)) => Err(ProducerError::Connection(join_error.to_string())),
            Ok(Ok(Err(kafka_error))) => Err(self.map_kafka_error("connect", &kafka_error)),
            Ok(Ok(Ok(_))) => {
                *self.inner.lock() = Some(producer);
                self.connected.store(true, Ordering::SeqCst);
                info!(
                    brokers = %self.kafka.brokers.join(","),
                    topic = %self.kafka.topic,
                    "kafka producer connected"
                );
                Ok(())
            }
        }
        // On any failure the partially-built client is dropped here and
        // `inner` stays empty.
    }

    async fn disconnect(&self) {
        let producer = self.inner.lock().take();
        self.connected.store(false, Ordering::SeqCst);

        let Some(producer) = producer else {
            return;
        };

        let timeout = self.timeouts.disconnect();
        let flushed = tokio::time::timeout(
            timeout,
            tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout))),
        )
        .await;

        match flushed {
            Ok(Ok(Ok(()))) => info!("kafka producer disconnected"),
            Ok(Ok(Err(e))) => warn!(error = %e, "kafka flush failed during disconnect"),
            Ok(Err(e)) => warn!(error = %e, "kafka disconnect task failed"),
            Err(_) => warn!(
                timeout_ms = timeout.as_millis() as u64,
                "kafka disconnect timed out"
            ),
        }
    }

    async fn send(&self, record: &ExecutionRecord) -> Result<(), ProducerError> {
        let producer = self.current()?;
        let (key, payload, timestamp) = Self::serialize(record)?;
        let timeout = self.timeouts.send();

        let delivery = tokio::time::timeout(
            timeout,
            producer.send(
                FutureRecord::to(&self.kafka.topic)
                    .key(&key)
                    .payload(&payload)
                    .timestamp(timestamp),
                Timeout::Never,
            ),
        )
        .await;

        match delivery {
            Err(_) => Err(ProducerError::budget("send", timeout)),
            Ok(Err((kafka_error, _))) => Err(self.map_kafka_error("send", &kafka_error)),
            Ok(Ok(_)) => {
                debug!(key = %key, topic = %self.kafka.topic, "record delivered");
                Ok(())
            }
        }
    }

    async fn send_batch(&self, records: &[ExecutionRecord]) -> Result<(), ProducerError> {
        if records.is_empty() {
            return Ok(());
        }

        let producer = self.current()?;
        let serialized = records
            .iter()
            .map(Self::serialize)
            .collect::<Result<Vec<_>, _>>()?;

        let timeout = self.timeouts.send();
        let delivered = tokio::time::timeout(timeout, async {
            for (key, payload, timestamp) in &serialized {
                producer
                    .send(
                        FutureRecord::to(&self.kafka.topic)
                            .key(key)
                            .payload(payload)
                            .timestamp(*timestamp),
                        Timeout::Never,
                    )
                    .await
                    .map_err(|(e, _)| self.map_kafka_error("send", &e))?;
            }
            Ok(())
        })
        .await;

        match delivered {
            Err(_) => Err(ProducerError::budget("send_batch", timeout)),
            Ok(result) => {
                if result.is_ok() {
                    debug!(
                        count = records.len(),
                        topic = %self.kafka.topic,
                        "batch delivered"
                    );
                }
                result
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

//! Non-blocking Kafka delivery pipeline
//!
//! Receives execution records from the lifecycle adapter and delivers
//! them to a Kafka topic without ever blocking, slowing, or failing the
//! workflow engine's execution path.
//!
//! # Architecture
//!
//! ```text
//! [ingest()] ──fast path──→ [breaker] ──→ [producer] ──→ Kafka
//!     │                         │
//!     └──slow path──→ [queue] ──┘ (flusher task, batched)
//!                        │
//!                        └──overflow / non-retryable──→ [fallback log]
//! ```
//!
//! # Key Design
//!
//! - **Never blocks the host**: the slow path enqueues; overflow means an
//!   immediate local fallback write, not back-pressure
//! - **Circuit breaker**: a three-state guard with exponential backoff
//!   short-circuits producer calls while Kafka is down
//! - **At-least-once**: failed batches are re-enqueued or fallback-logged;
//!   consumers deduplicate on `messageId`
//! - **Categorized errors**: every failure maps to a category that decides
//!   retry vs fallback vs drop, and whether the pipeline disables itself
//!
//! # Example
//!
//! ```ignore
//! use execlog_config::PipelineConfig;
//! use execlog_pipeline::PipelineService;
//!
//! let config = PipelineConfig::from_env()?;
//! let service = PipelineService::new(config)?;
//! service.initialize().await;
//!
//! service.ingest(record).await;
//!
//! service.shutdown().await;
//! ```

mod breaker;
mod classify;
mod error;
mod fallback;
mod metrics;
mod producer;
mod queue;
mod service;
pub mod testing;

pub use breaker::{BreakerError, BreakerState, CircuitBreaker};
pub use classify::{classify, classify_text, Categorized, ErrorCategory, Severity};
pub use error::PipelineError;
pub use fallback::{FallbackLog, FALLBACK_FILE_PREFIX};
pub use metrics::{HealthMetrics, HealthSnapshot};
pub use producer::{EventProducer, KafkaProducer, ProducerError};
pub use queue::MessageQueue;
pub use service::PipelineService;

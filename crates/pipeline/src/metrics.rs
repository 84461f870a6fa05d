//! Pipeline health metrics
//!
//! Lock-free counters and gauges updated point-wise from the ingest path
//! and the flusher task. `snapshot()` returns an owned copy - mutating a
//! snapshot never affects later snapshots.

use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::breaker::BreakerState;

/// Atomic counters and gauges for the delivery pipeline.
#[derive(Debug)]
pub struct HealthMetrics {
    success_count: AtomicU64,
    failure_count: AtomicU64,
    queue_depth: AtomicUsize,
    breaker_state: AtomicU8,
    last_success: Mutex<Option<DateTime<Utc>>>,
    last_failure: Mutex<Option<DateTime<Utc>>>,
    start_time: Instant,
}

impl HealthMetrics {
    pub fn new() -> Self {
        Self {
            success_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            queue_depth: AtomicUsize::new(0),
            breaker_state: AtomicU8::new(BreakerState::Closed.as_u8()),
            last_success: Mutex::new(None),
            last_failure: Mutex::new(None),
            start_time: Instant::now(),
        }
    }

    /// Record a successful producer call.
    #[inline]
    pub fn record_success(&self) {
        self.success_count.fetch_add(1, Ordering::Relaxed);
        *self.last_success.lock() = Some(Utc::now());
    }

    /// Record a failed producer call or a dropped record.
    #[inline]
    pub fn record_failure(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        *self.last_failure.lock() = Some(Utc::now());
    }

    /// Update the queue-depth gauge. Depth is unsigned by construction;
    /// a negative value cannot be represented, let alone recorded.
    #[inline]
    pub fn set_queue_depth(&self, depth: usize) {
        self.queue_depth.store(depth, Ordering::Relaxed);
    }

    /// Update the breaker-state gauge.
    #[inline]
    pub fn set_breaker_state(&self, state: BreakerState) {
        self.breaker_state.store(state.as_u8(), Ordering::Relaxed);
    }

    /// Take an independent snapshot of all metrics.
    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            success_count: self.success_count.load(Ordering::Relaxed),
            failure_count: self.failure_count.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
            breaker_state: match self.breaker_state.load(Ordering::Relaxed) {
                1 => "open",
                2 => "half_open",
                _ => "closed",
            },
            last_success: *self.last_success.lock(),
            last_failure: *self.last_failure.lock(),
            uptime_ms: self.start_time.elapsed().as_millis() as u64,
        }
    }

    /// Reset counters and timestamps. Uptime is not reset.
    pub fn reset(&self) {
        self.success_count.store(0, Ordering::Relaxed);
        self.failure_count.store(0, Ordering::Relaxed);
        self.queue_depth.store(0, Ordering::Relaxed);
        self.breaker_state
            .store(BreakerState::Closed.as_u8(), Ordering::Relaxed);
        *self.last_success.lock() = None;
        *self.last_failure.lock() = None;
    }
}

impl Default for HealthMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the pipeline's health.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    pub success_count: u64,
    pub failure_count: u64,
    pub queue_depth: usize,
    pub breaker_state: &'static str,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub uptime_ms: u64,
}

impl HealthSnapshot {
    /// Emit a one-line structured summary, used at shutdown.
    pub fn log_summary(&self) {
        tracing::info!(
            successes = self.success_count,
            failures = self.failure_count,
            queue_depth = self.queue_depth,
            breaker = self.breaker_state,
            uptime_ms = self.uptime_ms,
            "pipeline metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = HealthMetrics::new();
        metrics.record_success();
        metrics.record_success();
        metrics.record_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.success_count, 2);
        assert_eq!(snapshot.failure_count, 1);
        assert!(snapshot.last_success.is_some());
        assert!(snapshot.last_failure.is_some());
    }

    #[test]
    fn test_gauges() {
        let metrics = HealthMetrics::new();
        metrics.set_queue_depth(17);
        metrics.set_breaker_state(BreakerState::Open);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.queue_depth, 17);
        assert_eq!(snapshot.breaker_state, "open");
    }

    #[test]
    fn test_snapshots_are_independent() {
        let metrics = HealthMetrics::new();
        metrics.record_success();

        let mut first = metrics.snapshot();
        first.success_count = 999;

        let second = metrics.snapshot();
        assert_eq!(second.success_count, 1);
    }

    #[test]
    fn test_reset_preserves_uptime() {
        let metrics = HealthMetrics::new();
        metrics.record_success();
        metrics.set_queue_depth(5);
        std::thread::sleep(std::time::Duration::from_millis(5));

        metrics.reset();
        let snapshot = metrics.snapshot();

        assert_eq!(snapshot.success_count, 0);
        assert_eq!(snapshot.failure_count, 0);
        assert_eq!(snapshot.queue_depth, 0);
        assert!(snapshot.last_success.is_none());
        assert!(snapshot.uptime_ms >= 5, "uptime must survive reset");
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = HealthMetrics::new();
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert!(json.get("success_count").is_some());
        assert!(json.get("breaker_state").is_some());
    }
}

//! Circuit breaker guarding the Kafka producer
//!
//! Three states: `Closed` (normal), `Open` (failing, calls short-circuit),
//! `HalfOpen` (probing). Opening arms an exponential backoff on the reset
//! timeout, capped at 8x. A rolling monitoring window resets the counters,
//! but only while `Closed` - in `Open`/`HalfOpen` the counters drive the
//! backoff and must persist.
//!
//! State, counters, and the next-attempt deadline transition together
//! under one mutex; the guarded operation itself runs outside the lock,
//! so concurrent `execute` calls only contend on bookkeeping.

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::PipelineError;

/// Breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }

    /// Numeric gauge value for metrics.
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Closed => 0,
            Self::Open => 1,
            Self::HalfOpen => 2,
        }
    }
}

/// Result of a guarded operation.
#[derive(Debug)]
pub enum BreakerError<E> {
    /// The breaker is open; the operation was not invoked.
    Open,

    /// The operation ran and failed.
    Operation(E),
}

impl<E: fmt::Display> fmt::Display for BreakerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakerError::Open => write!(f, "Circuit breaker is open"),
            BreakerError::Operation(e) => write!(f, "{e}"),
        }
    }
}

/// Maximum backoff multiplier (2^3).
const MAX_BACKOFF_FACTOR: u32 = 8;

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    failures: u32,
    successes: u32,
    last_failure: Option<Instant>,
    next_attempt: Option<Instant>,
    window_start: Instant,
}

/// Three-state circuit breaker with exponential backoff.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    monitoring_period: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a breaker.
    ///
    /// # Errors
    ///
    /// Rejects any non-positive parameter.
    pub fn new(
        failure_threshold: u32,
        reset_timeout: Duration,
        monitoring_period: Duration,
    ) -> Result<Self, PipelineError> {
        if failure_threshold == 0 {
            return Err(PipelineError::BreakerParameter(
                "failure_threshold must be greater than 0".into(),
            ));
        }
        if reset_timeout.is_zero() {
            return Err(PipelineError::BreakerParameter(
                "reset_timeout must be greater than 0".into(),
            ));
        }
        if monitoring_period.is_zero() {
            return Err(PipelineError::BreakerParameter(
                "monitoring_period must be greater than 0".into(),
            ));
        }

        Ok(Self {
            failure_threshold,
            reset_timeout,
            monitoring_period,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                failures: 0,
                successes: 0,
                last_failure: None,
                next_attempt: None,
                window_start: Instant::now(),
            }),
        })
    }

    /// Build from the breaker section of the pipeline config.
    pub fn from_config(config: &execlog_config::BreakerConfig) -> Result<Self, PipelineError> {
        Self::new(
            config.failure_threshold,
            config.reset_timeout(),
            config.monitoring_period(),
        )
    }

    /// Run `op` under the breaker.
    ///
    /// While `Open` and before the backoff deadline, fails immediately
    /// with [`BreakerError::Open`] without invoking `op`. At or past the
    /// deadline the breaker transitions to `HalfOpen` and lets one probe
    /// through; its outcome decides `Closed` vs back to `Open`.
    pub async fn execute<T, E, F, Fut>(&self, op: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        {
            let mut inner = self.inner.lock();
            let now = Instant::now();
            self.sample_window(&mut inner, now);

            if inner.state == BreakerState::Open {
                match inner.next_attempt {
                    Some(deadline) if now < deadline => return Err(BreakerError::Open),
                    _ => {
                        inner.state = BreakerState::HalfOpen;
                        debug!("circuit breaker half-open, probing");
                    }
                }
            }
        }

        match op().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(e) => {
                self.on_failure();
                Err(BreakerError::Operation(e))
            }
        }
    }

    /// Observable state.
    ///
    /// Reports `HalfOpen` once an open breaker's backoff deadline has
    /// passed - the stored transition happens on the next `execute`, but
    /// callers gating on the state (the flusher's early return, the fast
    /// path) must see that a probe is already allowed.
    pub fn state(&self) -> BreakerState {
        let inner = self.inner.lock();
        if inner.state == BreakerState::Open
            && let Some(deadline) = inner.next_attempt
            && Instant::now() >= deadline
        {
            return BreakerState::HalfOpen;
        }
        inner.state
    }

    /// Failures accumulated in the current window/backoff run.
    pub fn failure_count(&self) -> u32 {
        self.inner.lock().failures
    }

    /// Successes observed in the current window.
    pub fn success_count(&self) -> u32 {
        self.inner.lock().successes
    }

    /// How long ago the last failure was observed, if any.
    pub fn last_failure_age(&self) -> Option<Duration> {
        self.inner.lock().last_failure.map(|at| at.elapsed())
    }

    /// Deadline before which an open breaker short-circuits, if armed.
    pub fn next_attempt_in(&self) -> Option<Duration> {
        let inner = self.inner.lock();
        inner
            .next_attempt
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    fn on_success(&self) {
        let mut inner = self.inner.lock();
        inner.successes += 1;

        if inner.state == BreakerState::HalfOpen {
            let failures = inner.failures;
            inner.state = BreakerState::Closed;
            inner.failures = 0;
            inner.next_attempt = None;
            debug!(prev_failures = failures, "circuit breaker closed after successful probe");
        }
    }

    fn on_failure(&self) {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        inner.failures += 1;
        inner.last_failure = Some(now);

        let should_open = match inner.state {
            BreakerState::HalfOpen => true,
            BreakerState::Closed => inner.failures >= self.failure_threshold,
            BreakerState::Open => false,
        };

        if should_open {
            let exponent = inner.failures.saturating_sub(self.failure_threshold);
            let factor = match exponent {
                0..=3 => 1u32 << exponent,
                _ => MAX_BACKOFF_FACTOR,
            };
            let backoff = self.reset_timeout * factor;

            inner.state = BreakerState::Open;
            inner.next_attempt = Some(now + backoff);

            warn!(
                failures = inner.failures,
                backoff_ms = backoff.as_millis() as u64,
                "circuit breaker opened"
            );
        }
    }

    /// Roll the monitoring window. Counters reset only while `Closed`;
    /// in `Open`/`HalfOpen` they feed the backoff calculation.
    fn sample_window(&self, inner: &mut BreakerInner, now: Instant) {
        if now.duration_since(inner.window_start) >= self.monitoring_period {
            inner.window_start = now;
            if inner.state == BreakerState::Closed {
                inner.failures = 0;
                inner.successes = 0;
            }
        }
    }
}

#[cfg(test)]
#[path = "breaker_test.rs"]
mod breaker_test;

//! Error taxonomy and recovery policy
//!
//! Every failure in the delivery path runs through [`classify`], which
//! maps the error's text onto a category carrying the recovery decision:
//! retry (re-enqueue), fallback (local log), or neither (drop).
//!
//! Matching is case-insensitive substring search, first match wins, in
//! the fixed order below. Matching on message text is brittle, but the
//! Kafka client surfaces most failures as opaque strings; structured
//! error types ([`ProducerError`](crate::ProducerError) variants) are
//! worded so they land in the right category.

use std::fmt::Display;

/// Failure categories, in match order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Authentication,
    Connection,
    Timeout,
    Serialization,
    CircuitBreaker,
    QueueOverflow,
    MessageSending,
    Unknown,
}

impl ErrorCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Authentication => "authentication",
            Self::Connection => "connection",
            Self::Timeout => "timeout",
            Self::Serialization => "serialization",
            Self::CircuitBreaker => "circuit_breaker",
            Self::QueueOverflow => "queue_overflow",
            Self::MessageSending => "message_sending",
            Self::Unknown => "unknown",
        }
    }

    /// Uppercase form used in fallback-log reasons.
    pub fn upper(self) -> String {
        self.as_str().to_uppercase()
    }

    /// Categories that permanently disable the pipeline when they occur
    /// during connect or batch send.
    pub const fn disables_pipeline(self) -> bool {
        matches!(self, Self::Configuration | Self::Authentication)
    }
}

impl Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How bad a categorized failure is; drives the log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// A classified error with its recovery policy.
#[derive(Debug, Clone)]
pub struct Categorized {
    pub category: ErrorCategory,
    pub severity: Severity,
    pub should_retry: bool,
    pub should_fallback: bool,

    /// Original error text, kept for logging.
    pub message: String,
}

impl Categorized {
    /// Emit this error to the log at a level matching its severity.
    pub fn log(&self) {
        match self.severity {
            Severity::Critical | Severity::High => tracing::error!(
                category = %self.category,
                retry = self.should_retry,
                fallback = self.should_fallback,
                "{}",
                self.message
            ),
            Severity::Medium => tracing::warn!(
                category = %self.category,
                retry = self.should_retry,
                fallback = self.should_fallback,
                "{}",
                self.message
            ),
            Severity::Low => tracing::debug!(category = %self.category, "{}", self.message),
        }
    }
}

/// Classify an error by its display text.
pub fn classify(error: &(impl Display + ?Sized)) -> Categorized {
    classify_text(&error.to_string())
}

/// Classify raw error text.
///
/// First match wins; serialization errors are deterministic, so neither
/// retry nor fallback would change the outcome - they drop.
pub fn classify_text(message: &str) -> Categorized {
    let lower = message.to_lowercase();
    let contains_any = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    let (category, severity, should_retry, should_fallback) = if contains_any(&[
        "configuration",
        "invalid",
        "missing",
        "broker format",
        "empty topic",
        "empty client",
    ]) {
        (ErrorCategory::Configuration, Severity::Critical, false, true)
    } else if contains_any(&["authentication", "unauthorized", "sasl", "credentials", "auth"]) {
        (ErrorCategory::Authentication, Severity::High, false, true)
    } else if contains_any(&[
        "connection",
        "network",
        "econnrefused",
        "enotfound",
        "ehostunreach",
        "broker unavailable",
        "transport failure",
    ]) {
        (ErrorCategory::Connection, Severity::High, true, true)
    } else if contains_any(&["timeout", "timed out", "etimedout"]) {
        (ErrorCategory::Timeout, Severity::Medium, true, true)
    } else if contains_any(&["serialization", "json", "parse", "stringify"]) {
        (ErrorCategory::Serialization, Severity::Medium, false, false)
    } else if contains_any(&["circuit breaker", "circuit open"]) {
        (ErrorCategory::CircuitBreaker, Severity::Medium, false, true)
    } else if contains_any(&["queue full", "queue overflow", "message dropped"]) {
        (ErrorCategory::QueueOverflow, Severity::Medium, false, true)
    } else if contains_any(&["send", "publish", "produce", "kafka"]) {
        (ErrorCategory::MessageSending, Severity::Medium, true, true)
    } else {
        (ErrorCategory::Unknown, Severity::Medium, true, true)
    };

    Categorized {
        category,
        severity,
        should_retry,
        should_fallback,
        message: message.to_string(),
    }
}

#[cfg(test)]
#[path = "classify_test.rs"]
mod classify_test;

//! Environment variable overrides
//!
//! Deployment environments rarely ship a config file; everything a
//! production install needs can come from `EXECLOG_*` variables layered
//! over file values (or over the defaults).

use std::str::FromStr;

use crate::error::{ConfigError, Result};
use crate::{PipelineConfig, SaslConfig, SaslMechanism};

impl PipelineConfig {
    /// Apply `EXECLOG_*` environment overrides on top of this config.
    ///
    /// Recognized variables:
    ///
    /// | Variable | Overrides |
    /// |---|---|
    /// | `EXECLOG_ENABLED` | `enabled` |
    /// | `EXECLOG_KAFKA_BROKERS` | `kafka.brokers` (comma-separated) |
    /// | `EXECLOG_KAFKA_CLIENT_ID` | `kafka.client_id` |
    /// | `EXECLOG_KAFKA_TOPIC` | `kafka.topic` |
    /// | `EXECLOG_KAFKA_SSL` | `kafka.ssl` |
    /// | `EXECLOG_KAFKA_SASL_USERNAME` / `_PASSWORD` / `_MECHANISM` | `kafka.auth` |
    /// | `EXECLOG_QUEUE_MAX_SIZE` / `_BATCH_SIZE` / `_FLUSH_INTERVAL_MS` | `queue.*` |
    /// | `EXECLOG_BREAKER_FAILURE_THRESHOLD` / `_RESET_TIMEOUT_MS` / `_MONITORING_PERIOD_MS` | `breaker.*` |
    /// | `EXECLOG_TIMEOUT_CONNECT_MS` / `_SEND_MS` / `_DISCONNECT_MS` | `timeouts.*` |
    /// | `EXECLOG_FALLBACK_DIR` / `_MAX_FILE_SIZE` / `_MAX_FILES` | `fallback.*` |
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_bool("EXECLOG_ENABLED")? {
            self.enabled = v;
        }

        if let Some(v) = env_str("EXECLOG_KAFKA_BROKERS") {
            self.kafka.brokers = v
                .split(',')
                .map(|b| b.trim().to_string())
                .filter(|b| !b.is_empty())
                .collect();
        }
        if let Some(v) = env_str("EXECLOG_KAFKA_CLIENT_ID") {
            self.kafka.client_id = v;
        }
        if let Some(v) = env_str("EXECLOG_KAFKA_TOPIC") {
            self.kafka.topic = v;
        }
        if let Some(v) = env_bool("EXECLOG_KAFKA_SSL")? {
            self.kafka.ssl = v;
        }

        let username = env_str("EXECLOG_KAFKA_SASL_USERNAME");
        let password = env_str("EXECLOG_KAFKA_SASL_PASSWORD");
        if let (Some(username), Some(password)) = (username, password) {
            let mechanism = match env_str("EXECLOG_KAFKA_SASL_MECHANISM") {
                Some(m) => SaslMechanism::from_str(&m)?,
                None => SaslMechanism::default(),
            };
            self.kafka.auth = Some(SaslConfig {
                username,
                password,
                mechanism,
            });
        }

        if let Some(v) = env_parse("EXECLOG_QUEUE_MAX_SIZE")? {
            self.queue.max_size = v;
        }
        if let Some(v) = env_parse("EXECLOG_QUEUE_BATCH_SIZE")? {
            self.queue.batch_size = v;
        }
        if let Some(v) = env_parse("EXECLOG_QUEUE_FLUSH_INTERVAL_MS")? {
            self.queue.flush_interval_ms = v;
        }

        if let Some(v) = env_parse("EXECLOG_BREAKER_FAILURE_THRESHOLD")? {
            self.breaker.failure_threshold = v;
        }
        if let Some(v) = env_parse("EXECLOG_BREAKER_RESET_TIMEOUT_MS")? {
            self.breaker.reset_timeout_ms = v;
        }
        if let Some(v) = env_parse("EXECLOG_BREAKER_MONITORING_PERIOD_MS")? {
            self.breaker.monitoring_period_ms = v;
        }

        if let Some(v) = env_parse("EXECLOG_TIMEOUT_CONNECT_MS")? {
            self.timeouts.connect_ms = v;
        }
        if let Some(v) = env_parse("EXECLOG_TIMEOUT_SEND_MS")? {
            self.timeouts.send_ms = v;
        }
        if let Some(v) = env_parse("EXECLOG_TIMEOUT_DISCONNECT_MS")? {
            self.timeouts.disconnect_ms = v;
        }

        if let Some(v) = env_str("EXECLOG_FALLBACK_DIR") {
            self.fallback.directory = v.into();
        }
        if let Some(v) = env_parse("EXECLOG_FALLBACK_MAX_FILE_SIZE")? {
            self.fallback.max_file_size = v;
        }
        if let Some(v) = env_parse("EXECLOG_FALLBACK_MAX_FILES")? {
            self.fallback.max_files = v;
        }
        if let Some(v) = env_bool("EXECLOG_FALLBACK_ROTATE_ON_STARTUP")? {
            self.fallback.rotate_on_startup = v;
        }

        Ok(())
    }
}

fn env_str(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_bool(name: &'static str) -> Result<Option<bool>> {
    match env_str(name) {
        None => Ok(None),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            other => Err(ConfigError::invalid_value(
                "env",
                name,
                format!("expected boolean, got '{other}'"),
            )),
        },
    }
}

fn env_parse<T: FromStr>(name: &'static str) -> Result<Option<T>> {
    match env_str(name) {
        None => Ok(None),
        Some(v) => v.parse::<T>().map(Some).map_err(|_| {
            ConfigError::invalid_value("env", name, format!("could not parse '{v}'"))
        }),
    }
}

//! Configuration validation
//!
//! Runs after parsing and env overrides. A config that passes here is
//! safe to hand to the pipeline: every numeric option is positive,
//! identifiers are non-empty, and broker addresses are well-formed.

use crate::error::{ConfigError, Result};
use crate::PipelineConfig;

pub(crate) fn validate(config: &PipelineConfig) -> Result<()> {
    validate_kafka(config)?;
    validate_queue(config)?;
    validate_breaker(config)?;
    validate_timeouts(config)?;
    validate_fallback(config)?;
    Ok(())
}

fn validate_kafka(config: &PipelineConfig) -> Result<()> {
    let kafka = &config.kafka;

    if kafka.brokers.is_empty() {
        return Err(ConfigError::missing_field("kafka", "brokers"));
    }
    for broker in &kafka.brokers {
        let Some((host, port)) = broker.rsplit_once(':') else {
            return Err(ConfigError::invalid_broker(broker));
        };
        if host.is_empty() || port.parse::<u16>().is_err() {
            return Err(ConfigError::invalid_broker(broker));
        }
    }

    if kafka.client_id.trim().is_empty() {
        return Err(ConfigError::missing_field("kafka", "client_id"));
    }
    if kafka.topic.trim().is_empty() {
        return Err(ConfigError::missing_field("kafka", "topic"));
    }

    if let Some(auth) = &kafka.auth {
        if auth.username.is_empty() {
            return Err(ConfigError::missing_field("kafka.auth", "username"));
        }
        if auth.password.is_empty() {
            return Err(ConfigError::missing_field("kafka.auth", "password"));
        }
    }

    Ok(())
}

fn validate_queue(config: &PipelineConfig) -> Result<()> {
    let queue = &config.queue;

    if queue.max_size == 0 {
        return Err(ConfigError::invalid_value(
            "queue",
            "max_size",
            "must be greater than 0",
        ));
    }
    if queue.batch_size == 0 {
        return Err(ConfigError::invalid_value(
            "queue",
            "batch_size",
            "must be greater than 0",
        ));
    }
    if queue.batch_size > queue.max_size {
        return Err(ConfigError::invalid_value(
            "queue",
            "batch_size",
            format!(
                "must not exceed max_size ({} > {})",
                queue.batch_size, queue.max_size
            ),
        ));
    }
    if queue.flush_interval_ms == 0 {
        return Err(ConfigError::invalid_value(
            "queue",
            "flush_interval_ms",
            "must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_breaker(config: &PipelineConfig) -> Result<()> {
    let breaker = &config.breaker;

    if breaker.failure_threshold == 0 {
        return Err(ConfigError::invalid_value(
            "breaker",
            "failure_threshold",
            "must be greater than 0",
        ));
    }
    if breaker.reset_timeout_ms == 0 {
        return Err(ConfigError::invalid_value(
            "breaker",
            "reset_timeout_ms",
            "must be greater than 0",
        ));
    }
    if breaker.monitoring_period_ms == 0 {
        return Err(ConfigError::invalid_value(
            "breaker",
            "monitoring_period_ms",
            "must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_timeouts(config: &PipelineConfig) -> Result<()> {
    let timeouts = &config.timeouts;

    for (field, value) in [
        ("connect_ms", timeouts.connect_ms),
        ("send_ms", timeouts.send_ms),
        ("disconnect_ms", timeouts.disconnect_ms),
    ] {
        if value == 0 {
            return Err(ConfigError::invalid_value(
                "timeouts",
                field,
                "must be greater than 0",
            ));
        }
    }

    Ok(())
}

fn validate_fallback(config: &PipelineConfig) -> Result<()> {
    let fallback = &config.fallback;

    if fallback.max_file_size == 0 {
        return Err(ConfigError::invalid_value(
            "fallback",
            "max_file_size",
            "must be greater than 0",
        ));
    }
    if fallback.max_files == 0 {
        return Err(ConfigError::invalid_value(
            "fallback",
            "max_files",
            "must be greater than 0",
        ));
    }

    Ok(())
}

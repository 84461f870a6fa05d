//! Pipeline configuration
//!
//! TOML-based configuration with sensible defaults - the pipeline runs
//! with an empty config file, disabled. Only `enabled = true` plus a
//! broker list is required to go live.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use execlog_config::PipelineConfig;
//! use std::str::FromStr;
//!
//! let config = PipelineConfig::from_str("enabled = true").unwrap();
//! assert!(config.enabled);
//! assert_eq!(config.kafka.topic, "n8n-executions");
//! ```
//!
//! # Example Full Config
//!
//! ```toml
//! enabled = true
//!
//! [kafka]
//! brokers = ["kafka-1:9092", "kafka-2:9092"]
//! client_id = "n8n-execution-logger"
//! topic = "n8n-executions"
//! ssl = true
//!
//! [kafka.auth]
//! username = "logger"
//! password = "secret"
//! mechanism = "scram-sha-256"
//!
//! [queue]
//! max_size = 10000
//! batch_size = 100
//! flush_interval_ms = 5000
//!
//! [breaker]
//! failure_threshold = 5
//! reset_timeout_ms = 60000
//! monitoring_period_ms = 30000
//!
//! [timeouts]
//! connect_ms = 10000
//! send_ms = 5000
//! disconnect_ms = 5000
//!
//! [fallback]
//! directory = "logs"
//! max_file_size = 10485760
//! max_files = 5
//! ```
//!
//! Environment variables override file values; see [`PipelineConfig::apply_env`].

mod env;
mod error;
mod validation;

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

pub use error::{ConfigError, Result};

/// Master configuration for the delivery pipeline.
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Master switch. Off by default - the pipeline stays dormant.
    pub enabled: bool,

    pub kafka: KafkaConfig,
    pub queue: QueueConfig,
    pub breaker: BreakerConfig,
    pub timeouts: TimeoutConfig,
    pub fallback: FallbackConfig,
}

impl PipelineConfig {
    /// Load configuration from a TOML file, then apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid
    /// TOML, or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_str(&contents)
    }

    /// Build a configuration from defaults plus env overrides only.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn parse(s: &str) -> Result<Self> {
        let mut config: PipelineConfig = toml::from_str(s).map_err(ConfigError::Parse)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Checks broker addresses, non-empty identifiers, and that every
    /// numeric option is positive (with `batch_size <= max_size`).
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Whether Kafka delivery is actually configured: the master switch
    /// is on and at least one broker is listed.
    pub fn kafka_configured(&self) -> bool {
        self.enabled && !self.kafka.brokers.is_empty()
    }
}

impl FromStr for PipelineConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Kafka connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KafkaConfig {
    /// Bootstrap broker list, `host:port` each.
    pub brokers: Vec<String>,

    pub client_id: String,

    /// Destination topic.
    pub topic: String,

    /// TLS transport.
    pub ssl: bool,

    /// SASL credentials; plaintext when unset.
    pub auth: Option<SaslConfig>,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".into()],
            client_id: "n8n-execution-logger".into(),
            topic: "n8n-executions".into(),
            ssl: false,
            auth: None,
        }
    }
}

/// SASL authentication settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SaslConfig {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub mechanism: SaslMechanism,
}

/// Supported SASL mechanisms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum SaslMechanism {
    #[default]
    #[serde(rename = "plain")]
    Plain,
    #[serde(rename = "scram-sha-256")]
    ScramSha256,
    #[serde(rename = "scram-sha-512")]
    ScramSha512,
}

impl SaslMechanism {
    /// Mechanism name in the form the Kafka client expects.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::ScramSha256 => "SCRAM-SHA-256",
            Self::ScramSha512 => "SCRAM-SHA-512",
        }
    }
}

impl FromStr for SaslMechanism {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "scram-sha-256" => Ok(Self::ScramSha256),
            "scram-sha-512" => Ok(Self::ScramSha512),
            other => Err(ConfigError::invalid_value(
                "kafka.auth",
                "mechanism",
                format!("unknown mechanism '{other}'"),
            )),
        }
    }
}

/// In-memory queue settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Queue capacity; the oldest record is dropped on overflow.
    pub max_size: usize,

    /// Records drained per flush pass.
    pub batch_size: usize,

    /// Milliseconds between flush passes.
    pub flush_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_size: 10_000,
            batch_size: 100,
            flush_interval_ms: 5_000,
        }
    }
}

impl QueueConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

/// Circuit breaker settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures before the breaker opens.
    pub failure_threshold: u32,

    /// Milliseconds the breaker stays open before a half-open probe.
    pub reset_timeout_ms: u64,

    /// Rolling window; counters reset on expiry while closed.
    pub monitoring_period_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_ms: 60_000,
            monitoring_period_ms: 30_000,
        }
    }
}

impl BreakerConfig {
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    pub fn monitoring_period(&self) -> Duration {
        Duration::from_millis(self.monitoring_period_ms)
    }
}

/// Per-operation producer timeouts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub connect_ms: u64,
    pub send_ms: u64,
    pub disconnect_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 10_000,
            send_ms: 5_000,
            disconnect_ms: 5_000,
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn send(&self) -> Duration {
        Duration::from_millis(self.send_ms)
    }

    pub fn disconnect(&self) -> Duration {
        Duration::from_millis(self.disconnect_ms)
    }
}

/// Fallback log settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Directory holding `kafka-fallback-<i>.log`.
    pub directory: PathBuf,

    /// Bytes after which the current file rotates.
    pub max_file_size: u64,

    /// Number of rotated files kept; the oldest is deleted.
    pub max_files: usize,

    /// Rotate once on startup before any append.
    pub rotate_on_startup: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            max_file_size: 10 * 1024 * 1024,
            max_files: 5,
            rotate_on_startup: false,
        }
    }
}

//! Rotating local fallback log
//!
//! When Kafka delivery is impossible - the broker is gone, the queue
//! overflowed, or the error category forbids retry - records are
//! preserved as newline-delimited JSON in a numbered file set:
//! `kafka-fallback-0.log` is current, higher indices are older.
//!
//! Rotation is a synchronous shift inside the append path: the oldest
//! file is deleted, every survivor is renamed one index up, and a fresh
//! `-0` file starts. Appends are rare relative to workflow execution and
//! the path is already degraded, so the blocking write is acceptable.
//!
//! Nothing here ever returns an error: the pipeline must not die because
//! its last-resort log is failing. I/O errors are logged and swallowed.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{error, info, warn};

use execlog_config::FallbackConfig;
use execlog_event::time::to_iso_millis;
use execlog_event::ExecutionRecord;

/// File name prefix; the full name is `kafka-fallback-<index>.log`.
pub const FALLBACK_FILE_PREFIX: &str = "kafka-fallback";

/// One fallback line wrapping a single record.
#[derive(Serialize)]
struct SingleEntry<'a> {
    timestamp: String,
    reason: &'a str,
    message: &'a ExecutionRecord,
}

/// One fallback line wrapping a whole batch.
#[derive(Serialize)]
struct BatchEntry<'a> {
    timestamp: String,
    reason: &'a str,
    #[serde(rename = "messageCount")]
    message_count: usize,
    messages: &'a [ExecutionRecord],
}

#[derive(Debug)]
struct FallbackInner {
    current_size: u64,
}

/// Size-rotated fallback log.
#[derive(Debug)]
pub struct FallbackLog {
    directory: PathBuf,
    max_file_size: u64,
    max_files: usize,
    inner: Mutex<FallbackInner>,
}

impl FallbackLog {
    /// Open (or create) the fallback log in the configured directory.
    ///
    /// Never fails: an unusable directory is reported once and every
    /// later append degrades to a logged error.
    pub fn new(config: &FallbackConfig) -> Self {
        if let Err(e) = std::fs::create_dir_all(&config.directory) {
            warn!(
                directory = %config.directory.display(),
                error = %e,
                "could not create fallback log directory"
            );
        }

        let log = Self {
            directory: config.directory.clone(),
            max_file_size: config.max_file_size,
            max_files: config.max_files,
            inner: Mutex::new(FallbackInner { current_size: 0 }),
        };

        {
            let mut inner = log.inner.lock();
            if config.rotate_on_startup && log.current_path().exists() {
                log.rotate(&mut inner);
            }
            inner.current_size = std::fs::metadata(log.current_path())
                .map(|m| m.len())
                .unwrap_or(0);
        }

        log
    }

    /// Append a single record.
    pub fn log_record(&self, reason: &str, record: &ExecutionRecord) {
        let entry = SingleEntry {
            timestamp: to_iso_millis(Utc::now()),
            reason,
            message: record,
        };
        match serde_json::to_string(&entry) {
            Ok(line) => self.append(line),
            Err(e) => error!(error = %e, "could not serialize fallback entry"),
        }
    }

    /// Append a whole batch as one line.
    pub fn log_batch(&self, reason: &str, records: &[ExecutionRecord]) {
        if records.is_empty() {
            return;
        }
        let entry = BatchEntry {
            timestamp: to_iso_millis(Utc::now()),
            reason,
            message_count: records.len(),
            messages: records,
        };
        match serde_json::to_string(&entry) {
            Ok(line) => self.append(line),
            Err(e) => error!(error = %e, "could not serialize fallback batch entry"),
        }
    }

    /// Path of the file an append would currently go to.
    pub fn current_path(&self) -> PathBuf {
        self.file_path(0)
    }

    fn file_path(&self, index: usize) -> PathBuf {
        self.directory
            .join(format!("{FALLBACK_FILE_PREFIX}-{index}.log"))
    }

    fn append(&self, mut line: String) {
        line.push('\n');
        let mut inner = self.inner.lock();

        if inner.current_size + line.len() as u64 > self.max_file_size {
            self.rotate(&mut inner);
        }

        let path = self.current_path();
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| file.write_all(line.as_bytes()));

        match result {
            Ok(()) => inner.current_size += line.len() as u64,
            Err(e) => error!(
                path = %path.display(),
                error = %e,
                "fallback log append failed"
            ),
        }
    }

    /// Shift rotation: drop the oldest index, rename i -> i+1, start a
    /// fresh `-0` file.
    fn rotate(&self, inner: &mut FallbackInner) {
        let oldest = self.file_path(self.max_files - 1);
        if oldest.exists()
            && let Err(e) = std::fs::remove_file(&oldest)
        {
            error!(path = %oldest.display(), error = %e, "could not delete oldest fallback file");
        }

        for index in (0..self.max_files.saturating_sub(1)).rev() {
            let from = self.file_path(index);
            if !from.exists() {
                continue;
            }
            let to = self.file_path(index + 1);
            if let Err(e) = std::fs::rename(&from, &to) {
                error!(
                    from = %from.display(),
                    to = %to.display(),
                    error = %e,
                    "could not rotate fallback file"
                );
            }
        }

        inner.current_size = 0;
        info!(directory = %self.directory.display(), "fallback log rotated");
    }
}

#[cfg(test)]
#[path = "fallback_test.rs"]
mod fallback_test;

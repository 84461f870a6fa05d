//! Tests for the rotating fallback log

use tempfile::TempDir;

use execlog_config::FallbackConfig;

use super::*;
use crate::testing::sample_record;

fn config(dir: &TempDir, max_file_size: u64, max_files: usize) -> FallbackConfig {
    FallbackConfig {
        directory: dir.path().to_path_buf(),
        max_file_size,
        max_files,
        rotate_on_startup: false,
    }
}

fn read_lines(path: &std::path::Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is a JSON object"))
        .collect()
}

#[test]
fn test_single_entry_format() {
    let dir = TempDir::new().unwrap();
    let log = FallbackLog::new(&config(&dir, 1024 * 1024, 3));

    let record = sample_record("exec-1");
    log.log_record("Queue overflow - message dropped", &record);

    let lines = read_lines(&log.current_path());
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["reason"], "Queue overflow - message dropped");
    assert!(lines[0]["timestamp"].is_string());
    assert_eq!(lines[0]["message"]["event"], "Workflow Started");
    assert_eq!(
        lines[0]["message"]["involves"][0]["id"],
        "exec-1"
    );
}

#[test]
fn test_batch_entry_format() {
    let dir = TempDir::new().unwrap();
    let log = FallbackLog::new(&config(&dir, 1024 * 1024, 3));

    let records = vec![sample_record("a"), sample_record("b"), sample_record("c")];
    log.log_batch("Send failed: AUTHENTICATION", &records);

    let lines = read_lines(&log.current_path());
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["reason"], "Send failed: AUTHENTICATION");
    assert_eq!(lines[0]["messageCount"], 3);
    assert_eq!(lines[0]["messages"].as_array().unwrap().len(), 3);
}

#[test]
fn test_empty_batch_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let log = FallbackLog::new(&config(&dir, 1024 * 1024, 3));

    log.log_batch("Send failed: TIMEOUT", &[]);
    assert!(!log.current_path().exists());
}

#[test]
fn test_size_rotation_shifts_files() {
    let dir = TempDir::new().unwrap();
    // Tiny cap: every append rotates once a line exists.
    let log = FallbackLog::new(&config(&dir, 64, 3));

    for i in 0..4 {
        log.log_record("Send failed: CONNECTION", &sample_record(&format!("e{i}")));
    }

    // Newest record in -0, older ones shifted upward, nothing past -2.
    assert!(dir.path().join("kafka-fallback-0.log").exists());
    assert!(dir.path().join("kafka-fallback-1.log").exists());
    assert!(dir.path().join("kafka-fallback-2.log").exists());
    assert!(!dir.path().join("kafka-fallback-3.log").exists());

    let newest = read_lines(&dir.path().join("kafka-fallback-0.log"));
    assert_eq!(newest[0]["message"]["involves"][0]["id"], "e3");
}

#[test]
fn test_rotation_drops_oldest_beyond_max_files() {
    let dir = TempDir::new().unwrap();
    let log = FallbackLog::new(&config(&dir, 64, 2));

    for i in 0..5 {
        log.log_record("Send failed: CONNECTION", &sample_record(&format!("e{i}")));
    }

    // Only two files survive with max_files = 2.
    assert!(dir.path().join("kafka-fallback-0.log").exists());
    assert!(dir.path().join("kafka-fallback-1.log").exists());
    assert!(!dir.path().join("kafka-fallback-2.log").exists());
}

#[test]
fn test_rotate_on_startup() {
    let dir = TempDir::new().unwrap();
    let mut cfg = config(&dir, 1024 * 1024, 3);

    let log = FallbackLog::new(&cfg);
    log.log_record("Send failed: TIMEOUT", &sample_record("before-restart"));
    drop(log);

    cfg.rotate_on_startup = true;
    let log = FallbackLog::new(&cfg);

    // Startup rotation moved the old file to -1; -0 starts empty.
    let shifted = read_lines(&dir.path().join("kafka-fallback-1.log"));
    assert_eq!(shifted.len(), 1);
    assert!(!log.current_path().exists());

    log.log_record("Send failed: TIMEOUT", &sample_record("after-restart"));
    let current = read_lines(&log.current_path());
    assert_eq!(current.len(), 1);
    assert_eq!(current[0]["message"]["involves"][0]["id"], "after-restart");
}

#[test]
fn test_resumes_size_accounting_across_instances() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 400, 3);

    let log = FallbackLog::new(&cfg);
    log.log_record("Send failed: TIMEOUT", &sample_record("one"));
    drop(log);

    // A fresh instance picks up the existing file size, so the next
    // append that would exceed the cap rotates instead of growing -0.
    let log = FallbackLog::new(&cfg);
    log.log_record("Send failed: TIMEOUT", &sample_record("two"));

    assert!(dir.path().join("kafka-fallback-1.log").exists());
}

#[test]
fn test_never_panics_on_unwritable_directory() {
    let cfg = FallbackConfig {
        directory: std::path::PathBuf::from("/proc/definitely-not-writable/execlog"),
        max_file_size: 1024,
        max_files: 2,
        rotate_on_startup: false,
    };

    // Construction and appends degrade to logged errors.
    let log = FallbackLog::new(&cfg);
    log.log_record("Send failed: CONNECTION", &sample_record("x"));
    log.log_batch("Send failed: CONNECTION", &[sample_record("y")]);
}

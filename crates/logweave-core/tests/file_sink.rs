//! File sink integration tests
//!
//! Exercise setup, append, trimming and deletion against real files.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use logweave_core::codec::{JsonDecoder, JsonEncoder, LogEncoder};
use logweave_core::sink::{Diagnostics, FileSink, FileSinkConfig, SinkCore};
use logweave_core::{
    ExecutionMethod, FileError, Filter, FlushMode, LogEntity, LogError, LogLevel, LogSink,
    Persistable,
};
use parking_lot::Mutex;
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

type Messages = Arc<Mutex<Vec<String>>>;

fn recording() -> (Diagnostics, Messages) {
    let messages: Messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();
    (
        Diagnostics::new(move |m| sink.lock().push(m.to_string())),
        messages,
    )
}

fn json_sink(config: FileSinkConfig, execution: ExecutionMethod) -> (FileSink, Messages) {
    let (diagnostics, messages) = recording();
    let sink = FileSink::new(
        SinkCore::new("file", Arc::new(JsonEncoder::default())).with_diagnostics(diagnostics),
        config,
        Arc::new(JsonDecoder::new()),
        execution,
    );
    (sink, messages)
}

fn json_line(entity: &LogEntity) -> String {
    JsonEncoder::default().encode(entity).unwrap()
}

fn write_lines(path: &Path, lines: &[String]) {
    let content: String = lines.iter().map(|l| format!("{l}\r\n")).collect();
    fs::write(path, content).unwrap();
}

fn has_message(messages: &Messages, expected: &str) -> bool {
    messages.lock().iter().any(|m| m == expected)
}

// ============================================================================
// Setup
// ============================================================================

#[test]
fn test_setup_creates_directories_and_file() {
    let dir = TempDir::new().unwrap();
    let config = FileSinkConfig::new(dir.path().join("nested/logs"), "app.jsonl");
    let (sink, messages) = json_sink(config, ExecutionMethod::synchronous());

    sink.setup();

    assert!(sink.path().is_file());
    assert!(has_message(&messages, "File permission 0644 validated successfully"));
    assert!(messages
        .lock()
        .iter()
        .any(|m| m.starts_with("Created log file at:")));
}

#[cfg(unix)]
#[test]
fn test_setup_applies_permission() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let config = FileSinkConfig::new(dir.path(), "app.jsonl").with_permission("0600");
    let (sink, _) = json_sink(config, ExecutionMethod::synchronous());

    sink.setup();

    let mode = fs::metadata(sink.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_setup_reuses_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.jsonl");
    let existing = json_line(&LogEntity::new(LogLevel::Info, "kept"));
    write_lines(&path, &[existing.clone()]);

    let (sink, messages) = json_sink(FileSinkConfig::for_path(&path), ExecutionMethod::synchronous());
    sink.setup();

    assert!(messages
        .lock()
        .iter()
        .any(|m| m.starts_with("Using existing log file at:")));
    assert_eq!(fs::read_to_string(&path).unwrap(), format!("{existing}\r\n"));
}

#[test]
fn test_invalid_permission_is_reported_not_raised() {
    let dir = TempDir::new().unwrap();
    let config = FileSinkConfig::new(dir.path(), "app.jsonl").with_permission("0999");
    let (sink, messages) = json_sink(config, ExecutionMethod::synchronous());

    sink.setup();

    assert!(!sink.path().exists());
    assert!(messages
        .lock()
        .iter()
        .any(|m| m.starts_with("Failed to setup file sink: Invalid file permission '0999'")));
}

#[test]
fn test_directory_path_is_not_a_file() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("taken")).unwrap();
    let config = FileSinkConfig::new(dir.path(), "taken");
    let (sink, messages) = json_sink(config, ExecutionMethod::synchronous());

    sink.setup();

    assert!(messages
        .lock()
        .iter()
        .any(|m| m.starts_with("Failed to setup file sink: Not a file")));
}

#[test]
fn test_dead_sink_keeps_reporting() {
    let dir = TempDir::new().unwrap();
    let config = FileSinkConfig::new(dir.path(), "app.jsonl").with_permission("bogus");
    let (sink, messages) = json_sink(config, ExecutionMethod::synchronous());

    sink.setup();
    sink.log(&LogEntity::new(LogLevel::Error, "lost"));
    sink.flush();

    let messages = messages.lock();
    assert!(messages.iter().any(|m| m.starts_with("Failed to log entity:")));
    assert!(messages.iter().any(|m| m.starts_with("Failed to flush:")));
}

// ============================================================================
// Append
// ============================================================================

#[test]
fn test_log_appends_crlf_terminated_records() {
    let dir = TempDir::new().unwrap();
    let config = FileSinkConfig::new(dir.path(), "app.jsonl").with_flush_mode(FlushMode::Always);
    let (sink, _) = json_sink(config, ExecutionMethod::synchronous());
    sink.setup();

    let first = LogEntity::new(LogLevel::Info, "first");
    let second = LogEntity::new(LogLevel::Warning, "second").with_tag("Net");
    sink.log(&first);
    sink.log(&second);

    assert_eq!(
        fs::read_to_string(sink.path()).unwrap(),
        format!("{}\r\n{}\r\n", json_line(&first), json_line(&second))
    );
}

#[test]
fn test_filtered_entities_are_not_written() {
    let dir = TempDir::new().unwrap();
    let (sink, messages) = json_sink(
        FileSinkConfig::new(dir.path(), "app.jsonl"),
        ExecutionMethod::synchronous(),
    );
    sink.set_filters(vec![Filter::tags("allow", ["Db"])]);
    sink.setup();

    sink.log(&LogEntity::new(LogLevel::Info, "ui").with_tag("Ui"));
    sink.log(&LogEntity::new(LogLevel::Info, "db").with_tag("Db"));

    let content = fs::read_to_string(sink.path()).unwrap();
    assert_eq!(content.lines().count(), 1);
    assert!(content.contains("\"message\":\"db\""));
    assert!(has_message(
        &messages,
        "Log entity ignored by filter: TagFilter allow in sink: file"
    ));
}

#[test]
fn test_asynchronous_appends_keep_order() {
    let dir = TempDir::new().unwrap();
    let (sink, _) = json_sink(
        FileSinkConfig::new(dir.path(), "app.jsonl"),
        ExecutionMethod::asynchronous("file.test").unwrap(),
    );
    sink.setup();

    for i in 0..50 {
        sink.log(&LogEntity::new(LogLevel::Debug, format!("m{i}")));
    }
    sink.wait_until_idle();

    let content = fs::read_to_string(sink.path()).unwrap();
    let lines: Vec<&str> = content.split("\r\n").filter(|l| !l.is_empty()).collect();
    assert_eq!(lines.len(), 50);
    for (i, line) in lines.iter().enumerate() {
        assert!(line.contains(&format!("\"message\":\"m{i}\"")));
    }
}

#[test]
fn test_periodic_flush_mode_sets_up_and_drops_cleanly() {
    let dir = TempDir::new().unwrap();
    let config = FileSinkConfig::new(dir.path(), "app.jsonl")
        .with_flush_mode(FlushMode::Periodic(Duration::from_millis(10)));
    let (sink, messages) = json_sink(config, ExecutionMethod::synchronous());

    sink.setup();
    sink.log(&LogEntity::new(LogLevel::Info, "tick"));
    std::thread::sleep(Duration::from_millis(50));
    drop(sink);

    assert!(!messages.lock().iter().any(|m| m.starts_with("Failed")));
}

// ============================================================================
// Trimming
// ============================================================================

#[test]
fn test_setup_removes_invalid_records() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.jsonl");
    let good = json_line(&LogEntity::new(LogLevel::Info, "good"));
    write_lines(
        &path,
        &[
            "{\"logLevel\":\"INFO\",\"mess".to_string(),
            good.clone(),
            "garbage".to_string(),
        ],
    );

    let (sink, messages) = json_sink(FileSinkConfig::for_path(&path), ExecutionMethod::synchronous());
    sink.setup();

    assert_eq!(fs::read_to_string(&path).unwrap(), format!("{good}\r\n"));
    assert!(has_message(&messages, "Removed 2 invalid log entries"));
}

#[test]
fn test_prepare_storage_leaves_existing_records_alone() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.csv");
    write_lines(&path, &["\"INFO\",\"csv record\"".to_string()]);

    let (sink, messages) = json_sink(FileSinkConfig::for_path(&path), ExecutionMethod::synchronous());
    sink.prepare_storage().unwrap();
    sink.log(&LogEntity::new(LogLevel::Info, "appended"));

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("\"INFO\",\"csv record\"\r\n"));
    assert!(content.contains("appended"));
    assert!(!messages.lock().iter().any(|m| m.starts_with("Removed")));
}

#[test]
fn test_prepare_storage_returns_failures() {
    let dir = TempDir::new().unwrap();
    let config = FileSinkConfig::new(dir.path(), "app.jsonl").with_permission("0999");
    let (sink, _) = json_sink(config, ExecutionMethod::synchronous());

    let err = sink.prepare_storage().unwrap_err();
    assert!(matches!(
        err,
        LogError::File(FileError::InvalidPermission { .. })
    ));
    assert!(!sink.path().exists());
}

#[test]
fn test_size_trim_keeps_newest_suffix() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.jsonl");
    let lines: Vec<String> = (0..10)
        .map(|i| json_line(&LogEntity::new(LogLevel::Info, format!("msg-{i}"))))
        .collect();
    write_lines(&path, &lines);

    // Budget of 80% fits exactly four records with their terminators
    let record_cost = (lines[0].len() + 2) as u64;
    let config = FileSinkConfig::for_path(&path).with_max_file_size(record_cost * 5);
    let (sink, messages) = json_sink(config, ExecutionMethod::synchronous());
    sink.setup();

    let expected: String = lines[6..].iter().map(|l| format!("{l}\r\n")).collect();
    assert_eq!(fs::read_to_string(&path).unwrap(), expected);
    assert!(has_message(&messages, "Trimmed log file by size. Removed 6 entries"));
}

#[test]
fn test_size_within_limit_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.jsonl");
    let line = json_line(&LogEntity::new(LogLevel::Info, "small"));
    // LF terminators would be rewritten as CRLF if the file were touched
    fs::write(&path, format!("{line}\n{line}\n")).unwrap();

    let config = FileSinkConfig::for_path(&path).with_max_file_size(10_000);
    let (sink, messages) = json_sink(config, ExecutionMethod::synchronous());
    sink.setup();

    assert_eq!(fs::read_to_string(&path).unwrap(), format!("{line}\n{line}\n"));
    assert!(!messages.lock().iter().any(|m| m.starts_with("Trimmed")));
}

#[test]
fn test_age_trim_removes_old_and_undated_records() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.jsonl");
    let now = Utc::now();
    let old = json_line(
        &LogEntity::new(LogLevel::Info, "old").with_timestamp(now - chrono::Duration::hours(2)),
    );
    let recent = json_line(
        &LogEntity::new(LogLevel::Info, "recent")
            .with_timestamp(now - chrono::Duration::seconds(10)),
    );
    let undated = json_line(&LogEntity::new(LogLevel::Info, "undated"));
    write_lines(&path, &[old, recent.clone(), undated]);

    let config = FileSinkConfig::for_path(&path).with_max_log_age(Duration::from_secs(3600));
    let (sink, messages) = json_sink(config, ExecutionMethod::synchronous());
    sink.setup();

    assert_eq!(fs::read_to_string(&path).unwrap(), format!("{recent}\r\n"));
    assert!(has_message(&messages, "Trimmed log file by age. Removed 2 old entries"));
}

#[test]
fn test_asynchronous_trim_runs_on_the_queue() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.jsonl");
    let good = json_line(&LogEntity::new(LogLevel::Info, "good"));
    write_lines(&path, &["junk".to_string(), good.clone()]);

    let (sink, messages) = json_sink(
        FileSinkConfig::for_path(&path),
        ExecutionMethod::asynchronous("trim.test").unwrap(),
    );
    sink.setup();
    let appended = LogEntity::new(LogLevel::Info, "after");
    sink.log(&appended);
    sink.wait_until_idle();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        format!("{good}\r\n{}\r\n", json_line(&appended))
    );
    assert!(has_message(&messages, "Removed 1 invalid log entries"));
}

// ============================================================================
// Deletion
// ============================================================================

#[test]
fn test_delete_all_logs() {
    let dir = TempDir::new().unwrap();
    let (sink, _) = json_sink(
        FileSinkConfig::new(dir.path(), "app.jsonl"),
        ExecutionMethod::synchronous(),
    );
    sink.setup();
    sink.log(&LogEntity::new(LogLevel::Info, "bye"));

    sink.delete_all_logs().unwrap();
    assert!(!sink.path().exists());

    let err = sink.delete_all_logs().unwrap_err();
    assert!(matches!(
        err,
        LogError::File(FileError::DeletionFailed { .. })
    ));
}

//! Trim engine for persisted log files.
//!
//! Three phases run in order: invalid-record removal, size trim, age trim.
//! Each phase is a pure function over the file's records; the file sink only
//! rewrites the file when a phase removed something.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::codec::LogDecoder;
use crate::error::{FileError, LogResult};

/// Bytes of the record terminator written after every record.
pub const RECORD_TERMINATOR: &str = "\r\n";

/// Result of one trim phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimOutcome {
    pub kept: Vec<String>,
    pub removed: usize,
}

impl TrimOutcome {
    fn new(kept: Vec<String>, total: usize) -> Self {
        let removed = total - kept.len();
        Self { kept, removed }
    }
}

/// Keep records that decode to an entity.
pub fn remove_invalid(records: Vec<String>, decoder: &dyn LogDecoder) -> TrimOutcome {
    let total = records.len();
    let kept = records
        .into_iter()
        .filter(|record| matches!(decoder.decode(record), Ok(Some(_))))
        .collect();
    TrimOutcome::new(kept, total)
}

/// Byte budget a size trim shrinks the file to: 80% of the maximum.
pub fn size_budget(max_file_size: u64) -> u64 {
    max_file_size / 5 * 4 + max_file_size % 5 * 4 / 5
}

/// Keep the longest suffix of whole records that fits in the size budget.
///
/// Each record costs its UTF-8 length plus the terminator.
pub fn keep_within_size(records: Vec<String>, max_file_size: u64) -> TrimOutcome {
    let total = records.len();
    let budget = size_budget(max_file_size);
    let mut used = 0u64;
    let mut start = total;

    for (index, record) in records.iter().enumerate().rev() {
        let cost = (record.len() + RECORD_TERMINATOR.len()) as u64;
        if used + cost > budget {
            break;
        }
        used += cost;
        start = index;
    }

    let kept = records.into_iter().skip(start).collect();
    TrimOutcome::new(kept, total)
}

/// Oldest timestamp that survives an age trim.
pub fn age_cutoff(now: DateTime<Utc>, max_age: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(max_age)
        .ok()
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Keep records whose timestamp is present and not older than `cutoff`.
///
/// Records that fail to decode or carry no timestamp count as removed.
pub fn keep_newer_than(
    records: Vec<String>,
    decoder: &dyn LogDecoder,
    cutoff: DateTime<Utc>,
) -> TrimOutcome {
    let total = records.len();
    let kept = records
        .into_iter()
        .filter(|record| match decoder.decode(record) {
            Ok(Some(entity)) => entity.timestamp.is_some_and(|ts| ts >= cutoff),
            _ => false,
        })
        .collect();
    TrimOutcome::new(kept, total)
}

/// Replace `path` with `records` atomically: write a sibling temp file, then
/// rename it over the original.
pub(crate) fn rewrite(path: &Path, records: &[String], mode: Option<u32>) -> LogResult<()> {
    let write_failed = |source| FileError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let directory = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::NamedTempFile::new_in(directory).map_err(write_failed)?;

    for record in records {
        temp.write_all(record.as_bytes()).map_err(write_failed)?;
        temp.write_all(RECORD_TERMINATOR.as_bytes())
            .map_err(write_failed)?;
    }
    temp.as_file().sync_all().map_err(write_failed)?;

    if let Some(mode) = mode {
        set_mode(temp.path(), mode).map_err(write_failed)?;
    }

    temp.persist(path).map_err(|e| write_failed(e.error))?;
    Ok(())
}

/// Apply unix permission bits. A no-op on other platforms.
#[cfg(unix)]
pub(crate) fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
pub(crate) fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

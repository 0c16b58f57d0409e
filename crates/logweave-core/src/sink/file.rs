//! File-backed sink.
//!
//! Every operation opens and closes the file on its own; no descriptor is held
//! between calls. Records are terminated with `\r\n`.
//!
//! `setup()` validates the path and permission, creates the file if needed and
//! then trims it in three phases (invalid records, size, age) under the sink's
//! execution method. Only the phases that removed something rewrite the file.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;

use super::flush_timer::FlushTimer;
use super::trim::{self, TrimOutcome, RECORD_TERMINATOR};
use super::{LogSink, Persistable, SinkCore};
use crate::codec::LogDecoder;
use crate::error::{FileError, LogResult};
use crate::execution::ExecutionMethod;
use crate::types::{FlushMode, LogEntity};

/// Highest accepted permission value, `0o777`.
const MAX_PERMISSION: u32 = 0o777;

/// Configuration for a [`FileSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSinkConfig {
    /// Directory holding the log file. Created on setup.
    pub directory: PathBuf,

    pub file_name: String,

    /// Octal permission bits, e.g. `"0644"`
    pub permission: String,

    pub flush_mode: FlushMode,

    /// Records older than this are dropped on setup
    pub max_log_age: Option<Duration>,

    /// When the file exceeds this many bytes, setup trims it to 80%
    pub max_file_size: Option<u64>,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_name: "app.log".to_string(),
            permission: "0644".to_string(),
            flush_mode: FlushMode::Manual,
            max_log_age: None,
            max_file_size: None,
        }
    }
}

impl FileSinkConfig {
    pub fn new(directory: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            file_name: file_name.into(),
            ..Default::default()
        }
    }

    /// Split a full file path into directory and file name.
    pub fn for_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let directory = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(directory, file_name)
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = permission.into();
        self
    }

    pub fn with_flush_mode(mut self, flush_mode: FlushMode) -> Self {
        self.flush_mode = flush_mode;
        self
    }

    pub fn with_max_log_age(mut self, max_log_age: Duration) -> Self {
        self.max_log_age = Some(max_log_age);
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = Some(max_file_size);
        self
    }

    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

/// Parse an octal permission string, accepting `000` through `777`.
pub fn parse_permission(path: &Path, permission: &str) -> Result<u32, FileError> {
    u32::from_str_radix(permission, 8)
        .ok()
        .filter(|mode| *mode <= MAX_PERMISSION)
        .ok_or_else(|| FileError::InvalidPermission {
            path: path.to_path_buf(),
            permission: permission.to_string(),
        })
}

struct FileInner {
    core: SinkCore,
    config: FileSinkConfig,
    path: PathBuf,
    trim_decoder: Arc<dyn LogDecoder>,
}

impl FileInner {
    fn mode(&self) -> Result<u32, FileError> {
        parse_permission(&self.path, &self.config.permission)
    }

    fn prepare_file(&self) -> LogResult<()> {
        let diagnostics = self.core.diagnostics();

        if self.config.file_name.is_empty()
            || self.config.file_name.ends_with(std::path::MAIN_SEPARATOR)
            || self.path.is_dir()
        {
            return Err(FileError::NotAFile {
                path: self.path.clone(),
            }
            .into());
        }

        let mode = self.mode()?;
        diagnostics.report(format!(
            "File permission {} validated successfully",
            self.config.permission
        ));

        fs::create_dir_all(&self.config.directory).map_err(|source| {
            FileError::CreationFailed {
                path: self.config.directory.clone(),
                source,
            }
        })?;

        if self.path.exists() {
            diagnostics.report(format!(
                "Using existing log file at: {}",
                self.path.display()
            ));
        } else {
            self.create_file(mode)?;
            diagnostics.report(format!("Created log file at: {}", self.path.display()));
        }

        // Liveness probe
        OpenOptions::new()
            .write(true)
            .open(&self.path)
            .and_then(|file| file.sync_all())
            .map_err(|source| FileError::OpenFailed {
                path: self.path.clone(),
                source,
            })?;

        Ok(())
    }

    fn create_file(&self, mode: u32) -> Result<(), FileError> {
        let creation_failed = |source| FileError::CreationFailed {
            path: self.path.clone(),
            source,
        };

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }
        options.open(&self.path).map_err(creation_failed)?;

        // The process umask may have masked bits off
        trim::set_mode(&self.path, mode).map_err(creation_failed)
    }

    fn append(&self, text: &str) -> LogResult<()> {
        let write_failed = |source| FileError::WriteFailed {
            path: self.path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|source| FileError::OpenFailed {
                path: self.path.clone(),
                source,
            })?;

        let mut line = String::with_capacity(text.len() + RECORD_TERMINATOR.len());
        line.push_str(text);
        line.push_str(RECORD_TERMINATOR);
        file.write_all(line.as_bytes()).map_err(write_failed)?;

        if self.config.flush_mode == FlushMode::Always {
            file.sync_all().map_err(write_failed)?;
        }
        Ok(())
    }

    fn flush(&self) -> LogResult<()> {
        let file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|source| FileError::OpenFailed {
                path: self.path.clone(),
                source,
            })?;
        file.sync_all().map_err(|source| FileError::WriteFailed {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }

    fn read_records(&self) -> LogResult<Vec<String>> {
        let content = fs::read_to_string(&self.path).map_err(|source| FileError::ReadFailed {
            path: self.path.clone(),
            source,
        })?;
        Ok(self.trim_decoder.split_content(&content))
    }

    /// Rewrite the file when the phase removed something.
    fn apply(
        &self,
        outcome: TrimOutcome,
        describe: impl Fn(usize) -> String,
    ) -> LogResult<Vec<String>> {
        if outcome.removed > 0 {
            trim::rewrite(&self.path, &outcome.kept, Some(self.mode()?))?;
            tracing::debug!(
                path = %self.path.display(),
                removed = outcome.removed,
                "Trimmed log file"
            );
            self.core.diagnostics().report(describe(outcome.removed));
        }
        Ok(outcome.kept)
    }

    fn trim(&self) -> LogResult<()> {
        let decoder = self.trim_decoder.as_ref();

        let records = self.read_records()?;
        let mut records = self.apply(trim::remove_invalid(records, decoder), |n| {
            format!("Removed {n} invalid log entries")
        })?;

        if let Some(max_file_size) = self.config.max_file_size {
            let size = fs::metadata(&self.path)
                .map_err(|source| FileError::ReadFailed {
                    path: self.path.clone(),
                    source,
                })?
                .len();

            if size > max_file_size {
                records = self.apply(trim::keep_within_size(records, max_file_size), |n| {
                    format!("Trimmed log file by size. Removed {n} entries")
                })?;
            }
        }

        if let Some(max_log_age) = self.config.max_log_age {
            let cutoff = trim::age_cutoff(Utc::now(), max_log_age);
            self.apply(trim::keep_newer_than(records, decoder, cutoff), |n| {
                format!("Trimmed log file by age. Removed {n} old entries")
            })?;
        }

        Ok(())
    }

    fn report_flush(&self) {
        if let Err(e) = self.flush() {
            self.core
                .diagnostics()
                .report(format!("Failed to flush: {e}"));
        }
    }
}

/// Sink appending encoded records to a file.
pub struct FileSink {
    // Declared first so the timer stops before the execution method drops
    timer: Mutex<Option<FlushTimer>>,
    inner: Arc<FileInner>,
    execution: ExecutionMethod,
}

impl FileSink {
    /// `trim_decoder` must read what the core's encoder writes.
    pub fn new(
        core: SinkCore,
        config: FileSinkConfig,
        trim_decoder: Arc<dyn LogDecoder>,
        execution: ExecutionMethod,
    ) -> Self {
        let path = config.path();
        Self {
            timer: Mutex::new(None),
            inner: Arc::new(FileInner {
                core,
                config,
                path,
                trim_decoder,
            }),
            execution,
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn config(&self) -> &FileSinkConfig {
        &self.inner.config
    }

    /// Remove the backing file.
    pub fn delete_all_logs(&self) -> LogResult<()> {
        fs::remove_file(&self.inner.path).map_err(|source| FileError::DeletionFailed {
            path: self.inner.path.clone(),
            source,
        })?;
        tracing::info!(path = %self.inner.path.display(), "Deleted log file");
        Ok(())
    }

    /// Validate the path and create the file if needed, without trimming or
    /// arming the flush timer. Unlike [`Persistable::setup`] the failure is
    /// returned to the caller.
    pub fn prepare_storage(&self) -> LogResult<()> {
        self.inner.prepare_file()
    }

    /// Block until queued appends, trims and flushes have run.
    pub fn wait_until_idle(&self) {
        self.execution.wait_until_idle();
    }

    fn arm_flush_timer(&self) {
        let mut slot = self.timer.lock();
        slot.take();

        let FlushMode::Periodic(interval) = self.inner.config.flush_mode else {
            return;
        };
        if interval.is_zero() {
            self.inner
                .core
                .diagnostics()
                .report("Periodic flush interval must be greater than zero");
            return;
        }

        let inner = self.inner.clone();
        let execution = self.execution.clone();
        let tick = move || {
            let inner = inner.clone();
            execution.perform(move || inner.report_flush());
        };

        match FlushTimer::start(self.inner.core.id(), interval, tick) {
            Ok(timer) => *slot = Some(timer),
            Err(e) => self
                .inner
                .core
                .diagnostics()
                .report(format!("Failed to start flush timer: {e}")),
        }
    }
}

impl std::fmt::Debug for FileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSink")
            .field("core", &self.inner.core)
            .field("config", &self.inner.config)
            .field("execution", &self.execution)
            .finish()
    }
}

impl LogSink for FileSink {
    fn core(&self) -> &SinkCore {
        &self.inner.core
    }

    fn log(&self, entity: &LogEntity) {
        let inner = self.inner.clone();
        let entity = entity.clone();

        self.execution.perform(move || {
            inner.core.deliver(&entity, |text| inner.append(text));
        });
    }

    fn as_persistable(&self) -> Option<&dyn Persistable> {
        Some(self)
    }
}

impl Persistable for FileSink {
    fn setup(&self) {
        if let Err(e) = self.inner.prepare_file() {
            tracing::warn!(path = %self.inner.path.display(), error = %e, "File sink setup failed");
            self.inner
                .core
                .diagnostics()
                .report(format!("Failed to setup file sink: {e}"));
            return;
        }

        let inner = self.inner.clone();
        self.execution.perform(move || {
            if let Err(e) = inner.trim() {
                inner
                    .core
                    .diagnostics()
                    .report(format!("Failed to trim logs: {e}"));
            }
        });

        self.arm_flush_timer();
    }

    fn flush(&self) {
        let inner = self.inner.clone();
        self.execution.perform(move || inner.report_flush());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_permission_bounds() {
        let path = Path::new("x.log");
        assert_eq!(parse_permission(path, "0644").unwrap(), 0o644);
        assert_eq!(parse_permission(path, "000").unwrap(), 0);
        assert_eq!(parse_permission(path, "777").unwrap(), 0o777);
        assert!(parse_permission(path, "1000").is_err());
        assert!(parse_permission(path, "0888").is_err());
        assert!(parse_permission(path, "rw-r--r--").is_err());
        assert!(parse_permission(path, "").is_err());
    }

    #[test]
    fn test_config_for_path() {
        let config = FileSinkConfig::for_path("/var/log/app/events.csv");
        assert_eq!(config.directory, PathBuf::from("/var/log/app"));
        assert_eq!(config.file_name, "events.csv");

        let config = FileSinkConfig::for_path("events.csv");
        assert_eq!(config.directory, PathBuf::from("."));
        assert_eq!(config.path(), PathBuf::from("./events.csv"));
    }

    #[test]
    fn test_config_defaults() {
        let config = FileSinkConfig::default();
        assert_eq!(config.permission, "0644");
        assert_eq!(config.flush_mode, FlushMode::Manual);
        assert!(config.max_log_age.is_none());
        assert!(config.max_file_size.is_none());
    }
}

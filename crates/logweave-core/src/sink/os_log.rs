//! Sink emitting into the process's structured log stream (`tracing`).

use std::fmt;
use std::sync::Arc;

use super::{LogSink, SinkCore};
use crate::execution::ExecutionMethod;
use crate::types::{LogEntity, LogLevel};

/// Target of every event this sink emits.
pub const OS_LOG_TARGET: &str = "logweave::os_log";

/// Structured-log type a level maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsLogType {
    Debug,
    Info,
    Default,
    Error,
    Fault,
}

impl OsLogType {
    pub fn for_level(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => OsLogType::Debug,
            LogLevel::Info => OsLogType::Info,
            LogLevel::Warning => OsLogType::Default,
            LogLevel::Error => OsLogType::Error,
            LogLevel::Critical => OsLogType::Fault,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OsLogType::Debug => "debug",
            OsLogType::Info => "info",
            OsLogType::Default => "default",
            OsLogType::Error => "error",
            OsLogType::Fault => "fault",
        }
    }
}

impl fmt::Display for OsLogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
struct Category {
    subsystem: String,
    category: String,
}

impl Category {
    fn emit(&self, level: LogLevel, text: &str) {
        let os_log_type = OsLogType::for_level(level).as_str();
        let (subsystem, category) = (self.subsystem.as_str(), self.category.as_str());

        match OsLogType::for_level(level) {
            OsLogType::Debug => {
                tracing::debug!(target: OS_LOG_TARGET, subsystem, category, os_log_type, "{text}")
            }
            OsLogType::Info => {
                tracing::info!(target: OS_LOG_TARGET, subsystem, category, os_log_type, "{text}")
            }
            OsLogType::Default => {
                tracing::warn!(target: OS_LOG_TARGET, subsystem, category, os_log_type, "{text}")
            }
            OsLogType::Error | OsLogType::Fault => {
                tracing::error!(target: OS_LOG_TARGET, subsystem, category, os_log_type, "{text}")
            }
        }
    }
}

#[derive(Debug)]
pub struct OsLogSink {
    core: Arc<SinkCore>,
    category: Arc<Category>,
    execution: ExecutionMethod,
}

impl OsLogSink {
    pub fn new(
        core: SinkCore,
        subsystem: impl Into<String>,
        category: impl Into<String>,
        execution: ExecutionMethod,
    ) -> Self {
        Self {
            core: Arc::new(core),
            category: Arc::new(Category {
                subsystem: subsystem.into(),
                category: category.into(),
            }),
            execution,
        }
    }

    pub fn wait_until_idle(&self) {
        self.execution.wait_until_idle();
    }
}

impl LogSink for OsLogSink {
    fn core(&self) -> &SinkCore {
        &self.core
    }

    fn log(&self, entity: &LogEntity) {
        let core = self.core.clone();
        let category = self.category.clone();
        let entity = entity.clone();

        self.execution.perform(move || {
            core.deliver(&entity, |text| {
                category.emit(entity.level, text);
                Ok(())
            });
        });
    }
}

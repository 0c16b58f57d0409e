//! Human-readable single-line format: `[timestamp] [LEVEL] [tag] [info] message`.
//!
//! Write-only; there is no matching decoder.

use super::timestamp::TimestampFormat;
use super::LogEncoder;
use crate::error::LogResult;
use crate::types::{LogEntity, LogOption};

#[derive(Debug, Clone)]
pub struct SimpleEncoder {
    timestamp_format: TimestampFormat,
    options: Vec<LogOption>,
    escape: bool,
}

impl SimpleEncoder {
    pub fn new(timestamp_format: TimestampFormat, options: Vec<LogOption>) -> Self {
        Self {
            timestamp_format,
            options,
            escape: true,
        }
    }

    /// Keep raw newlines, carriage returns and tabs in the output.
    pub fn without_escaping(mut self) -> Self {
        self.escape = false;
        self
    }

    fn sanitize(&self, value: &str) -> String {
        if !self.escape {
            return value.to_string();
        }
        value
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    fn file_info(entity: &LogEntity) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(file_name) = &entity.file_name {
            parts.push(file_name.clone());
        }
        match (&entity.function_name, entity.line_number) {
            (Some(function_name), Some(line)) => parts.push(format!("{function_name}:{line}")),
            (Some(function_name), None) => parts.push(function_name.clone()),
            (None, Some(line)) => parts.push(format!(":{line}")),
            (None, None) => {}
        }
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

impl LogEncoder for SimpleEncoder {
    fn encode(&self, entity: &LogEntity) -> LogResult<String> {
        let mut components = Vec::new();

        for option in &self.options {
            match option {
                LogOption::Timestamp => {
                    if let Some(ts) = &entity.timestamp {
                        let rendered = self.timestamp_format.format(ts)?;
                        components.push(format!("[{}]", self.sanitize(&rendered)));
                    }
                }
                LogOption::Level => components.push(format!("[{}]", entity.level)),
                LogOption::Tag => {
                    if let Some(tag) = &entity.tag {
                        components.push(format!("[{}]", self.sanitize(tag)));
                    }
                }
                LogOption::FileInfo => {
                    if let Some(info) = Self::file_info(entity) {
                        components.push(format!("[{}]", self.sanitize(&info)));
                    }
                }
                LogOption::Thread => {
                    if let Some(thread) = &entity.thread {
                        components.push(format!("[{}]", self.sanitize(thread)));
                    }
                }
                LogOption::OtherInfo => {
                    if !entity.extra_info.is_empty() {
                        // BTreeMap iteration is already sorted by key
                        let info = entity
                            .extra_info
                            .iter()
                            .map(|(key, value)| {
                                format!("{}:{}", self.sanitize(key), self.sanitize(value))
                            })
                            .collect::<Vec<_>>()
                            .join(";");
                        components.push(format!("[{info}]"));
                    }
                }
                LogOption::Message => components.push(self.sanitize(&entity.message)),
            }
        }

        Ok(components.join(" "))
    }
}

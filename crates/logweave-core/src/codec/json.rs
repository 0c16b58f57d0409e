//! JSON codec, one object per line.
//!
//! Each entity is a self-contained JSON object, so a file stays readable line
//! by line even after a partial write.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{LogDecoder, LogEncoder};
use crate::error::{LogError, LogResult};
use crate::types::{LogEntity, LogLevel, LogOption};

/// Wire shape of an entity. Absent fields are omitted, never written as null.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonLogEntry {
    log_level: LogLevel,

    message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    line_number: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    thread: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    extra_info: Option<BTreeMap<String, String>>,
}

impl JsonLogEntry {
    /// Keep only the fields whose option is active.
    fn from_entity(entity: &LogEntity, options: &[LogOption]) -> Self {
        let include = |option: LogOption| options.contains(&option);
        let file_info = include(LogOption::FileInfo);

        Self {
            log_level: entity.level,
            message: entity.message.clone(),
            tag: entity.tag.clone().filter(|_| include(LogOption::Tag)),
            date: entity.timestamp.filter(|_| include(LogOption::Timestamp)),
            function_name: entity.function_name.clone().filter(|_| file_info),
            file_name: entity.file_name.clone().filter(|_| file_info),
            line_number: entity.line_number.filter(|_| file_info),
            thread: entity.thread.clone().filter(|_| include(LogOption::Thread)),
            extra_info: Some(entity.extra_info.clone())
                .filter(|info| !info.is_empty() && include(LogOption::OtherInfo)),
        }
    }

    fn into_entity(self) -> LogEntity {
        LogEntity {
            level: self.log_level,
            message: self.message,
            tag: self.tag,
            timestamp: self.date,
            function_name: self.function_name,
            file_name: self.file_name,
            line_number: self.line_number,
            thread: self.thread,
            extra_info: self.extra_info.unwrap_or_default(),
        }
    }
}

/// Encodes entities as single-line JSON objects.
#[derive(Debug, Clone)]
pub struct JsonEncoder {
    options: Vec<LogOption>,
}

impl JsonEncoder {
    pub fn new(options: Vec<LogOption>) -> Self {
        Self { options }
    }
}

impl Default for JsonEncoder {
    fn default() -> Self {
        Self::new(LogOption::ALL.to_vec())
    }
}

impl LogEncoder for JsonEncoder {
    fn encode(&self, entity: &LogEntity) -> LogResult<String> {
        let entry = JsonLogEntry::from_entity(entity, &self.options);
        serde_json::to_string(&entry).map_err(|e| LogError::Encoding(e.to_string()))
    }
}

/// Decodes objects written by [`JsonEncoder`]. `logLevel` and `message` are required.
#[derive(Debug, Clone, Default)]
pub struct JsonDecoder;

impl JsonDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl LogDecoder for JsonDecoder {
    fn decode(&self, text: &str) -> LogResult<Option<LogEntity>> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let entry: JsonLogEntry =
            serde_json::from_str(text).map_err(|e| LogError::Decoding(e.to_string()))?;
        Ok(Some(entry.into_entity()))
    }
}

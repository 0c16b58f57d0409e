//! The log entity.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::LogLevel;

/// A single log occurrence.
///
/// `level` and `message` are always present. Every other field may be absent,
/// and codecs keep absence as absence rather than writing empty placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntity {
    pub level: LogLevel,
    pub message: String,
    pub tag: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub function_name: Option<String>,
    pub file_name: Option<String>,
    pub line_number: Option<u32>,
    /// Descriptive thread identity captured at dispatch time
    pub thread: Option<String>,
    pub extra_info: BTreeMap<String, String>,
}

impl LogEntity {
    /// Create an entity with only the required fields set.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            tag: None,
            timestamp: None,
            function_name: None,
            file_name: None,
            line_number: None,
            thread: None,
            extra_info: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set the source location triple.
    pub fn with_location(
        mut self,
        file_name: impl Into<String>,
        function_name: impl Into<String>,
        line_number: u32,
    ) -> Self {
        self.file_name = Some(file_name.into());
        self.function_name = Some(function_name.into());
        self.line_number = Some(line_number);
        self
    }

    pub fn with_thread(mut self, thread: impl Into<String>) -> Self {
        self.thread = Some(thread.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_info.insert(key.into(), value.into());
        self
    }

    /// Copy of this entity with `metadata` merged into `extra_info`.
    ///
    /// Keys already present on the entity keep their value.
    pub fn merged_with(&self, metadata: &BTreeMap<String, String>) -> LogEntity {
        let mut merged = self.clone();
        for (key, value) in metadata {
            merged
                .extra_info
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_has_only_required_fields() {
        let entity = LogEntity::new(LogLevel::Info, "hello");
        assert_eq!(entity.message, "hello");
        assert!(entity.tag.is_none());
        assert!(entity.timestamp.is_none());
        assert!(entity.extra_info.is_empty());
    }

    #[test]
    fn test_merge_prefers_entity_values() {
        let entity = LogEntity::new(LogLevel::Info, "hello").with_extra("user", "alice");

        let mut metadata = BTreeMap::new();
        metadata.insert("user".to_string(), "bob".to_string());
        metadata.insert("appVersion".to_string(), "1.0.0".to_string());

        let merged = entity.merged_with(&metadata);

        assert_eq!(merged.extra_info["user"], "alice");
        assert_eq!(merged.extra_info["appVersion"], "1.0.0");
        // The original stays untouched for the other sinks.
        assert_eq!(entity.extra_info.len(), 1);
    }
}

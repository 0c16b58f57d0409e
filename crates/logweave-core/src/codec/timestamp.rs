//! Timestamp rendering for the text formats.

use std::fmt::Write;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{LogError, LogResult};

/// A `chrono` strftime pattern used by the CSV and Simple codecs.
///
/// Patterns that carry no UTC offset are read back as UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampFormat {
    pattern: String,
}

impl TimestampFormat {
    /// Millisecond precision with an explicit offset, e.g. `2021-01-01 00:00:00.000+00:00`.
    pub const DEFAULT_PATTERN: &'static str = "%Y-%m-%d %H:%M:%S%.3f%:z";

    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Render a timestamp. Fails when the pattern contains an invalid specifier.
    pub fn format(&self, timestamp: &DateTime<Utc>) -> LogResult<String> {
        let mut rendered = String::new();
        write!(rendered, "{}", timestamp.format(&self.pattern)).map_err(|_| {
            LogError::Encoding(format!("Invalid timestamp pattern: {:?}", self.pattern))
        })?;
        Ok(rendered)
    }

    /// Parse a rendered timestamp, `None` when it does not match the pattern.
    pub fn parse(&self, text: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_str(text, &self.pattern)
            .map(|parsed| parsed.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(text, &self.pattern)
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }
}

impl Default for TimestampFormat {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PATTERN)
    }
}

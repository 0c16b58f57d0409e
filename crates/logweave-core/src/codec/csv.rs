//! CSV codec.
//!
//! One physical record per entity. Every field is wrapped in quotes, inner
//! quotes are doubled, and newline, carriage return and tab are written as the
//! two-character sequences `\n`, `\r`, `\t` so that a record never spans lines.

use std::collections::BTreeMap;

use super::timestamp::TimestampFormat;
use super::tokenizer::{split_fields, split_records};
use super::{LogDecoder, LogEncoder};
use crate::error::{LogError, LogResult};
use crate::types::{LogEntity, LogLevel, LogOption};

/// Default field delimiter.
pub const DEFAULT_DELIMITER: char = ',';

/// Encodes entities as CSV records, fields ordered by the option list.
#[derive(Debug, Clone)]
pub struct CsvEncoder {
    delimiter: char,
    timestamp_format: TimestampFormat,
    options: Vec<LogOption>,
}

impl CsvEncoder {
    pub fn new(delimiter: char, timestamp_format: TimestampFormat, options: Vec<LogOption>) -> Self {
        Self {
            delimiter,
            timestamp_format,
            options,
        }
    }
}

impl LogEncoder for CsvEncoder {
    fn encode(&self, entity: &LogEntity) -> LogResult<String> {
        let mut fields = Vec::with_capacity(self.options.len());

        for option in &self.options {
            let value = match option {
                LogOption::Level => entity.level.as_str().to_string(),
                LogOption::Timestamp => match &entity.timestamp {
                    Some(ts) => self.timestamp_format.format(ts)?,
                    None => String::new(),
                },
                LogOption::Tag => entity.tag.clone().unwrap_or_default(),
                LogOption::FileInfo => format_file_info(entity),
                LogOption::OtherInfo => format_extra_info(&entity.extra_info),
                LogOption::Thread => entity.thread.clone().unwrap_or_default(),
                LogOption::Message => entity.message.clone(),
            };
            fields.push(escape_field(&value));
        }

        Ok(fields.join(&self.delimiter.to_string()))
    }
}

/// Decodes CSV records written by [`CsvEncoder`] with the same options.
///
/// A record with fewer fields than options stops at the last available field,
/// so it only fails when `level` or `message` falls outside the record. Extra
/// trailing fields are ignored.
#[derive(Debug, Clone)]
pub struct CsvDecoder {
    delimiter: char,
    timestamp_format: TimestampFormat,
    options: Vec<LogOption>,
}

impl CsvDecoder {
    pub fn new(delimiter: char, timestamp_format: TimestampFormat, options: Vec<LogOption>) -> Self {
        Self {
            delimiter,
            timestamp_format,
            options,
        }
    }
}

impl LogDecoder for CsvDecoder {
    fn decode(&self, text: &str) -> LogResult<Option<LogEntity>> {
        if text.is_empty() {
            return Ok(None);
        }

        let fields = split_fields(text, self.delimiter);

        let mut level: Option<LogLevel> = None;
        let mut message: Option<String> = None;
        let mut entity = LogEntity::new(LogLevel::Debug, String::new());

        for (option, raw) in self.options.iter().zip(fields.iter()) {
            match option {
                LogOption::Level => level = Some(raw.parse()?),
                LogOption::Timestamp => {
                    entity.timestamp = optional(raw).and_then(|ts| self.timestamp_format.parse(&ts));
                }
                LogOption::Tag => entity.tag = optional(raw),
                LogOption::FileInfo => {
                    let (file_name, function_name, line_number) = parse_file_info(&unescape(raw));
                    entity.file_name = file_name;
                    entity.function_name = function_name;
                    entity.line_number = line_number;
                }
                LogOption::Thread => entity.thread = optional(raw),
                LogOption::OtherInfo => {
                    if let Some(info) = optional(raw) {
                        entity.extra_info = parse_extra_info(&info);
                    }
                }
                LogOption::Message => message = Some(unescape(raw)),
            }
        }

        entity.level = level.ok_or_else(|| {
            LogError::Decoding("Log level is required but was not found".to_string())
        })?;
        entity.message = message.ok_or_else(|| {
            LogError::Decoding("Message is required but was not found".to_string())
        })?;

        Ok(Some(entity))
    }

    fn split_content(&self, content: &str) -> Vec<String> {
        split_records(content)
    }
}

fn escape_field(value: &str) -> String {
    let escaped = value
        .replace('"', "\"\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t");
    format!("\"{escaped}\"")
}

fn unescape(value: &str) -> String {
    value
        .replace("\\n", "\n")
        .replace("\\r", "\r")
        .replace("\\t", "\t")
}

fn optional(raw: &str) -> Option<String> {
    let value = unescape(raw);
    (!value.is_empty()).then_some(value)
}

/// `"<file> <function>:<line>"`, leaving out whatever is absent.
fn format_file_info(entity: &LogEntity) -> String {
    let mut parts = Vec::new();
    if let Some(file_name) = &entity.file_name {
        parts.push(file_name.clone());
    }
    if let Some(function_name) = &entity.function_name {
        match entity.line_number {
            Some(line) => parts.push(format!("{function_name}:{line}")),
            None => parts.push(function_name.clone()),
        }
    }
    parts.join(" ")
}

fn format_extra_info(extra_info: &BTreeMap<String, String>) -> String {
    extra_info
        .iter()
        .map(|(key, value)| format!("{key}:{value}"))
        .collect::<Vec<_>>()
        .join(";")
}

type FileInfo = (Option<String>, Option<String>, Option<u32>);

fn parse_file_info(value: &str) -> FileInfo {
    let Some((file_name, rest)) = value.split_once(' ') else {
        return (None, None, None);
    };
    if file_name.is_empty() || rest.is_empty() {
        return (None, None, None);
    }

    match rest.rfind(':') {
        Some(colon) => {
            let function_name = &rest[..colon];
            let line_number = rest[colon + 1..].parse().ok();
            (
                Some(file_name.to_string()),
                (!function_name.is_empty()).then(|| function_name.to_string()),
                line_number,
            )
        }
        None => (Some(file_name.to_string()), Some(rest.to_string()), None),
    }
}

/// Entries without a `:` are dropped.
fn parse_extra_info(value: &str) -> BTreeMap<String, String> {
    value
        .split(';')
        .filter_map(|pair| pair.split_once(':'))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn encoder(options: &[LogOption]) -> CsvEncoder {
        CsvEncoder::new(DEFAULT_DELIMITER, TimestampFormat::default(), options.to_vec())
    }

    fn decoder(options: &[LogOption]) -> CsvDecoder {
        CsvDecoder::new(DEFAULT_DELIMITER, TimestampFormat::default(), options.to_vec())
    }

    #[test]
    fn test_encode_follows_option_order() {
        let entity = LogEntity::new(LogLevel::Info, "hello").with_tag("Net");
        let encoded = encoder(&[LogOption::Message, LogOption::Tag, LogOption::Level])
            .encode(&entity)
            .unwrap();
        assert_eq!(encoded, r#""hello","Net","INFO""#);
    }

    #[test]
    fn test_quotes_are_doubled() {
        let entity = LogEntity::new(LogLevel::Info, "\"a,b\"");
        let options = [LogOption::Level, LogOption::Message];

        let encoded = encoder(&options).encode(&entity).unwrap();
        assert_eq!(encoded, r#""INFO","""a,b""""#);

        let decoded = decoder(&options).decode(&encoded).unwrap().unwrap();
        assert_eq!(decoded.message, "\"a,b\"");
    }

    #[test]
    fn test_control_characters_are_escaped() {
        let entity = LogEntity::new(LogLevel::Error, "line1\nline2\r\tend");
        let options = [LogOption::Level, LogOption::Message];

        let encoded = encoder(&options).encode(&entity).unwrap();
        assert_eq!(encoded, r#""ERROR","line1\nline2\r\tend""#);
        assert!(!encoded.contains('\n'));

        let decoded = decoder(&options).decode(&encoded).unwrap().unwrap();
        assert_eq!(decoded.message, "line1\nline2\r\tend");
    }

    #[test]
    fn test_absent_fields_encode_as_empty_and_decode_as_absent() {
        let entity = LogEntity::new(LogLevel::Warning, "bare");
        let options = LogOption::ALL;

        let encoded = encoder(&options).encode(&entity).unwrap();
        assert_eq!(encoded, r#""","WARNING","","","","","bare""#);

        let decoded = decoder(&options).decode(&encoded).unwrap().unwrap();
        assert_eq!(decoded, entity);
    }

    #[test]
    fn test_file_info_roundtrip() {
        let entity = LogEntity::new(LogLevel::Debug, "x").with_location("main.rs", "app::run", 42);
        let options = [LogOption::Level, LogOption::FileInfo, LogOption::Message];

        let encoded = encoder(&options).encode(&entity).unwrap();
        assert_eq!(encoded, r#""DEBUG","main.rs app::run:42","x""#);

        let decoded = decoder(&options).decode(&encoded).unwrap().unwrap();
        assert_eq!(decoded.file_name.as_deref(), Some("main.rs"));
        assert_eq!(decoded.function_name.as_deref(), Some("app::run"));
        assert_eq!(decoded.line_number, Some(42));
    }

    #[test]
    fn test_file_info_with_single_group_is_absent() {
        assert_eq!(parse_file_info("run:12"), (None, None, None));
        assert_eq!(parse_file_info(""), (None, None, None));
    }

    #[test]
    fn test_file_info_without_line_number() {
        assert_eq!(
            parse_file_info("lib.rs handler"),
            (Some("lib.rs".into()), Some("handler".into()), None)
        );
        assert_eq!(
            parse_file_info("lib.rs handler:abc"),
            (Some("lib.rs".into()), Some("handler".into()), None)
        );
    }

    #[test]
    fn test_extra_info_drops_entries_without_colon() {
        let parsed = parse_extra_info("user:alice;broken;url:http://x");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["user"], "alice");
        assert_eq!(parsed["url"], "http://x");
    }

    #[test]
    fn test_end_to_end_custom_order() {
        let options = [
            LogOption::Level,
            LogOption::Timestamp,
            LogOption::Message,
            LogOption::Tag,
        ];
        let ts = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let entity = LogEntity::new(LogLevel::Info, "hello, world")
            .with_timestamp(ts)
            .with_tag("Net");

        let encoded = encoder(&options).encode(&entity).unwrap();
        let decoded = decoder(&options).decode(&encoded).unwrap().unwrap();

        assert_eq!(decoded.level, LogLevel::Info);
        assert_eq!(decoded.message, "hello, world");
        assert_eq!(decoded.tag.as_deref(), Some("Net"));
        assert_eq!(decoded.timestamp, Some(ts));
    }

    #[test]
    fn test_short_record_fails_when_message_unreachable() {
        let options = [LogOption::Level, LogOption::Tag, LogOption::Message];
        let err = decoder(&options).decode(r#""INFO","Net""#).unwrap_err();
        assert!(matches!(err, LogError::Decoding(_)));
    }

    #[test]
    fn test_short_record_succeeds_when_required_fields_present() {
        let options = [LogOption::Level, LogOption::Message, LogOption::Tag];
        let decoded = decoder(&options).decode(r#""INFO","hi""#).unwrap().unwrap();
        assert_eq!(decoded.message, "hi");
        assert!(decoded.tag.is_none());
    }

    #[test]
    fn test_long_record_ignores_trailing_fields() {
        let options = [LogOption::Level, LogOption::Message];
        let decoded = decoder(&options)
            .decode(r#""INFO","hi","extra","more""#)
            .unwrap()
            .unwrap();
        assert_eq!(decoded.message, "hi");
    }

    #[test]
    fn test_unknown_level_fails() {
        let options = [LogOption::Level, LogOption::Message];
        assert!(decoder(&options).decode(r#""LOUD","hi""#).is_err());
        assert!(decoder(&options).decode("garbage").is_err());
    }

    #[test]
    fn test_empty_input_is_absent() {
        assert!(decoder(&LogOption::ALL).decode("").unwrap().is_none());
    }
}

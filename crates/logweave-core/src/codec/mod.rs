//! Encoders and decoders for the persisted text formats.
//!
//! | Format | Encoder | Decoder | Record boundary |
//! |--------|---------|---------|-----------------|
//! | CSV    | [`CsvEncoder`] | [`CsvDecoder`] | newline outside quotes |
//! | JSON   | [`JsonEncoder`] | [`JsonDecoder`] | newline |
//! | Simple | [`SimpleEncoder`] | (write-only) | newline |
//!
//! [`LogFormat`] describes a codec declaratively and builds a matching
//! encoder/decoder pair, which is what a file sink needs for trimming.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::LogResult;
use crate::types::{LogEntity, LogOption};

pub mod csv;
pub mod json;
pub mod simple;
pub mod timestamp;
pub mod tokenizer;

pub use csv::{CsvDecoder, CsvEncoder};
pub use json::{JsonDecoder, JsonEncoder};
pub use simple::SimpleEncoder;
pub use timestamp::TimestampFormat;

/// Renders an entity as one record of text.
pub trait LogEncoder: Send + Sync {
    fn encode(&self, entity: &LogEntity) -> LogResult<String>;
}

/// Reads entities back from persisted text.
pub trait LogDecoder: Send + Sync {
    /// `Ok(None)` for empty input, an error for malformed input.
    fn decode(&self, text: &str) -> LogResult<Option<LogEntity>>;

    /// Split raw file contents into record strings.
    fn split_content(&self, content: &str) -> Vec<String> {
        split_lines(content)
    }
}

/// Plain newline splitting with spaces and tabs trimmed and blank lines dropped.
pub fn split_lines(content: &str) -> Vec<String> {
    content
        .split(['\n', '\r'])
        .map(|line| line.trim_matches([' ', '\t']))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Codec selection inside a [`LogFormat`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "codec", rename_all = "snake_case")]
pub enum Codec {
    Csv {
        #[serde(default = "default_delimiter")]
        delimiter: char,
    },
    Json,
    Simple {
        #[serde(default = "default_escape")]
        escape: bool,
    },
}

fn default_delimiter() -> char {
    csv::DEFAULT_DELIMITER
}

fn default_escape() -> bool {
    true
}

fn default_options() -> Vec<LogOption> {
    LogOption::ALL.to_vec()
}

fn default_pattern() -> String {
    TimestampFormat::DEFAULT_PATTERN.to_string()
}

/// Declarative description of a text format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFormat {
    #[serde(flatten)]
    pub codec: Codec,

    #[serde(default = "default_options")]
    pub options: Vec<LogOption>,

    #[serde(default = "default_pattern")]
    pub timestamp_pattern: String,
}

impl LogFormat {
    pub fn csv(options: Vec<LogOption>) -> Self {
        Self {
            codec: Codec::Csv {
                delimiter: csv::DEFAULT_DELIMITER,
            },
            options,
            timestamp_pattern: default_pattern(),
        }
    }

    pub fn json(options: Vec<LogOption>) -> Self {
        Self {
            codec: Codec::Json,
            options,
            timestamp_pattern: default_pattern(),
        }
    }

    pub fn simple(options: Vec<LogOption>) -> Self {
        Self {
            codec: Codec::Simple { escape: true },
            options,
            timestamp_pattern: default_pattern(),
        }
    }

    pub fn with_timestamp_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.timestamp_pattern = pattern.into();
        self
    }

    fn timestamp_format(&self) -> TimestampFormat {
        TimestampFormat::new(self.timestamp_pattern.clone())
    }

    pub fn encoder(&self) -> Arc<dyn LogEncoder> {
        match &self.codec {
            Codec::Csv { delimiter } => Arc::new(CsvEncoder::new(
                *delimiter,
                self.timestamp_format(),
                self.options.clone(),
            )),
            Codec::Json => Arc::new(JsonEncoder::new(self.options.clone())),
            Codec::Simple { escape } => {
                let encoder = SimpleEncoder::new(self.timestamp_format(), self.options.clone());
                if *escape {
                    Arc::new(encoder)
                } else {
                    Arc::new(encoder.without_escaping())
                }
            }
        }
    }

    /// The matching decoder, `None` for the write-only Simple format.
    pub fn decoder(&self) -> Option<Arc<dyn LogDecoder>> {
        match &self.codec {
            Codec::Csv { delimiter } => Some(Arc::new(CsvDecoder::new(
                *delimiter,
                self.timestamp_format(),
                self.options.clone(),
            ))),
            Codec::Json => Some(Arc::new(JsonDecoder::new())),
            Codec::Simple { .. } => None,
        }
    }
}

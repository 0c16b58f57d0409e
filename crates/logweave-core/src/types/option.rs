//! Field selection for codecs.

use serde::{Deserialize, Serialize};

/// A field that participates in encoding and decoding.
///
/// An ordered list of options drives field order for CSV and Simple output;
/// JSON only uses it to decide which fields are included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogOption {
    /// e.g. `[2019-05-04 13:25:55.000+02:00]`
    Timestamp,
    /// e.g. `[DEBUG]`
    Level,
    /// e.g. `[Network]`
    Tag,
    /// File name, function name and line number, e.g. `[main.rs run:25]`
    FileInfo,
    Thread,
    /// The entity's extra info, e.g. `[userId:12345678]`
    OtherInfo,
    Message,
}

impl LogOption {
    /// Every option in canonical order.
    pub const ALL: [LogOption; 7] = [
        LogOption::Timestamp,
        LogOption::Level,
        LogOption::Tag,
        LogOption::FileInfo,
        LogOption::Thread,
        LogOption::OtherInfo,
        LogOption::Message,
    ];

    pub const DEFAULT: [LogOption; 5] = [
        LogOption::Timestamp,
        LogOption::Level,
        LogOption::Tag,
        LogOption::OtherInfo,
        LogOption::Message,
    ];

    pub const DEBUG: [LogOption; 4] = [
        LogOption::Timestamp,
        LogOption::Level,
        LogOption::Tag,
        LogOption::Message,
    ];

    pub const CONSOLE: [LogOption; 4] = LogOption::DEBUG;

    pub const REPORT: [LogOption; 3] = [LogOption::Timestamp, LogOption::Level, LogOption::Message];

    pub const MESSAGE_ONLY: [LogOption; 1] = [LogOption::Message];

    /// Name used on the command line and in serialized formats.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogOption::Timestamp => "timestamp",
            LogOption::Level => "level",
            LogOption::Tag => "tag",
            LogOption::FileInfo => "fileInfo",
            LogOption::Thread => "thread",
            LogOption::OtherInfo => "otherInfo",
            LogOption::Message => "message",
        }
    }

    /// Inverse of [`LogOption::as_str`].
    pub fn from_name(name: &str) -> Option<LogOption> {
        LogOption::ALL.into_iter().find(|option| option.as_str() == name)
    }
}

//! Error types for logweave

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for logweave operations
#[derive(Error, Debug)]
pub enum LogError {
    /// The entity cannot be rendered in the target format
    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// Malformed input, missing required field or unrecognized level
    #[error("Decoding failed: {0}")]
    Decoding(String),

    /// File-backed sink or fetcher failure
    #[error(transparent)]
    File(#[from] FileError),

    /// Unexpected native I/O error
    #[error("Unknown error: {0}")]
    Unknown(#[from] std::io::Error),
}

/// Failures of the file-backed sink and the log fetcher.
#[derive(Error, Debug)]
pub enum FileError {
    /// The target path is a directory
    #[error("Not a file: {}", .path.display())]
    NotAFile { path: PathBuf },

    /// The permission string is not an octal value within 000..=777
    #[error("Invalid file permission '{permission}' for {}", .path.display())]
    InvalidPermission { path: PathBuf, permission: String },

    #[error("Failed to create {}: {source}", .path.display())]
    CreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open {}: {source}", .path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {}: {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete {}: {source}", .path.display())]
    DeletionFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias using LogError
pub type LogResult<T> = Result<T, LogError>;

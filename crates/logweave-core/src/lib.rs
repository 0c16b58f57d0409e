//! logweave core library
//!
//! Structured logging pipeline: typed log entities fanned out to pluggable
//! sinks, each with its own filters, metadata enrichment and text codec.
//!
//! ## Overview
//!
//! - **Entities** ([`LogEntity`]) carry a level, a message and optional
//!   tag, timestamp, source location, thread identity and extra info.
//! - **Codecs** ([`codec`]) turn entities into CSV, JSON or a single-line
//!   human format, and read CSV and JSON back.
//! - **Sinks** ([`sink`]) filter, enrich, encode and write. The file sink
//!   trims its file by validity, size and age on setup.
//! - **[`Logger`]** holds the registered sinks and dispatches to all of them.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use logweave_core::codec::LogFormat;
//! use logweave_core::sink::{FileSink, FileSinkConfig, Persistable, SinkCore};
//! use logweave_core::{log_info, ExecutionMethod, LogOption, Logger};
//!
//! let format = LogFormat::csv(LogOption::DEFAULT.to_vec());
//! let sink = FileSink::new(
//!     SinkCore::new("file", format.encoder()),
//!     FileSinkConfig::new("logs", "app.csv").with_max_file_size(1 << 20),
//!     format.decoder().expect("csv is decodable"),
//!     ExecutionMethod::synchronous(),
//! );
//! sink.setup();
//!
//! let logger = Logger::new();
//! logger.add(Arc::new(sink));
//! log_info!(logger, tag = "Startup", "ready");
//! ```

pub mod codec;
pub mod error;
pub mod execution;
pub mod fetch;
pub mod filter;
pub mod layer;
pub mod logger;
mod macros;
pub mod metadata;
pub mod sink;
pub mod types;

// Re-exports
pub use error::{FileError, LogError, LogResult};
pub use execution::ExecutionMethod;
pub use fetch::{FileLogFetcher, LogFetcher};
pub use filter::Filter;
pub use layer::LogweaveLayer;
pub use logger::{LogContext, Logger};
pub use metadata::{CommonMetadata, MetadataProvider};
pub use sink::{LogSink, Persistable};
pub use types::{FlushMode, LogEntity, LogLevel, LogOption};

//! logweave CLI
//!
//! Thin wrapper around logweave-core for inspecting and maintaining log files.
//!
//! ## Usage
//!
//! ```bash
//! # Print every entry of a CSV log in the human-readable format
//! logweave fetch app.csv --format csv
//!
//! # Only warnings and above tagged "Network"
//! logweave fetch app.jsonl --format json --min-level warning --tag Network
//!
//! # Append one entry
//! logweave append app.jsonl --format json --level error --tag Db "connection lost"
//!
//! # Trim to 1 MiB and one day of history
//! logweave trim app.csv --format csv --max-size 1048576 --max-age-secs 86400
//!
//! # Delete the log file
//! logweave clear app.csv
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use logweave_core::codec::{
    Codec, LogDecoder, LogEncoder, LogFormat, SimpleEncoder, TimestampFormat,
};
use logweave_core::sink::{Diagnostics, FileSink, FileSinkConfig, SinkCore};
use logweave_core::{
    ExecutionMethod, FileLogFetcher, Filter, FlushMode, LogContext, LogEntity, LogFetcher,
    LogLevel, LogOption, Logger, Persistable,
};
use parking_lot::Mutex;

/// logweave - structured log files
#[derive(Parser)]
#[command(name = "logweave")]
#[command(version = "0.1.0")]
#[command(about = "Inspect, append to and trim structured log files")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the entries of a log file
    Fetch {
        /// Log file to read
        file: PathBuf,

        #[command(flatten)]
        format: FormatArgs,

        /// Only entries at or above this level
        #[arg(long, value_parser = parse_level)]
        min_level: Option<LogLevel>,

        /// Only entries with one of these tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Append one entry to a log file
    Append {
        /// Log file to write
        file: PathBuf,

        #[command(flatten)]
        format: FormatArgs,

        /// Entry level
        #[arg(long, value_parser = parse_level, default_value = "info")]
        level: LogLevel,

        /// Entry tag
        #[arg(long)]
        tag: Option<String>,

        /// Extra info as key=value (repeatable)
        #[arg(long = "extra", value_parser = parse_key_value)]
        extra: Vec<(String, String)>,

        /// Message text
        message: String,
    },

    /// Drop invalid, oversized and expired entries from a log file
    Trim {
        /// Log file to trim
        file: PathBuf,

        #[command(flatten)]
        format: FormatArgs,

        /// Shrink the file to 80% of this many bytes when it is larger
        #[arg(long)]
        max_size: Option<u64>,

        /// Drop entries older than this many seconds
        #[arg(long)]
        max_age_secs: Option<u64>,
    },

    /// Delete a log file
    Clear {
        /// Log file to delete
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatKind {
    Csv,
    Json,
}

#[derive(clap::Args)]
struct FormatArgs {
    /// Persisted format of the file
    #[arg(long, value_enum, default_value = "json")]
    format: FormatKind,

    /// Comma-separated field order, e.g. timestamp,level,tag,message
    #[arg(long, value_delimiter = ',', value_parser = parse_option)]
    options: Vec<LogOption>,

    /// CSV field delimiter
    #[arg(long, default_value_t = ',')]
    delimiter: char,
}

impl FormatArgs {
    fn log_format(&self) -> LogFormat {
        let options = if self.options.is_empty() {
            LogOption::ALL.to_vec()
        } else {
            self.options.clone()
        };

        match self.format {
            FormatKind::Csv => LogFormat {
                codec: Codec::Csv {
                    delimiter: self.delimiter,
                },
                options,
                timestamp_pattern: TimestampFormat::DEFAULT_PATTERN.to_string(),
            },
            FormatKind::Json => LogFormat::json(options),
        }
    }
}

fn parse_level(s: &str) -> Result<LogLevel, String> {
    s.to_uppercase()
        .parse()
        .map_err(|_| format!("unknown level '{s}' (debug, info, warning, error, critical)"))
}

fn parse_option(s: &str) -> Result<LogOption, String> {
    LogOption::from_name(s.trim()).ok_or_else(|| {
        let names: Vec<&str> = LogOption::ALL.iter().map(LogOption::as_str).collect();
        format!("unknown option '{s}' ({})", names.join(", "))
    })
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{s}'"))
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}

/// Diagnostics that collect into a shared list.
fn collecting_diagnostics() -> (Diagnostics, Arc<Mutex<Vec<String>>>) {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();
    (
        Diagnostics::new(move |message| sink.lock().push(message.to_string())),
        messages,
    )
}

fn file_sink(
    format: &LogFormat,
    config: FileSinkConfig,
    diagnostics: Diagnostics,
) -> Result<FileSink> {
    let Some(decoder) = format.decoder() else {
        bail!("format has no decoder");
    };

    Ok(FileSink::new(
        SinkCore::new("cli", format.encoder()).with_diagnostics(diagnostics),
        config,
        decoder,
        ExecutionMethod::synchronous(),
    ))
}

/// Refuse to append to an existing file whose records the format cannot read.
fn ensure_readable(file: &Path, format: &LogFormat) -> Result<()> {
    if !file.is_file() {
        return Ok(());
    }
    let Some(decoder) = format.decoder() else {
        bail!("format has no decoder");
    };

    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let unreadable = decoder
        .split_content(&content)
        .iter()
        .filter(|record| !matches!(decoder.decode(record), Ok(Some(_))))
        .count();
    if unreadable > 0 {
        bail!(
            "{} holds {unreadable} record(s) the selected format cannot read \
             (check --format and --options)",
            file.display()
        );
    }
    Ok(())
}

fn fetch(
    file: &Path,
    format: &LogFormat,
    min_level: Option<LogLevel>,
    tags: Vec<String>,
) -> Result<()> {
    let Some(decoder) = format.decoder() else {
        bail!("format has no decoder");
    };

    let mut filters = Vec::new();
    if let Some(min_level) = min_level {
        filters.push(Filter::severity("min-level", min_level));
    }
    if !tags.is_empty() {
        filters.push(Filter::tags("tags", tags));
    }
    let keep = |entity: &LogEntity| filters.iter().all(|f| !f.should_ignore(entity));

    let entities = FileLogFetcher::new(file, decoder)
        .fetch_logs(Some(&keep))
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let printer = SimpleEncoder::new(TimestampFormat::default(), LogOption::ALL.to_vec());
    for entity in &entities {
        println!("{}", printer.encode(entity)?);
    }
    tracing::info!(count = entities.len(), "Fetched entries");

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    match cli.command {
        Commands::Fetch {
            file,
            format,
            min_level,
            tags,
        } => {
            fetch(&file, &format.log_format(), min_level, tags)?;
        }

        Commands::Append {
            file,
            format,
            level,
            tag,
            extra,
            message,
        } => {
            let format = format.log_format();
            ensure_readable(&file, &format)?;

            let config = FileSinkConfig::for_path(&file).with_flush_mode(FlushMode::Always);
            let (diagnostics, messages) = collecting_diagnostics();
            let sink = Arc::new(file_sink(&format, config, diagnostics)?);
            sink.prepare_storage()
                .with_context(|| format!("Failed to open {}", file.display()))?;

            let logger = Logger::new();
            logger.add(sink.clone());

            let mut context = LogContext::now();
            context.tag = tag;
            context.extra_info = extra.into_iter().collect();
            logger.log(level, message, context);

            let failures: Vec<String> = messages
                .lock()
                .iter()
                .filter(|m| m.starts_with("Failed"))
                .cloned()
                .collect();
            if !failures.is_empty() {
                bail!("{}", failures.join("\n"));
            }
            println!("Appended to {}", sink.path().display());
        }

        Commands::Trim {
            file,
            format,
            max_size,
            max_age_secs,
        } => {
            if !file.is_file() {
                bail!("No such log file: {}", file.display());
            }

            let format = format.log_format();
            let mut config = FileSinkConfig::for_path(&file);
            config.max_file_size = max_size;
            config.max_log_age = max_age_secs.map(Duration::from_secs);

            let (diagnostics, messages) = collecting_diagnostics();
            let sink = file_sink(&format, config, diagnostics)?;
            sink.setup();

            for message in messages.lock().iter() {
                println!("{message}");
            }
        }

        Commands::Clear { file } => {
            let format = LogFormat::json(LogOption::ALL.to_vec());
            let sink = file_sink(&format, FileSinkConfig::for_path(&file), Diagnostics::none())?;
            sink.delete_all_logs()?;
            println!("Deleted {}", file.display());
        }
    }

    Ok(())
}

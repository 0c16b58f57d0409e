//! Reading persisted logs back.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::codec::LogDecoder;
use crate::error::{FileError, LogResult};
use crate::types::LogEntity;

/// Reads entities from a log store.
pub trait LogFetcher {
    /// Every decodable entity in storage order. When `keep` is given, only
    /// entities it returns `true` for are included. Records that fail to
    /// decode are skipped.
    fn fetch_logs(&self, keep: Option<&dyn Fn(&LogEntity) -> bool>) -> LogResult<Vec<LogEntity>>;
}

/// Fetcher for a single log file.
pub struct FileLogFetcher {
    path: PathBuf,
    decoder: Arc<dyn LogDecoder>,
}

impl FileLogFetcher {
    pub fn new(path: impl Into<PathBuf>, decoder: Arc<dyn LogDecoder>) -> Self {
        Self {
            path: path.into(),
            decoder,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_decoder(&mut self, decoder: Arc<dyn LogDecoder>) {
        self.decoder = decoder;
    }
}

impl LogFetcher for FileLogFetcher {
    fn fetch_logs(&self, keep: Option<&dyn Fn(&LogEntity) -> bool>) -> LogResult<Vec<LogEntity>> {
        let content = fs::read_to_string(&self.path).map_err(|source| FileError::ReadFailed {
            path: self.path.clone(),
            source,
        })?;

        let records = self.decoder.split_content(&content);
        let total = records.len();

        let entities: Vec<LogEntity> = records
            .iter()
            .filter_map(|record| self.decoder.decode(record).ok().flatten())
            .filter(|entity| keep.map_or(true, |keep| keep(entity)))
            .collect();

        tracing::debug!(
            path = %self.path.display(),
            records = total,
            returned = entities.len(),
            "Fetched log entries"
        );
        Ok(entities)
    }
}

//! Sinks: destinations that consume entities.
//!
//! Every sink owns a [`SinkCore`] (id, filters, encoder, optional metadata
//! provider and diagnostics callback) and runs its work through an
//! [`ExecutionMethod`](crate::execution::ExecutionMethod). Sinks backed by
//! storage also expose [`Persistable`] through [`LogSink::as_persistable`].

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::codec::LogEncoder;
use crate::error::LogResult;
use crate::filter::{first_ignoring, Filter};
use crate::metadata::MetadataProvider;
use crate::types::LogEntity;

pub mod console;
pub mod file;
mod flush_timer;
pub mod os_log;
pub mod trim;

pub use console::{ConsoleOutput, ConsoleSink};
pub use file::{FileSink, FileSinkConfig};
pub use os_log::{OsLogSink, OsLogType};

/// Callback receiving every non-fatal internal problem of a sink.
pub type DiagnosticsCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Optional per-sink diagnostics channel. Reports are also emitted as
/// `tracing` debug events.
#[derive(Clone, Default)]
pub struct Diagnostics {
    callback: Option<DiagnosticsCallback>,
}

impl Diagnostics {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            callback: Some(Arc::new(callback)),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn report(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::debug!(diagnostic = %message, "Sink diagnostic");
        if let Some(callback) = &self.callback {
            callback(message);
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// State shared by every sink.
pub struct SinkCore {
    id: String,
    filters: RwLock<Vec<Filter>>,
    encoder: Arc<dyn LogEncoder>,
    metadata_provider: RwLock<Option<Arc<dyn MetadataProvider>>>,
    diagnostics: Diagnostics,
}

impl SinkCore {
    pub fn new(id: impl Into<String>, encoder: Arc<dyn LogEncoder>) -> Self {
        Self {
            id: id.into(),
            filters: RwLock::new(Vec::new()),
            encoder,
            metadata_provider: RwLock::new(None),
            diagnostics: Diagnostics::none(),
        }
    }

    pub fn with_filters(self, filters: Vec<Filter>) -> Self {
        *self.filters.write() = filters;
        self
    }

    pub fn with_metadata_provider(self, provider: Arc<dyn MetadataProvider>) -> Self {
        *self.metadata_provider.write() = Some(provider);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn encoder(&self) -> Arc<dyn LogEncoder> {
        self.encoder.clone()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Filter, merge metadata and encode.
    ///
    /// `Ok(None)` when a filter suppressed the entity; the suppression is
    /// reported through diagnostics.
    pub fn prepare(&self, entity: &LogEntity) -> LogResult<Option<String>> {
        // Predicates and the diagnostics callback may call back into this sink
        let filters = self.filters.read().clone();
        if let Some(filter) = first_ignoring(&filters, entity) {
            self.diagnostics.report(format!(
                "Log entity ignored by filter: {} {} in sink: {}",
                filter.kind(),
                filter.id(),
                self.id
            ));
            return Ok(None);
        }

        let provider = self.metadata_provider.read().clone();
        let encoded = match provider {
            Some(provider) => self.encoder.encode(&entity.merged_with(&provider.metadata()))?,
            None => self.encoder.encode(entity)?,
        };
        Ok(Some(encoded))
    }

    /// Run `prepare` and hand the text to `write`, reporting any failure.
    pub(crate) fn deliver<W>(&self, entity: &LogEntity, write: W)
    where
        W: FnOnce(&str) -> LogResult<()>,
    {
        let result = self
            .prepare(entity)
            .and_then(|text| text.map_or(Ok(()), |text| write(&text)));

        if let Err(e) = result {
            self.diagnostics
                .report(format!("Failed to log entity: {entity:?}. Error: {e}"));
        }
    }
}

impl fmt::Debug for SinkCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkCore")
            .field("id", &self.id)
            .field("filters", &*self.filters.read())
            .field("metadata_provider", &self.metadata_provider.read().is_some())
            .finish_non_exhaustive()
    }
}

/// Capability of sinks backed by persistent storage.
pub trait Persistable: Send + Sync {
    /// Prepare storage. Never fails outward; problems go to diagnostics.
    fn setup(&self);

    /// Force buffered data to storage. Safe to call redundantly.
    fn flush(&self);
}

/// A destination that consumes entities.
pub trait LogSink: Send + Sync {
    fn core(&self) -> &SinkCore;

    /// Filter, enrich, encode and write one entity under the sink's
    /// execution method. Never fails outward.
    fn log(&self, entity: &LogEntity);

    fn as_persistable(&self) -> Option<&dyn Persistable> {
        None
    }

    fn id(&self) -> &str {
        self.core().id()
    }

    fn filters(&self) -> Vec<Filter> {
        self.core().filters.read().clone()
    }

    fn set_filters(&self, filters: Vec<Filter>) {
        *self.core().filters.write() = filters;
    }

    fn add_filter(&self, filter: Filter) {
        self.core().filters.write().push(filter);
    }

    fn encoder(&self) -> Arc<dyn LogEncoder> {
        self.core().encoder()
    }

    fn metadata_provider(&self) -> Option<Arc<dyn MetadataProvider>> {
        self.core().metadata_provider.read().clone()
    }

    fn set_metadata_provider(&self, provider: Option<Arc<dyn MetadataProvider>>) {
        *self.core().metadata_provider.write() = provider;
    }
}

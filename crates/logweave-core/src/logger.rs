//! Sink registry and fan-out.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::execution::current_thread_info;
use crate::sink::LogSink;
use crate::types::{LogEntity, LogLevel};

/// Call-site details attached to one log call.
#[derive(Debug, Clone, Default)]
pub struct LogContext {
    pub timestamp: Option<DateTime<Utc>>,
    pub tag: Option<String>,
    pub file_name: Option<String>,
    pub function_name: Option<String>,
    pub line_number: Option<u32>,
    pub extra_info: BTreeMap<String, String>,
}

impl LogContext {
    /// Context stamped with the current time.
    pub fn now() -> Self {
        Self {
            timestamp: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

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

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_info.insert(key.into(), value.into());
        self
    }
}

/// Thread-safe, ordered set of sinks.
///
/// Sinks are unique by id. A fan-out works on a snapshot, so sinks added or
/// removed concurrently take effect on the next call.
#[derive(Default)]
pub struct Logger {
    sinks: RwLock<Vec<Arc<dyn LogSink>>>,
}

impl Logger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink. A sink whose id is already registered is ignored.
    pub fn add(&self, sink: Arc<dyn LogSink>) -> bool {
        let mut sinks = self.sinks.write();
        if sinks.iter().any(|existing| existing.id() == sink.id()) {
            tracing::debug!(id = sink.id(), "Sink already registered");
            return false;
        }
        sinks.push(sink);
        true
    }

    /// Remove every sink with `id`. No-op when absent.
    pub fn remove(&self, id: &str) {
        self.sinks.write().retain(|sink| sink.id() != id);
    }

    pub fn remove_all(&self) {
        self.sinks.write().clear();
    }

    /// Snapshot of the registered sinks in insertion order.
    pub fn sinks(&self) -> Vec<Arc<dyn LogSink>> {
        self.sinks.read().clone()
    }

    pub fn sink(&self, id: &str) -> Option<Arc<dyn LogSink>> {
        self.sinks.read().iter().find(|sink| sink.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sinks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.read().is_empty()
    }

    /// Build an entity from the call site and deliver it to every sink.
    pub fn log(&self, level: LogLevel, message: impl Into<String>, context: LogContext) {
        let entity = LogEntity {
            level,
            message: message.into(),
            tag: context.tag,
            timestamp: context.timestamp,
            function_name: context.function_name,
            file_name: context.file_name,
            line_number: context.line_number,
            thread: Some(current_thread_info()),
            extra_info: context.extra_info,
        };
        self.dispatch(&entity);
    }

    /// Deliver a prepared entity to every sink, in registration order.
    pub fn dispatch(&self, entity: &LogEntity) {
        for sink in self.sinks() {
            sink.log(entity);
        }
    }

    /// Run `setup()` on every persistable sink.
    pub fn setup_all(&self) {
        for sink in self.sinks() {
            if let Some(persistable) = sink.as_persistable() {
                persistable.setup();
            }
        }
    }

    /// Run `flush()` on every persistable sink.
    pub fn flush_all(&self) {
        for sink in self.sinks() {
            if let Some(persistable) = sink.as_persistable() {
                persistable.flush();
            }
        }
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<String> = self.sinks.read().iter().map(|s| s.id().to_string()).collect();
        f.debug_struct("Logger").field("sinks", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonEncoder;
    use crate::sink::SinkCore;
    use parking_lot::Mutex;

    struct Recording {
        core: SinkCore,
        seen: Mutex<Vec<LogEntity>>,
    }

    impl Recording {
        fn new(id: &str) -> Arc<Self> {
            Arc::new(Self {
                core: SinkCore::new(id, Arc::new(JsonEncoder::default())),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl LogSink for Recording {
        fn core(&self) -> &SinkCore {
            &self.core
        }

        fn log(&self, entity: &LogEntity) {
            self.seen.lock().push(entity.clone());
        }
    }

    #[test]
    fn test_duplicate_id_keeps_first() {
        let logger = Logger::new();
        let first = Recording::new("a");
        let second = Recording::new("a");

        assert!(logger.add(first.clone()));
        assert!(!logger.add(second.clone()));
        assert_eq!(logger.len(), 1);

        logger.log(LogLevel::Info, "hello", LogContext::default());
        assert_eq!(first.seen.lock().len(), 1);
        assert!(second.seen.lock().is_empty());
    }

    #[test]
    fn test_remove_and_remove_all() {
        let logger = Logger::new();
        logger.add(Recording::new("a"));
        logger.add(Recording::new("b"));

        logger.remove("missing");
        assert_eq!(logger.len(), 2);

        logger.remove("a");
        let ids: Vec<String> = logger.sinks().iter().map(|s| s.id().to_string()).collect();
        assert_eq!(ids, vec!["b"]);

        logger.remove_all();
        assert!(logger.is_empty());
    }

    #[test]
    fn test_log_builds_entity_with_thread_info() {
        let logger = Logger::new();
        let sink = Recording::new("rec");
        logger.add(sink.clone());

        let context = LogContext::now()
            .with_tag("Net")
            .with_location("net.rs", "connect", 12)
            .with_extra("peer", "10.0.0.1");
        logger.log(LogLevel::Warning, "retrying", context);

        let seen = sink.seen.lock();
        let entity = &seen[0];
        assert_eq!(entity.level, LogLevel::Warning);
        assert_eq!(entity.message, "retrying");
        assert_eq!(entity.tag.as_deref(), Some("Net"));
        assert_eq!(entity.line_number, Some(12));
        assert_eq!(entity.extra_info["peer"], "10.0.0.1");
        assert!(entity.timestamp.is_some());
        assert!(entity
            .thread
            .as_deref()
            .is_some_and(|t| t.starts_with("ThreadInfo: isMain:")));
    }
}

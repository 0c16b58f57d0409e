//! `tracing` bridge.
//!
//! [`LogweaveLayer`] turns `tracing` events into entities and dispatches them
//! through a [`Logger`], so code instrumented with `tracing` reaches every
//! registered sink.

use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use std::sync::Arc;

use chrono::Utc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::execution::current_thread_info;
use crate::logger::Logger;
use crate::types::{LogEntity, LogLevel};

/// Events from targets with this prefix are never bridged.
const INTERNAL_TARGET_PREFIX: &str = "logweave";

pub struct LogweaveLayer {
    logger: Arc<Logger>,
}

impl LogweaveLayer {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }
}

/// Map a `tracing` level onto a log level. TRACE folds into debug.
pub fn level_for(level: &Level) -> LogLevel {
    match *level {
        Level::TRACE | Level::DEBUG => LogLevel::Debug,
        Level::INFO => LogLevel::Info,
        Level::WARN => LogLevel::Warning,
        _ => LogLevel::Error,
    }
}

impl<S> Layer<S> for LogweaveLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let target = metadata.target();

        // Internal diagnostics would loop back into the sinks
        if target.starts_with(INTERNAL_TARGET_PREFIX) {
            return;
        }

        let mut visitor = EntityVisitor::default();
        event.record(&mut visitor);

        let message = visitor.message.unwrap_or_default();
        let mut entity = LogEntity::new(level_for(metadata.level()), message)
            .with_tag(target)
            .with_timestamp(Utc::now())
            .with_thread(current_thread_info());
        entity.extra_info = visitor.fields;
        entity.file_name = metadata.file().map(str::to_string);
        entity.function_name = metadata.module_path().map(str::to_string);
        entity.line_number = metadata.line();

        if let Some(scope) = ctx.event_scope(event) {
            let spans: Vec<&str> = scope.from_root().map(|span| span.name()).collect();
            if !spans.is_empty() {
                entity.extra_info.insert("span".to_string(), spans.join(" > "));
            }
        }

        self.logger.dispatch(&entity);
    }
}

#[derive(Default)]
struct EntityVisitor {
    message: Option<String>,
    fields: BTreeMap<String, String>,
}

impl EntityVisitor {
    fn put(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for EntityVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let mut buf = String::new();
        let _ = write!(&mut buf, "{:?}", value);
        self.put(field, buf);
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, value.to_string());
    }
}

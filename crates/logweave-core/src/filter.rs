//! Per-sink filters that suppress entities before they are encoded.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::types::{LogEntity, LogLevel};

/// Ignores entities below a minimum level.
#[derive(Debug, Clone)]
pub struct SeverityFilter {
    pub id: String,
    pub min_level: LogLevel,
}

impl SeverityFilter {
    pub fn new(id: impl Into<String>, min_level: LogLevel) -> Self {
        Self {
            id: id.into(),
            min_level,
        }
    }
}

/// Case-sensitive tag allow-list.
///
/// Entities without a tag are ignored, and an empty allow-list ignores everything.
#[derive(Debug, Clone)]
pub struct TagFilter {
    pub id: String,
    pub allowed: HashSet<String>,
}

impl TagFilter {
    pub fn new<I, S>(id: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }
}

/// Caller-supplied predicate. Returning `true` ignores the entity.
pub type IgnorePredicate = Arc<dyn Fn(&LogEntity) -> bool + Send + Sync>;

#[derive(Clone)]
pub enum Filter {
    Severity(SeverityFilter),
    Tag(TagFilter),
    Predicate { id: String, predicate: IgnorePredicate },
}

impl Filter {
    pub fn severity(id: impl Into<String>, min_level: LogLevel) -> Self {
        Filter::Severity(SeverityFilter::new(id, min_level))
    }

    pub fn tags<I, S>(id: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::Tag(TagFilter::new(id, allowed))
    }

    pub fn predicate<F>(id: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&LogEntity) -> bool + Send + Sync + 'static,
    {
        Filter::Predicate {
            id: id.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Filter::Severity(filter) => &filter.id,
            Filter::Tag(filter) => &filter.id,
            Filter::Predicate { id, .. } => id,
        }
    }

    /// Short name of the filter kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Filter::Severity(_) => "SeverityFilter",
            Filter::Tag(_) => "TagFilter",
            Filter::Predicate { .. } => "PredicateFilter",
        }
    }

    pub fn should_ignore(&self, entity: &LogEntity) -> bool {
        match self {
            Filter::Severity(filter) => entity.level < filter.min_level,
            Filter::Tag(filter) => match &entity.tag {
                Some(tag) => !filter.allowed.contains(tag),
                None => true,
            },
            Filter::Predicate { predicate, .. } => predicate(entity),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Severity(filter) => f.debug_tuple("Severity").field(filter).finish(),
            Filter::Tag(filter) => f.debug_tuple("Tag").field(filter).finish(),
            Filter::Predicate { id, .. } => f
                .debug_struct("Predicate")
                .field("id", id)
                .finish_non_exhaustive(),
        }
    }
}

/// The first filter in `filters` that ignores `entity`, if any.
pub fn first_ignoring<'a>(filters: &'a [Filter], entity: &LogEntity) -> Option<&'a Filter> {
    filters.iter().find(|filter| filter.should_ignore(entity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_threshold() {
        let filter = Filter::severity("min-warning", LogLevel::Warning);

        assert!(filter.should_ignore(&LogEntity::new(LogLevel::Debug, "x")));
        assert!(filter.should_ignore(&LogEntity::new(LogLevel::Info, "x")));
        assert!(!filter.should_ignore(&LogEntity::new(LogLevel::Warning, "x")));
        assert!(!filter.should_ignore(&LogEntity::new(LogLevel::Error, "x")));
        assert!(!filter.should_ignore(&LogEntity::new(LogLevel::Critical, "x")));
    }

    #[test]
    fn test_tag_allow_list_is_case_sensitive() {
        let filter = Filter::tags("net", ["Network"]);

        assert!(!filter.should_ignore(&LogEntity::new(LogLevel::Info, "x").with_tag("Network")));
        assert!(filter.should_ignore(&LogEntity::new(LogLevel::Info, "x").with_tag("network")));
        assert!(filter.should_ignore(&LogEntity::new(LogLevel::Info, "x")));
    }

    #[test]
    fn test_empty_tag_allow_list_ignores_everything() {
        let filter = Filter::tags("none", Vec::<String>::new());
        assert!(filter.should_ignore(&LogEntity::new(LogLevel::Critical, "x").with_tag("Any")));
    }

    #[test]
    fn test_predicate_filter() {
        let filter = Filter::predicate("no-secrets", |e: &LogEntity| e.message.contains("secret"));

        assert!(filter.should_ignore(&LogEntity::new(LogLevel::Info, "the secret is 42")));
        assert!(!filter.should_ignore(&LogEntity::new(LogLevel::Info, "public")));
        assert_eq!(filter.kind(), "PredicateFilter");
        assert_eq!(filter.id(), "no-secrets");
    }

    #[test]
    fn test_first_ignoring_short_circuits_in_order() {
        let filters = vec![
            Filter::severity("sev", LogLevel::Error),
            Filter::tags("tag", ["Db"]),
        ];

        let entity = LogEntity::new(LogLevel::Info, "x");
        assert_eq!(first_ignoring(&filters, &entity).map(Filter::id), Some("sev"));

        let entity = LogEntity::new(LogLevel::Error, "x").with_tag("Ui");
        assert_eq!(first_ignoring(&filters, &entity).map(Filter::id), Some("tag"));

        let entity = LogEntity::new(LogLevel::Error, "x").with_tag("Db");
        assert!(first_ignoring(&filters, &entity).is_none());
    }
}

//! Metadata providers merged into every entity a sink encodes.

use std::collections::BTreeMap;

use parking_lot::RwLock;

/// Source of key/value pairs merged into `extra_info` before encoding.
pub trait MetadataProvider: Send + Sync {
    fn metadata(&self) -> BTreeMap<String, String>;
}

/// A mutable, shareable metadata map.
#[derive(Debug, Default)]
pub struct CommonMetadata {
    values: RwLock<BTreeMap<String, String>>,
}

impl CommonMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: BTreeMap<String, String>) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.write().remove(key)
    }

    /// Replace the whole map.
    pub fn set_all(&self, values: BTreeMap<String, String>) {
        *self.values.write() = values;
    }
}

impl MetadataProvider for CommonMetadata {
    fn metadata(&self) -> BTreeMap<String, String> {
        self.values.read().clone()
    }
}

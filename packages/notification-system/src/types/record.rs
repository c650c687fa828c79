//! Structured records extracted from a document.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Field values extracted from one container element.
///
/// `fields` keeps the declaration order of the configuration; fields whose
/// element or attribute was missing are absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedRecord {
    /// Index of the container in document order
    pub position: usize,

    pub fields: IndexMap<String, String>,
}

impl ScrapedRecord {
    pub fn new(position: usize) -> Self {
        Self {
            position,
            fields: IndexMap::new(),
        }
    }

    /// Add a field value.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

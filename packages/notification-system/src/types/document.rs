//! Raw page content as retrieved by a [`PageFetcher`](crate::PageFetcher).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Markup captured from a page, immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDocument {
    /// URL the document was retrieved from
    pub url: String,

    /// Markup exactly as received
    pub content: String,

    /// When the document was retrieved
    pub fetched_at: DateTime<Utc>,
}

impl RawDocument {
    /// Capture a document fetched now.
    pub fn new(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content: content.into(),
            fetched_at: Utc::now(),
        }
    }

    /// Set the retrieval timestamp.
    pub fn with_fetched_at(mut self, fetched_at: DateTime<Utc>) -> Self {
        self.fetched_at = fetched_at;
        self
    }

    /// Byte-for-byte content equality, ignoring URL and timestamp.
    pub fn same_content(&self, other: &RawDocument) -> bool {
        self.content == other.content
    }
}

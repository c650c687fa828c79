//! Previous-cycle state used as the diff baseline.

use serde::{Deserialize, Serialize};

use super::document::RawDocument;
use super::record::ScrapedRecord;

/// Persisted baseline, either the raw page or the records scraped from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Snapshot {
    Document(RawDocument),
    Records(Vec<ScrapedRecord>),
}

impl From<RawDocument> for Snapshot {
    fn from(document: RawDocument) -> Self {
        Snapshot::Document(document)
    }
}

impl From<Vec<ScrapedRecord>> for Snapshot {
    fn from(records: Vec<ScrapedRecord>) -> Self {
        Snapshot::Records(records)
    }
}

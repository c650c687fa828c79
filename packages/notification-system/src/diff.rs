//! Record comparison.
//!
//! Records are matched across the two sides by their identity key. Records
//! sharing a key are aligned by document order: the i-th old record with the
//! key is compared with the i-th new record with the key, and surplus records
//! on either side become additions or removals. For unique keys this is
//! plain key matching.
//!
//! Output order is a walk over the new records in document order (additions
//! and per-field modifications in configuration order), followed by removals
//! in old document order.

use std::collections::HashMap;
use tracing::debug;

use crate::error::Result;
use crate::scrape::Scraper;
use crate::types::{
    change::{Change, ChangeKind},
    config::Configuration,
    document::RawDocument,
    record::ScrapedRecord,
};

/// Compare two record sequences.
///
/// Pure and deterministic: identical inputs give identical ordered output.
pub fn diff(old: &[ScrapedRecord], new: &[ScrapedRecord], config: &Configuration) -> Vec<Change> {
    let old = in_document_order(old);
    let new = in_document_order(new);

    let mut old_by_key: HashMap<String, Vec<&ScrapedRecord>> = HashMap::new();
    for record in &old {
        old_by_key
            .entry(identity_key(record, config))
            .or_default()
            .push(record);
    }

    let mut changes = Vec::new();
    let mut new_seen: HashMap<String, usize> = HashMap::new();

    for record in &new {
        let key = identity_key(record, config);
        let occurrence = new_seen.entry(key.clone()).or_insert(0);
        let counterpart = old_by_key
            .get(&key)
            .and_then(|records| records.get(*occurrence));
        *occurrence += 1;

        match counterpart {
            Some(previous) => compare_fields(&key, previous, record, config, &mut changes),
            None => changes.push(Change::added(key)),
        }
    }

    let mut old_seen: HashMap<String, usize> = HashMap::new();
    for record in &old {
        let key = identity_key(record, config);
        let occurrence = old_seen.entry(key.clone()).or_insert(0);
        let matched = new_seen.get(&key).copied().unwrap_or(0);
        if *occurrence >= matched {
            changes.push(Change::removed(key));
        }
        *occurrence += 1;
    }

    let report = config.report();
    changes.retain(|change| match change.kind {
        ChangeKind::Added => report.added,
        ChangeKind::Removed => report.removed,
        ChangeKind::Modified => report.modified,
    });

    debug!(
        old_records = old.len(),
        new_records = new.len(),
        changes = changes.len(),
        "Diff computed"
    );

    changes
}

/// Compare two raw documents.
///
/// Byte-identical documents short-circuit to no changes without scraping;
/// otherwise both sides are scraped with `config` and diffed.
pub fn difference(
    old: &RawDocument,
    new: &RawDocument,
    config: &Configuration,
) -> Result<Vec<Change>> {
    if old.same_content(new) {
        return Ok(Vec::new());
    }

    let scraper = Scraper::new(config)?;
    let old_records = scraper.scrape(old)?;
    let new_records = scraper.scrape(new)?;

    Ok(diff(&old_records, &new_records, config))
}

fn in_document_order(records: &[ScrapedRecord]) -> Vec<&ScrapedRecord> {
    let mut ordered: Vec<&ScrapedRecord> = records.iter().collect();
    ordered.sort_by_key(|record| record.position);
    ordered
}

/// Identity key of a record; records without the identity field share the
/// empty key.
fn identity_key(record: &ScrapedRecord, config: &Configuration) -> String {
    record
        .get(config.identity_field())
        .map(|value| config.normalize(value).into_owned())
        .unwrap_or_default()
}

fn compare_fields(
    key: &str,
    old: &ScrapedRecord,
    new: &ScrapedRecord,
    config: &Configuration,
    changes: &mut Vec<Change>,
) {
    for field in config.fields().iter().filter(|f| config.is_compared(f)) {
        let before = old.get(&field.name);
        let after = new.get(&field.name);

        let differs = match (before, after) {
            (Some(a), Some(b)) => config.normalize(a) != config.normalize(b),
            (None, None) => false,
            _ => true,
        };

        if differs {
            changes.push(Change::modified(
                key,
                field.name.clone(),
                before.map(str::to_string),
                after.map(str::to_string),
            ));
        }
    }
}

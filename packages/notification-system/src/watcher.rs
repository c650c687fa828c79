//! One watch cycle: fetch, scrape, diff, dispatch, persist.
//!
//! A cycle is strictly sequential. Cycles for the same target are mutually
//! exclusive: a cycle that finds another one running for its key is skipped
//! rather than queued, so the snapshot store only ever sees one writer per
//! key. The snapshot is written only after confirmed delivery, or when there
//! was nothing to deliver; a failed delivery leaves the baseline untouched so
//! the next cycle re-diffs against it.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::diff::diff;
use crate::dispatch::{Delivery, Dispatcher};
use crate::error::{Error, FetchError, Result};
use crate::scrape::Scraper;
use crate::traits::{NotificationSink, PageFetcher, SnapshotStore};
use crate::types::{
    change::{Acknowledgement, Change},
    config::Configuration,
    document::RawDocument,
    snapshot::Snapshot,
};

/// A monitored page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    /// Snapshot store key
    pub key: String,
    pub url: String,
}

impl WatchTarget {
    /// Target keyed by its own URL.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            key: url.clone(),
            url,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }
}

/// How a cycle ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Another cycle for the same target was still running
    Skipped,

    /// First run for this target; the fetched page became the baseline
    Baseline { records: usize },

    /// Nothing changed; the baseline was refreshed
    NoChanges,

    /// Changes were delivered and the baseline advanced
    Delivered {
        changes: Vec<Change>,
        ack: Acknowledgement,
        attempts: u32,
    },
}

/// Runs watch cycles against a fetcher, a snapshot store and a dispatcher.
pub struct Watcher<F, S, K>
where
    F: PageFetcher,
    S: SnapshotStore,
    K: NotificationSink,
{
    fetcher: F,
    store: S,
    dispatcher: Dispatcher<K>,
    config: Configuration,
    scraper: Scraper,
    fetch_timeout: Duration,
    /// Keys with a cycle in progress
    running: Mutex<HashSet<String>>,
}

/// Claim on a target key; releases the key when dropped, including when
/// the cycle future is dropped mid-flight.
struct RunningCycle<'a> {
    running: &'a Mutex<HashSet<String>>,
    key: String,
}

impl Drop for RunningCycle<'_> {
    fn drop(&mut self) {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

impl<F, S, K> Watcher<F, S, K>
where
    F: PageFetcher,
    S: SnapshotStore,
    K: NotificationSink,
{
    pub fn new(
        fetcher: F,
        store: S,
        dispatcher: Dispatcher<K>,
        config: Configuration,
    ) -> Result<Self> {
        let scraper = Scraper::new(&config)?;
        Ok(Self {
            fetcher,
            store,
            dispatcher,
            config,
            scraper,
            fetch_timeout: Duration::from_secs(30),
            running: Mutex::new(HashSet::new()),
        })
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn dispatcher(&self) -> &Dispatcher<K> {
        &self.dispatcher
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Run one cycle for `target`.
    ///
    /// Errors abort the cycle; only [`Error::SnapshotNotAdvanced`] is
    /// returned after a successful delivery.
    pub async fn run_cycle(
        &self,
        target: &WatchTarget,
        cancel: &CancellationToken,
    ) -> Result<CycleOutcome> {
        let Some(_claim) = self.claim(&target.key) else {
            info!(key = %target.key, "Cycle already running, skipping");
            return Ok(CycleOutcome::Skipped);
        };

        info!(key = %target.key, url = %target.url, "Starting watch cycle");

        let document = self.fetch(target, cancel).await?;
        let records = self.scraper.scrape(&document)?;

        let Some(previous) = self.store.read_previous(&target.key).await? else {
            info!(
                key = %target.key,
                records = records.len(),
                "No previous snapshot, storing baseline"
            );
            self.store
                .write_current(&target.key, &Snapshot::Document(document))
                .await?;
            return Ok(CycleOutcome::Baseline {
                records: records.len(),
            });
        };

        let changes = match previous {
            Snapshot::Document(old) if old.same_content(&document) => Vec::new(),
            Snapshot::Document(old) => diff(&self.scraper.scrape(&old)?, &records, &self.config),
            Snapshot::Records(old) => diff(&old, &records, &self.config),
        };

        if changes.is_empty() {
            debug!(key = %target.key, "No changes");
            self.store
                .write_current(&target.key, &Snapshot::Document(document))
                .await?;
            return Ok(CycleOutcome::NoChanges);
        }

        info!(key = %target.key, changes = changes.len(), "Changes detected");

        let (ack, attempts) = match self.dispatcher.dispatch(&changes, cancel).await? {
            Delivery::Delivered { ack, attempts } => (ack, attempts),
            // Unreachable with a non-empty change list
            Delivery::NothingToSend => return Ok(CycleOutcome::NoChanges),
        };

        if let Err(source) = self
            .store
            .write_current(&target.key, &Snapshot::Document(document))
            .await
        {
            warn!(
                key = %target.key,
                error = %source,
                "Changes delivered but snapshot not advanced"
            );
            return Err(Error::SnapshotNotAdvanced {
                delivered: changes.len(),
                source,
            });
        }

        info!(key = %target.key, changes = changes.len(), attempts, "Watch cycle complete");

        Ok(CycleOutcome::Delivered {
            changes,
            ack,
            attempts,
        })
    }

    async fn fetch(
        &self,
        target: &WatchTarget,
        cancel: &CancellationToken,
    ) -> std::result::Result<RawDocument, FetchError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(FetchError::Cancelled {
                url: target.url.clone(),
            }),
            result = tokio::time::timeout(
                self.fetch_timeout,
                self.fetcher.get(&target.url, self.fetch_timeout),
            ) => match result {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout {
                    url: target.url.clone(),
                }),
            },
        }
    }

    fn claim(&self, key: &str) -> Option<RunningCycle<'_>> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if !running.insert(key.to_string()) {
            return None;
        }

        Some(RunningCycle {
            running: &self.running,
            key: key.to_string(),
        })
    }
}

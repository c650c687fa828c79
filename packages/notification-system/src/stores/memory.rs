//! In-memory snapshot store for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::error::SnapshotError;
use crate::traits::store::SnapshotStore;
use crate::types::snapshot::Snapshot;

/// In-memory snapshots keyed by target.
///
/// Data is lost on restart. Counts writes so tests can assert when the
/// baseline was (not) advanced.
#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: RwLock<HashMap<String, Snapshot>>,
    writes: AtomicUsize,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a snapshot without counting it as a write.
    pub fn with_snapshot(self, key: impl Into<String>, snapshot: Snapshot) -> Self {
        self.snapshots
            .write()
            .unwrap()
            .insert(key.into(), snapshot);
        self
    }

    pub fn get(&self, key: &str) -> Option<Snapshot> {
        self.snapshots.read().unwrap().get(key).cloned()
    }

    /// Number of `write_current` calls that succeeded.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn read_previous(&self, key: &str) -> Result<Option<Snapshot>, SnapshotError> {
        Ok(self.get(key))
    }

    async fn write_current(&self, key: &str, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        self.snapshots
            .write()
            .unwrap()
            .insert(key.to_string(), snapshot.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

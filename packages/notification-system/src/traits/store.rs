use async_trait::async_trait;

use crate::error::SnapshotError;
use crate::types::snapshot::Snapshot;

/// Persists the baseline of each monitored target.
///
/// A watch cycle is the only writer for its key and only writes after a
/// confirmed delivery (or when there was nothing to deliver).
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Snapshot written by the last successful cycle, if any.
    async fn read_previous(&self, key: &str) -> Result<Option<Snapshot>, SnapshotError>;

    /// Replace the snapshot for `key`.
    async fn write_current(&self, key: &str, snapshot: &Snapshot) -> Result<(), SnapshotError>;
}

//! File-backed snapshot store.
//!
//! One JSON file per key under a state directory. File names are the SHA-256
//! of the key so arbitrary keys (usually URLs) map to safe names. Writes go
//! to a uniquely named temp file in the same directory that is then renamed
//! over the target, so a crash never leaves a half-written baseline behind
//! and concurrent writers never share a temp file.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::SnapshotError;
use crate::traits::store::SnapshotStore;
use crate::types::snapshot::Snapshot;

pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the snapshot file for `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        self.dir.join(format!("{}.json", digest))
    }
}

fn io_error(key: &str, source: std::io::Error) -> SnapshotError {
    SnapshotError::Io {
        key: key.to_string(),
        source,
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn read_previous(&self, key: &str) -> Result<Option<Snapshot>, SnapshotError> {
        let path = self.path_for(key);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(key, path = %path.display(), "No previous snapshot");
                return Ok(None);
            }
            Err(e) => return Err(io_error(key, e)),
        };

        let snapshot = serde_json::from_slice(&bytes).map_err(|source| SnapshotError::Encoding {
            key: key.to_string(),
            source,
        })?;

        Ok(Some(snapshot))
    }

    async fn write_current(&self, key: &str, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let bytes = serde_json::to_vec(snapshot).map_err(|source| SnapshotError::Encoding {
            key: key.to_string(),
            source,
        })?;

        let dir = self.dir.clone();
        let target = self.path_for(key);
        let len = bytes.len();

        let written = tokio::task::spawn_blocking(move || -> std::io::Result<PathBuf> {
            std::fs::create_dir_all(&dir)?;

            let mut temp = tempfile::Builder::new()
                .prefix(".snapshot-")
                .suffix(".tmp")
                .tempfile_in(&dir)?;
            temp.write_all(&bytes)?;
            temp.as_file().sync_all()?;
            temp.persist(&target).map_err(|e| e.error)?;

            Ok(target)
        })
        .await
        .map_err(|e| SnapshotError::Backend(format!("snapshot write task failed: {}", e)))?;

        let target = written.map_err(|e| io_error(key, e))?;

        debug!(key, path = %target.display(), bytes = len, "Snapshot written");
        Ok(())
    }
}

//! JSON snapshot persistence for the in-process store.

use crate::error::StoreResult;
use crate::store::memory::Collections;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Writes whole-store snapshots, newest generation wins
pub struct SnapshotWriter {
    path: PathBuf,
    /// Generation currently on disk
    written: Mutex<u64>,
}

impl SnapshotWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            written: Mutex::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot if the file exists. Runs once at startup.
    pub fn load(&self) -> StoreResult<Option<Collections>> {
        if !self.path.exists() {
            warn!(path = %self.path.display(), "No snapshot found, starting empty");
            return Ok(None);
        }
        let bytes = std::fs::read(&self.path)?;
        let data: Collections = serde_json::from_slice(&bytes)?;
        if let Ok(mut written) = self.written.try_lock() {
            *written = data.generation;
        }
        Ok(Some(data))
    }

    /// Write `data` unless a newer generation is already on disk.
    ///
    /// The file is replaced atomically via a temp file and rename.
    pub async fn persist(&self, data: &Collections) -> StoreResult<()> {
        let mut written = self.written.lock().await;
        if data.generation <= *written {
            debug!(
                generation = data.generation,
                on_disk = *written,
                "Skipping stale snapshot"
            );
            return Ok(());
        }

        let bytes = serde_json::to_vec_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        *written = data.generation;
        debug!(generation = data.generation, "Snapshot written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_snapshot_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path().join("store.json"));
        assert!(writer.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persist_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        let writer = SnapshotWriter::new(&path);

        let data = Collections {
            generation: 3,
            ..Default::default()
        };
        writer.persist(&data).await.unwrap();

        let reader = SnapshotWriter::new(&path);
        let loaded = reader.load().unwrap().unwrap();
        assert_eq!(loaded.generation, 3);
    }

    #[tokio::test]
    async fn test_stale_generation_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let writer = SnapshotWriter::new(&path);

        writer
            .persist(&Collections {
                generation: 5,
                ..Default::default()
            })
            .await
            .unwrap();
        writer
            .persist(&Collections {
                generation: 4,
                ..Default::default()
            })
            .await
            .unwrap();

        let loaded = SnapshotWriter::new(&path).load().unwrap().unwrap();
        assert_eq!(loaded.generation, 5);
    }
}

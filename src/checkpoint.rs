//! Durable progress for long crawls.
//!
//! The checkpoint is the full record set as a JSON array. It is rewritten
//! after the listing phase and after every article, always through a temp
//! file and a rename so an interrupted write never leaves a torn file.
//! A finished run removes it.

use crate::error::StorageError;
use crate::models::ArticleRecord;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Replace the checkpoint with `records`.
    ///
    /// # Arguments
    ///
    /// * `records` - The full record set, enriched or not
    ///
    /// # Errors
    ///
    /// [`StorageError::Io`] when the temp file cannot be written or renamed
    /// (typically a missing or read-only directory). The previous checkpoint,
    /// if any, is left untouched in that case.
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display(), records = records.len()))]
    pub async fn save(&self, records: &[ArticleRecord]) -> Result<(), StorageError> {
        let json =
            serde_json::to_vec_pretty(records).map_err(|e| StorageError::json(&self.path, e))?;

        let tmp = self.temp_path();
        fs::write(&tmp, json)
            .await
            .map_err(|e| StorageError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StorageError::io(&self.path, e))?;

        debug!("Checkpoint saved");
        Ok(())
    }

    /// Saved records, or `None` when there is no checkpoint.
    ///
    /// # Errors
    ///
    /// [`StorageError::Json`] when the file exists but is not a record array.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<Option<Vec<ArticleRecord>>, StorageError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };
        let records: Vec<ArticleRecord> =
            serde_json::from_slice(&bytes).map_err(|e| StorageError::json(&self.path, e))?;

        info!(records = records.len(), "Loaded checkpoint");
        Ok(Some(records))
    }

    /// Delete the checkpoint. Absent is fine.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn remove(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Checkpoint removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&self.path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CONTENT_ERROR_SENTINEL;

    fn sample() -> Vec<ArticleRecord> {
        let mut a = ArticleRecord::stub("ข่าว ก", "15 มกราคม 2567", "https://x/a");
        a.content = "เนื้อหา".into();
        let mut b = ArticleRecord::stub("ข่าว ข", "", "https://x/b");
        b.content = CONTENT_ERROR_SENTINEL.into();
        vec![a, b]
    }

    #[tokio::test]
    async fn test_missing_checkpoint_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("cp.json"));
        assert!(!store.exists().await);
        assert!(store.load().await.unwrap().is_none());
        store.remove().await.unwrap();
    }

    #[tokio::test]
    async fn test_save_load_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("cp.json"));

        store.save(&sample()).await.unwrap();
        assert!(store.exists().await);
        assert!(!dir.path().join("cp.json.tmp").exists());
        assert_eq!(store.load().await.unwrap(), Some(sample()));

        store.remove().await.unwrap();
        assert!(!store.exists().await);
    }

    #[tokio::test]
    async fn test_save_overwrites_previous() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("cp.json"));
        store.save(&sample()).await.unwrap();
        store.save(&sample()[..1]).await.unwrap();
        assert_eq!(store.load().await.unwrap().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cp.json");
        std::fs::write(&path, "[{\"URL\": ").unwrap();
        let store = CheckpointStore::new(&path);
        assert!(matches!(store.load().await, Err(StorageError::Json { .. })));
    }

    #[tokio::test]
    async fn test_save_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("nope").join("cp.json"));
        assert!(matches!(
            store.save(&sample()).await,
            Err(StorageError::Io { .. })
        ));
    }
}

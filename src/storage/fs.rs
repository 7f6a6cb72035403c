//! Filesystem blob store: one file per blob under `root/bucket/key`.

use super::{validate_blob_name, BlobStore};
use crate::error::{Result, ScribeError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Blob store rooted at a local directory.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        validate_blob_name("bucket", bucket)?;
        validate_blob_name("key", key)?;
        Ok(self.root.join(bucket).join(key))
    }
}

fn io_failure(action: &str, path: &Path, e: std::io::Error) -> ScribeError {
    ScribeError::Storage(format!("Failed to {} {:?}: {}", action, path, e))
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<String> {
        let path = self.path_for(bucket, key)?;
        let dir = self.root.join(bucket);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_failure("create", &dir, e))?;

        // Write to a dot-file first so readers never see a partial blob.
        let tmp = dir.join(format!(".{}.{}.tmp", key, uuid::Uuid::new_v4()));
        if let Err(e) = tokio::fs::write(&tmp, &bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_failure("write", &tmp, e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_failure("move blob into", &path, e));
        }

        debug!("Stored {} bytes at {:?}", bytes.len(), path);
        Ok(key.to_string())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ScribeError::Storage(
                format!("Blob {}/{} not found", bucket, key),
            )),
            Err(e) => Err(io_failure("read", &path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_fs_blob_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        let key = store.put("session-indices", "s1-a.vidx", vec![9, 8, 7]).await.unwrap();
        assert_eq!(key, "s1-a.vidx");
        assert_eq!(store.get("session-indices", "s1-a.vidx").await.unwrap(), vec![9, 8, 7]);
        assert!(dir.path().join("session-indices").join("s1-a.vidx").exists());

        // Overwrite replaces the content.
        store.put("session-indices", "s1-a.vidx", vec![1]).await.unwrap();
        assert_eq!(store.get("session-indices", "s1-a.vidx").await.unwrap(), vec![1]);

        // No temp files left behind.
        let entries = std::fs::read_dir(dir.path().join("session-indices")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_fs_blob_missing_and_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        tokio_test::assert_err!(store.get("bucket", "absent").await);
        assert!(matches!(
            store.put("bucket", "../escape", vec![]).await,
            Err(ScribeError::InvalidInput(_))
        ));
        assert!(matches!(
            store.put("../bucket", "k", vec![]).await,
            Err(ScribeError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_fs_blob_io_failures_are_storage_errors() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"plain file").unwrap();
        let store = FsBlobStore::new(&file);

        let err = store
            .put("session-indices", "k.vidx", vec![1, 2, 3])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);

        let err = store.get("session-indices", "k.vidx").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}

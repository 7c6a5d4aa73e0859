//! Storage Gateway
//!
//! Moves objects between the injected store and local scratch files.

use crate::{ObjectStore, StorageError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Downloads objects to scratch space and uploads local files
#[derive(Clone)]
pub struct StorageGateway {
    store: Arc<dyn ObjectStore>,
    scratch_dir: PathBuf,
}

impl StorageGateway {
    pub fn new(store: Arc<dyn ObjectStore>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Fetch an object into a fresh scratch file and return its path
    pub async fn download(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        let body = self.store.get_object(bucket, key).await?;

        let name = key.rsplit('/').next().filter(|n| !n.is_empty()).unwrap_or("object");
        let path = self.scratch_dir.join(format!("{}-{}", Uuid::new_v4(), name));

        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|source| StorageError::Io {
                path: self.scratch_dir.clone(),
                source,
            })?;
        tokio::fs::write(&path, &body)
            .await
            .map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;

        info!(
            "Downloaded {}/{} ({} bytes) to {}",
            bucket,
            key,
            body.len(),
            path.display()
        );
        Ok(path)
    }

    /// Persist a local file as an object
    pub async fn upload(&self, local: &Path, bucket: &str, key: &str) -> Result<(), StorageError> {
        let body = tokio::fs::read(local)
            .await
            .map_err(|source| StorageError::Io {
                path: local.to_path_buf(),
                source,
            })?;
        let size = body.len();
        self.store.put_object(bucket, key, body).await?;
        info!("Uploaded {} to {}/{} ({} bytes)", local.display(), bucket, key, size);
        Ok(())
    }

    /// Remove a scratch file, ignoring files that are already gone
    pub async fn discard(&self, local: &Path) {
        match tokio::fs::remove_file(local).await {
            Ok(()) => debug!("Removed scratch file {}", local.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove scratch file {}: {}", local.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryObjectStore;

    #[tokio::test]
    async fn test_download_to_unique_scratch_files() {
        let scratch = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("raw", "night/subject 1.edf", b"EDF".to_vec()).unwrap();
        let gateway = StorageGateway::new(store, scratch.path());

        let first = gateway.download("raw", "night/subject 1.edf").await.unwrap();
        let second = gateway.download("raw", "night/subject 1.edf").await.unwrap();

        assert_ne!(first, second);
        assert!(first.starts_with(scratch.path()));
        assert!(first.to_string_lossy().ends_with("-subject 1.edf"));
        assert_eq!(std::fs::read(&first).unwrap(), b"EDF");
    }

    #[tokio::test]
    async fn test_download_missing_object() {
        let scratch = tempfile::tempdir().unwrap();
        let gateway = StorageGateway::new(Arc::new(MemoryObjectStore::new()), scratch.path());
        assert!(matches!(
            gateway.download("raw", "absent.edf").await,
            Err(StorageError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_upload_and_discard() {
        let scratch = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryObjectStore::new());
        let gateway = StorageGateway::new(store.clone(), scratch.path());

        let local = scratch.path().join("r-report.json");
        std::fs::write(&local, b"{}").unwrap();
        gateway.upload(&local, "raw_final_report", "a.edf-report.json").await.unwrap();
        assert_eq!(store.get("raw_final_report", "a.edf-report.json").unwrap().unwrap(), b"{}");

        gateway.discard(&local).await;
        assert!(!local.exists());
        gateway.discard(&local).await;
    }

    #[tokio::test]
    async fn test_upload_missing_local_file() {
        let scratch = tempfile::tempdir().unwrap();
        let gateway = StorageGateway::new(Arc::new(MemoryObjectStore::new()), scratch.path());
        let err = gateway
            .upload(&scratch.path().join("none.json"), "b", "k")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }
}

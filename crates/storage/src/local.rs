//! Filesystem Object Store
//!
//! Each bucket is a directory under the root; keys are relative paths inside it.

use crate::{ObjectStore, StorageError};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Object store backed by a local directory tree
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        info!("Using local object store at {}", root.display());
        Self { root }
    }

    /// Filesystem path of an object
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        if !is_plain_relative(Path::new(bucket)) || bucket.contains(['/', '\\']) {
            return Err(StorageError::InvalidLocation(format!("bucket {bucket:?}")));
        }
        if !is_plain_relative(Path::new(key)) {
            return Err(StorageError::InvalidLocation(format!("key {key:?}")));
        }
        Ok(self.root.join(bucket).join(key))
    }
}

/// Non-empty, relative, and free of `.`/`..` components
fn is_plain_relative(path: &Path) -> bool {
    let mut components = path.components().peekable();
    components.peek().is_some() && components.all(|c| matches!(c, Component::Normal(_)))
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(body) => {
                debug!("Read {} bytes from {}", body.len(), path.display());
                Ok(body)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StorageError> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&path, &body)
            .await
            .map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;
        debug!("Wrote {} bytes to {}", body.len(), path.display());
        Ok(())
    }
}

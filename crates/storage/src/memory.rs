//! In-Memory Object Store

use crate::{ObjectStore, StorageError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Object store kept entirely in memory
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<(String, String), Vec<u8>>>, StorageError> {
        self.objects
            .lock()
            .map_err(|e| StorageError::Backend(format!("Lock error: {}", e)))
    }

    /// Seed an object without going through the async API
    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) -> Result<(), StorageError> {
        self.lock()?
            .insert((bucket.to_string(), key.to_string()), body.into());
        Ok(())
    }

    /// Read an object without going through the async API
    pub fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self
            .lock()?
            .get(&(bucket.to_string(), key.to_string()))
            .cloned())
    }

    /// Total number of stored objects
    pub fn object_count(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or(0)
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.get(bucket, key)?.ok_or_else(|| StorageError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StorageError> {
        debug!("Storing {} bytes at {}/{}", body.len(), bucket, key);
        self.insert(bucket, key, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryObjectStore::new();
        store.put_object("raw", "a.edf", vec![1, 2, 3]).await.unwrap();

        assert_eq!(store.get_object("raw", "a.edf").await.unwrap(), vec![1, 2, 3]);
        assert_eq!(store.object_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_object() {
        let store = MemoryObjectStore::new();
        let err = store.get_object("raw", "nope").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_put_replaces() {
        let store = MemoryObjectStore::new();
        store.insert("b", "k", b"old".to_vec()).unwrap();
        store.put_object("b", "k", b"new".to_vec()).await.unwrap();
        assert_eq!(store.get("b", "k").unwrap().unwrap(), b"new");
        assert_eq!(store.object_count(), 1);
    }

    #[tokio::test]
    async fn test_poisoned_lock_is_backend_error() {
        let store = std::sync::Arc::new(MemoryObjectStore::new());
        store.insert("raw", "a.edf", vec![1]).unwrap();

        let holder = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = holder.objects.lock().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        let err = store.get_object("raw", "a.edf").await.unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));
        assert!(matches!(
            store.put_object("raw", "b.edf", vec![2]).await,
            Err(StorageError::Backend(_))
        ));
    }
}

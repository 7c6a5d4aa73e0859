//! Storage Layer
//!
//! Object store abstraction injected into the pipeline, with filesystem and
//! in-memory backends and a gateway that moves objects through local
//! scratch space.

mod gateway;
mod local;
mod memory;

pub use gateway::StorageGateway;
pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },
    #[error("Invalid object location: {0}")]
    InvalidLocation(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Bucket/key addressed object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object's bytes
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Store an object, replacing any existing one
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StorageError>;
}

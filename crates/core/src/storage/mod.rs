//! Pluggable object storage for screenshots and throttle markers.
//!
//! The service only needs four operations on string-keyed byte blobs:
//! get, head, put, and a one-level listing. Three backends ship with the
//! crate:
//!
//! - [`MemoryStore`] -- process-local map, used by tests and the `memory` backend.
//! - [`FsStore`] -- files under a root directory with JSON metadata sidecars.
//! - [`S3Store`] -- any S3-compatible bucket (requires the `s3` feature).

mod fs;
mod memory;
#[cfg(feature = "s3")]
mod s3;

pub use fs::FsStore;
pub use memory::MemoryStore;
#[cfg(feature = "s3")]
pub use s3::S3Store;

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::Error;
use crate::config::{StorageBackend, StorageConfig};

/// Attributes of a stored object, without its body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    pub content_type: Option<String>,
    /// Small user-defined string map attached at write time.
    pub metadata: BTreeMap<String, String>,
}

/// A stored object with its body.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub meta: ObjectMeta,
}

/// Options for [`BlobStore::put`].
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub content_type: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

/// Trait for object storage backends.
///
/// Implementations must be shareable across request tasks.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch an object, or `None` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, Error>;

    /// Fetch object attributes only, or `None` when the key does not exist.
    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, Error>;

    /// Create or overwrite an object.
    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<(), Error>;

    /// Every key directly under `prefix` (no further `/` after it).
    ///
    /// Backends that paginate must follow continuation tokens until the
    /// listing is complete.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, Error>;
}

/// Build the configured storage backend.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>, Error> {
    let store: Arc<dyn BlobStore> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::Fs => Arc::new(FsStore::new(&config.root)),
        #[cfg(feature = "s3")]
        StorageBackend::S3 => Arc::new(S3Store::from_config(config).await?),
        #[cfg(not(feature = "s3"))]
        StorageBackend::S3 => {
            return Err(Error::Storage("s3 backend requested but the `s3` feature is disabled".into()));
        }
    };

    tracing::info!(backend = ?config.backend, "object storage ready");
    Ok(store)
}

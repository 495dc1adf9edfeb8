//! In-memory storage backend.

use std::collections::BTreeMap;

use bytes::Bytes;
use tokio::sync::RwLock;

use super::{BlobStore, ObjectMeta, PutOptions, StoredObject};
use crate::Error;

/// Storage backend that keeps every object in a process-local map.
///
/// Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, Error> {
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, Error> {
        Ok(self.objects.read().await.get(key).map(|o| o.meta.clone()))
    }

    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<(), Error> {
        let meta = ObjectMeta {
            key: key.to_string(),
            size: data.len() as u64,
            content_type: options.content_type,
            metadata: options.metadata,
        };
        self.objects
            .write()
            .await
            .insert(key.to_string(), StoredObject { data, meta });
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, Error> {
        let objects = self.objects.read().await;
        Ok(objects
            .range(prefix.to_string()..)
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(prefix))
            .filter(|key| !key[prefix.len()..].contains('/'))
            .cloned()
            .collect())
    }
}

use crate::store::{BlobStore, BlobStoreError, BlobStoreResult, validate_location};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

type ObjectMap = BTreeMap<(String, String), Vec<u8>>;

#[derive(Clone, Debug, Default)]
pub struct MemoryBlobStore {
    inner: Arc<Mutex<ObjectMap>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.inner
            .lock()
            .map(|objects| objects.contains_key(&(bucket.to_string(), key.to_string())))
            .unwrap_or(false)
    }

    /// Keys currently stored in `bucket`, in lexical order.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let Ok(objects) = self.inner.lock() else {
            return Vec::new();
        };
        objects
            .keys()
            .filter(|(object_bucket, _)| object_bucket == bucket)
            .map(|(_, key)| key.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> BlobStoreResult<()> {
        validate_location(bucket, key)?;
        let mut objects = self
            .inner
            .lock()
            .map_err(|_| BlobStoreError::Backend("memory blobstore mutex poisoned".to_string()))?;
        objects.insert((bucket.to_string(), key.to_string()), bytes);
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> BlobStoreResult<Vec<u8>> {
        validate_location(bucket, key)?;
        let objects = self
            .inner
            .lock()
            .map_err(|_| BlobStoreError::Backend("memory blobstore mutex poisoned".to_string()))?;
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| BlobStoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

pub type BlobStoreResult<T> = Result<T, BlobStoreError>;

/// Opaque payload storage addressed by `(bucket, key)`.
///
/// Implementations must tolerate concurrent calls for independent keys. Nothing in
/// this workspace deletes objects; retention is owned by whoever operates the store.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `bucket`/`key`, replacing any previous object.
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> BlobStoreResult<()>;

    /// Fetch the object at `bucket`/`key`. Absent objects are [`BlobStoreError::NotFound`].
    async fn get(&self, bucket: &str, key: &str) -> BlobStoreResult<Vec<u8>>;
}

pub(crate) fn validate_location(bucket: &str, key: &str) -> BlobStoreResult<()> {
    if bucket.is_empty() {
        return Err(BlobStoreError::InvalidInput(
            "bucket name must not be empty".to_string(),
        ));
    }
    if key.is_empty() {
        return Err(BlobStoreError::InvalidInput(
            "object key must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blobstore_error_not_found_expected_location_in_message() {
        let error = BlobStoreError::NotFound {
            bucket: "payloads".to_string(),
            key: "k1".to_string(),
        };

        assert!(matches!(error, BlobStoreError::NotFound { .. }));
        assert_eq!(error.to_string(), "object not found: payloads/k1");
    }

    #[test]
    fn validate_location_empty_key_expected_invalid_input() {
        let error = validate_location("payloads", "").expect_err("empty key should fail");
        assert!(matches!(error, BlobStoreError::InvalidInput(_)));
    }
}

use spillway_blobstore::BlobStoreError;
use std::fmt;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure reported by a queue transport implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("transport unavailable: {0}")]
    Unavailable(String),
    #[error("backend failure: {0}")]
    Backend(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlobOperation {
    Put,
    Get,
}

impl fmt::Display for BlobOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Put => f.write_str("put"),
            Self::Get => f.write_str("get"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueOperation {
    Send,
    SendBatch,
    Delete,
}

impl fmt::Display for QueueOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send => f.write_str("send"),
            Self::SendBatch => f.write_str("send_batch"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// Top-level error type for the extended producer and consumer.
#[derive(Debug, Error)]
pub enum ExtendedError {
    #[error("blob {operation} failed for {bucket}/{key}: {source}")]
    BlobOperation {
        operation: BlobOperation,
        bucket: String,
        key: String,
        #[source]
        source: BlobStoreError,
    },
    #[error("queue {operation} failed: {source}")]
    QueueOperation {
        operation: QueueOperation,
        #[source]
        source: TransportError,
    },
    #[error("malformed offload pointer: {0}")]
    MalformedPointer(String),
    #[error("serialization failed: {0}")]
    Serialization(String),
    #[error("payload cannot be delivered: {0}")]
    Payload(String),
    #[error("message handler failed: {0}")]
    Handler(#[source] BoxError),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type ExtendedResult<T> = Result<T, ExtendedError>;

impl ExtendedError {
    pub(crate) fn blob(
        operation: BlobOperation,
        bucket: &str,
        key: &str,
        source: BlobStoreError,
    ) -> Self {
        Self::BlobOperation {
            operation,
            bucket: bucket.to_string(),
            key: key.to_string(),
            source,
        }
    }

    pub(crate) fn queue(operation: QueueOperation, source: TransportError) -> Self {
        Self::QueueOperation { operation, source }
    }
}

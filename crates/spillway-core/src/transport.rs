use crate::errors::TransportError;
use crate::message::SendEntry;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub id: String,
    pub message_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntryFailure {
    pub id: String,
    pub message: String,
}

/// Per-entry outcome of a batch submission that the transport itself accepted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSendOutput {
    pub successful: Vec<SendReceipt>,
    pub failed: Vec<BatchEntryFailure>,
}

/// Sending half of the underlying queue.
#[async_trait::async_trait]
pub trait QueueProducer: Send + Sync {
    async fn send(&self, entry: SendEntry) -> Result<SendReceipt, TransportError>;

    /// Submit `entries` in one call, preserving their order.
    async fn send_batch(&self, entries: Vec<SendEntry>) -> Result<BatchSendOutput, TransportError>;
}

/// Acknowledgement half of the underlying queue. Only ever sees unmarked handles.
#[async_trait::async_trait]
pub trait QueueAcknowledger: Send + Sync {
    async fn delete(&self, receipt_handle: &str) -> Result<(), TransportError>;

    async fn delete_batch(&self, receipt_handles: Vec<String>) -> Result<(), TransportError> {
        for receipt_handle in &receipt_handles {
            self.delete(receipt_handle).await?;
        }
        Ok(())
    }
}

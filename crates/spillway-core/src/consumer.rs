use crate::config::ExtendedConfig;
use crate::errors::{BlobOperation, BoxError, ExtendedError, ExtendedResult, QueueOperation};
use crate::message::{DeliveredMessage, ReceivedMessage};
use crate::pointer::{OffloadPointer, pointer_from_attributes, pointer_from_body};
use crate::receipt::{embed_in_receipt_handle, extract_pointer, has_markers, strip_markers};
use crate::transform::{DefaultReceiveTransform, ReceiveTransform};
use crate::transport::QueueAcknowledger;
use spillway_blobstore::BlobStore;
use std::future::Future;
use std::sync::Arc;

/// Application callback invoked with each resolved message.
#[async_trait::async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: DeliveredMessage) -> Result<(), BoxError>;
}

#[async_trait::async_trait]
impl<F, Fut> MessageHandler for F
where
    F: Fn(DeliveredMessage) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    async fn handle(&self, message: DeliveredMessage) -> Result<(), BoxError> {
        self(message).await
    }
}

/// Consumer-side half of the offload protocol.
///
/// Polling is left to the caller: hand each raw message to [`ExtendedConsumer::process`]
/// (or [`ExtendedConsumer::resolve`]) and acknowledge through
/// [`ExtendedConsumer::acknowledge`], which strips receipt-handle markers before the
/// queue sees them.
pub struct ExtendedConsumer {
    config: ExtendedConfig,
    store: Arc<dyn BlobStore>,
    receive_transform: Arc<dyn ReceiveTransform>,
    acknowledger: Option<Arc<dyn QueueAcknowledger>>,
}

impl ExtendedConsumer {
    pub fn new(config: ExtendedConfig, store: Arc<dyn BlobStore>) -> ExtendedResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            receive_transform: Arc::new(DefaultReceiveTransform),
            acknowledger: None,
        })
    }

    pub fn with_receive_transform(mut self, receive_transform: Arc<dyn ReceiveTransform>) -> Self {
        self.receive_transform = receive_transform;
        self
    }

    pub fn with_acknowledger(mut self, acknowledger: Arc<dyn QueueAcknowledger>) -> Self {
        self.acknowledger = Some(acknowledger);
        self
    }

    pub fn config(&self) -> &ExtendedConfig {
        &self.config
    }

    /// Locate the offload pointer: attribute first, then receipt-handle markers (when
    /// enabled), then an envelope body. A malformed attribute is an error.
    pub fn discover_pointer(
        &self,
        message: &ReceivedMessage,
    ) -> ExtendedResult<Option<OffloadPointer>> {
        if let Some(pointer) = pointer_from_attributes(&message.attributes)? {
            return Ok(Some(pointer));
        }
        if self.config.use_receipt_handle_markers {
            if let Some(pointer) = extract_pointer(&message.receipt_handle) {
                return Ok(Some(pointer));
            }
        }
        Ok(pointer_from_body(&message.body))
    }

    /// Fetch the offloaded payload (if any) and build the message the handler sees.
    pub async fn resolve(&self, message: ReceivedMessage) -> ExtendedResult<DeliveredMessage> {
        let pointer = self.discover_pointer(&message)?;
        let mut receipt_handle = message.receipt_handle.clone();

        let blob_content = match &pointer {
            Some(pointer) => {
                let bytes = self
                    .store
                    .get(&pointer.bucket, &pointer.key)
                    .await
                    .map_err(|err| {
                        ExtendedError::blob(BlobOperation::Get, &pointer.bucket, &pointer.key, err)
                    })?;
                if self.config.use_receipt_handle_markers && !has_markers(&receipt_handle) {
                    receipt_handle =
                        embed_in_receipt_handle(&pointer.bucket, &pointer.key, &receipt_handle);
                }
                tracing::debug!(
                    message_id = %message.id,
                    bucket = %pointer.bucket,
                    key = %pointer.key,
                    size = bytes.len(),
                    "offloaded payload fetched"
                );
                Some(bytes)
            }
            None => None,
        };

        let body = self.receive_transform.transform(&message, blob_content)?;
        Ok(DeliveredMessage {
            id: message.id,
            body,
            attributes: message.attributes,
            receipt_handle,
            pointer,
        })
    }

    /// Resolve `message` and run `handler` on it. Any failure aborts this message;
    /// redelivery is left to the queue.
    pub async fn process<H>(&self, message: ReceivedMessage, handler: &H) -> ExtendedResult<()>
    where
        H: MessageHandler + ?Sized,
    {
        let delivered = self.resolve(message).await?;
        handler
            .handle(delivered)
            .await
            .map_err(ExtendedError::Handler)
    }

    pub async fn acknowledge(&self, receipt_handle: &str) -> ExtendedResult<()> {
        let acknowledger = self.acknowledger()?;
        acknowledger
            .delete(strip_markers(receipt_handle))
            .await
            .map_err(|err| ExtendedError::queue(QueueOperation::Delete, err))
    }

    pub async fn acknowledge_batch(&self, receipt_handles: &[String]) -> ExtendedResult<()> {
        let acknowledger = self.acknowledger()?;
        let stripped = receipt_handles
            .iter()
            .map(|handle| strip_markers(handle).to_string())
            .collect();
        acknowledger
            .delete_batch(stripped)
            .await
            .map_err(|err| ExtendedError::queue(QueueOperation::Delete, err))
    }

    fn acknowledger(&self) -> ExtendedResult<&Arc<dyn QueueAcknowledger>> {
        self.acknowledger.as_ref().ok_or_else(|| {
            ExtendedError::InvalidConfiguration(
                "no queue acknowledger configured for this consumer".to_string(),
            )
        })
    }
}

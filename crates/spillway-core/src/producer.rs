use crate::config::ExtendedConfig;
use crate::errors::{BlobOperation, ExtendedError, ExtendedResult, QueueOperation};
use crate::message::{OutgoingMessage, SendEntry};
use crate::pointer::{OffloadPointer, POINTER_ATTRIBUTE, envelope_body};
use crate::transform::{SendTransform, SendTransformOutput};
use crate::transport::{BatchEntryFailure, QueueProducer, SendReceipt};
use futures::future::join_all;
use spillway_blobstore::BlobStore;
use std::sync::Arc;
use uuid::Uuid;

/// An entry that never reached the transport because its preparation failed.
#[derive(Debug)]
pub struct PreparationFailure {
    pub id: String,
    pub error: ExtendedError,
}

#[derive(Debug, Default)]
pub struct BatchSendReport {
    pub successful: Vec<SendReceipt>,
    /// Entries the transport accepted the batch for but rejected individually.
    pub failed: Vec<BatchEntryFailure>,
    pub preparation_failed: Vec<PreparationFailure>,
}

impl BatchSendReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty() && self.preparation_failed.is_empty()
    }
}

/// `<prefix><uuid-v4>.json`; the prefix is used verbatim.
pub fn generate_object_key(prefix: &str) -> String {
    format!("{prefix}{}.json", Uuid::new_v4())
}

/// Queue producer that offloads oversized bodies to a blob store.
///
/// The blob write always completes before the queue send starts, so a queued
/// pointer never references an object that was not written.
pub struct ExtendedProducer {
    config: ExtendedConfig,
    transport: Arc<dyn QueueProducer>,
    store: Arc<dyn BlobStore>,
    send_transform: Arc<dyn SendTransform>,
}

impl ExtendedProducer {
    pub fn new(
        config: ExtendedConfig,
        transport: Arc<dyn QueueProducer>,
        store: Arc<dyn BlobStore>,
    ) -> ExtendedResult<Self> {
        config.validate()?;
        let send_transform = Arc::new(config.send_transform());
        Ok(Self {
            config,
            transport,
            store,
            send_transform,
        })
    }

    pub fn with_send_transform(mut self, send_transform: Arc<dyn SendTransform>) -> Self {
        self.send_transform = send_transform;
        self
    }

    pub fn config(&self) -> &ExtendedConfig {
        &self.config
    }

    pub async fn send(&self, message: OutgoingMessage) -> ExtendedResult<SendReceipt> {
        let entry = self.prepare(message).await?;
        self.transport
            .send(entry)
            .await
            .map_err(|err| ExtendedError::queue(QueueOperation::Send, err))
    }

    /// Prepare every message concurrently, then submit the survivors in input order.
    ///
    /// A message whose upload fails is reported in `preparation_failed` and left out
    /// of the batch; only a failure of the batch submission itself fails the call.
    pub async fn send_batch(
        &self,
        messages: Vec<OutgoingMessage>,
    ) -> ExtendedResult<BatchSendReport> {
        let prepared = join_all(messages.into_iter().map(|message| async move {
            let id = message.id.clone();
            (id, self.prepare(message).await)
        }))
        .await;

        let mut entries = Vec::with_capacity(prepared.len());
        let mut report = BatchSendReport::default();
        for (id, result) in prepared {
            match result {
                Ok(entry) => entries.push(entry),
                Err(error) => {
                    tracing::warn!(message_id = %id, %error, "batch entry preparation failed");
                    report.preparation_failed.push(PreparationFailure { id, error });
                }
            }
        }

        if entries.is_empty() {
            return Ok(report);
        }

        let output = self
            .transport
            .send_batch(entries)
            .await
            .map_err(|err| ExtendedError::queue(QueueOperation::SendBatch, err))?;
        report.successful = output.successful;
        report.failed = output.failed;
        Ok(report)
    }

    async fn prepare(&self, message: OutgoingMessage) -> ExtendedResult<SendEntry> {
        let OutgoingMessage {
            id,
            body,
            mut attributes,
            transport_fields,
        } = message;
        let serialized =
            serde_json::to_string(&body).map_err(|err| ExtendedError::Serialization(err.to_string()))?;

        let body = match self.send_transform.transform(&serialized, &attributes) {
            SendTransformOutput::Inline(body) => body,
            SendTransformOutput::Offload(content) => {
                let pointer = OffloadPointer::new(
                    self.config.bucket.clone(),
                    generate_object_key(&self.config.key_prefix),
                );
                let size = content.len();
                self.store
                    .put(&pointer.bucket, &pointer.key, content.into_bytes())
                    .await
                    .map_err(|err| {
                        ExtendedError::blob(BlobOperation::Put, &pointer.bucket, &pointer.key, err)
                    })?;
                tracing::debug!(
                    message_id = %id,
                    bucket = %pointer.bucket,
                    key = %pointer.key,
                    size,
                    "message payload offloaded"
                );
                attributes.insert(POINTER_ATTRIBUTE.to_string(), pointer.to_attribute());
                envelope_body(&pointer)?
            }
        };

        Ok(SendEntry {
            id,
            body,
            attributes,
            transport_fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_object_key_expected_prefix_and_suffix() {
        let key = generate_object_key("large/");
        assert!(key.starts_with("large/"));
        assert!(key.ends_with(".json"));
        assert_eq!(key.len(), "large/".len() + 36 + ".json".len());
    }

    #[test]
    fn generate_object_key_twice_expected_distinct() {
        assert_ne!(generate_object_key(""), generate_object_key(""));
    }
}

//! In-memory doubles for the queue transport and blob store.

use crate::errors::TransportError;
use crate::message::SendEntry;
use crate::transport::{BatchSendOutput, QueueAcknowledger, QueueProducer, SendReceipt};
use async_trait::async_trait;
use spillway_blobstore::{BlobStore, BlobStoreError, BlobStoreResult, MemoryBlobStore};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, Default)]
pub struct RecordingQueue {
    inner: Arc<Mutex<RecordingQueueState>>,
}

#[derive(Clone, Debug, Default)]
struct RecordingQueueState {
    next_message_id: u64,
    sent: Vec<SendEntry>,
    batches: Vec<Vec<SendEntry>>,
    deleted: Vec<String>,
    fail_sends: bool,
    fail_deletes: bool,
}

impl RecordingQueueState {
    fn allocate_message_id(&mut self) -> String {
        self.next_message_id += 1;
        format!("msg-{}", self.next_message_id)
    }
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send and batch submission fail.
    pub fn fail_sends(&self) {
        self.state().fail_sends = true;
    }

    pub fn fail_deletes(&self) {
        self.state().fail_deletes = true;
    }

    pub fn sent(&self) -> Vec<SendEntry> {
        self.state().sent.clone()
    }

    pub fn batches(&self) -> Vec<Vec<SendEntry>> {
        self.state().batches.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state().deleted.clone()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, RecordingQueueState> {
        self.inner.lock().expect("recording queue mutex poisoned")
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, RecordingQueueState>, TransportError> {
        self.inner
            .lock()
            .map_err(|_| TransportError::Backend("recording queue mutex poisoned".to_string()))
    }
}

#[async_trait]
impl QueueProducer for RecordingQueue {
    async fn send(&self, entry: SendEntry) -> Result<SendReceipt, TransportError> {
        let mut state = self.lock()?;
        if state.fail_sends {
            return Err(TransportError::Unavailable("send disabled".to_string()));
        }
        let message_id = state.allocate_message_id();
        let id = entry.id.clone();
        state.sent.push(entry);
        Ok(SendReceipt {
            id,
            message_id: Some(message_id),
        })
    }

    async fn send_batch(&self, entries: Vec<SendEntry>) -> Result<BatchSendOutput, TransportError> {
        let mut state = self.lock()?;
        if state.fail_sends {
            return Err(TransportError::Unavailable("send_batch disabled".to_string()));
        }
        let successful = entries
            .iter()
            .map(|entry| SendReceipt {
                id: entry.id.clone(),
                message_id: Some(state.allocate_message_id()),
            })
            .collect();
        state.batches.push(entries);
        Ok(BatchSendOutput {
            successful,
            failed: Vec::new(),
        })
    }
}

#[async_trait]
impl QueueAcknowledger for RecordingQueue {
    async fn delete(&self, receipt_handle: &str) -> Result<(), TransportError> {
        let mut state = self.lock()?;
        if state.fail_deletes {
            return Err(TransportError::Rejected(format!(
                "receipt handle {receipt_handle} rejected"
            )));
        }
        state.deleted.push(receipt_handle.to_string());
        Ok(())
    }
}

/// Memory-backed store that records calls and can inject failures.
#[derive(Clone, Debug, Default)]
pub struct RecordingBlobStore {
    objects: MemoryBlobStore,
    inner: Arc<Mutex<RecordingBlobState>>,
}

#[derive(Clone, Debug, Default)]
struct RecordingBlobState {
    puts: Vec<(String, String)>,
    gets: Vec<(String, String)>,
    failing_put_needles: BTreeSet<String>,
    fail_gets: bool,
}

impl RecordingBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objects(&self) -> &MemoryBlobStore {
        &self.objects
    }

    /// Fail any put whose content contains `needle`.
    pub fn fail_puts_containing(&self, needle: impl Into<String>) {
        self.state().failing_put_needles.insert(needle.into());
    }

    pub fn fail_gets(&self) {
        self.state().fail_gets = true;
    }

    pub fn puts(&self) -> Vec<(String, String)> {
        self.state().puts.clone()
    }

    pub fn gets(&self) -> Vec<(String, String)> {
        self.state().gets.clone()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, RecordingBlobState> {
        self.inner.lock().expect("recording blobstore mutex poisoned")
    }

    fn lock(&self) -> BlobStoreResult<std::sync::MutexGuard<'_, RecordingBlobState>> {
        self.inner
            .lock()
            .map_err(|_| BlobStoreError::Backend("recording blobstore mutex poisoned".to_string()))
    }
}

#[async_trait]
impl BlobStore for RecordingBlobStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> BlobStoreResult<()> {
        {
            let mut state = self.lock()?;
            state.puts.push((bucket.to_string(), key.to_string()));
            let content = String::from_utf8_lossy(&bytes);
            if state
                .failing_put_needles
                .iter()
                .any(|needle| content.contains(needle.as_str()))
            {
                return Err(BlobStoreError::Backend(format!(
                    "injected put failure for {bucket}/{key}"
                )));
            }
        }
        self.objects.put(bucket, key, bytes).await
    }

    async fn get(&self, bucket: &str, key: &str) -> BlobStoreResult<Vec<u8>> {
        {
            let mut state = self.lock()?;
            state.gets.push((bucket.to_string(), key.to_string()));
            if state.fail_gets {
                return Err(BlobStoreError::Backend(format!(
                    "injected get failure for {bucket}/{key}"
                )));
            }
        }
        self.objects.get(bucket, key).await
    }
}

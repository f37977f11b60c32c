//! Mock transports for testing.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::{BroadcastTransport, Envelope, QueueMessage, QueueTransport, Result, TransportError};

/// Mock broadcast transport that records published envelopes.
#[derive(Default)]
pub struct MockBroadcast {
    published: RwLock<Vec<Envelope>>,
    fail_on_publish: RwLock<bool>,
}

impl MockBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_publish(&self, fail: bool) {
        *self.fail_on_publish.write().await = fail;
    }

    pub async fn published_count(&self) -> usize {
        self.published.read().await.len()
    }

    pub async fn take_published(&self) -> Vec<Envelope> {
        std::mem::take(&mut *self.published.write().await)
    }
}

#[async_trait]
impl BroadcastTransport for MockBroadcast {
    async fn publish(&self, envelope: &Envelope) -> Result<()> {
        if *self.fail_on_publish.read().await {
            return Err(TransportError::Publish("mock publish failure".to_string()));
        }
        self.published.write().await.push(envelope.clone());
        Ok(())
    }
}

/// Mock queue transport serving preloaded messages and recording deletes.
#[derive(Default)]
pub struct MockQueue {
    messages: Mutex<VecDeque<QueueMessage>>,
    deleted: RwLock<Vec<String>>,
    fail_on_receive: RwLock<bool>,
}

impl MockQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a raw message body.
    pub async fn push(&self, body: &str) {
        let id = Uuid::new_v4().to_string();
        self.messages.lock().await.push_back(QueueMessage {
            receipt: format!("receipt-{id}"),
            id,
            body: body.to_string(),
        });
    }

    pub async fn set_fail_on_receive(&self, fail: bool) {
        *self.fail_on_receive.write().await = fail;
    }

    pub async fn deleted_count(&self) -> usize {
        self.deleted.read().await.len()
    }

    pub async fn deleted_receipts(&self) -> Vec<String> {
        self.deleted.read().await.clone()
    }
}

#[async_trait]
impl QueueTransport for MockQueue {
    async fn receive(&self, max_messages: i32, _wait_time_secs: i32) -> Result<Vec<QueueMessage>> {
        if *self.fail_on_receive.read().await {
            return Err(TransportError::Receive("mock receive failure".to_string()));
        }
        let mut messages = self.messages.lock().await;
        let batch: Vec<QueueMessage> = (0..max_messages)
            .filter_map(|_| messages.pop_front())
            .collect();
        drop(messages);

        if batch.is_empty() {
            // Stand in for the long-poll wait so empty polls don't spin.
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Ok(batch)
    }

    async fn delete(&self, receipt: &str) -> Result<()> {
        self.deleted.write().await.push(receipt.to_string());
        Ok(())
    }
}

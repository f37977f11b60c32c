//! In-memory channel transport for standalone mode.
//!
//! Implements both sides of the pub/sub seam within a single process, so the
//! bridge and consumer can be exercised without external dependencies. No
//! redelivery simulation: a received message sits in flight until deleted.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tracing::debug;
use uuid::Uuid;

use super::{BroadcastTransport, Envelope, QueueMessage, QueueTransport, Result, TransportError};

/// Queue capacity before publishes are rejected.
const CHANNEL_CAPACITY: usize = 1024;

struct Inner {
    queue: Mutex<VecDeque<QueueMessage>>,
    in_flight: Mutex<HashMap<String, QueueMessage>>,
    notify: Notify,
}

/// In-process transport pair backed by a shared queue.
///
/// Clones share the same queue: publish on one clone, consume on another.
#[derive(Clone)]
pub struct ChannelTransport {
    inner: Arc<Inner>,
}

impl Default for ChannelTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(VecDeque::new()),
                in_flight: Mutex::new(HashMap::new()),
                notify: Notify::new(),
            }),
        }
    }

    /// Messages published but not yet received.
    pub async fn queue_len(&self) -> usize {
        self.inner.queue.lock().await.len()
    }

    /// Messages received but not yet deleted.
    pub async fn in_flight_count(&self) -> usize {
        self.inner.in_flight.lock().await.len()
    }
}

#[async_trait]
impl BroadcastTransport for ChannelTransport {
    async fn publish(&self, envelope: &Envelope) -> Result<()> {
        let body = envelope
            .to_body()
            .map_err(|e| TransportError::Publish(e.to_string()))?;

        let mut queue = self.inner.queue.lock().await;
        if queue.len() >= CHANNEL_CAPACITY {
            return Err(TransportError::Publish("channel full".to_string()));
        }
        let id = Uuid::new_v4().to_string();
        queue.push_back(QueueMessage {
            receipt: format!("receipt-{id}"),
            id,
            body,
        });
        drop(queue);

        self.inner.notify.notify_one();
        Ok(())
    }
}

#[async_trait]
impl QueueTransport for ChannelTransport {
    async fn receive(&self, max_messages: i32, wait_time_secs: i32) -> Result<Vec<QueueMessage>> {
        let deadline = Duration::from_secs(wait_time_secs.max(0) as u64);

        loop {
            let batch: Vec<QueueMessage> = {
                let mut queue = self.inner.queue.lock().await;
                (0..max_messages).filter_map(|_| queue.pop_front()).collect()
            };

            if !batch.is_empty() {
                let mut in_flight = self.inner.in_flight.lock().await;
                for message in &batch {
                    in_flight.insert(message.receipt.clone(), message.clone());
                }
                return Ok(batch);
            }

            // Long-poll: wait for a publish or give up at the deadline.
            if tokio::time::timeout(deadline, self.inner.notify.notified())
                .await
                .is_err()
            {
                return Ok(Vec::new());
            }
        }
    }

    async fn delete(&self, receipt: &str) -> Result<()> {
        if self.inner.in_flight.lock().await.remove(receipt).is_none() {
            debug!(receipt = %receipt, "Delete for unknown receipt");
        }
        Ok(())
    }
}

//! Command bus and transports.
//!
//! This module contains:
//! - `BroadcastTransport` / `QueueTransport` traits: the pub/sub seam
//! - `Envelope`: the wire representation of a broadcast command
//! - `Publisher`: outbound serialization and stamping
//! - `CommandBus`: local dispatch plus guarded broadcast
//! - `QueueConsumer`: the inbound poll loop
//! - Implementations: SNS/SQS, in-memory channel, mocks

use async_trait::async_trait;

pub mod bridge;
pub mod channel;
pub mod consumer;
pub mod envelope;
pub mod mock;
pub mod publisher;
#[cfg(feature = "sns-sqs")]
pub mod sns_sqs;

pub use bridge::{CommandBus, ExecuteError};
pub use channel::ChannelTransport;
pub use consumer::{ConsumerSettings, MessageOutcome, QueueConsumer};
pub use envelope::{Envelope, EnvelopeError};
pub use mock::{MockBroadcast, MockQueue};
pub use publisher::{PublishError, Publisher};
#[cfg(feature = "sns-sqs")]
pub use sns_sqs::{SnsBroadcast, SnsSqsConfig, SqsQueue};

// ============================================================================
// Traits
// ============================================================================

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors intrinsic to the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("receive failed: {0}")]
    Receive(String),

    #[error("delete failed: {0}")]
    Delete(String),
}

/// One message pulled from the queue transport.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    /// Transport-assigned message id.
    pub id: String,
    /// Raw message body.
    pub body: String,
    /// Token for acknowledging (deleting) the message.
    pub receipt: String,
}

/// Broadcast side of the pub/sub transport.
///
/// Fire-and-forget beyond the immediate success/failure of the call; the
/// client must support concurrent publishes.
#[async_trait]
pub trait BroadcastTransport: Send + Sync {
    async fn publish(&self, envelope: &Envelope) -> Result<()>;
}

/// Queue side of the pub/sub transport. At-least-once delivery: a message may
/// be redelivered after its visibility window unless deleted.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Long-poll for up to `max_messages`, waiting at most `wait_time_secs`.
    async fn receive(&self, max_messages: i32, wait_time_secs: i32) -> Result<Vec<QueueMessage>>;

    /// Delete a received message to prevent redelivery.
    async fn delete(&self, receipt: &str) -> Result<()>;
}

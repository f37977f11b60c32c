//! Outbound publisher.
//!
//! Serializes an executed command into a broadcast envelope, stamps the
//! originating service identity from configuration, and makes one call into
//! the broadcast transport.

use std::sync::Arc;

use tracing::debug;

use super::{BroadcastTransport, Envelope, TransportError};
use crate::command::Command;

/// Broadcast failed after successful local dispatch. Surfaced to the caller
/// as a partial-success signal; no automatic retry.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to serialize command payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Publishes executed commands to the broadcast transport.
pub struct Publisher {
    transport: Arc<dyn BroadcastTransport>,
    service_name: String,
}

impl Publisher {
    pub fn new(transport: Arc<dyn BroadcastTransport>, service_name: impl Into<String>) -> Self {
        Self {
            transport,
            service_name: service_name.into(),
        }
    }

    /// The configured service identity stamped on outbound envelopes.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Publish one command. One network call; transport retries, if any, are
    /// the transport client's responsibility.
    pub async fn publish(&self, command: &Command) -> Result<(), PublishError> {
        let envelope = Envelope {
            event_type: command.type_name.clone(),
            source_service: self.service_name.clone(),
            payload: command.data.clone(),
        };

        self.transport.publish(&envelope).await?;

        debug!(
            event_type = %envelope.event_type,
            source_service = %envelope.source_service,
            "Published command"
        );
        Ok(())
    }
}

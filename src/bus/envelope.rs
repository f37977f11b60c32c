//! Broadcast envelope.
//!
//! Wire representation produced by the publisher and consumed by peers.
//! Serialized as JSON with camelCase field names to match the wire-level
//! message attributes (`eventType`, `sourceService`).

use serde::{Deserialize, Serialize};

/// Envelope parse failures. Malformed inbound messages are logged and
/// deleted, never escalated.
#[derive(Debug, thiserror::Error)]
#[error("malformed envelope: {0}")]
pub struct EnvelopeError(#[from] serde_json::Error);

/// The wire wrapper around one broadcast command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// The command's logical type name.
    pub event_type: String,
    /// Identity of the publishing service, stamped at publish time and never
    /// altered downstream.
    pub source_service: String,
    /// Serialized command data.
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Serialize to the wire body.
    pub fn to_body(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from a wire body.
    pub fn parse(body: &str) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_str(body)?)
    }
}

//! Command model.
//!
//! A `Command` is the unit of work: a logical type name, an opaque JSON
//! payload, and two flags controlling broadcast behavior. Typed payloads
//! implement [`CommandPayload`] and are converted to/from the opaque form
//! at the edges.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Typed command payload.
///
/// Implementors define the wire-stable type name and whether executing the
/// command should be broadcast to peer services (default: yes).
pub trait CommandPayload: Serialize + DeserializeOwned + Send + 'static {
    /// Stable logical identifier, unique across the service family.
    const TYPE_NAME: &'static str;

    /// Whether a locally created command of this type is broadcast after
    /// successful dispatch. Purely local mutations opt out.
    const SHOULD_PUBLISH: bool = true;
}

/// A dispatchable intent to change state.
#[derive(Debug, Clone)]
pub struct Command {
    /// Logical type name, used for dispatch lookup and wire-level tagging.
    pub type_name: String,
    /// Caller-supplied arguments, shape defined per command type.
    pub data: serde_json::Value,
    /// True iff this instance was reconstructed from an inbound broadcast.
    /// Once true, the bridge never publishes this instance outward.
    pub from_transport: bool,
    /// False for command types that are dispatched locally only.
    pub should_publish: bool,
}

impl Command {
    /// Create a command from a typed payload.
    pub fn new<P: CommandPayload>(payload: &P) -> Result<Self, serde_json::Error> {
        Ok(Self {
            type_name: P::TYPE_NAME.to_string(),
            data: serde_json::to_value(payload)?,
            from_transport: false,
            should_publish: P::SHOULD_PUBLISH,
        })
    }

    /// Create a transport-origin command from wire data.
    ///
    /// Used by the registry when reconstructing inbound broadcasts; the
    /// resulting command is never re-published.
    pub fn from_wire(
        type_name: impl Into<String>,
        data: serde_json::Value,
        should_publish: bool,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            data,
            from_transport: true,
            should_publish,
        }
    }

    /// Recover the typed payload.
    pub fn payload<P: CommandPayload>(&self) -> Result<P, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}

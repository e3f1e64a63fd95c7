//! Wire frames exchanged over the multiplexed connection

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::LookoutError;

/// Subscription intent carried by an outgoing frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    Subscribe,
    Unsubscribe,
}

/// Frame sent from the client to declare channel interest.
///
/// Frames are immutable once built; the queue and the transport only ever
/// move them or read them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingFrame {
    #[serde(rename = "type")]
    kind: FrameKind,
    channel: String,
}

impl OutgoingFrame {
    pub fn subscribe(channel: impl Into<String>) -> Self {
        Self {
            kind: FrameKind::Subscribe,
            channel: channel.into(),
        }
    }

    pub fn unsubscribe(channel: impl Into<String>) -> Self {
        Self {
            kind: FrameKind::Unsubscribe,
            channel: channel.into(),
        }
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Encode as a JSON text message
    pub fn encode(&self) -> Result<String, LookoutError> {
        serde_json::to_string(self).map_err(LookoutError::SerializationError)
    }
}

/// Event frame pushed by the server for a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingFrame {
    /// Frame type (e.g. "event")
    #[serde(rename = "type")]
    pub kind: String,
    /// Event name, see [`crate::events`]
    pub event: String,
    /// Channel the event was published on
    pub channel: String,
    /// Opaque event body, passed through untouched
    #[serde(default)]
    pub payload: Value,
}

impl IncomingFrame {
    /// Decode a JSON text message
    pub fn decode(text: &str) -> Result<Self, LookoutError> {
        serde_json::from_str(text).map_err(LookoutError::SerializationError)
    }

    /// Deserialize the payload into a collaborator-defined type
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, LookoutError> {
        T::deserialize(&self.payload).map_err(LookoutError::SerializationError)
    }

    pub fn is_event(&self, event: &str) -> bool {
        self.event == event
    }
}

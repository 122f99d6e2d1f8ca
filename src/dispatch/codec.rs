//! Wire encodings for inbound messages.

use crate::error::{NotifyError, Result};
use crate::types::Message;
use serde::{Deserialize, Serialize};

/// Encoding of a raw message on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// `{"type": "...", "payload": {"key": number, ...}}`
    #[default]
    Json,
    /// The same shape encoded as a MessagePack map.
    #[serde(rename = "msgpack")]
    MessagePack,
}

impl WireFormat {
    /// Decode raw bytes. Anything that is not a type + payload pair is
    /// [`NotifyError::MalformedMessage`].
    pub fn decode(self, raw: &[u8]) -> Result<Message> {
        match self {
            WireFormat::Json => serde_json::from_slice(raw)
                .map_err(|e| NotifyError::MalformedMessage(e.to_string())),
            WireFormat::MessagePack => rmp_serde::from_slice(raw)
                .map_err(|e| NotifyError::MalformedMessage(e.to_string())),
        }
    }

    /// Encode a message. Non-finite values are rejected since no decoder
    /// would accept them back.
    pub fn encode(self, message: &Message) -> Result<Vec<u8>> {
        if let Some((key, value)) = message.payload.iter().find(|(_, v)| !v.is_finite()) {
            return Err(NotifyError::Serialization(format!(
                "{:?}: value {value} for key {key:?} is not finite",
                message.message_type
            )));
        }

        match self {
            WireFormat::Json => {
                serde_json::to_vec(message).map_err(|e| NotifyError::Serialization(e.to_string()))
            }
            WireFormat::MessagePack => Ok(rmp_serde::to_vec_named(message)?),
        }
    }
}

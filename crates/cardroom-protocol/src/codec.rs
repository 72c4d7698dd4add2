//! Codec trait and the JSON implementation.
//!
//! A codec converts between Rust types and raw bytes. The session loop
//! and client only talk to the [`Codec`] trait, so the wire encoding can
//! change without touching them.

use serde::{Serialize, de::DeserializeOwned};

use crate::{Envelope, Message, ProtocolError};

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Encodes a [`Message`] as an [`Envelope`].
    fn encode_message(&self, msg: &Message) -> Result<Vec<u8>, ProtocolError> {
        let envelope = Envelope::from_message(msg)?;
        self.encode(&envelope)
    }

    /// Decodes bytes into a validated [`Message`] in two stages.
    ///
    /// 1. bytes → [`Envelope`]: failure is `ProtocolError::Decode`.
    /// 2. envelope → message, then payload validation: failure is
    ///    `ProtocolError::MalformedMessage`.
    fn decode_message(&self, data: &[u8]) -> Result<Message, ProtocolError> {
        let envelope: Envelope = self.decode(data)?;
        envelope.into_message()
    }
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// JSON keeps the wire readable in browser devtools and logs, and matches
/// the `{"type": ..., "data": ...}` shape clients already speak.
///
/// ```rust
/// use cardroom_protocol::{Codec, JsonCodec, Message};
///
/// let codec = JsonCodec;
/// let msg = Message::SetPlayerInfo {
///     name: "Ana".into(),
///     color: Some("teal".into()),
/// };
///
/// let bytes = codec.encode_message(&msg).unwrap();
/// let decoded = codec.decode_message(&bytes).unwrap();
/// assert_eq!(msg, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_message_garbage_is_decode_error() {
        let result = JsonCodec.decode_message(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_message_without_type_is_decode_error() {
        let result = JsonCodec.decode_message(br#"{"data": {"name": "x"}}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_message_non_object_is_decode_error() {
        let result = JsonCodec.decode_message(b"[1, 2, 3]");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_message_unknown_type_is_malformed() {
        let result = JsonCodec.decode_message(br#"{"type": "FlyToMoon"}"#);
        assert!(matches!(result, Err(ProtocolError::MalformedMessage(_))));
    }

    #[test]
    fn test_decode_message_wrong_payload_shape_is_malformed() {
        let result = JsonCodec
            .decode_message(br#"{"type": "SetPlayerInfo", "data": {"name": 7}}"#);
        assert!(matches!(result, Err(ProtocolError::MalformedMessage(_))));
    }

    #[test]
    fn test_decode_message_accepts_unit_message_without_data() {
        let msg = JsonCodec.decode_message(br#"{"type": "GetGameState"}"#).unwrap();
        assert_eq!(msg, Message::GetGameState);
    }
}

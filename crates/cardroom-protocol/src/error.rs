//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding messages.
///
/// The split between [`Decode`](ProtocolError::Decode) and
/// [`MalformedMessage`](ProtocolError::MalformedMessage) matters to the
/// server: an envelope that cannot be parsed at all is a protocol
/// violation and ends the connection, while a well-formed envelope with a
/// bad payload is only dropped.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The bytes are not a valid envelope: malformed JSON, not an
    /// object, or no string `type` field.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The envelope parsed, but its type is unknown or its payload does
    /// not have the shape (or passes the checks) the type requires.
    #[error("malformed message: {0}")]
    MalformedMessage(String),
}

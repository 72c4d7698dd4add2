//! Unified error types for Cardroom.

use std::time::Duration;

use cardroom_game::GameError;
use cardroom_protocol::ProtocolError;
use cardroom_registry::RegistryError;
use cardroom_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates a `From` impl, so
/// the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum CardroomError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, malformed message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A game rule or invariant error.
    #[error(transparent)]
    Game(#[from] GameError),

    /// A connection registry error.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A client-side error.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Errors returned by [`GameClient`](crate::GameClient).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The client has no open connection. Nothing was sent.
    #[error("not connected")]
    NotConnected,

    /// The server answered the request with an `Error` message.
    #[error("rejected by server: {0}")]
    Rejected(String),

    /// No reply arrived within the request timeout.
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// The connection closed while waiting for a reply.
    #[error("connection closed")]
    ConnectionClosed,

    /// The server sent a message the client wasn't expecting, such as
    /// anything but `Welcome` as its first message.
    #[error("unexpected message from server: {0}")]
    Unexpected(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let cardroom_err: CardroomError = err.into();
        assert!(matches!(cardroom_err, CardroomError::Transport(_)));
        assert!(cardroom_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::MalformedMessage("bad".into());
        let cardroom_err: CardroomError = err.into();
        assert!(matches!(cardroom_err, CardroomError::Protocol(_)));
    }

    #[test]
    fn test_from_game_error() {
        let err = GameError::InvariantViolation("two judges".into());
        let cardroom_err: CardroomError = err.into();
        assert!(matches!(cardroom_err, CardroomError::Game(_)));
        assert!(cardroom_err.to_string().contains("two judges"));
    }

    #[test]
    fn test_from_registry_error() {
        let err = RegistryError::UnknownConnection(cardroom_transport::ConnectionId::new(3));
        let cardroom_err: CardroomError = err.into();
        assert!(matches!(cardroom_err, CardroomError::Registry(_)));
    }

    #[test]
    fn test_client_error_messages() {
        assert_eq!(ClientError::NotConnected.to_string(), "not connected");
        assert_eq!(
            ClientError::Rejected("game over".into()).to_string(),
            "rejected by server: game over"
        );
    }
}

//! Error types for the registry.

use cardroom_transport::ConnectionId;

/// Errors that can occur while tracking live connections.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The connection is already a member.
    /// Ids come from a process-wide counter, so this means a handler
    /// registered twice.
    #[error("connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),

    /// No member has this id. Callers removing a member usually treat
    /// this as a no-op.
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),

    /// The member's outbound channel is closed; its writer task is gone.
    #[error("outbound channel for connection {0} is closed")]
    Closed(ConnectionId),
}

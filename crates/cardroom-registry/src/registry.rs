//! The connection registry: every live connection and its outbound queue.
//!
//! # Concurrency note
//!
//! `ConnectionRegistry` is NOT thread-safe by itself. It's a plain
//! `HashMap`, and the server shares it behind a `Mutex`. Nothing here ever
//! awaits: sending is a push onto an unbounded channel, so holding the lock
//! while broadcasting can't stall on a slow peer.

use std::collections::HashMap;
use std::sync::Arc;

use cardroom_transport::ConnectionId;
use tokio::sync::mpsc;

use crate::RegistryError;

/// An encoded message, shared by every recipient of a broadcast.
pub type Frame = Arc<[u8]>;

/// The sending half of a connection's outbound queue.
pub type Outbound = mpsc::UnboundedSender<Frame>;

/// Live connections, keyed by id.
///
/// ## Lifecycle
///
/// ```text
/// accept ──→ register() ──→ send_to() / broadcast() ──→ unregister()
///                                     │
///                                     ▼ (writer task gone)
///                                  pruned
/// ```
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    members: HashMap<ConnectionId, Outbound>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection and the queue that feeds its writer task.
    ///
    /// # Errors
    /// [`RegistryError::AlreadyRegistered`] if the id is already a member;
    /// the existing entry is kept.
    pub fn register(&mut self, id: ConnectionId, outbound: Outbound) -> Result<(), RegistryError> {
        if self.members.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }
        self.members.insert(id, outbound);
        tracing::debug!(conn_id = %id, members = self.members.len(), "connection registered");
        Ok(())
    }

    /// Removes a connection. Dropping its sender lets the writer task end
    /// once the queue drains.
    ///
    /// # Errors
    /// [`RegistryError::UnknownConnection`] if the id isn't a member.
    pub fn unregister(&mut self, id: ConnectionId) -> Result<(), RegistryError> {
        self.members
            .remove(&id)
            .ok_or(RegistryError::UnknownConnection(id))?;
        tracing::debug!(conn_id = %id, members = self.members.len(), "connection unregistered");
        Ok(())
    }

    /// Queues a frame for one connection.
    ///
    /// # Errors
    /// - [`RegistryError::UnknownConnection`] if the id isn't a member
    /// - [`RegistryError::Closed`] if its writer task has gone away; the
    ///   member is pruned
    pub fn send_to(&mut self, id: ConnectionId, frame: Frame) -> Result<(), RegistryError> {
        let outbound = self
            .members
            .get(&id)
            .ok_or(RegistryError::UnknownConnection(id))?;
        if outbound.send(frame).is_err() {
            self.members.remove(&id);
            tracing::debug!(conn_id = %id, "pruned closed connection");
            return Err(RegistryError::Closed(id));
        }
        Ok(())
    }

    /// Queues a frame for every member and returns how many accepted it.
    ///
    /// A member whose queue is closed is pruned; delivery to the rest
    /// carries on.
    pub fn broadcast(&mut self, frame: &Frame) -> usize {
        let before = self.members.len();
        self.members.retain(|id, outbound| {
            let open = outbound.send(Arc::clone(frame)).is_ok();
            if !open {
                tracing::debug!(conn_id = %id, "pruned closed connection");
            }
            open
        });
        let delivered = self.members.len();
        if delivered < before {
            tracing::info!(pruned = before - delivered, "dropped dead connections during broadcast");
        }
        delivered
    }

    /// Drops every member's queue and returns how many there were.
    ///
    /// Each writer task sees end-of-stream once it has flushed what was
    /// already queued.
    pub fn clear(&mut self) -> usize {
        let dropped = self.members.len();
        self.members.clear();
        tracing::debug!(dropped, "registry cleared");
        dropped
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member ids in ascending order.
    pub fn ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<_> = self.members.keys().copied().collect();
        ids.sort();
        ids
    }
}

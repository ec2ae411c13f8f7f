//! Result of one readiness wait.

use std::collections::BTreeSet;

use crate::connection::ConnectionId;

/// Handles reported readable by a single multiplexer wait.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadySet {
    listener: bool,
    connections: BTreeSet<ConnectionId>,
}

impl ReadySet {
    /// Create an empty ready set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the listening endpoint as having a pending connection.
    pub fn mark_listener(&mut self) {
        self.listener = true;
    }

    /// Mark a connection as readable.
    pub fn mark_connection(&mut self, id: ConnectionId) {
        self.connections.insert(id);
    }

    /// Whether the listening endpoint has a pending connection.
    pub fn listener_ready(&self) -> bool {
        self.listener
    }

    /// Whether the given connection was reported readable.
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains(&id)
    }

    /// Readable connections, in admission order.
    pub fn connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.connections.iter().copied()
    }

    /// True when neither the listener nor any connection is ready.
    pub fn is_empty(&self) -> bool {
        !self.listener && self.connections.is_empty()
    }
}

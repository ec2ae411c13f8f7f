//! Capacity-bounded registry of active connections.
//!
//! The registry owns every admitted [`Connection`]. Admission is refused once
//! the registry holds `capacity` entries; the caller gets the handle back and
//! decides what to do with it. Removal drops the connection, which closes its
//! transport handle.
//!
//! Entries are kept in admission order. Connection ids are never reused, so a
//! map keyed by id doubles as the admission-ordered sequence the roster needs.
//!
//! The server loop removes connections only after it has finished iterating
//! the readable ones (it collects an eviction list first), so removal never
//! disturbs an iteration in progress.

use std::{collections::BTreeMap, net::SocketAddr};

use crate::{
    connection::{Connection, ConnectionId},
    error::AdmissionRejected,
    ready::ReadySet,
};

/// Default number of simultaneously connected clients.
pub const MAX_CONCURRENT_CLIENTS: usize = 2;

/// Registry of active connections with a fixed admission limit.
#[derive(Debug)]
pub struct ConnectionRegistry<H> {
    /// Connection id → connection, in admission order
    entries: BTreeMap<ConnectionId, Connection<H>>,
    /// Maximum number of live entries
    capacity: usize,
    /// Next id to hand out
    next_id: u64,
}

impl<H> Default for ConnectionRegistry<H> {
    fn default() -> Self {
        Self::with_capacity(MAX_CONCURRENT_CLIENTS)
    }
}

impl<H> ConnectionRegistry<H> {
    /// Create an empty registry admitting at most `capacity` connections.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: BTreeMap::new(), capacity, next_id: 1 }
    }

    /// Admit a new connection.
    ///
    /// Fails when the registry is full. The error carries `handle` back; the
    /// caller must close it (dropping it is enough).
    pub fn try_admit(
        &mut self,
        handle: H,
        peer: SocketAddr,
    ) -> Result<ConnectionId, AdmissionRejected<H>> {
        if !self.has_capacity() {
            return Err(AdmissionRejected { handle, capacity: self.capacity });
        }

        let id = ConnectionId::new(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, Connection::new(id, handle, peer));
        Ok(id)
    }

    /// Connections whose id appears in `ready`, in admission order.
    pub fn readable<'a>(&'a self, ready: &'a ReadySet) -> impl Iterator<Item = &'a Connection<H>> + 'a {
        ready.connections().filter_map(move |id| self.entries.get(&id))
    }

    /// Remove a connection and close its handle.
    ///
    /// Returns the evicted peer address, or `None` if the id is not (or no
    /// longer) registered. Removing twice is a no-op the second time.
    pub fn remove(&mut self, id: ConnectionId) -> Option<SocketAddr> {
        self.entries.remove(&id).map(|conn| conn.peer())
    }

    /// Peer addresses of all live connections, in admission order.
    pub fn snapshot(&self) -> Vec<SocketAddr> {
        self.entries.values().map(Connection::peer).collect()
    }

    /// Connection by id.
    pub fn get(&self, id: ConnectionId) -> Option<&Connection<H>> {
        self.entries.get(&id)
    }

    /// All live connections, in admission order.
    pub fn iter(&self) -> impl Iterator<Item = &Connection<H>> + '_ {
        self.entries.values()
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of live connections.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether another connection can be admitted.
    pub fn has_capacity(&self) -> bool {
        self.entries.len() < self.capacity
    }
}

//! A single admitted client connection.

use std::{fmt, net::SocketAddr};

/// Registry-assigned identity of a connection.
///
/// Identifiers increase monotonically in admission order and are never reused
/// within one registry, so a stale id can never alias a newer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An accepted client: its transport handle and the peer address captured at
/// accept time.
///
/// The connection owns its handle exclusively. Dropping the connection closes
/// the handle, which makes double-close impossible.
#[derive(Debug)]
pub struct Connection<H> {
    id: ConnectionId,
    handle: H,
    peer: SocketAddr,
}

impl<H> Connection<H> {
    pub(crate) fn new(id: ConnectionId, handle: H, peer: SocketAddr) -> Self {
        Self { id, handle, peer }
    }

    /// Registry-assigned identity.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Transport handle.
    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Peer address captured at accept time.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_displays_with_hash_prefix() {
        assert_eq!(ConnectionId::new(7).to_string(), "#7");
    }

    #[test]
    fn connection_exposes_peer_and_handle() {
        let peer: SocketAddr = "10.0.0.1:4000".parse().unwrap();
        let conn = Connection::new(ConnectionId::new(1), "handle", peer);

        assert_eq!(conn.id(), ConnectionId::new(1));
        assert_eq!(conn.peer(), peer);
        assert_eq!(*conn.handle(), "handle");
    }
}

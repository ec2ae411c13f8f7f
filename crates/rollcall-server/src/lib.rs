//! Rollcall server.
//!
//! Single-threaded TCP server that admits a bounded number of clients, prints
//! whatever they send, and writes the list of connected clients when the
//! process receives SIGHUP.
//!
//! # Architecture
//!
//! The data model (registry, ready set, roster layout) lives in
//! [`rollcall_core`] and performs no I/O. This crate wraps it with real
//! sockets and signals on a current-thread Tokio runtime. Exactly one task
//! owns the registry and the listener, so nothing needs a lock.
//!
//! # Components
//!
//! - [`Server`]: the reactive loop (report, wait, accept, read, evict)
//! - [`SignalBridge`]: SIGHUP → pending flag, plus the wait's wakeup
//! - [`wait_readable`]: readiness multiplexer over listener and clients
//! - [`TcpTransport`]: listener setup and accept on reactor-registered sockets
//!
//! # Loop
//!
//! ```text
//! ┌───────────┐      ┌─────────┐ Ready ┌───────────┐   ┌─────────┐   ┌──────────┐
//! │ REPORTING │─────>│ WAITING │──────>│ ACCEPTING │──>│ READING │──>│ EVICTING │
//! └───────────┘      └─────────┘       └───────────┘   └─────────┘   └──────────┘
//!       ↑    Interrupted  │                                                │
//!       └─────────────────┴────────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod mux;
mod signal;
mod transport;

use std::{
    io::{self, Write},
    net::SocketAddr,
};

pub use error::ServerError;
pub use mux::{PollInterrupt, PollReadable, Readiness, wait_readable};
use rollcall_core::{ConnectionId, ConnectionRegistry, MAX_CONCURRENT_CLIENTS, ReadySet, RosterFormat};
pub use signal::{HangupWakeup, SignalBridge};
pub use transport::{ClientHandle, TcpTransport, read_chunk};

/// Default listen address: all IPv4 interfaces, port 2523.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:2523";

/// Size of the per-read buffer. One byte is reserved, so a single read
/// delivers at most `READ_BUFFER_SIZE - 1` bytes.
pub const READ_BUFFER_SIZE: usize = 1024;

/// Largest payload delivered by one read.
pub const MAX_READ_LEN: usize = READ_BUFFER_SIZE - 1;

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:2523")
    pub bind_address: String,
    /// Maximum simultaneously connected clients; also the listen backlog
    pub max_clients: usize,
    /// Layout of the roster written on SIGHUP
    pub roster_format: RosterFormat,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            max_clients: MAX_CONCURRENT_CLIENTS,
            roster_format: RosterFormat::default(),
        }
    }
}

/// Production rollcall server.
///
/// Received messages and roster reports are written to `out` (stdout in the
/// binary). Diagnostics go through `tracing`.
pub struct Server<W> {
    /// Listening endpoint
    transport: TcpTransport,
    /// Admitted clients
    registry: ConnectionRegistry<ClientHandle>,
    /// Pending-hangup flag
    signals: SignalBridge,
    /// Hangup notification polled while waiting
    wakeup: HangupWakeup,
    /// Roster layout
    roster_format: RosterFormat,
    /// Destination for messages and roster reports
    out: W,
    /// Per-read buffer, reused across reads
    buffer: [u8; READ_BUFFER_SIZE],
}

impl<W: Write> Server<W> {
    /// Create the listener and install the hangup handler.
    ///
    /// Must be called from within a Tokio runtime. Every failure here is
    /// fatal; resources acquired before the failing step are released on
    /// return.
    pub fn bind(config: ServerRuntimeConfig, out: W) -> Result<Self, ServerError> {
        if config.max_clients == 0 {
            return Err(ServerError::Config("max clients must be at least 1".to_string()));
        }

        let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
            ServerError::Config(format!("invalid bind address '{}': {e}", config.bind_address))
        })?;
        let backlog = u32::try_from(config.max_clients).unwrap_or(u32::MAX);

        let transport = TcpTransport::bind(addr, backlog)?;
        let (signals, wakeup) = SignalBridge::install()?;

        Ok(Self {
            transport,
            registry: ConnectionRegistry::with_capacity(config.max_clients),
            signals,
            wakeup,
            roster_format: config.roster_format,
            out,
            buffer: [0; READ_BUFFER_SIZE],
        })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// Number of currently admitted clients.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Run the server loop.
    ///
    /// Only returns on a fatal readiness error. The listener and all client
    /// sockets are closed when the server is dropped on return.
    pub async fn run(mut self) -> Result<(), ServerError> {
        tracing::info!("Server is waiting for connections on {}", self.transport.local_addr());

        loop {
            if self.signals.poll_and_clear() {
                self.report_roster();
            }

            // A full registry stops watching the listener, so extra clients
            // stay queued in the backlog instead of waking the loop.
            let listener = self.registry.has_capacity().then(|| self.transport.listener());
            let ready =
                match mux::wait_readable(listener, &self.registry, &mut self.wakeup).await? {
                    Readiness::Interrupted => {
                        tracing::trace!("wait interrupted by hangup");
                        continue;
                    },
                    Readiness::Ready(ready) => ready,
                };

            if ready.listener_ready() && self.registry.has_capacity() {
                self.accept_one().await;
            }

            let closed = self.read_ready(&ready).await;
            self.evict(closed);
        }
    }

    /// Write the roster of live connections.
    fn report_roster(&mut self) {
        let peers = self.registry.snapshot();
        if let Err(e) = self.roster_format.write(&mut self.out, &peers) {
            tracing::warn!("failed to write roster: {}", e);
        }
    }

    /// Accept and admit one pending client.
    async fn accept_one(&mut self) {
        let (handle, peer) = match self.transport.accept().await {
            Ok(accepted) => accepted,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                tracing::trace!("listener readiness was spurious");
                return;
            },
            Err(e) => {
                tracing::warn!("error when accepting the connection: {}", e);
                return;
            },
        };

        match self.registry.try_admit(handle, peer) {
            Ok(id) => {
                tracing::info!(
                    %peer,
                    %id,
                    "new connection accepted, total clients: {}",
                    self.registry.len()
                );
                if !self.registry.has_capacity() {
                    tracing::debug!(
                        "client limit reached ({}), further connections stay queued",
                        self.registry.capacity()
                    );
                }
            },
            Err(rejected) => tracing::warn!(%peer, "{}", rejected),
        }
    }

    /// Read from every ready client. Returns the clients to evict.
    async fn read_ready(&mut self, ready: &ReadySet) -> Vec<ConnectionId> {
        let mut closed = Vec::new();

        for conn in self.registry.readable(ready) {
            let peer = conn.peer();
            match read_chunk(conn.handle(), &mut self.buffer[..MAX_READ_LEN]).await {
                Ok(0) => {
                    tracing::info!(%peer, "connection closed by client");
                    closed.push(conn.id());
                },
                Ok(n) => {
                    if let Err(e) = write_message(&mut self.out, peer, &self.buffer[..n]) {
                        tracing::warn!("failed to write message from {}: {}", peer, e);
                    }
                },
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    tracing::trace!(%peer, "client readiness was spurious");
                },
                Err(e) => {
                    tracing::warn!(%peer, "read error, closing connection: {}", e);
                    closed.push(conn.id());
                },
            }
        }

        closed
    }

    /// Remove closed clients, closing their sockets.
    fn evict(&mut self, closed: Vec<ConnectionId>) {
        for id in closed {
            if let Some(peer) = self.registry.remove(id) {
                tracing::debug!(%peer, %id, "evicted, total clients: {}", self.registry.len());
            }
        }
    }
}

impl<W> std::fmt::Debug for Server<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("local_addr", &self.transport.local_addr())
            .field("connection_count", &self.registry.len())
            .field("roster_format", &self.roster_format)
            .finish()
    }
}

/// Write one received chunk, tagged with the sender's address.
///
/// The payload is copied byte for byte; a line break is appended only when
/// the chunk does not already end with one.
fn write_message<W: Write>(out: &mut W, peer: SocketAddr, payload: &[u8]) -> io::Result<()> {
    write!(out, "message from {peer}: ")?;
    out.write_all(payload)?;
    if !payload.ends_with(b"\n") {
        out.write_all(b"\n")?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_binds_port_2523_with_two_slots() {
        let config = ServerRuntimeConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0:2523");
        assert_eq!(config.max_clients, 2);
        assert_eq!(config.roster_format, RosterFormat::Peers);
    }

    #[test]
    fn read_limit_leaves_room_for_terminator() {
        assert_eq!(MAX_READ_LEN, 1023);
    }

    #[test]
    fn message_is_tagged_with_peer() {
        let mut out = Vec::new();
        let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();

        write_message(&mut out, peer, b"ping\n").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "message from 127.0.0.1:40000: ping\n");
    }

    #[test]
    fn payload_bytes_are_copied_unchanged() {
        let mut out = Vec::new();
        let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();

        write_message(&mut out, peer, b"crlf\r\n").unwrap();
        write_message(&mut out, peer, &[0x68, 0x69, 0xff]).unwrap();

        let mut expected = b"message from 127.0.0.1:40000: crlf\r\n".to_vec();
        expected.extend_from_slice(b"message from 127.0.0.1:40000: hi\xff\n");
        assert_eq!(out, expected);
    }

    #[test]
    fn character_split_across_chunks_survives() {
        let mut out = Vec::new();
        let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        let text = "caf\u{e9}".as_bytes();
        let (head, tail) = text.split_at(text.len() - 1);

        write_message(&mut out, peer, head).unwrap();
        write_message(&mut out, peer, tail).unwrap();

        let received: Vec<u8> = out
            .split(|&b| b == b'\n')
            .filter_map(|line| line.strip_prefix(b"message from 127.0.0.1:40000: ".as_slice()))
            .flatten()
            .copied()
            .collect();
        assert_eq!(received, text);
    }

    #[tokio::test]
    async fn zero_capacity_is_rejected() {
        let config = ServerRuntimeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            max_clients: 0,
            ..Default::default()
        };
        let result = Server::bind(config, Vec::new());
        assert!(matches!(result, Err(ServerError::Config(_))));
    }

    #[tokio::test]
    async fn unparseable_address_is_rejected() {
        let config =
            ServerRuntimeConfig { bind_address: "not-an-address".to_string(), ..Default::default() };
        let result = Server::bind(config, Vec::new());
        assert!(matches!(result, Err(ServerError::Config(msg)) if msg.contains("not-an-address")));
    }

    #[tokio::test]
    async fn bind_conflict_names_the_bind_step() {
        let first = Server::bind(
            ServerRuntimeConfig { bind_address: "127.0.0.1:0".to_string(), ..Default::default() },
            Vec::new(),
        )
        .unwrap();

        // SO_REUSEADDR does not allow two listeners on the same port
        let taken = first.local_addr().to_string();
        let result = Server::bind(
            ServerRuntimeConfig { bind_address: taken, ..Default::default() },
            Vec::new(),
        );
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }
}

//! TCP transport on top of reactor-registered std sockets.
//!
//! The listening socket and every accepted stream are wrapped in
//! [`AsyncFd`], which gives the multiplexer readiness without committing to
//! an operation. That matters for the listener: the loop must be able to see
//! that a client is waiting and still decline to accept it while the registry
//! is full, leaving the client queued in the kernel backlog.
//!
//! # Capabilities
//!
//! - IPv4 or IPv6 listener with `SO_REUSEADDR` and an explicit backlog
//! - One accept per call, only when the listener was reported ready
//! - Bounded, non-blocking reads from accepted streams

use std::{
    io::{self, Read},
    net::{SocketAddr, TcpListener as StdTcpListener, TcpStream as StdTcpStream},
};

use tokio::{io::unix::AsyncFd, net::TcpSocket};

use crate::error::ServerError;

/// Transport handle owned by each registry entry.
pub type ClientHandle = AsyncFd<StdTcpStream>;

/// Listening endpoint registered with the Tokio reactor.
#[derive(Debug)]
pub struct TcpTransport {
    listener: AsyncFd<StdTcpListener>,
    local_addr: SocketAddr,
    /// Connection taken off the queue by the look-ahead in [`Self::accept`]
    held: Option<(StdTcpStream, SocketAddr)>,
}

impl TcpTransport {
    /// Create, bind and listen on `addr` with the given backlog.
    ///
    /// Each step maps to its own [`ServerError`] variant so the diagnostic
    /// names what failed. Must be called from within a Tokio runtime.
    pub fn bind(addr: SocketAddr, backlog: u32) -> Result<Self, ServerError> {
        let socket = if addr.is_ipv4() { TcpSocket::new_v4() } else { TcpSocket::new_v6() };
        let socket = socket.map_err(ServerError::Socket)?;
        socket.set_reuseaddr(true).map_err(ServerError::Socket)?;
        socket.bind(addr).map_err(|source| ServerError::Bind { addr, source })?;

        let listen_err = |source| ServerError::Listen { addr, source };
        let listener = socket.listen(backlog).map_err(listen_err)?;
        let listener = listener.into_std().map_err(listen_err)?;
        let local_addr = listener.local_addr().map_err(listen_err)?;
        let listener = AsyncFd::new(listener).map_err(listen_err)?;

        tracing::info!("TCP transport bound to {} (backlog {})", local_addr, backlog);

        Ok(Self { listener, local_addr, held: None })
    }

    /// Reactor registration of the listening socket.
    pub fn listener(&self) -> &AsyncFd<StdTcpListener> {
        &self.listener
    }

    /// Local address the transport is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept one pending connection.
    ///
    /// Intended to be called only after the multiplexer reported the listener
    /// ready, in which case it completes without waiting. A spurious readiness
    /// report clears the listener's readiness and yields `WouldBlock`.
    ///
    /// After each accept the queue is checked once more: if it is empty the
    /// listener's readiness is cleared, otherwise the next connection is held
    /// and handed out by the following call. The listener is therefore
    /// reported ready exactly while a client is waiting.
    pub async fn accept(&mut self) -> io::Result<(ClientHandle, SocketAddr)> {
        let mut guard = self.listener.readable().await?;
        let (stream, peer) = match self.held.take() {
            Some(held) => held,
            None => match guard.try_io(|listener| listener.get_ref().accept()) {
                Ok(result) => result?,
                Err(_would_block) => return Err(io::ErrorKind::WouldBlock.into()),
            },
        };

        match guard.try_io(|listener| listener.get_ref().accept()) {
            Ok(Ok(next)) => self.held = Some(next),
            // Readiness stays set, so the failing accept is retried next iteration
            Ok(Err(e)) => tracing::debug!("look-ahead accept failed: {}", e),
            Err(_would_block) => {},
        }

        stream.set_nonblocking(true)?;
        Ok((AsyncFd::new(stream)?, peer))
    }
}

/// Read at most `buf.len()` bytes from a client that was reported readable.
///
/// `Ok(0)` means the peer closed the connection. Bytes beyond `buf.len()`
/// stay in the socket and keep the handle readable for the next wait. A short
/// read drained the socket, so readiness is cleared and the handle is not
/// reported again until more data (or EOF) arrives.
pub async fn read_chunk(handle: &ClientHandle, buf: &mut [u8]) -> io::Result<usize> {
    let len = buf.len();
    let mut guard = handle.readable().await?;
    match guard.try_io(|stream| {
        let mut stream: &StdTcpStream = stream.get_ref();
        stream.read(buf)
    }) {
        Ok(Ok(n)) => {
            if n < len {
                guard.clear_ready();
            }
            Ok(n)
        },
        Ok(Err(e)) => Err(e),
        Err(_would_block) => Err(io::ErrorKind::WouldBlock.into()),
    }
}

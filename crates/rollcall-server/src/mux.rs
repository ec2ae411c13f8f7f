//! Readiness multiplexer.
//!
//! One call waits until the listener has a pending connection, a registered
//! connection has data (or EOF) to read, or a hangup is delivered. There is no
//! timeout: the server is purely reactive.
//!
//! A delivered hangup is reported as [`Readiness::Interrupted`] and takes
//! precedence over readiness, so the loop can report the roster before doing
//! anything else. Readiness is not consumed by the wait; a handle that still
//! has unread data is reported again on the next call.

use std::{
    future::poll_fn,
    io,
    os::fd::AsRawFd,
    task::{Context, Poll},
};

use rollcall_core::{ConnectionRegistry, ReadySet};
use tokio::io::unix::AsyncFd;

use crate::{error::ServerError, signal::HangupWakeup};

/// Outcome of one wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// At least one handle is readable
    Ready(ReadySet),
    /// A hangup was delivered while waiting
    Interrupted,
}

/// Handle whose read readiness can be polled without performing a read.
pub trait PollReadable {
    /// Poll for read readiness. Must not clear readiness.
    fn poll_readable(&self, cx: &mut Context<'_>) -> Poll<io::Result<()>>;
}

impl<T: AsRawFd> PollReadable for AsyncFd<T> {
    fn poll_readable(&self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        // Dropping the guard without clearing keeps the readiness bit set
        self.poll_read_ready(cx).map_ok(|_guard| ())
    }
}

/// Source of wait interruptions.
pub trait PollInterrupt {
    /// Poll for a delivered interruption, consuming it.
    fn poll_interrupt(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>>;
}

impl PollInterrupt for HangupWakeup {
    fn poll_interrupt(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.poll_delivered(cx)
    }
}

/// Wait until the listener or any registered connection is readable, or a
/// hangup interrupts the wait.
///
/// Pass `listener: None` to leave pending connections queued (used while the
/// registry is full). Any readiness error is fatal.
pub async fn wait_readable<L, H, I>(
    listener: Option<&L>,
    registry: &ConnectionRegistry<H>,
    interrupt: &mut I,
) -> Result<Readiness, ServerError>
where
    L: PollReadable,
    H: PollReadable,
    I: PollInterrupt,
{
    poll_fn(|cx| {
        match interrupt.poll_interrupt(cx) {
            Poll::Ready(Ok(())) => return Poll::Ready(Ok(Readiness::Interrupted)),
            Poll::Ready(Err(e)) => return Poll::Ready(Err(ServerError::Wait(e))),
            Poll::Pending => {},
        }

        let mut ready = ReadySet::new();

        if let Some(listener) = listener {
            match listener.poll_readable(cx) {
                Poll::Ready(Ok(())) => ready.mark_listener(),
                Poll::Ready(Err(e)) => return Poll::Ready(Err(ServerError::Wait(e))),
                Poll::Pending => {},
            }
        }

        for conn in registry.iter() {
            match conn.handle().poll_readable(cx) {
                Poll::Ready(Ok(())) => ready.mark_connection(conn.id()),
                Poll::Ready(Err(e)) => return Poll::Ready(Err(ServerError::Wait(e))),
                Poll::Pending => {},
            }
        }

        if ready.is_empty() { Poll::Pending } else { Poll::Ready(Ok(Readiness::Ready(ready))) }
    })
    .await
}

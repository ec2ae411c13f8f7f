//! Hangup signal bridge.
//!
//! Converts SIGHUP into a flag the server loop polls between waits. The
//! handler registered here does a single atomic store and nothing else, so it
//! is safe to run no matter what it interrupts.
//!
//! # Delivery discipline
//!
//! Installing the bridge yields two halves:
//!
//! - [`SignalBridge`]: the pending flag, read-and-cleared only by the loop
//! - [`HangupWakeup`]: a reactor-backed notification the multiplexer polls
//!   while it waits
//!
//! The loop only ever sees the wakeup from inside the wait, so a hangup can
//! interrupt the loop only while it is idle. A hangup that arrives while the
//! loop is busy sets the flag and leaves the wakeup pending; the next wait
//! returns immediately and the following report picks the flag up. Nothing is
//! lost and no report ever runs in the middle of a registry mutation.

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    task::{Context, Poll},
};

use signal_hook::{SigId, consts::SIGHUP};
use tokio::signal::unix::{Signal, SignalKind, signal};

use crate::error::ServerError;

/// Pending-hangup flag shared with the signal handler.
#[derive(Debug)]
pub struct SignalBridge {
    pending: Arc<AtomicBool>,
    handler: SigId,
}

impl SignalBridge {
    /// Register the hangup handler and create the multiplexer wakeup.
    ///
    /// Must be called from within a Tokio runtime with the signal driver
    /// enabled. Failure is fatal: the server cannot report its roster safely
    /// without the handler.
    pub fn install() -> Result<(Self, HangupWakeup), ServerError> {
        let pending = Arc::new(AtomicBool::new(false));
        let handler =
            signal_hook::flag::register(SIGHUP, Arc::clone(&pending)).map_err(ServerError::Signal)?;

        let wakeup = match signal(SignalKind::hangup()) {
            Ok(signal) => HangupWakeup { signal },
            Err(e) => {
                let _ = signal_hook::low_level::unregister(handler);
                return Err(ServerError::Signal(e));
            },
        };

        tracing::debug!("hangup handler installed");
        Ok((Self { pending, handler }, wakeup))
    }

    /// Return whether a hangup arrived since the last call, clearing the flag.
    pub fn poll_and_clear(&self) -> bool {
        self.pending.swap(false, Ordering::SeqCst)
    }
}

impl Drop for SignalBridge {
    fn drop(&mut self) {
        let _ = signal_hook::low_level::unregister(self.handler);
    }
}

/// Hangup notification observed by the readiness multiplexer.
///
/// Deliveries that happen while nobody polls are coalesced and reported on the
/// next poll.
#[derive(Debug)]
pub struct HangupWakeup {
    signal: Signal,
}

impl HangupWakeup {
    /// Poll for a delivered hangup.
    ///
    /// `Ready(Ok(()))` means at least one hangup arrived since the last
    /// delivery was consumed.
    pub fn poll_delivered(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.signal.poll_recv(cx) {
            Poll::Ready(Some(())) => Poll::Ready(Ok(())),
            Poll::Ready(None) => {
                Poll::Ready(Err(io::Error::other("hangup notification stream closed")))
            },
            Poll::Pending => Poll::Pending,
        }
    }
}

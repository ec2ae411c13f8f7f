//! Server error types.
//!
//! Every variant is fatal: setup failures prevent the server from starting and
//! a failed readiness wait ends the loop. Per-connection failures (accept,
//! read) never surface here; the loop logs and absorbs them.

use std::{io, net::SocketAddr};

use thiserror::Error;

/// Errors that terminate the server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid configuration (unparseable bind address, zero capacity).
    ///
    /// Fatal at startup. Fix the command line and restart.
    #[error("configuration error: {0}")]
    Config(String),

    /// Listening socket could not be created or configured.
    #[error("couldn't create socket: {0}")]
    Socket(#[source] io::Error),

    /// Address could not be bound (already in use, permission denied).
    #[error("error binding the address {addr} to the socket: {source}")]
    Bind {
        /// Address that was requested
        addr: SocketAddr,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// Socket could not be switched to listening mode or registered with the
    /// reactor.
    #[error("couldn't switch the socket on {addr} to listening mode: {source}")]
    Listen {
        /// Address the socket is bound to
        addr: SocketAddr,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// Hangup handler registration failed.
    ///
    /// Without it the roster trigger cannot be delivered safely, so the server
    /// refuses to start.
    #[error("failed to register hangup handler: {0}")]
    Signal(#[source] io::Error),

    /// Readiness wait failed for a reason other than signal interruption.
    #[error("critical error while waiting for readiness: {0}")]
    Wait(#[source] io::Error),
}

impl ServerError {
    /// True for errors raised before the loop started.
    pub fn is_setup(&self) -> bool {
        !matches!(self, Self::Wait(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_failing_step() {
        let addr: SocketAddr = "0.0.0.0:2523".parse().unwrap();

        let err = ServerError::Bind { addr, source: io::Error::from(io::ErrorKind::AddrInUse) };
        assert!(err.to_string().starts_with("error binding the address 0.0.0.0:2523"));

        let err = ServerError::Listen { addr, source: io::Error::other("boom") };
        assert_eq!(
            err.to_string(),
            "couldn't switch the socket on 0.0.0.0:2523 to listening mode: boom"
        );

        let err = ServerError::Wait(io::Error::other("bad fd"));
        assert_eq!(err.to_string(), "critical error while waiting for readiness: bad fd");
    }

    #[test]
    fn only_wait_errors_are_runtime() {
        assert!(ServerError::Config("x".to_string()).is_setup());
        assert!(ServerError::Signal(io::Error::other("x")).is_setup());
        assert!(!ServerError::Wait(io::Error::other("x")).is_setup());
    }
}

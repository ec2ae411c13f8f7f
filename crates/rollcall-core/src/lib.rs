//! Rollcall core.
//!
//! Pure data model for the rollcall server: accepted connections, the bounded
//! registry that owns them, the readiness set produced by one multiplexer wait,
//! and the roster report printed on demand.
//!
//! Nothing here performs I/O. Transport handles are a type parameter, so the
//! registry can be exercised with plain values in tests and with
//! reactor-registered sockets in `rollcall-server`.
//!
//! # Components
//!
//! - [`Connection`]: one admitted client (handle + peer address)
//! - [`ConnectionRegistry`]: capacity-bounded, admission-ordered collection
//! - [`ReadySet`]: which handles a single wait reported readable
//! - [`RosterFormat`]: textual layout of the roster report

#![forbid(unsafe_code)]

mod connection;
mod error;
mod ready;
mod registry;
pub mod roster;

pub use connection::{Connection, ConnectionId};
pub use error::{AdmissionRejected, UnknownRosterFormat};
pub use ready::ReadySet;
pub use registry::{ConnectionRegistry, MAX_CONCURRENT_CLIENTS};
pub use roster::RosterFormat;

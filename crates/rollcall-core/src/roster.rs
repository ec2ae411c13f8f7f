//! Roster report written when the administrator asks for it.
//!
//! Two layouts are supported. [`RosterFormat::Peers`] lists every client's
//! address; [`RosterFormat::Numbered`] prints anonymous numbered placeholders.
//! Both end with a blank line so consecutive reports stay readable.

use std::{fmt, io, net::SocketAddr, str::FromStr};

use crate::error::UnknownRosterFormat;

/// Textual layout of the roster report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RosterFormat {
    /// Count followed by one `ip:port` line per client
    #[default]
    Peers,
    /// Numbered placeholders followed by the total count
    Numbered,
}

impl RosterFormat {
    /// Write the roster for `peers` to `out`.
    pub fn write<W: io::Write>(self, out: &mut W, peers: &[SocketAddr]) -> io::Result<()> {
        match self {
            Self::Peers => {
                writeln!(out, "connected clients ({}):", peers.len())?;
                for (index, peer) in peers.iter().enumerate() {
                    writeln!(out, "  {}. {peer}", index + 1)?;
                }
            },
            Self::Numbered => {
                write!(out, "active client connections:")?;
                for index in 1..=peers.len() {
                    write!(out, " client #{index}")?;
                }
                writeln!(out)?;
                writeln!(out, "total connections: {}", peers.len())?;
            },
        }
        writeln!(out)?;
        out.flush()
    }
}

impl fmt::Display for RosterFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Peers => f.write_str("peers"),
            Self::Numbered => f.write_str("numbered"),
        }
    }
}

impl FromStr for RosterFormat {
    type Err = UnknownRosterFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "peers" => Ok(Self::Peers),
            "numbered" => Ok(Self::Numbered),
            _ => Err(UnknownRosterFormat(s.to_string())),
        }
    }
}

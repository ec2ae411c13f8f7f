//! Error types for the rollcall core.

use thiserror::Error;

/// Admission refused because the registry is full.
///
/// Carries the rejected handle back to the caller. Dropping the error closes
/// the handle.
#[derive(Error, Debug)]
#[error("connection limit reached ({capacity} clients)")]
pub struct AdmissionRejected<H> {
    /// The handle that was not admitted
    pub handle: H,
    /// Registry capacity at the time of rejection
    pub capacity: usize,
}

/// Roster format name that is neither `peers` nor `numbered`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown roster format '{0}' (expected 'peers' or 'numbered')")]
pub struct UnknownRosterFormat(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admission_rejected_display() {
        let err = AdmissionRejected { handle: 3u8, capacity: 2 };
        assert_eq!(err.to_string(), "connection limit reached (2 clients)");
        assert_eq!(err.handle, 3);
    }

    #[test]
    fn unknown_roster_format_display() {
        let err = UnknownRosterFormat("json".to_string());
        assert_eq!(err.to_string(), "unknown roster format 'json' (expected 'peers' or 'numbered')");
    }
}

//! Textual replies sent by the gateway in answer to an attach request.
//!
//! The reply is plain ASCII with no envelope: the datagram payload is exactly
//! `created` or `rejected`.  There is no sequence number; the client matches
//! a reply to its request simply by waiting on the same socket.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Outcome of an attach request as seen by the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionOutcome {
    /// A new session was created for the subscriber.
    Created,
    /// The subscriber is blacklisted or already has a live session.
    Rejected,
}

impl SessionOutcome {
    /// Returns the exact wire text for this outcome.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionOutcome::Created => "created",
            SessionOutcome::Rejected => "rejected",
        }
    }

    /// Returns the wire payload for this outcome.
    pub fn as_bytes(self) -> &'static [u8] {
        self.as_str().as_bytes()
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The reply text was not one of the known outcomes.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown reply: {0:?}")]
pub struct ReplyParseError(pub String);

impl FromStr for SessionOutcome {
    type Err = ReplyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(SessionOutcome::Created),
            "rejected" => Ok(SessionOutcome::Rejected),
            other => Err(ReplyParseError(other.to_string())),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Audit trail contract: one Charging Data Record (CDR) per session transition.
//!
//! The session store does not know how records are persisted.  It talks to an
//! [`AuditSink`] and the infrastructure layer supplies the implementation
//! (`infrastructure::storage::cdr::CdrWriter` appends CSV lines to a file).
//!
//! # Contract
//!
//! - `write` is safe to call from many threads at once; the sink serializes
//!   internally, so callers never need their own lock.
//! - A call that returns `Ok` has been appended and will not be reordered
//!   relative to other successful calls from the same thread, nor dropped.
//! - Records are append-only: the sink never rewrites or deletes a line.

use std::path::PathBuf;

use thiserror::Error;

/// Session state transition recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CdrAction {
    /// An attach request created a new session.
    Created,
    /// The eviction sweep removed a session older than the timeout.
    Expired,
    /// The session was still active when the gateway shut down.
    ClosedOnShutdown,
}

impl CdrAction {
    /// Returns the stable text written into the `action` column.
    pub fn as_str(self) -> &'static str {
        match self {
            CdrAction::Created => "created",
            CdrAction::Expired => "expired",
            CdrAction::ClosedOnShutdown => "closed-on-shutdown",
        }
    }
}

impl std::fmt::Display for CdrAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for audit trail operations.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The audit resource could not be opened or created.
    #[error("failed to open CDR file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A record could not be appended.
    #[error("failed to append CDR record: {0}")]
    Write(#[from] std::io::Error),
}

/// Append-only sink for `(timestamp, imsi, action)` records.
///
/// The timestamp is taken by the sink at the moment the record is written.
#[cfg_attr(test, mockall::automock)]
pub trait AuditSink: Send + Sync {
    /// Appends one record for `imsi`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Write`] if the record could not be persisted.
    fn write(&self, imsi: &str, action: CdrAction) -> Result<(), AuditError>;
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_cdr_action_strings_are_distinct() {
        // Arrange
        let all = [
            CdrAction::Created,
            CdrAction::Expired,
            CdrAction::ClosedOnShutdown,
        ];

        // Act
        let texts: HashSet<&str> = all.iter().map(|a| a.as_str()).collect();

        // Assert
        assert_eq!(texts.len(), all.len());
    }

    #[test]
    fn test_cdr_action_strings_are_stable() {
        assert_eq!(CdrAction::Created.as_str(), "created");
        assert_eq!(CdrAction::Expired.as_str(), "expired");
        assert_eq!(CdrAction::ClosedOnShutdown.as_str(), "closed-on-shutdown");
    }

    #[test]
    fn test_cdr_action_strings_contain_no_column_separator() {
        for action in [
            CdrAction::Created,
            CdrAction::Expired,
            CdrAction::ClosedOnShutdown,
        ] {
            assert!(!action.as_str().contains(','));
        }
    }
}

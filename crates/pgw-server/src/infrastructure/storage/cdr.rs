//! File-backed CDR writer.
//!
//! Appends one CSV line per session transition:
//!
//! ```text
//! 2026-10-17 14:03:11,250990123456789,created
//! 2026-10-17 14:03:41,250990123456789,expired
//! ```
//!
//! The file is opened in append mode and is never truncated, so restarting
//! the gateway keeps the history of previous runs.  Each record is formatted
//! in full and written with a single `write_all` while holding the internal
//! lock, so lines from concurrent callers never interleave.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::Local;
use tracing::debug;

use crate::application::audit::{AuditError, AuditSink, CdrAction};

/// Timestamp layout of the first CSV column.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Thread-safe append-only CDR file.
#[derive(Debug)]
pub struct CdrWriter {
    path: PathBuf,
    file: Mutex<File>,
}

impl CdrWriter {
    /// Opens (or creates) the CDR file at `path` for appending.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Open`] if the file cannot be opened or created,
    /// for example when the parent directory does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditError::Open {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), "CDR file opened");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for CdrWriter {
    fn write(&self, imsi: &str, action: CdrAction) -> Result<(), AuditError> {
        let line = format!(
            "{},{},{}\n",
            Local::now().format(TIMESTAMP_FORMAT),
            imsi,
            action.as_str()
        );

        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

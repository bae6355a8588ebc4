//! Logging setup.
//!
//! Output always goes to stdout.  When a log file is configured, every line
//! is also appended to that file (ANSI colour codes are disabled so the file
//! stays readable).  The level comes from the config file, but the
//! `RUST_LOG` environment variable wins when it is set, e.g.
//! `RUST_LOG=pgw_server=debug`.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::EnvFilter;

/// Error type for logging setup.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log file or its parent directory could not be created.
    #[error("failed to open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A global subscriber was already installed.
    #[error("failed to install log subscriber: {0}")]
    Init(String),
}

/// Builds the level filter: `RUST_LOG` if set and valid, else `level`.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Opens `path` for appending, creating missing parent directories.
///
/// # Errors
///
/// Returns [`LoggingError::Open`] if the directory or file cannot be created.
pub fn open_log_file(path: &Path) -> Result<File, LoggingError> {
    let to_err = |source| LoggingError::Open {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(to_err)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(to_err)
}

/// Installs the global `tracing` subscriber.
///
/// # Errors
///
/// Returns [`LoggingError::Open`] if `file` cannot be opened and
/// [`LoggingError::Init`] if a subscriber is already installed.
pub fn init_logging(level: &str, file: Option<&Path>) -> Result<(), LoggingError> {
    let builder = tracing_subscriber::fmt().with_env_filter(build_filter(level));

    let result = match file {
        Some(path) => {
            let file = Arc::new(open_log_file(path)?);
            builder
                .with_ansi(false)
                .with_writer(BoxMakeWriter::new(std::io::stdout.and(file)))
                .try_init()
        }
        None => builder.try_init(),
    };

    result.map_err(|e| LoggingError::Init(e.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_open_log_file_creates_missing_parent_directories() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("pgw_logs_{}", Uuid::new_v4()));
        let path = dir.join("nested").join("server.log");

        // Act
        let result = open_log_file(&path);

        // Assert
        assert!(result.is_ok());
        assert!(path.exists());

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_open_log_file_appends_to_existing_content() {
        use std::io::Write;

        let path = std::env::temp_dir().join(format!("pgw_log_{}.log", Uuid::new_v4()));
        std::fs::write(&path, "first\n").unwrap();

        let mut file = open_log_file(&path).unwrap();
        file.write_all(b"second\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_open_log_file_on_directory_path_returns_error() {
        let dir = std::env::temp_dir();
        assert!(matches!(open_log_file(&dir), Err(LoggingError::Open { .. })));
    }
}

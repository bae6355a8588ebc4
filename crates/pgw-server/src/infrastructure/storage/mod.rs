//! File-system storage for the gateway.
//!
//! - **`config`** – Loads and validates `server.toml`.
//! - **`cdr`** – Append-only CSV audit trail, the production [`AuditSink`].
//!
//! [`AuditSink`]: crate::application::AuditSink

pub mod cdr;
pub mod config;

pub use cdr::CdrWriter;
pub use config::{load_config, ConfigError, ServerConfig};

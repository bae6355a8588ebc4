//! Client configuration (`configs/client.toml`).
//!
//! ```toml
//! server_ip = "127.0.0.1"
//! server_port = 9000
//! udp_buffer_size = 1024
//! response_timeout_ms = 1000
//! log_level = "info"
//! ```
//!
//! Every field has a default, and a missing file simply yields the defaults.
//! Values are range-checked the same way the server checks its own file.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for one attach exchange.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Gateway IP address.
    #[serde(default = "default_server_ip")]
    pub server_ip: String,
    /// Gateway UDP port.
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    /// Receive buffer size for the reply.
    #[serde(default = "default_udp_buffer_size")]
    pub udp_buffer_size: usize,
    /// How long to wait for the reply before giving up.
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
    /// `tracing` level; `RUST_LOG` overrides it.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_server_ip() -> String {
    "127.0.0.1".to_string()
}
fn default_server_port() -> u16 {
    9000
}
fn default_udp_buffer_size() -> usize {
    1024
}
fn default_response_timeout_ms() -> u64 {
    1000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_ip: default_server_ip(),
            server_port: default_server_port(),
            udp_buffer_size: default_udp_buffer_size(),
            response_timeout_ms: default_response_timeout_ms(),
            log_level: default_log_level(),
        }
    }
}

impl ClientConfig {
    /// Checks every value for range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server_addr()?;
        if self.server_port == 0 {
            return Err(ConfigError::Invalid(
                "server_port must be between 1 and 65535".to_string(),
            ));
        }
        if !(512..=65536).contains(&self.udp_buffer_size) {
            return Err(ConfigError::Invalid(
                "udp_buffer_size must be between 512 and 65536 bytes".to_string(),
            ));
        }
        if self.response_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "response_timeout_ms must be positive".to_string(),
            ));
        }
        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "unknown log level '{}'",
                self.log_level
            )));
        }
        Ok(())
    }

    /// The gateway's UDP address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `server_ip` is not an IP address.
    pub fn server_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.server_ip.parse().map_err(|_| {
            ConfigError::Invalid(format!("server_ip '{}' is not an IP address", self.server_ip))
        })?;
        Ok(SocketAddr::new(ip, self.server_port))
    }

    /// The reply timeout as a [`Duration`].
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

/// Loads the client config from `path`, or the defaults if it does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for read failures other than "not found",
/// [`ConfigError::Parse`] for malformed TOML and [`ConfigError::Invalid`]
/// for out-of-range values.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let cfg = match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ClientConfig::default(),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    cfg.validate()?;
    Ok(cfg)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

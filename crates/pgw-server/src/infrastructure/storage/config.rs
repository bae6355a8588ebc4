//! TOML-based configuration for the gateway server.
//!
//! The file is read once at startup (default `configs/server.toml`, override
//! with `--config`).  Example:
//!
//! ```toml
//! [network]
//! udp_ip = "0.0.0.0"
//! udp_port = 9000
//! udp_buffer_size = 1024
//! poll_interval_ms = 1000
//! http_port = 8080
//!
//! [session]
//! timeout_secs = 30
//! shutdown_rate = 10
//! cdr_file = "cdr.csv"
//! blacklist = ["001010000000001"]
//!
//! [log]
//! level = "info"
//! file = "logs/pgw-server.log"
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent, so a minimal file with empty
//! sections is valid.  Defaults are not a substitute for validation:
//! [`ServerConfig::validate`] range-checks every value after parsing, and
//! [`load_config`] refuses to return a config that fails it.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::SessionStoreConfig;
use crate::infrastructure::network::UdpServerConfig;

/// Smallest accepted UDP receive buffer, in bytes.
pub const MIN_UDP_BUFFER_SIZE: usize = 512;
/// Largest accepted UDP receive buffer, in bytes.
pub const MAX_UDP_BUFFER_SIZE: usize = 65536;

/// Error type for configuration file operations.
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

    /// A value parsed but is out of range or inconsistent.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Socket settings for the UDP front end and the admin interface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// IP address both listeners bind to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_udp_ip")]
    pub udp_ip: String,
    /// UDP port for attach requests.
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,
    /// Receive buffer size; a datagram filling it is logged as possibly truncated.
    #[serde(default = "default_udp_buffer_size")]
    pub udp_buffer_size: usize,
    /// Upper bound on one readiness wait before the stop flag is rechecked.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// TCP port of the HTTP admin interface.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

/// Session lifetime and audit settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Sessions older than this many seconds are expired by the sweep.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Sessions closed per second while draining on shutdown.
    #[serde(default = "default_shutdown_rate")]
    pub shutdown_rate: u32,
    /// Path of the append-only CDR file.
    #[serde(default = "default_cdr_file")]
    pub cdr_file: PathBuf,
    /// IMSIs that are always rejected.
    #[serde(default)]
    pub blacklist: Vec<String>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    /// `tracing` level: `"trace"`, `"debug"`, `"info"`, `"warn"`, `"error"`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file; output also goes to stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_udp_ip() -> String {
    "0.0.0.0".to_string()
}
fn default_udp_port() -> u16 {
    9000
}
fn default_udp_buffer_size() -> usize {
    1024
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_http_port() -> u16 {
    8080
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_shutdown_rate() -> u32 {
    10
}
fn default_cdr_file() -> PathBuf {
    PathBuf::from("cdr.csv")
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            udp_ip: default_udp_ip(),
            udp_port: default_udp_port(),
            udp_buffer_size: default_udp_buffer_size(),
            poll_interval_ms: default_poll_interval_ms(),
            http_port: default_http_port(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            shutdown_rate: default_shutdown_rate(),
            cdr_file: default_cdr_file(),
            blacklist: Vec::new(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

// ── Validation and derived settings ──────────────────────────────────────────

impl ServerConfig {
    /// Checks every value for range and consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let net = &self.network;
        net.udp_ip
            .parse::<IpAddr>()
            .map_err(|_| invalid(format!("udp_ip '{}' is not an IP address", net.udp_ip)))?;
        if net.udp_port == 0 {
            return Err(invalid("udp_port must be between 1 and 65535"));
        }
        if net.http_port == 0 {
            return Err(invalid("http_port must be between 1 and 65535"));
        }
        if net.udp_port == net.http_port {
            return Err(invalid("udp_port and http_port must differ"));
        }
        if !(MIN_UDP_BUFFER_SIZE..=MAX_UDP_BUFFER_SIZE).contains(&net.udp_buffer_size) {
            return Err(invalid(format!(
                "udp_buffer_size must be between {MIN_UDP_BUFFER_SIZE} and {MAX_UDP_BUFFER_SIZE} bytes"
            )));
        }
        if net.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms must be positive"));
        }

        let session = &self.session;
        if session.timeout_secs == 0 {
            return Err(invalid("session timeout_secs must be positive"));
        }
        if session.shutdown_rate == 0 {
            return Err(invalid("shutdown_rate must be positive"));
        }
        if session.cdr_file.as_os_str().is_empty() {
            return Err(invalid("cdr_file must not be empty"));
        }
        if let Some(bad) = session
            .blacklist
            .iter()
            .find(|imsi| imsi.is_empty() || !imsi.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(invalid(format!("blacklist entry '{bad}' is not a digit string")));
        }

        self.log
            .level
            .parse::<tracing::Level>()
            .map_err(|_| invalid(format!("unknown log level '{}'", self.log.level)))?;
        if matches!(&self.log.file, Some(p) if p.as_os_str().is_empty()) {
            return Err(invalid("log file path must not be empty"));
        }

        Ok(())
    }

    /// Address of the UDP attach listener.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `udp_ip` is not an IP address.
    pub fn udp_bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        Ok(SocketAddr::new(self.bind_ip()?, self.network.udp_port))
    }

    /// Address of the HTTP admin listener.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `udp_ip` is not an IP address.
    pub fn http_bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        Ok(SocketAddr::new(self.bind_ip()?, self.network.http_port))
    }

    /// Settings for the session store.
    pub fn session_store_config(&self) -> SessionStoreConfig {
        SessionStoreConfig {
            session_timeout: Duration::from_secs(self.session.timeout_secs),
            shutdown_rate: self.session.shutdown_rate,
            ..SessionStoreConfig::default()
        }
    }

    /// Settings for the UDP front end.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `udp_ip` is not an IP address.
    pub fn udp_server_config(&self) -> Result<UdpServerConfig, ConfigError> {
        Ok(UdpServerConfig {
            bind_addr: self.udp_bind_addr()?,
            buffer_size: self.network.udp_buffer_size,
            poll_interval: Duration::from_millis(self.network.poll_interval_ms),
        })
    }

    fn bind_ip(&self) -> Result<IpAddr, ConfigError> {
        self.network
            .udp_ip
            .parse()
            .map_err(|_| invalid(format!("udp_ip '{}' is not an IP address", self.network.udp_ip)))
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Parses and validates a config from TOML text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed TOML and
/// [`ConfigError::Invalid`] for out-of-range values.
pub fn parse_config(content: &str) -> Result<ServerConfig, ConfigError> {
    let cfg: ServerConfig = toml::from_str(content)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Reads, parses and validates the config file at `path`.
///
/// Unlike a desktop settings file, a missing server config is an error: the
/// operator must say where to listen.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
/// errors of [`parse_config`].
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

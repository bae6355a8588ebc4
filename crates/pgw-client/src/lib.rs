//! pgw-client library entry point.
//!
//! The client is the test companion of `pgw-server`: it packs one IMSI into
//! BCD, sends it in a single UDP datagram and reports whether the gateway
//! answered `created` or `rejected`.
//!
//! - **`config`** – Loads `client.toml` (missing file means defaults).
//! - **`client`** – The one-shot attach exchange.

pub mod client;
pub mod config;

pub use client::{ClientError, PgwClient};
pub use config::{ClientConfig, ConfigError};

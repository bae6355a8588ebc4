//! PGW simulator attach client.
//!
//! # Usage
//!
//! ```text
//! pgw-client <IMSI> [OPTIONS]
//!
//! Options:
//!   -c, --config <PATH>   Client config file [default: configs/client.toml]
//!   -s, --server <ADDR>   Gateway address, overrides the config (e.g. 127.0.0.1:9000)
//! ```
//!
//! Prints `created` or `rejected` on stdout.  Log output goes to stderr so
//! the result can be captured by scripts.  An invalid IMSI, a network error
//! or a missing reply ends the process with a non-zero exit code.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pgw_client::config::load_config;
use pgw_client::PgwClient;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Sends one attach request to a PGW simulator.
#[derive(Debug, Parser)]
#[command(
    name = "pgw-client",
    about = "Send one IMSI attach request to the PGW simulator",
    version
)]
struct Cli {
    /// Subscriber IMSI, decimal digits only.
    imsi: String,

    /// Path of the TOML config file.  A missing file means defaults.
    #[arg(short, long, default_value = "configs/client.toml", env = "PGW_CLIENT_CONFIG")]
    config: PathBuf,

    /// Gateway address, overriding `server_ip`/`server_port` from the config.
    #[arg(short, long, env = "PGW_SERVER")]
    server: Option<SocketAddr>,
}

impl Cli {
    /// Builds the client from the config file and command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error naming the path if the config file is unreadable or
    /// invalid.
    fn into_client(self) -> anyhow::Result<(PgwClient, String, String)> {
        let config = load_config(&self.config)
            .with_context(|| format!("cannot load config '{}'", self.config.display()))?;
        let server = match self.server {
            Some(addr) => addr,
            None => config.server_addr()?,
        };
        let client = PgwClient::new(server, config.udp_buffer_size, config.response_timeout());
        Ok((client, self.imsi, config.log_level))
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (client, imsi, log_level) = Cli::parse().into_client()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let outcome = client
        .attach(&imsi)
        .await
        .with_context(|| format!("attach for {imsi} via {} failed", client.server()))?;

    println!("{outcome}");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! PGW simulator server entry point.
//!
//! Loads the config file, wires the session store to the UDP front end and
//! the admin interface, and runs until Ctrl+C, `SIGTERM` or `GET /stop`.
//!
//! # Usage
//!
//! ```text
//! pgw-server [OPTIONS]
//!
//! Options:
//!   -c, --config <PATH>   Server config file [default: configs/server.toml]
//! ```
//!
//! # Architecture overview
//!
//! ```text
//! main()
//!  ├─ SessionStore         -- table, blacklist, eviction sweep (Tokio task)
//!  │    └─ CdrWriter       -- append-only CSV audit trail
//!  ├─ UdpServer            -- BCD IMSI in, "created"/"rejected" out
//!  ├─ AdminServer          -- /check_subscriber, /stop (axum)
//!  └─ ShutdownSignal       -- shared stop request, watched by every task
//! ```
//!
//! On shutdown the UDP loop is stopped first so no new sessions appear,
//! then the remaining sessions are drained at the configured rate, and the
//! admin interface goes last.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use pgw_server::application::SessionStore;
use pgw_server::infrastructure::admin::{AdminServer, AdminState};
use pgw_server::infrastructure::logging::init_logging;
use pgw_server::infrastructure::network::UdpServer;
use pgw_server::infrastructure::shutdown::ShutdownSignal;
use pgw_server::infrastructure::storage::{load_config, CdrWriter, ServerConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Minimal PGW control-plane simulator.
#[derive(Debug, Parser)]
#[command(
    name = "pgw-server",
    about = "PGW control-plane simulator: UDP attach requests, session table, CDR audit log",
    version
)]
struct Cli {
    /// Path of the TOML config file.
    #[arg(short, long, default_value = "configs/server.toml", env = "PGW_CONFIG")]
    config: PathBuf,
}

impl Cli {
    /// Loads and validates the config file named on the command line.
    ///
    /// # Errors
    ///
    /// Returns an error naming the path if the file is missing, malformed or
    /// holds out-of-range values.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        load_config(&self.config)
            .with_context(|| format!("cannot load config '{}'", self.config.display()))
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_server_config()?;

    init_logging(&config.log.level, config.log.file.as_deref())
        .context("cannot initialise logging")?;
    info!("PGW simulator starting");

    // ── Core state ────────────────────────────────────────────────────────────
    let cdr = CdrWriter::open(&config.session.cdr_file).context("cannot open CDR file")?;
    info!(path = %cdr.path().display(), "CDR audit trail ready");
    let store = Arc::new(SessionStore::new(
        config.session_store_config(),
        config.session.blacklist.iter().cloned(),
        Arc::new(cdr),
    ));
    let shutdown = ShutdownSignal::new();

    // ── Listeners ─────────────────────────────────────────────────────────────
    let udp = UdpServer::bind(config.udp_server_config()?, Arc::clone(&store))
        .context("cannot start UDP front end")?;
    let admin = AdminServer::bind(
        config.http_bind_addr()?,
        AdminState {
            store: Arc::clone(&store),
            shutdown: shutdown.clone(),
        },
    )
    .await
    .context("cannot start admin interface")?;

    // ── Background tasks ──────────────────────────────────────────────────────
    store.start_eviction_sweep();
    tokio::spawn(listen_for_os_signals(shutdown.clone()));

    let udp_task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = udp.run(shutdown.clone()).await {
                error!("UDP front end stopped unexpectedly: {e}");
            }
            // However the loop ended, the gateway cannot serve without it.
            shutdown.trigger();
        })
    };
    let admin_task = tokio::spawn(async move {
        if let Err(e) = admin.run().await {
            error!("admin interface failed: {e}");
        }
    });

    info!("PGW simulator ready");

    // ── Shutdown sequence ─────────────────────────────────────────────────────
    shutdown.wait().await;
    info!("shutdown requested");

    if let Err(e) = udp_task.await {
        error!("UDP task panicked: {e}");
    }
    info!(remaining = store.active_count(), "draining sessions");
    store.graceful_shutdown().await;
    if let Err(e) = admin_task.await {
        error!("admin task panicked: {e}");
    }

    info!("PGW simulator stopped");
    Ok(())
}

/// Triggers `shutdown` on Ctrl+C, or on `SIGTERM` where that exists.
async fn listen_for_os_signals(shutdown: ShutdownSignal) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received SIGTERM"),
        _ = shutdown.wait() => return,
    }
    shutdown.trigger();
}

// ── Tests ─────────────────────────────────────────────────────────────────────

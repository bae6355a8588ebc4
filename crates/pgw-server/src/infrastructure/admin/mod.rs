//! HTTP admin interface.
//!
//! Two plain-text endpoints for operators:
//!
//! | Route                          | Response                                  |
//! |--------------------------------|-------------------------------------------|
//! | `GET /check_subscriber?imsi=X` | `active` or `not active`; 400 if no IMSI  |
//! | `GET` or `POST /stop`          | `stopping`, then the gateway shuts down   |
//!
//! The interface only observes sessions and requests shutdown.  It never
//! creates or removes a session itself: `/stop` triggers the shared
//! [`ShutdownSignal`] and `main` performs the drain.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use serde::Deserialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use crate::application::SessionStore;
use crate::infrastructure::shutdown::ShutdownSignal;

/// Error type for the admin interface.
#[derive(Debug, Error)]
pub enum AdminError {
    /// The TCP listener could not be bound.
    #[error("failed to bind admin listener on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// The HTTP server stopped with an I/O error.
    #[error("admin server failed: {0}")]
    Serve(#[from] std::io::Error),
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AdminState {
    pub store: Arc<SessionStore>,
    pub shutdown: ShutdownSignal,
}

#[derive(Debug, Deserialize)]
struct CheckParams {
    imsi: Option<String>,
}

/// Builds the admin router.
pub fn admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/check_subscriber", get(check_subscriber))
        .route("/stop", get(stop).post(stop))
        .with_state(state)
}

async fn check_subscriber(
    State(state): State<AdminState>,
    Query(params): Query<CheckParams>,
) -> (StatusCode, &'static str) {
    match params.imsi.as_deref().filter(|imsi| !imsi.is_empty()) {
        Some(imsi) if state.store.is_active(imsi) => (StatusCode::OK, "active"),
        Some(_) => (StatusCode::OK, "not active"),
        None => (StatusCode::BAD_REQUEST, "missing imsi parameter"),
    }
}

async fn stop(State(state): State<AdminState>) -> &'static str {
    info!("stop requested through admin interface");
    state.shutdown.trigger();
    "stopping"
}

/// Bound admin listener.  Call [`run`](Self::run) to start serving.
pub struct AdminServer {
    listener: TcpListener,
    state: AdminState,
}

impl AdminServer {
    /// Binds the TCP listener.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::BindFailed`] if the address is unavailable.
    pub async fn bind(addr: SocketAddr, state: AdminState) -> Result<Self, AdminError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| AdminError::BindFailed { addr, source })?;
        Ok(Self { listener, state })
    }

    /// Returns the address the listener is actually bound to.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the listener has become unusable.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves requests until the shared shutdown signal fires.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Serve`] if the server fails.
    pub async fn run(self) -> Result<(), AdminError> {
        let shutdown = self.state.shutdown.clone();
        info!(address = %self.listener.local_addr()?, "admin interface listening");

        axum::serve(self.listener, admin_router(self.state))
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        info!("admin interface stopped");
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

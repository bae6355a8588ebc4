//! Process-wide stop signal.
//!
//! Several components must stop together: the UDP loop, the admin server and
//! `main` itself.  Any of them may be the one that initiates the stop (Ctrl+C,
//! `SIGTERM`, the `/stop` admin endpoint, or the UDP loop dying), so the
//! signal is a cloneable handle around a `tokio::sync::watch` channel holding a
//! single `bool`.
//!
//! # Why a watch channel? (for beginners)
//!
//! A plain `Arc<AtomicBool>` can be *polled*, but a task cannot `await` it.
//! A `watch` channel stores the latest value and wakes every receiver when it
//! changes, so a task can either check the flag synchronously
//! ([`ShutdownSignal::is_triggered`]) or sleep until it flips
//! ([`ShutdownSignal::wait`]).  Triggering is idempotent: the value only ever
//! goes from `false` to `true`.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

/// Cloneable handle that can trigger, query or await the stop request.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    /// Creates a signal in the not-triggered state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Requests shutdown.  Calling it again has no further effect.
    pub fn trigger(&self) {
        if !self.tx.send_replace(true) {
            debug!("shutdown triggered");
        }
    }

    /// Returns `true` once [`trigger`](Self::trigger) has been called.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Completes once shutdown has been triggered.
    ///
    /// Returns immediately if it already was.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|&stopped| stopped).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

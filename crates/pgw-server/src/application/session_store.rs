//! SessionStore: the authoritative table of active subscriber sessions.
//!
//! The store owns three things:
//!
//! - The **session table**, `IMSI -> creation instant`, behind a single
//!   `Mutex`.  Every read or write of the table happens inside one critical
//!   section, so no caller ever observes a half-applied change.
//! - The **blacklist**, fixed at construction.  It is never mutated, so it is
//!   read without any lock.
//! - The **eviction sweep**, a background Tokio task that wakes once per
//!   `sweep_interval` and removes sessions older than `session_timeout`.
//!
//! # Session lifecycle (for beginners)
//!
//! ```text
//!              process_request            sweep (age > timeout)
//!   (absent) ─────────────────►  active  ──────────────────────►  (absent)
//!                                   │
//!                                   │ graceful_shutdown
//!                                   ▼
//!                                (absent)
//! ```
//!
//! Each arrow produces exactly one audit record: `created`, `expired` or
//! `closed-on-shutdown`.  There is no "update" transition.
//!
//! # Known constraint
//!
//! The sweep scans the whole table while holding the lock.  That is fine for
//! the modest session counts this simulator targets; with an unbounded table
//! the scan length becomes the request-latency ceiling.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use pgw_core::SessionOutcome;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::audit::{AuditSink, CdrAction};

type SessionTable = HashMap<String, Instant>;

/// Tunables for the session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStoreConfig {
    /// A session older than this is removed by the next sweep.
    pub session_timeout: Duration,
    /// Sessions closed per second during [`SessionStore::graceful_shutdown`].
    pub shutdown_rate: u32,
    /// How often the eviction sweep wakes up.
    pub sweep_interval: Duration,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            session_timeout: Duration::from_secs(30),
            shutdown_rate: 10,
            sweep_interval: Duration::from_secs(1),
        }
    }
}

/// Handle to the running eviction sweep task.
struct SweepHandle {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Concurrency-safe session table with expiry sweep and paced shutdown drain.
///
/// Share it between tasks as `Arc<SessionStore>`.
pub struct SessionStore {
    config: SessionStoreConfig,
    blacklist: HashSet<String>,
    sessions: Arc<Mutex<SessionTable>>,
    audit: Arc<dyn AuditSink>,
    sweeper: Mutex<Option<SweepHandle>>,
}

impl SessionStore {
    /// Creates an empty store.  The blacklist is frozen from this point on.
    pub fn new(
        config: SessionStoreConfig,
        blacklist: impl IntoIterator<Item = String>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let blacklist: HashSet<String> = blacklist.into_iter().collect();
        info!(
            blacklisted = blacklist.len(),
            timeout_ms = config.session_timeout.as_millis() as u64,
            "session store initialised"
        );
        Self {
            config,
            blacklist,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            audit,
            sweeper: Mutex::new(None),
        }
    }

    /// Handles an attach request for `imsi`.
    ///
    /// Blacklisted subscribers are rejected without touching the table.
    /// Otherwise the duplicate check and the insert happen in one critical
    /// section, so concurrent requests for the same IMSI yield exactly one
    /// [`SessionOutcome::Created`].
    pub fn process_request(&self, imsi: &str) -> SessionOutcome {
        debug!(imsi, "attach request");

        if self.blacklist.contains(imsi) {
            info!(imsi, "subscriber is blacklisted, request rejected");
            return SessionOutcome::Rejected;
        }

        let mut sessions = lock(&self.sessions);
        if sessions.contains_key(imsi) {
            info!(imsi, "session already exists, request rejected");
            return SessionOutcome::Rejected;
        }

        sessions.insert(imsi.to_owned(), Instant::now());
        info!(imsi, "session created");
        record(self.audit.as_ref(), imsi, CdrAction::Created);
        SessionOutcome::Created
    }

    /// Returns `true` if the table currently holds a session for `imsi`.
    pub fn is_active(&self, imsi: &str) -> bool {
        lock(&self.sessions).contains_key(imsi)
    }

    /// Returns the number of live sessions.
    pub fn active_count(&self) -> usize {
        lock(&self.sessions).len()
    }

    /// Launches the background eviction sweep.
    ///
    /// Calling this while the sweep is already running logs a warning and
    /// does nothing.  Must be called from within a Tokio runtime.
    pub fn start_eviction_sweep(&self) {
        let mut sweeper = lock(&self.sweeper);
        if sweeper.is_some() {
            warn!("eviction sweep is already running");
            return;
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run_sweep(
            Arc::clone(&self.sessions),
            Arc::clone(&self.audit),
            self.config.session_timeout,
            self.config.sweep_interval,
            stop_rx,
        ));
        *sweeper = Some(SweepHandle { stop_tx, task });
        info!("eviction sweep started");
    }

    /// Signals the eviction sweep to stop and waits for it to finish.
    ///
    /// After this returns no sweep activity is in progress.  Calling it when
    /// the sweep is not running logs a warning and returns immediately.
    pub async fn stop_eviction_sweep(&self) {
        let handle = lock(&self.sweeper).take();
        let Some(handle) = handle else {
            warn!("eviction sweep is not running");
            return;
        };

        // The task may already be gone if the runtime is shutting down.
        let _ = handle.stop_tx.send(());
        if let Err(e) = handle.task.await {
            error!("eviction sweep task failed: {e}");
        }
        info!("eviction sweep stopped");
    }

    /// Drains every remaining session at `shutdown_rate` sessions per second.
    ///
    /// The sweep is stopped first.  The whole table is then swapped for an
    /// empty one in a single critical section, and the pacing happens outside
    /// the lock: one `closed-on-shutdown` record, then a delay of
    /// `1000 / shutdown_rate` ms, per session.
    pub async fn graceful_shutdown(&self) {
        info!("session store shutting down");
        self.stop_eviction_sweep().await;

        let drained: Vec<String> = {
            let mut sessions = lock(&self.sessions);
            std::mem::take(&mut *sessions).into_keys().collect()
        };

        if drained.is_empty() {
            info!("no active sessions to close");
            return;
        }

        let rate = self.config.shutdown_rate.max(1);
        let delay = Duration::from_millis(1000 / u64::from(rate));
        info!(
            count = drained.len(),
            rate, "closing active sessions"
        );

        for imsi in &drained {
            info!(imsi = %imsi, "session closed on shutdown");
            record(self.audit.as_ref(), imsi, CdrAction::ClosedOnShutdown);
            tokio::time::sleep(delay).await;
        }

        info!("session store stopped");
    }
}

// ── Eviction sweep ────────────────────────────────────────────────────────────

async fn run_sweep(
    sessions: Arc<Mutex<SessionTable>>,
    audit: Arc<dyn AuditSink>,
    session_timeout: Duration,
    sweep_interval: Duration,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // The first tick resolves immediately.

    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {}
        }

        // A stop requested while we slept must not get one last pass.
        if !matches!(stop_rx.try_recv(), Err(oneshot::error::TryRecvError::Empty)) {
            break;
        }

        let evicted = evict_expired(&sessions, audit.as_ref(), session_timeout);
        if evicted > 0 {
            debug!(evicted, "eviction sweep pass finished");
        }
    }

    debug!("eviction sweep loop exited");
}

/// Removes every session older than `session_timeout`, returning how many.
fn evict_expired(
    sessions: &Mutex<SessionTable>,
    audit: &dyn AuditSink,
    session_timeout: Duration,
) -> usize {
    let mut sessions = lock(sessions);
    let now = Instant::now();
    let before = sessions.len();

    sessions.retain(|imsi, created_at| {
        let expired = now.duration_since(*created_at) > session_timeout;
        if expired {
            info!(imsi = %imsi, "session expired and was removed");
            record(audit, imsi, CdrAction::Expired);
        }
        !expired
    });

    before - sessions.len()
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Appends an audit record, logging (not propagating) a failed write.
fn record(audit: &dyn AuditSink, imsi: &str, action: CdrAction) {
    if let Err(e) = audit.write(imsi, action) {
        error!(imsi, %action, "failed to write CDR: {e}");
    }
}

/// Locks `mutex`, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::audit::{AuditError, MockAuditSink};

    const IMSI: &str = "250990123456789";
    const BLACKLISTED: &str = "999999999999999";

    fn make_store(audit: MockAuditSink, config: SessionStoreConfig) -> SessionStore {
        SessionStore::new(config, [BLACKLISTED.to_string()], Arc::new(audit))
    }

    fn expect_action(audit: &mut MockAuditSink, imsi: &'static str, action: CdrAction, times: usize) {
        audit
            .expect_write()
            .withf(move |i, a| i == imsi && *a == action)
            .times(times)
            .returning(|_, _| Ok(()));
    }

    #[test]
    fn test_process_request_creates_session_and_writes_one_record() {
        // Arrange
        let mut audit = MockAuditSink::new();
        expect_action(&mut audit, IMSI, CdrAction::Created, 1);
        let store = make_store(audit, SessionStoreConfig::default());

        // Act
        let outcome = store.process_request(IMSI);

        // Assert
        assert_eq!(outcome, SessionOutcome::Created);
        assert!(store.is_active(IMSI));
        assert_eq!(store.active_count(), 1);
    }

    #[test]
    fn test_process_request_twice_rejects_duplicate() {
        let mut audit = MockAuditSink::new();
        expect_action(&mut audit, IMSI, CdrAction::Created, 1);
        let store = make_store(audit, SessionStoreConfig::default());

        assert_eq!(store.process_request(IMSI), SessionOutcome::Created);
        assert_eq!(store.process_request(IMSI), SessionOutcome::Rejected);
        assert_eq!(store.active_count(), 1);
    }

    #[test]
    fn test_blacklisted_imsi_is_rejected_without_audit_record() {
        // Arrange: no expectations, so any write would panic the mock
        let audit = MockAuditSink::new();
        let store = make_store(audit, SessionStoreConfig::default());

        // Act / Assert
        assert_eq!(store.process_request(BLACKLISTED), SessionOutcome::Rejected);
        assert_eq!(store.process_request(BLACKLISTED), SessionOutcome::Rejected);
        assert!(!store.is_active(BLACKLISTED));
    }

    #[test]
    fn test_audit_failure_does_not_undo_session_creation() {
        // Arrange
        let mut audit = MockAuditSink::new();
        audit
            .expect_write()
            .times(1)
            .returning(|_, _| Err(AuditError::Write(std::io::Error::other("disk full"))));
        let store = make_store(audit, SessionStoreConfig::default());

        // Act
        let outcome = store.process_request(IMSI);

        // Assert
        assert_eq!(outcome, SessionOutcome::Created);
        assert!(store.is_active(IMSI));
    }

    #[test]
    fn test_unknown_imsi_is_not_active() {
        let store = make_store(MockAuditSink::new(), SessionStoreConfig::default());
        assert!(!store.is_active("111111111111111"));
    }

    #[test]
    fn test_evict_expired_removes_only_old_sessions() {
        // Arrange: one stale entry, one fresh entry
        let mut audit = MockAuditSink::new();
        expect_action(&mut audit, "111", CdrAction::Expired, 1);
        let sessions = Mutex::new(HashMap::from([
            ("111".to_string(), Instant::now() - Duration::from_secs(10)),
            ("222".to_string(), Instant::now()),
        ]));

        // Act
        let evicted = evict_expired(&sessions, &audit, Duration::from_secs(5));

        // Assert
        assert_eq!(evicted, 1);
        let sessions = lock(&sessions);
        assert!(!sessions.contains_key("111"));
        assert!(sessions.contains_key("222"));
    }

    #[tokio::test]
    async fn test_sweep_expires_session_and_writes_record() {
        // Arrange
        let mut audit = MockAuditSink::new();
        expect_action(&mut audit, IMSI, CdrAction::Created, 1);
        expect_action(&mut audit, IMSI, CdrAction::Expired, 1);
        let store = make_store(
            audit,
            SessionStoreConfig {
                session_timeout: Duration::from_millis(50),
                shutdown_rate: 100,
                sweep_interval: Duration::from_millis(20),
            },
        );
        store.process_request(IMSI);

        // Act
        store.start_eviction_sweep();
        tokio::time::sleep(Duration::from_millis(200)).await;
        store.stop_eviction_sweep().await;

        // Assert
        assert!(!store.is_active(IMSI));
    }

    #[tokio::test]
    async fn test_start_eviction_sweep_twice_is_a_no_op() {
        let store = make_store(MockAuditSink::new(), SessionStoreConfig::default());

        store.start_eviction_sweep();
        store.start_eviction_sweep();

        assert!(lock(&store.sweeper).is_some());
        store.stop_eviction_sweep().await;
        assert!(lock(&store.sweeper).is_none());
    }

    #[tokio::test]
    async fn test_stop_eviction_sweep_without_start_returns() {
        let store = make_store(MockAuditSink::new(), SessionStoreConfig::default());
        store.stop_eviction_sweep().await;
        store.stop_eviction_sweep().await;
    }

    #[tokio::test]
    async fn test_sweep_can_be_restarted_after_stop() {
        let store = make_store(MockAuditSink::new(), SessionStoreConfig::default());

        store.start_eviction_sweep();
        store.stop_eviction_sweep().await;
        store.start_eviction_sweep();

        assert!(lock(&store.sweeper).is_some());
        store.stop_eviction_sweep().await;
    }

    #[tokio::test]
    async fn test_graceful_shutdown_closes_every_session_once() {
        // Arrange
        let mut audit = MockAuditSink::new();
        for imsi in ["111", "222", "333"] {
            expect_action(&mut audit, imsi, CdrAction::Created, 1);
            expect_action(&mut audit, imsi, CdrAction::ClosedOnShutdown, 1);
        }
        let store = make_store(
            audit,
            SessionStoreConfig {
                shutdown_rate: 1000,
                ..SessionStoreConfig::default()
            },
        );
        for imsi in ["111", "222", "333"] {
            store.process_request(imsi);
        }
        store.start_eviction_sweep();

        // Act
        store.graceful_shutdown().await;

        // Assert
        assert_eq!(store.active_count(), 0);
        assert!(lock(&store.sweeper).is_none());
    }

    #[tokio::test]
    async fn test_graceful_shutdown_with_empty_table_returns_immediately() {
        let store = make_store(
            MockAuditSink::new(),
            SessionStoreConfig {
                shutdown_rate: 1,
                ..SessionStoreConfig::default()
            },
        );

        let started = Instant::now();
        store.graceful_shutdown().await;

        // A single paced close at rate 1/s would take a full second.
        assert!(started.elapsed() < Duration::from_millis(500));
    }
}

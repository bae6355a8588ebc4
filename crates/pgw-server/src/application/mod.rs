//! Application layer for the gateway.
//!
//! # What lives here? (for beginners)
//!
//! In Clean Architecture the *application* layer holds the rules of the
//! system without knowing how bytes reach it.  Nothing in this module opens a
//! socket or a file:
//!
//! - **`session_store`** – The table of active sessions, the blacklist check,
//!   the background expiry sweep and the paced shutdown drain.  This is the
//!   state every other component talks to.
//!
//! - **`audit`** – The contract for the append-only audit trail.  The store
//!   depends on the [`audit::AuditSink`] trait; the infrastructure layer
//!   provides the file-backed implementation.

pub mod audit;
pub mod session_store;

pub use audit::{AuditError, AuditSink, CdrAction};
pub use session_store::{SessionStore, SessionStoreConfig};

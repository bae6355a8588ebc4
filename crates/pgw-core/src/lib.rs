//! # pgw-core
//!
//! Shared library for the PGW simulator containing the subscriber identifier
//! codec and the reply vocabulary spoken on the wire.
//!
//! This crate is used by both the server and the client applications.
//! It has zero dependencies on OS APIs, network sockets, or an async runtime.
//!
//! # Architecture overview (for beginners)
//!
//! A Packet-Data-Network Gateway (PGW) is the node in a mobile core network
//! that hands out data sessions to subscribers.  This simulator models only
//! the control-plane bookkeeping: a subscriber "attaches" by sending its IMSI
//! in a single UDP datagram, and the gateway answers `created` or `rejected`.
//!
//! - **`protocol::bcd`** – How an IMSI travels over the network.  The decimal
//!   digits are packed two per byte (binary-coded decimal) so a 15-digit IMSI
//!   fits into 8 bytes.
//!
//! - **`protocol::reply`** – The fixed textual replies the gateway sends back.

pub mod protocol;

// Re-export the most-used items at the crate root so callers can write
// `pgw_core::encode_imsi` instead of `pgw_core::protocol::bcd::encode`.
pub use protocol::bcd::{decode as decode_imsi, encode as encode_imsi, BcdError};
pub use protocol::reply::{ReplyParseError, SessionOutcome};

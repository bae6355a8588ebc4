//! Network infrastructure for the gateway.
//!
//! # Sub-modules
//!
//! - **`udp_server`** – The non-blocking UDP front end.  Receives BCD-encoded
//!   IMSIs, hands them to the session store and replies `created` or
//!   `rejected` to the sender.

pub mod udp_server;

pub use udp_server::{NetworkError, UdpServer, UdpServerConfig};

//! Infrastructure layer for the gateway.
//!
//! Contains OS-facing adapters: the UDP and HTTP listeners, the CDR file,
//! the config loader, logging setup and the process-wide stop signal.
//!
//! **Dependency rule**: this layer may depend on `application` and `pgw_core`,
//! but MUST NOT be imported by the `application` layer.

pub mod admin;
pub mod logging;
pub mod network;
pub mod shutdown;
pub mod storage;

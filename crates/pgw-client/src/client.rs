//! One-shot attach exchange with the gateway.
//!
//! ```text
//! client (ephemeral port)                 gateway
//!   │  BCD(IMSI) ─────────────────────────►  │
//!   │  ◄───────────────── "created"/"rejected"│
//! ```
//!
//! UDP gives no delivery guarantee, so the client waits at most
//! `response_timeout` and reports [`ClientError::Timeout`] when nothing came
//! back.  The gateway drops malformed requests silently, which looks the
//! same from here.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use pgw_core::{encode_imsi, BcdError, ReplyParseError, SessionOutcome};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, info};

/// Error type for the attach exchange.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The IMSI is not a non-empty string of decimal digits.
    #[error("invalid IMSI: {0}")]
    InvalidImsi(#[from] BcdError),
    /// A socket operation failed.
    #[error("network error: {0}")]
    Io(#[from] std::io::Error),
    /// No reply arrived in time.
    #[error("no reply from gateway within {0:?}")]
    Timeout(Duration),
    /// The gateway answered with something other than `created`/`rejected`.
    #[error(transparent)]
    UnexpectedReply(#[from] ReplyParseError),
}

/// Sends attach requests to one gateway.
#[derive(Debug, Clone)]
pub struct PgwClient {
    server: SocketAddr,
    buffer_size: usize,
    response_timeout: Duration,
}

impl PgwClient {
    /// Creates a client for the gateway at `server`.
    pub fn new(server: SocketAddr, buffer_size: usize, response_timeout: Duration) -> Self {
        Self {
            server,
            buffer_size: buffer_size.max(1),
            response_timeout,
        }
    }

    /// The gateway address requests are sent to.
    pub fn server(&self) -> SocketAddr {
        self.server
    }

    /// Requests a session for `imsi` and returns the gateway's verdict.
    ///
    /// Datagrams arriving from any address other than the gateway are
    /// ignored while waiting.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidImsi`] before anything is sent.
    /// - [`ClientError::Io`] if the socket cannot be bound or used.
    /// - [`ClientError::Timeout`] if no reply arrives in time.
    /// - [`ClientError::UnexpectedReply`] for an unknown reply text.
    pub async fn attach(&self, imsi: &str) -> Result<SessionOutcome, ClientError> {
        let packed = encode_imsi(imsi)?;

        let local: SocketAddr = if self.server.is_ipv6() {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.send_to(&packed, self.server).await?;
        info!(imsi, server = %self.server, bytes = packed.len(), "attach request sent");

        let deadline = Instant::now() + self.response_timeout;
        let mut buf = vec![0u8; self.buffer_size];
        loop {
            let (len, peer) = tokio::time::timeout_at(deadline, socket.recv_from(&mut buf))
                .await
                .map_err(|_| ClientError::Timeout(self.response_timeout))??;

            if peer != self.server {
                debug!(%peer, "ignoring datagram from unexpected sender");
                continue;
            }

            let text = String::from_utf8_lossy(&buf[..len]);
            let outcome: SessionOutcome = text.parse()?;
            info!(imsi, %outcome, "reply received");
            return Ok(outcome);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

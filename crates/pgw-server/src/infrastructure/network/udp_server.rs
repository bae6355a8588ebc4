//! Non-blocking UDP front end for attach requests.
//!
//! Each datagram carries one BCD-encoded IMSI.  The server decodes it, asks
//! the [`SessionStore`] for a verdict and sends the ASCII reply (`created` or
//! `rejected`) back to the sender's address.
//!
//! # Readiness loop (for beginners)
//!
//! The socket is switched to non-blocking mode and handed to Tokio, which
//! registers it with the OS readiness mechanism (epoll on Linux).  The loop
//! then alternates between two steps:
//!
//! 1. **Wait** until the socket is readable, the stop signal fires, or
//!    `poll_interval` elapses, whichever comes first.  The interval bounds
//!    how long a stop request can go unnoticed.
//! 2. **Drain** every queued datagram with `try_recv_from` until the kernel
//!    reports `WouldBlock`.  One readiness notification may cover many
//!    datagrams, so reading only one would leave the rest waiting for the
//!    next wake-up.
//!
//! Malformed datagrams are logged and dropped without a reply.  UDP is
//! connectionless: a client that gets no answer simply times out.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pgw_core::decode_imsi;
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};

use crate::application::SessionStore;
use crate::infrastructure::shutdown::ShutdownSignal;

/// Error type for the UDP front end.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The UDP socket could not be bound.
    #[error("failed to bind UDP socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// The bound socket could not be registered with the async runtime.
    #[error("failed to register UDP socket with the runtime: {0}")]
    Register(#[source] std::io::Error),
    /// The socket failed in a way the loop cannot recover from.
    #[error("UDP socket failed: {0}")]
    Socket(#[source] std::io::Error),
}

/// Settings for [`UdpServer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpServerConfig {
    /// Local address to bind.
    pub bind_addr: SocketAddr,
    /// Receive buffer size in bytes.
    pub buffer_size: usize,
    /// Longest single readiness wait before the stop signal is rechecked.
    pub poll_interval: Duration,
}

/// Bound UDP front end.  Call [`run`](Self::run) to start serving.
pub struct UdpServer {
    socket: UdpSocket,
    config: UdpServerConfig,
    store: Arc<SessionStore>,
}

impl UdpServer {
    /// Binds the socket and registers it with the Tokio reactor.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::BindFailed`] if the address is unavailable and
    /// [`NetworkError::Register`] if the socket cannot be made non-blocking.
    pub fn bind(config: UdpServerConfig, store: Arc<SessionStore>) -> Result<Self, NetworkError> {
        let addr = config.bind_addr;
        let std_socket = std::net::UdpSocket::bind(addr)
            .map_err(|source| NetworkError::BindFailed { addr, source })?;
        std_socket
            .set_nonblocking(true)
            .map_err(NetworkError::Register)?;
        let socket = UdpSocket::from_std(std_socket).map_err(NetworkError::Register)?;

        info!(
            addr = %socket.local_addr().unwrap_or(addr),
            buffer = config.buffer_size,
            "UDP front end bound"
        );
        Ok(Self {
            socket,
            config,
            store,
        })
    }

    /// Returns the address the socket is actually bound to.
    ///
    /// Useful when the configured port was `0`.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the socket has become unusable.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Serves requests until `shutdown` is triggered.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Socket`] if the socket dies.  The caller is
    /// expected to treat that as a reason to shut the whole gateway down.
    pub async fn run(self, shutdown: ShutdownSignal) -> Result<(), NetworkError> {
        let mut buf = vec![0u8; self.config.buffer_size.max(1)];
        info!("UDP front end running");

        while !shutdown.is_triggered() {
            tokio::select! {
                _ = shutdown.wait() => break,
                ready = tokio::time::timeout(self.config.poll_interval, self.socket.readable()) => {
                    match ready {
                        // Nothing arrived within the interval; recheck the flag.
                        Err(_elapsed) => continue,
                        Ok(Err(e)) => {
                            error!("UDP readiness wait failed: {e}");
                            return Err(NetworkError::Socket(e));
                        }
                        Ok(Ok(())) => {}
                    }
                }
            }

            if let Err(e) = self.drain(&mut buf) {
                error!("UDP receive failed: {e}");
                // A transient error leaves the socket usable; a dead one does not.
                if let Err(dead) = self.socket.local_addr() {
                    return Err(NetworkError::Socket(dead));
                }
            }
        }

        info!("UDP front end stopped");
        Ok(())
    }

    /// Handles every datagram currently queued on the socket.
    ///
    /// Returns `Ok` once the queue is empty, or the first receive error that
    /// is not `WouldBlock`.
    fn drain(&self, buf: &mut [u8]) -> std::io::Result<()> {
        loop {
            match self.socket.try_recv_from(buf) {
                Ok((len, peer)) => self.handle_datagram(&buf[..len], buf.len(), peer),
                Err(e) if is_would_block(&e) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    fn handle_datagram(&self, datagram: &[u8], capacity: usize, peer: SocketAddr) {
        if datagram.is_empty() {
            debug!(%peer, "empty datagram ignored");
            return;
        }
        if datagram.len() == capacity {
            warn!(%peer, len = datagram.len(), "datagram filled the receive buffer, possibly truncated");
        }

        let imsi = match decode_imsi(datagram) {
            Ok(imsi) => imsi,
            Err(e) => {
                warn!(%peer, "dropping malformed request: {e}");
                return;
            }
        };

        let outcome = self.store.process_request(&imsi);
        debug!(%peer, imsi = %imsi, %outcome, "sending reply");
        if let Err(e) = self.socket.try_send_to(outcome.as_bytes(), peer) {
            warn!(%peer, "failed to send reply: {e}");
        }
    }
}

/// Returns `true` for the error kind that means "nothing more to read now".
fn is_would_block(e: &std::io::Error) -> bool {
    e.kind() == std::io::ErrorKind::WouldBlock
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::audit::MockAuditSink;
    use crate::application::SessionStoreConfig;
    use pgw_core::encode_imsi;

    fn store_with_blacklist(blacklist: &[&str]) -> Arc<SessionStore> {
        let mut audit = MockAuditSink::new();
        audit.expect_write().returning(|_, _| Ok(()));
        Arc::new(SessionStore::new(
            SessionStoreConfig::default(),
            blacklist.iter().map(|s| s.to_string()),
            Arc::new(audit),
        ))
    }

    fn loopback_config() -> UdpServerConfig {
        UdpServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            buffer_size: 1024,
            poll_interval: Duration::from_millis(50),
        }
    }

    async fn request(client: &UdpSocket, server: SocketAddr, payload: &[u8]) -> Option<String> {
        client.send_to(payload, server).await.unwrap();
        let mut buf = [0u8; 64];
        match tokio::time::timeout(Duration::from_millis(500), client.recv_from(&mut buf)).await {
            Ok(Ok((n, _))) => Some(String::from_utf8_lossy(&buf[..n]).into_owned()),
            _ => None,
        }
    }

    #[test]
    fn test_is_would_block_only_matches_would_block() {
        assert!(is_would_block(&std::io::Error::from(
            std::io::ErrorKind::WouldBlock
        )));
        assert!(!is_would_block(&std::io::Error::from(
            std::io::ErrorKind::ConnectionReset
        )));
    }

    #[tokio::test]
    async fn test_bind_on_occupied_port_returns_bind_failed() {
        // Arrange
        let holder = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut config = loopback_config();
        config.bind_addr = holder.local_addr().unwrap();

        // Act
        let result = UdpServer::bind(config, store_with_blacklist(&[]));

        // Assert
        assert!(matches!(result, Err(NetworkError::BindFailed { .. })));
    }

    #[tokio::test]
    async fn test_attach_created_then_rejected_then_blacklisted() {
        // Arrange
        let store = store_with_blacklist(&["999990000000001"]);
        let server = UdpServer::bind(loopback_config(), Arc::clone(&store)).unwrap();
        let server_addr = server.local_addr().unwrap();
        let shutdown = ShutdownSignal::new();
        let task = tokio::spawn(server.run(shutdown.clone()));
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        // Act
        let imsi = encode_imsi("001010123456789").unwrap();
        let first = request(&client, server_addr, &imsi).await;
        let second = request(&client, server_addr, &imsi).await;
        let banned = request(&client, server_addr, &encode_imsi("999990000000001").unwrap()).await;

        // Assert
        assert_eq!(first.as_deref(), Some("created"));
        assert_eq!(second.as_deref(), Some("rejected"));
        assert_eq!(banned.as_deref(), Some("rejected"));
        assert!(store.is_active("001010123456789"));

        shutdown.trigger();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_malformed_datagram_gets_no_reply_and_loop_survives() {
        // Arrange
        let store = store_with_blacklist(&[]);
        let server = UdpServer::bind(loopback_config(), Arc::clone(&store)).unwrap();
        let server_addr = server.local_addr().unwrap();
        let shutdown = ShutdownSignal::new();
        let task = tokio::spawn(server.run(shutdown.clone()));
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        // Act: 0xAB holds two undefined nibbles
        let garbage = request(&client, server_addr, &[0xAB, 0xCD]).await;
        let valid = request(&client, server_addr, &encode_imsi("12345").unwrap()).await;

        // Assert
        assert_eq!(garbage, None);
        assert_eq!(valid.as_deref(), Some("created"));
        assert_eq!(store.active_count(), 1);

        shutdown.trigger();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_burst_of_datagrams_is_fully_drained() {
        // Arrange
        const BURST: usize = 50;
        let store = store_with_blacklist(&[]);
        let server = UdpServer::bind(loopback_config(), Arc::clone(&store)).unwrap();
        let server_addr = server.local_addr().unwrap();
        let shutdown = ShutdownSignal::new();
        let task = tokio::spawn(server.run(shutdown.clone()));
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        // Act: queue every request before reading any reply
        for i in 0..BURST {
            let packed = encode_imsi(&format!("00101{i:010}")).unwrap();
            client.send_to(&packed, server_addr).await.unwrap();
        }
        let mut replies = Vec::new();
        let mut buf = [0u8; 64];
        while replies.len() < BURST {
            match tokio::time::timeout(Duration::from_secs(1), client.recv_from(&mut buf)).await {
                Ok(Ok((n, _))) => replies.push(String::from_utf8_lossy(&buf[..n]).into_owned()),
                _ => break,
            }
        }

        // Assert
        assert_eq!(replies.len(), BURST);
        assert!(replies.iter().all(|r| r == "created"));
        assert_eq!(store.active_count(), BURST);

        shutdown.trigger();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_empty_datagram_is_ignored_without_reply() {
        // Arrange
        let store = store_with_blacklist(&[]);
        let server = UdpServer::bind(loopback_config(), Arc::clone(&store)).unwrap();
        let server_addr = server.local_addr().unwrap();
        let shutdown = ShutdownSignal::new();
        let task = tokio::spawn(server.run(shutdown.clone()));
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        // Act
        let empty = request(&client, server_addr, &[]).await;
        let valid = request(&client, server_addr, &encode_imsi("12345").unwrap()).await;

        // Assert
        assert_eq!(empty, None);
        assert_eq!(valid.as_deref(), Some("created"));
        assert_eq!(store.active_count(), 1);

        shutdown.trigger();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_datagram_filling_buffer_is_still_processed() {
        // Arrange: 512 bytes of 0x11 decode to 1024 ones
        let store = store_with_blacklist(&[]);
        let mut config = loopback_config();
        config.buffer_size = 512;
        let server = UdpServer::bind(config, Arc::clone(&store)).unwrap();
        let server_addr = server.local_addr().unwrap();
        let shutdown = ShutdownSignal::new();
        let task = tokio::spawn(server.run(shutdown.clone()));
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        // Act
        let reply = request(&client, server_addr, &[0x11; 512]).await;

        // Assert
        assert_eq!(reply.as_deref(), Some("created"));
        assert!(store.is_active(&"1".repeat(1024)));

        shutdown.trigger();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_run_returns_promptly_after_trigger() {
        // Arrange
        let server = UdpServer::bind(loopback_config(), store_with_blacklist(&[])).unwrap();
        let shutdown = ShutdownSignal::new();
        let task = tokio::spawn(server.run(shutdown.clone()));

        // Act
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.trigger();

        // Assert
        let joined = tokio::time::timeout(Duration::from_secs(1), task).await;
        assert!(matches!(joined, Ok(Ok(Ok(())))));
    }

    #[tokio::test]
    async fn test_run_with_pre_triggered_signal_exits_immediately() {
        let server = UdpServer::bind(loopback_config(), store_with_blacklist(&[])).unwrap();
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let result = tokio::time::timeout(Duration::from_millis(200), server.run(shutdown)).await;

        assert!(matches!(result, Ok(Ok(()))));
    }
}

//! Transport layer
//!
//! A byte stream over a plain TCP socket that can be upgraded to TLS in place
//! once it is open (directly to the target, or through a SOCKS tunnel).
//!
//! `send` only resolves once the written bytes have been flushed out of every
//! user-space buffer into the socket. The client relies on that drain signal
//! to pace its body chunks.

mod tcp;

#[cfg(feature = "tls")]
mod tls;

#[cfg(test)]
pub(crate) mod mock;

pub use tcp::TcpTransport;

#[cfg(feature = "tls")]
pub use tls::build_tls_config;

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Transport layer errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Connection closed")]
    Closed,

    #[error("Timeout")]
    Timeout,

    #[error("Not connected")]
    NotConnected,
}

/// Trait for transport implementations
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to a remote `host:port` endpoint, dropping any previous stream
    async fn connect(&mut self, addr: &str) -> Result<(), TransportError>;

    /// Write all of `data` and wait until it has drained into the socket
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Receive whatever is available. End of stream is `TransportError::Closed`.
    async fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Receive exactly `buf.len()` bytes
    async fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError>;

    /// Run a client-side TLS handshake over the already open stream
    async fn upgrade_tls(&mut self, server_name: &str) -> Result<(), TransportError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Check if connected
    fn is_connected(&self) -> bool;
}

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// TCP connect timeout, `None` leaves it to the operating system
    pub connect_timeout: Option<Duration>,
    /// Disable Nagle so every chunk leaves as its own segment
    pub nodelay: bool,
    /// Accept any server certificate during the TLS upgrade
    pub insecure: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: None,
            nodelay: true,
            insecure: false,
        }
    }
}

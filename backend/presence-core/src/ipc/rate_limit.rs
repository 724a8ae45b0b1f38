//! Local throttle on accepted activity updates.

use std::time::Duration;

use tokio::time::Instant;

/// Refuses sends sooner than `min_interval` after the last successful one.
#[derive(Debug, Clone)]
pub struct RateLimitGuard {
    min_interval: Duration,
    last_success: Option<Instant>,
}

impl RateLimitGuard {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_success: None,
        }
    }

    pub fn permits(&self, now: Instant) -> bool {
        self.remaining(now).is_zero()
    }

    /// Time left before a send is allowed again.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_success {
            Some(last) => (last + self.min_interval).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    pub fn record_success(&mut self, at: Instant) {
        self.last_success = Some(at);
    }
}

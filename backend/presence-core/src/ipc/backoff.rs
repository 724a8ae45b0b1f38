//! Reconnection delay schedule.

use std::fmt;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;

const INITIAL_DELAY: Duration = Duration::from_secs(2);
const MAX_DELAY: Duration = Duration::from_secs(60);
const MULTIPLIER: f64 = 2.0;

/// Consecutive-failure counter producing 2, 4, 8, 16, 32, then 60 seconds.
///
/// Jitter is disabled so the schedule is exact; [`reset`](Self::reset) after
/// a successful handshake starts over at 2 seconds.
pub struct BackoffCounter {
    schedule: ExponentialBackoff,
    attempts: u32,
}

impl BackoffCounter {
    pub fn new() -> Self {
        Self {
            schedule: ExponentialBackoff {
                initial_interval: INITIAL_DELAY,
                current_interval: INITIAL_DELAY,
                randomization_factor: 0.0,
                multiplier: MULTIPLIER,
                max_interval: MAX_DELAY,
                max_elapsed_time: None,
                ..Default::default()
            },
            attempts: 0,
        }
    }

    /// Record one failed attempt and return how long to wait before the next.
    pub fn next_delay(&mut self) -> Duration {
        self.attempts = self.attempts.saturating_add(1);
        let delay = self.schedule.next_backoff().unwrap_or(MAX_DELAY);
        // Whole seconds only; the library adds sub-nanosecond noise even without jitter.
        Duration::from_secs(delay.as_secs()).min(MAX_DELAY)
    }

    /// Failed attempts since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset(&mut self) {
        self.schedule.reset();
        self.attempts = 0;
    }
}

impl fmt::Debug for BackoffCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackoffCounter")
            .field("attempts", &self.attempts)
            .field("current_interval", &self.schedule.current_interval)
            .finish()
    }
}

impl Default for BackoffCounter {
    fn default() -> Self {
        Self::new()
    }
}

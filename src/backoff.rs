//! Exponential backoff schedule for the readiness poll.
//!
//! The delay doubles (or grows by the configured factor) on each retry,
//! plus a bounded jitter so a fleet of clients does not poll in lockstep.
//! The schedule is finite: once the retry budget is spent the caller must
//! treat the condition as terminal.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Upper bound on the per-delay jitter, in milliseconds.
pub const JITTER_WINDOW_MS: u64 = 100;

/// A bounded exponential backoff policy.
#[derive(Debug, Clone)]
pub struct Backoff {
    /// Delay before the second attempt.
    pub initial: Duration,
    /// Maximum number of attempts.
    pub retries: u32,
    /// Multiplier applied to the delay after each attempt.
    pub factor: u32,
}

impl Backoff {
    /// Create a backoff policy.
    pub fn new(initial: Duration, retries: u32, factor: u32) -> Self {
        Self {
            initial,
            retries,
            factor,
        }
    }

    /// Iterator over the delay to sleep after each failed attempt.
    /// Yields exactly `retries` values.
    pub fn delays(&self) -> Delays {
        Delays {
            base: self.initial,
            remaining: self.retries,
            factor: self.factor,
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            retries: 10,
            factor: 2,
        }
    }
}

/// Iterator form of a [`Backoff`] schedule.
#[derive(Debug)]
pub struct Delays {
    base: Duration,
    remaining: u32,
    factor: u32,
}

impl Iterator for Delays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let delay = self.base + jitter();
        self.base *= self.factor;
        Some(delay)
    }
}

/// Time-derived jitter below [`JITTER_WINDOW_MS`].
fn jitter() -> Duration {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    Duration::from_millis(nanos.wrapping_mul(0x517cc1b727220a95) % JITTER_WINDOW_MS)
}

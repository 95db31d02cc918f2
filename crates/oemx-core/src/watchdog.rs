//! Communication watchdog
//!
//! Fires when no valid sample arrives within the configured interval.

use std::time::{Duration, Instant};

/// Countdown that overflows `top` after the last reset.
///
/// Once overflowed it stays overflowed until the next reset.
#[derive(Debug, Clone)]
pub struct Watchdog {
    top: Duration,
    started: Instant,
    tripped: bool,
}

impl Watchdog {
    /// Watchdog counting from now
    pub fn new(top: Duration) -> Self {
        Self {
            top,
            started: Instant::now(),
            tripped: false,
        }
    }

    /// Configured interval
    pub fn top(&self) -> Duration {
        self.top
    }

    /// Change the interval and restart the countdown
    pub fn set_top(&mut self, top: Duration) {
        self.top = top;
        self.reset();
    }

    /// Restart the countdown after a valid sample
    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    /// Restart the countdown at `now`
    pub fn reset_at(&mut self, now: Instant) {
        self.started = now;
        self.tripped = false;
    }

    /// Whether `top` has elapsed since the last reset
    pub fn overflow(&mut self) -> bool {
        self.overflow_at(Instant::now())
    }

    /// Overflow check against an explicit timestamp
    pub fn overflow_at(&mut self, now: Instant) -> bool {
        if !self.tripped && now.saturating_duration_since(self.started) >= self.top {
            self.tripped = true;
        }
        self.tripped
    }
}

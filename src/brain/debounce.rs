//! Non-blocking button debounce

use std::time::{Duration, Instant};

/// Accepts a press, then ignores presses for `guard`
#[derive(Debug, Clone)]
pub struct Debouncer {
    guard: Duration,
    last_accepted: Option<Instant>,
}

impl Debouncer {
    pub fn new(guard: Duration) -> Self {
        Self {
            guard,
            last_accepted: None,
        }
    }

    /// Returns true if a press seen at `now` should be acted on
    pub fn accept(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) < self.guard {
                return false;
            }
        }
        self.last_accepted = Some(now);
        true
    }
}

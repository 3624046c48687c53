//! Simulated operator buttons

use crate::core::driver::ButtonInput;
use crate::error::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// How long a scripted press keeps the button down
pub const PRESS_HOLD: Duration = Duration::from_millis(150);

/// Button replaying presses at fixed offsets from its first poll.
///
/// The control loop polls only after calibration, so offsets count from
/// when the loop starts reading the button.
pub struct ScriptedButton {
    start: Option<Instant>,
    presses: Vec<Duration>,
}

impl ScriptedButton {
    pub fn new(press_at_ms: &[u64]) -> Self {
        Self {
            start: None,
            presses: press_at_ms.iter().copied().map(Duration::from_millis).collect(),
        }
    }
}

impl ButtonInput for ScriptedButton {
    fn is_pressed(&mut self) -> Result<bool> {
        let elapsed = self.start.get_or_insert_with(Instant::now).elapsed();
        Ok(self
            .presses
            .iter()
            .any(|&at| elapsed >= at && elapsed < at + PRESS_HOLD))
    }
}

/// Momentary button pressed from another thread.
///
/// A press is reported by the next poll only.
#[derive(Debug, Clone, Default)]
pub struct ManualButton {
    pending: Arc<AtomicBool>,
}

impl ManualButton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self) {
        self.pending.store(true, Ordering::Release);
    }
}

impl ButtonInput for ManualButton {
    fn is_pressed(&mut self) -> Result<bool> {
        Ok(self.pending.swap(false, Ordering::AcqRel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_scripted_press_window() {
        let mut button = ScriptedButton::new(&[30]);
        assert!(!button.is_pressed().unwrap());
        thread::sleep(Duration::from_millis(60));
        assert!(button.is_pressed().unwrap());
        thread::sleep(PRESS_HOLD);
        assert!(!button.is_pressed().unwrap());
    }

    #[test]
    fn test_scripted_clock_starts_at_first_poll() {
        let mut button = ScriptedButton::new(&[30]);
        // Idle time before the first poll does not consume the script
        thread::sleep(Duration::from_millis(250));
        assert!(!button.is_pressed().unwrap());
        thread::sleep(Duration::from_millis(60));
        assert!(button.is_pressed().unwrap());
    }

    #[test]
    fn test_manual_press_is_momentary() {
        let handle = ManualButton::new();
        let mut button = handle.clone();
        assert!(!button.is_pressed().unwrap());
        handle.press();
        assert!(button.is_pressed().unwrap());
        assert!(!button.is_pressed().unwrap());
    }
}

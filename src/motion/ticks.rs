//! Shared ticks-per-wheel-rotation cell

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Encoder ticks per full wheel rotation.
///
/// Written by the feedback thread, read by the control loop. Zero means the
/// value has not been reported yet.
#[derive(Debug, Clone, Default)]
pub struct TicksPerRotation(Arc<AtomicU32>);

impl TicksPerRotation {
    /// Cell holding the unknown sentinel
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(ticks: u32) -> Self {
        Self(Arc::new(AtomicU32::new(ticks)))
    }

    #[inline]
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, ticks: u32) {
        self.0.store(ticks, Ordering::Release);
    }

    /// True until the motor side reports a value
    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.get() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unknown() {
        let ticks = TicksPerRotation::new();
        assert!(ticks.is_unknown());
        assert_eq!(ticks.get(), 0);
    }

    #[test]
    fn test_clones_share_value() {
        let ticks = TicksPerRotation::new();
        let writer = ticks.clone();
        writer.set(360);
        assert_eq!(ticks.get(), 360);
        assert!(!ticks.is_unknown());
    }
}

//! Frame similarity metric
//!
//! Sums the absolute per-channel RGB difference over every pixel, normalizes
//! by the largest possible total (`width * height * 3 * 255`) and reports
//! `1.0 - normalized`:
//!
//! | Frames | Score |
//! |--------|-------|
//! | identical | 1.0 |
//! | every channel differs by 255 (black vs white) | 0.0 |
//!
//! The score is symmetric in its arguments.

use crate::core::types::{CHANNELS, Frame};
use crate::error::{Error, Result};

/// Largest value a single channel sample can take
const MAX_CHANNEL_VALUE: u64 = 255;

/// Similarity of two equally sized frames, in [0, 1].
///
/// Frames of different dimensions are a usage error and return
/// [`Error::DimensionMismatch`] rather than a score.
pub fn frame_diff(a: &Frame, b: &Frame) -> Result<f64> {
    if a.dimensions() != b.dimensions() {
        return Err(Error::DimensionMismatch {
            left: a.dimensions(),
            right: b.dimensions(),
        });
    }

    let samples = a.pixels().len() as u64;
    if samples == 0 {
        return Ok(1.0);
    }

    // u64 accumulator: a 4K frame maxes out around 6.3e9
    let total: u64 = a
        .pixels()
        .iter()
        .zip(b.pixels())
        .map(|(&x, &y)| u64::from(x.abs_diff(y)))
        .sum();

    debug_assert_eq!(samples % CHANNELS as u64, 0);
    let normalized = total as f64 / (samples * MAX_CHANNEL_VALUE) as f64;
    Ok(1.0 - normalized)
}

//! Self-calibrating rotation timing
//!
//! Measures how long the wheels must spin for the chassis to complete one
//! full turn. Each attempt captures a root frame, starts spinning, and
//! samples frames until one looks enough like the root view again:
//!
//! ```text
//! stop ─▶ root frame ─▶ spin ─▶ settle ─▶ sample ──score > level──▶ stop, done
//!                                           ▲  │
//!                                           └──┘ elapsed < max window
//! ```
//!
//! Attempts start at similarity level 1.0 and relax by `threshold_step`
//! until the level reaches 0.0. When every attempt fails the configured
//! fallback duration is used.

use crate::config::CalibrationConfig;
use crate::core::driver::Camera;
use crate::core::shutdown::Shutdown;
use crate::core::types::Frame;
use crate::error::{Error, Result};
use crate::motion::MotionProtocol;
use crate::vision::frame_diff;
use std::time::{Duration, Instant};

/// Upper bound on attempts regardless of step size
pub const MAX_ATTEMPTS: usize = 11;

/// Levels below this count as zero
const LEVEL_EPSILON: f64 = 1e-9;

/// Similarity levels tried in order: 1.0, 1.0 - step, ... while above 0.0
pub fn threshold_levels(step: f64) -> Vec<f64> {
    if !(step > 0.0) {
        return vec![1.0];
    }
    (0..MAX_ATTEMPTS)
        .map(|i| 1.0 - i as f64 * step)
        .take_while(|level| *level > LEVEL_EPSILON)
        .collect()
}

/// State of one calibration trial
struct CalibrationAttempt {
    threshold_level: f64,
    root_frame: Frame,
    start: Instant,
}

/// Rotation calibrator
pub struct RotationCalibrator {
    config: CalibrationConfig,
}

impl RotationCalibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        Self { config }
    }

    /// Measure the full-turn duration.
    ///
    /// Returns `(duration, true)` on success and `(fallback, false)` when all
    /// levels failed or shutdown interrupted the run. The duration is always
    /// positive.
    pub fn calibrate_rotation(
        &self,
        motion: &mut MotionProtocol,
        camera: &mut dyn Camera,
        shutdown: &Shutdown,
    ) -> (Duration, bool) {
        let fallback = self.fallback();

        for level in threshold_levels(self.config.threshold_step) {
            match self.calibrate_with_level(motion, camera, shutdown, level) {
                Ok(duration) => {
                    log::info!(
                        "Rotation calibrated at level {:.2}: {} ms per turn",
                        level,
                        duration.as_millis()
                    );
                    return (duration.max(Duration::from_millis(1)), true);
                }
                Err(Error::Cancelled) => {
                    log::warn!("Rotation calibration cancelled, using fallback");
                    motion.stop();
                    return (fallback, false);
                }
                Err(e) => {
                    log::debug!("Calibration at level {:.2} failed: {}", level, e);
                }
            }
        }

        log::warn!(
            "{}, using fallback of {} ms",
            Error::CalibrationExhausted,
            fallback.as_millis()
        );
        (fallback, false)
    }

    /// Run one attempt at `level`.
    ///
    /// Fails with [`Error::FrameTimeout`] when a frame doesn't arrive or the
    /// view doesn't return within the maximum window, and with
    /// [`Error::Cancelled`] on shutdown. Wheels are stopped on every exit path
    /// after the spin started.
    pub fn calibrate_with_level(
        &self,
        motion: &mut MotionProtocol,
        camera: &mut dyn Camera,
        shutdown: &Shutdown,
        level: f64,
    ) -> Result<Duration> {
        motion.stop();

        let root_frame = camera
            .grab_frame_with_timeout(self.config.root_frame_timeout())
            .ok_or(Error::FrameTimeout)?;

        let attempt = CalibrationAttempt {
            threshold_level: level,
            root_frame,
            start: Instant::now(),
        };
        motion.spin();

        let result = self.sample_until_match(&attempt, camera, shutdown);
        motion.stop();
        result
    }

    fn sample_until_match(
        &self,
        attempt: &CalibrationAttempt,
        camera: &mut dyn Camera,
        shutdown: &Shutdown,
    ) -> Result<Duration> {
        // A sample taken right after the spin starts would match the root view
        if !shutdown.sleep(self.config.settle()) {
            return Err(Error::Cancelled);
        }

        loop {
            shutdown.check()?;

            let sample = camera
                .grab_frame_with_timeout(self.config.sample_timeout())
                .ok_or(Error::FrameTimeout)?;
            let score = frame_diff(&attempt.root_frame, &sample)?;
            let elapsed = attempt.start.elapsed();
            log::trace!(
                "Calibration sample at {} ms: score {:.4} (level {:.2})",
                elapsed.as_millis(),
                score,
                attempt.threshold_level
            );

            if score > attempt.threshold_level {
                return Ok(elapsed);
            }
            if elapsed > self.config.max_window() {
                return Err(Error::FrameTimeout);
            }
        }
    }

    fn fallback(&self) -> Duration {
        self.config
            .fallback_rotation()
            .max(Duration::from_millis(1))
    }
}

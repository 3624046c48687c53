//! Simulated forward camera

use super::noise::NoiseGenerator;
use super::world::SimWorld;
use crate::core::driver::Camera;
use crate::core::types::Frame;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Camera rendering the simulated scene at a fixed frame rate
pub struct SimCamera {
    world: Arc<Mutex<SimWorld>>,
    noise: NoiseGenerator,
    noise_stddev: f64,
    frame_interval: Duration,
    next_frame: Instant,
}

impl SimCamera {
    pub fn new(
        world: Arc<Mutex<SimWorld>>,
        frame_rate_hz: f64,
        noise_stddev: f64,
        seed: u64,
    ) -> Self {
        let frame_interval = if frame_rate_hz > 0.0 {
            Duration::from_secs_f64(1.0 / frame_rate_hz)
        } else {
            Duration::ZERO
        };
        Self {
            world,
            noise: NoiseGenerator::new(seed),
            noise_stddev,
            frame_interval,
            next_frame: Instant::now(),
        }
    }
}

impl Camera for SimCamera {
    fn grab_frame_with_timeout(&mut self, timeout: Duration) -> Option<Frame> {
        let now = Instant::now();
        if self.next_frame > now {
            let wait = self.next_frame - now;
            if wait > timeout {
                thread::sleep(timeout);
                return None;
            }
            thread::sleep(wait);
        }
        self.next_frame = self.next_frame.max(now) + self.frame_interval;

        let frame = self.world.lock().render();
        if self.noise_stddev == 0.0 {
            return Some(frame);
        }

        let mut pixels = frame.pixels().to_vec();
        self.noise.perturb_samples(&mut pixels, self.noise_stddev);
        Frame::from_rgb(frame.width(), frame.height(), pixels)
    }
}

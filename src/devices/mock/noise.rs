//! Seeded noise for simulated sensor data

use rand::prelude::*;
use rand::rngs::SmallRng;
use rand_distr::StandardNormal;

/// Gaussian noise source, reproducible when seeded
#[derive(Clone)]
pub struct NoiseGenerator {
    rng: SmallRng,
}

impl NoiseGenerator {
    /// Seed 0 draws from entropy, any other value is reproducible
    pub fn new(seed: u64) -> Self {
        let rng = if seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(seed)
        };
        Self { rng }
    }

    #[inline]
    pub fn gaussian(&mut self, stddev: f64) -> f64 {
        if stddev == 0.0 {
            return 0.0;
        }
        let n: f64 = self.rng.sample(StandardNormal);
        n * stddev
    }

    /// Perturb every sample of an 8-bit buffer in place
    pub fn perturb_samples(&mut self, samples: &mut [u8], stddev: f64) {
        if stddev == 0.0 {
            return;
        }
        for sample in samples.iter_mut() {
            let noisy = f64::from(*sample) + self.gaussian(stddev);
            *sample = noisy.round().clamp(0.0, 255.0) as u8;
        }
    }
}

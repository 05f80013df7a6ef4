//! Bounded uniform reservoir sampling for raw score retention
//!
//! Welch's t-test needs raw samples, not just moments, so the monitor retains a bounded
//! uniform sample of the observed stream alongside the exact running moments.

use rand::Rng;

/// Capacity of a reservoir: the number of raw samples retained regardless of stream length.
pub const CAPACITY: usize = 10_000;

/// A capacity-bounded uniform sample of an unbounded stream of `f64` observations.
#[derive(Debug, Clone, Default)]
pub struct Reservoir {
    samples: Vec<f64>,
    seen: u64,
}

impl Reservoir {
    pub fn new() -> Self {
        Self { samples: Vec::new(), seen: 0 }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Add one observation using reservoir sampling with the injected RNG, so tests can
    /// drive deterministic bucket decisions.
    pub fn add_with_rng(&mut self, x: f64, rng: &mut impl Rng) {
        self.seen += 1;
        if self.samples.len() < CAPACITY {
            self.samples.push(x);
            return;
        }
        let j = rng.gen_range(0..self.seen);
        if (j as usize) < CAPACITY {
            self.samples[j as usize] = x;
        }
    }

    pub fn add(&mut self, x: f64) {
        self.add_with_rng(x, &mut rand::thread_rng());
    }
}

//! Per-(version, scorer) running statistics owned by the score monitor

use crate::reservoir::Reservoir;
use crate::welford::Welford;
use braincanary_types::StatSummary;
use rand::Rng;

/// Exact running moments plus a bounded uniform sample of the same stream.
///
/// The moments are used for snapshot summaries; the reservoir is consulted only when a
/// gate needs raw samples for Welch's t-test.
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    moments: Welford,
    reservoir: Reservoir,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_with_rng(&mut self, x: f64, rng: &mut impl Rng) {
        self.moments.add(x);
        self.reservoir.add_with_rng(x, rng);
    }

    pub fn add(&mut self, x: f64) {
        self.moments.add(x);
        self.reservoir.add(x);
    }

    pub fn n(&self) -> u64 {
        self.moments.n()
    }

    pub fn summary(&self) -> StatSummary {
        StatSummary { mean: self.moments.mean(), std: self.moments.std_dev(), n: self.moments.n() }
    }

    pub fn samples(&self) -> &[f64] {
        self.reservoir.samples()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_and_resets() {
        let mut stats = RunningStats::new();
        stats.add(1.0);
        stats.add(2.0);
        stats.add(3.0);
        assert_eq!(stats.n(), 3);
        assert_eq!(stats.summary().mean, 2.0);
        assert_eq!(stats.samples().len(), 3);

        stats.reset();
        assert_eq!(stats.n(), 0);
        assert!(stats.samples().is_empty());
    }
}

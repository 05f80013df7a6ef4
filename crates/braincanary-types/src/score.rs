//! Wire-level score data contracts exchanged between the monitor, controller, and Store
//!
//! The raw moments and reservoirs that produce these summaries live in `braincanary-stats`;
//! this module only carries the already-summarized numbers across component boundaries.

use crate::config::Comparison;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Summary statistics for one variant's scores on one scorer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatSummary {
    pub mean: f64,
    pub std: f64,
    pub n: u64,
}

impl StatSummary {
    pub fn empty() -> Self {
        Self { mean: 0.0, std: 0.0, n: 0 }
    }
}

/// Baseline and canary summaries for a single scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariantStats {
    pub baseline: StatSummary,
    pub canary: StatSummary,
}

/// A monitor tick's output: per-scorer baseline/canary summaries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSnapshot(pub HashMap<String, VariantStats>);

impl ScoreSnapshot {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn insert(&mut self, scorer: impl Into<String>, stats: VariantStats) {
        self.0.insert(scorer.into(), stats);
    }

    pub fn get(&self, scorer: &str) -> Option<&VariantStats> {
        self.0.get(scorer)
    }
}

/// Outcome of evaluating one gate against the current score snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    Passing,
    Failing,
    InsufficientData,
}

/// The evaluated result of a single gate, carrying enough detail to explain the verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResult {
    pub scorer: String,
    pub status: GateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_value: Option<f64>,
    pub baseline_mean: f64,
    pub canary_mean: f64,
    pub baseline_n: u64,
    pub canary_n: u64,
    pub absolute_check: bool,
    pub comparison_check: bool,
    pub confidence_required: f64,
    pub comparison: Comparison,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut snap = ScoreSnapshot::new();
        snap.insert(
            "quality",
            VariantStats {
                baseline: StatSummary { mean: 0.9, std: 0.01, n: 10 },
                canary: StatSummary { mean: 0.88, std: 0.02, n: 10 },
            },
        );
        let json = serde_json::to_string(&snap).unwrap();
        let back: ScoreSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snap, back);
    }
}

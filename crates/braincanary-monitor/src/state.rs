//! Mutable monitor state: watermarks, counters, and per-(version, scorer) running stats

use braincanary_stats::RunningStats;
use braincanary_types::{ScoreSnapshot, VariantStats};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Everything the monitor owns that resets on stage entry.
pub struct MonitorState {
    pub watermark_baseline: DateTime<Utc>,
    pub watermark_canary: DateTime<Utc>,
    pub canary_total: u64,
    pub canary_errors: u64,
    baseline_stats: HashMap<String, RunningStats>,
    canary_stats: HashMap<String, RunningStats>,
}

impl MonitorState {
    pub fn new(stage_start: DateTime<Utc>, scorer_names: &[String]) -> Self {
        Self {
            watermark_baseline: stage_start,
            watermark_canary: stage_start,
            canary_total: 0,
            canary_errors: 0,
            baseline_stats: scorer_names.iter().map(|s| (s.clone(), RunningStats::new())).collect(),
            canary_stats: scorer_names.iter().map(|s| (s.clone(), RunningStats::new())).collect(),
        }
    }

    pub fn reset(&mut self, stage_start: DateTime<Utc>) {
        let scorers: Vec<String> = self.baseline_stats.keys().cloned().collect();
        *self = Self::new(stage_start, &scorers);
    }

    pub fn baseline_stats_mut(&mut self, scorer: &str) -> Option<&mut RunningStats> {
        self.baseline_stats.get_mut(scorer)
    }

    pub fn canary_stats_mut(&mut self, scorer: &str) -> Option<&mut RunningStats> {
        self.canary_stats.get_mut(scorer)
    }

    pub fn baseline_stats(&self, scorer: &str) -> Option<&RunningStats> {
        self.baseline_stats.get(scorer)
    }

    pub fn canary_stats(&self, scorer: &str) -> Option<&RunningStats> {
        self.canary_stats.get(scorer)
    }

    pub fn canary_error_rate(&self) -> f64 {
        if self.canary_total == 0 {
            0.0
        } else {
            self.canary_errors as f64 / self.canary_total as f64
        }
    }

    pub fn score_snapshot(&self) -> ScoreSnapshot {
        let mut snapshot = ScoreSnapshot::new();
        for scorer in self.baseline_stats.keys() {
            let baseline = self.baseline_stats.get(scorer).map(|s| s.summary()).unwrap_or_default();
            let canary = self.canary_stats.get(scorer).map(|s| s.summary()).unwrap_or_default();
            snapshot.insert(scorer.clone(), VariantStats { baseline, canary });
        }
        snapshot
    }
}

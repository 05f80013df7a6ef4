//! Append-only log record shapes

use braincanary_types::{DeploymentId, DeploymentState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the `state_transitions` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransitionRecord {
    pub id: String,
    pub deployment_id: DeploymentId,
    pub from_state: DeploymentState,
    pub to_state: DeploymentState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub ts: DateTime<Utc>,
}

/// One row of the `score_snapshots` table: a single scorer's baseline/canary summary at
/// a point in time, keyed by `(deployment_id, stage_index)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSnapshotRecord {
    pub id: String,
    pub deployment_id: DeploymentId,
    pub stage_index: usize,
    pub scorer: String,
    pub baseline_mean: f64,
    pub baseline_std: f64,
    pub baseline_n: u64,
    pub canary_mean: f64,
    pub canary_std: f64,
    pub canary_n: u64,
    pub ts: DateTime<Utc>,
}

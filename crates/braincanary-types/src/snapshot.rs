//! The controller's single source of truth for a deployment's rollout state

use crate::config::DeploymentConfig;
use crate::ids::DeploymentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a deployment. The allowed-transitions table lives at each
/// [`crate`](crate)-consuming call site's `commit_transition` precondition rather than
/// on this enum, since call sites legitimately differ on which sources are valid for a
/// given destination (e.g. `advance_stage`'s forced promote from PAUSED).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentState {
    Idle,
    Pending,
    Stage,
    Paused,
    RollingBack,
    RolledBack,
    Promoted,
}

impl DeploymentState {
    /// True if this state admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, DeploymentState::RolledBack | DeploymentState::Promoted)
    }
}

/// The terminal outcome of a completed deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalState {
    Promoted,
    RolledBack,
}

/// The controller's single source of truth, persisted on every transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentSnapshot {
    pub id: DeploymentId,
    pub name: String,
    pub config: DeploymentConfig,
    pub state: DeploymentState,
    pub stage_index: usize,
    pub stage_entered_at: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_state: Option<FinalState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused_stage_index: Option<usize>,
    pub canary_weight: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DeploymentSnapshot {
    /// Build the initial snapshot for a newly started deployment.
    ///
    /// Caller is expected to have already validated `config`.
    pub fn start(config: DeploymentConfig, now: DateTime<Utc>) -> Self {
        let first_weight = config.stages[0].weight;
        Self {
            id: DeploymentId::generate(),
            name: config.name.clone(),
            config,
            state: DeploymentState::Pending,
            stage_index: 0,
            stage_entered_at: now,
            started_at: now,
            completed_at: None,
            final_state: None,
            paused_stage_index: None,
            canary_weight: first_weight,
            reason: None,
        }
    }

    /// True if this snapshot should be excluded from "active deployment" queries.
    pub fn is_active(&self) -> bool {
        !matches!(self.state, DeploymentState::Idle) && !self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_admit_no_transitions() {
        assert!(DeploymentState::Promoted.is_terminal());
        assert!(DeploymentState::RolledBack.is_terminal());
        assert!(!DeploymentState::Stage.is_terminal());
    }
}

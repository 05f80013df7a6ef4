//! Declarative configuration for a rollout deployment
//!
//! The core receives an already-validated [`DeploymentConfig`]; [`DeploymentConfig::validate`]
//! re-checks the invariants the spec requires so the controller can refuse to start a
//! deployment that would never be able to reach a terminal state.

use crate::duration::DurationSpec;
use serde::{Deserialize, Serialize};

/// A prompt/model bundle under evaluation (baseline or canary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// How a gate's statistical comparison is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Canary must not be statistically worse than baseline.
    NotWorseThanBaseline,
    /// Canary must be statistically better than baseline.
    BetterThanBaseline,
    /// Only the absolute threshold matters; no statistical test is run.
    AbsoluteOnly,
}

/// A quality assertion on a named scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gate {
    pub scorer: String,
    pub threshold: f64,
    pub comparison: Comparison,
    pub confidence: f64,
}

impl Gate {
    fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigValidationError::GateThresholdOutOfRange {
                scorer: self.scorer.clone(),
                threshold: self.threshold,
            });
        }
        if !(0.5..=0.999).contains(&self.confidence) {
            return Err(ConfigValidationError::GateConfidenceOutOfRange {
                scorer: self.scorer.clone(),
                confidence: self.confidence,
            });
        }
        Ok(())
    }
}

/// A step in the rollout with a target canary traffic share and gating criteria.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    /// Target canary traffic percentage, 1..=100.
    pub weight: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<DurationSpec>,
    pub min_samples: u32,
    #[serde(default)]
    pub gates: Vec<Gate>,
}

/// Rollback thresholds and cooldown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackConfig {
    pub on_score_drop: f64,
    pub on_error_rate: f64,
    /// Advisory only; the source exposes no observed effect on re-attempt behavior.
    pub cooldown: DurationSpec,
}

/// Query shaping knobs passed to the evaluation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub api_url: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_ms: u64,
    pub max_retries: u32,
}

/// Monitor polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub poll_interval: DurationSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticky_key: Option<String>,
    pub scorer_lag_grace: DurationSpec,
    pub query: QueryConfig,
}

/// Immutable configuration for the lifetime of a deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    pub name: String,
    pub project: String,
    pub baseline: Variant,
    pub canary: Variant,
    pub stages: Vec<Stage>,
    pub rollback: RollbackConfig,
    pub monitor: MonitorConfig,
}

impl DeploymentConfig {
    /// Re-validate the structural invariants this spec requires of a config.
    ///
    /// The core never mutates a config; this only guards against a caller handing
    /// in something that would desync the state machine (e.g. a non-monotone
    /// weight sequence that can never legally reach `PROMOTED`).
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.name.is_empty() {
            return Err(ConfigValidationError::EmptyName);
        }
        if self.stages.is_empty() {
            return Err(ConfigValidationError::NoStages);
        }

        let mut prev_weight = 0u32;
        for (idx, stage) in self.stages.iter().enumerate() {
            if !(1..=100).contains(&stage.weight) {
                return Err(ConfigValidationError::StageWeightOutOfRange {
                    index: idx,
                    weight: stage.weight,
                });
            }
            if stage.weight <= prev_weight {
                return Err(ConfigValidationError::WeightsNotIncreasing { index: idx });
            }
            prev_weight = stage.weight;
            if stage.min_samples < 1 {
                return Err(ConfigValidationError::MinSamplesZero { index: idx });
            }
            for gate in &stage.gates {
                gate.validate()?;
            }
        }

        let last = self.stages.last().expect("checked non-empty above");
        if last.weight != 100 {
            return Err(ConfigValidationError::FinalWeightNotHundred);
        }

        let has_non_final_gate = self.stages[..self.stages.len() - 1]
            .iter()
            .any(|s| !s.gates.is_empty());
        if self.stages.len() > 1 && !has_non_final_gate {
            return Err(ConfigValidationError::NoGatesBeforeFinalStage);
        }

        if !(0.0..=1.0).contains(&self.rollback.on_score_drop) {
            return Err(ConfigValidationError::RollbackThresholdOutOfRange(
                "on_score_drop",
            ));
        }
        if !(0.0..=1.0).contains(&self.rollback.on_error_rate) {
            return Err(ConfigValidationError::RollbackThresholdOutOfRange(
                "on_error_rate",
            ));
        }

        Ok(())
    }
}

/// Errors surfaced by [`DeploymentConfig::validate`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("deployment name cannot be empty")]
    EmptyName,
    #[error("deployment must define at least one stage")]
    NoStages,
    #[error("stage {index} weight {weight} out of range [1,100]")]
    StageWeightOutOfRange { index: usize, weight: u32 },
    #[error("stage {index} weight must be strictly greater than the previous stage's weight")]
    WeightsNotIncreasing { index: usize },
    #[error("stage {index} min_samples must be >= 1")]
    MinSamplesZero { index: usize },
    #[error("the final stage's weight must be 100")]
    FinalWeightNotHundred,
    #[error("at least one non-final stage must define at least one gate")]
    NoGatesBeforeFinalStage,
    #[error("gate for scorer '{scorer}' has threshold {threshold} out of range [0,1]")]
    GateThresholdOutOfRange { scorer: String, threshold: f64 },
    #[error("gate for scorer '{scorer}' has confidence {confidence} out of range [0.5,0.999]")]
    GateConfidenceOutOfRange { scorer: String, confidence: f64 },
    #[error("rollback threshold '{0}' out of range [0,1]")]
    RollbackThresholdOutOfRange(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn valid_config() -> DeploymentConfig {
        DeploymentConfig {
            name: "summarizer".into(),
            project: "proj-1".into(),
            baseline: Variant { model: "gpt".into(), prompt: None, system_prompt: None },
            canary: Variant { model: "gpt-new".into(), prompt: None, system_prompt: None },
            stages: vec![
                Stage {
                    weight: 5,
                    duration: Some(DurationSpec::new(Duration::from_millis(1))),
                    min_samples: 2,
                    gates: vec![Gate {
                        scorer: "Q".into(),
                        threshold: 0.5,
                        comparison: Comparison::NotWorseThanBaseline,
                        confidence: 0.95,
                    }],
                },
                Stage { weight: 100, duration: None, min_samples: 1, gates: vec![] },
            ],
            rollback: RollbackConfig {
                on_score_drop: 0.05,
                on_error_rate: 0.05,
                cooldown: DurationSpec::new(Duration::from_secs(60)),
            },
            monitor: MonitorConfig {
                poll_interval: DurationSpec::new(Duration::from_secs(30)),
                sticky_key: None,
                scorer_lag_grace: DurationSpec::new(Duration::from_secs(10)),
                query: QueryConfig {
                    api_url: "https://example.test".into(),
                    path: "/query".into(),
                    api_key: None,
                    timeout_ms: 5000,
                    max_retries: 3,
                },
            },
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn weights_must_strictly_increase() {
        let mut cfg = valid_config();
        cfg.stages[1].weight = 5;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigValidationError::WeightsNotIncreasing { .. })
        ));
    }

    #[test]
    fn final_weight_must_be_hundred() {
        let mut cfg = valid_config();
        cfg.stages.last_mut().unwrap().weight = 90;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigValidationError::FinalWeightNotHundred)
        ));
    }

    #[test]
    fn needs_a_gate_before_final_stage() {
        let mut cfg = valid_config();
        cfg.stages[0].gates.clear();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigValidationError::NoGatesBeforeFinalStage)
        ));
    }
}

//! Pure stage-decision logic: gate results + error rate -> what the controller should do next

use braincanary_monitor::ScoreMonitor;
use braincanary_stats::evaluate_gate;
use braincanary_types::{GateResult, GateStatus, NextAction, RollbackConfig, Stage};
use chrono::{DateTime, Duration as ChronoDuration, Utc};

/// Evaluate every gate configured for `stage` against the monitor's current raw samples.
pub async fn evaluate_gate_set(stage: &Stage, monitor: &ScoreMonitor) -> Vec<GateResult> {
    let mut results = Vec::with_capacity(stage.gates.len());
    for gate in &stage.gates {
        let (baseline, canary) = monitor.samples_for(&gate.scorer).await;
        results.push(evaluate_gate(gate, &baseline, &canary, stage.min_samples));
    }
    results
}

/// The threshold p-value below which a failing gate counts as strong statistical
/// evidence of regression, not just noise.
const STRONG_REGRESSION_P: f64 = 0.01;

/// The outcome of evaluating one stage's gates against the current score snapshot.
pub struct StageDecision {
    pub gates: Vec<GateResult>,
    pub next_action: NextAction,
    pub time_remaining_ms: i64,
    pub rollback_reason: Option<String>,
}

/// Pick a rollback reason from a set of evaluated gates, in priority order:
/// strong statistical regression, then absolute score drop, then error rate.
pub fn evaluate_rollback(gates: &[GateResult], err_rate: f64, rollback: &RollbackConfig) -> Option<String> {
    if let Some(g) = gates
        .iter()
        .find(|g| g.status == GateStatus::Failing && g.p_value.is_some_and(|p| p < STRONG_REGRESSION_P))
    {
        return Some(format!("score_regression:{}", g.scorer));
    }
    if let Some(g) = gates.iter().find(|g| g.baseline_mean - g.canary_mean > rollback.on_score_drop) {
        return Some(format!("absolute_drop:{}", g.scorer));
    }
    if err_rate > rollback.on_error_rate {
        return Some("error_rate_exceeded".to_string());
    }
    None
}

/// Decide what the controller should do after evaluating a stage's gates.
pub fn decide_stage(
    gates: Vec<GateResult>,
    err_rate: f64,
    stage: &Stage,
    stage_entered_at: DateTime<Utc>,
    now: DateTime<Utc>,
    rollback: &RollbackConfig,
) -> StageDecision {
    let stage_duration = stage.duration.map(|d| ChronoDuration::from_std(d.as_duration()).unwrap_or_default());
    let elapsed = now - stage_entered_at;

    let duration_elapsed = match stage_duration {
        Some(d) => elapsed >= d,
        None => true,
    };
    let samples_reached = gates.iter().all(|g| g.canary_n >= stage.min_samples as u64);
    let all_passing = !gates.is_empty() && gates.iter().all(|g| g.status == GateStatus::Passing);
    let rollback_reason = evaluate_rollback(&gates, err_rate, rollback);

    let next_action = if rollback_reason.is_some() {
        NextAction::Rollback
    } else if all_passing && duration_elapsed && samples_reached {
        NextAction::AutoPromote
    } else {
        NextAction::Hold
    };

    let time_remaining_ms = match stage_duration {
        Some(d) => (d - elapsed).num_milliseconds().max(0),
        None => 0,
    };

    StageDecision { gates, next_action, time_remaining_ms, rollback_reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use braincanary_types::{Comparison, DurationSpec};
    use std::time::Duration;

    fn passing_gate() -> GateResult {
        GateResult {
            scorer: "quality".into(),
            status: GateStatus::Passing,
            p_value: Some(0.8),
            baseline_mean: 0.9,
            canary_mean: 0.9,
            baseline_n: 50,
            canary_n: 50,
            absolute_check: true,
            comparison_check: true,
            confidence_required: 0.95,
            comparison: Comparison::NotWorseThanBaseline,
        }
    }

    fn rollback_config() -> RollbackConfig {
        RollbackConfig { on_score_drop: 0.05, on_error_rate: 0.05, cooldown: DurationSpec::zero() }
    }

    #[test]
    fn strong_regression_outranks_absolute_drop() {
        let mut failing = passing_gate();
        failing.status = GateStatus::Failing;
        failing.p_value = Some(0.001);
        failing.baseline_mean = 0.9;
        failing.canary_mean = 0.5;
        let reason = evaluate_rollback(&[failing], 0.0, &rollback_config());
        assert_eq!(reason.as_deref(), Some("score_regression:quality"));
    }

    #[test]
    fn absolute_drop_outranks_error_rate_when_not_a_strong_regression() {
        // High-variance gate: status passes (or fails weakly, p >= 0.01) but the mean
        // gap alone exceeds on_score_drop, e.g. baseline 0.90 vs. canary 0.83.
        let mut gate = passing_gate();
        gate.status = GateStatus::Passing;
        gate.p_value = Some(0.2);
        gate.baseline_mean = 0.90;
        gate.canary_mean = 0.83;
        let reason = evaluate_rollback(&[gate], 0.01, &rollback_config());
        assert_eq!(reason.as_deref(), Some("absolute_drop:quality"));
    }

    #[test]
    fn error_rate_is_the_fallback_reason() {
        let reason = evaluate_rollback(&[passing_gate()], 0.2, &rollback_config());
        assert_eq!(reason.as_deref(), Some("error_rate_exceeded"));
    }

    #[test]
    fn all_passing_with_elapsed_duration_and_samples_promotes() {
        let stage = Stage {
            weight: 10,
            duration: Some(DurationSpec::new(Duration::from_millis(1))),
            min_samples: 1,
            gates: vec![],
        };
        let now = Utc::now();
        let entered = now - ChronoDuration::seconds(10);
        let decision = decide_stage(vec![passing_gate()], 0.0, &stage, entered, now, &rollback_config());
        assert_eq!(decision.next_action, NextAction::AutoPromote);
    }

    #[test]
    fn unelapsed_duration_holds_even_when_passing() {
        let stage = Stage {
            weight: 10,
            duration: Some(DurationSpec::new(Duration::from_secs(3600))),
            min_samples: 1,
            gates: vec![],
        };
        let now = Utc::now();
        let decision = decide_stage(vec![passing_gate()], 0.0, &stage, now, now, &rollback_config());
        assert_eq!(decision.next_action, NextAction::Hold);
        assert!(decision.time_remaining_ms > 0);
    }
}

//! Pure routing decision: snapshot + optional sticky key -> {baseline, canary}

use crate::hash::sticky_bucket;
use braincanary_types::{DeploymentSnapshot, DeploymentState};
use rand::Rng;

/// Which variant a single request was routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteVariant {
    Baseline,
    Canary,
}

/// The outcome of a single routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingDecision {
    pub variant: RouteVariant,
    pub canary_weight: u32,
    pub stage_index: usize,
}

impl RoutingDecision {
    fn baseline(canary_weight: u32, stage_index: usize) -> Self {
        Self { variant: RouteVariant::Baseline, canary_weight, stage_index }
    }
}

fn routable(state: DeploymentState) -> bool {
    matches!(state, DeploymentState::Pending | DeploymentState::Stage | DeploymentState::Paused)
}

/// Route one request given the controller's current snapshot.
///
/// `sticky_key`, when present, wins over `random_draw` — the same key always buckets the
/// same way. `random_draw` must be in `[0, 1)`; pass a fresh draw per request when no
/// sticky key is available.
pub fn route(
    snapshot: Option<&DeploymentSnapshot>,
    sticky_key: Option<&str>,
    random_draw: Option<f64>,
) -> RoutingDecision {
    let snapshot = match snapshot {
        Some(s) if routable(s.state) => s,
        Some(s) => return RoutingDecision::baseline(0, s.stage_index),
        None => return RoutingDecision::baseline(0, 0),
    };

    if snapshot.canary_weight == 0 {
        return RoutingDecision::baseline(snapshot.canary_weight, snapshot.stage_index);
    }

    let bucket = match sticky_key {
        Some(key) => sticky_bucket(key),
        None => (random_draw.unwrap_or_else(|| rand::thread_rng().gen_range(0.0..1.0)) * 100.0) as u32,
    };

    let variant = if bucket < snapshot.canary_weight { RouteVariant::Canary } else { RouteVariant::Baseline };
    RoutingDecision { variant, canary_weight: snapshot.canary_weight, stage_index: snapshot.stage_index }
}

#[cfg(test)]
mod tests {
    use super::*;
    use braincanary_types::{
        Comparison, DeploymentConfig, DeploymentId, Gate, MonitorConfig, QueryConfig, RollbackConfig, Stage,
        Variant,
    };
    use chrono::Utc;
    use std::time::Duration;

    fn snapshot_with(state: DeploymentState, canary_weight: u32) -> DeploymentSnapshot {
        let config = DeploymentConfig {
            name: "x".into(),
            project: "p".into(),
            baseline: Variant { model: "a".into(), prompt: None, system_prompt: None },
            canary: Variant { model: "b".into(), prompt: None, system_prompt: None },
            stages: vec![
                Stage {
                    weight: 25,
                    duration: None,
                    min_samples: 1,
                    gates: vec![Gate {
                        scorer: "q".into(),
                        threshold: 0.5,
                        comparison: Comparison::AbsoluteOnly,
                        confidence: 0.95,
                    }],
                },
                Stage { weight: 100, duration: None, min_samples: 1, gates: vec![] },
            ],
            rollback: RollbackConfig {
                on_score_drop: 0.05,
                on_error_rate: 0.05,
                cooldown: braincanary_types::DurationSpec::new(Duration::from_secs(1)),
            },
            monitor: MonitorConfig {
                poll_interval: braincanary_types::DurationSpec::new(Duration::from_secs(1)),
                sticky_key: None,
                scorer_lag_grace: braincanary_types::DurationSpec::zero(),
                query: QueryConfig {
                    api_url: "https://x".into(),
                    path: "/q".into(),
                    api_key: None,
                    timeout_ms: 1000,
                    max_retries: 1,
                },
            },
        };
        let now = Utc::now();
        DeploymentSnapshot {
            id: DeploymentId::generate(),
            name: "x".into(),
            config,
            state,
            stage_index: 0,
            stage_entered_at: now,
            started_at: now,
            completed_at: None,
            final_state: None,
            paused_stage_index: None,
            canary_weight,
            reason: None,
        }
    }

    #[test]
    fn no_snapshot_routes_baseline() {
        let decision = route(None, None, Some(0.1));
        assert_eq!(decision.variant, RouteVariant::Baseline);
        assert_eq!(decision.canary_weight, 0);
    }

    #[test]
    fn terminal_state_routes_baseline() {
        let snapshot = snapshot_with(DeploymentState::Promoted, 100);
        let decision = route(Some(&snapshot), None, Some(0.1));
        assert_eq!(decision.variant, RouteVariant::Baseline);
    }

    #[test]
    fn zero_weight_routes_baseline() {
        let snapshot = snapshot_with(DeploymentState::Stage, 0);
        let decision = route(Some(&snapshot), None, Some(0.01));
        assert_eq!(decision.variant, RouteVariant::Baseline);
    }

    #[test]
    fn sticky_key_is_reproducible() {
        let snapshot = snapshot_with(DeploymentState::Stage, 25);
        let first = route(Some(&snapshot), Some("u1"), None);
        let second = route(Some(&snapshot), Some("u1"), None);
        assert_eq!(first.variant, second.variant);
    }

    #[test]
    fn sticky_distribution_is_within_two_points_of_weight() {
        let snapshot = snapshot_with(DeploymentState::Stage, 25);
        let canary_count = (0..10_000)
            .filter(|i| route(Some(&snapshot), Some(&format!("user-{i}")), None).variant == RouteVariant::Canary)
            .count();
        let pct = canary_count as f64 / 10_000.0 * 100.0;
        assert!((pct - 25.0).abs() <= 2.0, "pct={pct}");
    }

    #[test]
    fn random_draw_respects_threshold() {
        let snapshot = snapshot_with(DeploymentState::Stage, 25);
        assert_eq!(route(Some(&snapshot), None, Some(0.1)).variant, RouteVariant::Canary);
        assert_eq!(route(Some(&snapshot), None, Some(0.5)).variant, RouteVariant::Baseline);
    }
}

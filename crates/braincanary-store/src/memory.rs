//! In-memory Store implementation for development and tests

use crate::error::StoreResult;
use crate::records::{ScoreSnapshotRecord, StateTransitionRecord};
use crate::traits::{EventStore, ScoreSnapshotStore, SnapshotStore, TransitionStore};
use async_trait::async_trait;
use braincanary_types::{DeploymentId, DeploymentSnapshot, DeploymentState, Event};
use dashmap::DashMap;

/// In-memory Store. Not durable across process restarts; suitable for tests and for a
/// single-host deployment that accepts losing history on crash.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    deployments: DashMap<DeploymentId, DeploymentSnapshot>,
    transitions: DashMap<DeploymentId, Vec<StateTransitionRecord>>,
    score_snapshots: DashMap<DeploymentId, Vec<ScoreSnapshotRecord>>,
    events: DashMap<DeploymentId, Vec<Event>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for InMemoryStore {
    async fn save_snapshot(&self, snapshot: &DeploymentSnapshot) -> StoreResult<()> {
        self.deployments.insert(snapshot.id.clone(), snapshot.clone());
        Ok(())
    }

    async fn get_snapshot(&self, id: &DeploymentId) -> StoreResult<Option<DeploymentSnapshot>> {
        Ok(self.deployments.get(id).map(|s| s.clone()))
    }

    async fn active_deployment(&self) -> StoreResult<Option<DeploymentSnapshot>> {
        Ok(self
            .deployments
            .iter()
            .filter(|s| !matches!(s.state, DeploymentState::Idle) && !s.state.is_terminal())
            .max_by_key(|s| s.started_at)
            .map(|s| s.clone()))
    }

    async fn history(&self, limit: usize) -> StoreResult<Vec<DeploymentSnapshot>> {
        let mut all: Vec<DeploymentSnapshot> = self.deployments.iter().map(|s| s.clone()).collect();
        all.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all.truncate(limit);
        Ok(all)
    }
}

#[async_trait]
impl TransitionStore for InMemoryStore {
    async fn append_transition(&self, record: StateTransitionRecord) -> StoreResult<()> {
        self.transitions.entry(record.deployment_id.clone()).or_default().push(record);
        Ok(())
    }
}

#[async_trait]
impl ScoreSnapshotStore for InMemoryStore {
    async fn append_score_snapshot(&self, record: ScoreSnapshotRecord) -> StoreResult<()> {
        self.score_snapshots.entry(record.deployment_id.clone()).or_default().push(record);
        Ok(())
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn append_event(&self, event: Event) -> StoreResult<()> {
        self.events.entry(event.deployment_id.clone()).or_default().push(event);
        Ok(())
    }

    async fn recent_events(&self, deployment_id: &DeploymentId, limit: usize) -> StoreResult<Vec<Event>> {
        let mut matching: Vec<Event> =
            self.events.get(deployment_id).map(|v| v.clone()).unwrap_or_default();
        matching.reverse();
        matching.truncate(limit);
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use braincanary_types::{
        Comparison, DeploymentConfig, DurationSpec, Gate, MonitorConfig, QueryConfig, RollbackConfig, Stage, Variant,
    };
    use chrono::Utc;
    use std::time::Duration;

    fn sample_config() -> DeploymentConfig {
        DeploymentConfig {
            name: "svc".into(),
            project: "p".into(),
            baseline: Variant { model: "a".into(), prompt: None, system_prompt: None },
            canary: Variant { model: "b".into(), prompt: None, system_prompt: None },
            stages: vec![Stage {
                weight: 100,
                duration: None,
                min_samples: 1,
                gates: vec![Gate {
                    scorer: "q".into(),
                    threshold: 0.1,
                    comparison: Comparison::AbsoluteOnly,
                    confidence: 0.95,
                }],
            }],
            rollback: RollbackConfig {
                on_score_drop: 0.05,
                on_error_rate: 0.05,
                cooldown: DurationSpec::new(Duration::from_secs(1)),
            },
            monitor: MonitorConfig {
                poll_interval: DurationSpec::new(Duration::from_secs(1)),
                sticky_key: None,
                scorer_lag_grace: DurationSpec::zero(),
                query: QueryConfig {
                    api_url: "https://x".into(),
                    path: "/q".into(),
                    api_key: None,
                    timeout_ms: 1000,
                    max_retries: 1,
                },
            },
        }
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let store = InMemoryStore::new();
        let snapshot = DeploymentSnapshot::start(sample_config(), Utc::now());
        store.save_snapshot(&snapshot).await.unwrap();
        let loaded = store.get_snapshot(&snapshot.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, snapshot.id);
        assert_eq!(loaded.state, snapshot.state);
    }

    #[tokio::test]
    async fn active_deployment_excludes_terminal_states() {
        let store = InMemoryStore::new();
        let mut snapshot = DeploymentSnapshot::start(sample_config(), Utc::now());
        store.save_snapshot(&snapshot).await.unwrap();
        assert!(store.active_deployment().await.unwrap().is_some());

        snapshot.state = DeploymentState::Promoted;
        store.save_snapshot(&snapshot).await.unwrap();
        assert!(store.active_deployment().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn recent_events_returns_only_the_matching_deployment_most_recent_first() {
        use braincanary_types::EventPayload;

        let store = InMemoryStore::new();
        let id_a = DeploymentId::generate();
        let id_b = DeploymentId::generate();

        for stage_index in 0..3 {
            store
                .append_event(Event::new(
                    id_a.clone(),
                    Utc::now(),
                    EventPayload::Paused { stage_index },
                ))
                .await
                .unwrap();
        }
        store.append_event(Event::new(id_b.clone(), Utc::now(), EventPayload::Resumed { stage_index: 0 })).await.unwrap();

        let events = store.recent_events(&id_a, 2).await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].data, EventPayload::Paused { stage_index: 2 }));
        assert!(matches!(events[1].data, EventPayload::Paused { stage_index: 1 }));
        assert!(events.iter().all(|e| e.deployment_id == id_a));
    }
}

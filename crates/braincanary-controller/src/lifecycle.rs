//! Lifecycle glue (C8): owns construction/teardown of the monitor, controller, and
//! Store wiring for the single active deployment this process hosts.

use crate::controller::StageController;
use crate::error::ControllerError;
use braincanary_query::QueryClient;
use braincanary_store::Store;
use braincanary_types::{DeploymentConfig, DeploymentSnapshot, EventBus};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// The process-level entry point: one [`DeploymentService`] per host, holding at most
/// one active [`StageController`] at a time.
pub struct DeploymentService {
    store: Arc<dyn Store>,
    bus: EventBus,
    query_client: Arc<dyn QueryClient>,
    active: Mutex<Option<Arc<StageController>>>,
}

impl DeploymentService {
    pub fn new(store: Arc<dyn Store>, bus: EventBus, query_client: Arc<dyn QueryClient>) -> Self {
        Self { store, bus, query_client, active: Mutex::new(None) }
    }

    /// Adopt whatever non-terminal deployment Store remembers from a prior process.
    /// A no-op if there is none.
    pub async fn recover(&self) -> Result<(), ControllerError> {
        let recovered = StageController::recover(self.store.clone(), self.bus.clone(), self.query_client.clone()).await?;
        if let Some(controller) = recovered {
            *self.active.lock().await = Some(controller);
        }
        Ok(())
    }

    /// Start a new deployment. Fails if one is already active; finish or roll back the
    /// current deployment first.
    pub async fn start(&self, config: DeploymentConfig) -> Result<Arc<StageController>, ControllerError> {
        let mut guard = self.active.lock().await;
        if let Some(existing) = guard.as_ref() {
            if !existing.snapshot().await.state.is_terminal() {
                return Err(ControllerError::DeploymentAlreadyActive);
            }
        }

        let controller =
            StageController::start_deployment(config, self.store.clone(), self.bus.clone(), self.query_client.clone())
                .await?;
        *guard = Some(controller.clone());
        Ok(controller)
    }

    pub async fn active(&self) -> Option<Arc<StageController>> {
        self.active.lock().await.clone()
    }

    pub async fn active_snapshot(&self) -> Option<DeploymentSnapshot> {
        match self.active().await {
            Some(controller) => Some(controller.snapshot().await),
            None => None,
        }
    }

    /// Halt timers on the active deployment, if any. Its persisted snapshot remains
    /// recoverable on the next `recover()` call.
    pub async fn shutdown(&self) {
        if let Some(controller) = self.active.lock().await.take() {
            info!("shutting down active deployment");
            controller.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use braincanary_query::MockQueryClient;
    use braincanary_store::InMemoryStore;
    use braincanary_types::{Comparison, Gate, MonitorConfig, QueryConfig, RollbackConfig, Stage, Variant};
    use std::time::Duration;

    fn config() -> DeploymentConfig {
        DeploymentConfig {
            name: "svc".into(),
            project: "proj".into(),
            baseline: Variant { model: "a".into(), prompt: None, system_prompt: None },
            canary: Variant { model: "b".into(), prompt: None, system_prompt: None },
            stages: vec![
                Stage {
                    weight: 5,
                    duration: Some(braincanary_types::DurationSpec::new(Duration::from_millis(1))),
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
                cooldown: braincanary_types::DurationSpec::zero(),
            },
            monitor: MonitorConfig {
                poll_interval: braincanary_types::DurationSpec::new(Duration::from_secs(3600)),
                sticky_key: None,
                scorer_lag_grace: braincanary_types::DurationSpec::zero(),
                query: QueryConfig {
                    api_url: "https://example.test".into(),
                    path: "/q".into(),
                    api_key: None,
                    timeout_ms: 1000,
                    max_retries: 1,
                },
            },
        }
    }

    #[tokio::test]
    async fn recover_with_empty_store_is_a_noop() {
        let service = DeploymentService::new(Arc::new(InMemoryStore::new()), EventBus::new(16), Arc::new(MockQueryClient::new(vec![])));
        service.recover().await.unwrap();
        assert!(service.active().await.is_none());
    }

    #[tokio::test]
    async fn starting_twice_without_completion_fails() {
        let service = DeploymentService::new(Arc::new(InMemoryStore::new()), EventBus::new(16), Arc::new(MockQueryClient::new(vec![])));
        service.start(config()).await.unwrap();
        let err = service.start(config()).await.unwrap_err();
        assert!(matches!(err, ControllerError::DeploymentAlreadyActive));
    }
}

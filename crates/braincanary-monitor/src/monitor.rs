//! The score monitor: a watermark-driven periodic pull from the evaluation backend

use crate::state::MonitorState;
use braincanary_query::{build_query, QueryClient, QueryError};
use braincanary_types::{
    DeploymentId, Event, EventBus, EventPayload, MonitorHealth, QueryClientStatus,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Construction parameters for a [`ScoreMonitor`].
pub struct MonitorParams {
    pub deployment_id: DeploymentId,
    pub project: String,
    pub poll_interval: Duration,
    pub stage_start_time: DateTime<Utc>,
    pub scorer_names: Vec<String>,
    pub scorer_lag_grace: Duration,
}

/// Periodically ingests scored traces for one deployment's active stage and publishes
/// `score_update` / `monitor_health` events onto the shared event bus.
pub struct ScoreMonitor {
    params: MonitorParams,
    query_client: Arc<dyn QueryClient>,
    bus: EventBus,
    state: Mutex<MonitorState>,
    in_flight: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ScoreMonitor {
    pub fn new(params: MonitorParams, query_client: Arc<dyn QueryClient>, bus: EventBus) -> Arc<Self> {
        let state = MonitorState::new(params.stage_start_time, &params.scorer_names);
        Arc::new(Self {
            params,
            query_client,
            bus,
            state: Mutex::new(state),
            in_flight: AtomicBool::new(false),
            task: Mutex::new(None),
        })
    }

    /// Start the periodic tick. The first tick fires immediately.
    pub async fn start(self: &Arc<Self>) {
        let this = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(this.params.poll_interval);
            loop {
                interval.tick().await;
                if this.in_flight.swap(true, Ordering::SeqCst) {
                    debug!("dropping overlapping monitor tick");
                    continue;
                }
                let tick_owner = this.clone();
                tokio::spawn(async move {
                    tick_owner.run_tick().await;
                    tick_owner.in_flight.store(false, Ordering::SeqCst);
                });
            }
        });
        *self.task.lock().await = Some(handle);
    }

    /// Cancel the periodic tick. Any in-flight request is aborted along with the task.
    pub async fn stop(&self) {
        if let Some(handle) = self.task.lock().await.take() {
            handle.abort();
        }
    }

    /// Reset watermarks, counters, and running stats for a new stage.
    pub async fn reset_for_stage(&self, stage_start: DateTime<Utc>) {
        self.state.lock().await.reset(stage_start);
    }

    async fn run_tick(&self) {
        if let Err(err) = self.run_tick_fallible().await {
            warn!(deployment_id = %self.params.deployment_id, error = %err, "monitor tick failed");
            self.publish_health(QueryClientStatus::Degraded);
        }
    }

    async fn run_tick_fallible(&self) -> Result<(), QueryError> {
        let grace = ChronoDuration::from_std(self.params.scorer_lag_grace).unwrap_or(ChronoDuration::zero());

        let (baseline_since, canary_since) = {
            let state = self.state.lock().await;
            (state.watermark_baseline - grace, state.watermark_canary - grace)
        };

        let baseline_sql =
            build_query(&self.params.project, &self.params.deployment_id.to_string(), "baseline", baseline_since);
        let baseline_rows = self.query_client.query(&baseline_sql).await?;

        let canary_sql =
            build_query(&self.params.project, &self.params.deployment_id.to_string(), "canary", canary_since);
        let canary_rows = self.query_client.query(&canary_sql).await?;

        {
            let mut state = self.state.lock().await;

            for row in &baseline_rows {
                if row.created > state.watermark_baseline {
                    state.watermark_baseline = row.created;
                }
                for scorer in &self.params.scorer_names {
                    if let Some(Some(value)) = row.scores.get(scorer) {
                        if value.is_finite() {
                            if let Some(stats) = state.baseline_stats_mut(scorer) {
                                stats.add(*value);
                            }
                        }
                    }
                }
            }

            for row in &canary_rows {
                if row.created > state.watermark_canary {
                    state.watermark_canary = row.created;
                }
                state.canary_total += 1;
                if row.error.is_some() {
                    state.canary_errors += 1;
                }
                for scorer in &self.params.scorer_names {
                    if let Some(Some(value)) = row.scores.get(scorer) {
                        if value.is_finite() {
                            if let Some(stats) = state.canary_stats_mut(scorer) {
                                stats.add(*value);
                            }
                        }
                    }
                }
            }
        }

        let snapshot = self.state.lock().await.score_snapshot();
        self.bus.publish(Event::new(
            self.params.deployment_id.clone(),
            Utc::now(),
            EventPayload::ScoreUpdate { scores: snapshot },
        ));
        self.publish_health(QueryClientStatus::Healthy);

        Ok(())
    }

    fn publish_health(&self, fallback_status: QueryClientStatus) {
        let diagnostics = self.query_client.diagnostics();
        let status = if matches!(diagnostics.status, QueryClientStatus::Degraded) {
            QueryClientStatus::Degraded
        } else {
            fallback_status
        };
        let health = MonitorHealth {
            status,
            consecutive_failures: diagnostics.consecutive_failures,
            total_requests: diagnostics.total_requests,
            total_rate_limited: diagnostics.total_rate_limited,
            last_error: diagnostics.last_error,
            last_error_at: diagnostics.last_error_at,
            last_success_at: diagnostics.last_success_at,
            last_backoff_ms: diagnostics.last_backoff_ms,
        };
        self.bus.publish(Event::new(
            self.params.deployment_id.clone(),
            Utc::now(),
            EventPayload::MonitorHealth(health),
        ));
    }

    /// The canary error rate observed in the current stage.
    pub async fn canary_error_rate(&self) -> f64 {
        self.state.lock().await.canary_error_rate()
    }

    /// Raw retained samples for one scorer, used by the gate evaluator.
    pub async fn samples_for(&self, scorer: &str) -> (Vec<f64>, Vec<f64>) {
        let state = self.state.lock().await;
        let baseline = state.baseline_stats(scorer).map(|s| s.samples().to_vec()).unwrap_or_default();
        let canary = state.canary_stats(scorer).map(|s| s.samples().to_vec()).unwrap_or_default();
        (baseline, canary)
    }
}

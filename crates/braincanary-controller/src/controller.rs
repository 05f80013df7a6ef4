//! The stage controller (C6): the sole owner of a deployment's mutable snapshot

use crate::error::ControllerError;
use crate::gating::{decide_stage, evaluate_gate_set};
use braincanary_monitor::{MonitorParams, ScoreMonitor};
use braincanary_query::QueryClient;
use braincanary_store::{ScoreSnapshotRecord, StateTransitionRecord, Store};
use braincanary_types::{
    DeploymentConfig, DeploymentId, DeploymentSnapshot, DeploymentState, Event, EventBus, EventPayload, FinalState,
    NextAction, ScoreSnapshot,
};
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// Owns the sole mutable [`DeploymentSnapshot`] for one deployment and drives it through
/// the state machine in response to monitor callbacks and manual operations.
///
/// All transitions go through [`StageController::commit_transition`], which asserts the
/// transition is legal, writes the new snapshot to [`Store`], appends a transition
/// record, and only then hands the caller a snapshot to publish an event from. A failed
/// Store write aborts the in-memory mutation — the prior snapshot stays authoritative.
pub struct StageController {
    id: DeploymentId,
    snapshot: Mutex<DeploymentSnapshot>,
    store: Arc<dyn Store>,
    bus: EventBus,
    monitor: Arc<ScoreMonitor>,
    reactor: Mutex<Option<JoinHandle<()>>>,
    callback_lock: Mutex<()>,
}

impl std::fmt::Debug for StageController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageController").field("id", &self.id).finish_non_exhaustive()
    }
}

impl StageController {
    /// Start a brand-new deployment: allocate an id, persist the PENDING snapshot, emit
    /// `deployment_started`, then transition straight into STAGE and begin monitoring.
    pub async fn start_deployment(
        config: DeploymentConfig,
        store: Arc<dyn Store>,
        bus: EventBus,
        query_client: Arc<dyn QueryClient>,
    ) -> Result<Arc<Self>, ControllerError> {
        config.validate().map_err(|e| ControllerError::InvalidConfig(e.to_string()))?;

        let now = Utc::now();
        let snapshot = DeploymentSnapshot::start(config, now);
        store.save_snapshot(&snapshot).await?;
        let started = Event::new(
            snapshot.id.clone(),
            now,
            EventPayload::DeploymentStarted {
                name: snapshot.name.clone(),
                stage_index: snapshot.stage_index,
                canary_weight: snapshot.canary_weight,
            },
        );
        store.append_event(started.clone()).await?;
        bus.publish(started);

        let monitor = build_monitor(&snapshot, bus.clone(), query_client);
        let controller = Arc::new(Self {
            id: snapshot.id.clone(),
            snapshot: Mutex::new(snapshot),
            store,
            bus,
            monitor,
            reactor: Mutex::new(None),
            callback_lock: Mutex::new(()),
        });

        controller
            .commit_transition(&[DeploymentState::Pending], DeploymentState::Stage, None, |_| {})
            .await?;

        controller.monitor.start().await;
        controller.spawn_reactor().await;
        Ok(controller)
    }

    /// Recover the most recent non-terminal deployment from Store, if one exists.
    ///
    /// Elapsed stage time is not stored separately; it is always recomputed as
    /// `now - stage_entered_at`, so nothing special is needed here beyond adopting the
    /// persisted snapshot as-is. A deployment recovered mid ROLLING_BACK is retried
    /// immediately: the second leg of rollback is safe to repeat.
    pub async fn recover(
        store: Arc<dyn Store>,
        bus: EventBus,
        query_client: Arc<dyn QueryClient>,
    ) -> Result<Option<Arc<Self>>, ControllerError> {
        let Some(snapshot) = store.active_deployment().await? else {
            return Ok(None);
        };

        info!(deployment_id = %snapshot.id, state = ?snapshot.state, "recovering deployment");
        let should_tick = snapshot.state == DeploymentState::Stage;
        let was_rolling_back = snapshot.state == DeploymentState::RollingBack;

        let monitor = build_monitor(&snapshot, bus.clone(), query_client);
        let controller = Arc::new(Self {
            id: snapshot.id.clone(),
            snapshot: Mutex::new(snapshot),
            store,
            bus,
            monitor,
            reactor: Mutex::new(None),
            callback_lock: Mutex::new(()),
        });

        if should_tick {
            controller.monitor.start().await;
        }
        controller.spawn_reactor().await;

        if was_rolling_back {
            controller.rollback("recovery_retry".to_string()).await?;
        }

        Ok(Some(controller))
    }

    /// Subscribe to the shared event bus and react to this deployment's own
    /// `score_update` events. The callback lock serializes reactions so a second
    /// `score_update` never re-enters the controller while a prior one is in flight.
    async fn spawn_reactor(self: &Arc<Self>) {
        let this = self.clone();
        let mut rx = this.bus.subscribe();
        let handle = tokio::spawn(async move {
            while let Ok(event) = rx.recv().await {
                if event.deployment_id != this.id {
                    continue;
                }
                if let EventPayload::ScoreUpdate { scores } = event.data {
                    let _guard = this.callback_lock.lock().await;
                    if let Err(err) = this.handle_score_update(scores).await {
                        warn!(deployment_id = %this.id, error = %err, "failed to process score_update");
                    }
                }
            }
        });
        *self.reactor.lock().await = Some(handle);
    }

    /// A clone of the current snapshot, for callers (e.g. a router) that need a stable
    /// read-only view without holding the controller's lock.
    pub async fn snapshot(&self) -> DeploymentSnapshot {
        self.snapshot.lock().await.clone()
    }

    async fn handle_score_update(&self, scores: ScoreSnapshot) -> Result<(), ControllerError> {
        let snapshot = self.snapshot.lock().await.clone();

        for (scorer, stats) in scores.0.iter() {
            self.store
                .append_score_snapshot(ScoreSnapshotRecord {
                    id: Uuid::new_v4().to_string(),
                    deployment_id: snapshot.id.clone(),
                    stage_index: snapshot.stage_index,
                    scorer: scorer.clone(),
                    baseline_mean: stats.baseline.mean,
                    baseline_std: stats.baseline.std,
                    baseline_n: stats.baseline.n,
                    canary_mean: stats.canary.mean,
                    canary_std: stats.canary.std,
                    canary_n: stats.canary.n,
                    ts: Utc::now(),
                })
                .await?;
        }

        if snapshot.state != DeploymentState::Stage {
            return Ok(());
        }

        let stage = snapshot.config.stages[snapshot.stage_index].clone();
        let gates = evaluate_gate_set(&stage, &self.monitor).await;
        let err_rate = self.monitor.canary_error_rate().await;
        let now = Utc::now();
        let decision = decide_stage(gates, err_rate, &stage, snapshot.stage_entered_at, now, &snapshot.config.rollback);

        let next_action = decision.next_action;
        let rollback_reason = decision.rollback_reason;
        let gate_status = Event::new(
            snapshot.id.clone(),
            now,
            EventPayload::GateStatus {
                gates: decision.gates,
                next_action,
                time_remaining_ms: decision.time_remaining_ms,
            },
        );
        self.store.append_event(gate_status.clone()).await?;
        self.bus.publish(gate_status);

        match next_action {
            NextAction::Rollback => {
                self.rollback(rollback_reason.unwrap_or_else(|| "unknown".to_string())).await?;
            }
            NextAction::AutoPromote => {
                self.advance_stage("auto_promote").await?;
            }
            NextAction::Hold => {}
        }
        Ok(())
    }

    /// Advance to the next stage, or to PROMOTED if this was the last one.
    ///
    /// Callable from STAGE (the normal auto/manual-promote path) or PAUSED (a forced
    /// `promote(force)` while paused). The PAUSED row of the allowed-transitions table
    /// in §4.6 does not enumerate PROMOTED, but the manual-operations contract requires
    /// exactly that path, so this assertion is local to `advance_stage` rather than
    /// routed through the generic table.
    ///
    /// A newly-entered stage with no gates and no duration has nothing to wait on, so
    /// this keeps advancing through such stages in the same call rather than stalling
    /// until a score_update that can never satisfy `allPassing` (which requires a
    /// non-empty gate set) arrives.
    async fn advance_stage(&self, reason: &str) -> Result<(), ControllerError> {
        let valid_from = [DeploymentState::Stage, DeploymentState::Paused];
        let mut reason = reason.to_string();

        loop {
            let current = self.snapshot.lock().await.clone();
            if !matches!(current.state, DeploymentState::Stage | DeploymentState::Paused) {
                return Err(ControllerError::InvalidTransition { from: current.state, to: DeploymentState::Stage });
            }

            let now = Utc::now();

            if current.stage_index + 1 >= current.config.stages.len() {
                let snap = self
                    .commit_transition(&valid_from, DeploymentState::Promoted, Some(reason), |s| {
                        s.canary_weight = 100;
                        s.final_state = Some(FinalState::Promoted);
                        s.completed_at = Some(now);
                        s.paused_stage_index = None;
                    })
                    .await?;
                self.monitor.stop().await;
                let complete =
                    Event::new(snap.id.clone(), now, EventPayload::DeploymentComplete { final_state: FinalState::Promoted });
                self.store.append_event(complete.clone()).await?;
                self.bus.publish(complete);
                return Ok(());
            }

            let next_index = current.stage_index + 1;
            let next_stage = current.config.stages[next_index].clone();
            let from_index = current.stage_index;
            let snap = self
                .commit_transition(&valid_from, DeploymentState::Stage, Some(reason), |s| {
                    s.stage_index = next_index;
                    s.stage_entered_at = now;
                    s.canary_weight = next_stage.weight;
                    s.paused_stage_index = None;
                })
                .await?;
            // The monitor is reset before the event is published, so the first
            // score_update any subscriber observes after stage_change is already
            // counting against the new stage.
            self.monitor.reset_for_stage(now).await;
            let stage_change = Event::new(
                snap.id.clone(),
                now,
                EventPayload::StageChange { from: from_index, to: next_index, canary_weight: next_stage.weight },
            );
            self.store.append_event(stage_change.clone()).await?;
            self.bus.publish(stage_change);

            let trivially_satisfied = next_stage.gates.is_empty()
                && next_stage.duration.map(|d| d.as_duration().is_zero()).unwrap_or(true);
            if !trivially_satisfied {
                return Ok(());
            }
            reason = "auto_promote".to_string();
        }
    }

    /// Pause an active stage. Traffic keeps flowing at the current weight; only the
    /// stage timer and gate evaluation stop advancing.
    pub async fn pause(&self) -> Result<(), ControllerError> {
        let snap = self
            .commit_transition(&[DeploymentState::Stage], DeploymentState::Paused, None, |s| {
                s.paused_stage_index = Some(s.stage_index);
            })
            .await?;
        let paused = Event::new(snap.id.clone(), Utc::now(), EventPayload::Paused { stage_index: snap.stage_index });
        self.store.append_event(paused.clone()).await?;
        self.bus.publish(paused);
        Ok(())
    }

    /// Resume a paused deployment; the stage timer restarts from now.
    pub async fn resume(&self) -> Result<(), ControllerError> {
        let now = Utc::now();
        let snap = self
            .commit_transition(&[DeploymentState::Paused], DeploymentState::Stage, None, |s| {
                s.stage_entered_at = now;
                s.paused_stage_index = None;
            })
            .await?;
        let resumed = Event::new(snap.id.clone(), now, EventPayload::Resumed { stage_index: snap.stage_index });
        self.store.append_event(resumed.clone()).await?;
        self.bus.publish(resumed);
        Ok(())
    }

    /// Manually promote. `force = false` from STAGE re-evaluates the current gates and
    /// requires `next_action = auto_promote`; `force = true`, or any call from PAUSED,
    /// promotes unconditionally.
    pub async fn promote(&self, force: bool) -> Result<(), ControllerError> {
        let current = self.snapshot.lock().await.clone();
        match current.state {
            DeploymentState::Paused => self.advance_stage("manual_promote").await,
            DeploymentState::Stage if force => self.advance_stage("manual_promote").await,
            DeploymentState::Stage => {
                let stage = current.config.stages[current.stage_index].clone();
                let gates = evaluate_gate_set(&stage, &self.monitor).await;
                let err_rate = self.monitor.canary_error_rate().await;
                let decision = decide_stage(
                    gates,
                    err_rate,
                    &stage,
                    current.stage_entered_at,
                    Utc::now(),
                    &current.config.rollback,
                );
                if decision.next_action != NextAction::AutoPromote {
                    return Err(ControllerError::InvalidTransition { from: current.state, to: DeploymentState::Promoted });
                }
                self.advance_stage("manual_promote").await
            }
            other => Err(ControllerError::InvalidTransition { from: other, to: DeploymentState::Promoted }),
        }
    }

    /// Roll back. From any non-terminal state other than ROLLING_BACK this cuts traffic
    /// immediately (`canary_weight = 0`) before the terminal write; a deployment already
    /// in ROLLING_BACK (e.g. recovered after a crash between the two legs) only needs the
    /// second leg retried.
    pub async fn rollback(&self, reason: String) -> Result<(), ControllerError> {
        let current_state = self.snapshot.lock().await.state;
        if current_state.is_terminal() {
            return Err(ControllerError::InvalidTransition { from: current_state, to: DeploymentState::RollingBack });
        }

        let now = Utc::now();
        if current_state != DeploymentState::RollingBack {
            let valid_from = [DeploymentState::Pending, DeploymentState::Stage, DeploymentState::Paused];
            let snap = self
                .commit_transition(&valid_from, DeploymentState::RollingBack, Some(reason.clone()), |s| {
                    s.canary_weight = 0;
                })
                .await?;
            let triggered = Event::new(
                snap.id.clone(),
                now,
                EventPayload::RollbackTriggered { reason: reason.clone(), stage_index: snap.stage_index, canary_weight: 0 },
            );
            self.store.append_event(triggered.clone()).await?;
            self.bus.publish(triggered);
        }

        let snap = self
            .commit_transition(&[DeploymentState::RollingBack], DeploymentState::RolledBack, Some(reason), |s| {
                s.final_state = Some(FinalState::RolledBack);
                s.completed_at = Some(now);
            })
            .await?;
        self.monitor.stop().await;
        let complete =
            Event::new(snap.id.clone(), now, EventPayload::DeploymentComplete { final_state: FinalState::RolledBack });
        self.store.append_event(complete.clone()).await?;
        self.bus.publish(complete);
        Ok(())
    }

    /// Halt timers without touching the persisted snapshot; it remains recoverable.
    pub async fn shutdown(&self) {
        self.monitor.stop().await;
        if let Some(handle) = self.reactor.lock().await.take() {
            handle.abort();
        }
    }

    /// Assert the transition is legal, apply `patch` to a clone of the current snapshot,
    /// persist it, append a transition record, and only then commit the mutation
    /// in-memory. If the Store write fails the prior snapshot remains authoritative.
    async fn commit_transition<F>(
        &self,
        valid_from: &[DeploymentState],
        to: DeploymentState,
        reason: Option<String>,
        patch: F,
    ) -> Result<DeploymentSnapshot, ControllerError>
    where
        F: FnOnce(&mut DeploymentSnapshot),
    {
        let mut guard = self.snapshot.lock().await;
        let from = guard.state;
        if !valid_from.contains(&from) {
            return Err(ControllerError::InvalidTransition { from, to });
        }

        let mut next = guard.clone();
        patch(&mut next);
        next.state = to;

        self.store.save_snapshot(&next).await?;
        self.store
            .append_transition(StateTransitionRecord {
                id: Uuid::new_v4().to_string(),
                deployment_id: next.id.clone(),
                from_state: from,
                to_state: to,
                reason,
                ts: Utc::now(),
            })
            .await?;

        *guard = next.clone();
        Ok(next)
    }
}

fn build_monitor(snapshot: &DeploymentSnapshot, bus: EventBus, query_client: Arc<dyn QueryClient>) -> Arc<ScoreMonitor> {
    let scorer_names = collect_scorer_names(&snapshot.config);
    let params = MonitorParams {
        deployment_id: snapshot.id.clone(),
        project: snapshot.config.project.clone(),
        poll_interval: snapshot.config.monitor.poll_interval.as_duration(),
        stage_start_time: snapshot.stage_entered_at,
        scorer_names,
        scorer_lag_grace: snapshot.config.monitor.scorer_lag_grace.as_duration(),
    };
    ScoreMonitor::new(params, query_client, bus)
}

fn collect_scorer_names(config: &DeploymentConfig) -> Vec<String> {
    let mut names = BTreeSet::new();
    for stage in &config.stages {
        for gate in &stage.gates {
            names.insert(gate.scorer.clone());
        }
    }
    names.into_iter().collect()
}

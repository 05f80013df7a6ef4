//! Typed lifecycle event stream and its in-process publish/subscribe bus

use crate::ids::DeploymentId;
use crate::score::{GateResult, ScoreSnapshot};
use crate::snapshot::FinalState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Diagnostic counters surfaced alongside each `monitor_health` event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryClientStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorHealth {
    pub status: QueryClientStatus,
    pub consecutive_failures: u32,
    pub total_requests: u64,
    pub total_rate_limited: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_backoff_ms: Option<u64>,
}

/// The decision a `gate_status` event reports the controller arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    Hold,
    AutoPromote,
    Rollback,
}

/// Payload variants carried by an [`Event`]. Tagged so wire consumers can switch on `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    DeploymentStarted {
        name: String,
        stage_index: usize,
        canary_weight: u32,
    },
    ScoreUpdate {
        scores: ScoreSnapshot,
    },
    GateStatus {
        gates: Vec<GateResult>,
        next_action: NextAction,
        time_remaining_ms: i64,
    },
    StageChange {
        from: usize,
        to: usize,
        canary_weight: u32,
    },
    Paused {
        stage_index: usize,
    },
    Resumed {
        stage_index: usize,
    },
    RollbackTriggered {
        reason: String,
        stage_index: usize,
        canary_weight: u32,
    },
    DeploymentComplete {
        final_state: FinalState,
    },
    MonitorHealth(MonitorHealth),
}

/// A typed envelope published on the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub deployment_id: DeploymentId,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub data: EventPayload,
}

impl Event {
    pub fn new(deployment_id: DeploymentId, timestamp: DateTime<Utc>, data: EventPayload) -> Self {
        Self { deployment_id, timestamp, data }
    }
}

/// In-process typed publish/subscribe bus for lifecycle events.
///
/// Subscribers receive every event in emission order via a broadcast channel; a slow
/// subscriber that falls behind the channel's capacity observes a lag error rather than
/// blocking the publisher, matching the "do not re-enter the controller" fan-out contract.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Publish an event. Returns the number of active subscribers notified; publishing
    /// with zero subscribers is not an error.
    pub fn publish(&self, event: Event) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

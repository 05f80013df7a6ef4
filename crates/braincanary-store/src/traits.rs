//! The Store capability contract: one sub-trait per logical table, composed into `Store`

use crate::error::StoreResult;
use crate::records::{ScoreSnapshotRecord, StateTransitionRecord};
use async_trait::async_trait;
use braincanary_types::{DeploymentId, DeploymentSnapshot, Event};

/// Atomic reads/writes of the `deployments` table.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Atomically write (insert or replace) a deployment's snapshot row.
    async fn save_snapshot(&self, snapshot: &DeploymentSnapshot) -> StoreResult<()>;

    async fn get_snapshot(&self, id: &DeploymentId) -> StoreResult<Option<DeploymentSnapshot>>;

    /// The most recent deployment not in a terminal or idle state, used on startup recovery.
    async fn active_deployment(&self) -> StoreResult<Option<DeploymentSnapshot>>;

    /// Deployment history ordered most-recent-first.
    async fn history(&self, limit: usize) -> StoreResult<Vec<DeploymentSnapshot>>;
}

/// Append-only inserts into the `state_transitions` table.
#[async_trait]
pub trait TransitionStore: Send + Sync {
    async fn append_transition(&self, record: StateTransitionRecord) -> StoreResult<()>;
}

/// Append-only inserts into the `score_snapshots` table.
#[async_trait]
pub trait ScoreSnapshotStore: Send + Sync {
    async fn append_score_snapshot(&self, record: ScoreSnapshotRecord) -> StoreResult<()>;
}

/// Append-only inserts into, and recency reads from, the `events` table.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append_event(&self, event: Event) -> StoreResult<()>;

    async fn recent_events(&self, deployment_id: &DeploymentId, limit: usize) -> StoreResult<Vec<Event>>;
}

/// The full persistence capability the controller depends on.
#[async_trait]
pub trait Store: SnapshotStore + TransitionStore + ScoreSnapshotStore + EventStore + Send + Sync {}

impl<T> Store for T where T: SnapshotStore + TransitionStore + ScoreSnapshotStore + EventStore + Send + Sync {}

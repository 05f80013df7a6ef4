//! Errors surfaced by the stage controller

use braincanary_store::StoreError;
use braincanary_types::DeploymentState;
use thiserror::Error;

/// Failures the controller can surface to its caller.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A requested operation is not legal from the deployment's current state.
    #[error("invalid transition from {from:?} to {to:?}")]
    InvalidTransition { from: DeploymentState, to: DeploymentState },

    /// A Store write failed; the in-memory snapshot mutation was not applied.
    #[error("store operation failed: {0}")]
    StoreFatal(#[from] StoreError),

    /// A new deployment was requested while one is already active.
    #[error("a deployment is already active")]
    DeploymentAlreadyActive,
}

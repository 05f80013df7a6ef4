//! Core data model for the progressive-rollout controller.
//!
//! This crate defines the wire-level contracts shared by every other `braincanary-*`
//! crate: configuration, the persisted deployment snapshot, score summaries, and the
//! typed event stream. It has no knowledge of how any of these are produced.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]

pub mod config;
pub mod duration;
pub mod events;
pub mod ids;
pub mod score;
pub mod snapshot;

pub use config::{Comparison, DeploymentConfig, Gate, MonitorConfig, QueryConfig, RollbackConfig, Stage, Variant};
pub use duration::DurationSpec;
pub use events::{Event, EventBus, EventPayload, MonitorHealth, NextAction, QueryClientStatus};
pub use ids::DeploymentId;
pub use score::{GateResult, GateStatus, ScoreSnapshot, StatSummary, VariantStats};
pub use snapshot::{DeploymentSnapshot, DeploymentState, FinalState};

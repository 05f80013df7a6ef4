//! The stage controller (C6) and lifecycle glue (C8): the finite-state machine that
//! drives a single deployment through its stages, and the wiring that owns its monitor
//! and Store for the process's lifetime.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]

pub mod controller;
pub mod error;
pub mod gating;
pub mod lifecycle;


pub use controller::StageController;
pub use error::ControllerError;
pub use gating::{decide_stage, evaluate_gate_set, evaluate_rollback, StageDecision};
pub use lifecycle::DeploymentService;

//! The score monitor: watermark-driven periodic ingestion of scored traces.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]

pub mod monitor;
pub mod state;

pub use monitor::{MonitorParams, ScoreMonitor};

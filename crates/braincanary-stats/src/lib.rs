//! Incremental statistics, Welch's t-test, and the pure gate evaluator.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]

pub mod distributions;
pub mod gate;
pub mod reservoir;
pub mod running_stats;
pub mod ttest;
pub mod welford;

pub use distributions::{regularized_incomplete_beta, student_t_cdf, student_t_quantile, ln_gamma};
pub use gate::evaluate_gate;
pub use reservoir::Reservoir;
pub use running_stats::RunningStats;
pub use ttest::{welch, StatsError, WelchResult};
pub use welford::Welford;

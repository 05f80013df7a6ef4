//! Deterministic sticky-hash vs. weighted-random traffic bucketing.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]

pub mod hash;
pub mod router;

pub use hash::{stable_hash, sticky_bucket};
pub use router::{route, RouteVariant, RoutingDecision};

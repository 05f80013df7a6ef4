//! The Store capability: persistence for deployments, transitions, score snapshots, and events.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]

pub mod error;
pub mod memory;
pub mod records;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use records::{ScoreSnapshotRecord, StateTransitionRecord};
pub use traits::{EventStore, ScoreSnapshotStore, SnapshotStore, Store, TransitionStore};

//! Errors surfaced by the Store capability

use thiserror::Error;

/// A Store failure. Every variant maps onto the design's `StoreFatal` error kind: when a
/// write fails, the caller must treat the in-memory mutation as aborted rather than let
/// memory and durable state diverge.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store write failed: {0}")]
    WriteFailed(String),
    #[error("store read failed: {0}")]
    ReadFailed(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

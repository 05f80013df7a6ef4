//! The `QueryClient` capability contract

use crate::types::{QueryError, TraceRow};
use async_trait::async_trait;
use braincanary_types::QueryClientStatus;
use chrono::{DateTime, Utc};

/// Diagnostic counters a `QueryClient` exposes for `monitor_health` events.
#[derive(Debug, Clone)]
pub struct QueryDiagnostics {
    pub status: QueryClientStatus,
    pub consecutive_failures: u32,
    pub total_requests: u64,
    pub total_rate_limited: u64,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_backoff_ms: Option<u64>,
}

impl Default for QueryDiagnostics {
    fn default() -> Self {
        Self {
            status: QueryClientStatus::Healthy,
            consecutive_failures: 0,
            total_requests: 0,
            total_rate_limited: 0,
            last_success_at: None,
            last_error_at: None,
            last_error: None,
            last_backoff_ms: None,
        }
    }
}

/// A narrow capability over the evaluation backend: run a query, get rows back.
///
/// Implementations own their own retry policy; callers see only `Transient`
/// (already-retried-out) or `Fatal` failures.
#[async_trait]
pub trait QueryClient: Send + Sync {
    async fn query(&self, sql: &str) -> Result<Vec<TraceRow>, QueryError>;

    /// A snapshot of the client's current health, for `monitor_health` events.
    fn diagnostics(&self) -> QueryDiagnostics;
}

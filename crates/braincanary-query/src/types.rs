//! Wire shapes for the evaluation backend's trace query

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single scored trace row returned by `QueryClient::query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub scores: HashMap<String, Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Construction-time configuration for a `QueryClient`.
#[derive(Debug, Clone)]
pub struct QueryClientConfig {
    pub api_url: String,
    pub path: String,
    pub api_key: Option<String>,
    pub query_timeout_ms: u64,
    pub max_retries: u32,
}

/// Errors a `QueryClient` can surface to its caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueryError {
    /// Retryable: connection issues, timeouts, 429, or 5xx. Exhausted internally by the
    /// client's own retry loop; only escalates past `max_retries`.
    #[error("transient query failure: {0}")]
    Transient(String),
    /// Non-retryable: any other 4xx or an unrecoverable local error.
    #[error("fatal query failure: {0}")]
    Fatal(String),
}

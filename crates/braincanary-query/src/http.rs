//! HTTP implementation of `QueryClient` against the evaluation backend

use crate::client::{QueryClient, QueryDiagnostics};
use crate::types::{QueryClientConfig, QueryError, TraceRow};
use async_trait::async_trait;
use braincanary_types::QueryClientStatus;
use chrono::Utc;
use rand::Rng;
use reqwest::StatusCode;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, warn};

const INITIAL_BACKOFF_MS: u64 = 1000;
const MAX_BACKOFF_MS: u64 = 16_000;
const JITTER_MS: i64 = 400;

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    sql: &'a str,
}

/// `QueryClient` backed by an HTTP call to the evaluation backend's query endpoint.
pub struct HttpQueryClient {
    http: reqwest::Client,
    config: QueryClientConfig,

    consecutive_failures: AtomicU32,
    total_requests: AtomicU64,
    total_rate_limited: AtomicU64,
    last_backoff_ms: AtomicU64,
    degraded: std::sync::atomic::AtomicBool,

    last_success_at: RwLock<Option<chrono::DateTime<Utc>>>,
    last_error_at: RwLock<Option<chrono::DateTime<Utc>>>,
    last_error: RwLock<Option<String>>,
}

impl HttpQueryClient {
    pub fn new(config: QueryClientConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.query_timeout_ms))
            .build()
            .expect("reqwest client builder with a static timeout never fails");
        Self {
            http,
            config,
            consecutive_failures: AtomicU32::new(0),
            total_requests: AtomicU64::new(0),
            total_rate_limited: AtomicU64::new(0),
            last_backoff_ms: AtomicU64::new(0),
            degraded: std::sync::atomic::AtomicBool::new(false),
            last_success_at: RwLock::new(None),
            last_error_at: RwLock::new(None),
            last_error: RwLock::new(None),
        }
    }

    fn backoff_for_attempt(attempt: u32) -> Duration {
        let base = INITIAL_BACKOFF_MS.saturating_mul(1u64 << attempt.min(32)).min(MAX_BACKOFF_MS);
        let jitter = rand::thread_rng().gen_range(-JITTER_MS..=JITTER_MS);
        let millis = (base as i64 + jitter).max(0) as u64;
        Duration::from_millis(millis)
    }

    fn record_failure(&self, err: &str, rate_limited: bool) {
        self.consecutive_failures.fetch_add(1, Ordering::SeqCst);
        self.degraded.store(true, Ordering::SeqCst);
        if rate_limited {
            self.total_rate_limited.fetch_add(1, Ordering::SeqCst);
        }
        *self.last_error_at.write().unwrap() = Some(Utc::now());
        *self.last_error.write().unwrap() = Some(err.to_string());
    }

    fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        self.degraded.store(false, Ordering::SeqCst);
        *self.last_success_at.write().unwrap() = Some(Utc::now());
    }

    async fn attempt(&self, sql: &str) -> Result<Vec<TraceRow>, (bool, String)> {
        let url = format!("{}{}", self.config.api_url, self.config.path);
        let mut builder = self.http.post(&url).json(&QueryRequest { sql });
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| (true, format!("transport error: {e}")))?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err((true, format!("rate limited: {status}")));
        }
        if status.is_server_error() {
            return Err((true, format!("server error: {status}")));
        }
        if status.is_client_error() {
            return Err((false, format!("client error: {status}")));
        }

        response.json::<Vec<TraceRow>>().await.map_err(|e| (false, format!("decode error: {e}")))
    }
}

#[async_trait]
impl QueryClient for HttpQueryClient {
    async fn query(&self, sql: &str) -> Result<Vec<TraceRow>, QueryError> {
        self.total_requests.fetch_add(1, Ordering::SeqCst);

        for attempt in 0..=self.config.max_retries {
            match self.attempt(sql).await {
                Ok(rows) => {
                    self.record_success();
                    return Ok(rows);
                }
                Err((retryable, message)) => {
                    let rate_limited = message.starts_with("rate limited");
                    self.record_failure(&message, rate_limited);

                    if !retryable {
                        return Err(QueryError::Fatal(message));
                    }
                    if attempt == self.config.max_retries {
                        return Err(QueryError::Transient(message));
                    }

                    let backoff = Self::backoff_for_attempt(attempt);
                    self.last_backoff_ms.store(backoff.as_millis() as u64, Ordering::SeqCst);
                    debug!(attempt, backoff_ms = backoff.as_millis() as u64, "retrying query after transient failure");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
        warn!("query exhausted retries without a terminal branch, treating as transient");
        Err(QueryError::Transient("retries exhausted".into()))
    }

    fn diagnostics(&self) -> QueryDiagnostics {
        let status =
            if self.degraded.load(Ordering::SeqCst) { QueryClientStatus::Degraded } else { QueryClientStatus::Healthy };
        QueryDiagnostics {
            status,
            consecutive_failures: self.consecutive_failures.load(Ordering::SeqCst),
            total_requests: self.total_requests.load(Ordering::SeqCst),
            total_rate_limited: self.total_rate_limited.load(Ordering::SeqCst),
            last_success_at: *self.last_success_at.read().unwrap(),
            last_error_at: *self.last_error_at.read().unwrap(),
            last_error: self.last_error.read().unwrap().clone(),
            last_backoff_ms: {
                let ms = self.last_backoff_ms.load(Ordering::SeqCst);
                if ms == 0 { None } else { Some(ms) }
            },
        }
    }
}

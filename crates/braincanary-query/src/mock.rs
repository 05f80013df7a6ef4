//! An in-memory `QueryClient` for monitor and controller tests

use crate::client::{QueryClient, QueryDiagnostics};
use crate::types::{QueryError, TraceRow};
use async_trait::async_trait;
use std::sync::Mutex;

/// A `QueryClient` that returns pre-seeded rows and records every SQL string it receives.
///
/// Never fails and never degrades; tests that need failure injection should implement
/// `QueryClient` directly rather than extending this one.
pub struct MockQueryClient {
    rows: Mutex<Vec<TraceRow>>,
    queries: Mutex<Vec<String>>,
}

impl MockQueryClient {
    pub fn new(rows: Vec<TraceRow>) -> Self {
        Self { rows: Mutex::new(rows), queries: Mutex::new(Vec::new()) }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryClient for MockQueryClient {
    async fn query(&self, sql: &str) -> Result<Vec<TraceRow>, QueryError> {
        self.queries.lock().unwrap().push(sql.to_string());
        Ok(self.rows.lock().unwrap().clone())
    }

    fn diagnostics(&self) -> QueryDiagnostics {
        QueryDiagnostics::default()
    }
}

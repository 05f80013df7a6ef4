//! The `QueryClient` capability: the core's only dependency on the evaluation backend.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]

pub mod client;
pub mod http;
pub mod mock;
pub mod template;
pub mod types;

pub use client::{QueryClient, QueryDiagnostics};
pub use http::HttpQueryClient;
pub use mock::MockQueryClient;
pub use template::build_query;
pub use types::{QueryClientConfig, QueryError, TraceRow};

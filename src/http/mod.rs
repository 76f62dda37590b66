//! Shared HTTP plumbing over reqwest.

mod client;

pub use client::{AuthConfig, HttpClient};

use std::time::Duration;

/// HTTP request timeout. Streaming responses can be long-lived.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(120);
/// Connection timeout.
pub const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Content types a streaming NDJSON response may carry.
pub const NDJSON_CONTENT_TYPES: [&str; 4] = [
    "application/json-lines",
    "application/jsonl",
    "application/x-jsonlines",
    "application/x-ndjson",
];

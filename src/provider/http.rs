//! HTTP client construction, SSE line parsing and status mapping.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

use crate::error::ToolturnError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Build a client with an overall request timeout.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, ToolturnError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(10)
        .build()
        .map_err(ToolturnError::Network)
}

/// Process-wide client with a 120s timeout, built on first use.
pub fn shared_client() -> reqwest::Client {
    SHARED_CLIENT
        .get_or_init(|| build_client(Duration::from_secs(120)).unwrap_or_default())
        .clone()
}

/// Headers for a Bearer-token streaming JSON API.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// One parsed SSE line.
#[derive(Debug, PartialEq, Eq)]
pub enum SseLine<'a> {
    Data(&'a str),
    Done,
    /// Blank lines, `:` comments and non-data fields.
    Ignored,
}

/// Classify an SSE line. `data:` may or may not be followed by a space.
pub fn parse_sse_line(line: &str) -> SseLine<'_> {
    let line = line.trim_end_matches('\r');
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Ignored;
    };
    let data = data.strip_prefix(' ').unwrap_or(data).trim_end();
    match data {
        "" => SseLine::Ignored,
        "[DONE]" => SseLine::Done,
        data => SseLine::Data(data),
    }
}

/// Map a non-success HTTP status to an error.
pub fn status_to_error(status: u16, body: &str) -> ToolturnError {
    match status {
        401 | 403 => ToolturnError::Authentication(error_message(body)),
        429 => ToolturnError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => ToolturnError::api(status, error_message(body)),
    }
}

/// `error.message` from a JSON error body, else the body itself.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}

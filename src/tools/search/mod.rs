//! Web search providers and result normalization.

pub mod brave;
pub mod duckduckgo;
pub mod time_hint;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::error::ToolError;

pub use brave::BraveSearch;
pub use duckduckgo::DuckDuckGoSearch;
pub use time_hint::{parse_time_constraint, TimeConstraint, TimeHint};

/// Hard bounds on how many results one search may return.
pub const MIN_RESULTS: usize = 1;
pub const MAX_RESULTS: usize = 5;

/// One normalized search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub source: String,
}

/// A search as issued to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub count: usize,
    pub time_hint: Option<TimeHint>,
}

/// A network search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short provider id reported in results (`brave`, `duckduckgo`).
    fn name(&self) -> &str;

    /// Run one search. Results are ranked; the caller dedupes and caps them.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, ToolError>;
}

/// Drop results that point at the same (host, path), keeping the first, then
/// cap to `max`.
pub fn dedupe_results(results: Vec<SearchResult>, max: usize) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(dedupe_key(&r.url)))
        .take(max)
        .collect()
}

fn dedupe_key(url: &str) -> (String, String) {
    match reqwest::Url::parse(url) {
        Ok(parsed) => (
            parsed.host_str().unwrap_or_default().to_ascii_lowercase(),
            parsed.path().trim_end_matches('/').to_string(),
        ),
        Err(_) => (String::new(), url.trim().to_string()),
    }
}

/// Host name of a URL, used as a result's `source`.
pub fn host_of(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

/// Per-turn memo of successful searches, keyed by normalized query and time
/// window. Shared by the concurrent calls of one turn only.
#[derive(Debug, Clone, Default)]
pub struct SearchCache {
    entries: Arc<Mutex<HashMap<String, serde_json::Value>>>,
}

impl SearchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key: lowercased trimmed query plus the time fields.
    pub fn key(query: &str, time_hint: Option<TimeHint>, after: Option<&str>, before: Option<&str>) -> String {
        serde_json::json!({
            "q": query.trim().to_lowercase(),
            "after": after.unwrap_or_default().trim(),
            "before": before.unwrap_or_default().trim(),
            "hint": time_hint.map(|h| h.to_string()).unwrap_or_default(),
        })
        .to_string()
    }

    pub async fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.lock().await.get(key).cloned()
    }

    pub async fn insert(&self, key: String, value: serde_json::Value) {
        self.entries.lock().await.insert(key, value);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

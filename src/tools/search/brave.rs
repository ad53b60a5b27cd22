//! Brave Search web API.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;

use super::{host_of, SearchProvider, SearchQuery, SearchResult, TimeHint};
use crate::tools::error::ToolError;

pub const DEFAULT_BASE_URL: &str = "https://api.search.brave.com/res/v1";

pub struct BraveSearch {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl BraveSearch {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

fn freshness(hint: TimeHint) -> &'static str {
    match hint {
        TimeHint::Day => "pd",
        TimeHint::Week => "pw",
        TimeHint::Month => "pm",
        TimeHint::Year => "py",
    }
}

#[derive(Deserialize, Default)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Deserialize, Default)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveHit>,
}

#[derive(Deserialize)]
struct BraveHit {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[async_trait]
impl SearchProvider for BraveSearch {
    fn name(&self) -> &str {
        "brave"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, ToolError> {
        let mut params = vec![
            ("q", query.query.clone()),
            ("count", query.count.to_string()),
        ];
        if let Some(hint) = query.time_hint {
            params.push(("freshness", freshness(hint).to_string()));
        }

        let resp = self
            .client
            .get(format!("{}/web/search", self.base_url))
            .query(&params)
            .header(ACCEPT, "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ToolError::upstream_unavailable(format!(
                "Search failed: Brave returned HTTP {}",
                status.as_u16()
            )));
        }
        let body: BraveResponse = resp
            .json()
            .await
            .map_err(|e| ToolError::upstream_unavailable(format!("Search failed: {e}")))?;

        Ok(body
            .web
            .unwrap_or_default()
            .results
            .into_iter()
            .map(|hit| SearchResult {
                title: hit.title.filter(|t| !t.is_empty()).unwrap_or_else(|| hit.url.clone()),
                snippet: hit.snippet.or(hit.description).unwrap_or_default(),
                source: host_of(&hit.url).unwrap_or_else(|| "Brave".to_string()),
                url: hit.url,
            })
            .collect())
    }
}

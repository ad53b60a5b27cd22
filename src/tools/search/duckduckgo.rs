//! DuckDuckGo Instant Answer API. Used when no Brave key is configured.

use async_trait::async_trait;
use serde::Deserialize;

use super::{SearchProvider, SearchQuery, SearchResult};
use crate::tools::error::ToolError;

pub const DEFAULT_BASE_URL: &str = "https://api.duckduckgo.com";

pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    base_url: String,
}

impl DuckDuckGoSearch {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    abstract_text: String,
    #[serde(default)]
    heading: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    abstract_source: String,
    #[serde(default)]
    related_topics: Vec<serde_json::Value>,
}

fn no_results(query: &str) -> SearchResult {
    let url = reqwest::Url::parse_with_params("https://duckduckgo.com/", &[("q", query)])
        .map(String::from)
        .unwrap_or_else(|_| "https://duckduckgo.com/".to_string());
    SearchResult {
        title: "No instant results found".to_string(),
        snippet: format!("DuckDuckGo did not return instant answers for '{query}'."),
        url,
        source: "DuckDuckGo".to_string(),
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, ToolError> {
        let resp = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[
                ("q", query.query.as_str()),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ToolError::upstream_unavailable(format!(
                "Search failed: DuckDuckGo returned HTTP {}",
                status.as_u16()
            )));
        }
        // DuckDuckGo answers with `application/x-javascript`; decode the body by hand.
        let bytes = resp.bytes().await?;
        let answer: InstantAnswer = serde_json::from_slice(&bytes)
            .map_err(|e| ToolError::upstream_unavailable(format!("Search failed: {e}")))?;

        let mut results = Vec::new();
        if !answer.abstract_text.is_empty() {
            results.push(SearchResult {
                title: if answer.heading.is_empty() {
                    query.query.clone()
                } else {
                    answer.heading
                },
                snippet: answer.abstract_text,
                url: answer.abstract_url,
                source: if answer.abstract_source.is_empty() {
                    "DuckDuckGo".to_string()
                } else {
                    answer.abstract_source
                },
            });
        }
        for topic in &answer.related_topics {
            if results.len() >= query.count {
                break;
            }
            let Some(text) = topic.get("Text").and_then(|t| t.as_str()) else {
                continue;
            };
            results.push(SearchResult {
                title: text.chars().take(100).collect(),
                snippet: text.to_string(),
                url: topic
                    .get("FirstURL")
                    .and_then(|u| u.as_str())
                    .unwrap_or_default()
                    .to_string(),
                source: "DuckDuckGo".to_string(),
            });
        }
        if results.is_empty() {
            results.push(no_results(&query.query));
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn query(q: &str, count: usize) -> SearchQuery {
        SearchQuery {
            query: q.into(),
            count,
            time_hint: None,
        }
    }

    #[tokio::test]
    async fn abstract_comes_first_then_related_topics() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "tokio"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                serde_json::json!({
                    "AbstractText": "Tokio is an async runtime.",
                    "Heading": "Tokio",
                    "AbstractURL": "https://tokio.rs/",
                    "AbstractSource": "Wikipedia",
                    "RelatedTopics": [
                        { "Text": "Mio - metal IO", "FirstURL": "https://duckduckgo.com/Mio" },
                        { "Name": "Group without text", "Topics": [] },
                        { "Text": "Hyper - HTTP", "FirstURL": "https://duckduckgo.com/Hyper" },
                        { "Text": "Axum", "FirstURL": "https://duckduckgo.com/Axum" }
                    ]
                })
                .to_string(),
            ))
            .mount(&server)
            .await;

        let ddg = DuckDuckGoSearch::new(reqwest::Client::new(), server.uri());
        let results = ddg.search(&query("tokio", 3)).await.unwrap();

        let titles: Vec<_> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Tokio", "Mio - metal IO", "Hyper - HTTP"]);
        assert_eq!(results[0].source, "Wikipedia");
    }

    #[tokio::test]
    async fn empty_answer_yields_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let ddg = DuckDuckGoSearch::new(reqwest::Client::new(), server.uri());
        let results = ddg.search(&query("obscure thing", 3)).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "No instant results found");
        assert_eq!(results[0].url, "https://duckduckgo.com/?q=obscure+thing");
    }
}

//! `search_web`: provider search with per-turn memoization.

use serde_json::{json, Value};

use crate::tools::arguments::SearchArgs;
use crate::tools::error::ToolError;
use crate::tools::search::{dedupe_results, SearchCache, SearchProvider, SearchQuery};

/// Run a search, answering repeated identical searches from `cache`.
pub async fn search_web(
    args: &SearchArgs,
    provider: &dyn SearchProvider,
    max_results: usize,
    cache: &SearchCache,
) -> Result<Value, ToolError> {
    let query = args.query.trim();
    if query.is_empty() {
        return Err(ToolError::invalid_arguments("Query cannot be empty"));
    }

    let key = SearchCache::key(query, args.time_hint, args.after.as_deref(), args.before.as_deref());
    if let Some(hit) = cache.get(&key).await {
        tracing::debug!(query, "search answered from turn cache");
        return Ok(hit);
    }

    let count = args.result_count(max_results);
    let results = provider
        .search(&SearchQuery {
            query: query.to_string(),
            count,
            time_hint: args.time_hint,
        })
        .await?;
    let results = dedupe_results(results, count);

    let value = json!({
        "query": query,
        "num_results": results.len(),
        "results": results,
        "provider": provider.name(),
    });
    cache.insert(key, value.clone()).await;
    Ok(value)
}

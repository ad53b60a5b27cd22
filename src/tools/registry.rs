//! Tool registry and executor.
//!
//! The registry is immutable once built and is shared across turns behind an
//! `Arc`. Per-turn state (search cache, prompt time hints) travels in
//! [`ToolExecutionContext`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;

use super::arguments::ToolInput;
use super::builtin::{calculator, clock, web_search, ToolKind};
use super::error::ToolError;
use super::search::{
    brave, duckduckgo, BraveSearch, DuckDuckGoSearch, SearchCache, SearchProvider, TimeConstraint,
    MAX_RESULTS, MIN_RESULTS,
};
use super::types::ToolDefinition;
use crate::types::{ToolCallArguments, ToolCallResult};
use crate::util::with_timeout;

/// Per-turn inputs to tool execution.
#[derive(Debug, Clone, Default)]
pub struct ToolExecutionContext {
    pub turn_id: String,
    /// Recency window found in the prompt, merged into `search_web` calls.
    pub time_constraint: Option<TimeConstraint>,
    pub search_cache: SearchCache,
}

impl ToolExecutionContext {
    pub fn new(turn_id: impl Into<String>) -> Self {
        Self {
            turn_id: turn_id.into(),
            ..Self::default()
        }
    }
}

/// The fixed set of invocable tools.
#[derive(Clone)]
pub struct ToolRegistry {
    search: Arc<dyn SearchProvider>,
    max_results: usize,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("search", &self.search.name())
            .field("max_results", &self.max_results)
            .finish()
    }
}

impl ToolRegistry {
    pub fn new(search: Arc<dyn SearchProvider>) -> Self {
        Self {
            search,
            max_results: 3,
        }
    }

    /// Brave when a key is given, DuckDuckGo otherwise, at the public endpoints.
    pub fn with_default_search(client: reqwest::Client, brave_api_key: Option<String>) -> Self {
        match brave_api_key {
            Some(key) => Self::new(Arc::new(BraveSearch::new(client, key, brave::DEFAULT_BASE_URL))),
            None => Self::new(Arc::new(DuckDuckGoSearch::new(
                client,
                duckduckgo::DEFAULT_BASE_URL,
            ))),
        }
    }

    /// Cap on results per search, kept within `1..=5`.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.clamp(MIN_RESULTS, MAX_RESULTS);
        self
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub fn names(&self) -> Vec<&'static str> {
        ToolKind::ALL.iter().map(|k| k.name()).collect()
    }

    /// Schemas advertised to the upstream model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        ToolKind::ALL.iter().map(|k| k.definition()).collect()
    }

    /// Run one tool call under a hard deadline. Never panics or hangs; every
    /// outcome, including an unknown name or a timeout, is a result.
    pub async fn execute(
        &self,
        call_id: &str,
        name: &str,
        arguments: &ToolCallArguments,
        timeout: Duration,
        ctx: &ToolExecutionContext,
    ) -> ToolCallResult {
        let started_at = Utc::now();
        let outcome = match name.parse::<ToolKind>() {
            Ok(kind) => with_timeout(timeout, self.run(kind, arguments, ctx)).await,
            Err(_) => Err(ToolError::unknown_tool(name, &self.names())),
        };
        let ended_at = Utc::now();

        match &outcome {
            Ok(_) => tracing::debug!(
                turn_id = %ctx.turn_id,
                call_id,
                tool = name,
                elapsed_ms = (ended_at - started_at).num_milliseconds(),
                "tool call completed"
            ),
            Err(err) => tracing::warn!(
                turn_id = %ctx.turn_id,
                call_id,
                tool = name,
                kind = %err.kind,
                error = %err.message,
                "tool call failed"
            ),
        }

        ToolCallResult {
            tool_call_id: call_id.to_string(),
            tool_name: name.to_string(),
            outcome,
            started_at,
            ended_at,
        }
    }

    async fn run(
        &self,
        kind: ToolKind,
        arguments: &ToolCallArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<Value, ToolError> {
        match ToolInput::decode(kind, arguments)? {
            ToolInput::WebSearch(mut args) => {
                if let Some(constraint) = &ctx.time_constraint {
                    args.apply_time_constraint(constraint);
                }
                web_search::search_web(&args, self.search.as_ref(), self.max_results, &ctx.search_cache)
                    .await
            }
            ToolInput::CurrentTime(args) => Ok(clock::current_time(&args, Utc::now())),
            ToolInput::Calculate(args) => calculator::calculate(&args),
        }
    }
}

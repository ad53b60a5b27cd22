//! Shared test helpers: a scripted upstream and stub search backends.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;

use toolturn::error::ToolturnError;
use toolturn::events::OutboundEvent;
use toolturn::provider::{CompletionProvider, CompletionRequest};
use toolturn::tools::search::{SearchProvider, SearchQuery, SearchResult};
use toolturn::tools::{ToolError, ToolRegistry};
use toolturn::turn::{TurnController, TurnOptions};
use toolturn::types::{Delta, DeltaStream, FinishReason, ToolCallFragment};

/// What one upstream call does.
pub enum Script {
    /// Replay these items, then end the stream.
    Deltas(Vec<Result<Delta, ToolturnError>>),
    /// Fail before the first delta.
    OpenError(ToolturnError),
}

/// Upstream that replays one script per call and records every request.
#[derive(Default)]
pub struct ScriptedProvider {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<DeltaStream, ToolturnError> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Deltas(items)) => Ok(futures::stream::iter(items).boxed()),
            Some(Script::OpenError(err)) => Err(err),
            None => Err(ToolturnError::InvalidState("no script left".into())),
        }
    }
}

/// A text answer split into chunks, ending with `stop`.
pub fn answer(chunks: &[&str]) -> Script {
    let mut items: Vec<Result<Delta, ToolturnError>> =
        chunks.iter().map(|c| Ok(Delta::content(*c))).collect();
    items.push(Ok(Delta::end(FinishReason::Stop)));
    Script::Deltas(items)
}

/// Whole tool calls `(id, name, arguments)`, ending with `tool_calls`.
pub fn tool_calls(calls: &[(&str, &str, Value)]) -> Script {
    let mut items: Vec<Result<Delta, ToolturnError>> = calls
        .iter()
        .map(|(id, name, args)| {
            Ok(Delta::ToolCallFragment(ToolCallFragment::atomic(
                *id,
                *name,
                args.to_string(),
            )))
        })
        .collect();
    items.push(Ok(Delta::end(FinishReason::ToolCalls)));
    Script::Deltas(items)
}

/// Search backend returning fixed results.
pub struct StubSearch {
    pub results: Vec<SearchResult>,
    pub calls: AtomicUsize,
    pub queries: Mutex<Vec<SearchQuery>>,
}

impl StubSearch {
    pub fn new(results: Vec<SearchResult>) -> Arc<Self> {
        Arc::new(Self {
            results,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn with_rust_results() -> Arc<Self> {
        Self::new(vec![
            SearchResult {
                title: "Rust 1.90 released".into(),
                url: "https://blog.rust-lang.org/2026/09/18/Rust-1.90.0/".into(),
                snippet: "The Rust team is happy to announce a new version".into(),
                source: "blog.rust-lang.org".into(),
            },
            SearchResult {
                title: "This Week in Rust".into(),
                url: "https://this-week-in-rust.org/".into(),
                snippet: "Handpicked Rust updates".into(),
                source: "this-week-in-rust.org".into(),
            },
        ])
    }
}

#[async_trait]
impl SearchProvider for StubSearch {
    fn name(&self) -> &str {
        "stub"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());
        Ok(self.results.clone())
    }
}

/// Increments a counter when dropped.
pub struct DropFlag(pub Arc<AtomicUsize>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Search backend that never answers. Counts started and abandoned searches.
#[derive(Default)]
pub struct HangingSearch {
    pub started: Arc<AtomicUsize>,
    pub dropped: Arc<AtomicUsize>,
}

#[async_trait]
impl SearchProvider for HangingSearch {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn search(&self, _query: &SearchQuery) -> Result<Vec<SearchResult>, ToolError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let _flag = DropFlag(self.dropped.clone());
        futures::future::pending::<()>().await;
        Ok(Vec::new())
    }
}

pub fn options(clamp_limit: usize, tool_timeout: Duration) -> TurnOptions {
    TurnOptions {
        clamp_limit,
        tool_timeout,
        ..TurnOptions::default()
    }
}

pub fn controller(
    provider: Arc<dyn CompletionProvider>,
    search: Arc<dyn SearchProvider>,
    options: TurnOptions,
) -> TurnController {
    TurnController::new(provider, Arc::new(ToolRegistry::new(search))).with_options(options)
}

/// `type` tags in order.
pub fn kinds(events: &[OutboundEvent]) -> Vec<&'static str> {
    events.iter().map(OutboundEvent::kind).collect()
}

/// Concatenated `content` payloads.
pub fn content_text(events: &[OutboundEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            OutboundEvent::Content { content, .. } => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

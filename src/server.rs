//! HTTP surface: `GET /api/chat/stream` (server-sent events) and `GET /health`.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::{Json, Router};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::config::{TurnConfig, API_KEY_ENV};
use crate::error::{Result, ToolturnError};
use crate::events::{missing_api_key_events, OutboundEvent};
use crate::tools::ToolKind;
use crate::turn::{TurnController, TurnRequest};
use crate::types::{GenerationSettings, ReasoningEffort, ResponseFormat, ToolChoice};

/// Model used when the request names none.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Upper bound for a per-request `max_tool_calls`.
pub const MAX_TOOL_CALLS_CEILING: usize = 20;

/// Shared handler state. `controller` is `None` when no API key is configured.
#[derive(Clone, Debug)]
pub struct AppState {
    pub controller: Option<Arc<TurnController>>,
}

impl AppState {
    pub fn from_config(config: &TurnConfig) -> Result<Self> {
        let controller = match config.api_key() {
            Some(_) => Some(Arc::new(config.build_controller()?)),
            None => {
                tracing::warn!("{API_KEY_ENV} is not set; chat streams will only carry a warning");
                None
            }
        };
        Ok(Self { controller })
    }
}

/// Query parameters of `GET /api/chat/stream`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatQuery {
    pub model: Option<String>,
    #[serde(default)]
    pub prompt: String,
    pub system: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
    pub reasoning_effort: Option<String>,
    pub tool_choice: Option<String>,
    pub max_tool_calls: Option<usize>,
    pub top_k: Option<u32>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub repetition_penalty: Option<f64>,
    pub min_p: Option<f64>,
    pub top_a: Option<f64>,
    pub seed: Option<u64>,
    pub response_format: Option<String>,
    pub stop: Option<String>,
}

impl ChatQuery {
    pub fn into_turn_request(self) -> TurnRequest {
        let known: Vec<&str> = ToolKind::ALL.iter().map(|k| k.name()).collect();
        let settings = GenerationSettings {
            temperature: Some(self.temperature.unwrap_or(0.7)),
            top_p: Some(self.top_p.unwrap_or(1.0)),
            max_tokens: self.max_tokens,
            top_k: self.top_k,
            frequency_penalty: self.frequency_penalty,
            presence_penalty: self.presence_penalty,
            repetition_penalty: self.repetition_penalty,
            min_p: self.min_p,
            top_a: self.top_a,
            seed: self.seed,
            stop_sequences: self
                .stop
                .as_deref()
                .and_then(GenerationSettings::parse_stop_sequences),
            response_format: self.response_format.as_deref().and_then(ResponseFormat::parse),
            reasoning_effort: self
                .reasoning_effort
                .as_deref()
                .and_then(ReasoningEffort::parse_opt),
        };
        let model = self
            .model
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        TurnRequest::builder()
            .model(model)
            .prompt(self.prompt)
            .maybe_system(self.system)
            .settings(settings)
            .tool_choice(
                self.tool_choice
                    .as_deref()
                    .map(|raw| ToolChoice::parse(raw, &known))
                    .unwrap_or_default(),
            )
            .maybe_clamp_limit(self.max_tool_calls.map(|n| n.clamp(1, MAX_TOOL_CALLS_CEILING)))
            .build()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub upstream_configured: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat/stream", get(stream_chat))
        .route("/health", get(health))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: TurnConfig) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let listener = TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "listening");
    axum::serve(listener, router(state))
        .await
        .map_err(ToolturnError::Io)
}

/// Events for one chat request. Dropping the stream cancels the turn.
pub fn chat_events(state: &AppState, query: ChatQuery) -> BoxStream<'static, OutboundEvent> {
    match &state.controller {
        Some(controller) => {
            let handle = controller.start(query.into_turn_request());
            tracing::debug!(turn_id = handle.turn_id(), "chat stream opened");
            handle.into_event_stream().boxed()
        }
        None => stream::iter(missing_api_key_events(API_KEY_ENV)).boxed(),
    }
}

async fn stream_chat(
    State(state): State<AppState>,
    Query(query): Query<ChatQuery>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let events = chat_events(&state, query).map(|event| Ok(Event::default().data(event.to_json())));
    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        upstream_configured: state.controller.is_some(),
    })
}

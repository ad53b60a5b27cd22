//! Upstream completion adapter.
//!
//! A [`CompletionProvider`] wraps one streaming call to the model endpoint and
//! presents it as a [`DeltaStream`]. Provider-specific streaming differences
//! are normalized here so the turn controller only ever sees [`Delta`]s.
//!
//! [`Delta`]: crate::types::Delta

pub mod http;
pub mod openrouter;
pub mod quirks;

use async_trait::async_trait;

use crate::error::ToolturnError;
use crate::tools::ToolDefinition;
use crate::types::{DeltaStream, GenerationSettings, ModelMessage, ToolChoice};

pub use openrouter::OpenRouterProvider;
pub use quirks::{provider_id, ProviderQuirks};

/// One upstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ModelMessage>,
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: ToolChoice,
    pub settings: GenerationSettings,
}

/// Streaming completion endpoint.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name used in logs.
    fn provider_name(&self) -> &str;

    /// Open a streaming completion.
    ///
    /// Errors before the first delta (connect, HTTP status) are returned
    /// directly; failures after that arrive as a terminal `Err` item.
    async fn complete(&self, request: &CompletionRequest) -> Result<DeltaStream, ToolturnError>;
}

//! What a client asks for when starting a turn.

use bon::Builder;

use crate::types::{GenerationSettings, ModelMessage, ToolChoice};

/// Text sent as the user message when the prompt is blank.
const EMPTY_PROMPT: &str = "Hello";

/// Input for one turn.
#[derive(Debug, Clone, Builder)]
pub struct TurnRequest {
    #[builder(into)]
    pub model: String,
    #[builder(into, default)]
    pub prompt: String,
    #[builder(into)]
    pub system: Option<String>,
    #[builder(default)]
    pub settings: GenerationSettings,
    /// Applied to the first upstream call only.
    #[builder(default)]
    pub tool_choice: ToolChoice,
    /// When false the turn makes a single tool-free call.
    #[builder(default = true)]
    pub tools_enabled: bool,
    /// Overrides the configured clamp for this turn.
    pub clamp_limit: Option<usize>,
}

impl TurnRequest {
    /// Optional system message followed by the user prompt.
    pub fn initial_messages(&self) -> Vec<ModelMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = self.system.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            messages.push(ModelMessage::system(system));
        }
        let prompt = self.prompt.trim();
        messages.push(ModelMessage::user(if prompt.is_empty() {
            EMPTY_PROMPT
        } else {
            prompt
        }));
        messages
    }

    /// Text scanned for recency hints.
    pub fn hint_text(&self) -> String {
        match &self.system {
            Some(system) => format!("{system}\n{}", self.prompt),
            None => self.prompt.clone(),
        }
    }
}

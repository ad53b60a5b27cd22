//! Sampling settings, tool choice and finish reasons.

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Sampling parameters passed through to the upstream model.
#[derive(Debug, Clone, Builder, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationSettings {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_k: Option<u32>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub repetition_penalty: Option<f64>,
    pub min_p: Option<f64>,
    pub top_a: Option<f64>,
    pub seed: Option<u64>,
    pub stop_sequences: Option<Vec<String>>,
    pub response_format: Option<ResponseFormat>,
    pub reasoning_effort: Option<ReasoningEffort>,
}

impl GenerationSettings {
    /// Split a comma or newline separated stop list. Blank entries are dropped.
    pub fn parse_stop_sequences(raw: &str) -> Option<Vec<String>> {
        let stops: Vec<String> = raw
            .split([',', '\n'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        (!stops.is_empty()).then_some(stops)
    }
}

/// Requested response format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    JsonObject,
    /// A provider-native response_format object, forwarded verbatim.
    Custom { value: serde_json::Value },
}

impl ResponseFormat {
    /// Accepts a JSON object or the `json` / `json_object` shorthand.
    pub fn parse(raw: &str) -> Option<Self> {
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }
        if let Ok(value @ serde_json::Value::Object(_)) = serde_json::from_str(text) {
            return Some(Self::Custom { value });
        }
        match text.to_ascii_lowercase().as_str() {
            "json" | "json_object" | "jsonobject" => Some(Self::JsonObject),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::JsonObject => serde_json::json!({ "type": "json_object" }),
            Self::Custom { value } => value.clone(),
        }
    }
}

/// Reasoning effort level for reasoning models.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ReasoningEffort {
    Minimal,
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    /// `auto` (or an empty value) means "let the provider decide".
    pub fn parse_opt(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("auto") {
            return None;
        }
        raw.parse().ok()
    }
}

/// How the model may use tools on one upstream call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    #[default]
    Auto,
    None,
    Required,
    Function(String),
}

impl ToolChoice {
    /// Parse `auto | none | required | <tool name>`. Unknown tool names fall back to `auto`.
    pub fn parse(raw: &str, known_tools: &[&str]) -> Self {
        match raw.trim() {
            "" | "auto" => Self::Auto,
            "none" => Self::None,
            "required" => Self::Required,
            name if known_tools.contains(&name) => Self::Function(name.to_string()),
            _ => Self::Auto,
        }
    }
}

/// Why an upstream call ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FinishReason {
    /// The model finished its answer.
    Stop,
    /// The model stopped to call tools.
    ToolCalls,
    /// A configured stop condition (token limit) was hit.
    Length,
    ContentFilter,
}

impl FinishReason {
    /// Map an OpenAI-style finish_reason string.
    pub fn from_openai(raw: &str) -> Option<Self> {
        match raw {
            "stop" | "end_turn" | "stop_sequence" => Some(Self::Stop),
            "tool_calls" | "function_call" | "tool_use" => Some(Self::ToolCalls),
            "length" | "max_tokens" => Some(Self::Length),
            "content_filter" => Some(Self::ContentFilter),
            _ => None,
        }
    }
}

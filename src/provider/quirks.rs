//! Per-provider request adjustments for models routed through OpenRouter.

use serde_json::{json, Value};

use crate::types::ToolChoice;

/// Provider id of a routed model id: the part before `/` or `:`, with `-`
/// removed (`x-ai/grok-4` → `xai`).
pub fn provider_id(model: &str) -> String {
    model
        .split('/')
        .next()
        .unwrap_or_default()
        .split(':')
        .next()
        .unwrap_or_default()
        .replace('-', "")
        .to_ascii_lowercase()
}

/// Known constraints of one upstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderQuirks {
    /// Send `parallel_tool_calls: false` when tools are present.
    pub serial_tool_calls: bool,
    pub supports_response_format: bool,
    /// Whether a specific function may be forced via `tool_choice`.
    pub supports_forced_tool: bool,
}

impl ProviderQuirks {
    pub fn for_model(model: &str) -> Self {
        let provider = provider_id(model);
        let xai = provider == "xai";
        Self {
            serial_tool_calls: xai || provider == "anthropic",
            supports_response_format: !xai,
            supports_forced_tool: !xai,
        }
    }

    /// Wire value for `tool_choice`, degrading unsupported forcing to `auto`.
    pub fn tool_choice_json(&self, choice: &ToolChoice) -> Value {
        match choice {
            ToolChoice::Auto => json!("auto"),
            ToolChoice::None => json!("none"),
            ToolChoice::Required if self.supports_forced_tool => json!("required"),
            ToolChoice::Function(name) if self.supports_forced_tool => {
                json!({ "type": "function", "function": { "name": name } })
            }
            ToolChoice::Required | ToolChoice::Function(_) => json!("auto"),
        }
    }
}

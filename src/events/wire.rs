//! Outbound wire protocol.
//!
//! Each event is one server-sent-events frame: `data: <json>\n\n`, where the
//! JSON object carries a `type` tag.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::{ToolCategory, ToolMetadata, ToolVisibility};
use crate::types::{ToolCall, ToolCallResult};

/// Warning code attached when the per-turn tool ceiling trims calls.
pub const TOOL_CLAMP_CODE: &str = "TOOL_CLAMP";

/// Content emitted when a turn ends without any answer text.
pub const EMPTY_ANSWER_FALLBACK: &str = "No additional content generated.";

/// A tool call as listed in a `tool_calls` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    pub name: String,
    /// Argument text as the model produced it.
    pub arguments: String,
}

impl From<&ToolCall> for WireToolCall {
    fn from(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.to_json_text(),
        }
    }
}

/// Events delivered to the client, in emission order.
///
/// `round` is the 0-based upstream call that produced the event, so a client
/// can group reasoning and tool activity without tracking state itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    Reasoning {
        content: String,
        round: u32,
    },
    ToolCalls {
        calls: Vec<WireToolCall>,
        round: u32,
    },
    ToolExecuting {
        id: String,
        name: String,
        category: ToolCategory,
        visibility: ToolVisibility,
        round: u32,
    },
    ToolResult {
        id: String,
        name: String,
        /// `{"success": true, "result": ..}` or `{"success": false, "error": .., "message": ..}`.
        result: Value,
        category: ToolCategory,
        visibility: ToolVisibility,
        round: u32,
    },
    Content {
        content: String,
        round: u32,
    },
    Warning {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
    /// Carries `done: true` for clients that key on the flag.
    Done {
        #[serde(default = "done_flag")]
        done: bool,
    },
    Error {
        error: String,
    },
}

fn done_flag() -> bool {
    true
}

impl OutboundEvent {
    pub fn done() -> Self {
        Self::Done { done: true }
    }

    pub fn tool_executing(call: &ToolCall, round: u32) -> Self {
        let meta = ToolMetadata::for_tool(&call.name);
        Self::ToolExecuting {
            id: call.id.clone(),
            name: call.name.clone(),
            category: meta.category,
            visibility: meta.visibility,
            round,
        }
    }

    pub fn tool_result(result: &ToolCallResult, round: u32) -> Self {
        let meta = ToolMetadata::for_tool(&result.tool_name);
        Self::ToolResult {
            id: result.tool_call_id.clone(),
            name: result.tool_name.clone(),
            result: result.payload(),
            category: meta.category,
            visibility: meta.visibility,
            round,
        }
    }

    pub fn clamp_warning(limit: usize) -> Self {
        Self::Warning {
            message: format!("Trimmed tool calls to {limit}"),
            code: Some(TOOL_CLAMP_CODE.to_string()),
        }
    }

    /// `done` and `error` end a turn's stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// The `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Reasoning { .. } => "reasoning",
            Self::ToolCalls { .. } => "tool_calls",
            Self::ToolExecuting { .. } => "tool_executing",
            Self::ToolResult { .. } => "tool_result",
            Self::Content { .. } => "content",
            Self::Warning { .. } => "warning",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    /// JSON payload of the frame.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({ "type": "error", "error": format!("event serialization failed: {e}") })
                .to_string()
        })
    }

    /// Full SSE frame.
    pub fn to_sse(&self) -> String {
        format!("data: {}\n\n", self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ToolError, ToolErrorKind};
    use crate::types::ToolCallArguments;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn frames_are_data_lines_with_a_type_tag() {
        let event = OutboundEvent::Content {
            content: "Hi".into(),
            round: 0,
        };
        assert_eq!(event.to_sse(), "data: {\"type\":\"content\",\"content\":\"Hi\",\"round\":0}\n\n");
        assert_eq!(OutboundEvent::done().to_json(), r#"{"type":"done","done":true}"#);
        let parsed: OutboundEvent = serde_json::from_str(r#"{"type":"done"}"#).unwrap();
        assert_eq!(parsed, OutboundEvent::done());
    }

    #[test]
    fn tool_events_carry_correlation_and_metadata() {
        let call = ToolCall {
            id: "call_7".into(),
            name: "search_web".into(),
            arguments: ToolCallArguments::Parsed(json!({"query": "rust"})),
        };
        let executing: Value = serde_json::from_str(&OutboundEvent::tool_executing(&call, 1).to_json()).unwrap();
        assert_eq!(
            executing,
            json!({
                "type": "tool_executing",
                "id": "call_7",
                "name": "search_web",
                "category": "search",
                "visibility": "primary",
                "round": 1,
            })
        );

        let result = ToolCallResult::rejected(
            "call_7",
            "search_web",
            ToolError::new(ToolErrorKind::Timeout, "tool timed out after 7500ms"),
        );
        let frame: Value = serde_json::from_str(&OutboundEvent::tool_result(&result, 1).to_json()).unwrap();
        assert_eq!(frame["id"], "call_7");
        assert_eq!(frame["result"]["success"], false);
        assert_eq!(frame["result"]["error"], "timeout");
    }

    #[test]
    fn clamp_warning_has_a_code() {
        let frame: Value = serde_json::from_str(&OutboundEvent::clamp_warning(10).to_json()).unwrap();
        assert_eq!(
            frame,
            json!({ "type": "warning", "message": "Trimmed tool calls to 10", "code": "TOOL_CLAMP" })
        );
        assert!(!OutboundEvent::clamp_warning(1).is_terminal());
        assert!(OutboundEvent::Error { error: "x".into() }.is_terminal());
    }

    #[test]
    fn wire_tool_calls_keep_raw_argument_text() {
        let call = ToolCall {
            id: "a".into(),
            name: "calculate".into(),
            arguments: ToolCallArguments::Raw("{oops".into()),
        };
        assert_eq!(WireToolCall::from(&call).arguments, "{oops");
    }
}

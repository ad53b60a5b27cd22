//! Conversation message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message in the turn's conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMessage {
    pub role: Role,
    pub content: Vec<ContentPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ModelMessage {
    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_text(Role::System, text)
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_text(Role::User, text)
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_text(Role::Assistant, text)
    }

    /// Assistant message carrying optional text plus the tool calls it requested.
    pub fn assistant_tool_calls(text: impl Into<String>, calls: &[ToolCall]) -> Self {
        let text = text.into();
        let mut content = Vec::with_capacity(calls.len() + 1);
        if !text.is_empty() {
            content.push(ContentPart::Text { text });
        }
        content.extend(calls.iter().cloned().map(ContentPart::ToolCall));
        Self {
            role: Role::Assistant,
            content,
            timestamp: Some(Utc::now()),
        }
    }

    /// Create a tool response message.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        content: serde_json::Value,
        is_error: bool,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: vec![ContentPart::ToolResult(ToolResultContent {
                tool_call_id: tool_call_id.into(),
                content,
                is_error,
            })],
            timestamp: Some(Utc::now()),
        }
    }

    fn with_text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![ContentPart::Text { text: text.into() }],
            timestamp: Some(Utc::now()),
        }
    }

    /// Concatenated text parts.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Tool calls carried by this message.
    pub fn tool_calls(&self) -> Vec<&ToolCall> {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolCall(tc) => Some(tc),
                _ => None,
            })
            .collect()
    }
}

/// Conversation role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single part of message content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ToolCall(ToolCall),
    ToolResult(ToolResultContent),
}

/// A fully assembled tool invocation as requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: ToolCallArguments,
}

/// Arguments of a tool call.
///
/// Argument text that is not well-formed JSON is kept verbatim so the call is
/// never dropped; execution rejects it with an `invalid_arguments` failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ToolCallArguments {
    Parsed(serde_json::Value),
    Raw(String),
}

impl ToolCallArguments {
    /// Parse buffered argument text. Blank text is treated as `{}`.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Self::Parsed(serde_json::Value::Object(Default::default()));
        }
        match serde_json::from_str(trimmed) {
            Ok(value) => Self::Parsed(value),
            Err(_) => Self::Raw(text.to_string()),
        }
    }

    /// Argument text as it is sent back upstream and shown on the wire.
    pub fn to_json_text(&self) -> String {
        match self {
            Self::Parsed(value) => value.to_string(),
            Self::Raw(raw) => raw.clone(),
        }
    }

    pub fn as_parsed(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::Raw(_) => None,
        }
    }
}

/// Content of a tool response message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResultContent {
    pub tool_call_id: String,
    pub content: serde_json::Value,
    #[serde(default)]
    pub is_error: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn well_formed_argument_text_is_parsed() {
        let args = ToolCallArguments::from_text(r#"{"query": "rust"}"#);
        assert_eq!(args, ToolCallArguments::Parsed(json!({"query": "rust"})));
    }

    #[test]
    fn malformed_argument_text_falls_back_to_raw() {
        let args = ToolCallArguments::from_text(r#"{"query": "rust""#);
        assert_eq!(args, ToolCallArguments::Raw(r#"{"query": "rust""#.into()));
        assert_eq!(args.to_json_text(), r#"{"query": "rust""#);
    }

    #[test]
    fn blank_argument_text_is_an_empty_object() {
        assert_eq!(
            ToolCallArguments::from_text("  "),
            ToolCallArguments::Parsed(json!({}))
        );
    }

    #[test]
    fn assistant_tool_call_message_skips_empty_text() {
        let call = ToolCall {
            id: "call_1".into(),
            name: "calculate".into(),
            arguments: ToolCallArguments::Parsed(json!({"expression": "1+1"})),
        };
        let msg = ModelMessage::assistant_tool_calls("", std::slice::from_ref(&call));
        assert_eq!(msg.content.len(), 1);
        assert_eq!(msg.tool_calls(), vec![&call]);
    }
}

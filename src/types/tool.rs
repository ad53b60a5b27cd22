//! Tool call lifecycle records kept on a turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use strum::{Display, EnumString};

use super::message::{ToolCall, ToolCallArguments};
use crate::tools::ToolError;

/// Lifecycle status of a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolCallStatus {
    Assembling,
    Queued,
    Running,
    Completed,
    Failed,
}

impl ToolCallStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A tool call the model asked for, tracked for the life of the turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: ToolCallArguments,
    pub status: ToolCallStatus,
    /// Upstream round the call was requested in.
    pub round: u32,
}

impl ToolCallRequest {
    pub fn new(call: ToolCall, round: u32) -> Self {
        Self {
            id: call.id,
            name: call.name,
            arguments: call.arguments,
            status: ToolCallStatus::Queued,
            round,
        }
    }

    pub fn to_call(&self) -> ToolCall {
        ToolCall {
            id: self.id.clone(),
            name: self.name.clone(),
            arguments: self.arguments.clone(),
        }
    }
}

/// Outcome of one tool execution. Produced exactly once per request.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallResult {
    pub tool_call_id: String,
    pub tool_name: String,
    pub outcome: Result<Value, ToolError>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl ToolCallResult {
    /// A failure that never reached a tool (e.g. rejected by the clamp).
    pub fn rejected(call_id: impl Into<String>, tool_name: impl Into<String>, error: ToolError) -> Self {
        let now = Utc::now();
        Self {
            tool_call_id: call_id.into(),
            tool_name: tool_name.into(),
            outcome: Err(error),
            started_at: now,
            ended_at: now,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Normalized payload: `{"success":true,"result":..}` or
    /// `{"success":false,"error":"<kind>","message":..}`.
    pub fn payload(&self) -> Value {
        match &self.outcome {
            Ok(result) => json!({ "success": true, "result": result }),
            Err(err) => json!({
                "success": false,
                "error": err.kind.to_string(),
                "message": err.message,
            }),
        }
    }

    pub fn duration_ms(&self) -> i64 {
        (self.ended_at - self.started_at).num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolErrorKind;

    #[test]
    fn failure_payload_carries_kind_as_error_code() {
        let result = ToolCallResult::rejected(
            "call_1",
            "search_web",
            ToolError::new(ToolErrorKind::Timeout, "tool timed out after 7500ms"),
        );
        assert!(!result.is_success());
        assert_eq!(
            result.payload(),
            json!({
                "success": false,
                "error": "timeout",
                "message": "tool timed out after 7500ms",
            })
        );
    }

    #[test]
    fn terminal_statuses() {
        assert!(ToolCallStatus::Failed.is_terminal());
        assert!(!ToolCallStatus::Running.is_terminal());
        assert_eq!(ToolCallStatus::Assembling.to_string(), "assembling");
    }
}

//! Typed tool failures.
//!
//! Tool failures never abort a turn. They are carried inside a
//! [`ToolCallResult`](crate::types::ToolCallResult) and reported to the client
//! as a `tool_result` with `success: false`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Failure category. The string form is the wire `error` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolErrorKind {
    UnknownTool,
    InvalidArguments,
    Timeout,
    UpstreamUnavailable,
    Internal,
    /// Rejected because the per-turn tool call ceiling was reached.
    ClampExceeded,
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unknown_tool(name: &str, available: &[&str]) -> Self {
        Self::new(
            ToolErrorKind::UnknownTool,
            format!("Unknown tool: {name}. Available tools: {}", available.join(", ")),
        )
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidArguments, message)
    }

    pub fn upstream_unavailable(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::UpstreamUnavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Internal, message)
    }

    pub fn clamp_exceeded(limit: usize) -> Self {
        Self::new(
            ToolErrorKind::ClampExceeded,
            format!("Tool call trimmed by clamp ({limit})"),
        )
    }
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ToolErrorKind::Timeout, err.to_string())
        } else {
            Self::upstream_unavailable(err.to_string())
        }
    }
}

//! Upstream delta types.

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use super::generation::FinishReason;
use crate::error::ToolturnError;

/// One unit of output from an upstream completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Delta {
    /// Incremental reasoning/thinking text.
    ReasoningText { text: String },
    /// Incremental final-answer text.
    ContentText { text: String },
    /// A piece of a tool invocation, keyed by call id.
    ToolCallFragment(ToolCallFragment),
    /// The upstream call finished.
    TurnEnd { finish_reason: FinishReason },
}

impl Delta {
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self::ReasoningText { text: text.into() }
    }

    pub fn content(text: impl Into<String>) -> Self {
        Self::ContentText { text: text.into() }
    }

    pub fn end(finish_reason: FinishReason) -> Self {
        Self::TurnEnd { finish_reason }
    }
}

/// Partial tool call.
///
/// `name` and `arguments` may arrive in separate fragments. `complete` marks
/// the last fragment for this call id; providers that never mark calls as
/// complete rely on [`Delta::TurnEnd`] to close them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallFragment {
    pub call_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
    #[serde(default)]
    pub complete: bool,
}

impl ToolCallFragment {
    /// A whole tool call delivered at once.
    pub fn atomic(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            name: Some(name.into()),
            arguments: Some(arguments.into()),
            complete: true,
        }
    }
}

/// Lazy sequence of deltas. An `Err` item is terminal.
pub type DeltaStream = BoxStream<'static, Result<Delta, ToolturnError>>;

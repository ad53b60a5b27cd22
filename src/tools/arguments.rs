//! Typed, validated arguments per tool.
//!
//! Model-supplied JSON is checked against the tool's schema and decoded into
//! one variant of [`ToolInput`]; nothing downstream handles untyped maps.

use serde::Deserialize;
use serde_json::Value;

use super::builtin::ToolKind;
use super::error::ToolError;
use super::search::{TimeConstraint, TimeHint};
use super::validation::validate_arguments;
use crate::types::ToolCallArguments;

/// Longest argument text echoed back in an error message.
const RAW_PREVIEW_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchArgs {
    pub query: String,
    #[serde(default)]
    pub num_results: Option<f64>,
    #[serde(default)]
    pub time_hint: Option<TimeHint>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
}

impl SearchArgs {
    /// Requested result count clamped into `1..=max`. Defaults to `max`.
    pub fn result_count(&self, max: usize) -> usize {
        let max = max.max(1);
        match self.num_results {
            Some(n) if n.is_finite() => (n.round().max(1.0) as usize).min(max),
            _ => max,
        }
    }

    /// Fill time fields the model left out from a prompt-derived constraint.
    pub fn apply_time_constraint(&mut self, constraint: &TimeConstraint) {
        if self.time_hint.is_none() {
            self.time_hint = Some(constraint.time_hint);
        }
        if self.after.is_none() {
            self.after = Some(constraint.after.format("%Y-%m-%d").to_string());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct CurrentTimeArgs {
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CalculateArgs {
    pub expression: String,
}

/// Decoded arguments, one variant per tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInput {
    WebSearch(SearchArgs),
    CurrentTime(CurrentTimeArgs),
    Calculate(CalculateArgs),
}

impl ToolInput {
    /// Validate and decode call arguments for `kind`.
    ///
    /// Raw (unparseable) argument text is rejected as `invalid_arguments`.
    pub fn decode(kind: ToolKind, arguments: &ToolCallArguments) -> Result<Self, ToolError> {
        let value = match arguments {
            ToolCallArguments::Parsed(value) => value,
            ToolCallArguments::Raw(raw) => {
                let preview: String = raw.chars().take(RAW_PREVIEW_CHARS).collect();
                return Err(ToolError::invalid_arguments(format!(
                    "Invalid arguments for '{kind}': argument text is not valid JSON: {preview}"
                )));
            }
        };
        validate_arguments(value, &kind.parameters().schema).map_err(|err| {
            ToolError::invalid_arguments(format!("Invalid arguments for '{kind}': {}", err.message))
        })?;

        Ok(match kind {
            ToolKind::WebSearch => Self::WebSearch(from_value(kind, value)?),
            ToolKind::CurrentTime => Self::CurrentTime(from_value(kind, value)?),
            ToolKind::Calculate => Self::Calculate(from_value(kind, value)?),
        })
    }
}

fn from_value<T: serde::de::DeserializeOwned>(kind: ToolKind, value: &Value) -> Result<T, ToolError> {
    serde_json::from_value(value.clone())
        .map_err(|e| ToolError::invalid_arguments(format!("Invalid arguments for '{kind}': {e}")))
}

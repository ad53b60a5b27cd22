//! The fixed tool catalog: `search_web`, `get_current_time`, `calculate`.

pub mod calculator;
pub mod clock;
pub mod web_search;

use strum::{Display, EnumString};

use super::types::{ToolDefinition, ToolMetadata, ToolParameters};

/// Every tool the registry can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum ToolKind {
    #[strum(serialize = "search_web")]
    WebSearch,
    #[strum(serialize = "get_current_time")]
    CurrentTime,
    #[strum(serialize = "calculate")]
    Calculate,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [Self::WebSearch, Self::CurrentTime, Self::Calculate];

    pub fn name(self) -> &'static str {
        match self {
            Self::WebSearch => "search_web",
            Self::CurrentTime => "get_current_time",
            Self::Calculate => "calculate",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::WebSearch => {
                "Search the web for current information. Returns top search results with titles, snippets, and URLs."
            }
            Self::CurrentTime => "Get the current date and time in ISO 8601 format.",
            Self::Calculate => {
                "Safely evaluate a mathematical expression. Supports basic arithmetic: +, -, *, /, ** (power). No variables or functions allowed."
            }
        }
    }

    pub fn parameters(self) -> ToolParameters {
        match self {
            Self::WebSearch => ToolParameters::object()
                .string("query", "The search query to look up", true)
                .integer("num_results", "Number of results to return (1-5)", 3)
                .string_enum(
                    "time_hint",
                    "Restrict results to a recent period",
                    &["day", "week", "month", "year"],
                )
                .string("after", "Only results after this date (YYYY-MM-DD)", false)
                .string("before", "Only results before this date (YYYY-MM-DD)", false)
                .build(),
            Self::CurrentTime => ToolParameters::object()
                .string(
                    "timezone",
                    "Timezone name (e.g., 'UTC', 'America/New_York'). Defaults to UTC.",
                    false,
                )
                .build(),
            Self::Calculate => ToolParameters::object()
                .string(
                    "expression",
                    "Mathematical expression to evaluate (e.g., '25 * 17 + 89')",
                    true,
                )
                .build(),
        }
    }

    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }

    pub fn metadata(self) -> ToolMetadata {
        ToolMetadata::for_tool(self.name())
    }
}

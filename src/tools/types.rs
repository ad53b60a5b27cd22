//! Tool schemas, definitions and display metadata.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// JSON Schema-based parameter definition for a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameters {
    /// JSON Schema object describing the parameters.
    pub schema: serde_json::Value,
}

impl ToolParameters {
    /// Builder: create an object schema with properties.
    pub fn object() -> ParameterBuilder {
        ParameterBuilder {
            properties: serde_json::Map::new(),
            required: Vec::new(),
        }
    }
}

/// Builder for constructing tool parameter schemas.
pub struct ParameterBuilder {
    properties: serde_json::Map<String, serde_json::Value>,
    required: Vec<String>,
}

impl ParameterBuilder {
    /// Add a string property.
    pub fn string(self, name: &str, description: &str, required: bool) -> Self {
        self.property(
            name,
            serde_json::json!({ "type": "string", "description": description }),
            required,
        )
    }

    /// Add an integer property with a default value.
    pub fn integer(self, name: &str, description: &str, default: i64) -> Self {
        self.property(
            name,
            serde_json::json!({ "type": "integer", "description": description, "default": default }),
            false,
        )
    }

    /// Add an optional string property restricted to `values`.
    pub fn string_enum(self, name: &str, description: &str, values: &[&str]) -> Self {
        self.property(
            name,
            serde_json::json!({ "type": "string", "description": description, "enum": values }),
            false,
        )
    }

    fn property(mut self, name: &str, schema: serde_json::Value, required: bool) -> Self {
        self.properties.insert(name.to_string(), schema);
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Build into ToolParameters.
    pub fn build(self) -> ToolParameters {
        ToolParameters {
            schema: serde_json::json!({
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            }),
        }
    }
}

/// What the upstream model is told about a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: ToolParameters,
}

impl ToolDefinition {
    /// OpenAI-compatible `{"type":"function","function":{..}}` schema.
    pub fn to_openai_json(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters.schema,
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolCategory {
    Search,
    Utility,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolVisibility {
    Primary,
    Secondary,
    Hidden,
}

/// Presentation hints attached to `tool_executing` / `tool_result` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub category: ToolCategory,
    pub visibility: ToolVisibility,
}

impl ToolMetadata {
    pub fn for_tool(name: &str) -> Self {
        let (category, visibility) = match name.to_ascii_lowercase().as_str() {
            "search_web" => (ToolCategory::Search, ToolVisibility::Primary),
            "get_current_time" | "calculate" => (ToolCategory::Utility, ToolVisibility::Hidden),
            _ => (ToolCategory::Other, ToolVisibility::Secondary),
        };
        Self {
            category,
            visibility,
        }
    }
}

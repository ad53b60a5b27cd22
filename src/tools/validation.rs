//! Check model-supplied arguments against a tool's JSON Schema.

use serde_json::Value;

use super::error::ToolError;

/// Top-level schema check run before typed decoding.
///
/// Verifies the object shape, presence of required fields, declared property
/// types and `enum` membership. Unknown extra fields are tolerated.
pub fn validate_arguments(args: &Value, schema: &Value) -> Result<(), ToolError> {
    if schema.get("type").and_then(Value::as_str) == Some("object") && !args.is_object() {
        return Err(ToolError::invalid_arguments(format!(
            "expected object arguments, got {}",
            json_type_name(args)
        )));
    }
    let Some(obj) = args.as_object() else {
        return Ok(());
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        if let Some(missing) = required
            .iter()
            .filter_map(Value::as_str)
            .find(|name| obj.get(*name).map_or(true, Value::is_null))
        {
            return Err(ToolError::invalid_arguments(format!(
                "missing required field '{missing}'"
            )));
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };
    for (key, value) in obj {
        let Some(prop) = properties.get(key) else {
            continue;
        };
        // Optional fields may be sent as explicit nulls.
        if value.is_null() {
            continue;
        }
        if let Some(expected) = prop.get("type").and_then(Value::as_str) {
            if !value_matches_type(value, expected) {
                return Err(ToolError::invalid_arguments(format!(
                    "field '{key}' expected type '{expected}', got {}",
                    json_type_name(value)
                )));
            }
        }
        if let Some(allowed) = prop.get("enum").and_then(Value::as_array) {
            if !allowed.contains(value) {
                return Err(ToolError::invalid_arguments(format!(
                    "field '{key}' must be one of {}",
                    Value::Array(allowed.clone())
                )));
            }
        }
    }

    Ok(())
}

fn value_matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        // Models frequently send `3.0` for integer fields.
        "integer" => value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|f| f.fract() == 0.0),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolErrorKind;
    use serde_json::json;

    fn search_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "num_results": { "type": "integer" },
                "time_hint": { "type": "string", "enum": ["day", "week", "month", "year"] },
            },
            "required": ["query"],
        })
    }

    #[test]
    fn rejects_non_object_arguments() {
        let err = validate_arguments(&json!("rust"), &search_schema()).unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::InvalidArguments);
        assert!(err.message.contains("expected object"));
    }

    #[test]
    fn rejects_missing_or_null_required_field() {
        let err = validate_arguments(&json!({}), &search_schema()).unwrap_err();
        assert!(err.message.contains("missing required field 'query'"));
        assert!(validate_arguments(&json!({ "query": null }), &search_schema()).is_err());
    }

    #[test]
    fn rejects_wrong_property_type() {
        let err =
            validate_arguments(&json!({ "query": 42 }), &search_schema()).unwrap_err();
        assert!(err.message.contains("field 'query' expected type 'string'"));
    }

    #[test]
    fn integer_fields_accept_whole_floats_only() {
        let schema = search_schema();
        assert!(validate_arguments(&json!({ "query": "q", "num_results": 3.0 }), &schema).is_ok());
        assert!(validate_arguments(&json!({ "query": "q", "num_results": 2.5 }), &schema).is_err());
    }

    #[test]
    fn enforces_enum_membership() {
        let schema = search_schema();
        assert!(validate_arguments(&json!({ "query": "q", "time_hint": "week" }), &schema).is_ok());
        let err = validate_arguments(&json!({ "query": "q", "time_hint": "decade" }), &schema)
            .unwrap_err();
        assert!(err.message.contains("time_hint"));
    }

    #[test]
    fn tolerates_extra_fields_and_empty_schema() {
        assert!(validate_arguments(&json!({ "query": "q", "extra": true }), &search_schema()).is_ok());
        assert!(validate_arguments(&json!({ "anything": 1 }), &json!({})).is_ok());
    }
}

//! Validate tool call arguments against JSON Schema before execution.

use serde_json::Value;

/// Validate tool arguments against a JSON Schema.
///
/// Checks the object type, required field presence, property types, `enum`
/// membership, and recurses into nested object properties. Returns
/// `Err(message)` describing the first violation found; nested fields are
/// reported with a dotted path.
pub fn validate_arguments(args: &Value, schema: &Value) -> Result<(), String> {
    validate_at(args, schema, "")
}

fn validate_at(value: &Value, schema: &Value, path: &str) -> Result<(), String> {
    if let Some(expected) = schema.get("type").and_then(Value::as_str) {
        if !value_matches_type(value, expected) {
            return Err(if path.is_empty() {
                format!("expected {expected} arguments, got {}", json_type_name(value))
            } else {
                format!(
                    "field '{path}' expected type '{expected}', got {}",
                    json_type_name(value)
                )
            });
        }
    }

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            let label = if path.is_empty() { "arguments" } else { path };
            return Err(format!("field '{label}' must be one of {}", Value::from(allowed.clone())));
        }
    }

    let Some(obj) = value.as_object() else {
        return Ok(());
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if !obj.contains_key(name) {
                return Err(format!("missing required field '{}'", join(path, name)));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (key, field) in obj {
            if let Some(field_schema) = properties.get(key) {
                validate_at(field, field_schema, &join(path, key))?;
            }
        }
    }

    Ok(())
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn value_matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

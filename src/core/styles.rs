//! Style registry decoding.
//!
//! Styles arrive either as a map keyed by style id (current format) or as a list of objects
//! carrying an `id`. A malformed entry is skipped on its own and never aborts the rest.

use crate::domain::model::StyleDefinition;
use serde_json::Value;

/// Decode a style registry in encounter order.
///
/// Returns `None` when the registry is absent or `null`; a value of the wrong shape is logged
/// and treated as an empty registry.
pub fn decode_styles(raw: Option<&Value>) -> Option<Vec<StyleDefinition>> {
    let raw = raw?;
    let mut styles: Vec<StyleDefinition> = Vec::new();

    match raw {
        Value::Null => return None,
        Value::Object(map) => {
            for (key, entry) in map {
                let Value::Object(fields) = entry else {
                    tracing::warn!("⚠️ Style '{}' is not an object, skipping", key);
                    continue;
                };
                let mut fields = fields.clone();
                fields.insert("id".to_string(), Value::String(key.clone()));
                push_style(&mut styles, Value::Object(fields), key);
            }
        }
        Value::Array(entries) => {
            for (index, entry) in entries.iter().enumerate() {
                let label = entry
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("#{}", index));
                push_style(&mut styles, entry.clone(), &label);
            }
        }
        other => {
            tracing::warn!(
                "⚠️ Style registry has unexpected type ({}), ignoring it",
                json_type(other)
            );
        }
    }

    Some(styles)
}

fn push_style(styles: &mut Vec<StyleDefinition>, entry: Value, label: &str) {
    match serde_json::from_value::<StyleDefinition>(entry) {
        Ok(style) if styles.iter().any(|s| s.id == style.id) => {
            tracing::debug!("Style '{}' already registered, keeping the first", style.id);
        }
        Ok(style) => styles.push(style),
        Err(e) => tracing::warn!("⚠️ Skipping malformed style '{}': {}", label, e),
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

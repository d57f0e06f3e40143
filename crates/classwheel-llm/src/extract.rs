// Best-effort recovery of a JSON array of records from model output.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// Widest `[{ ... }]` span.
static EMBEDDED_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*\{[\s\S]*\}\s*\]").unwrap());

/// Pull an array of JSON values out of `text`.
///
/// Tries, in order: code fences stripped then a direct parse (a bare array, or
/// the first array-valued key of an object), then the widest `[{ ... }]` span
/// in the text. Returns an empty vec when nothing parses.
pub fn extract_json_array(text: &str) -> Vec<Value> {
    let cleaned = strip_code_fences(text);

    match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::Array(items)) => return items,
        Ok(Value::Object(map)) => {
            // First array-valued key in document order.
            return map
                .into_iter()
                .find_map(|(_, v)| match v {
                    Value::Array(items) => Some(items),
                    _ => None,
                })
                .unwrap_or_default();
        }
        Ok(_) => return Vec::new(),
        Err(e) => debug!(error = %e, "direct parse failed, scanning for embedded array"),
    }

    EMBEDDED_ARRAY
        .find(&cleaned)
        .and_then(|m| serde_json::from_str::<Vec<Value>>(m.as_str()).ok())
        .unwrap_or_default()
}

fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.contains("```") {
        return trimmed.to_string();
    }
    trimmed.replace("```json", "").replace("```", "").trim().to_string()
}

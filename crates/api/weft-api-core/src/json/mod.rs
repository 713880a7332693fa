use serde_json::{json, Value as JsonValue};
use thiserror::Error;

use crate::Value;

/// Errors produced while turning literal JSON into typed values.
#[derive(Debug, Error)]
pub enum JsonError {
    #[error("value json parse error: {0}")]
    Parse(String),
}

/// Normalize shorthand value JSON into the canonical `{ "type": ..., "data": ... }`
/// representation understood by the serde derives on [`Value`].
///
/// - numbers become `number`, booleans `bool`, strings `text`
/// - numeric arrays of length 3 become `point`, other arrays become `list`
/// - `{ "point": [..] }`, `{ "vector": [..] }`, `{ "integer": n }`,
///   `{ "segment": { "start", "end" } }`, `{ "list": [..] }` are expanded
/// - already tagged objects are left untouched; anything else is `opaque`
pub fn normalize_value_json(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Number(n) => json!({ "type": "number", "data": n }),
        JsonValue::Bool(b) => json!({ "type": "bool", "data": b }),
        JsonValue::String(s) => json!({ "type": "text", "data": s }),
        JsonValue::Null => json!({ "type": "opaque", "data": null }),
        JsonValue::Array(arr) => {
            let all_numbers = arr.iter().all(|x| x.is_number());
            if all_numbers && arr.len() == 3 {
                json!({ "type": "point", "data": arr })
            } else {
                let data: Vec<JsonValue> = arr.into_iter().map(normalize_value_json).collect();
                json!({ "type": "list", "data": data })
            }
        }
        JsonValue::Object(obj) => {
            if obj.contains_key("type") && obj.contains_key("data") {
                return JsonValue::Object(obj);
            }
            if let Some(f) = obj.get("number").and_then(|x| x.as_f64()) {
                return json!({ "type": "number", "data": f });
            }
            if let Some(i) = obj.get("integer").and_then(|x| x.as_i64()) {
                return json!({ "type": "integer", "data": i });
            }
            if let Some(b) = obj.get("bool").and_then(|x| x.as_bool()) {
                return json!({ "type": "bool", "data": b });
            }
            if let Some(text) = obj.get("text").and_then(|x| x.as_str()) {
                return json!({ "type": "text", "data": text });
            }
            if let Some(arr) = obj.get("point").and_then(|x| x.as_array()) {
                return json!({ "type": "point", "data": arr });
            }
            if let Some(arr) = obj.get("vector").and_then(|x| x.as_array()) {
                return json!({ "type": "vector", "data": arr });
            }
            if let Some(seg) = obj.get("segment").and_then(|x| x.as_object()) {
                let start = seg.get("start").cloned().unwrap_or(JsonValue::Null);
                let end = seg.get("end").cloned().unwrap_or(JsonValue::Null);
                return json!({ "type": "segment", "data": { "start": start, "end": end } });
            }
            if let Some(items) = obj.get("list").and_then(|x| x.as_array()) {
                let data: Vec<JsonValue> = items.iter().cloned().map(normalize_value_json).collect();
                return json!({ "type": "list", "data": data });
            }
            json!({ "type": "opaque", "data": JsonValue::Object(obj) })
        }
    }
}

/// Parse shorthand or tagged JSON into a [`Value`].
pub fn value_from_json(value: JsonValue) -> Result<Value, JsonError> {
    serde_json::from_value(normalize_value_json(value)).map_err(|e| JsonError::Parse(e.to_string()))
}

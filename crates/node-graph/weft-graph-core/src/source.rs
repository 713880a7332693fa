//! Graph document sources.
//!
//! A [`GraphSource`] turns document text into an unvalidated [`RawGraph`];
//! [`crate::normalize`] validates it afterwards. The JSON source accepts a few
//! shorthands that are rewritten before typed deserialization.

use serde_json::Value as JsonValue;

use crate::error::GraphError;
use crate::types::RawGraph;

pub trait GraphSource {
    fn parse(&self, contents: &str) -> Result<RawGraph, GraphError>;
}

/// Native JSON graph document.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonGraphSource;

impl GraphSource for JsonGraphSource {
    fn parse(&self, contents: &str) -> Result<RawGraph, GraphError> {
        let mut root: JsonValue =
            serde_json::from_str(contents).map_err(|e| GraphError::Parse(e.to_string()))?;
        if !root.is_object() {
            return Err(GraphError::Parse("graph document must be an object".into()));
        }
        normalize_graph_document(&mut root);
        serde_json::from_value(root).map_err(|e| GraphError::Parse(e.to_string()))
    }
}

/// Rewrite shorthand in place:
/// - `type` / `kind` -> `name`, `component` -> `guid`
/// - `"node:pin"` wire endpoints -> `{ "node", "pin" }`
/// - numeric node ids -> strings
pub fn normalize_graph_document(root: &mut JsonValue) {
    if let Some(nodes) = root.get_mut("nodes").and_then(|n| n.as_array_mut()) {
        for node in nodes.iter_mut() {
            let Some(obj) = node.as_object_mut() else {
                continue;
            };
            for alias in ["type", "kind"] {
                if let Some(name) = obj.remove(alias) {
                    obj.entry("name").or_insert(name);
                }
            }
            if let Some(guid) = obj.remove("component") {
                obj.entry("guid").or_insert(guid);
            }
            if let Some(id) = obj.get_mut("id") {
                if let Some(n) = id.as_u64() {
                    *id = JsonValue::String(n.to_string());
                }
            }
        }
    }

    if let Some(wires) = root.get_mut("wires").and_then(|w| w.as_array_mut()) {
        for wire in wires.iter_mut() {
            for end in ["from", "to"] {
                if let Some(endpoint) = wire.get_mut(end) {
                    if let Some(s) = endpoint.as_str() {
                        *endpoint = match s.rsplit_once(':') {
                            Some((node, pin)) => serde_json::json!({ "node": node, "pin": pin }),
                            None => serde_json::json!({ "node": s }),
                        };
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shorthand_document() {
        let doc = r#"{
            "nodes": [
                { "id": 1, "type": "Number", "inputs": { "N": 5 } },
                { "id": "p", "kind": "Panel", "component": "weft.params.panel" }
            ],
            "wires": [ { "from": "1:N", "to": { "node": "p", "pin": "input" } } ]
        }"#;
        let raw = JsonGraphSource.parse(doc).expect("parse");
        assert_eq!(raw.nodes[0].id.as_deref(), Some("1"));
        assert_eq!(raw.nodes[0].name.as_deref(), Some("Number"));
        assert_eq!(raw.nodes[1].guid.as_deref(), Some("weft.params.panel"));
        assert_eq!(raw.wires[0].from.node.as_deref(), Some("1"));
        assert_eq!(raw.wires[0].from.pin.as_deref(), Some("N"));
        assert_eq!(raw.wires[0].to.pin.as_deref(), Some("input"));
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(matches!(JsonGraphSource.parse("{ nodes"), Err(GraphError::Parse(_))));
        assert!(matches!(JsonGraphSource.parse("[1, 2]"), Err(GraphError::Parse(_))));
        assert!(matches!(
            JsonGraphSource.parse(r#"{ "nodes": 3 }"#),
            Err(GraphError::Parse(_))
        ));
    }
}

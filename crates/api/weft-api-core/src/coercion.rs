//! Coercion helpers used by component implementations.
//! Lists and trees coerce through their first item; text parses when it can.

use crate::Value;

/// Coerce into a number.
/// - Number / Integer -> value
/// - Bool -> 1.0 / 0.0
/// - Text -> parsed, `None` when unparsable
/// - List / Tree -> first item
pub fn to_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(f) => Some(*f),
        Value::Integer(i) => Some(*i as f64),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Text(s) => s.trim().parse::<f64>().ok(),
        Value::List(items) => items.first().and_then(to_number),
        Value::Tree(tree) => tree.values().next().and_then(to_number),
        _ => None,
    }
}

pub fn to_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(f) => Some(*f != 0.0),
        Value::Integer(i) => Some(*i != 0),
        Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        Value::List(items) => items.first().and_then(to_bool),
        Value::Tree(tree) => tree.values().next().and_then(to_bool),
        _ => None,
    }
}

/// Coerce into a point. Scalars broadcast onto the x axis only.
pub fn to_point(v: &Value) -> Option<[f64; 3]> {
    match v {
        Value::Point(p) | Value::Vector(p) => Some(*p),
        Value::Number(f) => Some([*f, 0.0, 0.0]),
        Value::Integer(i) => Some([*i as f64, 0.0, 0.0]),
        Value::List(items) => items.first().and_then(to_point),
        Value::Tree(tree) => tree.values().next().and_then(to_point),
        _ => None,
    }
}

/// Human-readable rendering used by panels and summaries.
pub fn to_text(v: &Value) -> String {
    match v {
        Value::Number(f) => format!("{f}"),
        Value::Integer(i) => i.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Text(s) => s.clone(),
        Value::Vector(p) => format!("{{{}, {}, {}}}", p[0], p[1], p[2]),
        Value::Point(p) => format!("{{{}, {}, {}}}", p[0], p[1], p[2]),
        Value::Segment { .. } => "Line".to_string(),
        Value::Polyline(pts) => format!("Polyline ({} points)", pts.len()),
        Value::Drawable(node) => format!("Drawable ({})", node.name),
        Value::List(items) => items.iter().map(to_text).collect::<Vec<_>>().join("\n"),
        Value::Tree(tree) => tree
            .branches
            .iter()
            .map(|b| {
                let path = b
                    .path
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join(";");
                format!("{{{path}}} ({} items)", b.values.len())
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Opaque(json) => json.to_string(),
    }
}

/// Flatten lists and trees into their leaf items.
pub fn flatten(v: &Value) -> Vec<Value> {
    match v {
        Value::List(items) => items.iter().flat_map(flatten).collect(),
        Value::Tree(tree) => tree.values().flat_map(flatten).collect(),
        other => vec![other.clone()],
    }
}

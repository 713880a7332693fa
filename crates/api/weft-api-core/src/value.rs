//! Value: the tagged union flowing along wires.
//!
//! Components produce these directly, so display collection can match on the
//! variant instead of probing the shape of arbitrary data.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::scene::SceneNode;
use crate::tree::DataTree;

/// Coarse kind of a [`Value`], handy for dispatch and diagnostics.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Number,
    Integer,
    Bool,
    Text,
    Vector,
    Point,
    Segment,
    Polyline,
    Drawable,
    List,
    Tree,
    Opaque,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Value {
    /// Scalar number
    Number(f64),

    /// Whole number (counts, indices, seeds)
    Integer(i64),

    Bool(bool),

    Text(String),

    /// Direction / displacement
    Vector([f64; 3]),

    /// Location in model space
    Point([f64; 3]),

    /// Straight curve primitive
    Segment { start: [f64; 3], end: [f64; 3] },

    /// Open polyline curve primitive
    Polyline(Vec<[f64; 3]>),

    /// Renderable subtree (mesh, lines or points with a transform).
    /// Shared so that aliased pins and passthrough nodes do not copy buffers.
    Drawable(Arc<SceneNode>),

    /// Ordered items; fan-in on a pin also resolves to a list
    List(Vec<Value>),

    /// Path-addressed multi-branch container
    Tree(DataTree),

    /// Component-specific payload the engine does not interpret
    Opaque(serde_json::Value),
}

impl Value {
    /// Return the coarse kind of this value.
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Number(_) => ValueKind::Number,
            Value::Integer(_) => ValueKind::Integer,
            Value::Bool(_) => ValueKind::Bool,
            Value::Text(_) => ValueKind::Text,
            Value::Vector(_) => ValueKind::Vector,
            Value::Point(_) => ValueKind::Point,
            Value::Segment { .. } => ValueKind::Segment,
            Value::Polyline(_) => ValueKind::Polyline,
            Value::Drawable(_) => ValueKind::Drawable,
            Value::List(_) => ValueKind::List,
            Value::Tree(_) => ValueKind::Tree,
            Value::Opaque(_) => ValueKind::Opaque,
        }
    }

    pub fn number(v: f64) -> Self {
        Value::Number(v)
    }

    pub fn point(x: f64, y: f64, z: f64) -> Self {
        Value::Point([x, y, z])
    }

    pub fn segment(start: [f64; 3], end: [f64; 3]) -> Self {
        Value::Segment { start, end }
    }

    pub fn drawable(node: SceneNode) -> Self {
        Value::Drawable(Arc::new(node))
    }

    /// True for values that carry something the display collector extracts.
    pub fn is_displayable(&self) -> bool {
        match self {
            Value::Point(_) | Value::Segment { .. } | Value::Polyline(_) | Value::Drawable(_) => {
                true
            }
            Value::List(items) => items.iter().any(Value::is_displayable),
            Value::Tree(tree) => tree.values().any(Value::is_displayable),
            _ => false,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Number(0.0)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

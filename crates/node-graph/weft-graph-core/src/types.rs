use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use weft_api_core::Value;

use crate::pin::PinName;

pub type NodeId = String;
pub type GraphId = String;

/// What a node is, as far as the component registry is concerned.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

impl NodeIdentity {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Label used in diagnostics and control lists.
    pub fn display_name(&self) -> &str {
        self.nickname
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSpec {
    pub id: NodeId,
    pub identity: NodeIdentity,
    /// Literal defaults used when a pin has no incoming wire.
    #[serde(default)]
    pub inputs: IndexMap<PinName, Value>,
    #[serde(default)]
    pub hidden: bool,
    /// Component-specific configuration (slider bounds, panel text, ...).
    #[serde(default)]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl NodeSpec {
    pub fn new(id: impl Into<NodeId>, identity: NodeIdentity) -> Self {
        Self {
            id: id.into(),
            identity,
            inputs: IndexMap::new(),
            hidden: false,
            meta: serde_json::Map::new(),
        }
    }

    pub fn with_input(mut self, pin: &str, value: Value) -> Self {
        self.inputs.insert(PinName::new(pin), value);
        self
    }

    pub fn with_meta(mut self, key: &str, value: serde_json::Value) -> Self {
        self.meta.insert(key.to_string(), value);
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Finite numbers only; "inf" or "NaN" strings read as absent.
    pub fn meta_number(&self, key: &str) -> Option<f64> {
        let number = match self.meta.get(key)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            serde_json::Value::Array(items) if items.len() == 1 => items[0].as_f64(),
            _ => None,
        };
        number.filter(|v| v.is_finite())
    }

    pub fn meta_text(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PinRef {
    pub node: NodeId,
    pub pin: PinName,
}

impl PinRef {
    pub fn new(node: impl Into<NodeId>, pin: &str) -> Self {
        Self {
            node: node.into(),
            pin: PinName::new(pin),
        }
    }
}

/// Directed edge from an output pin to an input pin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Wire {
    pub from: PinRef,
    pub to: PinRef,
}

impl Wire {
    pub fn new(from: PinRef, to: PinRef) -> Self {
        Self { from, to }
    }
}

/// Validated graph: unique node ids and wires whose endpoints all exist.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphSpec {
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub wires: Vec<Wire>,
}

impl GraphSpec {
    pub fn node(&self, id: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut NodeSpec> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Remove every wire targeting `to`; returns how many were removed.
    pub fn disconnect(&mut self, to: &PinRef) -> usize {
        let before = self.wires.len();
        self.wires.retain(|w| &w.to != to);
        before - self.wires.len()
    }
}

/// Unvalidated node as it comes out of a graph source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawNode {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub inputs: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEndpoint {
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub pin: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawWire {
    #[serde(default)]
    pub from: RawEndpoint,
    #[serde(default)]
    pub to: RawEndpoint,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawGraph {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub wires: Vec<RawWire>,
}

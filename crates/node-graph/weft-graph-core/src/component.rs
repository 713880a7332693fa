//! Component implementations and the records they exchange with the engine.

use std::fmt;

use hashbrown::HashSet;
use indexmap::IndexMap;
use weft_api_core::Value;

use crate::control::ControlState;
use crate::error::ComponentError;
use crate::pin::{get_pin, PinName, PinTranslation};
use crate::types::NodeSpec;

/// Resolved inputs for one node, keyed by pin.
pub type InputRecord = IndexMap<PinName, Value>;

/// Outputs of one node for one evaluation. Entries added through
/// [`OutputRecord::insert_alias`] duplicate a primary value under another
/// spelling and are skipped by display collection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OutputRecord {
    values: IndexMap<PinName, Value>,
    aliases: HashSet<PinName>,
}

impl OutputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-pin record.
    pub fn single(pin: &str, value: Value) -> Self {
        let mut record = Self::new();
        record.insert(pin, value);
        record
    }

    pub fn insert(&mut self, pin: &str, value: Value) {
        let pin = PinName::new(pin);
        self.aliases.remove(&pin);
        self.values.insert(pin, value);
    }

    pub fn insert_alias(&mut self, pin: &str, value: Value) {
        let pin = PinName::new(pin);
        if self.values.contains_key(pin.as_str()) && !self.aliases.contains(&pin) {
            return;
        }
        self.aliases.insert(pin.clone());
        self.values.insert(pin, value);
    }

    /// Exact spelling first, then case-insensitive.
    pub fn get(&self, pin: &str) -> Option<&Value> {
        get_pin(&self.values, pin)
    }

    pub fn is_alias(&self, pin: &str) -> bool {
        self.aliases.contains(pin)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PinName, &Value)> {
        self.values.iter()
    }

    /// Entries that are not alias duplicates.
    pub fn primary(&self) -> impl Iterator<Item = (&PinName, &Value)> {
        self.values
            .iter()
            .filter(move |(pin, _)| !self.aliases.contains(*pin))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Persistent per-node state, owned by the engine and kept across graph
/// rebuilds as long as the node id survives with the same identity and meta.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeState {
    Control(ControlState),
    /// Generic carried value (seeds, accumulators).
    Value(Value),
}

impl NodeState {
    pub fn as_control(&self) -> Option<&ControlState> {
        match self {
            NodeState::Control(c) => Some(c),
            _ => None,
        }
    }
}

/// A unit of computation registered under one or more identity keys.
pub trait Component: Send + Sync {
    fn evaluate(
        &self,
        node: &NodeSpec,
        inputs: &InputRecord,
        state: Option<&mut NodeState>,
    ) -> Result<OutputRecord, ComponentError>;

    /// Persistent state constructor; `None` for pure components.
    fn create_state(&self, _node: &NodeSpec) -> Option<NodeState> {
        None
    }

    /// Canonical <-> descriptive pin names.
    fn pins(&self) -> PinTranslation {
        PinTranslation::default()
    }
}

/// Adapter turning a closure into a [`Component`].
pub struct FnComponent<F> {
    f: F,
    pins: PinTranslation,
}

pub fn from_fn<F>(f: F) -> FnComponent<F>
where
    F: Fn(&NodeSpec, &InputRecord) -> Result<OutputRecord, ComponentError> + Send + Sync,
{
    FnComponent {
        f,
        pins: PinTranslation::default(),
    }
}

impl<F> FnComponent<F> {
    pub fn with_pins(mut self, pins: PinTranslation) -> Self {
        self.pins = pins;
        self
    }
}

impl<F> Component for FnComponent<F>
where
    F: Fn(&NodeSpec, &InputRecord) -> Result<OutputRecord, ComponentError> + Send + Sync,
{
    fn evaluate(
        &self,
        node: &NodeSpec,
        inputs: &InputRecord,
        _state: Option<&mut NodeState>,
    ) -> Result<OutputRecord, ComponentError> {
        (self.f)(node, inputs)
    }

    fn pins(&self) -> PinTranslation {
        self.pins.clone()
    }
}

/// Registry entry: the implementation plus its pin table, queried once.
pub struct RegisteredComponent {
    implementation: Box<dyn Component>,
    pins: PinTranslation,
}

impl fmt::Debug for RegisteredComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredComponent")
            .field("inputs", &self.pins.inputs.len())
            .field("outputs", &self.pins.outputs.len())
            .finish()
    }
}

impl RegisteredComponent {
    pub fn new(implementation: Box<dyn Component>) -> Self {
        let pins = implementation.pins();
        Self {
            implementation,
            pins,
        }
    }

    pub fn pins(&self) -> &PinTranslation {
        &self.pins
    }

    pub fn create_state(&self, node: &NodeSpec) -> Option<NodeState> {
        self.implementation.create_state(node)
    }

    /// Evaluate with pin translation applied: inputs are renamed onto
    /// canonical codes, outputs are published under both spellings.
    pub fn evaluate(
        &self,
        node: &NodeSpec,
        inputs: &InputRecord,
        state: Option<&mut NodeState>,
    ) -> Result<OutputRecord, ComponentError> {
        if self.pins.is_empty() {
            return self.implementation.evaluate(node, inputs, state);
        }

        let mut canonical = InputRecord::with_capacity(inputs.len());
        for (pin, value) in inputs {
            let key = self
                .pins
                .inputs
                .canonical(pin.as_str())
                .cloned()
                .unwrap_or_else(|| pin.clone());
            // two spellings of one pin merge like a fan-in
            match canonical.get_mut(&key) {
                Some(Value::List(items)) => items.push(value.clone()),
                Some(existing) => {
                    let first = std::mem::replace(existing, Value::List(Vec::new()));
                    *existing = Value::List(vec![first, value.clone()]);
                }
                None => {
                    canonical.insert(key, value.clone());
                }
            }
        }

        let raw = self.implementation.evaluate(node, &canonical, state)?;
        let mut out = OutputRecord::new();
        for (pin, value) in raw.iter() {
            match self.pins.outputs.canonical(pin.as_str()) {
                Some(code) => {
                    out.insert(code.as_str(), value.clone());
                    if let Some(name) = self.pins.outputs.descriptive(code.as_str()) {
                        out.insert_alias(name.as_str(), value.clone());
                    }
                }
                None if raw.is_alias(pin.as_str()) => out.insert_alias(pin.as_str(), value.clone()),
                None => out.insert(pin.as_str(), value.clone()),
            }
        }
        Ok(out)
    }
}

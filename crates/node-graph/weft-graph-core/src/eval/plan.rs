//! Structure-derived evaluation plan: topology plus the input index.
//! Rebuilt only when nodes or wires change.

use hashbrown::HashMap;
use indexmap::IndexMap;
use weft_api_core::Value;

use crate::component::{InputRecord, OutputRecord};
use crate::pin::{PinMap, PinName};
use crate::topo::{topo_order, Topology};
use crate::types::{GraphSpec, NodeId, NodeSpec, PinRef};

/// Incoming wires of one node as (target pin, source), in wire declaration
/// order. Grouping by pin happens at resolution time, once the component's
/// pin table is known.
pub(crate) type PinSources = Vec<(PinName, PinRef)>;

#[derive(Clone, Debug, Default)]
pub(crate) struct Plan {
    pub topology: Topology,
    /// Positions into `GraphSpec::nodes`, parallel to `topology.order`.
    pub order: Vec<usize>,
    pub inputs: HashMap<NodeId, PinSources>,
}

impl Plan {
    pub fn build(graph: &GraphSpec) -> Self {
        let topology = topo_order(graph);
        let position: HashMap<&str, usize> = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();
        let order = topology
            .order
            .iter()
            .filter_map(|id| position.get(id.as_str()).copied())
            .collect();

        let mut inputs: HashMap<NodeId, PinSources> = HashMap::new();
        for wire in &graph.wires {
            inputs
                .entry(wire.to.node.clone())
                .or_default()
                .push((wire.to.pin.clone(), wire.from.clone()));
        }

        Plan {
            topology,
            order,
            inputs,
        }
    }
}

/// Folded key a pin groups under: its canonical code when the component
/// knows the spelling, otherwise its own case-folded name.
fn group_key(pins: &PinMap, pin: &PinName) -> String {
    pins.canonical(pin.as_str())
        .map(|code| code.key().to_string())
        .unwrap_or_else(|| pin.key().to_string())
}

/// Resolve a node's inputs. Declared defaults fill every pin first; a wired
/// pin replaces its default only when at least one upstream value exists.
/// Wires whose target spellings name the same pin (any casing, short code or
/// descriptive name) are one pin: one value resolves bare, several resolve
/// to a list in wire order.
pub(crate) fn resolve_inputs(
    node: &NodeSpec,
    sources: Option<&PinSources>,
    outputs: &HashMap<NodeId, OutputRecord>,
    pins: &PinMap,
) -> InputRecord {
    let mut record: InputRecord = node.inputs.clone();
    let Some(sources) = sources else {
        return record;
    };

    // folded key -> (first spelling seen, values in wire order)
    let mut groups: IndexMap<String, (PinName, Vec<Value>)> = IndexMap::new();
    for (pin, src) in sources {
        let (_, values) = groups
            .entry(group_key(pins, pin))
            .or_insert_with(|| (pin.clone(), Vec::new()));
        if let Some(value) = outputs.get(&src.node).and_then(|o| o.get(src.pin.as_str())) {
            values.push(value.clone());
        }
    }

    for (key, (pin, mut values)) in groups {
        let resolved = match values.len() {
            0 => continue,
            1 => values.swap_remove(0),
            _ => Value::List(values),
        };
        record.retain(|existing, _| group_key(pins, existing) != key);
        record.insert(pin, resolved);
    }
    record
}

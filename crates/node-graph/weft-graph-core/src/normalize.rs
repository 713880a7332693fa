//! Validation of raw graph descriptions.

use hashbrown::HashSet;
use weft_api_core::json::value_from_json;

use crate::diagnostics::Diagnostic;
use crate::pin::PinName;
use crate::types::*;

/// Validated graph plus everything that was dropped on the way.
#[derive(Clone, Debug, Default)]
pub struct Normalized {
    pub graph: GraphSpec,
    pub diagnostics: Vec<Diagnostic>,
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Canonicalize a raw graph. Never fails: nodes without an id (or with a
/// duplicate id) are skipped, and wires whose endpoints do not name a known
/// node and a pin are dropped, each with a warning.
pub fn normalize(raw: RawGraph) -> Normalized {
    let mut diagnostics = Vec::new();
    let mut nodes = Vec::with_capacity(raw.nodes.len());
    let mut seen: HashSet<String> = HashSet::new();

    for (index, raw_node) in raw.nodes.into_iter().enumerate() {
        let Some(id) = non_empty(raw_node.id) else {
            diagnostics.push(Diagnostic::warning(format!(
                "node #{index} has no id and was skipped"
            )));
            continue;
        };
        if !seen.insert(id.clone()) {
            diagnostics.push(
                Diagnostic::warning(format!("duplicate node id '{id}' was skipped")).for_node(&id),
            );
            continue;
        }

        let identity = NodeIdentity {
            guid: non_empty(raw_node.guid),
            name: raw_node.name.unwrap_or_default().trim().to_string(),
            nickname: non_empty(raw_node.nickname),
        };

        let mut spec = NodeSpec::new(id.clone(), identity);
        spec.hidden = raw_node.hidden;
        spec.meta = raw_node.meta;
        for (pin, literal) in raw_node.inputs {
            let pin = PinName::new(&pin);
            if pin.is_empty() {
                continue;
            }
            match value_from_json(literal) {
                Ok(value) => {
                    spec.inputs.insert(pin, value);
                }
                Err(err) => diagnostics.push(
                    Diagnostic::warning(format!("input '{pin}' ignored: {err}")).for_node(&id),
                ),
            }
        }
        nodes.push(spec);
    }

    let mut wires = Vec::with_capacity(raw.wires.len());
    for (index, raw_wire) in raw.wires.into_iter().enumerate() {
        match resolve_wire(raw_wire, &seen) {
            Ok(wire) => wires.push(wire),
            Err(reason) => {
                log::warn!("dropping wire #{index}: {reason}");
                diagnostics.push(Diagnostic::warning(format!(
                    "wire #{index} dropped: {reason}"
                )));
            }
        }
    }

    Normalized {
        graph: GraphSpec { nodes, wires },
        diagnostics,
    }
}

fn resolve_endpoint(
    endpoint: RawEndpoint,
    side: &str,
    known: &HashSet<String>,
) -> Result<PinRef, String> {
    let node = non_empty(endpoint.node).ok_or_else(|| format!("{side} node missing"))?;
    if !known.contains(&node) {
        return Err(format!("{side} node '{node}' does not exist"));
    }
    let pin = endpoint
        .pin
        .map(|p| PinName::new(&p))
        .filter(|p| !p.is_empty())
        .ok_or_else(|| format!("{side} pin missing on '{node}'"))?;
    Ok(PinRef { node, pin })
}

fn resolve_wire(raw: RawWire, known: &HashSet<String>) -> Result<Wire, String> {
    let from = resolve_endpoint(raw.from, "source", known)?;
    let to = resolve_endpoint(raw.to, "target", known)?;
    Ok(Wire { from, to })
}

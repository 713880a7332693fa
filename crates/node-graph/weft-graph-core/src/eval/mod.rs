//! Evaluation engine for one graph.
//!
//! The engine owns the graph structure, the derived [`plan::Plan`], persistent
//! node state and the output records of the last run. A run walks the
//! topological order, resolves inputs, dispatches through the
//! [`ComponentRegistry`] and isolates per-node failures:
//!
//! - [`plan`] builds the topology and input index and resolves inputs.
//! - [`display`] gathers drawables and overlay primitives for the renderer.
//!
//! Deferred re-evaluation lives in [`crate::scheduler`].

mod display;
mod plan;

#[cfg(test)]
mod tests;

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use weft_api_core::DisplayPayload;

use crate::component::{InputRecord, NodeState, OutputRecord};
use crate::config::EngineConfig;
use crate::control::{ControlDescriptor, ControlState};
use crate::diagnostics::{Diagnostic, DiagnosticBuffer};
use crate::error::{ComponentError, GraphError};
use crate::events::{panic_message, EventBroker, ListenerHandle};
use crate::registry::ComponentRegistry;
use crate::topo::Topology;
use crate::types::{GraphId, GraphSpec, NodeId, PinRef};

use display::DisplayCollector;
use plan::{resolve_inputs, Plan};

/// Receives the display payload after each run. `None` clears the display.
pub trait Renderer {
    fn update_mesh(&mut self, payload: Option<&DisplayPayload>);
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum EngineEvent {
    EvaluationStart {
        graph_id: Option<GraphId>,
    },
    EvaluationComplete {
        graph_id: Option<GraphId>,
        evaluated: usize,
        failed: usize,
    },
    Evaluation {
        summary: String,
    },
    Diagnostic(Diagnostic),
}

/// Outcome of one run. Node failures land in `errors`; the run itself
/// always completes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub graph_id: Option<GraphId>,
    /// Nodes whose component was invoked, failures included.
    pub evaluated: usize,
    /// Nodes with no registered component or excluded by a cycle.
    pub skipped: usize,
    pub failed: usize,
    pub has_cycle: bool,
    pub summary: String,
    pub logs: Vec<Diagnostic>,
    pub errors: Vec<Diagnostic>,
    pub display: Option<DisplayPayload>,
}

fn summarize(total: usize, evaluated: usize, failed: usize, skipped: usize, has_cycle: bool) -> String {
    let mut notes = Vec::new();
    if failed > 0 {
        notes.push(format!("{failed} failed"));
    }
    if skipped > 0 {
        notes.push(format!("{skipped} skipped"));
    }
    if has_cycle {
        notes.push("cycle detected".to_string());
    }
    let mut summary = format!("evaluated {evaluated} of {total} nodes");
    if !notes.is_empty() {
        summary.push_str(&format!(" ({})", notes.join(", ")));
    }
    summary
}

pub struct EvaluationEngine {
    registry: Arc<ComponentRegistry>,
    config: EngineConfig,
    graph_id: Option<GraphId>,
    graph: GraphSpec,
    plan: Plan,
    node_states: HashMap<NodeId, NodeState>,
    node_outputs: HashMap<NodeId, OutputRecord>,
    node_inputs: HashMap<NodeId, InputRecord>,
    events: EventBroker<EngineEvent>,
    renderer: Option<Box<dyn Renderer>>,
}

impl fmt::Debug for EvaluationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationEngine")
            .field("graph_id", &self.graph_id)
            .field("nodes", &self.graph.nodes.len())
            .field("wires", &self.graph.wires.len())
            .field("states", &self.node_states.len())
            .finish()
    }
}

impl EvaluationEngine {
    pub fn new(registry: Arc<ComponentRegistry>, config: EngineConfig) -> Self {
        Self {
            registry,
            config,
            graph_id: None,
            graph: GraphSpec::default(),
            plan: Plan::default(),
            node_states: HashMap::new(),
            node_outputs: HashMap::new(),
            node_inputs: HashMap::new(),
            events: EventBroker::new(),
            renderer: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    pub fn graph_id(&self) -> Option<&str> {
        self.graph_id.as_deref()
    }

    pub fn graph(&self) -> &GraphSpec {
        &self.graph
    }

    pub fn topology(&self) -> &Topology {
        &self.plan.topology
    }

    /// Replace the graph structure. Persistent state survives for node ids
    /// still present with the same identity and meta; a changed node is
    /// re-seeded, keeping a control's value when it fits the new bounds. New
    /// stateful nodes get their state now so controls are listed before the
    /// first run. Returns warnings for node identities the registry does not
    /// know.
    pub fn set_graph(&mut self, graph_id: Option<GraphId>, graph: GraphSpec) -> Vec<Diagnostic> {
        self.graph_id = graph_id;
        let previous = std::mem::replace(&mut self.graph, graph);
        self.rebuild();

        let mut warnings = Vec::new();
        for node in &self.graph.nodes {
            let changed = previous
                .node(&node.id)
                .is_some_and(|old| old.identity != node.identity || old.meta != node.meta);
            let stale = if changed {
                self.node_states.remove(&node.id)
            } else {
                None
            };
            match self.registry.lookup(&node.identity) {
                Some(component) => {
                    if !self.node_states.contains_key(&node.id) {
                        if let Some(mut state) = component.create_state(node) {
                            if let (Some(NodeState::Control(old)), NodeState::Control(fresh)) =
                                (&stale, &mut state)
                            {
                                if fresh.contains(old.value) {
                                    fresh.set(old.value);
                                }
                            }
                            self.node_states.insert(node.id.clone(), state);
                        }
                    }
                }
                None => {
                    log::warn!("no component registered for '{}'", node.identity.display_name());
                    warnings.push(
                        Diagnostic::warning(format!(
                            "unknown component '{}'",
                            node.identity.display_name()
                        ))
                        .for_node(&node.id),
                    );
                }
            }
        }
        log::debug!(
            "graph {:?} loaded: {} nodes, {} wires",
            self.graph_id,
            self.graph.nodes.len(),
            self.graph.wires.len()
        );
        warnings
    }

    fn rebuild(&mut self) {
        self.plan = Plan::build(&self.graph);
        let graph = &self.graph;
        self.node_states.retain(|id, _| graph.contains(id));
    }

    /// Remove every wire into `to` and rebuild the plan.
    pub fn disconnect(&mut self, to: &PinRef) -> usize {
        let removed = self.graph.disconnect(to);
        if removed > 0 {
            self.rebuild();
        }
        removed
    }

    /// Drop the graph and all state; the renderer is told to clear.
    pub fn clear(&mut self) {
        self.graph_id = None;
        self.graph = GraphSpec::default();
        self.plan = Plan::default();
        self.node_states.clear();
        self.node_outputs.clear();
        self.node_inputs.clear();
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.update_mesh(None);
        }
    }

    pub fn set_renderer(&mut self, renderer: Box<dyn Renderer>) {
        self.renderer = Some(renderer);
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerHandle
    where
        F: FnMut(&EngineEvent) -> anyhow::Result<()> + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, handle: ListenerHandle) -> bool {
        self.events.unsubscribe(handle)
    }

    /// Output record of the last run.
    pub fn node_outputs(&self, node_id: &str) -> Option<&OutputRecord> {
        self.node_outputs.get(node_id)
    }

    /// Inputs as resolved for the last run.
    pub fn node_inputs(&self, node_id: &str) -> Option<&InputRecord> {
        self.node_inputs.get(node_id)
    }

    pub fn node_state(&self, node_id: &str) -> Option<&NodeState> {
        self.node_states.get(node_id)
    }

    /// Slider controls in declaration order.
    pub fn controls(&self) -> Vec<ControlDescriptor> {
        self.graph
            .nodes
            .iter()
            .filter_map(|node| {
                let control = self.node_states.get(&node.id)?.as_control()?;
                Some(ControlDescriptor::slider(node, control))
            })
            .collect()
    }

    /// Find a control by node id, then by nickname or name (case-insensitive).
    pub fn find_control(&self, key: &str) -> Option<ControlDescriptor> {
        let controls = self.controls();
        if let Some(found) = controls.iter().find(|c| c.node_id == key) {
            return Some(found.clone());
        }
        let folded = key.trim().to_lowercase();
        controls.into_iter().find(|c| {
            self.graph.node(&c.node_id).is_some_and(|node| {
                node.identity
                    .nickname
                    .as_deref()
                    .is_some_and(|n| n.trim().to_lowercase() == folded)
                    || node.identity.name.trim().to_lowercase() == folded
            })
        })
    }

    /// Clamp, snap and store a control value. Returns the effective value.
    /// Does not evaluate; see [`crate::SharedEngine::set_control_value`].
    pub fn set_control_value(&mut self, node_id: &str, value: f64) -> Result<f64, GraphError> {
        let Some(NodeState::Control(control)) = self.node_states.get_mut(node_id) else {
            return Err(GraphError::UnknownControl(node_id.to_string()));
        };
        if !value.is_finite() {
            return Err(GraphError::InvalidControlValue {
                node_id: node_id.to_string(),
                value,
            });
        }
        Ok(control.set(value))
    }

    /// Reset a control to the value its node declares.
    pub fn reset_control(&mut self, node_id: &str) -> Result<f64, GraphError> {
        let node = self
            .graph
            .node(node_id)
            .ok_or_else(|| GraphError::UnknownControl(node_id.to_string()))?;
        let fresh = ControlState::from_node(node);
        match self.node_states.get_mut(node_id) {
            Some(NodeState::Control(control)) => {
                *control = fresh;
                Ok(control.value)
            }
            _ => Err(GraphError::UnknownControl(node_id.to_string())),
        }
    }

    fn record(&mut self, buffer: &mut DiagnosticBuffer, diagnostic: Diagnostic) {
        self.events.emit(&EngineEvent::Diagnostic(diagnostic.clone()));
        buffer.push(diagnostic);
    }

    /// Run every orderable node once.
    pub fn evaluate(&mut self) -> EvaluationReport {
        let graph_id = self.graph_id.clone();
        self.events.emit(&EngineEvent::EvaluationStart {
            graph_id: graph_id.clone(),
        });

        self.node_outputs.clear();
        self.node_inputs.clear();
        let mut buffer = DiagnosticBuffer::with_capacity(self.config.max_diagnostics);
        let total = self.graph.nodes.len();
        let has_cycle = self.plan.topology.has_cycle;
        let mut skipped = total - self.plan.order.len();
        let mut evaluated = 0;
        let mut failed = 0;

        if has_cycle {
            log::warn!("cycle detected: {skipped} nodes excluded from evaluation");
            self.record(
                &mut buffer,
                Diagnostic::warning(format!(
                    "cycle detected: {skipped} nodes were not evaluated"
                )),
            );
        }

        let registry = Arc::clone(&self.registry);
        for position in self.plan.order.clone() {
            let node = &self.graph.nodes[position];
            let Some(component) = registry.lookup(&node.identity) else {
                log::warn!("skipping node '{}': no component for '{}'", node.id, node.identity.display_name());
                skipped += 1;
                let diagnostic = Diagnostic::warning(format!(
                    "unknown component '{}'",
                    node.identity.display_name()
                ))
                .for_node(&node.id);
                self.record(&mut buffer, diagnostic);
                continue;
            };

            let inputs = resolve_inputs(
                node,
                self.plan.inputs.get(&node.id),
                &self.node_outputs,
                &component.pins().inputs,
            );
            if !self.node_states.contains_key(&node.id) {
                if let Some(state) = component.create_state(node) {
                    self.node_states.insert(node.id.clone(), state);
                }
            }
            let state = self.node_states.get_mut(&node.id);

            evaluated += 1;
            let result = catch_unwind(AssertUnwindSafe(|| component.evaluate(node, &inputs, state)))
                .unwrap_or_else(|panic| {
                    Err(ComponentError::Failed(format!(
                        "panicked: {}",
                        panic_message(panic.as_ref())
                    )))
                });

            let node_id = node.id.clone();
            let outputs = match result {
                Ok(outputs) => outputs,
                Err(err) => {
                    failed += 1;
                    log::error!("node '{node_id}' failed: {err}");
                    let diagnostic = Diagnostic::error(err.to_string()).for_node(&node_id);
                    self.record(&mut buffer, diagnostic);
                    OutputRecord::new()
                }
            };
            self.node_outputs.insert(node_id.clone(), outputs);
            self.node_inputs.insert(node_id, inputs);
        }

        let display = if self.config.display_enabled {
            let mut collector = DisplayCollector::new();
            for &position in &self.plan.order {
                let node = &self.graph.nodes[position];
                if node.hidden {
                    continue;
                }
                if let Some(outputs) = self.node_outputs.get(&node.id) {
                    collector.collect_outputs(outputs);
                }
            }
            let display = collector.finish();
            if let Some(renderer) = self.renderer.as_mut() {
                renderer.update_mesh(display.as_ref());
            }
            display
        } else {
            None
        };

        let summary = summarize(total, evaluated, failed, skipped, has_cycle);
        log::debug!("{summary}");
        self.events.emit(&EngineEvent::EvaluationComplete {
            graph_id: graph_id.clone(),
            evaluated,
            failed,
        });
        self.events.emit(&EngineEvent::Evaluation {
            summary: summary.clone(),
        });

        let (logs, errors) = buffer.finish();
        EvaluationReport {
            graph_id,
            evaluated,
            skipped,
            failed,
            has_cycle,
            summary,
            logs,
            errors,
            display,
        }
    }
}

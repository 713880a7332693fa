//! Worker side of the transport: owns the loaded graphs and one engine per
//! graph, and answers requests in arrival order.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

use hashbrown::HashMap;
use serde::Serialize;
use serde_json::Value as JsonValue;
use weft_graph_core::{
    normalize, CallbackSource, ComponentRegistry, EvaluationEngine, GraphEntry, GraphError,
    GraphEvent, GraphId, GraphRegistry, GraphSource, JsonGraphSource, SharedEngine, TaskQueue,
};

use crate::config::WorkerConfig;
use crate::protocol::{
    Envelope, EvaluateRequest, EvaluateResponse, InitRequest, InitResponse, LoadGraphRequest,
    LoadGraphResponse, Message, MessageType, Notification,
};

/// Request-level failure, sent back as an error envelope.
#[derive(Debug)]
enum RequestError {
    Graph(GraphError),
    Payload(String),
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::Graph(e) => write!(f, "{e}"),
            RequestError::Payload(e) => write!(f, "{e}"),
        }
    }
}

impl From<GraphError> for RequestError {
    fn from(e: GraphError) -> Self {
        RequestError::Graph(e)
    }
}

type Reply = (JsonValue, Vec<weft_scene_core::TransferBuffer>);

pub struct EvaluationContext {
    config: WorkerConfig,
    components: Arc<ComponentRegistry>,
    graphs: GraphRegistry,
    engines: HashMap<GraphId, SharedEngine>,
    queue: TaskQueue,
    notifications: Rc<RefCell<Vec<Notification>>>,
    source: JsonGraphSource,
}

impl std::fmt::Debug for EvaluationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("graphs", &self.graphs.len())
            .field("active", &self.graphs.active_id())
            .finish()
    }
}

impl EvaluationContext {
    pub fn new(config: WorkerConfig, components: Arc<ComponentRegistry>) -> Self {
        let notifications = Rc::new(RefCell::new(Vec::new()));
        let mut graphs = GraphRegistry::new();
        let sink = Rc::clone(&notifications);
        graphs.subscribe(move |event: &GraphEvent| {
            sink.borrow_mut().push(Notification::info(describe(event)));
            Ok(())
        });
        Self {
            config,
            components,
            graphs,
            engines: HashMap::new(),
            queue: TaskQueue::new(),
            notifications,
            source: JsonGraphSource,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn graphs(&self) -> &GraphRegistry {
        &self.graphs
    }

    pub fn engine(&self, graph_id: &str) -> Option<&SharedEngine> {
        self.engines.get(graph_id)
    }

    /// Worker loop. Returns after a shutdown request or once either channel
    /// disconnects.
    pub fn run(&mut self, inbound: Receiver<Message>, outbound: Sender<Message>) {
        log::info!("evaluation context started");
        for message in inbound.iter() {
            let shutdown = message.envelope.kind == MessageType::Shutdown;
            for reply in self.handle(message) {
                if outbound.send(reply).is_err() {
                    log::warn!("host went away; stopping evaluation context");
                    return;
                }
            }
            if shutdown {
                break;
            }
        }
        log::info!("evaluation context stopped");
    }

    /// Process one message. Notifications raised while handling it come
    /// first, followed by the response.
    pub fn handle(&mut self, message: Message) -> Vec<Message> {
        let Message { envelope, .. } = message;
        let Some(id) = envelope.id else {
            log::warn!("ignoring {:?} message without id", envelope.kind);
            return Vec::new();
        };
        let kind = envelope.kind;
        let outcome = match kind {
            MessageType::Init => self.init(&envelope),
            MessageType::LoadGraph => self.load_graph(&envelope),
            MessageType::Evaluate => self.evaluate(&envelope),
            MessageType::Shutdown => Ok((JsonValue::Null, Vec::new())),
            MessageType::Log | MessageType::Error => Err(RequestError::Payload(format!(
                "{kind:?} is not a request type"
            ))),
        };

        let mut out: Vec<Message> = self
            .notifications
            .borrow_mut()
            .drain(..)
            .map(|n| Message::new(Envelope::notification(&n)))
            .collect();
        out.push(match outcome {
            Ok((payload, transfer)) => {
                Message::with_transfer(Envelope::request(id, kind, payload), transfer)
            }
            Err(e) => {
                log::warn!("request {id} ({kind:?}) failed: {e}");
                Message::new(Envelope::failure(Some(id), kind, e.to_string()))
            }
        });
        out
    }

    fn init(&mut self, envelope: &Envelope) -> Result<Reply, RequestError> {
        let request: InitRequest = decode(envelope)?;
        if let Some(config) = request.config {
            for engine in self.engines.values() {
                engine.engine_mut().set_config(config.engine.clone());
            }
            self.config = config;
        }
        let response = InitResponse {
            ready: true,
            components: self
                .components
                .keys()
                .into_iter()
                .map(str::to_string)
                .collect(),
        };
        Ok((encode(&response)?, Vec::new()))
    }

    fn load_graph(&mut self, envelope: &Envelope) -> Result<Reply, RequestError> {
        let request: LoadGraphRequest = decode(envelope)?;
        let raw = self.source.parse(&request.contents)?;
        let normalized = normalize(raw);
        let graph = normalized.graph;
        let mut warnings = normalized.diagnostics;

        let entry = GraphEntry {
            graph: graph.clone(),
            name: request.name.clone(),
            metadata: request
                .metadata
                .unwrap_or_else(|| JsonValue::Object(Default::default())),
        };
        let graph_id = self.graphs.register_graph(request.graph_id, entry);

        let nodes = graph.nodes.len();
        let wires = graph.wires.len();
        let engine = match self.engines.get(&graph_id) {
            Some(existing) => existing.clone(),
            None => {
                let engine = SharedEngine::new(
                    EvaluationEngine::new(Arc::clone(&self.components), self.config.engine.clone()),
                    Rc::new(self.queue.clone()) as Rc<dyn CallbackSource>,
                );
                self.engines.insert(graph_id.clone(), engine.clone());
                engine
            }
        };
        warnings.extend(engine.engine_mut().set_graph(Some(graph_id.clone()), graph));

        if request.set_active == Some(true) {
            self.graphs.set_active_graph(&graph_id)?;
        }

        let label = request.name.as_deref().unwrap_or(&graph_id);
        let response = LoadGraphResponse {
            summary: format!("loaded '{label}': {nodes} nodes, {wires} wires"),
            sliders: engine.engine().controls(),
            graph_id,
            warnings,
        };
        Ok((encode(&response)?, Vec::new()))
    }

    fn evaluate(&mut self, envelope: &Envelope) -> Result<Reply, RequestError> {
        let request: EvaluateRequest = decode(envelope)?;
        let graph_id = match request.graph_id {
            Some(id) => id,
            None => self
                .graphs
                .active_id()
                .map(str::to_string)
                .ok_or(GraphError::NoActiveGraph)?,
        };
        let target = self
            .engines
            .get(&graph_id)
            .cloned()
            .ok_or_else(|| GraphError::UnknownGraph(graph_id.clone()))?;

        // every delta is checked before any is applied
        let mut deltas = Vec::with_capacity(request.slider_values.len());
        for slider in &request.slider_values {
            let owner = slider.graph_id.as_deref().unwrap_or(&graph_id);
            let engine = self
                .engines
                .get(owner)
                .ok_or_else(|| GraphError::UnknownGraph(owner.to_string()))?;
            let control = engine
                .engine()
                .find_control(&slider.node_id)
                .ok_or_else(|| GraphError::UnknownControl(slider.node_id.clone()))?;
            if !slider.value.is_finite() {
                return Err(GraphError::InvalidControlValue {
                    node_id: control.node_id,
                    value: slider.value,
                }
                .into());
            }
            deltas.push((owner.to_string(), engine.clone(), control.node_id, slider.value));
        }

        if request.set_active == Some(true) {
            self.graphs.set_active_graph(&graph_id)?;
        }

        for (_, engine, node_id, value) in &deltas {
            let applied = engine.set_control_value(node_id, *value)?;
            log::debug!("control {node_id} -> {applied}");
        }
        self.queue.run_pending();
        for (owner, engine, _, _) in &deltas {
            if *owner != graph_id {
                // only the target graph's report is returned
                engine.take_report();
            }
        }
        let report = match target.take_report() {
            Some(report) => report,
            None => target.evaluate_now(),
        };

        let (display, transfer) = match report.display.as_ref() {
            Some(payload) => {
                let (flat, buffers) = weft_scene_core::serialize(payload);
                (Some(flat), buffers)
            }
            None => (None, Vec::new()),
        };
        let mut logs = report.logs;
        logs.truncate(self.config.max_buffered_logs);
        let metadata = self
            .graphs
            .get(&graph_id)
            .map(|entry| entry.metadata.clone())
            .unwrap_or(JsonValue::Null);

        let response = EvaluateResponse {
            sliders: target.engine().controls(),
            graph_id,
            display,
            summary: report.summary,
            logs,
            errors: report.errors,
            metadata,
        };
        Ok((encode(&response)?, transfer))
    }
}

fn decode<T: serde::de::DeserializeOwned>(envelope: &Envelope) -> Result<T, RequestError> {
    envelope
        .decode()
        .map_err(|e| RequestError::Payload(e.to_string()))
}

fn encode<T: Serialize>(value: &T) -> Result<JsonValue, RequestError> {
    serde_json::to_value(value).map_err(|e| RequestError::Payload(e.to_string()))
}

fn describe(event: &GraphEvent) -> String {
    match event {
        GraphEvent::Added { graph_id } => format!("graph '{graph_id}' added"),
        GraphEvent::Updated { graph_id } => format!("graph '{graph_id}' updated"),
        GraphEvent::Removed { graph_id } => format!("graph '{graph_id}' removed"),
        GraphEvent::ActiveChanged { current, .. } => match current {
            Some(id) => format!("active graph is now '{id}'"),
            None => "no active graph".to_string(),
        },
    }
}

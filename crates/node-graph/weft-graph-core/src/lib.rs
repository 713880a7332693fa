//! weft-graph-core: dataflow graph model, component dispatch and evaluation.
//!
//! Load a document through a [`GraphSource`], validate it with [`normalize`],
//! hand the resulting [`GraphSpec`] to an [`EvaluationEngine`] built over a
//! [`ComponentRegistry`], then call [`EvaluationEngine::evaluate`].

pub mod builtin;
pub mod component;
pub mod config;
pub mod control;
pub mod diagnostics;
pub mod error;
pub mod eval;
pub mod events;
pub mod graph_registry;
pub mod normalize;
pub mod pin;
pub mod registry;
pub mod scheduler;
pub mod source;
pub mod topo;
pub mod types;

pub use component::{from_fn, Component, InputRecord, NodeState, OutputRecord, RegisteredComponent};
pub use config::EngineConfig;
pub use control::{ControlDescriptor, ControlState};
pub use diagnostics::{Diagnostic, DiagnosticBuffer, DiagnosticLevel};
pub use error::{ComponentError, GraphError};
pub use eval::{EngineEvent, EvaluationEngine, EvaluationReport, Renderer};
pub use events::{EventBroker, ListenerHandle};
pub use graph_registry::{GraphEntry, GraphEvent, GraphRegistry};
pub use normalize::{normalize, Normalized};
pub use pin::{PinName, PinTranslation};
pub use registry::{ComponentRegistry, ComponentRegistryBuilder};
pub use scheduler::{CallbackSource, CoalescingScheduler, SharedEngine, TaskQueue};
pub use source::{GraphSource, JsonGraphSource};
pub use topo::{topo_order, Topology};
pub use types::*;

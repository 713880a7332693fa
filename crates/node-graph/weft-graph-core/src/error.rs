use thiserror::Error;

use crate::types::GraphId;

/// Structural failures: the request is rejected as a whole.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph parse error: {0}")]
    Parse(String),
    #[error("unknown graph '{0}'")]
    UnknownGraph(GraphId),
    #[error("no active graph")]
    NoActiveGraph,
    #[error("unknown control '{0}'")]
    UnknownControl(String),
    #[error("control '{node_id}' expects a finite value, got {value}")]
    InvalidControlValue { node_id: String, value: f64 },
}

/// Failure raised by a component for one node. Caught at the node boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ComponentError {
    #[error("missing input '{0}'")]
    MissingInput(String),
    #[error("input '{pin}' expects {expected}")]
    InvalidInput { pin: String, expected: &'static str },
    #[error("{0}")]
    Failed(String),
}

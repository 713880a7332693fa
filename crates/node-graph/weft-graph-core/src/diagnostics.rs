use serde::{Deserialize, Serialize};

use crate::types::NodeId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

/// Structured log entry buffered during load/evaluation and returned to hosts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    pub message: String,
}

impl Diagnostic {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            node_id: None,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            node_id: None,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            node_id: None,
            message: message.into(),
        }
    }

    pub fn for_node(mut self, node_id: impl Into<NodeId>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }
}

/// Per-run buffer split into `logs` and `errors`, capped at `capacity`
/// entries in total. Overflow is counted, not stored.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticBuffer {
    capacity: usize,
    pub logs: Vec<Diagnostic>,
    pub errors: Vec<Diagnostic>,
    dropped: usize,
}

impl DiagnosticBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Returns false when the entry was dropped because the buffer is full.
    pub fn push(&mut self, diagnostic: Diagnostic) -> bool {
        if self.logs.len() + self.errors.len() >= self.capacity {
            self.dropped += 1;
            return false;
        }
        if diagnostic.is_error() {
            self.errors.push(diagnostic);
        } else {
            self.logs.push(diagnostic);
        }
        true
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.logs.len() + self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume into `(logs, errors)`, appending an overflow notice to `logs`.
    pub fn finish(mut self) -> (Vec<Diagnostic>, Vec<Diagnostic>) {
        if self.dropped > 0 {
            self.logs.push(Diagnostic::warning(format!(
                "{} further diagnostics were dropped",
                self.dropped
            )));
        }
        (self.logs, self.errors)
    }
}

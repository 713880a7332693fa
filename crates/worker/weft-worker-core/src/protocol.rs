//! Wire format.
//!
//! ```json
//! { "id": 7, "type": "evaluate", "payload": { ... }, "error": { "message": "..." } }
//! ```
//!
//! Requests carry an id assigned by the initiator and every response echoes
//! it. Messages without an id are out-of-band notifications.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value as JsonValue;
use weft_graph_core::{ControlDescriptor, Diagnostic, DiagnosticLevel};
use weft_scene_core::{SerializedDisplay, TransferBuffer};

use crate::config::WorkerConfig;
use crate::error::TransportError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    Init,
    LoadGraph,
    Evaluate,
    Shutdown,
    /// Notification: informational log line.
    Log,
    /// Notification: error outside any request.
    Error,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default)]
    pub payload: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl Envelope {
    pub fn request(id: u64, kind: MessageType, payload: JsonValue) -> Self {
        Self {
            id: Some(id),
            kind,
            payload,
            error: None,
        }
    }

    pub fn failure(id: Option<u64>, kind: MessageType, message: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            payload: JsonValue::Null,
            error: Some(ErrorInfo {
                message: message.into(),
                stack: None,
            }),
        }
    }

    pub fn notification(notification: &Notification) -> Self {
        let kind = match notification.level {
            DiagnosticLevel::Error => MessageType::Error,
            DiagnosticLevel::Info | DiagnosticLevel::Warning => MessageType::Log,
        };
        Self {
            id: None,
            kind,
            payload: serde_json::to_value(notification).unwrap_or(JsonValue::Null),
            error: None,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Decode the payload, mapping serde failures to [`TransportError::Malformed`].
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        let payload = match &self.payload {
            // requests with no fields may omit the payload entirely
            JsonValue::Null => JsonValue::Object(Default::default()),
            other => other.clone(),
        };
        serde_json::from_value(payload)
            .map_err(|e| TransportError::Malformed(format!("{:?} payload: {e}", self.kind)))
    }
}

/// One unit on the channel: the JSON envelope plus the buffers whose
/// ownership moves with it.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub envelope: Envelope,
    pub transfer: Vec<TransferBuffer>,
}

impl Message {
    pub fn new(envelope: Envelope) -> Self {
        Self {
            envelope,
            transfer: Vec::new(),
        }
    }

    pub fn with_transfer(envelope: Envelope, transfer: Vec<TransferBuffer>) -> Self {
        Self { envelope, transfer }
    }

    pub fn to_json(&self) -> Result<String, TransportError> {
        serde_json::to_string(&self.envelope).map_err(|e| TransportError::Malformed(e.to_string()))
    }

    pub fn from_json(text: &str, transfer: Vec<TransferBuffer>) -> Result<Self, TransportError> {
        let envelope =
            serde_json::from_str(text).map_err(|e| TransportError::Malformed(e.to_string()))?;
        Ok(Self { envelope, transfer })
    }
}

/// Out-of-band log or error entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub level: DiagnosticLevel,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitRequest {
    /// Replaces the worker configuration when present.
    #[serde(default)]
    pub config: Option<WorkerConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitResponse {
    pub ready: bool,
    /// Registered component keys.
    pub components: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadGraphRequest {
    pub contents: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_active: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadGraphResponse {
    pub graph_id: String,
    pub summary: String,
    pub sliders: Vec<ControlDescriptor>,
    pub warnings: Vec<Diagnostic>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliderValue {
    pub node_id: String,
    pub value: f64,
    /// Targets another loaded graph; defaults to the request's graph.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    /// Defaults to the active graph.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_id: Option<String>,
    #[serde(default)]
    pub slider_values: Vec<SliderValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_active: Option<bool>,
}

/// Evaluate response as it crosses the wire. `display` indexes into the
/// message's transfer list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    pub graph_id: String,
    pub display: Option<SerializedDisplay>,
    pub sliders: Vec<ControlDescriptor>,
    pub summary: String,
    pub logs: Vec<Diagnostic>,
    pub errors: Vec<Diagnostic>,
    pub metadata: JsonValue,
}

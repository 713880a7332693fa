//! Transport between a host and an isolated evaluation context.
//!
//! Envelopes are JSON ([`protocol`]); binary scene buffers travel beside
//! them in a transfer list ([`Message`]). The worker side is
//! [`EvaluationContext`]; the initiator side is [`WorkerHost`], which
//! correlates responses by request id through [`PendingRequests`].

pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod pending;
pub mod protocol;

pub use config::WorkerConfig;
pub use context::EvaluationContext;
pub use error::TransportError;
pub use host::{EvaluateResult, FromResponse, PendingResponse, WorkerHost};
pub use pending::PendingRequests;
pub use protocol::{
    Envelope, ErrorInfo, EvaluateRequest, EvaluateResponse, InitRequest, InitResponse,
    LoadGraphRequest, LoadGraphResponse, Message, MessageType, Notification, SliderValue,
};

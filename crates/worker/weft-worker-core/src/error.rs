use thiserror::Error;

/// Failures seen by the initiator of a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The channel to the evaluation context is gone.
    #[error("transport channel closed")]
    Closed,
    #[error("host is shut down")]
    Shutdown,
    #[error("timed out waiting for response {0}")]
    Timeout(u64),
    /// The context processed the request and rejected it.
    #[error("remote error: {0}")]
    Remote(String),
    #[error("malformed message: {0}")]
    Malformed(String),
    #[error("failed to start worker: {0}")]
    Spawn(String),
}

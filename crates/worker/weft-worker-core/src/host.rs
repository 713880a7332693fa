//! Initiator side: spawns the evaluation context on its own thread and
//! turns each request into a [`PendingResponse`].

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value as JsonValue;
use weft_api_core::DisplayPayload;
use weft_graph_core::{ComponentRegistry, ControlDescriptor, Diagnostic, DiagnosticLevel};

use crate::config::WorkerConfig;
use crate::context::EvaluationContext;
use crate::error::TransportError;
use crate::pending::{Completion, PendingRequests};
use crate::protocol::{
    Envelope, EvaluateRequest, EvaluateResponse, InitRequest, InitResponse, LoadGraphRequest,
    LoadGraphResponse, Message, MessageType, Notification,
};

/// Decodes a successful response message into its typed result.
pub trait FromResponse: Sized {
    fn from_response(message: Message) -> Result<Self, TransportError>;
}

impl FromResponse for InitResponse {
    fn from_response(message: Message) -> Result<Self, TransportError> {
        message.envelope.decode()
    }
}

impl FromResponse for LoadGraphResponse {
    fn from_response(message: Message) -> Result<Self, TransportError> {
        message.envelope.decode()
    }
}

/// Evaluate response with the display rebuilt from its transfer buffers.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluateResult {
    pub graph_id: String,
    pub display: Option<DisplayPayload>,
    pub sliders: Vec<ControlDescriptor>,
    pub summary: String,
    pub logs: Vec<Diagnostic>,
    pub errors: Vec<Diagnostic>,
    pub metadata: JsonValue,
}

impl FromResponse for EvaluateResult {
    fn from_response(message: Message) -> Result<Self, TransportError> {
        let response: EvaluateResponse = message.envelope.decode()?;
        let display = response
            .display
            .as_ref()
            .map(|flat| weft_scene_core::deserialize(flat, &message.transfer))
            .transpose()
            .map_err(|e| TransportError::Malformed(e.to_string()))?;
        Ok(Self {
            graph_id: response.graph_id,
            display,
            sliders: response.sliders,
            summary: response.summary,
            logs: response.logs,
            errors: response.errors,
            metadata: response.metadata,
        })
    }
}

/// Handle for one in-flight request. Dropping it discards interest; the
/// request still runs on the worker.
#[derive(Debug)]
pub struct PendingResponse<T> {
    id: u64,
    rx: Receiver<Completion>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromResponse> PendingResponse<T> {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Block until the response arrives.
    pub fn wait(self) -> Result<T, TransportError> {
        let completion = self.rx.recv().map_err(|_| TransportError::Closed)?;
        finish(completion)
    }

    /// Block for at most `timeout`. On [`TransportError::Timeout`] the
    /// request stays pending and may be waited on again.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<T, TransportError> {
        match self.rx.recv_timeout(timeout) {
            Ok(completion) => finish(completion),
            Err(RecvTimeoutError::Timeout) => Err(TransportError::Timeout(self.id)),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }
}

fn finish<T: FromResponse>(completion: Completion) -> Result<T, TransportError> {
    let message = completion?;
    if let Some(error) = &message.envelope.error {
        return Err(TransportError::Remote(error.message.clone()));
    }
    T::from_response(message)
}

struct Shared {
    pending: Mutex<PendingRequests>,
    closed: AtomicBool,
}

impl Shared {
    fn pending(&self) -> MutexGuard<'_, PendingRequests> {
        // a panicked holder cannot leave the map half-updated
        self.pending.lock().unwrap_or_else(|p| p.into_inner())
    }
}

pub struct WorkerHost {
    shared: Arc<Shared>,
    to_worker: Option<Sender<Message>>,
    notifications: Receiver<Notification>,
    worker: Option<JoinHandle<()>>,
    dispatcher: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for WorkerHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHost")
            .field("pending", &self.shared.pending().len())
            .field("closed", &self.shared.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl WorkerHost {
    /// Start an [`EvaluationContext`] on a thread named after
    /// `config.thread_name`.
    pub fn spawn(
        config: WorkerConfig,
        components: Arc<ComponentRegistry>,
    ) -> Result<Self, TransportError> {
        let (to_worker, worker_rx) = channel::<Message>();
        let (worker_tx, from_worker) = channel::<Message>();
        let worker = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || {
                let mut context = EvaluationContext::new(config, components);
                context.run(worker_rx, worker_tx);
            })
            .map_err(|e| TransportError::Spawn(e.to_string()))?;
        let mut host = Self::connect(to_worker, from_worker)?;
        host.worker = Some(worker);
        Ok(host)
    }

    /// Attach to an already running peer. The peer must drop its sender
    /// once it has handled a shutdown request.
    pub fn connect(
        to_worker: Sender<Message>,
        from_worker: Receiver<Message>,
    ) -> Result<Self, TransportError> {
        let shared = Arc::new(Shared {
            pending: Mutex::new(PendingRequests::new()),
            closed: AtomicBool::new(false),
        });
        let (notify_tx, notifications) = channel();
        let dispatch_shared = Arc::clone(&shared);
        let dispatcher = thread::Builder::new()
            .name("weft-dispatcher".to_string())
            .spawn(move || dispatch(from_worker, &dispatch_shared, notify_tx))
            .map_err(|e| TransportError::Spawn(e.to_string()))?;
        Ok(Self {
            shared,
            to_worker: Some(to_worker),
            notifications,
            worker: None,
            dispatcher: Some(dispatcher),
        })
    }

    pub fn init(&self, request: InitRequest) -> PendingResponse<InitResponse> {
        self.request(MessageType::Init, &request)
    }

    pub fn load_graph(&self, request: LoadGraphRequest) -> PendingResponse<LoadGraphResponse> {
        self.request(MessageType::LoadGraph, &request)
    }

    pub fn evaluate(&self, request: EvaluateRequest) -> PendingResponse<EvaluateResult> {
        self.request(MessageType::Evaluate, &request)
    }

    /// Out-of-band log and error entries from the worker.
    pub fn notifications(&self) -> &Receiver<Notification> {
        &self.notifications
    }

    pub fn pending_count(&self) -> usize {
        self.shared.pending().len()
    }

    fn request<T, P>(&self, kind: MessageType, payload: &P) -> PendingResponse<T>
    where
        T: FromResponse,
        P: Serialize,
    {
        let mut pending = self.shared.pending();
        let (id, rx) = pending.register();
        let failure = match (&self.to_worker, serde_json::to_value(payload)) {
            (None, _) => Some(TransportError::Shutdown),
            _ if self.shared.closed.load(Ordering::SeqCst) => Some(TransportError::Closed),
            (_, Err(e)) => Some(TransportError::Malformed(e.to_string())),
            (Some(tx), Ok(payload)) => {
                let message = Message::new(Envelope::request(id, kind, payload));
                tx.send(message).err().map(|_| TransportError::Closed)
            }
        };
        if let Some(error) = failure {
            log::warn!("request {id} ({kind:?}) not sent: {error}");
            pending.complete(id, Err(error));
        }
        PendingResponse {
            id,
            rx,
            _marker: PhantomData,
        }
    }

    /// Reject everything pending, stop the worker and join both threads.
    /// Idempotent.
    pub fn shutdown(&mut self) {
        let Some(tx) = self.to_worker.take() else {
            return;
        };
        let rejected = {
            let mut pending = self.shared.pending();
            let rejected = pending.reject_all(TransportError::Shutdown);
            let (id, _) = pending.register();
            pending.cancel(id);
            if tx
                .send(Message::new(Envelope::request(id, MessageType::Shutdown, JsonValue::Null)))
                .is_err()
            {
                log::debug!("worker already gone at shutdown");
            }
            rejected
        };
        drop(tx);
        log::info!("worker host shutting down ({rejected} pending requests rejected)");
        for handle in [self.worker.take(), self.dispatcher.take()].into_iter().flatten() {
            if handle.join().is_err() {
                log::error!("worker thread panicked");
            }
        }
    }
}

impl Drop for WorkerHost {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn dispatch(from_worker: Receiver<Message>, shared: &Shared, notify: Sender<Notification>) {
    for message in from_worker.iter() {
        match message.envelope.id {
            Some(id) => {
                shared.pending().complete(id, Ok(message));
            }
            None => {
                let notification = message
                    .envelope
                    .decode::<Notification>()
                    .unwrap_or_else(|_| fallback_notification(&message.envelope));
                // nobody listening is fine
                let _ = notify.send(notification);
            }
        }
    }
    let mut pending = shared.pending();
    shared.closed.store(true, Ordering::SeqCst);
    let rejected = pending.reject_all(TransportError::Closed);
    if rejected > 0 {
        log::warn!("worker channel closed with {rejected} requests pending");
    }
}

fn fallback_notification(envelope: &Envelope) -> Notification {
    let level = match envelope.kind {
        MessageType::Error => DiagnosticLevel::Error,
        _ => DiagnosticLevel::Info,
    };
    let message = match (&envelope.error, &envelope.payload) {
        (Some(error), _) => error.message.clone(),
        (None, JsonValue::String(text)) => text.clone(),
        (None, other) => other.to_string(),
    };
    Notification { level, message }
}

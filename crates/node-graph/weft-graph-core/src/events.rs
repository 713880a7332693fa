//! Synchronous observer with per-listener fault isolation.
//!
//! A listener returning an error or panicking is logged and skipped; the
//! remaining listeners still run and the emitter never sees the failure.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

type Listener<E> = Box<dyn FnMut(&E) -> anyhow::Result<()>>;

/// Returned by [`EventBroker::subscribe`]; pass back to unsubscribe.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

pub struct EventBroker<E> {
    next_id: u64,
    listeners: Vec<(u64, Listener<E>)>,
}

impl<E> Default for EventBroker<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }
}

impl<E> fmt::Debug for EventBroker<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBroker")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<E: fmt::Debug> EventBroker<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerHandle
    where
        F: FnMut(&E) -> anyhow::Result<()> + 'static,
    {
        self.next_id += 1;
        self.listeners.push((self.next_id, Box::new(listener)));
        ListenerHandle(self.next_id)
    }

    /// Returns false when the handle was not (or no longer) registered.
    pub fn unsubscribe(&mut self, handle: ListenerHandle) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(id, _)| *id != handle.0);
        before != self.listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver `event` to every listener in subscription order.
    /// Returns how many listeners failed.
    pub fn emit(&mut self, event: &E) -> usize {
        let mut failures = 0;
        for (id, listener) in self.listeners.iter_mut() {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    failures += 1;
                    log::error!("listener {id} failed on {event:?}: {err:#}");
                }
                Err(panic) => {
                    failures += 1;
                    log::error!(
                        "listener {id} panicked on {event:?}: {}",
                        panic_message(panic.as_ref())
                    );
                }
            }
        }
        failures
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! Initiator-side correlation of responses to requests.

use hashbrown::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::error::TransportError;
use crate::protocol::Message;

pub type Completion = Result<Message, TransportError>;

/// id -> completion slot. Each id is completed at most once and then removed.
#[derive(Debug, Default)]
pub struct PendingRequests {
    next_id: u64,
    entries: HashMap<u64, Sender<Completion>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id (strictly increasing, starting at 1) and the
    /// receiver its completion will arrive on.
    pub fn register(&mut self) -> (u64, Receiver<Completion>) {
        self.next_id += 1;
        let (tx, rx) = channel();
        self.entries.insert(self.next_id, tx);
        (self.next_id, rx)
    }

    /// Complete `id`. Returns false for an id that is unknown or already
    /// completed; such responses are dropped.
    pub fn complete(&mut self, id: u64, result: Completion) -> bool {
        match self.entries.remove(&id) {
            Some(slot) => {
                // the caller may have stopped waiting
                let _ = slot.send(result);
                true
            }
            None => {
                log::debug!("dropping response for unknown request {id}");
                false
            }
        }
    }

    /// Forget `id` without completing it.
    pub fn cancel(&mut self, id: u64) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Reject every outstanding request with `error`.
    pub fn reject_all(&mut self, error: TransportError) -> usize {
        let count = self.entries.len();
        for (_, slot) in self.entries.drain() {
            let _ = slot.send(Err(error.clone()));
        }
        count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Envelope, MessageType};
    use serde_json::json;

    fn response(id: u64) -> Message {
        Message::new(Envelope::request(id, MessageType::Evaluate, json!({ "n": id })))
    }

    #[test]
    fn ids_strictly_increase() {
        let mut pending = PendingRequests::new();
        let ids: Vec<u64> = (0..4).map(|_| pending.register().0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn out_of_order_responses_reach_their_callers() {
        let mut pending = PendingRequests::new();
        let (a, rx_a) = pending.register();
        let (b, rx_b) = pending.register();
        let (c, rx_c) = pending.register();

        assert!(pending.complete(c, Ok(response(c))));
        assert!(pending.complete(a, Ok(response(a))));
        assert!(pending.complete(b, Ok(response(b))));

        for (id, rx) in [(a, rx_a), (b, rx_b), (c, rx_c)] {
            let msg = rx.recv().expect("completion").expect("ok");
            assert_eq!(msg.envelope.id, Some(id));
            assert_eq!(msg.envelope.payload["n"], json!(id));
        }
        assert!(pending.is_empty());
    }

    #[test]
    fn duplicate_and_unknown_ids_are_ignored() {
        let mut pending = PendingRequests::new();
        let (id, rx) = pending.register();
        assert!(pending.complete(id, Ok(response(id))));
        assert!(!pending.complete(id, Ok(response(id))));
        assert!(!pending.complete(99, Ok(response(99))));
        assert!(rx.recv().expect("first").is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn reject_all_fails_every_waiter() {
        let mut pending = PendingRequests::new();
        let receivers: Vec<_> = (0..3).map(|_| pending.register().1).collect();
        assert_eq!(pending.reject_all(TransportError::Closed), 3);
        for rx in receivers {
            assert_eq!(rx.recv().expect("completion"), Err(TransportError::Closed));
        }
        assert!(pending.is_empty());
    }
}

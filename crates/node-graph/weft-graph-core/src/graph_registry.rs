//! Store of loaded graphs and the active-graph pointer.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::events::{EventBroker, ListenerHandle};
use crate::types::{GraphId, GraphSpec};

#[derive(Clone, Debug, PartialEq)]
pub struct GraphEntry {
    pub graph: GraphSpec,
    pub name: Option<String>,
    pub metadata: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum GraphEvent {
    #[serde(rename = "graph-added")]
    Added { graph_id: GraphId },
    #[serde(rename = "graph-updated")]
    Updated { graph_id: GraphId },
    #[serde(rename = "graph-removed")]
    Removed { graph_id: GraphId },
    #[serde(rename = "active-graph-changed")]
    ActiveChanged {
        previous: Option<GraphId>,
        current: Option<GraphId>,
    },
}

#[derive(Debug, Default)]
pub struct GraphRegistry {
    graphs: IndexMap<GraphId, GraphEntry>,
    active: Option<GraphId>,
    events: EventBroker<GraphEvent>,
}

impl GraphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerHandle
    where
        F: FnMut(&GraphEvent) -> anyhow::Result<()> + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, handle: ListenerHandle) -> bool {
        self.events.unsubscribe(handle)
    }

    /// Insert or replace a graph. A fresh uuid is generated when `id` is
    /// `None`. The first graph registered becomes active.
    pub fn register_graph(
        &mut self,
        id: Option<GraphId>,
        entry: GraphEntry,
    ) -> GraphId {
        let id = id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let replaced = self.graphs.insert(id.clone(), entry).is_some();
        let event = if replaced {
            GraphEvent::Updated {
                graph_id: id.clone(),
            }
        } else {
            GraphEvent::Added {
                graph_id: id.clone(),
            }
        };
        log::debug!("graph registry: {event:?}");
        self.events.emit(&event);

        if self.active.is_none() {
            self.change_active(Some(id.clone()));
        }
        id
    }

    pub fn set_active_graph(&mut self, id: &str) -> Result<(), GraphError> {
        if !self.graphs.contains_key(id) {
            return Err(GraphError::UnknownGraph(id.to_string()));
        }
        if self.active.as_deref() != Some(id) {
            self.change_active(Some(id.to_string()));
        }
        Ok(())
    }

    /// Remove a graph. If it was active, the earliest remaining graph
    /// takes over.
    pub fn remove_graph(&mut self, id: &str) -> Option<GraphEntry> {
        let entry = self.graphs.shift_remove(id)?;
        self.events.emit(&GraphEvent::Removed {
            graph_id: id.to_string(),
        });
        if self.active.as_deref() == Some(id) {
            let next = self.graphs.keys().next().cloned();
            self.change_active(next);
        }
        Some(entry)
    }

    fn change_active(&mut self, current: Option<GraphId>) {
        let previous = std::mem::replace(&mut self.active, current.clone());
        self.events
            .emit(&GraphEvent::ActiveChanged { previous, current });
    }

    pub fn get(&self, id: &str) -> Option<&GraphEntry> {
        self.graphs.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut GraphEntry> {
        self.graphs.get_mut(id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active(&self) -> Option<(&str, &GraphEntry)> {
        let id = self.active.as_deref()?;
        self.graphs.get(id).map(|entry| (id, entry))
    }

    /// Ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.graphs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn entry() -> GraphEntry {
        GraphEntry {
            graph: GraphSpec::default(),
            name: None,
            metadata: serde_json::Value::Null,
        }
    }

    fn recorder(registry: &mut GraphRegistry) -> Rc<RefCell<Vec<GraphEvent>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        registry.subscribe(move |event| {
            sink.borrow_mut().push(event.clone());
            Ok(())
        });
        seen
    }

    #[test]
    fn lifecycle_events_fire_in_order() {
        let mut registry = GraphRegistry::new();
        let seen = recorder(&mut registry);

        let a = registry.register_graph(Some("a".into()), entry());
        let b = registry.register_graph(None, entry());
        registry.register_graph(Some("a".into()), entry());
        registry.set_active_graph(&b).expect("b exists");
        registry.remove_graph(&b).expect("b removed");

        assert_eq!(uuid::Uuid::parse_str(&b).map(|u| u.get_version_num()).ok(), Some(4));
        assert_eq!(
            *seen.borrow(),
            vec![
                GraphEvent::Added { graph_id: a.clone() },
                GraphEvent::ActiveChanged {
                    previous: None,
                    current: Some(a.clone())
                },
                GraphEvent::Added { graph_id: b.clone() },
                GraphEvent::Updated { graph_id: a.clone() },
                GraphEvent::ActiveChanged {
                    previous: Some(a.clone()),
                    current: Some(b.clone())
                },
                GraphEvent::Removed { graph_id: b.clone() },
                GraphEvent::ActiveChanged {
                    previous: Some(b),
                    current: Some(a.clone())
                },
            ]
        );
        assert_eq!(registry.active_id(), Some(a.as_str()));
    }

    #[test]
    fn unknown_graph_cannot_be_activated() {
        let mut registry = GraphRegistry::new();
        assert!(matches!(
            registry.set_active_graph("nope"),
            Err(GraphError::UnknownGraph(id)) if id == "nope"
        ));
    }

    #[test]
    fn failing_listener_does_not_block_others() {
        let mut registry = GraphRegistry::new();
        registry.subscribe(|_| anyhow::bail!("listener is broken"));
        registry.subscribe(|_| panic!("listener panics"));
        let seen = recorder(&mut registry);
        registry.register_graph(Some("g".into()), entry());
        assert_eq!(seen.borrow().len(), 2);
    }
}

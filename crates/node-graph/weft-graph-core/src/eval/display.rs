//! Display collection: walks node outputs and gathers drawables into one
//! scene plus loose points and segments into the overlay.

use hashbrown::HashSet;
use weft_api_core::{DisplayPayload, Overlay, SceneNode, Value};

use crate::component::OutputRecord;

#[derive(Debug)]
pub(crate) struct DisplayCollector {
    scene: SceneNode,
    overlay: Overlay,
    // shared drawables reached through several pins are emitted once
    seen: HashSet<*const SceneNode>,
}

impl DisplayCollector {
    pub fn new() -> Self {
        Self {
            scene: SceneNode::group("display"),
            overlay: Overlay::default(),
            seen: HashSet::new(),
        }
    }

    /// Primary pins only; alias duplicates would otherwise be drawn twice.
    pub fn collect_outputs(&mut self, outputs: &OutputRecord) {
        for (_, value) in outputs.primary() {
            self.collect(value);
        }
    }

    pub fn collect(&mut self, value: &Value) {
        match value {
            Value::Point(p) => self.overlay.points.push(*p),
            Value::Segment { start, end } => self.overlay.segments.push([*start, *end]),
            Value::Polyline(points) => self
                .overlay
                .segments
                .extend(points.windows(2).map(|w| [w[0], w[1]])),
            Value::Drawable(node) => {
                if self.seen.insert(std::sync::Arc::as_ptr(node)) {
                    self.scene.push_child(SceneNode::clone(node));
                }
            }
            Value::List(items) => items.iter().for_each(|item| self.collect(item)),
            Value::Tree(tree) => tree.values().for_each(|item| self.collect(item)),
            Value::Number(_)
            | Value::Integer(_)
            | Value::Bool(_)
            | Value::Text(_)
            | Value::Vector(_)
            | Value::Opaque(_) => {}
        }
    }

    /// `None` when nothing displayable was found.
    pub fn finish(self) -> Option<DisplayPayload> {
        let payload = DisplayPayload {
            scene: self.scene,
            overlay: self.overlay,
        };
        (!payload.is_empty()).then_some(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use weft_api_core::DataTree;

    #[test]
    fn extracts_overlay_primitives_from_nested_values() {
        let mut tree = DataTree::new();
        tree.push_branch(vec![0, 1], vec![Value::point(1.0, 2.0, 3.0)]);
        let mut collector = DisplayCollector::new();
        collector.collect(&Value::List(vec![
            Value::Number(1.0),
            Value::Tree(tree),
            Value::Polyline(vec![[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]]),
        ]));
        let payload = collector.finish().expect("something to display");
        assert_eq!(payload.overlay.points, vec![[1.0, 2.0, 3.0]]);
        assert_eq!(payload.overlay.segments.len(), 2);
        assert!(payload.scene.children.is_empty());
    }

    #[test]
    fn shared_drawable_is_collected_once() {
        let shared = Arc::new(SceneNode::group("cube"));
        let mut collector = DisplayCollector::new();
        collector.collect(&Value::Drawable(Arc::clone(&shared)));
        collector.collect(&Value::List(vec![Value::Drawable(Arc::clone(&shared))]));
        collector.collect(&Value::drawable(SceneNode::group("other")));
        let payload = collector.finish().expect("drawables");
        assert_eq!(payload.scene.children.len(), 2);
    }

    #[test]
    fn scalars_produce_nothing() {
        let mut collector = DisplayCollector::new();
        collector.collect(&Value::Number(3.0));
        collector.collect(&Value::Text("hello".into()));
        assert!(collector.finish().is_none());
    }
}

use std::sync::Arc;

use hashbrown::HashMap;
use weft_api_core::{
    AttributeData, BufferAttribute, DisplayPayload, Geometry, Overlay, Payload, SceneNode,
};

use crate::buffer::TransferBuffer;
use crate::flat::*;

/// Copy `data` into a fresh little-endian byte buffer.
pub(crate) fn attribute_bytes(data: &AttributeData) -> Vec<u8> {
    fn pack<T: Copy, const N: usize>(items: &[T], to_le: impl Fn(T) -> [u8; N]) -> Vec<u8> {
        let mut out = Vec::with_capacity(items.len() * N);
        for item in items {
            out.extend_from_slice(&to_le(*item));
        }
        out
    }
    match data {
        AttributeData::U8(v) => v.clone(),
        AttributeData::U16(v) => pack(v, u16::to_le_bytes),
        AttributeData::U32(v) => pack(v, u32::to_le_bytes),
        AttributeData::I32(v) => pack(v, i32::to_le_bytes),
        AttributeData::F32(v) => pack(v, f32::to_le_bytes),
        AttributeData::F64(v) => pack(v, f64::to_le_bytes),
    }
}

struct Encoder {
    nodes: Vec<FlatNode>,
    geometries: Vec<FlatGeometry>,
    buffers: Vec<TransferBuffer>,
    // geometry shared by several drawables is encoded once
    seen_geometry: HashMap<*const Geometry, usize>,
}

impl Encoder {
    fn push_buffer(&mut self, bytes: Vec<u8>) -> usize {
        self.buffers.push(TransferBuffer::from_bytes(bytes));
        self.buffers.len() - 1
    }

    fn attribute(&mut self, name: &str, attr: &BufferAttribute) -> FlatAttribute {
        let buffer = self.push_buffer(attribute_bytes(&attr.data));
        FlatAttribute {
            name: name.to_string(),
            component_type: attr.data.component_type(),
            item_size: attr.item_size,
            normalized: attr.normalized,
            count: attr.data.len(),
            buffer,
        }
    }

    fn geometry(&mut self, geometry: &Arc<Geometry>) -> usize {
        let key = Arc::as_ptr(geometry);
        if let Some(&index) = self.seen_geometry.get(&key) {
            return index;
        }
        let attributes = geometry
            .attributes
            .iter()
            .map(|(name, attr)| self.attribute(name, attr))
            .collect();
        let index = geometry
            .index
            .as_ref()
            .map(|attr| self.attribute("index", attr));
        self.geometries.push(FlatGeometry { attributes, index });
        let slot = self.geometries.len() - 1;
        self.seen_geometry.insert(key, slot);
        slot
    }

    fn node(&mut self, node: &SceneNode) -> usize {
        let kind = match &node.payload {
            None => FlatNodeKind::Group,
            Some(Payload::Drawable(drawable)) => FlatNodeKind::Drawable {
                primitive: drawable.primitive,
                geometry: self.geometry(&drawable.geometry),
                material: drawable.material.clone(),
            },
            Some(Payload::Custom { data }) => FlatNodeKind::Custom { data: data.clone() },
        };
        let slot = self.nodes.len();
        self.nodes.push(FlatNode {
            name: node.name.clone(),
            transform: FlatTransform::from(&node.transform),
            kind,
            children: Vec::with_capacity(node.children.len()),
        });
        for child in &node.children {
            let child_slot = self.node(child);
            self.nodes[slot].children.push(child_slot);
        }
        slot
    }

    fn overlay(&mut self, overlay: &Overlay) -> Option<FlatOverlay> {
        if overlay.is_empty() {
            return None;
        }
        let points: Vec<f64> = overlay.points.iter().flatten().copied().collect();
        let segments: Vec<f64> = overlay
            .segments
            .iter()
            .flat_map(|s| s.iter().flatten())
            .copied()
            .collect();
        Some(FlatOverlay {
            point_count: overlay.points.len(),
            points: self.push_buffer(attribute_bytes(&AttributeData::F64(points))),
            segment_count: overlay.segments.len(),
            segments: self.push_buffer(attribute_bytes(&AttributeData::F64(segments))),
        })
    }
}

/// Flatten `payload`. Every returned buffer is a fresh copy owned by the
/// caller and can be moved across the boundary without further copying.
pub fn serialize(payload: &DisplayPayload) -> (SerializedDisplay, Vec<TransferBuffer>) {
    let mut encoder = Encoder {
        nodes: Vec::with_capacity(payload.scene.node_count()),
        geometries: Vec::new(),
        buffers: Vec::new(),
        seen_geometry: HashMap::new(),
    };
    let root = encoder.node(&payload.scene);
    let overlay = encoder.overlay(&payload.overlay);
    log::debug!(
        "serialized {} nodes, {} geometries, {} buffers",
        encoder.nodes.len(),
        encoder.geometries.len(),
        encoder.buffers.len()
    );
    let flat = SerializedDisplay {
        root,
        nodes: encoder.nodes,
        geometries: encoder.geometries,
        overlay,
    };
    (flat, encoder.buffers)
}

use std::sync::Arc;

use hashbrown::HashSet;
use weft_api_core::{
    AttributeData, BufferAttribute, ComponentType, DisplayPayload, Drawable, Geometry, Overlay,
    Payload, SceneNode,
};

use crate::buffer::TransferBuffer;
use crate::error::CodecError;
use crate::flat::*;

fn unpack<T, const N: usize>(bytes: &[u8], from_le: impl Fn([u8; N]) -> T) -> Vec<T> {
    bytes
        .chunks_exact(N)
        .map(|chunk| {
            let mut raw = [0u8; N];
            raw.copy_from_slice(chunk);
            from_le(raw)
        })
        .collect()
}

fn attribute_data(ty: ComponentType, bytes: &[u8]) -> AttributeData {
    match ty {
        ComponentType::U8 => AttributeData::U8(bytes.to_vec()),
        ComponentType::U16 => AttributeData::U16(unpack(bytes, u16::from_le_bytes)),
        ComponentType::U32 => AttributeData::U32(unpack(bytes, u32::from_le_bytes)),
        ComponentType::I32 => AttributeData::I32(unpack(bytes, i32::from_le_bytes)),
        ComponentType::F32 => AttributeData::F32(unpack(bytes, f32::from_le_bytes)),
        ComponentType::F64 => AttributeData::F64(unpack(bytes, f64::from_le_bytes)),
    }
}

fn triples(values: Vec<f64>) -> Vec<[f64; 3]> {
    values
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect()
}

struct Decoder<'a> {
    flat: &'a SerializedDisplay,
    buffers: &'a [TransferBuffer],
    used_buffers: HashSet<usize>,
    geometries: Vec<Option<Arc<Geometry>>>,
    visited: HashSet<usize>,
}

impl<'a> Decoder<'a> {
    fn bytes(&mut self, buffer: usize, expected: usize) -> Result<&'a [u8], CodecError> {
        let buffers = self.buffers;
        let bytes = buffers
            .get(buffer)
            .ok_or(CodecError::MissingBuffer(buffer))?
            .as_bytes();
        if !self.used_buffers.insert(buffer) {
            return Err(CodecError::BufferReused(buffer));
        }
        if bytes.len() != expected {
            return Err(CodecError::BufferLength {
                buffer,
                expected,
                actual: bytes.len(),
            });
        }
        Ok(bytes)
    }

    fn attribute(&mut self, attr: &FlatAttribute) -> Result<BufferAttribute, CodecError> {
        if attr.item_size == 0 {
            return Err(CodecError::ZeroItemSize {
                name: attr.name.clone(),
            });
        }
        let expected = byte_len(attr.buffer, attr.count, attr.component_type.byte_size())?;
        let bytes = self.bytes(attr.buffer, expected)?;
        Ok(BufferAttribute {
            data: attribute_data(attr.component_type, bytes),
            item_size: attr.item_size,
            normalized: attr.normalized,
        })
    }

    fn geometry(&mut self, index: usize) -> Result<Arc<Geometry>, CodecError> {
        if let Some(Some(done)) = self.geometries.get(index) {
            return Ok(Arc::clone(done));
        }
        let doc = self.flat;
        let flat = doc
            .geometries
            .get(index)
            .ok_or(CodecError::MissingGeometry(index))?;
        let mut geometry = Geometry::default();
        for attr in &flat.attributes {
            let decoded = self.attribute(attr)?;
            geometry.attributes.insert(attr.name.clone(), decoded);
        }
        if let Some(attr) = &flat.index {
            geometry.index = Some(self.attribute(attr)?);
        }
        let geometry = Arc::new(geometry);
        self.geometries[index] = Some(Arc::clone(&geometry));
        Ok(geometry)
    }

    fn node(&mut self, index: usize) -> Result<SceneNode, CodecError> {
        let doc = self.flat;
        let flat = doc
            .nodes
            .get(index)
            .ok_or(CodecError::MissingNode(index))?;
        if !self.visited.insert(index) {
            return Err(CodecError::NodeRevisited(index));
        }
        let payload = match &flat.kind {
            FlatNodeKind::Group => None,
            FlatNodeKind::Drawable {
                primitive,
                geometry,
                material,
            } => Some(Payload::Drawable(Drawable {
                primitive: *primitive,
                geometry: self.geometry(*geometry)?,
                material: material.clone(),
            })),
            FlatNodeKind::Custom { data } => Some(Payload::Custom { data: data.clone() }),
        };
        let mut node = SceneNode {
            name: flat.name.clone(),
            transform: (&flat.transform).into(),
            payload,
            children: Vec::with_capacity(flat.children.len()),
        };
        for &child in &flat.children {
            node.children.push(self.node(child)?);
        }
        Ok(node)
    }

    fn overlay(&mut self, flat: &FlatOverlay) -> Result<Overlay, CodecError> {
        let expected = byte_len(flat.points, flat.point_count, 3 * 8)?;
        let points = self.bytes(flat.points, expected)?;
        let points = triples(unpack(points, f64::from_le_bytes));
        let expected = byte_len(flat.segments, flat.segment_count, 6 * 8)?;
        let segments = self.bytes(flat.segments, expected)?;
        let segments = triples(unpack(segments, f64::from_le_bytes))
            .chunks_exact(2)
            .map(|pair| [pair[0], pair[1]])
            .collect();
        Ok(Overlay { points, segments })
    }
}

/// Counts come off the wire, so the product is checked.
fn byte_len(buffer: usize, count: usize, item_bytes: usize) -> Result<usize, CodecError> {
    count
        .checked_mul(item_bytes)
        .ok_or(CodecError::SizeOverflow {
            buffer,
            count,
            item_bytes,
        })
}

/// Rebuild a payload from its flat description and transfer list.
/// Geometry shared on the sending side is shared again here.
pub fn deserialize(
    flat: &SerializedDisplay,
    buffers: &[TransferBuffer],
) -> Result<DisplayPayload, CodecError> {
    let mut decoder = Decoder {
        flat,
        buffers,
        used_buffers: HashSet::new(),
        geometries: vec![None; flat.geometries.len()],
        visited: HashSet::new(),
    };
    let scene = decoder.node(flat.root)?;
    let overlay = match &flat.overlay {
        Some(overlay) => decoder.overlay(overlay)?,
        None => Overlay::default(),
    };
    if decoder.visited.len() != flat.nodes.len() {
        log::warn!(
            "{} flat nodes unreachable from the root were ignored",
            flat.nodes.len() - decoder.visited.len()
        );
    }
    Ok(DisplayPayload { scene, overlay })
}

//! Renderable scene model produced by one evaluation.
//!
//! A [`DisplayPayload`] is a tree of [`SceneNode`]s (transform + optional
//! payload + children) plus an [`Overlay`] of loose points and segments. It is
//! rebuilt on every evaluation and never mutated in place afterwards.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Node transform. Decomposed fields are always present; when `matrix` is set
/// the receiver must treat it as authoritative instead of recomposing.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Transform {
    pub position: [f64; 3],
    /// Quaternion (x, y, z, w)
    pub rotation: [f64; 4],
    pub scale: [f64; 3],
    /// Column-major 4x4 matrix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<[f64; 16]>,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: [0.0, 0.0, 0.0],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0, 1.0, 1.0],
        matrix: None,
    };

    pub fn from_position(position: [f64; 3]) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Transform whose combined matrix is authoritative. Translation is copied
    /// into `position` so consumers that ignore the matrix still place it.
    pub fn from_matrix(matrix: [f64; 16]) -> Self {
        Self {
            position: [matrix[12], matrix[13], matrix[14]],
            matrix: Some(matrix),
            ..Self::IDENTITY
        }
    }

    pub fn is_decomposed(&self) -> bool {
        self.matrix.is_none()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Element type of a typed attribute buffer.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    U8,
    U16,
    U32,
    I32,
    F32,
    F64,
}

impl ComponentType {
    pub fn byte_size(self) -> usize {
        match self {
            ComponentType::U8 => 1,
            ComponentType::U16 => 2,
            ComponentType::U32 | ComponentType::I32 | ComponentType::F32 => 4,
            ComponentType::F64 => 8,
        }
    }
}

/// Typed numeric storage backing an attribute.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum AttributeData {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl AttributeData {
    pub fn component_type(&self) -> ComponentType {
        match self {
            AttributeData::U8(_) => ComponentType::U8,
            AttributeData::U16(_) => ComponentType::U16,
            AttributeData::U32(_) => ComponentType::U32,
            AttributeData::I32(_) => ComponentType::I32,
            AttributeData::F32(_) => ComponentType::F32,
            AttributeData::F64(_) => ComponentType::F64,
        }
    }

    /// Number of scalar elements.
    pub fn len(&self) -> usize {
        match self {
            AttributeData::U8(v) => v.len(),
            AttributeData::U16(v) => v.len(),
            AttributeData::U32(v) => v.len(),
            AttributeData::I32(v) => v.len(),
            AttributeData::F32(v) => v.len(),
            AttributeData::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BufferAttribute {
    pub data: AttributeData,
    /// Components per vertex (3 for positions, 1 for indices).
    pub item_size: usize,
    #[serde(default)]
    pub normalized: bool,
}

impl BufferAttribute {
    pub fn new(data: AttributeData, item_size: usize) -> Self {
        Self {
            data,
            item_size,
            normalized: false,
        }
    }

    /// Number of items (vertices) described by this attribute.
    pub fn count(&self) -> usize {
        if self.item_size == 0 {
            0
        } else {
            self.data.len() / self.item_size
        }
    }
}

/// Indexed or non-indexed geometry. Attribute order is preserved.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Geometry {
    pub attributes: IndexMap<String, BufferAttribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<BufferAttribute>,
}

impl Geometry {
    pub fn with_positions(positions: Vec<f32>) -> Self {
        let mut attributes = IndexMap::new();
        attributes.insert(
            "position".to_string(),
            BufferAttribute::new(AttributeData::F32(positions), 3),
        );
        Self {
            attributes,
            index: None,
        }
    }

    pub fn with_index(mut self, index: Vec<u32>) -> Self {
        self.index = Some(BufferAttribute::new(AttributeData::U32(index), 1));
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.attributes
            .get("position")
            .map(BufferAttribute::count)
            .unwrap_or(0)
    }
}

#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    #[default]
    Standard,
    Basic,
    Line,
    Point,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Material {
    pub kind: MaterialKind,
    /// Linear RGB
    pub color: [f32; 3],
    pub opacity: f32,
    #[serde(default)]
    pub wireframe: bool,
    /// Point size or line width, depending on kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            kind: MaterialKind::Standard,
            color: [0.8, 0.8, 0.8],
            opacity: 1.0,
            wireframe: false,
            size: None,
        }
    }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Mesh,
    Lines,
    Points,
}

/// Geometry plus material. Geometry is shared so several nodes can reference
/// one buffer set without copying.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Drawable {
    pub primitive: PrimitiveKind,
    pub geometry: Arc<Geometry>,
    pub material: Material,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Payload {
    Drawable(Drawable),
    /// Passed through untouched for hosts that know how to render it.
    Custom { data: serde_json::Value },
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    #[serde(default)]
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// Transform-only node.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn drawable(name: impl Into<String>, drawable: Drawable) -> Self {
        Self {
            name: name.into(),
            payload: Some(Payload::Drawable(drawable)),
            ..Default::default()
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn push_child(&mut self, child: SceneNode) {
        self.children.push(child);
    }

    /// Count of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SceneNode::node_count).sum::<usize>()
    }
}

/// Loose points and segments drawn on top of the scene.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Overlay {
    pub points: Vec<[f64; 3]>,
    pub segments: Vec<[[f64; 3]; 2]>,
}

impl Overlay {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.segments.is_empty()
    }
}

/// Everything one evaluation hands to the renderer.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DisplayPayload {
    pub scene: SceneNode,
    pub overlay: Overlay,
}

impl DisplayPayload {
    pub fn is_empty(&self) -> bool {
        self.scene.children.is_empty() && self.scene.payload.is_none() && self.overlay.is_empty()
    }
}

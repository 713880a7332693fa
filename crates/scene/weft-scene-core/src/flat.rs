//! Transport-safe description. Everything here is plain JSON; numeric
//! arrays live in the transfer list and are referenced by index.

use serde::{Deserialize, Serialize};
use weft_api_core::{ComponentType, Material, PrimitiveKind, Transform};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedDisplay {
    /// Index of the scene root in `nodes`.
    pub root: usize,
    /// Pre-order; children are referenced by index.
    pub nodes: Vec<FlatNode>,
    /// Shared geometries, each listed once.
    pub geometries: Vec<FlatGeometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay: Option<FlatOverlay>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatNode {
    pub name: String,
    pub transform: FlatTransform,
    #[serde(flatten)]
    pub kind: FlatNodeKind,
    #[serde(default)]
    pub children: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FlatNodeKind {
    Group,
    Drawable {
        primitive: PrimitiveKind,
        geometry: usize,
        material: Material,
    },
    Custom {
        data: serde_json::Value,
    },
}

/// Position, rotation and scale are always sent. `decomposed` tells the
/// receiver whether to keep them as-is or to use `matrix`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatTransform {
    pub position: [f64; 3],
    pub rotation: [f64; 4],
    pub scale: [f64; 3],
    pub decomposed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<[f64; 16]>,
}

impl From<&Transform> for FlatTransform {
    fn from(t: &Transform) -> Self {
        Self {
            position: t.position,
            rotation: t.rotation,
            scale: t.scale,
            decomposed: t.is_decomposed(),
            matrix: t.matrix,
        }
    }
}

impl From<&FlatTransform> for Transform {
    fn from(t: &FlatTransform) -> Self {
        Transform {
            position: t.position,
            rotation: t.rotation,
            scale: t.scale,
            matrix: if t.decomposed { None } else { t.matrix },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatAttribute {
    pub name: String,
    pub component_type: ComponentType,
    pub item_size: usize,
    #[serde(default)]
    pub normalized: bool,
    /// Scalar element count; the buffer holds `count * byte_size` bytes.
    pub count: usize,
    pub buffer: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatGeometry {
    pub attributes: Vec<FlatAttribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<FlatAttribute>,
}

/// Overlay coordinates packed as little-endian f64 triples.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatOverlay {
    pub point_count: usize,
    pub points: usize,
    pub segment_count: usize,
    pub segments: usize,
}

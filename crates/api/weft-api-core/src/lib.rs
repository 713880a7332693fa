//! weft-api-core: value and scene model shared by the engine, codec and transport.

pub mod coercion;
pub mod json;
pub mod scene;
pub mod tree;
pub mod value;

pub use scene::{
    AttributeData, BufferAttribute, ComponentType, DisplayPayload, Drawable, Geometry, Material,
    MaterialKind, Overlay, Payload, PrimitiveKind, SceneNode, Transform,
};
pub use tree::{Branch, DataTree};
pub use value::{Value, ValueKind};

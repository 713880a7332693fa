use std::sync::Arc;

use weft_api_core::{
    coercion, Drawable, Geometry, Material, PrimitiveKind, SceneNode, Value,
};

use crate::component::{Component, InputRecord, NodeState, OutputRecord};
use crate::error::ComponentError;
use crate::pin::PinTranslation;
use crate::types::NodeSpec;

fn number_or(inputs: &InputRecord, pin: &'static str, default: f64) -> Result<f64, ComponentError> {
    match inputs.get(pin) {
        None => Ok(default),
        Some(v) => coercion::to_number(v).ok_or(ComponentError::InvalidInput {
            pin: pin.to_string(),
            expected: "a number",
        }),
    }
}

fn point(inputs: &InputRecord, pin: &'static str) -> Result<[f64; 3], ComponentError> {
    let value = inputs
        .get(pin)
        .ok_or_else(|| ComponentError::MissingInput(pin.to_string()))?;
    coercion::to_point(value).ok_or(ComponentError::InvalidInput {
        pin: pin.to_string(),
        expected: "a point",
    })
}

/// `{X, Y, Z}` -> point. Missing coordinates are zero.
pub struct ConstructPoint;

impl Component for ConstructPoint {
    fn evaluate(
        &self,
        _node: &NodeSpec,
        inputs: &InputRecord,
        _state: Option<&mut NodeState>,
    ) -> Result<OutputRecord, ComponentError> {
        let x = number_or(inputs, "X", 0.0)?;
        let y = number_or(inputs, "Y", 0.0)?;
        let z = number_or(inputs, "Z", 0.0)?;
        Ok(OutputRecord::single("Pt", Value::point(x, y, z)))
    }

    fn pins(&self) -> PinTranslation {
        PinTranslation::new()
            .input("X", "X coordinate")
            .input("Y", "Y coordinate")
            .input("Z", "Z coordinate")
            .output("Pt", "Point")
    }
}

/// Segment between two points.
pub struct LineComponent;

impl Component for LineComponent {
    fn evaluate(
        &self,
        _node: &NodeSpec,
        inputs: &InputRecord,
        _state: Option<&mut NodeState>,
    ) -> Result<OutputRecord, ComponentError> {
        let start = point(inputs, "A")?;
        let end = point(inputs, "B")?;
        Ok(OutputRecord::single("L", Value::segment(start, end)))
    }

    fn pins(&self) -> PinTranslation {
        PinTranslation::new()
            .input("A", "Start Point")
            .input("B", "End Point")
            .output("L", "Line")
    }
}

/// Axis-aligned cube centred on the origin.
pub struct BoxComponent;

const CUBE_CORNERS: [[f32; 3]; 8] = [
    [-0.5, -0.5, -0.5],
    [0.5, -0.5, -0.5],
    [0.5, 0.5, -0.5],
    [-0.5, 0.5, -0.5],
    [-0.5, -0.5, 0.5],
    [0.5, -0.5, 0.5],
    [0.5, 0.5, 0.5],
    [-0.5, 0.5, 0.5],
];

// two counter-clockwise triangles per face
const CUBE_INDICES: [u32; 36] = [
    0, 3, 2, 0, 2, 1, // -z
    4, 5, 6, 4, 6, 7, // +z
    0, 1, 5, 0, 5, 4, // -y
    3, 7, 6, 3, 6, 2, // +y
    0, 4, 7, 0, 7, 3, // -x
    1, 2, 6, 1, 6, 5, // +x
];

pub(crate) fn cube_geometry(size: f32) -> Geometry {
    let positions = CUBE_CORNERS
        .iter()
        .flat_map(|corner| corner.iter().map(move |c| c * size))
        .collect();
    Geometry::with_positions(positions).with_index(CUBE_INDICES.to_vec())
}

impl Component for BoxComponent {
    fn evaluate(
        &self,
        node: &NodeSpec,
        inputs: &InputRecord,
        _state: Option<&mut NodeState>,
    ) -> Result<OutputRecord, ComponentError> {
        let size = number_or(inputs, "S", 1.0)?;
        if !size.is_finite() || size <= 0.0 {
            return Err(ComponentError::InvalidInput {
                pin: "S".into(),
                expected: "a positive size",
            });
        }
        let drawable = Drawable {
            primitive: PrimitiveKind::Mesh,
            geometry: Arc::new(cube_geometry(size as f32)),
            material: Material::default(),
        };
        let scene = SceneNode::drawable(node.identity.display_name(), drawable);
        Ok(OutputRecord::single("B", Value::drawable(scene)))
    }

    fn pins(&self) -> PinTranslation {
        PinTranslation::new().input("S", "Size").output("B", "Box")
    }
}

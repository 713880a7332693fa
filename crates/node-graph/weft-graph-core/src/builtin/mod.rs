//! Built-in component family.
//!
//! Enough to drive fixtures and hosts that ship without a geometry library:
//! parameters (number, slider, panel), scalar math and a few primitives.

mod geometry;
mod math;
mod params;

use crate::registry::ComponentRegistryBuilder;

pub use geometry::{BoxComponent, ConstructPoint, LineComponent};
pub use math::Addition;
pub use params::{NumberComponent, NumberSlider, Panel};

pub mod ids {
    pub const NUMBER: &str = "weft.params.number";
    pub const NUMBER_SLIDER: &str = "weft.params.number_slider";
    pub const PANEL: &str = "weft.params.panel";
    pub const ADDITION: &str = "weft.math.addition";
    pub const CONSTRUCT_POINT: &str = "weft.vector.construct_point";
    pub const LINE: &str = "weft.curve.line";
    pub const BOX: &str = "weft.surface.box";
}

/// Register every built-in under its stable id and its display names.
pub fn register(builder: &mut ComponentRegistryBuilder) {
    builder
        .register(&[ids::NUMBER, "Number", "Num"], NumberComponent)
        .register(&[ids::NUMBER_SLIDER, "Number Slider", "Slider"], NumberSlider)
        .register(&[ids::PANEL, "Panel"], Panel)
        .register(&[ids::ADDITION, "Addition", "Add"], Addition)
        .register(&[ids::CONSTRUCT_POINT, "Construct Point", "Pt"], ConstructPoint)
        .register(&[ids::LINE, "Line", "Ln"], LineComponent)
        .register(&[ids::BOX, "Box", "Center Box"], BoxComponent);
}

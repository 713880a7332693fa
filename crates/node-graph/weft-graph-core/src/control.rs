//! Interactive controls (number sliders) backed by persistent node state.

use serde::{Deserialize, Serialize};

use crate::types::{NodeId, NodeSpec};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlState {
    pub value: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
}

impl ControlState {
    /// Seed from `meta.{min,max,step,value}`; the initial value is clamped too.
    pub fn from_node(node: &NodeSpec) -> Self {
        let mut state = ControlState {
            value: 0.0,
            min: node.meta_number("min"),
            max: node.meta_number("max"),
            step: node.meta_number("step"),
        };
        let initial = node
            .meta_number("value")
            .or(state.min)
            .unwrap_or(0.0);
        state.set(initial);
        state
    }

    /// Whether `value` lies within `[min, max]`.
    pub fn contains(&self, value: f64) -> bool {
        let lo = self.min.unwrap_or(f64::NEG_INFINITY);
        let hi = self.max.unwrap_or(f64::INFINITY);
        (lo..=hi).contains(&value)
    }

    /// Clamp into `[min, max]`, snap onto the `step` grid anchored at `min`,
    /// clamp again, store and return the effective value. A result that is
    /// not finite leaves the current value in place.
    pub fn set(&mut self, value: f64) -> f64 {
        let lo = self.min.unwrap_or(f64::NEG_INFINITY);
        let hi = self.max.unwrap_or(f64::INFINITY);
        let mut v = value.max(lo).min(hi);
        if let Some(step) = self.step.filter(|s| *s > 0.0 && s.is_finite()) {
            if let Some(min) = self.min {
                v = min + ((v - min) / step).round() * step;
            }
            v = v.max(lo).min(hi);
        }
        if !v.is_finite() {
            return self.value;
        }
        self.value = v;
        v
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Slider,
}

/// Control as shown to the host UI. Lists are replaced wholesale per evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlDescriptor {
    pub id: String,
    pub node_id: NodeId,
    pub name: String,
    pub kind: ControlKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    pub value: f64,
}

impl ControlDescriptor {
    pub fn slider(node: &NodeSpec, state: &ControlState) -> Self {
        Self {
            id: node.id.clone(),
            node_id: node.id.clone(),
            name: node.identity.display_name().to_string(),
            kind: ControlKind::Slider,
            min: state.min,
            max: state.max,
            step: state.step,
            value: state.value,
        }
    }
}

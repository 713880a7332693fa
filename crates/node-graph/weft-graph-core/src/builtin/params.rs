use weft_api_core::{coercion, json::value_from_json, Value};

use crate::component::{Component, InputRecord, NodeState, OutputRecord};
use crate::control::ControlState;
use crate::error::ComponentError;
use crate::pin::PinTranslation;
use crate::types::NodeSpec;

/// Constant number. Reads pin `N`, falling back to `meta.value`.
pub struct NumberComponent;

impl Component for NumberComponent {
    fn evaluate(
        &self,
        node: &NodeSpec,
        inputs: &InputRecord,
        _state: Option<&mut NodeState>,
    ) -> Result<OutputRecord, ComponentError> {
        let value = match inputs.get("N") {
            Some(v) => v.clone(),
            None => match node.meta.get("value") {
                Some(raw) => value_from_json(raw.clone())
                    .map_err(|e| ComponentError::Failed(e.to_string()))?,
                None => Value::Number(0.0),
            },
        };
        Ok(OutputRecord::single("N", value))
    }

    fn pins(&self) -> PinTranslation {
        PinTranslation::new()
            .input("N", "Number")
            .output("N", "Number")
    }
}

/// Stateful slider. The engine writes control values into its state.
pub struct NumberSlider;

impl Component for NumberSlider {
    fn evaluate(
        &self,
        node: &NodeSpec,
        _inputs: &InputRecord,
        state: Option<&mut NodeState>,
    ) -> Result<OutputRecord, ComponentError> {
        let value = match state {
            Some(NodeState::Control(control)) => control.value,
            _ => ControlState::from_node(node).value,
        };
        Ok(OutputRecord::single("N", Value::Number(value)))
    }

    fn create_state(&self, node: &NodeSpec) -> Option<NodeState> {
        Some(NodeState::Control(ControlState::from_node(node)))
    }

    fn pins(&self) -> PinTranslation {
        PinTranslation::new().output("N", "Number")
    }
}

/// Passthrough. With nothing wired, shows `meta.text`.
pub struct Panel;

impl Component for Panel {
    fn evaluate(
        &self,
        node: &NodeSpec,
        inputs: &InputRecord,
        _state: Option<&mut NodeState>,
    ) -> Result<OutputRecord, ComponentError> {
        let value = inputs
            .get("input")
            .cloned()
            .or_else(|| node.meta_text("text").map(|t| Value::Text(t.to_string())))
            .unwrap_or_else(|| Value::Text(String::new()));
        let mut out = OutputRecord::single("output", value.clone());
        out.insert_alias("text", Value::Text(coercion::to_text(&value)));
        Ok(out)
    }

    fn pins(&self) -> PinTranslation {
        PinTranslation::new()
            .input("input", "in")
            .output("output", "out")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeIdentity;
    use serde_json::json;

    #[test]
    fn number_prefers_input_over_meta() {
        let node = NodeSpec::new("n", NodeIdentity::named("Number")).with_meta("value", json!(3));
        let out = NumberComponent
            .evaluate(&node, &InputRecord::new(), None)
            .expect("number");
        assert_eq!(out.get("N"), Some(&Value::Number(3.0)));

        let mut inputs = InputRecord::new();
        inputs.insert("N".into(), Value::Number(9.0));
        let out = NumberComponent.evaluate(&node, &inputs, None).expect("number");
        assert_eq!(out.get("N"), Some(&Value::Number(9.0)));
    }

    #[test]
    fn slider_reads_its_state() {
        let node = NodeSpec::new("s", NodeIdentity::named("Number Slider"))
            .with_meta("min", json!(0))
            .with_meta("max", json!(10))
            .with_meta("value", json!(4));
        let mut state = NumberSlider.create_state(&node).expect("slider state");
        if let NodeState::Control(control) = &mut state {
            control.set(7.0);
        }
        let out = NumberSlider
            .evaluate(&node, &InputRecord::new(), Some(&mut state))
            .expect("slider");
        assert_eq!(out.get("N"), Some(&Value::Number(7.0)));
    }

    #[test]
    fn panel_renders_text() {
        let node = NodeSpec::new("p", NodeIdentity::named("Panel"));
        let mut inputs = InputRecord::new();
        inputs.insert("input".into(), Value::Number(5.0));
        let out = Panel.evaluate(&node, &inputs, None).expect("panel");
        assert_eq!(out.get("output"), Some(&Value::Number(5.0)));
        assert_eq!(out.get("text"), Some(&Value::Text("5".into())));
    }
}

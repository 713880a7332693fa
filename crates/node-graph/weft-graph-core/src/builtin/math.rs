use weft_api_core::{coercion, Value};

use crate::component::{Component, InputRecord, NodeState, OutputRecord};
use crate::error::ComponentError;
use crate::pin::PinTranslation;
use crate::types::NodeSpec;

/// `R = A + B`. Lists are flattened and summed item by item, the shorter
/// side repeating its last item. Missing inputs count as zero.
pub struct Addition;

fn operand(inputs: &InputRecord, pin: &'static str) -> Result<Vec<f64>, ComponentError> {
    let Some(value) = inputs.get(pin) else {
        return Ok(vec![0.0]);
    };
    let items = coercion::flatten(value);
    if items.is_empty() {
        return Ok(vec![0.0]);
    }
    items
        .iter()
        .map(|item| {
            coercion::to_number(item).ok_or(ComponentError::InvalidInput {
                pin: pin.to_string(),
                expected: "a number",
            })
        })
        .collect()
}

impl Component for Addition {
    fn evaluate(
        &self,
        _node: &NodeSpec,
        inputs: &InputRecord,
        _state: Option<&mut NodeState>,
    ) -> Result<OutputRecord, ComponentError> {
        let a = operand(inputs, "A")?;
        let b = operand(inputs, "B")?;
        let len = a.len().max(b.len());
        let at = |xs: &[f64], i: usize| xs[i.min(xs.len() - 1)];
        let sums: Vec<Value> = (0..len)
            .map(|i| Value::Number(at(&a, i) + at(&b, i)))
            .collect();

        let result = match <[Value; 1]>::try_from(sums) {
            Ok([single]) => single,
            Err(many) => Value::List(many),
        };
        Ok(OutputRecord::single("R", result))
    }

    fn pins(&self) -> PinTranslation {
        PinTranslation::new()
            .input("A", "First number")
            .input("B", "Second number")
            .output("R", "Result")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeIdentity;

    fn add(a: Option<Value>, b: Option<Value>) -> Result<OutputRecord, ComponentError> {
        let node = NodeSpec::new("add", NodeIdentity::named("Addition"));
        let mut inputs = InputRecord::new();
        if let Some(a) = a {
            inputs.insert("A".into(), a);
        }
        if let Some(b) = b {
            inputs.insert("B".into(), b);
        }
        Addition.evaluate(&node, &inputs, None)
    }

    #[test]
    fn adds_scalars_and_defaults_missing_to_zero() {
        let out = add(Some(Value::Number(2.0)), Some(Value::Number(3.5))).expect("add");
        assert_eq!(out.get("R"), Some(&Value::Number(5.5)));
        let out = add(Some(Value::Number(2.0)), None).expect("add");
        assert_eq!(out.get("R"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn adds_lists_item_by_item() {
        let list = Value::List(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]);
        let out = add(Some(list), Some(Value::Number(10.0))).expect("add");
        assert_eq!(
            out.get("R"),
            Some(&Value::List(vec![
                Value::Number(11.0),
                Value::Number(12.0),
                Value::Number(13.0)
            ]))
        );
    }

    #[test]
    fn rejects_non_numeric_input() {
        let err = add(Some(Value::Text("abc".into())), None).expect_err("text is not a number");
        assert_eq!(
            err,
            ComponentError::InvalidInput {
                pin: "A".into(),
                expected: "a number"
            }
        );
    }
}

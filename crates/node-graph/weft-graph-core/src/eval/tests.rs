use super::*;
use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;
use weft_api_core::Value;

use crate::component::from_fn;
use crate::registry::ComponentRegistryBuilder;
use crate::types::{NodeIdentity, NodeSpec, Wire};

fn registry() -> Arc<ComponentRegistry> {
    let mut builder = ComponentRegistryBuilder::new().with_family(crate::builtin::register);
    builder.register(
        &["Explode"],
        from_fn(|_, _| Err(ComponentError::Failed("exploded".into()))),
    );
    builder.register(
        &["Panic"],
        from_fn(|_, _| -> Result<OutputRecord, ComponentError> { panic!("component bug") }),
    );
    Arc::new(builder.build())
}

fn engine() -> EvaluationEngine {
    EvaluationEngine::new(registry(), EngineConfig::default())
}

fn node(id: &str, name: &str) -> NodeSpec {
    NodeSpec::new(id, NodeIdentity::named(name))
}

fn number(id: &str, v: f64) -> NodeSpec {
    node(id, "Number").with_input("N", Value::Number(v))
}

fn wire(from: &str, from_pin: &str, to: &str, to_pin: &str) -> Wire {
    Wire::new(PinRef::new(from, from_pin), PinRef::new(to, to_pin))
}

fn load(engine: &mut EvaluationEngine, nodes: Vec<NodeSpec>, wires: Vec<Wire>) {
    engine.set_graph(Some("g".into()), GraphSpec { nodes, wires });
}

fn input_of(engine: &EvaluationEngine, node: &str, pin: &str) -> Option<Value> {
    engine.node_inputs(node)?.get(pin).cloned()
}

fn output_of(engine: &EvaluationEngine, node: &str, pin: &str) -> Option<Value> {
    engine.node_outputs(node)?.get(pin).cloned()
}

#[derive(Clone, Default)]
struct RecordingRenderer {
    calls: Rc<RefCell<Vec<Option<DisplayPayload>>>>,
}

impl Renderer for RecordingRenderer {
    fn update_mesh(&mut self, payload: Option<&DisplayPayload>) {
        self.calls.borrow_mut().push(payload.cloned());
    }
}

#[test]
fn propagates_values_through_the_graph() {
    let mut engine = engine();
    load(
        &mut engine,
        vec![
            node("sum", "Addition"),
            number("a", 2.0),
            number("b", 3.0),
            node("panel", "Panel"),
        ],
        vec![
            wire("a", "Number", "sum", "First number"),
            wire("b", "N", "sum", "B"),
            wire("sum", "Result", "panel", "input"),
        ],
    );
    let report = engine.evaluate();
    assert_eq!(report.evaluated, 4);
    assert_eq!(report.failed, 0);
    assert_eq!(report.summary, "evaluated 4 of 4 nodes");
    assert_eq!(output_of(&engine, "sum", "R"), Some(Value::Number(5.0)));
    assert_eq!(output_of(&engine, "sum", "result"), Some(Value::Number(5.0)));
    assert_eq!(output_of(&engine, "panel", "output"), Some(Value::Number(5.0)));
}

#[test]
fn fan_in_resolves_to_list_in_wire_order() {
    let mut engine = engine();
    load(
        &mut engine,
        vec![
            number("a", 1.0),
            number("b", 2.0),
            number("c", 3.0),
            node("many", "Panel"),
            node("one", "Panel"),
        ],
        vec![
            wire("c", "N", "many", "input"),
            wire("a", "N", "many", "input"),
            wire("b", "N", "many", "input"),
            wire("a", "N", "one", "input"),
        ],
    );
    engine.evaluate();
    assert_eq!(
        input_of(&engine, "many", "input"),
        Some(Value::List(vec![
            Value::Number(3.0),
            Value::Number(1.0),
            Value::Number(2.0)
        ]))
    );
    assert_eq!(input_of(&engine, "one", "input"), Some(Value::Number(1.0)));
}

#[test]
fn fan_in_list_sums_through_addition() {
    let mut engine = engine();
    load(
        &mut engine,
        vec![number("a", 1.0), number("b", 2.0), node("sum", "Addition")],
        vec![wire("a", "N", "sum", "A"), wire("b", "N", "sum", "A")],
    );
    engine.evaluate();
    assert_eq!(
        output_of(&engine, "sum", "R"),
        Some(Value::List(vec![Value::Number(1.0), Value::Number(2.0)]))
    );
}

#[test]
fn cycle_is_reported_and_the_rest_evaluates() {
    let mut engine = engine();
    load(
        &mut engine,
        vec![
            number("free", 4.0),
            node("x", "Addition"),
            node("y", "Addition"),
            node("after", "Panel"),
            node("tail", "Panel"),
        ],
        vec![
            wire("x", "R", "y", "A"),
            wire("y", "R", "x", "A"),
            wire("y", "R", "after", "input"),
            wire("free", "N", "tail", "input"),
        ],
    );
    let report = engine.evaluate();
    assert!(report.has_cycle);
    assert_eq!(report.evaluated, 2);
    assert_eq!(report.skipped, 3);
    assert!(engine.topology().order.len() < engine.graph().nodes.len());
    assert_eq!(output_of(&engine, "tail", "output"), Some(Value::Number(4.0)));
    assert!(engine.node_outputs("x").is_none());
    assert_eq!(
        report.logs.iter().filter(|d| d.message.contains("cycle")).count(),
        1
    );
    assert_eq!(report.summary, "evaluated 2 of 5 nodes (3 skipped, cycle detected)");
}

#[test]
fn failing_node_yields_empty_output_and_one_error() {
    let mut engine = engine();
    load(
        &mut engine,
        vec![
            node("bad", "Explode"),
            node("panel", "Panel").with_input("input", Value::Text("fallback".into())),
            number("ok", 1.0),
        ],
        vec![wire("bad", "out", "panel", "input")],
    );
    let report = engine.evaluate();
    assert_eq!(report.evaluated, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].node_id.as_deref(), Some("bad"));
    assert!(report.errors[0].message.contains("exploded"));

    assert!(engine.node_outputs("bad").expect("record stored").is_empty());
    assert_eq!(
        output_of(&engine, "panel", "output"),
        Some(Value::Text("fallback".into()))
    );
    assert_eq!(output_of(&engine, "ok", "N"), Some(Value::Number(1.0)));
}

#[test]
fn panicking_node_is_isolated() {
    let mut engine = engine();
    load(
        &mut engine,
        vec![node("p", "Panic"), number("after", 2.0)],
        vec![],
    );
    let report = engine.evaluate();
    assert_eq!(report.failed, 1);
    assert!(report.errors[0].message.contains("component bug"));
    assert_eq!(output_of(&engine, "after", "N"), Some(Value::Number(2.0)));
}

#[test]
fn unknown_component_is_skipped_with_warning() {
    let mut engine = engine();
    let warnings = engine.set_graph(
        Some("g".into()),
        GraphSpec {
            nodes: vec![
                node("mystery", "Quantum Flux"),
                node("panel", "Panel").with_input("input", Value::Number(1.0)),
            ],
            wires: vec![wire("mystery", "out", "panel", "input")],
        },
    );
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].node_id.as_deref(), Some("mystery"));

    let report = engine.evaluate();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.evaluated, 1);
    assert!(report.errors.is_empty());
    assert_eq!(output_of(&engine, "panel", "output"), Some(Value::Number(1.0)));
}

#[test]
fn disconnect_falls_back_to_declared_default() {
    let mut engine = engine();
    load(
        &mut engine,
        vec![
            number("five", 5.0),
            node("consumer", "Panel").with_input("input", Value::Number(-1.0)),
        ],
        vec![wire("five", "N", "consumer", "input")],
    );
    engine.evaluate();
    assert_eq!(input_of(&engine, "consumer", "input"), Some(Value::Number(5.0)));

    assert_eq!(engine.disconnect(&PinRef::new("consumer", "input")), 1);
    engine.evaluate();
    assert_eq!(input_of(&engine, "consumer", "input"), Some(Value::Number(-1.0)));
}

fn slider(id: &str, nickname: &str) -> NodeSpec {
    let mut spec = node(id, "Number Slider")
        .with_meta("min", json!(0))
        .with_meta("max", json!(10))
        .with_meta("step", json!(0.5))
        .with_meta("value", json!(2));
    spec.identity.nickname = Some(nickname.to_string());
    spec
}

#[test]
fn control_state_survives_graph_rebuilds() {
    let mut engine = engine();
    load(&mut engine, vec![slider("s", "Width"), slider("t", "Height")], vec![]);
    assert_eq!(engine.controls().len(), 2);
    assert_eq!(engine.set_control_value("s", 7.3).expect("slider"), 7.5);

    load(
        &mut engine,
        vec![slider("s", "Width"), node("panel", "Panel")],
        vec![wire("s", "N", "panel", "input")],
    );
    let controls = engine.controls();
    assert_eq!(controls.len(), 1);
    assert_eq!(controls[0].value, 7.5);
    assert!(engine.node_state("t").is_none());

    engine.evaluate();
    assert_eq!(output_of(&engine, "panel", "output"), Some(Value::Number(7.5)));

    assert_eq!(engine.reset_control("s").expect("slider"), 2.0);
}

#[test]
fn changed_meta_reseeds_control_bounds() {
    let mut engine = engine();
    load(&mut engine, vec![slider("s", "Width")], vec![]);
    assert_eq!(engine.set_control_value("s", 7.5).expect("slider"), 7.5);

    let narrower = slider("s", "Width").with_meta("max", json!(8));
    load(&mut engine, vec![narrower], vec![]);
    let control = &engine.controls()[0];
    assert_eq!((control.max, control.value), (Some(8.0), 7.5));

    let narrowest = slider("s", "Width").with_meta("max", json!(5));
    load(&mut engine, vec![narrowest], vec![]);
    let control = &engine.controls()[0];
    assert_eq!((control.max, control.value), (Some(5.0), 2.0));
}

#[test]
fn changed_identity_drops_control_state() {
    let mut engine = engine();
    load(&mut engine, vec![slider("s", "Width")], vec![]);
    assert_eq!(engine.controls().len(), 1);

    load(&mut engine, vec![number("s", 4.0)], vec![]);
    assert!(engine.controls().is_empty());
    assert!(engine.node_state("s").is_none());
    assert!(matches!(
        engine.set_control_value("s", 1.0),
        Err(GraphError::UnknownControl(_))
    ));
}

#[test]
fn controls_are_found_by_nickname_or_name() {
    let mut engine = engine();
    load(&mut engine, vec![number("n", 1.0), slider("s", "Width")], vec![]);
    assert_eq!(engine.find_control("width").map(|c| c.node_id), Some("s".to_string()));
    assert_eq!(engine.find_control("s").map(|c| c.name), Some("Width".to_string()));
    assert_eq!(
        engine.find_control("NUMBER SLIDER").map(|c| c.node_id),
        Some("s".to_string())
    );
    assert!(engine.find_control("n").is_none());
    assert!(matches!(
        engine.set_control_value("n", 1.0),
        Err(GraphError::UnknownControl(id)) if id == "n"
    ));
}

#[test]
fn renderer_receives_visible_drawables_once() {
    let mut engine = engine();
    let renderer = RecordingRenderer::default();
    engine.set_renderer(Box::new(renderer.clone()));
    load(
        &mut engine,
        vec![
            node("box", "Box").with_input("Size", Value::Number(2.0)),
            node("panel", "Panel"),
            node("hidden-pt", "Construct Point").hidden(true),
            node("pt", "Construct Point").with_input("X", Value::Number(1.0)),
        ],
        vec![wire("box", "B", "panel", "input")],
    );
    let report = engine.evaluate();
    let display = report.display.expect("display payload");
    assert_eq!(display.scene.children.len(), 1);
    assert_eq!(display.overlay.points, vec![[1.0, 0.0, 0.0]]);

    engine.clear();
    let calls = renderer.calls.borrow();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].as_ref(), Some(&display));
    assert!(calls[1].is_none());
}

#[test]
fn display_can_be_disabled() {
    let mut engine = EvaluationEngine::new(
        registry(),
        EngineConfig {
            display_enabled: false,
            ..Default::default()
        },
    );
    load(&mut engine, vec![node("pt", "Construct Point")], vec![]);
    assert!(engine.evaluate().display.is_none());
}

#[test]
fn events_bracket_each_run() {
    let mut engine = engine();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    engine.subscribe(move |event| {
        sink.borrow_mut().push(event.clone());
        Ok(())
    });
    engine.subscribe(|_| anyhow::bail!("broken listener"));
    load(&mut engine, vec![node("bad", "Explode")], vec![]);
    let report = engine.evaluate();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 4);
    assert_eq!(
        seen[0],
        EngineEvent::EvaluationStart {
            graph_id: Some("g".into())
        }
    );
    assert!(matches!(&seen[1], EngineEvent::Diagnostic(d) if d.is_error()));
    assert_eq!(
        seen[2],
        EngineEvent::EvaluationComplete {
            graph_id: Some("g".into()),
            evaluated: 1,
            failed: 1
        }
    );
    assert_eq!(
        seen[3],
        EngineEvent::Evaluation {
            summary: report.summary.clone()
        }
    );
    assert_eq!(report.summary, "evaluated 1 of 1 nodes (1 failed)");
}

#[test]
fn diagnostics_are_capped() {
    let mut engine = EvaluationEngine::new(
        registry(),
        EngineConfig {
            max_diagnostics: 2,
            ..Default::default()
        },
    );
    let nodes = (0..5).map(|i| node(&format!("bad{i}"), "Explode")).collect();
    load(&mut engine, nodes, vec![]);
    let report = engine.evaluate();
    assert_eq!(report.failed, 5);
    assert_eq!(report.errors.len(), 2);
    assert!(report.logs.iter().any(|d| d.message.contains("3 further")));
}

#[test]
fn fan_in_merges_code_and_descriptive_spellings() {
    let mut engine = engine();
    load(
        &mut engine,
        vec![number("x", 1.0), number("y", 2.0), node("add", "Addition")],
        vec![
            wire("x", "N", "add", "A"),
            wire("y", "N", "add", "First number"),
        ],
    );
    engine.evaluate();
    let list = Value::List(vec![Value::Number(1.0), Value::Number(2.0)]);
    assert_eq!(input_of(&engine, "add", "A"), Some(list.clone()));
    assert_eq!(engine.node_inputs("add").map(|i| i.len()), Some(1));
    assert_eq!(output_of(&engine, "add", "R"), Some(list));
}

#[test]
fn fan_in_merges_spellings_that_differ_in_case() {
    let mut engine = engine();
    load(
        &mut engine,
        vec![number("x", 1.0), number("y", 2.0), node("add", "Addition")],
        vec![wire("x", "N", "add", "A"), wire("y", "N", "add", "a")],
    );
    engine.evaluate();
    let list = Value::List(vec![Value::Number(1.0), Value::Number(2.0)]);
    assert_eq!(input_of(&engine, "add", "A"), Some(list.clone()));
    assert_eq!(output_of(&engine, "add", "R"), Some(list));
}

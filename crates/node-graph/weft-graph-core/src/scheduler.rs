//! Coalescing re-evaluation.
//!
//! Mutations call [`CoalescingScheduler::schedule`]; while a run is pending
//! further calls are no-ops, so a burst of control changes yields one
//! evaluation. The timing primitive is supplied by the platform through
//! [`CallbackSource`].

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::error::GraphError;
use crate::eval::{EvaluationEngine, EvaluationReport};

pub type Callback = Box<dyn FnOnce()>;

/// Defers a callback to the next idle opportunity (frame, timer, task tick).
pub trait CallbackSource {
    fn request_callback(&self, callback: Callback);
}

/// Manually drained FIFO. Used by the worker loop and by tests.
#[derive(Clone, Default)]
pub struct TaskQueue {
    tasks: Rc<RefCell<VecDeque<Callback>>>,
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.pending())
            .finish()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Run queued callbacks until the queue is empty, including ones queued
    /// by the callbacks themselves. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            // release the borrow before running so callbacks can enqueue
            let next = self.tasks.borrow_mut().pop_front();
            let Some(task) = next else {
                break;
            };
            task();
            ran += 1;
        }
        ran
    }
}

impl CallbackSource for TaskQueue {
    fn request_callback(&self, callback: Callback) {
        self.tasks.borrow_mut().push_back(callback);
    }
}

pub struct CoalescingScheduler {
    source: Rc<dyn CallbackSource>,
    pending: Rc<Cell<bool>>,
}

impl fmt::Debug for CoalescingScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoalescingScheduler")
            .field("pending", &self.pending.get())
            .finish()
    }
}

impl CoalescingScheduler {
    pub fn new(source: Rc<dyn CallbackSource>) -> Self {
        Self {
            source,
            pending: Rc::new(Cell::new(false)),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get()
    }

    /// Request `task`. Returns false (and drops `task`) when a run is
    /// already pending. The flag clears before `task` runs, so work done
    /// inside it may schedule again.
    pub fn schedule<F>(&self, task: F) -> bool
    where
        F: FnOnce() + 'static,
    {
        if self.pending.replace(true) {
            return false;
        }
        let pending = Rc::clone(&self.pending);
        self.source.request_callback(Box::new(move || {
            pending.set(false);
            task();
        }));
        true
    }
}

/// Single-threaded engine handle pairing the engine with a scheduler.
/// Clones share the same engine.
#[derive(Clone)]
pub struct SharedEngine {
    engine: Rc<RefCell<EvaluationEngine>>,
    scheduler: Rc<CoalescingScheduler>,
    last_report: Rc<RefCell<Option<EvaluationReport>>>,
}

impl fmt::Debug for SharedEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedEngine")
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

impl SharedEngine {
    pub fn new(engine: EvaluationEngine, source: Rc<dyn CallbackSource>) -> Self {
        Self {
            engine: Rc::new(RefCell::new(engine)),
            scheduler: Rc::new(CoalescingScheduler::new(source)),
            last_report: Rc::new(RefCell::new(None)),
        }
    }

    pub fn engine(&self) -> Ref<'_, EvaluationEngine> {
        self.engine.borrow()
    }

    pub fn engine_mut(&self) -> RefMut<'_, EvaluationEngine> {
        self.engine.borrow_mut()
    }

    pub fn is_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Queue one evaluation unless one is already pending.
    pub fn schedule_evaluation(&self) -> bool {
        let engine = Rc::clone(&self.engine);
        let last_report = Rc::clone(&self.last_report);
        self.scheduler.schedule(move || {
            let report = engine.borrow_mut().evaluate();
            *last_report.borrow_mut() = Some(report);
        })
    }

    /// Store a control value and schedule a run.
    pub fn set_control_value(&self, node_id: &str, value: f64) -> Result<f64, GraphError> {
        let applied = self.engine.borrow_mut().set_control_value(node_id, value)?;
        self.schedule_evaluation();
        Ok(applied)
    }

    /// Evaluate synchronously, bypassing the scheduler.
    pub fn evaluate_now(&self) -> EvaluationReport {
        let report = self.engine.borrow_mut().evaluate();
        *self.last_report.borrow_mut() = Some(report.clone());
        report
    }

    /// Report from the most recent scheduled run, if not yet taken.
    pub fn take_report(&self) -> Option<EvaluationReport> {
        self.last_report.borrow_mut().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::eval::EngineEvent;
    use crate::registry::ComponentRegistry;
    use crate::types::{GraphSpec, NodeIdentity, NodeSpec};
    use serde_json::json;
    use std::sync::Arc;

    fn slider_engine(queue: &TaskQueue) -> (SharedEngine, Rc<Cell<usize>>) {
        let mut engine = EvaluationEngine::new(
            Arc::new(ComponentRegistry::with_builtins()),
            EngineConfig::default(),
        );
        let slider = NodeSpec::new("s", NodeIdentity::named("Number Slider"))
            .with_meta("min", json!(0))
            .with_meta("max", json!(10))
            .with_meta("step", json!(1));
        engine.set_graph(
            Some("g".into()),
            GraphSpec {
                nodes: vec![slider],
                wires: vec![],
            },
        );
        let runs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&runs);
        engine.subscribe(move |event| {
            if matches!(event, EngineEvent::EvaluationStart { .. }) {
                counter.set(counter.get() + 1);
            }
            Ok(())
        });
        (SharedEngine::new(engine, Rc::new(queue.clone())), runs)
    }

    #[test]
    fn two_schedules_before_the_tick_run_once() {
        let queue = TaskQueue::new();
        let (shared, runs) = slider_engine(&queue);

        assert!(shared.schedule_evaluation());
        assert!(!shared.schedule_evaluation());
        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.run_pending(), 1);
        assert_eq!(runs.get(), 1);
        assert!(!shared.is_pending());

        assert!(shared.schedule_evaluation());
        queue.run_pending();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn control_burst_coalesces_into_last_value() {
        let queue = TaskQueue::new();
        let (shared, runs) = slider_engine(&queue);

        for v in [1.0, 2.2, 3.7, 42.0] {
            shared.set_control_value("s", v).expect("slider exists");
        }
        queue.run_pending();
        assert_eq!(runs.get(), 1);

        let report = shared.take_report().expect("scheduled run reported");
        assert_eq!(report.evaluated, 1);
        let engine = shared.engine();
        assert_eq!(
            engine.node_outputs("s").and_then(|o| o.get("N")),
            Some(&weft_api_core::Value::Number(10.0))
        );
    }

    #[test]
    fn unknown_control_is_rejected_without_scheduling() {
        let queue = TaskQueue::new();
        let (shared, _) = slider_engine(&queue);
        assert!(matches!(
            shared.set_control_value("missing", 1.0),
            Err(GraphError::UnknownControl(_))
        ));
        assert!(matches!(
            shared.set_control_value("s", f64::NAN),
            Err(GraphError::InvalidControlValue { .. })
        ));
        assert_eq!(queue.pending(), 0);
    }
}

//! Connector realignment.
//!
//! Repairs layout after structural edits in two passes over a graph snapshot:
//!
//! 1. **Annotation sizing** - every text annotation is widened to fit its text,
//!    estimated as `characters * char_width` clamped to `[min_width, max_width]`.
//!    Shapes never shrink.
//! 2. **Connector re-routing** - every association whose last waypoint is not on
//!    its target's border (within `tolerance`) is replaced by a straight line
//!    between the borders of its two shapes, along the line joining their centers.
//!
//! [`Realigner::plan`] is pure. [`Realigner::apply`] pushes the plan through the
//! engine's mutation primitives. Running it twice changes nothing the second time.

use log::{debug, error, info};

use flowsync_core::{
    geometry::{Bounds, Point},
    graph::{ConnectionKind, DiagramGraph, ShapeKind},
    identifier::Id,
};

use crate::{config::RealignConfig, engine::DiagramEngine, error::FlowsyncError};

/// One geometry change computed by [`Realigner::plan`].
#[derive(Debug, Clone, PartialEq)]
pub enum Adjustment {
    Resize { shape: Id, bounds: Bounds },
    Reroute { connection: Id, waypoints: Vec<Point> },
}

/// What [`Realigner::apply`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RealignReport {
    pub resized: Vec<Id>,
    pub rerouted: Vec<Id>,
}

impl RealignReport {
    /// Total number of changes.
    pub fn len(&self) -> usize {
        self.resized.len() + self.rerouted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Computes and applies annotation sizes and connector routes.
///
/// # Examples
///
/// ```
/// use flowsync::{config::RealignConfig, realign::Realigner};
///
/// let realigner = Realigner::new(RealignConfig::default());
/// assert_eq!(realigner.estimated_width("short"), 100.0);
/// assert_eq!(realigner.estimated_width(&"x".repeat(20)), 140.0);
/// assert_eq!(realigner.estimated_width(&"x".repeat(100)), 400.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Realigner {
    config: RealignConfig,
}

impl Realigner {
    pub fn new(config: RealignConfig) -> Self {
        Self { config }
    }

    /// Width needed to show `text` in an annotation.
    pub fn estimated_width(&self, text: &str) -> f32 {
        let raw = text.chars().count() as f32 * self.config.char_width();
        raw.max(self.config.min_width()).min(self.config.max_width())
    }

    /// Computes the adjustments for `graph` without changing it.
    ///
    /// Resizes come first. Connectors are checked against the resized shapes.
    pub fn plan(&self, graph: &DiagramGraph) -> Vec<Adjustment> {
        let mut working = graph.clone();
        let mut adjustments = Vec::new();

        for shape in graph.query_shapes(|shape| shape.kind() == ShapeKind::TextAnnotation) {
            let Some(text) = shape.text().filter(|text| !text.is_empty()) else {
                continue;
            };
            let bounds = shape.bounds();
            let grown = bounds.with_width(self.estimated_width(text));
            if grown.max_x() <= bounds.max_x() {
                continue;
            }
            if let Err(err) = working.set_bounds(shape.id(), grown) {
                error!(shape:% = shape.id(), err:% = err; "Cannot plan annotation resize");
                continue;
            }
            adjustments.push(Adjustment::Resize {
                shape: shape.id(),
                bounds: grown,
            });
        }

        let tolerance = self.config.tolerance();
        for connection in
            working.query_connections(|connection| connection.kind() == ConnectionKind::Association)
        {
            let Some((source, target)) = working.resolve(connection) else {
                continue;
            };
            let anchored = connection
                .last_waypoint()
                .is_some_and(|point| target.bounds().is_on_border(point, tolerance));
            if anchored {
                continue;
            }

            let source_center = source.bounds().center();
            let target_center = target.bounds().center();
            let waypoints = vec![
                source.bounds().border_intersection(source_center, target_center),
                target.bounds().border_intersection(target_center, source_center),
            ];
            debug!(connection:% = connection.id(); "Connector off its target border");
            adjustments.push(Adjustment::Reroute {
                connection: connection.id(),
                waypoints,
            });
        }

        adjustments
    }

    /// Plans against the engine's current graph and applies the result.
    ///
    /// # Errors
    ///
    /// Stops at the first mutation the engine rejects and returns
    /// [`FlowsyncError::Realign`] with the number of changes already applied.
    /// Those changes are kept; running again completes the work.
    pub fn apply(&self, engine: &mut dyn DiagramEngine) -> Result<RealignReport, FlowsyncError> {
        let graph = engine
            .snapshot()
            .map_err(|source| FlowsyncError::Realign { applied: 0, source })?;
        let adjustments = self.plan(&graph);
        debug!(planned = adjustments.len(); "Realignment planned");

        let mut report = RealignReport::default();
        for adjustment in adjustments {
            let result = match adjustment {
                Adjustment::Resize { shape, bounds } => engine
                    .resize(&shape, bounds)
                    .map(|()| report.resized.push(shape)),
                Adjustment::Reroute {
                    connection,
                    waypoints,
                } => engine
                    .reroute(&connection, waypoints)
                    .map(|()| report.rerouted.push(connection)),
            };
            if let Err(source) = result {
                let applied = report.len();
                error!(applied, err:% = source; "Realignment aborted");
                return Err(FlowsyncError::Realign { applied, source });
            }
        }

        info!(
            resized = report.resized.len(),
            rerouted = report.rerouted.len();
            "Realignment complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        engine::{EngineError, ExportFormat, ImportOutcome},
        event::EventSink,
        modeler::Modeler,
    };
    use flowsync_core::{
        geometry::Size,
        graph::{Connection, Shape, TEXT_ATTRIBUTE},
    };

    fn rect(x: f32, y: f32, width: f32, height: f32) -> Bounds {
        Bounds::new_from_top_left(Point::new(x, y), Size::new(width, height))
    }

    fn note(id: &str, bounds: Bounds, text: &str) -> Shape {
        Shape::new(Id::new(id), "textAnnotation", bounds).with_attribute(TEXT_ATTRIBUTE, text)
    }

    fn task(id: &str, bounds: Bounds) -> Shape {
        Shape::new(Id::new(id), "task", bounds)
    }

    fn association(id: &str, source: &str, target: &str, waypoints: Vec<Point>) -> Connection {
        Connection::new(Id::new(id), "association", Id::new(source), Id::new(target))
            .with_waypoints(waypoints)
    }

    #[test]
    fn test_annotation_grows_to_fit_text() {
        let mut graph = DiagramGraph::new();
        graph
            .add_shape(note("Note", rect(10.0, 10.0, 100.0, 30.0), &"x".repeat(30)))
            .unwrap();

        let plan = Realigner::default().plan(&graph);
        assert_eq!(
            plan,
            vec![Adjustment::Resize {
                shape: Id::new("Note"),
                bounds: rect(10.0, 10.0, 210.0, 30.0),
            }]
        );
    }

    #[test]
    fn test_annotation_never_shrinks() {
        let mut graph = DiagramGraph::new();
        graph
            .add_shape(note("Wide", rect(0.0, 0.0, 350.0, 30.0), "tiny"))
            .unwrap();
        graph
            .add_shape(note("Empty", rect(0.0, 100.0, 50.0, 30.0), ""))
            .unwrap();
        graph
            .add_shape(Shape::new(Id::new("Bare"), "textAnnotation", rect(0.0, 200.0, 50.0, 30.0)))
            .unwrap();

        assert!(Realigner::default().plan(&graph).is_empty());
    }

    #[test]
    fn test_only_annotations_are_sized() {
        let mut graph = DiagramGraph::new();
        graph
            .add_shape(
                task("Task", rect(0.0, 0.0, 50.0, 80.0))
                    .with_attribute(TEXT_ATTRIBUTE, "a long text on a task"),
            )
            .unwrap();

        assert!(Realigner::default().plan(&graph).is_empty());
    }

    #[test]
    fn test_reroute_drifted_association() {
        let mut graph = DiagramGraph::new();
        graph.add_shape(task("A", rect(0.0, 0.0, 100.0, 50.0))).unwrap();
        graph.add_shape(task("B", rect(300.0, 0.0, 100.0, 50.0))).unwrap();
        graph
            .add_connection(association(
                "Assoc",
                "A",
                "B",
                vec![Point::new(100.0, 25.0), Point::new(250.0, 25.0)],
            ))
            .unwrap();

        let plan = Realigner::default().plan(&graph);
        assert_eq!(
            plan,
            vec![Adjustment::Reroute {
                connection: Id::new("Assoc"),
                waypoints: vec![Point::new(100.0, 25.0), Point::new(300.0, 25.0)],
            }]
        );
    }

    #[test]
    fn test_anchored_association_is_skipped() {
        let mut graph = DiagramGraph::new();
        graph.add_shape(task("A", rect(0.0, 0.0, 100.0, 50.0))).unwrap();
        graph.add_shape(task("B", rect(300.0, 0.0, 100.0, 50.0))).unwrap();
        graph
            .add_connection(association(
                "Assoc",
                "A",
                "B",
                vec![Point::new(60.0, 50.0), Point::new(296.0, 40.0)],
            ))
            .unwrap();

        assert!(Realigner::default().plan(&graph).is_empty());
    }

    #[test]
    fn test_association_without_waypoints_is_rerouted() {
        let mut graph = DiagramGraph::new();
        graph.add_shape(task("A", rect(0.0, 0.0, 100.0, 50.0))).unwrap();
        graph.add_shape(task("B", rect(0.0, 200.0, 100.0, 50.0))).unwrap();
        graph
            .add_connection(association("Assoc", "A", "B", Vec::new()))
            .unwrap();

        let plan = Realigner::default().plan(&graph);
        assert_eq!(
            plan,
            vec![Adjustment::Reroute {
                connection: Id::new("Assoc"),
                waypoints: vec![Point::new(50.0, 50.0), Point::new(50.0, 200.0)],
            }]
        );
    }

    #[test]
    fn test_sequence_flows_are_left_alone() {
        let mut graph = DiagramGraph::new();
        graph.add_shape(task("A", rect(0.0, 0.0, 100.0, 50.0))).unwrap();
        graph.add_shape(task("B", rect(300.0, 0.0, 100.0, 50.0))).unwrap();
        graph
            .add_connection(
                Connection::new(Id::new("Flow"), "sequenceFlow", Id::new("A"), Id::new("B"))
                    .with_waypoints(vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)]),
            )
            .unwrap();

        assert!(Realigner::default().plan(&graph).is_empty());
    }

    #[test]
    fn test_reroute_sees_grown_annotation() {
        let mut graph = DiagramGraph::new();
        graph.add_shape(task("A", rect(0.0, 100.0, 100.0, 80.0))).unwrap();
        graph
            .add_shape(note("Note", rect(200.0, 0.0, 100.0, 40.0), &"x".repeat(40)))
            .unwrap();
        // Ends on the right border of the 100-wide note, inside the grown one.
        graph
            .add_connection(association(
                "Assoc",
                "A",
                "Note",
                vec![Point::new(100.0, 120.0), Point::new(300.0, 20.0)],
            ))
            .unwrap();

        let plan = Realigner::default().plan(&graph);
        assert_eq!(plan.len(), 2);
        let Adjustment::Reroute { waypoints, .. } = &plan[1] else {
            panic!("expected a reroute, got {plan:?}");
        };
        let grown = rect(200.0, 0.0, 280.0, 40.0);
        assert!(grown.is_on_border(waypoints[1], 0.001));
    }

    /// Delegates to a [`Modeler`] and rejects mutations after `budget` successes.
    struct FlakyEngine {
        inner: Modeler,
        budget: usize,
    }

    impl DiagramEngine for FlakyEngine {
        fn connect(&mut self, sink: EventSink) {
            self.inner.connect(sink);
        }

        fn disconnect(&mut self) {
            self.inner.disconnect();
        }

        fn import(&mut self, text: &str) -> Result<ImportOutcome, EngineError> {
            self.inner.import(text)
        }

        fn export_text(&self, format: ExportFormat) -> Result<String, EngineError> {
            self.inner.export_text(format)
        }

        fn export_image(&self) -> Result<String, EngineError> {
            self.inner.export_image()
        }

        fn fit_viewport(&mut self) {
            self.inner.fit_viewport();
        }

        fn snapshot(&self) -> Result<DiagramGraph, EngineError> {
            self.inner.snapshot()
        }

        fn resize(&mut self, shape: &Id, bounds: Bounds) -> Result<(), EngineError> {
            if self.budget == 0 {
                return Err(EngineError::Render("mutation rejected".to_string()));
            }
            self.budget -= 1;
            self.inner.resize(shape, bounds)
        }

        fn reroute(&mut self, connection: &Id, waypoints: Vec<Point>) -> Result<(), EngineError> {
            if self.budget == 0 {
                return Err(EngineError::Render("mutation rejected".to_string()));
            }
            self.budget -= 1;
            self.inner.reroute(connection, waypoints)
        }

        fn dispose(&mut self) {
            self.inner.dispose();
        }
    }

    const TWO_NOTES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL" xmlns:bpmndi="http://www.omg.org/spec/BPMN/20100524/DI" xmlns:dc="http://www.omg.org/spec/DD/20100524/DC" xmlns:di="http://www.omg.org/spec/DD/20100524/DI" id="Definitions_1">
  <bpmn:process id="Process_1">
    <bpmn:task id="Task_1" />
    <bpmn:textAnnotation id="Note_1"><bpmn:text>The first annotation needs more room than this</bpmn:text></bpmn:textAnnotation>
    <bpmn:textAnnotation id="Note_2"><bpmn:text>The second annotation needs more room as well</bpmn:text></bpmn:textAnnotation>
    <bpmn:association id="Assoc_1" sourceRef="Task_1" targetRef="Note_1" />
  </bpmn:process>
  <bpmndi:BPMNDiagram id="BPMNDiagram_1">
    <bpmndi:BPMNPlane id="BPMNPlane_1" bpmnElement="Process_1">
      <bpmndi:BPMNShape id="Task_1_di" bpmnElement="Task_1"><dc:Bounds x="0" y="200" width="100" height="80" /></bpmndi:BPMNShape>
      <bpmndi:BPMNShape id="Note_1_di" bpmnElement="Note_1"><dc:Bounds x="0" y="0" width="100" height="30" /></bpmndi:BPMNShape>
      <bpmndi:BPMNShape id="Note_2_di" bpmnElement="Note_2"><dc:Bounds x="300" y="0" width="100" height="30" /></bpmndi:BPMNShape>
      <bpmndi:BPMNEdge id="Assoc_1_di" bpmnElement="Assoc_1"><di:waypoint x="50" y="200" /><di:waypoint x="500" y="500" /></bpmndi:BPMNEdge>
    </bpmndi:BPMNPlane>
  </bpmndi:BPMNDiagram>
</bpmn:definitions>"#;

    #[test]
    fn test_apply_through_engine() {
        let mut engine = Modeler::new(&AppConfig::default());
        engine.import(TWO_NOTES).unwrap();

        let realigner = Realigner::default();
        let report = realigner.apply(&mut engine).unwrap();
        assert_eq!(report.resized, vec![Id::new("Note_1"), Id::new("Note_2")]);
        assert_eq!(report.rerouted, vec![Id::new("Assoc_1")]);

        let again = realigner.apply(&mut engine).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn test_apply_aborts_on_first_failure_and_can_resume() {
        let mut inner = Modeler::new(&AppConfig::default());
        inner.import(TWO_NOTES).unwrap();
        let mut engine = FlakyEngine { inner, budget: 1 };
        let realigner = Realigner::default();

        let err = realigner.apply(&mut engine).unwrap_err();
        assert!(matches!(err, FlowsyncError::Realign { applied: 1, .. }));
        let graph = engine.snapshot().unwrap();
        assert_eq!(graph.shape(Id::new("Note_1")).unwrap().bounds().width(), 322.0);
        assert_eq!(graph.shape(Id::new("Note_2")).unwrap().bounds().width(), 100.0);

        engine.budget = usize::MAX;
        let report = realigner.apply(&mut engine).unwrap();
        assert_eq!(report.len(), 2);
        assert!(realigner.apply(&mut engine).unwrap().is_empty());
    }

    #[test]
    fn test_apply_without_diagram() {
        let mut engine = Modeler::new(&AppConfig::default());
        let err = Realigner::default().apply(&mut engine).unwrap_err();
        assert!(matches!(
            err,
            FlowsyncError::Realign {
                applied: 0,
                source: EngineError::NotLoaded
            }
        ));
    }
}

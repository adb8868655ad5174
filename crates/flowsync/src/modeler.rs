//! The reference [`DiagramEngine`]: BPMN 2.0 XML in, SVG out.

use log::{debug, info, warn};

use flowsync_bpmn::{BpmnDocument, WriteOptions};
use flowsync_core::{
    geometry::{Bounds, Point},
    graph::DiagramGraph,
    identifier::Id,
};

use crate::{
    config::{AppConfig, StyleConfig},
    engine::{DiagramEngine, EngineError, ExportFormat, ImportOutcome},
    event::{EventSink, SessionEvent},
    export::SvgRenderer,
};

/// A diagram engine backed by the BPMN reader/writer and a [`DiagramGraph`].
///
/// # Examples
///
/// ```
/// use flowsync::{config::AppConfig, engine::{DiagramEngine, ExportFormat}, modeler::Modeler};
///
/// let mut modeler = Modeler::new(&AppConfig::default());
/// modeler.import(flowsync_bpmn::EMPTY_DIAGRAM).expect("template is valid");
///
/// let text = modeler.export_text(ExportFormat { format: true }).unwrap();
/// assert!(text.contains("StartEvent_1"));
/// ```
#[derive(Debug)]
pub struct Modeler {
    style: StyleConfig,
    margin: f32,
    diagram: Option<(BpmnDocument, DiagramGraph)>,
    viewport: Option<Bounds>,
    events: Option<EventSink>,
    disposed: bool,
}

impl Modeler {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            style: config.style().clone(),
            margin: config.export().margin(),
            diagram: None,
            viewport: None,
            events: None,
            disposed: false,
        }
    }

    /// The current viewport, set by [`DiagramEngine::fit_viewport`].
    pub fn viewport(&self) -> Option<Bounds> {
        self.viewport
    }

    /// The live graph, if a diagram is loaded.
    pub fn graph(&self) -> Option<&DiagramGraph> {
        self.diagram.as_ref().map(|(_, graph)| graph)
    }

    fn graph_mut(&mut self) -> Result<&mut DiagramGraph, EngineError> {
        if self.disposed {
            return Err(EngineError::Disposed);
        }
        self.diagram
            .as_mut()
            .map(|(_, graph)| graph)
            .ok_or(EngineError::NotLoaded)
    }

    fn loaded(&self) -> Result<&(BpmnDocument, DiagramGraph), EngineError> {
        if self.disposed {
            return Err(EngineError::Disposed);
        }
        self.diagram.as_ref().ok_or(EngineError::NotLoaded)
    }

    fn changed(&self) {
        if let Some(events) = &self.events {
            events.emit(SessionEvent::DiagramChanged);
        }
    }
}

impl DiagramEngine for Modeler {
    fn connect(&mut self, sink: EventSink) {
        self.events = Some(sink);
    }

    fn disconnect(&mut self) {
        self.events = None;
    }

    fn import(&mut self, text: &str) -> Result<ImportOutcome, EngineError> {
        if self.disposed {
            return Err(EngineError::Disposed);
        }

        let imported = flowsync_bpmn::read(text).map_err(EngineError::Import)?;
        for warning in &imported.warnings {
            warn!(warning:% = warning; "Diagram imported with warning");
        }
        info!(
            shapes = imported.graph.shapes_count(),
            connections = imported.graph.connections_count();
            "Diagram imported"
        );

        self.diagram = Some((imported.document, imported.graph));
        self.viewport = None;
        Ok(ImportOutcome {
            warnings: imported.warnings,
        })
    }

    fn export_text(&self, format: ExportFormat) -> Result<String, EngineError> {
        let (document, graph) = self.loaded()?;
        Ok(flowsync_bpmn::write(
            document,
            graph,
            WriteOptions {
                format: format.format,
            },
        ))
    }

    fn export_image(&self) -> Result<String, EngineError> {
        let (_, graph) = self.loaded()?;
        let renderer = SvgRenderer::new(&self.style, self.margin);
        let viewport = self.viewport.unwrap_or_else(|| renderer.fit(graph));
        let doc = renderer
            .render(graph, viewport)
            .map_err(EngineError::Render)?;
        Ok(doc.to_string())
    }

    fn fit_viewport(&mut self) {
        let Some((_, graph)) = &self.diagram else {
            return;
        };
        let viewport = SvgRenderer::new(&self.style, self.margin).fit(graph);
        debug!(
            x = viewport.min_x(),
            y = viewport.min_y(),
            width = viewport.width(),
            height = viewport.height();
            "Viewport fitted"
        );
        self.viewport = Some(viewport);
    }

    fn snapshot(&self) -> Result<DiagramGraph, EngineError> {
        self.loaded().map(|(_, graph)| graph.clone())
    }

    fn resize(&mut self, shape: &Id, bounds: Bounds) -> Result<(), EngineError> {
        self.graph_mut()?.set_bounds(*shape, bounds)?;
        self.changed();
        Ok(())
    }

    fn reroute(&mut self, connection: &Id, waypoints: Vec<Point>) -> Result<(), EngineError> {
        self.graph_mut()?.set_waypoints(*connection, waypoints)?;
        self.changed();
        Ok(())
    }

    fn dispose(&mut self) {
        self.diagram = None;
        self.viewport = None;
        self.events = None;
        self.disposed = true;
    }
}

//! The diagram engine boundary.
//!
//! A [`DiagramEngine`] holds the live [`DiagramGraph`] of one session. It
//! imports and exports document text, renders images, and exposes the query
//! and mutation primitives used by realignment.

use thiserror::Error;

use flowsync_bpmn::error::{Diagnostic, ParseError};
use flowsync_core::{
    geometry::{Bounds, Point},
    graph::{DiagramGraph, GraphError},
    identifier::Id,
};

use crate::event::EventSink;

/// Errors reported by a [`DiagramEngine`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Import(ParseError),

    #[error("no diagram is loaded")]
    NotLoaded,

    #[error("engine has been disposed")]
    Disposed,

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("render error: {0}")]
    Render(String),
}

/// Result of a successful import.
#[derive(Debug, Clone, Default)]
pub struct ImportOutcome {
    /// Problems that did not prevent the diagram from loading.
    pub warnings: Vec<Diagnostic>,
}

/// Options for [`DiagramEngine::export_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    /// Pretty-print the serialized text.
    pub format: bool,
}

/// A diagram rendering and editing engine.
///
/// # Contract
///
/// - [`import`](Self::import) replaces the diagram and never emits change notifications.
/// - Each successful [`resize`](Self::resize) or [`reroute`](Self::reroute) emits exactly
///   one [`SessionEvent::DiagramChanged`](crate::event::SessionEvent::DiagramChanged) on the
///   connected sink.
/// - After [`dispose`](Self::dispose) the engine holds no diagram.
pub trait DiagramEngine {
    /// Starts delivering change notifications to `sink`.
    fn connect(&mut self, sink: EventSink);

    /// Stops delivering change notifications.
    fn disconnect(&mut self);

    /// Replaces the current diagram with the one serialized in `text`.
    fn import(&mut self, text: &str) -> Result<ImportOutcome, EngineError>;

    /// Serializes the current diagram.
    fn export_text(&self, format: ExportFormat) -> Result<String, EngineError>;

    /// Renders the current diagram as SVG text.
    fn export_image(&self) -> Result<String, EngineError>;

    /// Fits the viewport to the diagram content.
    fn fit_viewport(&mut self);

    /// A copy of the current graph, for queries.
    fn snapshot(&self) -> Result<DiagramGraph, EngineError>;

    /// Moves or resizes a shape.
    fn resize(&mut self, shape: &Id, bounds: Bounds) -> Result<(), EngineError>;

    /// Replaces the waypoints of a connection.
    fn reroute(&mut self, connection: &Id, waypoints: Vec<Point>) -> Result<(), EngineError>;

    /// Releases the diagram and every resource held by the engine.
    fn dispose(&mut self);
}

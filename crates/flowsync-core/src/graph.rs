//! The in-memory diagram graph: shapes, connections and their geometry.
//!
//! # Architecture
//!
//! [`DiagramGraph`] is an arena. Shapes live in a table keyed by [`Id`], and
//! connections store the ids of their endpoints instead of references. Endpoints
//! are resolved through the table at use time ([`DiagramGraph::resolve`]), so
//! removing a shape never leaves a dangling pointer: the graph drops every
//! connection that referenced it.
//!
//! Both tables preserve insertion order, which keeps iteration (and therefore
//! realignment and serialization) deterministic.

use indexmap::IndexMap;
use log::trace;
use thiserror::Error;

use crate::{
    geometry::{Bounds, Point},
    identifier::Id,
};

/// Attribute key holding the text of a text annotation.
pub const TEXT_ATTRIBUTE: &str = "text";

/// Attribute key holding the display name of an element.
pub const NAME_ATTRIBUTE: &str = "name";

/// Broad classification of a shape, derived from its BPMN element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Event,
    Task,
    Gateway,
    SubProcess,
    DataObject,
    TextAnnotation,
    Group,
    Participant,
    Lane,
    Other,
}

impl ShapeKind {
    /// Classifies a BPMN element type (the local XML tag name).
    ///
    /// # Examples
    ///
    /// ```
    /// # use flowsync_core::graph::ShapeKind;
    /// assert_eq!(ShapeKind::from_element_type("startEvent"), ShapeKind::Event);
    /// assert_eq!(ShapeKind::from_element_type("userTask"), ShapeKind::Task);
    /// assert_eq!(ShapeKind::from_element_type("exclusiveGateway"), ShapeKind::Gateway);
    /// assert_eq!(ShapeKind::from_element_type("textAnnotation"), ShapeKind::TextAnnotation);
    /// ```
    pub fn from_element_type(element_type: &str) -> Self {
        match element_type {
            "textAnnotation" => Self::TextAnnotation,
            "group" => Self::Group,
            "participant" => Self::Participant,
            "lane" => Self::Lane,
            "subProcess" | "transaction" | "adHocSubProcess" => Self::SubProcess,
            "task" | "callActivity" => Self::Task,
            "dataObjectReference" | "dataStoreReference" | "dataInput" | "dataOutput" => {
                Self::DataObject
            }
            t if t.ends_with("Task") => Self::Task,
            t if t.ends_with("Event") => Self::Event,
            t if t.ends_with("Gateway") => Self::Gateway,
            _ => Self::Other,
        }
    }

    /// Returns true for the nodes that take part in the sequence flow.
    pub fn is_flow_node(self) -> bool {
        matches!(
            self,
            Self::Event | Self::Task | Self::Gateway | Self::SubProcess
        )
    }
}

/// Broad classification of a connection, derived from its BPMN element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionKind {
    SequenceFlow,
    MessageFlow,
    Association,
    DataAssociation,
    Other,
}

impl ConnectionKind {
    /// Classifies a BPMN connecting element type.
    pub fn from_element_type(element_type: &str) -> Self {
        match element_type {
            "sequenceFlow" => Self::SequenceFlow,
            "messageFlow" => Self::MessageFlow,
            "association" => Self::Association,
            "dataInputAssociation" | "dataOutputAssociation" => Self::DataAssociation,
            _ => Self::Other,
        }
    }
}

/// Errors raised when a mutation would break a graph invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("shape `{0}` already exists")]
    DuplicateShape(Id),

    #[error("connection `{0}` already exists")]
    DuplicateConnection(Id),

    #[error("unknown shape `{0}`")]
    UnknownShape(Id),

    #[error("unknown connection `{0}`")]
    UnknownConnection(Id),

    #[error("connection `{connection}` references missing shape `{endpoint}`")]
    DanglingEndpoint { connection: Id, endpoint: Id },

    #[error("shape `{id}` would have a negative size ({width} x {height})")]
    NegativeSize { id: Id, width: f32, height: f32 },
}

/// A positioned, sized diagram element.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    id: Id,
    kind: ShapeKind,
    element_type: String,
    bounds: Bounds,
    attributes: IndexMap<String, String>,
}

impl Shape {
    /// Creates a shape; its [`ShapeKind`] is derived from `element_type`.
    pub fn new(id: Id, element_type: impl Into<String>, bounds: Bounds) -> Self {
        let element_type = element_type.into();
        Self {
            id,
            kind: ShapeKind::from_element_type(&element_type),
            element_type,
            bounds,
            attributes: IndexMap::new(),
        }
    }

    /// Adds an attribute (builder style).
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    /// The BPMN element type, e.g. `startEvent`.
    pub fn element_type(&self) -> &str {
        &self.element_type
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// The annotation text, if this shape carries any.
    pub fn text(&self) -> Option<&str> {
        self.attribute(TEXT_ATTRIBUTE)
    }
}

/// A directed link between two shapes with its routing waypoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    id: Id,
    kind: ConnectionKind,
    element_type: String,
    source: Id,
    target: Id,
    waypoints: Vec<Point>,
    attributes: IndexMap<String, String>,
}

impl Connection {
    /// Creates a connection; its [`ConnectionKind`] is derived from `element_type`.
    pub fn new(id: Id, element_type: impl Into<String>, source: Id, target: Id) -> Self {
        let element_type = element_type.into();
        Self {
            id,
            kind: ConnectionKind::from_element_type(&element_type),
            element_type,
            source,
            target,
            waypoints: Vec::new(),
            attributes: IndexMap::new(),
        }
    }

    /// Sets the routing waypoints (builder style).
    pub fn with_waypoints(mut self, waypoints: Vec<Point>) -> Self {
        self.waypoints = waypoints;
        self
    }

    /// Adds an attribute (builder style).
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    pub fn element_type(&self) -> &str {
        &self.element_type
    }

    pub fn source(&self) -> Id {
        self.source
    }

    pub fn target(&self) -> Id {
        self.target
    }

    pub fn waypoints(&self) -> &[Point] {
        &self.waypoints
    }

    pub fn last_waypoint(&self) -> Option<Point> {
        self.waypoints.last().copied()
    }

    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }
}

/// The live diagram: a shape table plus connections between table entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagramGraph {
    shapes: IndexMap<Id, Shape>,
    connections: IndexMap<Id, Connection>,
}

impl DiagramGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a shape.
    ///
    /// # Errors
    ///
    /// Fails if the id is taken or the size is negative.
    pub fn add_shape(&mut self, shape: Shape) -> Result<(), GraphError> {
        if self.shapes.contains_key(&shape.id) {
            return Err(GraphError::DuplicateShape(shape.id));
        }
        check_size(shape.id, shape.bounds)?;
        self.shapes.insert(shape.id, shape);
        Ok(())
    }

    /// Inserts a connection.
    ///
    /// # Errors
    ///
    /// Fails if the id is taken, or if either endpoint is not a shape of this graph.
    pub fn add_connection(&mut self, connection: Connection) -> Result<(), GraphError> {
        if self.connections.contains_key(&connection.id) {
            return Err(GraphError::DuplicateConnection(connection.id));
        }
        for endpoint in [connection.source, connection.target] {
            if !self.shapes.contains_key(&endpoint) {
                return Err(GraphError::DanglingEndpoint {
                    connection: connection.id,
                    endpoint,
                });
            }
        }
        self.connections.insert(connection.id, connection);
        Ok(())
    }

    /// Removes a shape together with every connection attached to it.
    pub fn remove_shape(&mut self, id: Id) -> Result<Shape, GraphError> {
        let shape = self
            .shapes
            .shift_remove(&id)
            .ok_or(GraphError::UnknownShape(id))?;
        let before = self.connections.len();
        self.connections
            .retain(|_, connection| connection.source != id && connection.target != id);
        trace!(shape:% = id, connections = before - self.connections.len(); "Shape removed");
        Ok(shape)
    }

    pub fn remove_connection(&mut self, id: Id) -> Result<Connection, GraphError> {
        self.connections
            .shift_remove(&id)
            .ok_or(GraphError::UnknownConnection(id))
    }

    pub fn shape(&self, id: Id) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    pub fn connection(&self, id: Id) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Returns an iterator over all shapes in insertion order.
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.values()
    }

    /// Returns an iterator over all connections in insertion order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn shapes_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn connections_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty() && self.connections.is_empty()
    }

    /// Shapes matching `predicate`.
    pub fn query_shapes<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a Shape>
    where
        P: Fn(&Shape) -> bool + 'a,
    {
        self.shapes.values().filter(move |shape| predicate(shape))
    }

    /// Connections matching `predicate`.
    pub fn query_connections<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a Connection>
    where
        P: Fn(&Connection) -> bool + 'a,
    {
        self.connections
            .values()
            .filter(move |connection| predicate(connection))
    }

    /// Looks up the source and target shapes of a connection.
    ///
    /// Returns `None` if either endpoint is no longer in the shape table.
    pub fn resolve(&self, connection: &Connection) -> Option<(&Shape, &Shape)> {
        let source = self.shapes.get(&connection.source)?;
        let target = self.shapes.get(&connection.target)?;
        Some((source, target))
    }

    /// Replaces the bounds of a shape.
    pub fn set_bounds(&mut self, id: Id, bounds: Bounds) -> Result<(), GraphError> {
        check_size(id, bounds)?;
        let shape = self.shapes.get_mut(&id).ok_or(GraphError::UnknownShape(id))?;
        shape.bounds = bounds;
        Ok(())
    }

    /// Replaces the waypoints of a connection.
    pub fn set_waypoints(&mut self, id: Id, waypoints: Vec<Point>) -> Result<(), GraphError> {
        let connection = self
            .connections
            .get_mut(&id)
            .ok_or(GraphError::UnknownConnection(id))?;
        connection.waypoints = waypoints;
        Ok(())
    }

    /// The smallest bounds enclosing every shape and waypoint, or `None` for an empty graph.
    pub fn content_bounds(&self) -> Option<Bounds> {
        let shape_bounds = self.shapes.values().map(Shape::bounds);
        let waypoint_bounds = self
            .connections
            .values()
            .flat_map(|connection| connection.waypoints.iter())
            .map(|point| Bounds::new_from_top_left(*point, Default::default()));

        shape_bounds
            .chain(waypoint_bounds)
            .reduce(|acc, bounds| acc.merge(&bounds))
    }
}

fn check_size(id: Id, bounds: Bounds) -> Result<(), GraphError> {
    let size = bounds.to_size();
    if size.is_negative() {
        return Err(GraphError::NegativeSize {
            id,
            width: size.width(),
            height: size.height(),
        });
    }
    Ok(())
}

use log::debug;
use svg::{
    Document,
    node::{
        Text as SvgText,
        element::{Circle, Definitions, Group, Marker, Path, Polygon, Rectangle, Text},
    },
};

use flowsync_core::{
    geometry::{Bounds, Insets, Point},
    graph::{Connection, ConnectionKind, DiagramGraph, NAME_ATTRIBUTE, Shape, ShapeKind},
};

use crate::config::StyleConfig;

const STROKE: &str = "#22242a";
const FILL: &str = "white";
const FONT_FAMILY: &str = "Arial, sans-serif";
const FONT_SIZE: f32 = 12.0;
const LABEL_GAP: f32 = 14.0;

/// Renders a diagram graph as an SVG document.
pub(crate) struct SvgRenderer<'a> {
    style: &'a StyleConfig,
    margin: f32,
}

impl<'a> SvgRenderer<'a> {
    pub(crate) fn new(style: &'a StyleConfig, margin: f32) -> Self {
        Self { style, margin }
    }

    /// The content bounds of `graph` padded by the margin.
    pub(crate) fn fit(&self, graph: &DiagramGraph) -> Bounds {
        let padding = Insets::uniform(self.margin);
        graph.content_bounds().unwrap_or_default().add_padding(padding)
    }

    /// Renders `graph` into `viewport`.
    pub(crate) fn render(&self, graph: &DiagramGraph, viewport: Bounds) -> Result<Document, String> {
        let mut doc = Document::new()
            .set(
                "viewBox",
                format!(
                    "{} {} {} {}",
                    viewport.min_x(),
                    viewport.min_y(),
                    viewport.width(),
                    viewport.height()
                ),
            )
            .set("width", viewport.width())
            .set("height", viewport.height());

        if let Some(color) = self.style.background_color()? {
            doc = doc.add(
                Rectangle::new()
                    .set("x", viewport.min_x())
                    .set("y", viewport.min_y())
                    .set("width", viewport.width())
                    .set("height", viewport.height())
                    .set("fill", &color),
            );
        }

        doc = doc.add(marker_definitions());

        // Containers first so flow nodes are drawn on top of them.
        let mut shapes: Vec<&Shape> = graph.shapes().collect();
        shapes.sort_by_key(|shape| !is_container(shape.kind()));

        let mut shape_group = Group::new().set("class", "shapes");
        for shape in shapes {
            shape_group = shape_group.add(render_shape(shape));
        }

        let mut connection_group = Group::new().set("class", "connections");
        for connection in graph.connections() {
            if let Some(path) = render_connection(connection) {
                connection_group = connection_group.add(path);
            }
        }

        debug!(
            shapes = graph.shapes_count(),
            connections = graph.connections_count();
            "SVG document rendered"
        );

        Ok(doc.add(shape_group).add(connection_group))
    }
}

fn is_container(kind: ShapeKind) -> bool {
    matches!(
        kind,
        ShapeKind::Participant | ShapeKind::Lane | ShapeKind::Group | ShapeKind::SubProcess
    )
}

fn marker_definitions() -> Definitions {
    let sequence_end = Marker::new()
        .set("id", "sequence-flow-end")
        .set("viewBox", "0 0 20 20")
        .set("refX", 11)
        .set("refY", 10)
        .set("markerWidth", 10)
        .set("markerHeight", 10)
        .set("orient", "auto")
        .add(
            Path::new()
                .set("d", "M 1 5 L 11 10 L 1 15 Z")
                .set("fill", STROKE)
                .set("stroke", STROKE),
        );

    let message_end = Marker::new()
        .set("id", "message-flow-end")
        .set("viewBox", "0 0 20 20")
        .set("refX", 8.5)
        .set("refY", 5)
        .set("markerWidth", 20)
        .set("markerHeight", 20)
        .set("orient", "auto")
        .add(
            Path::new()
                .set("d", "m 1 5 l 0 -3 l 7 3 l -7 3 z")
                .set("fill", FILL)
                .set("stroke", STROKE),
        );

    let association_end = Marker::new()
        .set("id", "association-end")
        .set("viewBox", "0 0 20 20")
        .set("refX", 11)
        .set("refY", 10)
        .set("markerWidth", 10)
        .set("markerHeight", 10)
        .set("orient", "auto")
        .add(
            Path::new()
                .set("d", "M 1 5 L 11 10 L 1 15")
                .set("fill", "none")
                .set("stroke", STROKE),
        );

    Definitions::new()
        .add(sequence_end)
        .add(message_end)
        .add(association_end)
}

fn render_shape(shape: &Shape) -> Group {
    let bounds = shape.bounds();
    let center = bounds.center();
    let mut group = Group::new()
        .set("class", shape.element_type())
        .set("data-element-id", shape.id().to_string());

    match shape.kind() {
        ShapeKind::Event => {
            let radius = bounds.width().min(bounds.height()) / 2.0;
            let stroke_width = if shape.element_type() == "endEvent" { 4 } else { 2 };
            group = group.add(
                Circle::new()
                    .set("cx", center.x())
                    .set("cy", center.y())
                    .set("r", radius)
                    .set("fill", FILL)
                    .set("stroke", STROKE)
                    .set("stroke-width", stroke_width),
            );
            if shape.element_type().starts_with("intermediate") {
                group = group.add(
                    Circle::new()
                        .set("cx", center.x())
                        .set("cy", center.y())
                        .set("r", (radius - 3.0).max(0.0))
                        .set("fill", "none")
                        .set("stroke", STROKE)
                        .set("stroke-width", 1),
                );
            }
        }
        ShapeKind::Gateway => {
            let points = format!(
                "{},{} {},{} {},{} {},{}",
                center.x(),
                bounds.min_y(),
                bounds.max_x(),
                center.y(),
                center.x(),
                bounds.max_y(),
                bounds.min_x(),
                center.y()
            );
            group = group.add(
                Polygon::new()
                    .set("points", points)
                    .set("fill", FILL)
                    .set("stroke", STROKE)
                    .set("stroke-width", 2),
            );
        }
        ShapeKind::DataObject => {
            let fold = bounds.width().min(bounds.height()) * 0.3;
            let d = format!(
                "M {} {} L {} {} L {} {} L {} {} L {} {} Z",
                bounds.min_x(),
                bounds.min_y(),
                bounds.max_x() - fold,
                bounds.min_y(),
                bounds.max_x(),
                bounds.min_y() + fold,
                bounds.max_x(),
                bounds.max_y(),
                bounds.min_x(),
                bounds.max_y()
            );
            group = group.add(
                Path::new()
                    .set("d", d)
                    .set("fill", FILL)
                    .set("stroke", STROKE)
                    .set("stroke-width", 2),
            );
        }
        ShapeKind::TextAnnotation => {
            let d = format!(
                "M {} {} L {} {} L {} {} L {} {}",
                bounds.min_x() + 15.0,
                bounds.min_y(),
                bounds.min_x(),
                bounds.min_y(),
                bounds.min_x(),
                bounds.max_y(),
                bounds.min_x() + 15.0,
                bounds.max_y()
            );
            group = group.add(
                Path::new()
                    .set("d", d)
                    .set("fill", "none")
                    .set("stroke", STROKE)
                    .set("stroke-width", 2),
            );
        }
        kind => {
            let mut rect = rect_for(bounds).set("stroke", STROKE);
            rect = match kind {
                ShapeKind::Task | ShapeKind::SubProcess => rect
                    .set("rx", 10)
                    .set("fill", FILL)
                    .set("stroke-width", 2),
                ShapeKind::Group => rect
                    .set("rx", 10)
                    .set("fill", "none")
                    .set("stroke-dasharray", "10,6"),
                _ => rect.set("fill", "none").set("stroke-width", 1.5),
            };
            group = group.add(rect);
        }
    }

    match label(shape) {
        Some(text) => group.add(text),
        None => group,
    }
}

fn rect_for(bounds: Bounds) -> Rectangle {
    Rectangle::new()
        .set("x", bounds.min_x())
        .set("y", bounds.min_y())
        .set("width", bounds.width())
        .set("height", bounds.height())
}

/// Text of a shape, placed inside activities and annotations and below other nodes.
fn label(shape: &Shape) -> Option<Text> {
    let bounds = shape.bounds();
    let (content, position, anchor) = match shape.kind() {
        ShapeKind::TextAnnotation => (
            shape.text()?,
            Point::new(bounds.min_x() + 5.0, bounds.center().y()),
            "start",
        ),
        ShapeKind::Task | ShapeKind::SubProcess => {
            (shape.attribute(NAME_ATTRIBUTE)?, bounds.center(), "middle")
        }
        ShapeKind::Participant | ShapeKind::Lane => (
            shape.attribute(NAME_ATTRIBUTE)?,
            Point::new(bounds.min_x() + LABEL_GAP, bounds.center().y()),
            "middle",
        ),
        _ => (
            shape.attribute(NAME_ATTRIBUTE)?,
            Point::new(bounds.center().x(), bounds.max_y() + LABEL_GAP),
            "middle",
        ),
    };
    if content.trim().is_empty() {
        return None;
    }

    Some(
        Text::new("")
            .set("x", position.x())
            .set("y", position.y())
            .set("text-anchor", anchor)
            .set("dominant-baseline", "central")
            .set("font-family", FONT_FAMILY)
            .set("font-size", FONT_SIZE)
            .set("fill", STROKE)
            .add(SvgText::new(content)),
    )
}

fn render_connection(connection: &Connection) -> Option<Path> {
    let waypoints = connection.waypoints();
    if waypoints.len() < 2 {
        return None;
    }

    let mut path = Path::new()
        .set("class", connection.element_type())
        .set("data-element-id", connection.id().to_string())
        .set("d", path_data(waypoints))
        .set("fill", "none")
        .set("stroke", STROKE)
        .set("stroke-width", 1.5);

    path = match connection.kind() {
        ConnectionKind::SequenceFlow => path.set("marker-end", "url(#sequence-flow-end)"),
        ConnectionKind::MessageFlow => path
            .set("stroke-dasharray", "10,11")
            .set("marker-end", "url(#message-flow-end)"),
        ConnectionKind::Association => path
            .set("stroke-dasharray", "0.5,5")
            .set("stroke-linecap", "round"),
        ConnectionKind::DataAssociation => path
            .set("stroke-dasharray", "0.5,5")
            .set("stroke-linecap", "round")
            .set("marker-end", "url(#association-end)"),
        ConnectionKind::Other => path,
    };
    Some(path)
}

/// Path data string through `points`.
fn path_data(points: &[Point]) -> String {
    points
        .iter()
        .enumerate()
        .map(|(index, point)| {
            let command = if index == 0 { "M" } else { "L" };
            format!("{command} {} {}", point.x(), point.y())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

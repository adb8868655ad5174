//! BPMN 2.0 XML reader.
//!
//! Parses the XML with `roxmltree`, checks the document structure, builds a
//! [`DiagramGraph`] from the diagram-interchange section and keeps the whole
//! tree as a [`BpmnDocument`] for lossless writing.

use std::{collections::HashMap, ops::Range};

use log::{debug, trace};
use roxmltree::{Node, NodeId};

use flowsync_core::{
    geometry::{Bounds, Point, Size},
    graph::{Connection, DiagramGraph, Shape, TEXT_ATTRIBUTE},
    identifier::Id,
};

use crate::{
    document::{
        BPMNDI_NS, BpmnDocument, DC_NS, DI_NS, DiBinding, MODEL_NS, Namespace, XmlElement,
        XmlNode,
    },
    error::{Diagnostic, DiagnosticCollector, ErrorCode, ParseError},
    span::Span,
};

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// The result of a successful read.
#[derive(Debug, Clone)]
pub struct Imported {
    /// The preserved XML tree.
    pub document: BpmnDocument,
    /// Shapes and connections drawn on the diagram planes.
    pub graph: DiagramGraph,
    /// Problems that did not prevent loading.
    pub warnings: Vec<Diagnostic>,
}

/// Reads a BPMN 2.0 XML document.
///
/// # Errors
///
/// Returns a [`ParseError`] carrying every error found: malformed XML, a root
/// that is not BPMN `definitions`, a missing diagram, or broken DI geometry.
pub fn read(source: &str) -> Result<Imported, ParseError> {
    let xml = roxmltree::Document::parse(source).map_err(|err| syntax_error(source, &err))?;

    let root = xml.root_element();
    if !root.has_tag_name((MODEL_NS, "definitions")) {
        return Err(Diagnostic::error(format!(
            "expected BPMN `definitions` root element, found `{}`",
            root.tag_name().name()
        ))
        .with_code(ErrorCode::E100)
        .with_label(start_tag_span(source, root), "not a BPMN 2.0 document")
        .with_help(format!("the root element must be `definitions` in namespace {MODEL_NS}"))
        .into());
    }

    let planes: Vec<Node> = root
        .children()
        .filter(|node| node.has_tag_name((BPMNDI_NS, "BPMNDiagram")))
        .flat_map(|diagram| diagram.children())
        .filter(|node| node.has_tag_name((BPMNDI_NS, "BPMNPlane")))
        .collect();
    if planes.is_empty() {
        return Err(Diagnostic::error("no diagram to display")
            .with_code(ErrorCode::E101)
            .with_label(start_tag_span(source, root), "no `BPMNDiagram` with a `BPMNPlane`")
            .with_help("add diagram interchange information, e.g. by saving the file from a BPMN modeler")
            .into());
    }

    let mut builder = GraphBuilder::new(source, root);
    for plane in &planes {
        for shape in plane
            .children()
            .filter(|node| node.has_tag_name((BPMNDI_NS, "BPMNShape")))
        {
            builder.read_shape(shape);
        }
    }
    for plane in &planes {
        for edge in plane
            .children()
            .filter(|node| node.has_tag_name((BPMNDI_NS, "BPMNEdge")))
        {
            builder.read_edge(edge);
        }
    }

    let GraphBuilder {
        graph,
        bindings,
        diagnostics,
        ..
    } = builder;
    let warnings = diagnostics.finish()?;

    let nodes = xml
        .root()
        .children()
        .filter_map(|node| convert(source, node, &bindings))
        .collect();

    debug!(
        shapes = graph.shapes_count(),
        connections = graph.connections_count(),
        warnings = warnings.len();
        "BPMN document read"
    );

    Ok(Imported {
        document: BpmnDocument { nodes },
        graph,
        warnings,
    })
}

struct GraphBuilder<'a, 'input> {
    source: &'input str,
    /// Semantic model elements by id.
    semantic: HashMap<&'a str, Node<'a, 'input>>,
    graph: DiagramGraph,
    bindings: HashMap<NodeId, DiBinding>,
    drawn: HashMap<&'a str, Span>,
    diagnostics: DiagnosticCollector,
}

impl<'a, 'input> GraphBuilder<'a, 'input> {
    fn new(source: &'input str, root: Node<'a, 'input>) -> Self {
        let semantic = root
            .descendants()
            .filter(|node| node.is_element() && node.tag_name().namespace() == Some(MODEL_NS))
            .filter_map(|node| node.attribute("id").map(|id| (id, node)))
            .collect();

        Self {
            source,
            semantic,
            graph: DiagramGraph::new(),
            bindings: HashMap::new(),
            drawn: HashMap::new(),
            diagnostics: DiagnosticCollector::new(),
        }
    }

    /// Resolves `bpmnElement` and checks that it is drawn only once.
    fn resolve_reference(&mut self, di: Node<'a, 'input>) -> Option<(&'a str, Node<'a, 'input>)> {
        let span = start_tag_span(self.source, di);
        let kind = di.tag_name().name();

        let Some(reference) = di.attribute("bpmnElement") else {
            self.diagnostics.emit(
                Diagnostic::error(format!("`{kind}` has no `bpmnElement` attribute"))
                    .with_code(ErrorCode::E200)
                    .with_label(span, "missing reference"),
            );
            return None;
        };

        let Some(&element) = self.semantic.get(reference) else {
            self.diagnostics.emit(
                Diagnostic::error(format!("`{kind}` references unknown element `{reference}`"))
                    .with_code(ErrorCode::E200)
                    .with_label(span, "unresolved reference")
                    .with_help("the referenced element must be defined in the process model"),
            );
            return None;
        };

        if let Some(first) = self.drawn.get(reference) {
            self.diagnostics.emit(
                Diagnostic::error(format!("element `{reference}` is drawn more than once"))
                    .with_code(ErrorCode::E204)
                    .with_label(span, "duplicate diagram element")
                    .with_secondary_label(*first, "first drawn here")
                    .with_help("remove one of the diagram elements"),
            );
            return None;
        }
        self.drawn.insert(reference, span);

        Some((reference, element))
    }

    fn read_shape(&mut self, di: Node<'a, 'input>) {
        let Some((reference, element)) = self.resolve_reference(di) else {
            return;
        };

        let Some(bounds_node) = di
            .children()
            .find(|node| node.has_tag_name((DC_NS, "Bounds")))
        else {
            self.diagnostics.emit(
                Diagnostic::error(format!("shape of `{reference}` has no bounds"))
                    .with_code(ErrorCode::E201)
                    .with_label(start_tag_span(self.source, di), "missing `dc:Bounds`"),
            );
            return;
        };

        let x = self.number(bounds_node, "x");
        let y = self.number(bounds_node, "y");
        let width = self.number(bounds_node, "width");
        let height = self.number(bounds_node, "height");
        let (Some(x), Some(y), Some(width), Some(height)) = (x, y, width, height) else {
            return;
        };

        if width < 0.0 || height < 0.0 {
            self.diagnostics.emit(
                Diagnostic::error(format!(
                    "shape of `{reference}` has a negative size ({width} x {height})"
                ))
                .with_code(ErrorCode::E203)
                .with_label(start_tag_span(self.source, bounds_node), "negative size")
                .with_help("width and height must be zero or positive"),
            );
            return;
        }

        let id = Id::new(reference);
        let bounds = Bounds::new_from_top_left(Point::new(x, y), Size::new(width, height));
        let mut shape = Shape::new(id, element.tag_name().name(), bounds);
        for (key, value) in semantic_attributes(element) {
            shape = shape.with_attribute(key, value);
        }
        if let Some(text) = element
            .children()
            .find(|node| node.has_tag_name((MODEL_NS, "text")))
            .and_then(|node| node.text())
        {
            shape = shape.with_attribute(TEXT_ATTRIBUTE, text);
        }

        // Uniqueness and size were checked above.
        if let Err(err) = self.graph.add_shape(shape) {
            self.diagnostics.emit(
                Diagnostic::error(err.to_string())
                    .with_code(ErrorCode::E204)
                    .with_label(start_tag_span(self.source, di), "invalid shape"),
            );
            return;
        }
        self.bindings.insert(bounds_node.id(), DiBinding::Bounds(id));
        trace!(id = reference; "shape read");
    }

    fn read_edge(&mut self, di: Node<'a, 'input>) {
        let Some((reference, element)) = self.resolve_reference(di) else {
            return;
        };
        let span = start_tag_span(self.source, di);

        let Some((source, target)) = flow_endpoints(element) else {
            self.diagnostics.emit(
                Diagnostic::warning(format!(
                    "`{reference}` is not a connecting element; its edge is left untouched"
                ))
                .with_code(ErrorCode::W301)
                .with_label(span, "no source or target"),
            );
            return;
        };

        let waypoint_nodes: Vec<Node> = di
            .children()
            .filter(|node| node.has_tag_name((DI_NS, "waypoint")))
            .collect();
        let mut waypoints = Vec::with_capacity(waypoint_nodes.len());
        for node in &waypoint_nodes {
            let x = self.number(*node, "x");
            let y = self.number(*node, "y");
            if let (Some(x), Some(y)) = (x, y) {
                waypoints.push(Point::new(x, y));
            }
        }
        if waypoints.len() != waypoint_nodes.len() {
            return;
        }

        let id = Id::new(reference);
        for endpoint in [source, target] {
            if self.graph.shape(Id::new(endpoint)).is_none() {
                self.diagnostics.emit(
                    Diagnostic::warning(format!(
                        "`{endpoint}` is not drawn; the edge of `{reference}` is left untouched"
                    ))
                    .with_code(ErrorCode::W300)
                    .with_label(span, "endpoint without a shape"),
                );
                return;
            }
        }

        let mut connection = Connection::new(
            id,
            element.tag_name().name(),
            Id::new(source),
            Id::new(target),
        )
        .with_waypoints(waypoints);
        for (key, value) in semantic_attributes(element) {
            connection = connection.with_attribute(key, value);
        }
        if let Err(err) = self.graph.add_connection(connection) {
            self.diagnostics.emit(
                Diagnostic::error(err.to_string())
                    .with_code(ErrorCode::E200)
                    .with_label(span, "invalid edge"),
            );
            return;
        }

        let (waypoint_name, declare_ns) = match waypoint_nodes.first() {
            Some(first) => (qualified_element_name(self.source, *first).to_string(), false),
            None => match prefix_for(di, DI_NS) {
                Some(prefix) => (format!("{prefix}:waypoint"), false),
                None => (format!("{}:waypoint", free_prefix(di, "di")), true),
            },
        };
        self.bindings.insert(
            di.id(),
            DiBinding::Edge {
                id,
                waypoint_name,
                declare_ns,
            },
        );
        for node in waypoint_nodes {
            self.bindings.insert(node.id(), DiBinding::Waypoint);
        }
        trace!(id = reference; "edge read");
    }

    /// Reads a numeric attribute, reporting `E202` when it is missing or invalid.
    fn number(&mut self, node: Node<'a, 'input>, name: &str) -> Option<f32> {
        let span = start_tag_span(self.source, node);
        let element = qualified_element_name(self.source, node);

        let Some(raw) = node.attribute(name) else {
            self.diagnostics.emit(
                Diagnostic::error(format!("`{element}` is missing attribute `{name}`"))
                    .with_code(ErrorCode::E202)
                    .with_label(span, format!("`{name}` required")),
            );
            return None;
        };

        match raw.trim().parse::<f32>() {
            Ok(value) if value.is_finite() => Some(value),
            _ => {
                self.diagnostics.emit(
                    Diagnostic::error(format!("`{raw}` is not a valid number for `{name}`"))
                        .with_code(ErrorCode::E202)
                        .with_label(span, "invalid number"),
                );
                None
            }
        }
    }
}

/// Source and target ids of a connecting element.
///
/// Flows and associations carry `sourceRef`/`targetRef` attributes. Data
/// associations carry them as child elements and connect to the activity
/// that contains them.
fn flow_endpoints<'a>(element: Node<'a, '_>) -> Option<(&'a str, &'a str)> {
    let child_ref = |name: &str| {
        element
            .children()
            .find(|node| node.has_tag_name((MODEL_NS, name)))
            .and_then(|node| node.text())
            .map(str::trim)
    };
    let parent_id = || element.parent_element().and_then(|parent| parent.attribute("id"));

    match element.tag_name().name() {
        "dataInputAssociation" => Some((child_ref("sourceRef")?, parent_id()?)),
        "dataOutputAssociation" => Some((parent_id()?, child_ref("targetRef")?)),
        _ => Some((element.attribute("sourceRef")?, element.attribute("targetRef")?)),
    }
}

/// Attributes of a semantic element except `id`, keyed by qualified name.
fn semantic_attributes<'a>(element: Node<'a, '_>) -> Vec<(String, &'a str)> {
    element
        .attributes()
        .filter(|attr| attr.namespace().is_some() || attr.name() != "id")
        .map(|attr| (attribute_name(element, attr.namespace(), attr.name()), attr.value()))
        .collect()
}

fn convert(source: &str, node: Node, bindings: &HashMap<NodeId, DiBinding>) -> Option<XmlNode> {
    if node.is_element() {
        return Some(XmlNode::Element(convert_element(source, node, bindings)));
    }
    if node.is_text() {
        return node.text().map(|text| XmlNode::Text(text.to_string()));
    }
    if node.is_comment() {
        return node.text().map(|text| XmlNode::Comment(text.to_string()));
    }
    node.pi().map(|pi| XmlNode::ProcessingInstruction {
        target: pi.target.to_string(),
        value: pi.value.map(str::to_string),
    })
}

fn convert_element(source: &str, node: Node, bindings: &HashMap<NodeId, DiBinding>) -> XmlElement {
    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|parent| parent.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();
    let namespaces = node
        .namespaces()
        .filter(|ns| ns.name() != Some("xml"))
        .filter(|ns| !inherited.contains(&(ns.name(), ns.uri())))
        .map(|ns| Namespace {
            prefix: ns.name().map(str::to_string),
            uri: ns.uri().to_string(),
        })
        .collect();

    let attributes = node
        .attributes()
        .map(|attr| {
            (
                attribute_name(node, attr.namespace(), attr.name()),
                attr.value().to_string(),
            )
        })
        .collect();

    let children = node
        .children()
        .filter_map(|child| convert(source, child, bindings))
        .collect();

    XmlElement {
        name: qualified_element_name(source, node).to_string(),
        namespaces,
        attributes,
        children,
        binding: bindings.get(&node.id()).cloned(),
    }
}

/// The element name exactly as written after `<`.
fn qualified_element_name<'s>(source: &'s str, node: Node) -> &'s str {
    let tag = &source[node.range().start + 1..];
    let end = tag
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(tag.len());
    &tag[..end]
}

fn attribute_name(node: Node, namespace: Option<&str>, local: &str) -> String {
    match namespace {
        None => local.to_string(),
        Some(XML_NS) => format!("xml:{local}"),
        Some(uri) => match prefix_for(node, uri) {
            Some(prefix) => format!("{prefix}:{local}"),
            None => local.to_string(),
        },
    }
}

/// A declared prefix bound to `uri` in the scope of `node`.
fn prefix_for<'a>(node: Node<'a, '_>, uri: &str) -> Option<&'a str> {
    node.namespaces()
        .find(|ns| ns.uri() == uri && ns.name().is_some())
        .and_then(|ns| ns.name())
}

/// `preferred`, or a variant of it not already bound in the scope of `node`.
fn free_prefix(node: Node, preferred: &str) -> String {
    let taken = |prefix: &str| node.namespaces().any(|ns| ns.name() == Some(prefix));
    if !taken(preferred) {
        return preferred.to_string();
    }
    (1..)
        .map(|n| format!("{preferred}{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| preferred.to_string())
}

/// Span of the start tag of `node`.
fn start_tag_span(source: &str, node: Node) -> Span {
    let start = node.range().start;
    let end = source[start..]
        .find('>')
        .map_or(node.range().end, |offset| start + offset + 1);
    Span::new(start..end)
}

fn syntax_error(source: &str, err: &roxmltree::Error) -> ParseError {
    let pos = err.pos();
    let offset = byte_offset(source, pos.row, pos.col);
    let span: Range<usize> = offset..(offset + 1).min(source.len());

    let message = if source.trim().is_empty() {
        "document is empty".to_string()
    } else {
        format!("malformed XML: {err}")
    };
    Diagnostic::error(message)
        .with_code(ErrorCode::E001)
        .with_label(Span::new(span), "here")
        .with_help("the document must be well-formed BPMN 2.0 XML")
        .into()
}

/// Converts a 1-based row/column (in characters) to a byte offset.
fn byte_offset(source: &str, row: u32, col: u32) -> usize {
    let mut offset = 0;
    for line in source.split_inclusive('\n').take(row.saturating_sub(1) as usize) {
        offset += line.len();
    }
    let line = &source[offset.min(source.len())..];
    let column = line
        .char_indices()
        .nth(col.saturating_sub(1) as usize)
        .map_or(line.len(), |(index, _)| index);
    (offset + column).min(source.len())
}

//! BPMN 2.0 XML writer.
//!
//! Re-serializes a [`BpmnDocument`], taking shape bounds and edge waypoints
//! from a [`DiagramGraph`]. Everything else is written back as it was read.

use std::fmt::Write as _;

use flowsync_core::{geometry::Point, graph::DiagramGraph};

use crate::document::{BpmnDocument, DI_NS, DiBinding, XmlElement, XmlNode};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const INDENT: &str = "  ";

/// Output options for [`write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Pretty-print with two-space indentation. When false, the original
    /// whitespace is kept as is.
    pub format: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self { format: true }
    }
}

/// Serializes `document` with the geometry of `graph`.
///
/// DI elements whose graph element no longer exists are written unchanged.
pub fn write(document: &BpmnDocument, graph: &DiagramGraph, options: WriteOptions) -> String {
    let mut writer = Writer {
        out: String::from(XML_DECLARATION),
        graph,
        format: options.format,
    };
    for node in document.nodes() {
        writer.out.push('\n');
        writer.node(node, 0);
    }
    if options.format {
        writer.out.push('\n');
    }
    writer.out
}

/// A child to write: an original node or a waypoint taken from the graph.
enum Item<'d> {
    Node(&'d XmlNode),
    Waypoint(&'d str, Point),
}

struct Writer<'g> {
    out: String,
    graph: &'g DiagramGraph,
    format: bool,
}

impl Writer<'_> {
    fn node(&mut self, node: &XmlNode, depth: usize) {
        match node {
            XmlNode::Element(element) => self.element(element, depth),
            XmlNode::Text(text) => escape_text(&mut self.out, text),
            XmlNode::Comment(comment) => {
                let _ = write!(self.out, "<!--{comment}-->");
            }
            XmlNode::ProcessingInstruction { target, value } => {
                let _ = match value {
                    Some(value) => write!(self.out, "<?{target} {value}?>"),
                    None => write!(self.out, "<?{target}?>"),
                };
            }
        }
    }

    fn element(&mut self, element: &XmlElement, depth: usize) {
        let (mut items, declare_prefix) = self.items(element);
        if self.format {
            items.retain(|item| !matches!(item, Item::Node(node) if node.is_blank_text()));
        }

        self.out.push('<');
        self.out.push_str(element.name());
        for ns in element.namespaces() {
            match ns.prefix() {
                Some(prefix) => self.attribute(&format!("xmlns:{prefix}"), ns.uri()),
                None => self.attribute("xmlns", ns.uri()),
            }
        }
        if let Some(prefix) = declare_prefix {
            self.attribute(&format!("xmlns:{prefix}"), DI_NS);
        }
        self.attributes(element);

        if items.is_empty() {
            self.out.push_str("/>");
            return;
        }
        self.out.push('>');

        let text_only = items
            .iter()
            .all(|item| matches!(item, Item::Node(XmlNode::Text(_))));
        let break_lines = self.format && !text_only;

        for item in &items {
            if break_lines {
                self.newline(depth + 1);
            }
            match item {
                Item::Node(node) => self.node(node, depth + 1),
                Item::Waypoint(name, point) => {
                    let _ = write!(
                        self.out,
                        r#"<{name} x="{}" y="{}"/>"#,
                        point.x(),
                        point.y()
                    );
                }
            }
        }
        if break_lines {
            self.newline(depth);
        }

        let _ = write!(self.out, "</{}>", element.name());
    }

    fn attributes(&mut self, element: &XmlElement) {
        let shape = match element.binding() {
            Some(DiBinding::Bounds(id)) => self.graph.shape(*id),
            _ => None,
        };

        for (name, value) in element.attributes() {
            let bounds = shape.map(|shape| shape.bounds());
            let patched = match (bounds, name.as_str()) {
                (Some(bounds), "x") => Some(bounds.min_x()),
                (Some(bounds), "y") => Some(bounds.min_y()),
                (Some(bounds), "width") => Some(bounds.width()),
                (Some(bounds), "height") => Some(bounds.height()),
                _ => None,
            };
            match patched {
                Some(number) => self.attribute(name, &number.to_string()),
                None => self.attribute(name, value),
            }
        }
    }

    fn attribute(&mut self, name: &str, value: &str) {
        let _ = write!(self.out, " {name}=\"");
        escape_attribute(&mut self.out, value);
        self.out.push('"');
    }

    fn newline(&mut self, depth: usize) {
        self.out.push('\n');
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
    }

    /// The children of `element`, with the waypoints of a bound edge replaced.
    ///
    /// Also returns the prefix to declare when the new waypoints use one that
    /// is not in scope.
    fn items<'d>(&self, element: &'d XmlElement) -> (Vec<Item<'d>>, Option<&'d str>) {
        let children = element.children();
        let unchanged = || -> Vec<Item<'d>> { children.iter().map(Item::Node).collect() };

        let Some(DiBinding::Edge {
            id,
            waypoint_name,
            declare_ns,
        }) = element.binding()
        else {
            return (unchanged(), None);
        };
        let Some(connection) = self.graph.connection(*id) else {
            return (unchanged(), None);
        };
        let waypoints = connection.waypoints();

        let is_waypoint = |node: &XmlNode| {
            node.as_element()
                .is_some_and(|child| child.binding() == Some(&DiBinding::Waypoint))
        };
        let first = children.iter().position(is_waypoint);
        let insert_at = first
            .or_else(|| {
                children.iter().position(|node| {
                    node.as_element()
                        .is_some_and(|child| child.local_name() == "BPMNLabel")
                })
            })
            .unwrap_or_else(|| match children.last() {
                Some(last) if last.is_blank_text() => children.len() - 1,
                _ => children.len(),
            });
        let separator = first
            .and_then(|first| first.checked_sub(1))
            .map(|index| &children[index])
            .filter(|node| node.is_blank_text());

        let mut replacement = Vec::with_capacity(waypoints.len() * 2);
        for (index, point) in waypoints.iter().enumerate() {
            if index > 0
                && let Some(separator) = separator
            {
                replacement.push(Item::Node(separator));
            }
            replacement.push(Item::Waypoint(waypoint_name.as_str(), *point));
        }

        let mut items = Vec::with_capacity(children.len() + replacement.len());
        let mut replacement = Some(replacement);
        for (index, child) in children.iter().enumerate() {
            if index == insert_at
                && let Some(waypoints) = replacement.take()
            {
                items.extend(waypoints);
            }
            if is_waypoint(child) {
                continue;
            }
            let before_later_waypoint = child.is_blank_text()
                && Some(index + 1) != first
                && children.get(index + 1).is_some_and(is_waypoint);
            if before_later_waypoint {
                continue;
            }
            items.push(Item::Node(child));
        }
        if let Some(waypoints) = replacement {
            items.extend(waypoints);
        }

        let declare = (*declare_ns && !waypoints.is_empty())
            .then(|| waypoint_name.split_once(':').map(|(prefix, _)| prefix))
            .flatten();
        (items, declare)
    }
}

fn escape_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

//! The preserved XML tree of a BPMN document.
//!
//! A [`BpmnDocument`] keeps everything the reader saw: element and attribute
//! order, namespace declarations, text, comments and processing instructions.
//! Diagram-interchange nodes that carry geometry are tagged with a
//! [`DiBinding`] so the writer knows which values to take from the graph.

use flowsync_core::identifier::Id;

/// BPMN 2.0 semantic model namespace.
pub const MODEL_NS: &str = "http://www.omg.org/spec/BPMN/20100524/MODEL";
/// BPMN 2.0 diagram interchange namespace.
pub const BPMNDI_NS: &str = "http://www.omg.org/spec/BPMN/20100524/DI";
/// Diagram definition "common" namespace (`dc:Bounds`).
pub const DC_NS: &str = "http://www.omg.org/spec/DD/20100524/DC";
/// Diagram definition interchange namespace (`di:waypoint`).
pub const DI_NS: &str = "http://www.omg.org/spec/DD/20100524/DI";

/// Links a DI node to the graph element whose geometry it serializes.
#[derive(Debug, Clone, PartialEq)]
pub enum DiBinding {
    /// `dc:Bounds` of the `BPMNShape` drawing shape `Id`.
    Bounds(Id),
    /// `BPMNEdge` drawing connection `id`.
    Edge {
        id: Id,
        /// Qualified name used for the waypoints written into this edge.
        waypoint_name: String,
        /// Whether `waypoint_name`'s prefix is not declared in scope yet.
        declare_ns: bool,
    },
    /// A `di:waypoint` of a bound edge.
    Waypoint,
}

/// A namespace declaration (`xmlns` or `xmlns:prefix`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub(crate) prefix: Option<String>,
    pub(crate) uri: String,
}

impl Namespace {
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

/// One node of the preserved tree.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    Comment(String),
    ProcessingInstruction {
        target: String,
        value: Option<String>,
    },
}

impl XmlNode {
    /// True for text nodes made only of whitespace.
    pub fn is_blank_text(&self) -> bool {
        matches!(self, XmlNode::Text(text) if text.trim().is_empty())
    }

    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }
}

/// An element with its qualified name as written in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub(crate) name: String,
    pub(crate) namespaces: Vec<Namespace>,
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) children: Vec<XmlNode>,
    pub(crate) binding: Option<DiBinding>,
}

impl XmlElement {
    /// Qualified name, e.g. `bpmndi:BPMNShape`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without its prefix, e.g. `BPMNShape`.
    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Namespace declarations introduced on this element.
    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    /// Attributes in source order, keyed by qualified name.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    pub fn binding(&self) -> Option<&DiBinding> {
        self.binding.as_ref()
    }
}

/// A parsed BPMN document: the preserved tree of top-level nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct BpmnDocument {
    pub(crate) nodes: Vec<XmlNode>,
}

impl BpmnDocument {
    /// Top-level nodes: the root element plus surrounding comments and processing instructions.
    pub fn nodes(&self) -> &[XmlNode] {
        &self.nodes
    }

    /// The `definitions` element.
    pub fn root(&self) -> Option<&XmlElement> {
        self.nodes.iter().find_map(XmlNode::as_element)
    }
}

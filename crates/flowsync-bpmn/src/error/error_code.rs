//! Error codes for BPMN document diagnostics.
//!
//! Codes are grouped by what went wrong:
//! - `E0xx` - XML syntax
//! - `E1xx` - Document structure
//! - `E2xx` - Diagram interchange (shapes, edges, geometry)
//! - `W3xx` - Warnings: content that loads but is not fully drawn

use std::fmt;

/// Error codes for categorizing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // XML Errors (E0xx)
    // =========================================================================
    /// Malformed XML.
    ///
    /// The text is not well-formed XML: unclosed tags, bad entities,
    /// mismatched quotes, or an empty file.
    E001,

    // =========================================================================
    // Structure Errors (E1xx)
    // =========================================================================
    /// Not a BPMN document.
    ///
    /// The root element must be `definitions` in the BPMN 2.0 model namespace
    /// `http://www.omg.org/spec/BPMN/20100524/MODEL`.
    E100,

    /// No diagram to display.
    ///
    /// The document has no `BPMNDiagram` with a `BPMNPlane`, so there is
    /// nothing to lay out or edit.
    E101,

    // =========================================================================
    // Diagram Interchange Errors (E2xx)
    // =========================================================================
    /// Unresolved element reference.
    ///
    /// A `BPMNShape` or `BPMNEdge` has no `bpmnElement` attribute, or it names
    /// an element that does not exist in the model.
    E200,

    /// Shape without bounds.
    ///
    /// Every `BPMNShape` needs a `dc:Bounds` child.
    E201,

    /// Invalid number.
    ///
    /// A coordinate or dimension is missing or is not a number.
    E202,

    /// Negative size.
    ///
    /// Shape width and height must not be negative.
    E203,

    /// Duplicate diagram element.
    ///
    /// The same model element is drawn twice.
    E204,

    // =========================================================================
    // Warnings (W3xx)
    // =========================================================================
    /// Flow endpoint not drawn.
    ///
    /// A flow is drawn but its source or target has no shape, so the edge
    /// cannot be attached and is left untouched.
    W300,

    /// Edge for a non-connecting element.
    ///
    /// A `BPMNEdge` references an element without source and target.
    W301,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            ErrorCode::E001 => "E001",
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            ErrorCode::E203 => "E203",
            ErrorCode::E204 => "E204",
            ErrorCode::W300 => "W300",
            ErrorCode::W301 => "W301",
        };
        write!(f, "{code}")
    }
}

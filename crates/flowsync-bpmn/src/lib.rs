//! # Flowsync BPMN
//!
//! Reader and writer for BPMN 2.0 XML diagrams. Reading produces a
//! [`DiagramGraph`](flowsync_core::graph::DiagramGraph) of the drawn shapes
//! and connections together with a [`BpmnDocument`] that preserves the whole
//! XML tree, so writing a diagram back only changes its geometry.
//!
//! ## Usage
//!
//! ```
//! # use flowsync_bpmn::{read, write, WriteOptions, EMPTY_DIAGRAM, error::ParseError};
//! fn main() -> Result<(), ParseError> {
//!     let imported = read(EMPTY_DIAGRAM)?;
//!     assert_eq!(imported.graph.shapes_count(), 1);
//!
//!     let text = write(&imported.document, &imported.graph, WriteOptions::default());
//!     assert!(text.contains(r#"<dc:Bounds x="180" y="160" width="36" height="36"/>"#));
//!     Ok(())
//! }
//! ```

pub mod document;
pub mod error;
mod reader;
mod span;
mod template;
mod writer;

pub use document::BpmnDocument;
pub use reader::{Imported, read};
pub use span::Span;
pub use template::EMPTY_DIAGRAM;
pub use writer::{WriteOptions, write};

//! Diagnostics reported while reading a BPMN document.
//!
//! A [`Diagnostic`] is a single error or warning with an optional
//! [`ErrorCode`], labelled source spans and help text. A failed read returns a
//! [`ParseError`] holding every error found, so a broken file is reported in
//! one pass instead of one problem at a time.
//!
//! # Example
//!
//! ```
//! # use flowsync_bpmn::error::{Diagnostic, ErrorCode};
//! # use flowsync_bpmn::Span;
//! let diag = Diagnostic::error("shape `Task_1` has no bounds")
//!     .with_code(ErrorCode::E201)
//!     .with_label(Span::new(120..160), "this BPMNShape")
//!     .with_help("add a <dc:Bounds x=\"..\" y=\"..\" width=\"..\" height=\"..\"/> child");
//!
//! assert_eq!(diag.to_string(), "error[E201]: shape `Task_1` has no bounds");
//! ```

mod diagnostic;
mod error_code;
mod parse_error;
mod severity;

pub(crate) use parse_error::DiagnosticCollector;

pub use diagnostic::{Diagnostic, Label};
pub use error_code::ErrorCode;
pub use parse_error::ParseError;
pub use severity::Severity;

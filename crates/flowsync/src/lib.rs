//! Flowsync - keeps a BPMN diagram and its document text in sync.
//!
//! A [`session::Session`] pairs a [`host::DocumentHost`], which owns the text of
//! a `.bpmn` file, with a [`engine::DiagramEngine`], which holds the live diagram.
//! Edits on either side are propagated to the other without feedback loops.
//! On top of that the crate provides connector realignment
//! ([`realign::Realigner`]) and SVG image export ([`ImageExport`]).
//!
//! # Examples
//!
//! ```
//! use flowsync::{config::AppConfig, host::MemoryDocument, modeler::Modeler, session::Session};
//!
//! let config = AppConfig::default();
//! let mut session = Session::open(
//!     Box::new(Modeler::new(&config)),
//!     Box::new(MemoryDocument::new("process.bpmn", "")),
//!     &config,
//! );
//!
//! let report = session.realign().expect("session is ready");
//! assert!(report.is_empty());
//!
//! let image = session.export_image().expect("session is ready");
//! assert_eq!(image.file_name, "process.svg");
//! ```

pub mod config;
pub mod engine;
pub mod event;
pub mod host;
pub mod modeler;
pub mod realign;
pub mod registry;
pub mod session;
pub mod sync;

mod error;
mod export;

pub use flowsync_core::{color, geometry, graph, identifier};

pub use error::FlowsyncError;
pub use export::ImageExport;

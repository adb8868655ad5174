//! Error types for Flowsync operations.
//!
//! This module provides the main error type [`FlowsyncError`]. Its variants
//! follow what failed: loading a document, syncing edits back into it,
//! realigning connectors, or exporting an image.

use std::io;

use thiserror::Error;

use flowsync_bpmn::error::ParseError;

use crate::{engine::EngineError, host::HostError, sync::SyncPhase};

/// The main error type for Flowsync operations.
///
/// # Diagnostic Variants
///
/// The `Load` variant keeps the document text next to the parse error so that
/// callers can render the diagnostics against their source spans.
#[derive(Debug, Error)]
pub enum FlowsyncError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{err}")]
    Load { err: ParseError, src: String },

    #[error("Sync-back failed: {0}")]
    SyncBack(#[source] EngineError),

    #[error("Realignment stopped after {applied} change(s): {source}")]
    Realign {
        applied: usize,
        #[source]
        source: EngineError,
    },

    #[error("Image export failed: {0}")]
    Export(#[source] EngineError),

    #[error("Session is not ready ({0})")]
    NotReady(SyncPhase),

    #[error("Diagram engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Document error: {0}")]
    Host(#[from] HostError),
}

impl FlowsyncError {
    /// Create a new `Load` error with the associated document text.
    pub fn new_load_error(err: ParseError, src: impl Into<String>) -> Self {
        Self::Load {
            err,
            src: src.into(),
        }
    }
}

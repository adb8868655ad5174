//! Keeps a document and its live diagram consistent.
//!
//! [`SyncController`] is a state machine over [`SyncPhase`]. It is driven by
//! the session with one call per notification and never holds on to the
//! engine or the host between calls.
//!
//! ```text
//!            load ok                 edit (sync-back)
//! Loading ───────────▶ Idle ─────────────────────────▶ Dirty
//!    │                  ▲ ▲                              │
//!    │ load failed      │ └─── external change: reload   │ save / save completed
//!    ▼                  └────────────────────────────────┘
//! Failed
//! ```
//!
//! An external content change is applied only in `Idle`. In `Dirty` the
//! local edits win and the change is counted and logged instead.

use std::fmt;

use log::{debug, error, info, trace, warn};

use flowsync_bpmn::EMPTY_DIAGRAM;

use crate::{
    engine::{DiagramEngine, EngineError, ExportFormat},
    error::FlowsyncError,
    event::{SavePhase, SessionEvent},
    host::DocumentHost,
};

/// Phase of a document session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Importing the document into the engine.
    Loading,
    /// Document and diagram agree.
    Idle,
    /// The diagram has edits not yet confirmed by a save.
    Dirty,
    /// The document could not be loaded. Terminal.
    Failed,
    /// The session was torn down.
    Closed,
}

impl SyncPhase {
    /// True in the phases where edits and commands are accepted.
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Idle | Self::Dirty)
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loading => "loading",
            Self::Idle => "idle",
            Self::Dirty => "dirty",
            Self::Failed => "failed",
            Self::Closed => "closed",
        };
        write!(f, "{name}")
    }
}

/// The `{dirty, loading}` flags of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncState {
    pub dirty: bool,
    pub loading: bool,
}

/// What to show in place of a diagram that failed to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPanel {
    pub title: String,
    pub message: String,
    pub troubleshooting: Vec<String>,
}

impl ErrorPanel {
    fn for_load_error(err: &FlowsyncError) -> Self {
        Self {
            title: "Failed to load BPMN diagram".to_string(),
            message: err.to_string(),
            troubleshooting: vec![
                "Verify the file is valid BPMN 2.0 XML".to_string(),
                "Check that the file is not corrupted".to_string(),
                "Try opening the file in Camunda Modeler to verify it works".to_string(),
            ],
        }
    }
}

/// The document/diagram synchronization state machine.
#[derive(Debug)]
pub struct SyncController {
    phase: SyncPhase,
    export_format: ExportFormat,
    /// Text last written to or loaded from the host.
    last_synced: Option<String>,
    error: Option<FlowsyncError>,
    sync_backs: usize,
    ignored_external_changes: usize,
}

impl SyncController {
    /// Creates a controller in [`SyncPhase::Loading`].
    pub fn new(export_format: ExportFormat) -> Self {
        Self {
            phase: SyncPhase::Loading,
            export_format,
            last_synced: None,
            error: None,
            sync_backs: 0,
            ignored_external_changes: 0,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn state(&self) -> SyncState {
        SyncState {
            dirty: self.phase == SyncPhase::Dirty,
            loading: self.phase == SyncPhase::Loading,
        }
    }

    /// Number of successful sync-backs.
    pub fn sync_backs(&self) -> usize {
        self.sync_backs
    }

    /// Number of external changes dropped because local edits were pending.
    pub fn ignored_external_changes(&self) -> usize {
        self.ignored_external_changes
    }

    /// `Ok` unless loading failed.
    pub fn ready(&self) -> Result<(), &FlowsyncError> {
        match &self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// The panel describing a load failure, if the session failed.
    pub fn error_panel(&self) -> Option<ErrorPanel> {
        match (&self.error, self.phase) {
            (Some(err), SyncPhase::Failed) => Some(ErrorPanel::for_load_error(err)),
            _ => None,
        }
    }

    /// Imports the host content into the engine.
    ///
    /// Empty content is replaced by [`EMPTY_DIAGRAM`], which is written to the
    /// host first. On failure the session moves to [`SyncPhase::Failed`] and
    /// the host content is left as it was.
    pub fn load(&mut self, engine: &mut dyn DiagramEngine, host: &mut dyn DocumentHost) {
        self.phase = SyncPhase::Loading;
        let path = host.local_path().to_path_buf();
        info!(path:? = path; "Loading diagram");

        if host.content().trim().is_empty() {
            info!(path:? = path; "Document is empty, seeding new diagram");
            host.set_content(EMPTY_DIAGRAM.to_string());
        }
        let content = host.content().to_string();

        match engine.import(&content) {
            Ok(outcome) => {
                engine.fit_viewport();
                self.last_synced = Some(content);
                self.error = None;
                self.phase = SyncPhase::Idle;
                info!(path:? = path, warnings = outcome.warnings.len(); "Diagram loaded");
            }
            Err(err) => {
                let err = match err {
                    EngineError::Import(err) => FlowsyncError::new_load_error(err, content),
                    other => FlowsyncError::Engine(other),
                };
                error!(path:? = path, err:% = err; "Failed to load diagram");
                self.error = Some(err);
                self.phase = SyncPhase::Failed;
            }
        }
    }

    /// Hands out the load error, leaving the session failed.
    pub(crate) fn take_error(&mut self) -> Option<FlowsyncError> {
        self.error.take()
    }

    /// Marks the session failed without attempting an import.
    pub fn fail(&mut self, err: FlowsyncError) {
        error!(err:% = err; "Session failed");
        self.error = Some(err);
        self.phase = SyncPhase::Failed;
    }

    /// Dispatches one notification.
    pub fn handle(
        &mut self,
        event: SessionEvent,
        engine: &mut dyn DiagramEngine,
        host: &mut dyn DocumentHost,
    ) {
        trace!(event:% = event, phase:% = self.phase; "Handling event");
        match event {
            SessionEvent::DiagramChanged => self.on_diagram_changed(engine, host),
            SessionEvent::ContentChanged => self.on_content_changed(engine, host),
            SessionEvent::SaveState(phase) => self.on_save_state(phase, engine, host),
        }
    }

    /// Syncs back, persists through the host and clears the dirty flag.
    ///
    /// # Errors
    ///
    /// Fails if the session is not ready, the diagram cannot be serialized,
    /// or the host rejects the save. The session stays dirty in the last two cases.
    pub fn save(
        &mut self,
        engine: &mut dyn DiagramEngine,
        host: &mut dyn DocumentHost,
    ) -> Result<(), FlowsyncError> {
        if !self.phase.is_ready() {
            return Err(FlowsyncError::NotReady(self.phase));
        }
        self.sync_back(engine, host)?;
        host.save()?;
        self.phase = SyncPhase::Idle;
        debug!("Diagram saved");
        Ok(())
    }

    /// Disconnects both collaborators and disposes the engine. Idempotent.
    pub fn teardown(&mut self, engine: &mut dyn DiagramEngine, host: &mut dyn DocumentHost) {
        if self.phase == SyncPhase::Closed {
            return;
        }
        engine.disconnect();
        host.disconnect();
        engine.dispose();
        self.phase = SyncPhase::Closed;
        debug!(path:? = host.local_path(); "Session torn down");
    }

    fn on_diagram_changed(&mut self, engine: &mut dyn DiagramEngine, host: &mut dyn DocumentHost) {
        if !self.phase.is_ready() {
            trace!(phase:% = self.phase; "Diagram change ignored");
            return;
        }
        self.phase = SyncPhase::Dirty;
        if let Err(err) = self.sync_back(engine, host) {
            error!(err:% = err; "Sync-back failed, edits remain pending");
        }
    }

    fn on_content_changed(&mut self, engine: &mut dyn DiagramEngine, host: &mut dyn DocumentHost) {
        if !self.phase.is_ready() {
            trace!(phase:% = self.phase; "Content change ignored");
            return;
        }
        if self.last_synced.as_deref() == Some(host.content()) {
            trace!("Content change is our own write");
            return;
        }
        if self.phase == SyncPhase::Dirty {
            self.ignored_external_changes += 1;
            warn!(
                path:? = host.local_path(),
                ignored = self.ignored_external_changes;
                "Document changed externally while local edits are unsaved; keeping local edits"
            );
            return;
        }

        info!(path:? = host.local_path(); "Document changed externally, reloading");
        self.load(engine, host);
    }

    fn on_save_state(
        &mut self,
        phase: SavePhase,
        engine: &mut dyn DiagramEngine,
        host: &mut dyn DocumentHost,
    ) {
        match (phase, self.phase) {
            (SavePhase::Started, SyncPhase::Dirty) => {
                debug!("Save started, syncing diagram");
                if let Err(err) = self.sync_back(engine, host) {
                    error!(err:% = err; "Sync-back before save failed");
                }
            }
            (SavePhase::Completed, SyncPhase::Dirty) => self.phase = SyncPhase::Idle,
            (SavePhase::Failed, _) => {
                warn!(path:? = host.local_path(); "Save failed, edits remain pending");
            }
            _ => {}
        }
    }

    /// Writes the serialized diagram into the host.
    fn sync_back(
        &mut self,
        engine: &mut dyn DiagramEngine,
        host: &mut dyn DocumentHost,
    ) -> Result<(), FlowsyncError> {
        let text = engine
            .export_text(self.export_format)
            .map_err(FlowsyncError::SyncBack)?;
        self.last_synced = Some(text.clone());
        host.set_content(text);
        self.sync_backs += 1;
        trace!(count = self.sync_backs; "Synced diagram to document");
        Ok(())
    }
}

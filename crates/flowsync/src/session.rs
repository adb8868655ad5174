//! A document session: one document host, one diagram engine, kept in sync.
//!
//! [`Session`] owns both collaborators and the notification queue between
//! them. Every public operation finishes by draining the queue, so callers
//! always observe a settled state.

use std::{path::Path, sync::Arc};

use log::{debug, info};

use crate::{
    config::{AppConfig, RealignConfig},
    engine::{DiagramEngine, ExportFormat},
    error::FlowsyncError,
    event::{self, EventQueue},
    export::ImageExport,
    host::{DocumentHost, FileDocument},
    modeler::Modeler,
    realign::{RealignReport, Realigner},
    registry::{self, RegistryEntry},
    sync::{ErrorPanel, SyncController, SyncPhase, SyncState},
};

/// An open diagram document.
///
/// # Examples
///
/// ```
/// use flowsync::{
///     config::AppConfig,
///     host::MemoryDocument,
///     modeler::Modeler,
///     session::Session,
///     sync::SyncPhase,
/// };
///
/// let config = AppConfig::default();
/// let session = Session::open(
///     Box::new(Modeler::new(&config)),
///     Box::new(MemoryDocument::new("new.bpmn", "")),
///     &config,
/// );
///
/// assert!(session.ready().is_ok());
/// assert_eq!(session.phase(), SyncPhase::Idle);
/// assert!(session.content().contains("StartEvent_1"));
/// ```
pub struct Session {
    controller: SyncController,
    engine: Box<dyn DiagramEngine>,
    host: Box<dyn DocumentHost>,
    queue: EventQueue,
    realign: RealignConfig,
    entry: Arc<RegistryEntry>,
}

impl Session {
    /// Connects `engine` and `host`, waits for the document and loads it.
    ///
    /// Never fails: a document that cannot be read or loaded yields a session
    /// in [`SyncPhase::Failed`], see [`ready`](Self::ready).
    pub fn open(
        mut engine: Box<dyn DiagramEngine>,
        mut host: Box<dyn DocumentHost>,
        config: &AppConfig,
    ) -> Self {
        let (sink, queue) = event::channel();
        engine.connect(sink.clone());
        host.connect(sink);

        let format = ExportFormat {
            format: config.export().format_xml(),
        };
        let mut controller = SyncController::new(format);
        let entry = registry::register(host.local_path(), controller.phase());

        match host.wait_ready() {
            Ok(()) => controller.load(&mut *engine, &mut *host),
            Err(err) => controller.fail(err.into()),
        }

        let mut session = Self {
            controller,
            engine,
            host,
            queue,
            realign: *config.realign(),
            entry,
        };
        session.pump();
        info!(
            id = session.entry.id(),
            path:? = session.host.local_path(),
            phase:% = session.phase();
            "Session opened"
        );
        session
    }

    /// Opens the file at `path` with the built-in [`Modeler`].
    pub fn open_file(path: impl AsRef<Path>, config: &AppConfig) -> Self {
        Self::open(
            Box::new(Modeler::new(config)),
            Box::new(FileDocument::new(path.as_ref())),
            config,
        )
    }

    /// Returns the session if it loaded, or its load error.
    ///
    /// # Errors
    ///
    /// The error that put the session in [`SyncPhase::Failed`]. The session
    /// is torn down in that case.
    pub fn into_ready(mut self) -> Result<Self, FlowsyncError> {
        match self.controller.take_error() {
            Some(err) => {
                self.teardown();
                Err(err)
            }
            None => Ok(self),
        }
    }

    /// Handles every pending notification.
    pub fn pump(&mut self) {
        while let Some(event) = self.queue.pop() {
            self.controller
                .handle(event, &mut *self.engine, &mut *self.host);
        }
        self.entry.set_phase(self.controller.phase());
    }

    /// `Ok` once the diagram is loaded; the load error otherwise.
    pub fn ready(&self) -> Result<(), &FlowsyncError> {
        self.controller.ready()
    }

    /// What to display instead of the diagram when loading failed.
    pub fn error_panel(&self) -> Option<ErrorPanel> {
        self.controller.error_panel()
    }

    pub fn phase(&self) -> SyncPhase {
        self.controller.phase()
    }

    pub fn state(&self) -> SyncState {
        self.controller.state()
    }

    /// Registry id of this session.
    pub fn id(&self) -> u64 {
        self.entry.id()
    }

    /// The current document text.
    pub fn content(&self) -> &str {
        self.host.content()
    }

    pub fn local_path(&self) -> &Path {
        self.host.local_path()
    }

    /// Number of times the diagram was written back into the document.
    pub fn sync_backs(&self) -> usize {
        self.controller.sync_backs()
    }

    /// Number of external changes dropped in favor of unsaved local edits.
    pub fn ignored_external_changes(&self) -> usize {
        self.controller.ignored_external_changes()
    }

    /// The diagram engine, for edits made outside of realignment.
    pub fn engine_mut(&mut self) -> &mut dyn DiagramEngine {
        &mut *self.engine
    }

    /// The document host, e.g. to simulate edits made by other programs.
    pub fn host_mut(&mut self) -> &mut dyn DocumentHost {
        &mut *self.host
    }

    /// Persists the document.
    ///
    /// # Errors
    ///
    /// Fails if the session is not ready or the host rejects the save.
    pub fn save(&mut self) -> Result<(), FlowsyncError> {
        let result = self.controller.save(&mut *self.engine, &mut *self.host);
        self.pump();
        result
    }

    /// Resizes text annotations and re-routes drifted associations.
    ///
    /// # Errors
    ///
    /// Fails if the session is not ready, or with [`FlowsyncError::Realign`]
    /// when the engine rejects a change. Changes applied before the failure
    /// are synced back either way.
    pub fn realign(&mut self) -> Result<RealignReport, FlowsyncError> {
        self.ensure_ready()?;
        let result = Realigner::new(self.realign).apply(&mut *self.engine);
        self.pump();
        result
    }

    /// Renders the diagram to SVG, named after the document.
    ///
    /// # Errors
    ///
    /// Fails if the session is not ready or the engine cannot render.
    pub fn export_image(&self) -> Result<ImageExport, FlowsyncError> {
        self.ensure_ready()?;
        let svg = self.engine.export_image().map_err(FlowsyncError::Export)?;
        let export = ImageExport::new(self.host.local_path(), svg);
        debug!(file_name = export.file_name.as_str(); "Image exported");
        Ok(export)
    }

    /// Disconnects both collaborators, disposes the engine and leaves the
    /// registry. Idempotent; also run on drop.
    pub fn teardown(&mut self) {
        if self.controller.phase() == SyncPhase::Closed {
            return;
        }
        self.controller
            .teardown(&mut *self.engine, &mut *self.host);
        registry::unregister(self.entry.id());
        self.entry.set_phase(SyncPhase::Closed);
    }

    fn ensure_ready(&self) -> Result<(), FlowsyncError> {
        let phase = self.controller.phase();
        if phase.is_ready() {
            Ok(())
        } else {
            Err(FlowsyncError::NotReady(phase))
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{host::MemoryDocument, registry::active_sessions};
    use flowsync_bpmn::EMPTY_DIAGRAM;
    use flowsync_core::{
        geometry::{Bounds, Point, Size},
        identifier::Id,
    };

    fn open(content: &str) -> Session {
        let config = AppConfig::default();
        Session::open(
            Box::new(Modeler::new(&config)),
            Box::new(MemoryDocument::new("diagrams/order.bpmn", content)),
            &config,
        )
    }

    #[test]
    fn test_edit_is_synced_back_without_loop() {
        let mut session = open(EMPTY_DIAGRAM);
        let bounds = Bounds::new_from_top_left(Point::new(400.0, 300.0), Size::new(36.0, 36.0));

        session
            .engine_mut()
            .resize(&Id::new("StartEvent_1"), bounds)
            .unwrap();
        session.pump();

        assert_eq!(session.sync_backs(), 1);
        assert_eq!(session.phase(), SyncPhase::Dirty);
        assert!(session.content().contains(r#"x="400""#));

        session.pump();
        assert_eq!(session.sync_backs(), 1);
    }

    #[test]
    fn test_export_image_is_named_after_document() {
        let session = open(EMPTY_DIAGRAM);
        let export = session.export_image().unwrap();
        assert_eq!(export.file_name, "order.svg");
        assert!(export.svg.starts_with("<svg"));
    }

    #[test]
    fn test_failed_session_rejects_commands() {
        let mut session = open("this is not xml");

        assert!(session.ready().is_err());
        assert!(session.error_panel().is_some());
        assert!(matches!(
            session.realign(),
            Err(FlowsyncError::NotReady(SyncPhase::Failed))
        ));
        assert!(matches!(
            session.export_image(),
            Err(FlowsyncError::NotReady(SyncPhase::Failed))
        ));
        assert_eq!(session.content(), "this is not xml");
    }

    #[test]
    fn test_into_ready_returns_load_error() {
        assert!(open(EMPTY_DIAGRAM).into_ready().is_ok());

        let err = open("<definitions/>").into_ready().err().unwrap();
        assert!(matches!(err, FlowsyncError::Load { .. }));
    }

    #[test]
    fn test_teardown_leaves_registry() {
        let mut session = open(EMPTY_DIAGRAM);
        let id = session.id();
        assert!(active_sessions().iter().any(|summary| summary.id == id));

        session.teardown();
        session.teardown();

        assert_eq!(session.phase(), SyncPhase::Closed);
        assert!(!active_sessions().iter().any(|summary| summary.id == id));
    }
}

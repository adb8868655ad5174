//! The document host boundary.
//!
//! A [`DocumentHost`] owns the authoritative text of a diagram file. It
//! reports content changes and save progress through an [`EventSink`].
//!
//! Two hosts are provided: [`MemoryDocument`] keeps the text in memory and
//! can simulate edits by other programs, [`FileDocument`] reads and writes a
//! file on disk.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, error, info};
use thiserror::Error;

use crate::event::{EventSink, SavePhase, SessionEvent};

/// Errors reported by a [`DocumentHost`].
#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to read `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write `{}`: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("save rejected: {0}")]
    Rejected(String),
}

/// Owner of the text content of a diagram document.
pub trait DocumentHost {
    /// Starts delivering content and save notifications to `sink`.
    fn connect(&mut self, sink: EventSink);

    /// Stops delivering notifications.
    fn disconnect(&mut self);

    /// Blocks until the content is available.
    fn wait_ready(&mut self) -> Result<(), HostError>;

    /// The current text.
    fn content(&self) -> &str;

    /// Replaces the text. Emits [`SessionEvent::ContentChanged`].
    fn set_content(&mut self, content: String);

    /// Path of the document, used to name exports.
    fn local_path(&self) -> &Path;

    /// Persists the current text.
    ///
    /// Emits [`SavePhase::Started`], then [`SavePhase::Completed`] or [`SavePhase::Failed`].
    fn save(&mut self) -> Result<(), HostError>;
}

#[derive(Debug, Default)]
struct Notifier {
    sink: Option<EventSink>,
}

impl Notifier {
    fn emit(&self, event: SessionEvent) {
        if let Some(sink) = &self.sink {
            sink.emit(event);
        }
    }
}

/// An in-memory document.
///
/// # Examples
///
/// ```
/// use flowsync::host::{DocumentHost, MemoryDocument};
///
/// let mut doc = MemoryDocument::new("notes/order.bpmn", "");
/// doc.set_content("<definitions/>".to_string());
/// doc.save().unwrap();
///
/// assert_eq!(doc.saved(), Some("<definitions/>"));
/// assert_eq!(doc.writes(), 1);
/// ```
#[derive(Debug)]
pub struct MemoryDocument {
    path: PathBuf,
    content: String,
    saved: Option<String>,
    writes: usize,
    reject_saves: bool,
    notifier: Notifier,
}

impl MemoryDocument {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            saved: None,
            writes: 0,
            reject_saves: false,
            notifier: Notifier::default(),
        }
    }

    /// Replaces the content as another program would, without counting it as a write.
    pub fn replace_externally(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.notifier.emit(SessionEvent::ContentChanged);
    }

    /// Number of [`DocumentHost::set_content`] calls.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// The content at the last successful save.
    pub fn saved(&self) -> Option<&str> {
        self.saved.as_deref()
    }

    /// Makes subsequent saves fail.
    pub fn reject_saves(&mut self, reject: bool) {
        self.reject_saves = reject;
    }
}

impl DocumentHost for MemoryDocument {
    fn connect(&mut self, sink: EventSink) {
        self.notifier.sink = Some(sink);
    }

    fn disconnect(&mut self) {
        self.notifier.sink = None;
    }

    fn wait_ready(&mut self) -> Result<(), HostError> {
        Ok(())
    }

    fn content(&self) -> &str {
        &self.content
    }

    fn set_content(&mut self, content: String) {
        self.content = content;
        self.writes += 1;
        self.notifier.emit(SessionEvent::ContentChanged);
    }

    fn local_path(&self) -> &Path {
        &self.path
    }

    fn save(&mut self) -> Result<(), HostError> {
        self.notifier.emit(SessionEvent::SaveState(SavePhase::Started));
        if self.reject_saves {
            self.notifier.emit(SessionEvent::SaveState(SavePhase::Failed));
            return Err(HostError::Rejected(format!(
                "`{}` is read-only",
                self.path.display()
            )));
        }
        self.saved = Some(self.content.clone());
        self.notifier
            .emit(SessionEvent::SaveState(SavePhase::Completed));
        Ok(())
    }
}

/// A document backed by a file on disk.
///
/// The file is read by [`DocumentHost::wait_ready`]; a missing file is an
/// empty document. Content changes stay in memory until [`DocumentHost::save`].
#[derive(Debug)]
pub struct FileDocument {
    path: PathBuf,
    content: String,
    notifier: Notifier,
}

impl FileDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            content: String::new(),
            notifier: Notifier::default(),
        }
    }
}

impl DocumentHost for FileDocument {
    fn connect(&mut self, sink: EventSink) {
        self.notifier.sink = Some(sink);
    }

    fn disconnect(&mut self) {
        self.notifier.sink = None;
    }

    fn wait_ready(&mut self) -> Result<(), HostError> {
        self.content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(path:? = self.path; "Document does not exist yet, starting empty");
                String::new()
            }
            Err(source) => {
                error!(path:? = self.path, err:% = source; "Failed to read document");
                return Err(HostError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        debug!(path:? = self.path, bytes = self.content.len(); "Document read");
        Ok(())
    }

    fn content(&self) -> &str {
        &self.content
    }

    fn set_content(&mut self, content: String) {
        self.content = content;
        self.notifier.emit(SessionEvent::ContentChanged);
    }

    fn local_path(&self) -> &Path {
        &self.path
    }

    fn save(&mut self) -> Result<(), HostError> {
        self.notifier.emit(SessionEvent::SaveState(SavePhase::Started));
        if let Err(source) = fs::write(&self.path, &self.content) {
            error!(path:? = self.path, err:% = source; "Failed to write document");
            self.notifier.emit(SessionEvent::SaveState(SavePhase::Failed));
            return Err(HostError::Write {
                path: self.path.clone(),
                source,
            });
        }
        info!(path:? = self.path; "Document saved");
        self.notifier
            .emit(SessionEvent::SaveState(SavePhase::Completed));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event;

    #[test]
    fn test_memory_document_notifies() {
        let (sink, queue) = event::channel();
        let mut doc = MemoryDocument::new("a.bpmn", "one");
        doc.connect(sink);

        doc.set_content("two".to_string());
        doc.replace_externally("three");

        assert_eq!(queue.pop(), Some(SessionEvent::ContentChanged));
        assert_eq!(queue.pop(), Some(SessionEvent::ContentChanged));
        assert_eq!(doc.content(), "three");
        assert_eq!(doc.writes(), 1);
    }

    #[test]
    fn test_memory_document_rejected_save() {
        let (sink, queue) = event::channel();
        let mut doc = MemoryDocument::new("a.bpmn", "one");
        doc.connect(sink);
        doc.reject_saves(true);

        assert!(matches!(doc.save(), Err(HostError::Rejected(_))));
        assert_eq!(queue.pop(), Some(SessionEvent::SaveState(SavePhase::Started)));
        assert_eq!(queue.pop(), Some(SessionEvent::SaveState(SavePhase::Failed)));
        assert_eq!(doc.saved(), None);
    }

    #[test]
    fn test_file_document_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = FileDocument::new(dir.path().join("new.bpmn"));

        doc.wait_ready().unwrap();
        assert_eq!(doc.content(), "");
    }

    #[test]
    fn test_file_document_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diagram.bpmn");
        fs::write(&path, "before").unwrap();

        let (sink, queue) = event::channel();
        let mut doc = FileDocument::new(&path);
        doc.connect(sink);
        doc.wait_ready().unwrap();
        assert_eq!(doc.content(), "before");

        doc.set_content("after".to_string());
        assert_eq!(fs::read_to_string(&path).unwrap(), "before");

        doc.save().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "after");
        assert_eq!(queue.pop(), Some(SessionEvent::ContentChanged));
        assert_eq!(queue.pop(), Some(SessionEvent::SaveState(SavePhase::Started)));
        assert_eq!(queue.pop(), Some(SessionEvent::SaveState(SavePhase::Completed)));
    }

    #[test]
    fn test_file_document_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = FileDocument::new(dir.path());

        assert!(matches!(doc.wait_ready(), Err(HostError::Read { .. })));
    }
}

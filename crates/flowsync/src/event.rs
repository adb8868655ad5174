//! Notifications flowing from the engine and the host to the session.
//!
//! Both collaborators hold an [`EventSink`]; the session owns the matching
//! [`EventQueue`] and drains it on its own loop, so notifications are handled
//! in emission order and never re-entrantly.

use std::{
    fmt,
    sync::mpsc::{self, Receiver, Sender},
};

use log::trace;

/// Phase of a save orchestrated by the document host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePhase {
    Started,
    Completed,
    Failed,
}

/// A notification from the diagram engine or the document host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The diagram graph was edited.
    DiagramChanged,
    /// The document text changed.
    ContentChanged,
    /// The host reports progress of a save.
    SaveState(SavePhase),
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DiagramChanged => write!(f, "diagram changed"),
            Self::ContentChanged => write!(f, "content changed"),
            Self::SaveState(SavePhase::Started) => write!(f, "save started"),
            Self::SaveState(SavePhase::Completed) => write!(f, "save completed"),
            Self::SaveState(SavePhase::Failed) => write!(f, "save failed"),
        }
    }
}

/// Creates a connected sink and queue.
pub fn channel() -> (EventSink, EventQueue) {
    let (sender, receiver) = mpsc::channel();
    (EventSink { sender }, EventQueue { receiver })
}

/// Sending half of a notification stream.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: Sender<SessionEvent>,
}

impl EventSink {
    /// Emits `event`. Events sent after the queue is gone are dropped.
    pub fn emit(&self, event: SessionEvent) {
        if self.sender.send(event).is_err() {
            trace!(event:% = event; "Event dropped, session queue closed");
        }
    }
}

/// Receiving half of a notification stream.
#[derive(Debug)]
pub struct EventQueue {
    receiver: Receiver<SessionEvent>,
}

impl EventQueue {
    /// Takes the next pending event without blocking.
    pub fn pop(&self) -> Option<SessionEvent> {
        self.receiver.try_recv().ok()
    }
}

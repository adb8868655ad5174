//! Process-wide list of open sessions.
//!
//! Every [`Session`](crate::session::Session) registers itself on open and
//! unregisters on teardown. The registry only holds weak references, so a
//! session dropped without teardown disappears on the next lookup.

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, MutexGuard, OnceLock, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use log::trace;

use crate::sync::SyncPhase;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static ENTRIES: OnceLock<Mutex<Vec<Weak<RegistryEntry>>>> = OnceLock::new();

fn entries() -> MutexGuard<'static, Vec<Weak<RegistryEntry>>> {
    ENTRIES
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A registered session, shared between the session and the registry.
#[derive(Debug)]
pub(crate) struct RegistryEntry {
    id: u64,
    path: PathBuf,
    phase: Mutex<SyncPhase>,
}

impl RegistryEntry {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn set_phase(&self, phase: SyncPhase) {
        *self
            .phase
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = phase;
    }

    fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            path: self.path.clone(),
            phase: *self
                .phase
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        }
    }
}

/// A point-in-time view of an open session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: u64,
    pub path: PathBuf,
    pub phase: SyncPhase,
}

/// Adds a session for `path` to the registry.
pub(crate) fn register(path: &Path, phase: SyncPhase) -> Arc<RegistryEntry> {
    let entry = Arc::new(RegistryEntry {
        id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
        path: path.to_path_buf(),
        phase: Mutex::new(phase),
    });
    entries().push(Arc::downgrade(&entry));
    trace!(id = entry.id, path:? = path; "Session registered");
    entry
}

/// Removes the session with `id`, along with any dropped sessions.
pub(crate) fn unregister(id: u64) {
    entries().retain(|weak| weak.upgrade().is_some_and(|entry| entry.id != id));
    trace!(id; "Session unregistered");
}

/// All sessions currently open in this process, oldest first.
pub fn active_sessions() -> Vec<SessionSummary> {
    let mut entries = entries();
    entries.retain(|weak| weak.strong_count() > 0);
    entries
        .iter()
        .filter_map(Weak::upgrade)
        .map(|entry| entry.summary())
        .collect()
}

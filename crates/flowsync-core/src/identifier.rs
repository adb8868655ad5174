//! Interned identifiers for diagram elements.
//!
//! BPMN element ids (`StartEvent_1`, `Flow_0x1y2z`, ...) are compared and hashed
//! constantly while resolving connections against the shape table, so they are
//! interned once and passed around as a `Copy` handle.

use std::{
    fmt,
    sync::{Mutex, MutexGuard, OnceLock},
};

use string_interner::{DefaultStringInterner, DefaultSymbol};

/// Global string interner backing every [`Id`].
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn interner() -> MutexGuard<'static, DefaultStringInterner> {
    INTERNER
        .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Identifier of a shape or connection in a diagram graph.
///
/// # Examples
///
/// ```
/// use flowsync_core::identifier::Id;
///
/// let task = Id::new("Task_1");
/// let same: Id = "Task_1".into();
///
/// assert_eq!(task, same);
/// assert_eq!(task, "Task_1");
/// assert_eq!(task.to_string(), "Task_1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(DefaultSymbol);

impl Id {
    /// Interns `name` and returns its identifier.
    pub fn new(name: &str) -> Self {
        Self(interner().get_or_intern(name))
    }

    /// Runs `f` with the textual form of this identifier without allocating.
    pub fn with_str<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        let interner = interner();
        let name = interner
            .resolve(self.0)
            .expect("interned symbols are never removed");
        f(name)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_str(|name| f.write_str(name))
    }
}

impl std::str::FromStr for Id {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for Id {
    fn eq(&self, other: &str) -> bool {
        self.with_str(|name| name == other)
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_same_id() {
        let a = Id::new("StartEvent_1");
        let b = Id::new("StartEvent_1");
        let c = Id::new("EndEvent_1");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_compare_with_str() {
        let id = Id::new("Flow_1");
        assert!(id == "Flow_1");
        assert!(id != "Flow_2");
    }

    #[test]
    fn test_from_str_roundtrip() {
        let id: Id = "Association_7".parse().unwrap();
        assert_eq!(id.to_string(), "Association_7");
    }

    #[test]
    fn test_display_inside_format_does_not_deadlock() {
        let a = Id::new("A");
        let b = Id::new("B");
        assert_eq!(format!("{a} -> {b}"), "A -> B");
    }
}

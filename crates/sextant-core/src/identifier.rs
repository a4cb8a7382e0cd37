//! Interned identifiers and fresh-id generation.
//!
//! Every element id, type name and property name in Sextant is an [`Id`]: a
//! copyable handle into a process-wide string interner. Comparing two ids is
//! a symbol comparison, and ids can be used as map keys without cloning
//! strings around.
//!
//! [`IdGenerator`] hands out ids of the form `{prefix}_{n}` that are not yet
//! taken in a document.

use std::{
    collections::HashMap,
    fmt,
    sync::{Mutex, OnceLock},
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use string_interner::{DefaultStringInterner, DefaultSymbol};

/// Global string interner backing every [`Id`].
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

/// Runs `f` with exclusive access to the global interner.
fn with_interner<R>(f: impl FnOnce(&mut DefaultStringInterner) -> R) -> R {
    let mut interner = INTERNER
        .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
        .lock()
        .expect("Failed to acquire interner lock");
    f(&mut interner)
}

/// A string-interned identifier.
///
/// Used for semantic object ids (`Task_1`), diagram element ids, schema type
/// names (`bpmn:Task`) and property names (`sourceRef`).
///
/// # Examples
///
/// ```
/// use sextant_core::identifier::Id;
///
/// let task = Id::new("bpmn:UserTask");
/// assert_eq!(task, "bpmn:UserTask");
/// assert_eq!(task.local_name(), "UserTask");
///
/// let same: Id = "bpmn:UserTask".into();
/// assert_eq!(task, same);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(DefaultSymbol);

impl Id {
    /// Creates an `Id` from a string, interning it on first use.
    pub fn new(name: &str) -> Self {
        Self(with_interner(|interner| interner.get_or_intern(name)))
    }

    /// Returns an owned copy of the identifier text.
    pub fn as_string(self) -> String {
        with_interner(|interner| {
            interner
                .resolve(self.0)
                .expect("Symbol should exist in interner")
                .to_string()
        })
    }

    /// Returns the part after the namespace prefix.
    ///
    /// `bpmn:ServiceTask` becomes `ServiceTask`; ids without a prefix are
    /// returned unchanged.
    pub fn local_name(self) -> String {
        let full = self.as_string();
        match full.split_once(':') {
            Some((_, local)) => local.to_string(),
            None => full,
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        with_interner(|interner| {
            let value = interner
                .resolve(self.0)
                .expect("Symbol should exist in interner");
            f.write_str(value)
        })
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<&String> for Id {
    fn from(name: &String) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for Id {
    fn eq(&self, other: &str) -> bool {
        with_interner(|interner| interner.resolve(self.0) == Some(other))
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_string())
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::new(&value))
    }
}

/// Generates fresh identifiers of the form `{prefix}_{n}`.
///
/// Each prefix has its own counter. Counters only move forward, so an id
/// handed out once is never handed out again by the same generator, even if
/// the element that carried it was removed in the meantime. The caller
/// supplies the "is this id taken" predicate, which lets the generator skip
/// ids that already exist in a loaded document.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    counters: HashMap<String, u64>,
}

impl IdGenerator {
    /// Creates a generator with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next id for `prefix` that `is_taken` does not reject.
    ///
    /// # Examples
    ///
    /// ```
    /// use sextant_core::identifier::{Id, IdGenerator};
    ///
    /// let mut ids = IdGenerator::new();
    /// let taken = Id::new("Task_1");
    ///
    /// let fresh = ids.next_id("Task", |id| id == taken);
    /// assert_eq!(fresh, "Task_2");
    /// assert_eq!(ids.next_id("Task", |_| false), "Task_3");
    /// ```
    pub fn next_id(&mut self, prefix: &str, is_taken: impl Fn(Id) -> bool) -> Id {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = Id::new(&format!("{prefix}_{counter}"));
            if !is_taken(candidate) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_interning_is_stable() {
        let a = Id::new("bpmn:Task");
        let b = Id::new("bpmn:Task");
        let c = Id::new("bpmn:Gateway");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, "bpmn:Task");
        assert!(a != "bpmn:Gateway");
    }

    #[test]
    fn test_local_name() {
        assert_eq!(Id::new("bpmn:SequenceFlow").local_name(), "SequenceFlow");
        assert_eq!(Id::new("ext:TaskListener").local_name(), "TaskListener");
        assert_eq!(Id::new("Task_7").local_name(), "Task_7");
    }

    #[test]
    fn test_display_and_as_string() {
        let id = Id::new("Gateway_3");
        assert_eq!(format!("{id}"), "Gateway_3");
        assert_eq!(id.as_string(), "Gateway_3");
    }

    #[test]
    fn test_serde_as_plain_string() {
        let id = Id::new("Flow_12");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"Flow_12\"");

        let back: Id = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_generator_skips_taken_ids() {
        let mut ids = IdGenerator::new();
        let taken: HashSet<Id> = ["Task_1", "Task_2", "Task_4"]
            .into_iter()
            .map(Id::new)
            .collect();

        assert_eq!(ids.next_id("Task", |id| taken.contains(&id)), "Task_3");
        assert_eq!(ids.next_id("Task", |id| taken.contains(&id)), "Task_5");
    }

    #[test]
    fn test_generator_counters_per_prefix() {
        let mut ids = IdGenerator::new();
        assert_eq!(ids.next_id("Task", |_| false), "Task_1");
        assert_eq!(ids.next_id("Flow", |_| false), "Flow_1");
        assert_eq!(ids.next_id("Task", |_| false), "Task_2");
    }

    proptest! {
        #[test]
        fn generated_ids_are_unique(prefixes in proptest::collection::vec(0usize..3, 1..60)) {
            let names = ["Task", "Flow", "Event"];
            let mut ids = IdGenerator::new();
            let mut seen = HashSet::new();
            for idx in prefixes {
                let id = ids.next_id(names[idx], |candidate| seen.contains(&candidate));
                prop_assert!(seen.insert(id), "id {} generated twice", id);
            }
        }
    }
}

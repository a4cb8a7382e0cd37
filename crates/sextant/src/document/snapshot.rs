//! JSON snapshots of a [`Document`].

use std::rc::Rc;

use log::debug;
use serde::{Deserialize, Serialize};

use sextant_core::{
    ModelError,
    diagram::{DiagramElement, ElementRegistry},
    identifier::Id,
    schema::Schema,
    semantic::{Model, ObjectArena, SemanticObject},
};

use super::Document;
use crate::SextantError;

/// Serializable form of a document.
///
/// Only stored relations are kept; derived relations are rebuilt by the
/// registry when the snapshot is turned back into a [`Document`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    definitions: Id,
    root: Id,
    objects: Vec<SemanticObject>,
    elements: Vec<DiagramElement>,
}

impl DocumentSnapshot {
    /// Captures the current state of a document.
    pub fn capture(document: &Document) -> Self {
        Self {
            definitions: document.definitions(),
            root: document.root(),
            objects: document.model().arena().iter().cloned().collect(),
            elements: document.registry().get_all().cloned().collect(),
        }
    }

    pub fn objects(&self) -> &[SemanticObject] {
        &self.objects
    }

    pub fn elements(&self) -> &[DiagramElement] {
        &self.elements
    }

    /// Serializes the snapshot as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SextantError::Snapshot`] if serialization fails.
    pub fn to_json(&self) -> Result<String, SextantError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a snapshot from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SextantError::Snapshot`] if the input is not a valid snapshot.
    pub fn from_json(json: &str) -> Result<Self, SextantError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Rebuilds a document from the snapshot.
    ///
    /// Elements may appear in any order; each one is registered as soon as
    /// everything it points to is registered.
    ///
    /// # Errors
    ///
    /// - [`ModelError::DuplicateId`] for repeated object or element ids.
    /// - [`ModelError::UnknownType`] for objects of types the schema lacks.
    /// - [`ModelError::MissingRelation`] for elements pointing at unknown
    ///   elements, including cycles.
    pub fn into_document(self, schema: Rc<Schema>) -> Result<Document, SextantError> {
        let mut arena = ObjectArena::new();
        for object in self.objects {
            if !schema.contains(object.type_name()) {
                return Err(ModelError::UnknownType(object.type_name()).into());
            }
            arena.insert(object)?;
        }
        let model = Model::from_arena(arena, self.definitions)?;

        let mut registry = ElementRegistry::new();
        let mut pending = self.elements;
        while !pending.is_empty() {
            let (ready, blocked): (Vec<_>, Vec<_>) = pending.into_iter().partition(|element| {
                element
                    .relations()
                    .all(|relation| registry.contains(relation))
            });
            if ready.is_empty() {
                let element = &blocked[0];
                let relation = element
                    .relations()
                    .find(|relation| !registry.contains(*relation))
                    .unwrap_or(element.id());
                return Err(ModelError::MissingRelation {
                    element: element.id(),
                    relation,
                }
                .into());
            }
            for element in ready {
                registry.add(element, None)?;
            }
            pending = blocked;
        }

        debug!(
            objects = model.arena().len(),
            elements = registry.len();
            "Loaded document snapshot"
        );
        Document::from_parts(schema, model, registry, self.root)
    }
}

impl Document {
    /// Rebuilds a document from a snapshot.
    ///
    /// # Errors
    ///
    /// See [`DocumentSnapshot::into_document`].
    pub fn from_snapshot(schema: Rc<Schema>, snapshot: DocumentSnapshot) -> Result<Self, SextantError> {
        snapshot.into_document(schema)
    }

    /// Captures the document as a snapshot.
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot::capture(self)
    }
}

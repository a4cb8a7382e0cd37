use std::collections::HashSet;

use log::{debug, info};

use sextant_core::{identifier::Id, semantic::ObjectArena};

use super::Descriptor;
use crate::{SextantError, clone::is_structural, document::Document};

/// An immutable copy of a selection.
///
/// Holds the descriptor tree and a private snapshot of every semantic
/// object a paste reads: the business objects of the descriptors with what
/// they own, plus the objects they refer to. Pasting never looks at the live
/// originals, so the same clipboard can be pasted any number of times, even
/// after the originals were changed or removed.
#[derive(Debug, Clone, Default)]
pub struct ClipboardContents {
    tree: Vec<Vec<Descriptor>>,
    objects: ObjectArena,
}

impl ClipboardContents {
    /// Snapshots `tree` from `document`.
    ///
    /// # Errors
    ///
    /// Returns an error if an object is reachable twice under the same id,
    /// which a consistent document never produces.
    pub fn capture(document: &Document, tree: Vec<Vec<Descriptor>>) -> Result<Self, SextantError> {
        let mut visited = HashSet::new();
        let mut pending: Vec<Id> = tree
            .iter()
            .flatten()
            .map(|descriptor| descriptor.element().business_object())
            .collect();

        let mut objects = ObjectArena::new();
        while let Some(id) = pending.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(object) = document.object(id) else {
                debug!(object = id.to_string(); "Referenced object missing, not copied");
                continue;
            };
            for (property, value) in object.properties() {
                if is_structural(*property) {
                    continue;
                }
                pending.extend(value.owned_ids());
                for reference in value.referenced_ids() {
                    pending.push(reference);
                    pending.extend(definition_of(document, reference));
                }
            }
            objects.insert(object.clone())?;
        }

        let clipboard = Self { tree, objects };
        info!(
            descriptors = clipboard.descriptors().count(),
            objects = clipboard.objects.len();
            "Copied selection"
        );
        Ok(clipboard)
    }

    /// Whether nothing was copied.
    pub fn is_empty(&self) -> bool {
        self.tree.iter().all(Vec::is_empty)
    }

    /// Descriptors grouped by depth, shallowest first.
    pub fn tree(&self) -> &[Vec<Descriptor>] {
        &self.tree
    }

    /// Snapshot of the semantic objects the descriptors need.
    pub fn objects(&self) -> &ObjectArena {
        &self.objects
    }

    /// All descriptors in creation order.
    pub fn descriptors(&self) -> impl Iterator<Item = &Descriptor> {
        self.tree.iter().flatten()
    }
}

/// The global definition owning `object`, such as the category of a
/// category value. Processes and collaborations do not count.
fn definition_of(document: &Document, object: Id) -> Option<Id> {
    let mut current = document.object(object)?.parent();
    while let Some(id) = current {
        let candidate = document.object(id)?;
        let type_name = candidate.type_name();
        if document.is_a(type_name, "bpmn:RootElement") {
            let is_container = document
                .schema()
                .is_any(type_name, &["bpmn:Process", "bpmn:Collaboration"]);
            return (!is_container).then_some(id);
        }
        current = candidate.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Modeler,
        command::{CreateShapeContext, UpdatePropertiesContext},
        config::ModelerConfig,
        geometry::{Bounds, Point, Size},
        semantic::Value,
    };

    fn bounds(x: f32, y: f32) -> Bounds {
        Bounds::new_from_top_left(Point::new(x, y), Size::new(100.0, 80.0))
    }

    #[test]
    fn test_captures_referenced_definitions() {
        let mut modeler = Modeler::new(ModelerConfig::default()).unwrap();
        let root = modeler.document().root();
        let message = modeler
            .add_root_element("bpmn:Message", &[("name", Value::from("Invoice"))])
            .unwrap();
        let task = modeler
            .create_shape(
                CreateShapeContext::new("bpmn:SendTask", root, bounds(0.0, 0.0))
                    .with_property("messageRef", Value::Reference(message)),
            )
            .unwrap();

        let clipboard = modeler.copy(&[task]).unwrap();
        assert!(clipboard.objects().contains(task));
        assert!(clipboard.objects().contains(message));
        // The process holding the task is structural context, not content.
        assert!(!clipboard.objects().contains(root));
    }

    #[test]
    fn test_clipboard_survives_removal_of_originals() {
        let mut modeler = Modeler::new(ModelerConfig::default()).unwrap();
        let root = modeler.document().root();
        let task = modeler
            .create_shape(
                CreateShapeContext::new("bpmn:Task", root, bounds(0.0, 0.0)).with_property("name", Value::from("Review")),
            )
            .unwrap();
        let clipboard = modeler.copy(&[task]).unwrap();

        modeler
            .update_properties(UpdatePropertiesContext::new(task).set("name", Value::from("Changed")))
            .unwrap();
        modeler.remove_elements(&[task]).unwrap();

        let pasted = modeler.paste(&clipboard, None, Point::new(300.0, 300.0)).unwrap();
        assert_eq!(pasted.len(), 1);
        assert_eq!(
            modeler.document().object(pasted[0]).unwrap().get_str("name"),
            Some("Review")
        );
    }

    #[test]
    fn test_empty_selection_gives_empty_clipboard() {
        let mut modeler = Modeler::new(ModelerConfig::default()).unwrap();
        let root = modeler.document().root();
        let clipboard = modeler.copy(&[root]).unwrap();
        assert!(clipboard.is_empty());
        assert_eq!(clipboard.descriptors().count(), 0);
    }
}

//! Element registry: id lookup plus maintenance of derived relations.

use indexmap::IndexMap;
use log::trace;

use crate::{ModelError, geometry::Bounds, identifier::Id};

use super::DiagramElement;

/// Maps element ids to diagram elements.
///
/// Adding an element wires its inverse relations on the elements it points
/// to (a parent's `children`, a host's `attachers`, a source's `outgoing`, a
/// target's `incoming`, a label target's `label`). Removing it unwires them.
/// An element that others still depend on cannot be removed, so the graph
/// never holds dangling relations.
#[derive(Debug, Clone, Default)]
pub struct ElementRegistry {
    elements: IndexMap<Id, DiagramElement>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: Id) -> Option<&DiagramElement> {
        self.elements.get(&id)
    }

    pub fn contains(&self, id: Id) -> bool {
        self.elements.contains_key(&id)
    }

    /// All elements, parents always before the elements that point to them.
    pub fn get_all(&self) -> impl Iterator<Item = &DiagramElement> {
        self.elements.values()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements matching `predicate`, in registry order.
    pub fn filter(&self, predicate: impl Fn(&DiagramElement) -> bool) -> Vec<&DiagramElement> {
        self.elements
            .values()
            .filter(|element| predicate(element))
            .collect()
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: Id) -> Vec<Id> {
        let mut result = Vec::new();
        let mut current = self.get(id).and_then(DiagramElement::parent);
        while let Some(parent) = current {
            result.push(parent);
            current = self.get(parent).and_then(DiagramElement::parent);
        }
        result
    }

    /// Adds an element and wires its derived relations.
    ///
    /// `index` positions the element among its parent's children; `None`
    /// appends it.
    ///
    /// # Errors
    ///
    /// - [`ModelError::DuplicateId`] if the id is taken.
    /// - [`ModelError::MissingRelation`] if a stored relation points to an
    ///   unknown element.
    pub fn add(&mut self, mut element: DiagramElement, index: Option<usize>) -> Result<(), ModelError> {
        if self.elements.contains_key(&element.id) {
            return Err(ModelError::DuplicateId(element.id));
        }
        if let Some(missing) = element
            .relations()
            .find(|relation| !self.elements.contains_key(relation))
        {
            return Err(ModelError::MissingRelation {
                element: element.id,
                relation: missing,
            });
        }

        element.clear_derived();
        let id = element.id;
        trace!(element = id.to_string(); "Registering diagram element");

        if let Some(parent) = element.parent.and_then(|p| self.elements.get_mut(&p)) {
            let position = index
                .unwrap_or(parent.children.len())
                .min(parent.children.len());
            parent.children.insert(position, id);
        }
        if let Some(host) = element.host.and_then(|h| self.elements.get_mut(&h)) {
            host.attachers.push(id);
        }
        if let Some(source) = element.source.and_then(|s| self.elements.get_mut(&s)) {
            source.outgoing.push(id);
        }
        if let Some(target) = element.target.and_then(|t| self.elements.get_mut(&t)) {
            target.incoming.push(id);
        }
        if let Some(owner) = element.label_target.and_then(|o| self.elements.get_mut(&o)) {
            owner.label = Some(id);
        }

        self.elements.insert(id, element);
        Ok(())
    }

    /// Removes an element and unwires its relations.
    ///
    /// Returns the detached element together with its former position among
    /// its parent's children, which is exactly what [`ElementRegistry::add`]
    /// needs to restore it.
    ///
    /// # Errors
    ///
    /// - [`ModelError::UnknownElement`] if the id is not registered.
    /// - [`ModelError::ElementInUse`] if a label, child, attacher or
    ///   connection still depends on the element.
    pub fn remove(&mut self, id: Id) -> Result<(DiagramElement, Option<usize>), ModelError> {
        let element = self.elements.get(&id).ok_or(ModelError::UnknownElement(id))?;
        if let Some(dependent) = element.first_dependent() {
            return Err(ModelError::ElementInUse {
                element: id,
                dependent,
            });
        }

        let element = self
            .elements
            .shift_remove(&id)
            .ok_or(ModelError::UnknownElement(id))?;

        let mut index = None;
        if let Some(parent) = element.parent.and_then(|p| self.elements.get_mut(&p)) {
            index = parent.children.iter().position(|child| *child == id);
            parent.children.retain(|child| *child != id);
        }
        if let Some(host) = element.host.and_then(|h| self.elements.get_mut(&h)) {
            host.attachers.retain(|attacher| *attacher != id);
        }
        if let Some(source) = element.source.and_then(|s| self.elements.get_mut(&s)) {
            source.outgoing.retain(|connection| *connection != id);
        }
        if let Some(target) = element.target.and_then(|t| self.elements.get_mut(&t)) {
            target.incoming.retain(|connection| *connection != id);
        }
        if let Some(owner) = element.label_target.and_then(|o| self.elements.get_mut(&o)) {
            owner.label = None;
        }

        trace!(element = id.to_string(); "Unregistered diagram element");
        Ok((element, index))
    }

    /// Replaces the bounds of a shape or label, returning the old bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownElement`] if the id is not registered.
    pub fn set_bounds(&mut self, id: Id, bounds: Option<Bounds>) -> Result<Option<Bounds>, ModelError> {
        let element = self
            .elements
            .get_mut(&id)
            .ok_or(ModelError::UnknownElement(id))?;
        Ok(std::mem::replace(&mut element.bounds, bounds))
    }
}

#[cfg(test)]
mod tests {
    use crate::geometry::{Point, Size};

    use super::*;

    fn bounds(x: f32, y: f32) -> Bounds {
        Bounds::new_from_top_left(Point::new(x, y), Size::new(100.0, 80.0))
    }

    fn registry_with_two_tasks() -> ElementRegistry {
        let mut registry = ElementRegistry::new();
        let root = Id::new("Process_1");
        registry
            .add(DiagramElement::root(root, Id::new("bpmn:Process"), root), None)
            .unwrap();
        for (name, x) in [("Task_1", 100.0), ("Task_2", 300.0)] {
            let id = Id::new(name);
            registry
                .add(
                    DiagramElement::shape(id, Id::new("bpmn:Task"), id, bounds(x, 100.0))
                        .with_parent(root),
                    None,
                )
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_add_wires_children_and_connections() {
        let mut registry = registry_with_two_tasks();
        let flow = Id::new("Flow_1");
        registry
            .add(
                DiagramElement::connection(
                    flow,
                    Id::new("bpmn:SequenceFlow"),
                    flow,
                    Id::new("Task_1"),
                    Id::new("Task_2"),
                    vec![Point::new(200.0, 140.0), Point::new(300.0, 140.0)],
                )
                .with_parent(Id::new("Process_1")),
                None,
            )
            .unwrap();

        let root = registry.get(Id::new("Process_1")).unwrap();
        assert_eq!(root.children().len(), 3);
        assert_eq!(registry.get(Id::new("Task_1")).unwrap().outgoing(), [flow]);
        assert_eq!(registry.get(Id::new("Task_2")).unwrap().incoming(), [flow]);
    }

    #[test]
    fn test_add_rejects_missing_relations_and_duplicates() {
        let mut registry = registry_with_two_tasks();
        let orphan = Id::new("Task_9");
        let result = registry.add(
            DiagramElement::shape(orphan, Id::new("bpmn:Task"), orphan, bounds(0.0, 0.0))
                .with_parent(Id::new("Missing_1")),
            None,
        );
        assert_eq!(
            result,
            Err(ModelError::MissingRelation {
                element: orphan,
                relation: Id::new("Missing_1"),
            })
        );

        let task = registry.get(Id::new("Task_1")).unwrap().clone();
        assert_eq!(
            registry.add(task, None),
            Err(ModelError::DuplicateId(Id::new("Task_1")))
        );
    }

    #[test]
    fn test_remove_restores_with_index() {
        let mut registry = registry_with_two_tasks();
        let (task, index) = registry.remove(Id::new("Task_1")).unwrap();
        assert_eq!(index, Some(0));
        assert_eq!(
            registry.get(Id::new("Process_1")).unwrap().children(),
            [Id::new("Task_2")]
        );

        registry.add(task, index).unwrap();
        assert_eq!(
            registry.get(Id::new("Process_1")).unwrap().children(),
            [Id::new("Task_1"), Id::new("Task_2")]
        );
    }

    #[test]
    fn test_remove_refuses_elements_in_use() {
        let mut registry = registry_with_two_tasks();
        let label = Id::new("Task_1_label");
        registry
            .add(
                DiagramElement::label(label, Id::new("Task_1"), Id::new("Task_1"), bounds(100.0, 190.0))
                    .with_parent(Id::new("Process_1")),
                None,
            )
            .unwrap();
        assert_eq!(registry.get(Id::new("Task_1")).unwrap().label_id(), Some(label));

        assert_eq!(
            registry.remove(Id::new("Task_1")).unwrap_err(),
            ModelError::ElementInUse {
                element: Id::new("Task_1"),
                dependent: label,
            }
        );

        registry.remove(label).unwrap();
        assert!(registry.remove(Id::new("Task_1")).is_ok());
        assert_eq!(
            registry.remove(Id::new("Task_1")).unwrap_err(),
            ModelError::UnknownElement(Id::new("Task_1"))
        );
    }

    #[test]
    fn test_ancestors_and_attachers() {
        let mut registry = registry_with_two_tasks();
        let boundary = Id::new("Event_1");
        registry
            .add(
                DiagramElement::shape(boundary, Id::new("bpmn:BoundaryEvent"), boundary, bounds(130.0, 160.0))
                    .with_parent(Id::new("Process_1"))
                    .with_host(Id::new("Task_1")),
                None,
            )
            .unwrap();

        assert_eq!(registry.get(Id::new("Task_1")).unwrap().attachers(), [boundary]);
        assert_eq!(registry.ancestors(boundary), vec![Id::new("Process_1")]);
        assert_eq!(
            registry
                .filter(|element| element.host().is_some())
                .len(),
            1
        );
    }
}

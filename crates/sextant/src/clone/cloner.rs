use std::collections::HashMap;

use log::{debug, trace};

use sextant_core::{
    ModelError,
    identifier::Id,
    schema::Schema,
    semantic::{ObjectArena, SemanticObject, Value},
};

use super::hooks::{CloneHooks, ElementContext, PropertyContext, PropertyDecision, ReferenceContext, ReferenceResolution};
use crate::{SextantError, document::IdScope};

/// Result of a clone session.
#[derive(Debug, Clone, Default)]
pub struct ClonedObjects {
    /// Every created object, owners before the objects they own.
    pub objects: Vec<SemanticObject>,
    /// Original id to copy id, for every copied object.
    pub mapping: HashMap<Id, Id>,
    /// Copies that must become root elements of the definitions.
    pub roots: Vec<Id>,
    /// Copies placed next to an anchor copy, as `(companion, anchor)`.
    pub companions: Vec<(Id, Id)>,
}

/// Copies semantic objects into a staging arena.
///
/// Originals are read from `source`, typically a clipboard snapshot; fresh
/// ids are allocated against the live document through an [`IdScope`] so
/// they never collide with existing objects, elements or other copies of the
/// same session. Nothing reaches the document until the caller inserts the
/// [`ClonedObjects`] returned by [`ModelCloner::finish`].
pub struct ModelCloner<'a> {
    schema: &'a Schema,
    hooks: &'a CloneHooks,
    source: &'a ObjectArena,
    scope: IdScope<'a>,
    staging: ObjectArena,
    mapping: HashMap<Id, Id>,
    shared: HashMap<Id, Id>,
    roots: Vec<Id>,
    companions: Vec<(Id, Id)>,
}

impl<'a> ModelCloner<'a> {
    pub fn new(schema: &'a Schema, hooks: &'a CloneHooks, source: &'a ObjectArena, scope: IdScope<'a>) -> Self {
        Self {
            schema,
            hooks,
            source,
            scope,
            staging: ObjectArena::new(),
            mapping: HashMap::new(),
            shared: HashMap::new(),
            roots: Vec::new(),
            companions: Vec::new(),
        }
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// The originals being copied.
    pub fn originals(&self) -> &'a ObjectArena {
        self.source
    }

    /// The live document objects.
    pub fn live(&self) -> &'a ObjectArena {
        self.scope.arena()
    }

    /// Copies created so far.
    pub fn staged(&self) -> &ObjectArena {
        &self.staging
    }

    /// Allocates an empty copy of `original` and records the mapping.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownObject`] if `original` is not among the
    /// originals.
    pub fn reserve(&mut self, original: Id) -> Result<Id, SextantError> {
        let type_name = self
            .source
            .get(original)
            .ok_or(ModelError::UnknownObject(original))?
            .type_name();
        let id = self.allocate(&type_name.local_name());
        self.create_object(id, type_name, None)?;
        self.record_mapping(original, id);
        Ok(id)
    }

    /// Allocates a fresh id not used by the document or this session.
    pub fn allocate(&mut self, prefix: &str) -> Id {
        let staging = &self.staging;
        self.scope.next_id(prefix, |id| staging.contains(id))
    }

    /// Creates an empty staged object.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateId`] if the id is already staged.
    pub fn create_object(&mut self, id: Id, type_name: Id, parent: Option<Id>) -> Result<(), SextantError> {
        let mut object = SemanticObject::new(id, type_name);
        object.set_parent(parent);
        self.staging.insert(object)?;
        Ok(())
    }

    /// Copies a whole original into a new object of the same type.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownObject`] if `original` is not among the
    /// originals, or an error raised by a reference resolver.
    pub fn copy_element(&mut self, original: Id) -> Result<Id, SextantError> {
        let id = self.reserve(original)?;
        self.clone_element(original, id, None)?;
        Ok(id)
    }

    /// Copies the properties of `source` into the staged object `target`.
    ///
    /// Only properties declared by the target type are copied, never the id.
    /// `allowed` narrows the candidates further. Owned children are copied
    /// recursively; references are handed to the resolvers and dropped when
    /// none resolves them.
    ///
    /// # Errors
    ///
    /// - [`ModelError::UnknownObject`] if `source` or `target` is unknown.
    /// - Any error raised by a reference resolver.
    pub fn clone_element(&mut self, source: Id, target: Id, allowed: Option<&[Id]>) -> Result<(), SextantError> {
        let originals = self.source;
        let source = originals.get(source).ok_or(ModelError::UnknownObject(source))?;
        let (target_type, target_owner_type) = {
            let staged = self.staging.get(target).ok_or(ModelError::UnknownObject(target))?;
            let owner_type = staged
                .parent()
                .and_then(|parent| self.staging.get(parent).or_else(|| self.live().get(parent)))
                .map(SemanticObject::type_name);
            (staged.type_name(), owner_type)
        };

        let hooks = self.hooks;
        let schema = self.schema;
        if !hooks.can_copy_properties(&ElementContext {
            schema,
            source,
            target_type,
        }) {
            debug!(source = source.id().to_string(); "Element properties not copied");
            return Ok(());
        }

        for descriptor in schema.properties(source.type_name()) {
            let name = descriptor.name();
            if descriptor.is_id() || allowed.is_some_and(|allowed| !allowed.contains(&name)) {
                continue;
            }
            let Some(value) = source.get(name) else {
                continue;
            };
            if schema.property(target_type, name).is_none() {
                trace!(property = name.to_string(), target_type = target_type.to_string(); "Property not declared on target");
                continue;
            }

            let decision = hooks.can_copy_property(&PropertyContext {
                schema,
                source,
                originals,
                target,
                target_type,
                target_owner_type,
                staged: &self.staging,
                property: name,
                value,
            });
            let value = match decision {
                Some(PropertyDecision::Veto) => {
                    trace!(property = name.to_string(); "Property copy vetoed");
                    continue;
                }
                Some(PropertyDecision::Replace(replacement)) => replacement,
                None => value.clone(),
            };

            let Some(copied) = self.copy_value(source, target, name, &value)? else {
                continue;
            };

            let can_set = hooks.can_set_copied_property(&PropertyContext {
                schema,
                source,
                originals,
                target,
                target_type,
                target_owner_type,
                staged: &self.staging,
                property: name,
                value: &copied,
            });
            if !can_set {
                trace!(property = name.to_string(); "Copied value discarded");
                self.discard(&copied);
                continue;
            }

            self.staging
                .get_mut(target)
                .ok_or(ModelError::UnknownObject(target))?
                .set(name, copied);
        }
        Ok(())
    }

    fn copy_value(
        &mut self,
        source: &SemanticObject,
        target: Id,
        property: Id,
        value: &Value,
    ) -> Result<Option<Value>, SextantError> {
        let copied = match value {
            Value::List(items) => {
                let mut copies = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(copy) = self.copy_value(source, target, property, item)? {
                        copies.push(copy);
                    }
                }
                (!copies.is_empty()).then_some(Value::List(copies))
            }
            Value::Object(child) => {
                let Some(original) = self.source.get(*child) else {
                    debug!(child = child.to_string(); "Owned object missing from originals");
                    return Ok(None);
                };
                let id = self.allocate(&original.type_name().local_name());
                self.create_object(id, original.type_name(), Some(target))?;
                self.record_mapping(*child, id);
                self.clone_element(*child, id, None)?;
                Some(Value::Object(id))
            }
            Value::Reference(reference) => {
                let context = ReferenceContext {
                    source,
                    target,
                    property,
                    reference: *reference,
                };
                let hooks = self.hooks;
                match hooks.resolve_reference(&context, self)? {
                    Some(ReferenceResolution::Resolve(id)) => Some(Value::Reference(id)),
                    Some(ReferenceResolution::Drop) | None => {
                        debug!(
                            property = property.to_string(),
                            reference = reference.to_string();
                            "Reference dropped from copy"
                        );
                        None
                    }
                }
            }
            primitive => Some(primitive.clone()),
        };
        Ok(copied)
    }

    /// Removes the staged objects owned through `value`.
    pub fn discard(&mut self, value: &Value) {
        for owned in value.owned_ids() {
            for id in self.staging.owned_subtree(owned) {
                self.staging.remove(id);
                self.mapping.retain(|_, copy| *copy != id);
            }
        }
    }

    /// Copy of `original` made in this session, if any.
    pub fn mapped(&self, original: Id) -> Option<Id> {
        self.mapping.get(&original).copied()
    }

    pub fn record_mapping(&mut self, original: Id, copy: Id) {
        self.mapping.insert(original, copy);
    }

    /// Shared substitute registered for `original`, if any.
    pub fn shared(&self, original: Id) -> Option<Id> {
        self.shared.get(&original).copied()
    }

    /// Registers the one substitute every reference to `original` resolves to.
    pub fn share(&mut self, original: Id, substitute: Id) {
        self.shared.insert(original, substitute);
    }

    /// Marks a copy as a new root element of the definitions.
    pub fn register_root(&mut self, copy: Id) {
        if !self.roots.contains(&copy) {
            self.roots.push(copy);
        }
    }

    /// Marks `companion` to be placed in the same container as `anchor`.
    pub fn register_companion(&mut self, companion: Id, anchor: Id) {
        self.companions.push((companion, anchor));
    }

    pub fn finish(self) -> ClonedObjects {
        ClonedObjects {
            objects: self.staging.iter().cloned().collect(),
            mapping: self.mapping,
            roots: self.roots,
            companions: self.companions,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use sextant_core::schema::bpmn_schema;

    use super::*;
    use crate::{
        clone::{DEFAULT_PRIORITY, HookFilter, register_bpmn_rules},
        document::Document,
    };

    fn originals() -> ObjectArena {
        let mut arena = ObjectArena::new();
        let mut task = SemanticObject::new(Id::new("Task_1"), Id::new("bpmn:UserTask"));
        task.set("name", Value::from("Review"));
        task.set("assignee", Value::from("alice"));
        task.set("asyncBefore", Value::from(true));
        task.set("outgoing", Value::List(vec![Value::Reference(Id::new("Flow_1"))]));
        task.set("documentation", Value::List(vec![Value::Object(Id::new("Doc_1"))]));
        arena.insert(task).unwrap();
        let mut documentation = SemanticObject::new(Id::new("Doc_1"), Id::new("bpmn:Documentation"));
        documentation.set_parent(Some(Id::new("Task_1")));
        documentation.set("text", Value::from("Check twice"));
        arena.insert(documentation).unwrap();
        arena
    }

    #[test]
    fn test_clone_into_other_type_is_schema_safe() {
        let schema = bpmn_schema();
        let mut hooks = CloneHooks::new();
        register_bpmn_rules(&mut hooks);
        let mut document = Document::process(Rc::new(bpmn_schema())).unwrap();
        let source = originals();

        let mut cloner = ModelCloner::new(&schema, &hooks, &source, document.id_scope());
        let target = cloner.allocate("ServiceTask");
        cloner
            .create_object(target, Id::new("bpmn:ServiceTask"), None)
            .unwrap();
        cloner.clone_element(Id::new("Task_1"), target, None).unwrap();
        let cloned = cloner.finish();

        let copy = cloned.objects.iter().find(|object| object.id() == target).unwrap();
        assert_eq!(copy.get_str("name"), Some("Review"));
        assert_eq!(copy.get_bool("asyncBefore"), Some(true));
        assert!(copy.get("assignee").is_none());
        assert!(copy.get("outgoing").is_none());

        let documentation = cloned.mapping[&Id::new("Doc_1")];
        assert_ne!(documentation, Id::new("Doc_1"));
        let documentation = cloned
            .objects
            .iter()
            .find(|object| object.id() == documentation)
            .unwrap();
        assert_eq!(documentation.parent(), Some(target));
        assert_eq!(documentation.get_str("text"), Some("Check twice"));
    }

    #[test]
    fn test_allow_list_and_unresolved_references() {
        let schema = bpmn_schema();
        let hooks = CloneHooks::new();
        let mut document = Document::process(Rc::new(bpmn_schema())).unwrap();
        let source = originals();

        let mut cloner = ModelCloner::new(&schema, &hooks, &source, document.id_scope());
        let target = cloner.reserve(Id::new("Task_1")).unwrap();
        let allowed = [Id::new("name"), Id::new("outgoing")];
        cloner
            .clone_element(Id::new("Task_1"), target, Some(&allowed))
            .unwrap();

        let copy = cloner.staged().get(target).unwrap();
        assert_eq!(copy.get_str("name"), Some("Review"));
        assert!(copy.get("outgoing").is_none());
        assert!(copy.get("documentation").is_none());
        assert_eq!(cloner.mapped(Id::new("Task_1")), Some(target));
    }

    #[test]
    fn test_set_veto_discards_staged_children() {
        let schema = bpmn_schema();
        let mut hooks = CloneHooks::new();
        hooks.on_can_set_copied_property(
            DEFAULT_PRIORITY,
            HookFilter::any().property("documentation"),
            |_| Some(false),
        );
        let mut document = Document::process(Rc::new(bpmn_schema())).unwrap();
        let source = originals();

        let mut cloner = ModelCloner::new(&schema, &hooks, &source, document.id_scope());
        let target = cloner.copy_element(Id::new("Task_1")).unwrap();
        let cloned = cloner.finish();

        assert_eq!(cloned.objects.len(), 1);
        assert_eq!(cloned.objects[0].id(), target);
        assert!(!cloned.mapping.contains_key(&Id::new("Doc_1")));
    }
}

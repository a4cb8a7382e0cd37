//! Arena storage for semantic (business) objects.
//!
//! Business objects form a containment tree rooted at `bpmn:Definitions`,
//! crossed by references such as `sourceRef` or `messageRef`. Rather than
//! holding pointers in both directions, every object lives in a flat
//! [`ObjectArena`] keyed by id. Containment is expressed as
//! [`Value::Object`] entries on the owner plus a `parent` id on the child;
//! references are [`Value::Reference`] entries resolved through the arena.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{ModelError, identifier::Id};

/// A property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(String),
    /// An owned child object.
    Object(Id),
    /// A reference to an object owned elsewhere.
    Reference(Id),
    List(Vec<Value>),
}

impl Value {
    /// Checks whether the value is a boolean, number or string.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Boolean(_) | Value::Integer(_) | Value::Real(_) | Value::String(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<Id> {
        match self {
            Value::Reference(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<Id> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Ids of owned objects held by this value, list items included.
    pub fn owned_ids(&self) -> Vec<Id> {
        match self {
            Value::Object(id) => vec![*id],
            Value::List(items) => items.iter().flat_map(Value::owned_ids).collect(),
            _ => Vec::new(),
        }
    }

    /// Ids referenced by this value, list items included.
    pub fn referenced_ids(&self) -> Vec<Id> {
        match self {
            Value::Reference(id) => vec![*id],
            Value::List(items) => items.iter().flat_map(Value::referenced_ids).collect(),
            _ => Vec::new(),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

/// A typed business object.
///
/// # Examples
///
/// ```
/// use sextant_core::{identifier::Id, semantic::{SemanticObject, Value}};
///
/// let mut task = SemanticObject::new(Id::new("Task_1"), Id::new("bpmn:Task"));
/// task.set("name", Value::from("Review"));
///
/// assert_eq!(task.get_str("name"), Some("Review"));
/// assert!(task.get("default").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticObject {
    id: Id,
    #[serde(rename = "type")]
    type_name: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<Id>,
    #[serde(default)]
    properties: IndexMap<Id, Value>,
}

impl SemanticObject {
    /// Creates an empty object with no parent.
    pub fn new(id: Id, type_name: Id) -> Self {
        Self {
            id,
            type_name,
            parent: None,
            properties: IndexMap::new(),
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn type_name(&self) -> Id {
        self.type_name
    }

    /// Owning object, if the object is contained.
    pub fn parent(&self) -> Option<Id> {
        self.parent
    }

    pub fn set_parent(&mut self, parent: Option<Id>) -> Option<Id> {
        std::mem::replace(&mut self.parent, parent)
    }

    /// All set properties, in the order they were first set.
    pub fn properties(&self) -> &IndexMap<Id, Value> {
        &self.properties
    }

    pub fn get(&self, name: impl Into<Id>) -> Option<&Value> {
        self.properties.get(&name.into())
    }

    pub fn get_str(&self, name: impl Into<Id>) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_bool(&self, name: impl Into<Id>) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn get_reference(&self, name: impl Into<Id>) -> Option<Id> {
        self.get(name).and_then(Value::as_reference)
    }

    pub fn get_object(&self, name: impl Into<Id>) -> Option<Id> {
        self.get(name).and_then(Value::as_object)
    }

    /// Items of a list property; empty when the property is unset.
    pub fn get_list(&self, name: impl Into<Id>) -> &[Value] {
        self.get(name).and_then(Value::as_list).unwrap_or_default()
    }

    /// Sets a property, returning the previous value.
    pub fn set(&mut self, name: impl Into<Id>, value: Value) -> Option<Value> {
        self.properties.insert(name.into(), value)
    }

    /// Removes a property, returning the previous value.
    pub fn unset(&mut self, name: impl Into<Id>) -> Option<Value> {
        self.properties.shift_remove(&name.into())
    }

    /// Ids of all directly owned children, in property order.
    pub fn owned_children(&self) -> Vec<Id> {
        self.properties.values().flat_map(Value::owned_ids).collect()
    }

    /// Name of the property that owns `child`, if any.
    pub fn owning_property(&self, child: Id) -> Option<Id> {
        self.properties
            .iter()
            .find(|(_, value)| value.owned_ids().contains(&child))
            .map(|(name, _)| *name)
    }
}

/// Flat, insertion-ordered storage for semantic objects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectArena {
    objects: IndexMap<Id, SemanticObject>,
}

impl ObjectArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an object.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateId`] if an object with the same id exists.
    pub fn insert(&mut self, object: SemanticObject) -> Result<(), ModelError> {
        if self.objects.contains_key(&object.id) {
            return Err(ModelError::DuplicateId(object.id));
        }
        self.objects.insert(object.id, object);
        Ok(())
    }

    /// Removes an object, keeping the order of the others.
    pub fn remove(&mut self, id: Id) -> Option<SemanticObject> {
        self.objects.shift_remove(&id)
    }

    pub fn get(&self, id: Id) -> Option<&SemanticObject> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: Id) -> Option<&mut SemanticObject> {
        self.objects.get_mut(&id)
    }

    pub fn contains(&self, id: Id) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SemanticObject> {
        self.objects.values()
    }

    /// `id` followed by every object it transitively owns, depth first.
    ///
    /// Owned ids missing from the arena are skipped.
    pub fn owned_subtree(&self, id: Id) -> Vec<Id> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(object) = self.objects.get(&current) else {
                continue;
            };
            result.push(current);
            let children = object.owned_children();
            stack.extend(children.into_iter().rev());
        }
        result
    }
}

/// The semantic side of a document: the arena plus its `bpmn:Definitions` root.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    arena: ObjectArena,
    definitions: Id,
}

impl Model {
    /// Creates a model holding a single, empty definitions object.
    pub fn new(definitions: Id) -> Self {
        let mut arena = ObjectArena::new();
        arena.objects.insert(
            definitions,
            SemanticObject::new(definitions, Id::new("bpmn:Definitions")),
        );
        Self { arena, definitions }
    }

    /// Wraps an existing arena.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownObject`] if `definitions` is not in the arena.
    pub fn from_arena(arena: ObjectArena, definitions: Id) -> Result<Self, ModelError> {
        if !arena.contains(definitions) {
            return Err(ModelError::UnknownObject(definitions));
        }
        Ok(Self { arena, definitions })
    }

    pub fn arena(&self) -> &ObjectArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut ObjectArena {
        &mut self.arena
    }

    pub fn definitions(&self) -> Id {
        self.definitions
    }

    /// Ids of the document-global root elements.
    pub fn root_elements(&self) -> Vec<Id> {
        self.arena
            .get(self.definitions)
            .map(|definitions| {
                definitions
                    .get_list("rootElements")
                    .iter()
                    .filter_map(Value::as_object)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(id: &str, type_name: &str) -> SemanticObject {
        SemanticObject::new(Id::new(id), Id::new(type_name))
    }

    #[test]
    fn test_set_get_unset() {
        let mut gateway = object("Gateway_1", "bpmn:ExclusiveGateway");
        assert_eq!(gateway.set("default", Value::Reference(Id::new("Flow_1"))), None);
        assert_eq!(gateway.get_reference("default"), Some(Id::new("Flow_1")));

        let previous = gateway.unset("default");
        assert_eq!(previous, Some(Value::Reference(Id::new("Flow_1"))));
        assert!(gateway.get("default").is_none());
        assert!(gateway.get_list("outgoing").is_empty());
    }

    #[test]
    fn test_owned_children_and_owning_property() {
        let mut event = object("Event_1", "bpmn:StartEvent");
        event.set(
            "eventDefinitions",
            Value::List(vec![Value::Object(Id::new("MessageEventDefinition_1"))]),
        );
        event.set("outgoing", Value::List(vec![Value::Reference(Id::new("Flow_1"))]));

        assert_eq!(event.owned_children(), vec![Id::new("MessageEventDefinition_1")]);
        assert_eq!(
            event.owning_property(Id::new("MessageEventDefinition_1")),
            Some(Id::new("eventDefinitions"))
        );
        assert_eq!(event.owning_property(Id::new("Flow_1")), None);
    }

    #[test]
    fn test_arena_rejects_duplicate_ids() {
        let mut arena = ObjectArena::new();
        arena.insert(object("Task_1", "bpmn:Task")).unwrap();

        assert_eq!(
            arena.insert(object("Task_1", "bpmn:UserTask")),
            Err(ModelError::DuplicateId(Id::new("Task_1")))
        );
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_owned_subtree_is_depth_first() {
        let mut arena = ObjectArena::new();
        let mut task = object("Task_1", "bpmn:UserTask");
        task.set("extensionElements", Value::Object(Id::new("Ext_1")));
        task.set(
            "documentation",
            Value::List(vec![Value::Object(Id::new("Doc_1"))]),
        );
        let mut extensions = object("Ext_1", "bpmn:ExtensionElements");
        extensions.set(
            "values",
            Value::List(vec![Value::Object(Id::new("Listener_1"))]),
        );
        arena.insert(task).unwrap();
        arena.insert(extensions).unwrap();
        arena.insert(object("Listener_1", "ext:TaskListener")).unwrap();
        arena.insert(object("Doc_1", "bpmn:Documentation")).unwrap();

        let subtree: Vec<String> = arena
            .owned_subtree(Id::new("Task_1"))
            .into_iter()
            .map(Id::as_string)
            .collect();
        assert_eq!(subtree, ["Task_1", "Ext_1", "Listener_1", "Doc_1"]);
    }

    #[test]
    fn test_model_root_elements() {
        let mut model = Model::new(Id::new("Definitions_1"));
        model
            .arena_mut()
            .insert(object("Message_1", "bpmn:Message"))
            .unwrap();
        model
            .arena_mut()
            .get_mut(Id::new("Definitions_1"))
            .unwrap()
            .set(
                "rootElements",
                Value::List(vec![Value::Object(Id::new("Message_1"))]),
            );

        assert_eq!(model.root_elements(), vec![Id::new("Message_1")]);
    }

    #[test]
    fn test_value_serde_shape() {
        let value = Value::List(vec![Value::Reference(Id::new("Flow_1")), Value::from(true)]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"list","value":[{"kind":"reference","value":"Flow_1"},{"kind":"boolean","value":true}]}"#
        );
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}

//! Documents and the reversible operations that mutate them.
//!
//! A [`Document`] pairs the semantic model with its diagram. It is only ever
//! changed through [`Document::apply`], which performs one [`Operation`] and
//! returns the operation that exactly reverses it. The command stack records
//! these pairs, which is all undo and redo need.

mod snapshot;

use std::rc::Rc;

use log::trace;

use sextant_core::{
    ModelError,
    diagram::{DiagramElement, ElementRegistry},
    geometry::Bounds,
    identifier::{Id, IdGenerator},
    schema::Schema,
    semantic::{Model, ObjectArena, SemanticObject, Value},
};

use crate::SextantError;

pub use snapshot::DocumentSnapshot;

/// One atomic, reversible change to a [`Document`].
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Adds a semantic object to the arena.
    InsertObject(SemanticObject),
    /// Removes a semantic object from the arena.
    RemoveObject(Id),
    /// Sets (`Some`) or clears (`None`) a property of a semantic object.
    SetProperty {
        object: Id,
        property: Id,
        value: Option<Value>,
    },
    /// Changes the owner recorded on a semantic object.
    SetParent { object: Id, parent: Option<Id> },
    /// Registers a diagram element at `index` among its parent's children.
    AddElement {
        element: DiagramElement,
        index: Option<usize>,
    },
    /// Unregisters a diagram element.
    RemoveElement(Id),
    /// Replaces the bounds of a shape or label.
    SetBounds { element: Id, bounds: Option<Bounds> },
}

/// A BPMN document: semantic model, diagram and id allocation.
#[derive(Debug, Clone)]
pub struct Document {
    schema: Rc<Schema>,
    model: Model,
    registry: ElementRegistry,
    ids: IdGenerator,
    root: Id,
}

impl Document {
    /// Creates an empty document whose canvas is a `bpmn:Process`.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema does not declare the BPMN root types.
    pub fn process(schema: Rc<Schema>) -> Result<Self, SextantError> {
        Self::with_root(schema, Id::new("bpmn:Process"))
    }

    /// Creates an empty document whose canvas is a `bpmn:Collaboration`.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema does not declare the BPMN root types.
    pub fn collaboration(schema: Rc<Schema>) -> Result<Self, SextantError> {
        Self::with_root(schema, Id::new("bpmn:Collaboration"))
    }

    fn with_root(schema: Rc<Schema>, root_type: Id) -> Result<Self, SextantError> {
        for required in [Id::new("bpmn:Definitions"), root_type] {
            if !schema.contains(required) {
                return Err(ModelError::UnknownType(required).into());
            }
        }

        let mut ids = IdGenerator::new();
        let definitions = ids.next_id("Definitions", |_| false);
        let root = ids.next_id(&root_type.local_name(), |_| false);

        let mut model = Model::new(definitions);
        let mut root_object = SemanticObject::new(root, root_type);
        root_object.set_parent(Some(definitions));
        if root_type == "bpmn:Process" {
            root_object.set("isExecutable", Value::Boolean(false));
        }
        model.arena_mut().insert(root_object)?;
        model
            .arena_mut()
            .get_mut(definitions)
            .ok_or(ModelError::UnknownObject(definitions))?
            .set("rootElements", Value::List(vec![Value::Object(root)]));

        let mut registry = ElementRegistry::new();
        registry.add(DiagramElement::root(root, root_type, root), None)?;

        Ok(Self {
            schema,
            model,
            registry,
            ids,
            root,
        })
    }

    /// Assembles a document from existing parts.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownElement`] if `root` is not a registered
    /// root element.
    pub fn from_parts(
        schema: Rc<Schema>,
        model: Model,
        registry: ElementRegistry,
        root: Id,
    ) -> Result<Self, SextantError> {
        if !registry.get(root).is_some_and(DiagramElement::is_root) {
            return Err(ModelError::UnknownElement(root).into());
        }
        Ok(Self {
            schema,
            model,
            registry,
            ids: IdGenerator::new(),
            root,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Shared handle to the schema, for callers that must keep it while
    /// mutating the document.
    pub fn shared_schema(&self) -> Rc<Schema> {
        Rc::clone(&self.schema)
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    /// Id of the canvas root element.
    pub fn root(&self) -> Id {
        self.root
    }

    /// Id of the `bpmn:Definitions` object.
    pub fn definitions(&self) -> Id {
        self.model.definitions()
    }

    pub fn object(&self, id: Id) -> Option<&SemanticObject> {
        self.model.arena().get(id)
    }

    pub fn element(&self, id: Id) -> Option<&DiagramElement> {
        self.registry.get(id)
    }

    /// Business object of a diagram element.
    pub fn business_object(&self, element: Id) -> Option<&SemanticObject> {
        self.element(element)
            .and_then(|element| self.object(element.business_object()))
    }

    /// Checks whether `type_name` is `supertype` or inherits from it.
    pub fn is_a(&self, type_name: Id, supertype: &str) -> bool {
        self.schema.is_a(type_name, supertype)
    }

    /// Checks whether an id is used by a semantic object or a diagram element.
    pub fn is_id_taken(&self, id: Id) -> bool {
        self.model.arena().contains(id) || self.registry.contains(id)
    }

    /// Allocates a fresh `{prefix}_{n}` id unused in this document.
    pub fn generate_id(&mut self, prefix: &str) -> Id {
        self.id_scope().next_id(prefix, |_| false)
    }

    /// Splits the document into read access plus id allocation.
    pub fn id_scope(&mut self) -> IdScope<'_> {
        IdScope {
            arena: self.model.arena(),
            registry: &self.registry,
            ids: &mut self.ids,
        }
    }

    /// Applies an operation and returns its inverse.
    ///
    /// # Errors
    ///
    /// - [`ModelError`] variants for unknown ids, duplicate ids, unknown
    ///   types and diagram elements that are still in use.
    /// - [`SextantError::InvalidProperty`] when setting a property the
    ///   object's type does not declare.
    ///
    /// A failed operation leaves the document unchanged.
    pub fn apply(&mut self, operation: Operation) -> Result<Operation, SextantError> {
        trace!(operation:?; "Applying operation");
        let inverse = match operation {
            Operation::InsertObject(object) => {
                if !self.schema.contains(object.type_name()) {
                    return Err(ModelError::UnknownType(object.type_name()).into());
                }
                let id = object.id();
                self.model.arena_mut().insert(object)?;
                Operation::RemoveObject(id)
            }
            Operation::RemoveObject(id) => {
                let object = self
                    .model
                    .arena_mut()
                    .remove(id)
                    .ok_or(ModelError::UnknownObject(id))?;
                Operation::InsertObject(object)
            }
            Operation::SetProperty {
                object,
                property,
                value,
            } => {
                let target = self
                    .model
                    .arena()
                    .get(object)
                    .ok_or(ModelError::UnknownObject(object))?;
                if value.is_some() && self.schema.property(target.type_name(), property).is_none() {
                    return Err(SextantError::InvalidProperty {
                        object,
                        property,
                        reason: format!("not declared on {}", target.type_name()),
                    });
                }
                let target = self
                    .model
                    .arena_mut()
                    .get_mut(object)
                    .ok_or(ModelError::UnknownObject(object))?;
                let previous = match value {
                    Some(value) => target.set(property, value),
                    None => target.unset(property),
                };
                Operation::SetProperty {
                    object,
                    property,
                    value: previous,
                }
            }
            Operation::SetParent { object, parent } => {
                let target = self
                    .model
                    .arena_mut()
                    .get_mut(object)
                    .ok_or(ModelError::UnknownObject(object))?;
                let previous = target.set_parent(parent);
                Operation::SetParent {
                    object,
                    parent: previous,
                }
            }
            Operation::AddElement { element, index } => {
                let id = element.id();
                self.registry.add(element, index)?;
                Operation::RemoveElement(id)
            }
            Operation::RemoveElement(id) => {
                let (element, index) = self.registry.remove(id)?;
                Operation::AddElement { element, index }
            }
            Operation::SetBounds { element, bounds } => {
                let previous = self.registry.set_bounds(element, bounds)?;
                Operation::SetBounds {
                    element,
                    bounds: previous,
                }
            }
        };
        Ok(inverse)
    }
}

/// Read access to a document's ids plus its id generator.
///
/// Lets the clone engine allocate fresh ids while it reads the live arena,
/// without holding the whole document mutably.
pub struct IdScope<'a> {
    arena: &'a ObjectArena,
    registry: &'a ElementRegistry,
    ids: &'a mut IdGenerator,
}

impl<'a> IdScope<'a> {
    /// The document's live semantic objects.
    pub fn arena(&self) -> &'a ObjectArena {
        self.arena
    }

    /// Allocates an id unused by the document and not rejected by `reserved`.
    pub fn next_id(&mut self, prefix: &str, reserved: impl Fn(Id) -> bool) -> Id {
        let arena = self.arena;
        let registry = self.registry;
        self.ids.next_id(prefix, |id| {
            arena.contains(id) || registry.contains(id) || reserved(id)
        })
    }
}

//! Declared schema registry for semantic objects.
//!
//! The clone engine never inspects objects at runtime to find out what they
//! can hold. Instead each type is described up front by a [`TypeDescriptor`]:
//! its supertypes and an ordered list of [`PropertyDescriptor`]s saying
//! whether a property holds a primitive, an owned child object or a reference
//! to an object owned elsewhere.
//!
//! [`Schema::properties`] flattens a type's inheritance chain into the fixed
//! order the clone engine walks: inherited properties first, own properties
//! after, and extension properties last.
//!
//! The built-in BPMN 2.0 subset lives in [`bpmn`].

pub mod bpmn;

use indexmap::IndexMap;

use crate::{ModelError, identifier::Id};

pub use bpmn::bpmn_schema;

/// Primitive value types a property can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Boolean,
    Integer,
    Real,
    String,
}

/// What a property holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// A plain value.
    Primitive(PrimitiveType),
    /// A child object of the given type, owned by the holder.
    Owned(Id),
    /// A reference, by id, to an object of the given type owned elsewhere.
    Reference(Id),
}

/// Description of one named property of a type.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    name: Id,
    kind: PropertyKind,
    is_many: bool,
    is_id: bool,
    is_extension: bool,
}

impl PropertyDescriptor {
    /// A single-valued primitive property.
    pub fn primitive(name: &str, primitive: PrimitiveType) -> Self {
        Self::with_kind(name, PropertyKind::Primitive(primitive))
    }

    /// A property holding an owned child of `type_name`.
    pub fn owned(name: &str, type_name: &str) -> Self {
        Self::with_kind(name, PropertyKind::Owned(Id::new(type_name)))
    }

    /// A property referring to an object of `type_name`.
    pub fn reference(name: &str, type_name: &str) -> Self {
        Self::with_kind(name, PropertyKind::Reference(Id::new(type_name)))
    }

    fn with_kind(name: &str, kind: PropertyKind) -> Self {
        Self {
            name: Id::new(name),
            kind,
            is_many: false,
            is_id: false,
            is_extension: false,
        }
    }

    /// Marks the property as an ordered list.
    pub fn many(mut self) -> Self {
        self.is_many = true;
        self
    }

    /// Marks the property as the identity property.
    pub fn identity(mut self) -> Self {
        self.is_id = true;
        self
    }

    /// Marks the property as a holder of arbitrary extension content.
    pub fn extension(mut self) -> Self {
        self.is_extension = true;
        self
    }

    pub fn name(&self) -> Id {
        self.name
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn is_many(&self) -> bool {
        self.is_many
    }

    pub fn is_id(&self) -> bool {
        self.is_id
    }

    pub fn is_extension(&self) -> bool {
        self.is_extension
    }

    /// Checks whether the property holds primitive values.
    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, PropertyKind::Primitive(_))
    }

    /// Checks whether the property holds references.
    pub fn is_reference(&self) -> bool {
        matches!(self.kind, PropertyKind::Reference(_))
    }
}

/// Description of a schema type.
///
/// # Examples
///
/// ```
/// use sextant_core::schema::{PrimitiveType, PropertyDescriptor, TypeDescriptor};
///
/// let listener = TypeDescriptor::new("ext:TaskListener")
///     .extends("ext:Element")
///     .property(PropertyDescriptor::primitive("event", PrimitiveType::String))
///     .allowed_in("bpmn:UserTask");
///
/// assert_eq!(listener.name(), "ext:TaskListener");
/// assert_eq!(listener.allowed_owners().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    name: Id,
    supertypes: Vec<Id>,
    properties: Vec<PropertyDescriptor>,
    allowed_in: Vec<Id>,
}

impl TypeDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: Id::new(name),
            supertypes: Vec::new(),
            properties: Vec::new(),
            allowed_in: Vec::new(),
        }
    }

    /// Adds a direct supertype.
    pub fn extends(mut self, supertype: &str) -> Self {
        self.supertypes.push(Id::new(supertype));
        self
    }

    /// Adds an own property.
    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    /// Restricts where instances of this type may live as extension values.
    pub fn allowed_in(mut self, owner_type: &str) -> Self {
        self.allowed_in.push(Id::new(owner_type));
        self
    }

    pub fn name(&self) -> Id {
        self.name
    }

    pub fn supertypes(&self) -> &[Id] {
        &self.supertypes
    }

    /// Own (not inherited) properties in declaration order.
    pub fn own_properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Owner types this type is restricted to; empty means anywhere.
    pub fn allowed_owners(&self) -> &[Id] {
        &self.allowed_in
    }
}

/// Registry of every known type, keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    types: IndexMap<Id, TypeDescriptor>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateType`] if the name is already taken and
    /// [`ModelError::UnknownSupertype`] if a supertype has not been
    /// registered yet. Registering supertypes first keeps the inheritance
    /// graph acyclic.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> Result<(), ModelError> {
        if self.types.contains_key(&descriptor.name) {
            return Err(ModelError::DuplicateType(descriptor.name));
        }
        if let Some(missing) = descriptor
            .supertypes
            .iter()
            .find(|supertype| !self.types.contains_key(*supertype))
        {
            return Err(ModelError::UnknownSupertype {
                type_name: descriptor.name,
                supertype: *missing,
            });
        }
        self.types.insert(descriptor.name, descriptor);
        Ok(())
    }

    pub fn get(&self, type_name: Id) -> Option<&TypeDescriptor> {
        self.types.get(&type_name)
    }

    pub fn contains(&self, type_name: Id) -> bool {
        self.types.contains_key(&type_name)
    }

    /// Iterates over all registered types in registration order.
    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    /// Checks whether `type_name` is `supertype` or inherits from it.
    pub fn is_a(&self, type_name: Id, supertype: impl Into<Id>) -> bool {
        let supertype = supertype.into();
        self.is_a_id(type_name, supertype)
    }

    fn is_a_id(&self, type_name: Id, supertype: Id) -> bool {
        if type_name == supertype {
            return true;
        }
        self.types.get(&type_name).is_some_and(|descriptor| {
            descriptor
                .supertypes
                .iter()
                .any(|parent| self.is_a_id(*parent, supertype))
        })
    }

    /// Checks whether `type_name` is any of `supertypes`.
    pub fn is_any(&self, type_name: Id, supertypes: &[&str]) -> bool {
        supertypes
            .iter()
            .any(|supertype| self.is_a(type_name, *supertype))
    }

    /// All properties of a type, inherited ones included.
    ///
    /// Inherited properties come first, in supertype declaration order, then
    /// own properties. A name declared twice keeps its first position.
    /// Extension properties are moved to the end so that they are always
    /// processed last. Unknown types have no properties.
    pub fn properties(&self, type_name: Id) -> Vec<&PropertyDescriptor> {
        let mut collected: IndexMap<Id, &PropertyDescriptor> = IndexMap::new();
        self.collect_properties(type_name, &mut collected);

        let (mut regular, extension): (Vec<_>, Vec<_>) = collected
            .into_values()
            .partition(|property| !property.is_extension);
        regular.extend(extension);
        regular
    }

    fn collect_properties<'a>(
        &'a self,
        type_name: Id,
        collected: &mut IndexMap<Id, &'a PropertyDescriptor>,
    ) {
        let Some(descriptor) = self.types.get(&type_name) else {
            return;
        };
        for supertype in &descriptor.supertypes {
            self.collect_properties(*supertype, collected);
        }
        for property in &descriptor.properties {
            collected.entry(property.name).or_insert(property);
        }
    }

    /// Looks up one property of a type, inherited ones included.
    pub fn property(&self, type_name: Id, name: impl Into<Id>) -> Option<&PropertyDescriptor> {
        let name = name.into();
        let descriptor = self.types.get(&type_name)?;
        descriptor
            .properties
            .iter()
            .find(|property| property.name == name)
            .or_else(|| {
                descriptor
                    .supertypes
                    .iter()
                    .find_map(|supertype| self.property(*supertype, name))
            })
    }

    /// Checks whether an instance of `value_type` may live under an owner of
    /// `owner_type`, honouring the value type's `allowed_in` restriction.
    pub fn is_allowed_in(&self, value_type: Id, owner_type: Id) -> bool {
        match self.types.get(&value_type) {
            Some(descriptor) if !descriptor.allowed_in.is_empty() => descriptor
                .allowed_in
                .iter()
                .any(|allowed| self.is_a_id(owner_type, *allowed)),
            _ => true,
        }
    }
}

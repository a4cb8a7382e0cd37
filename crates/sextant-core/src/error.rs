//! Error type for model-level operations.

use thiserror::Error;

use crate::identifier::Id;

/// Errors raised by the schema, the semantic arena and the element registry.
///
/// These are integration errors: they indicate a caller asked for something
/// the model cannot represent, not a user-level validation failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Duplicate id: {0}")]
    DuplicateId(Id),

    #[error("Unknown semantic object: {0}")]
    UnknownObject(Id),

    #[error("Unknown diagram element: {0}")]
    UnknownElement(Id),

    #[error("Unknown type: {0}")]
    UnknownType(Id),

    #[error("Type {type_name} extends unknown type {supertype}")]
    UnknownSupertype { type_name: Id, supertype: Id },

    #[error("Type {0} is already registered")]
    DuplicateType(Id),

    #[error("Diagram element {element} is still in use by {dependent}")]
    ElementInUse { element: Id, dependent: Id },

    #[error("Diagram element {element} refers to missing element {relation}")]
    MissingRelation { element: Id, relation: Id },
}

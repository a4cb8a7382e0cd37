//! Schema-driven cloning of semantic objects.
//!
//! [`ModelCloner`] copies the properties of a source object into a fresh
//! target object, possibly of another type, following the declared
//! [`Schema`](sextant_core::schema::Schema) instead of inspecting objects at
//! runtime. Every decision it takes can be intercepted through the
//! [`CloneHooks`] lists: whether an element is copied at all, whether a
//! property is copied (or replaced), whether a copied value is assigned, and
//! how a reference to an object outside the cloned subtree is resolved.
//!
//! The built-in BPMN clone rules are installed by [`register_bpmn_rules`].

mod bpmn;
mod cloner;
mod hooks;

pub(crate) use bpmn::is_structural;
pub use bpmn::{STRUCTURAL_PROPERTIES, register_bpmn_rules};
pub use cloner::{ClonedObjects, ModelCloner};
pub use hooks::{
    CloneHooks, DEFAULT_PRIORITY, ElementContext, HookFilter, LOW_PRIORITY, PropertyContext,
    PropertyDecision, ReferenceContext, ReferenceResolution,
};

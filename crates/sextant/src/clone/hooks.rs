use std::rc::Rc;

use sextant_core::{
    identifier::Id,
    schema::Schema,
    semantic::{ObjectArena, SemanticObject, Value},
};

use super::ModelCloner;
use crate::SextantError;

/// Priority of regular hooks.
pub const DEFAULT_PRIORITY: i32 = 1000;

/// Priority of fallback hooks that only run when no regular hook decided.
pub const LOW_PRIORITY: i32 = 750;

/// Decision of a copy-property hook.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyDecision {
    /// Do not copy the property.
    Veto,
    /// Copy this value instead of the source value.
    Replace(Value),
}

/// Decision of a reference resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceResolution {
    /// Point the copy at this object.
    Resolve(Id),
    /// Leave the reference out of the copy.
    Drop,
}

/// Restricts a hook to a source type (matched with `is_a`) and/or a
/// property name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookFilter {
    source_type: Option<Id>,
    property: Option<Id>,
}

impl HookFilter {
    /// Matches everything.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn source_type(mut self, type_name: &str) -> Self {
        self.source_type = Some(Id::new(type_name));
        self
    }

    pub fn property(mut self, name: &str) -> Self {
        self.property = Some(Id::new(name));
        self
    }

    fn matches(&self, schema: &Schema, source_type: Id, property: Option<Id>) -> bool {
        let type_matches = self
            .source_type
            .is_none_or(|filter| schema.is_a(source_type, filter));
        let property_matches = match (self.property, property) {
            (None, _) => true,
            (Some(filter), Some(property)) => filter == property,
            (Some(_), None) => false,
        };
        type_matches && property_matches
    }
}

/// Context of the element-level hook.
pub struct ElementContext<'a> {
    pub schema: &'a Schema,
    pub source: &'a SemanticObject,
    pub target_type: Id,
}

/// Context of the property-level hooks.
pub struct PropertyContext<'a> {
    pub schema: &'a Schema,
    /// The object being copied.
    pub source: &'a SemanticObject,
    /// Objects the source can refer to.
    pub originals: &'a ObjectArena,
    /// The copy under construction.
    pub target: Id,
    pub target_type: Id,
    /// Type of the object owning the copy, if it is owned.
    pub target_owner_type: Option<Id>,
    /// Copies created so far in this clone session.
    pub staged: &'a ObjectArena,
    pub property: Id,
    /// The source value, or the copied value for the can-set hooks.
    pub value: &'a Value,
}

/// Context of a reference resolver.
pub struct ReferenceContext<'a> {
    pub source: &'a SemanticObject,
    /// The copy under construction.
    pub target: Id,
    pub property: Id,
    /// The referenced original object.
    pub reference: Id,
}

type ElementHook = dyn Fn(&ElementContext<'_>) -> Option<bool>;
type CopyPropertyHook = dyn Fn(&PropertyContext<'_>) -> Option<PropertyDecision>;
type SetPropertyHook = dyn Fn(&PropertyContext<'_>) -> Option<bool>;
type ReferenceHook =
    dyn Fn(&ReferenceContext<'_>, &mut ModelCloner<'_>) -> Result<Option<ReferenceResolution>, SextantError>;

struct Hook<F: ?Sized> {
    priority: i32,
    filter: HookFilter,
    callback: Rc<F>,
}

impl<F: ?Sized> Clone for Hook<F> {
    fn clone(&self) -> Self {
        Self {
            priority: self.priority,
            filter: self.filter,
            callback: Rc::clone(&self.callback),
        }
    }
}

/// Inserts `hook` after every hook of the same or higher priority.
fn insert_sorted<F: ?Sized>(hooks: &mut Vec<Hook<F>>, hook: Hook<F>) {
    let position = hooks
        .iter()
        .position(|existing| existing.priority < hook.priority)
        .unwrap_or(hooks.len());
    hooks.insert(position, hook);
}

/// Ordered interception points of the clone engine.
///
/// Hooks run from the highest priority down; the first hook returning
/// `Some` decides. When no hook decides, the clone engine copies.
#[derive(Clone, Default)]
pub struct CloneHooks {
    can_copy_properties: Vec<Hook<ElementHook>>,
    can_copy_property: Vec<Hook<CopyPropertyHook>>,
    can_set_copied_property: Vec<Hook<SetPropertyHook>>,
    resolve_reference: Vec<Hook<ReferenceHook>>,
}

impl CloneHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides whether an element's properties are copied at all.
    pub fn on_can_copy_properties<F>(&mut self, priority: i32, filter: HookFilter, callback: F)
    where
        F: Fn(&ElementContext<'_>) -> Option<bool> + 'static,
    {
        let callback: Rc<ElementHook> = Rc::new(callback);
        insert_sorted(
            &mut self.can_copy_properties,
            Hook {
                priority,
                filter,
                callback,
            },
        );
    }

    /// Vetoes or replaces a property before it is copied.
    pub fn on_can_copy_property<F>(&mut self, priority: i32, filter: HookFilter, callback: F)
    where
        F: Fn(&PropertyContext<'_>) -> Option<PropertyDecision> + 'static,
    {
        let callback: Rc<CopyPropertyHook> = Rc::new(callback);
        insert_sorted(
            &mut self.can_copy_property,
            Hook {
                priority,
                filter,
                callback,
            },
        );
    }

    /// Vetoes the assignment of a copied value.
    pub fn on_can_set_copied_property<F>(&mut self, priority: i32, filter: HookFilter, callback: F)
    where
        F: Fn(&PropertyContext<'_>) -> Option<bool> + 'static,
    {
        let callback: Rc<SetPropertyHook> = Rc::new(callback);
        insert_sorted(
            &mut self.can_set_copied_property,
            Hook {
                priority,
                filter,
                callback,
            },
        );
    }

    /// Resolves a reference to an object outside the cloned subtree.
    pub fn on_resolve_reference<F>(&mut self, priority: i32, filter: HookFilter, callback: F)
    where
        F: Fn(&ReferenceContext<'_>, &mut ModelCloner<'_>) -> Result<Option<ReferenceResolution>, SextantError>
            + 'static,
    {
        let callback: Rc<ReferenceHook> = Rc::new(callback);
        insert_sorted(
            &mut self.resolve_reference,
            Hook {
                priority,
                filter,
                callback,
            },
        );
    }

    pub(crate) fn can_copy_properties(&self, context: &ElementContext<'_>) -> bool {
        self.can_copy_properties
            .iter()
            .filter(|hook| hook.filter.matches(context.schema, context.source.type_name(), None))
            .find_map(|hook| (hook.callback)(context))
            .unwrap_or(true)
    }

    pub(crate) fn can_copy_property(&self, context: &PropertyContext<'_>) -> Option<PropertyDecision> {
        self.can_copy_property
            .iter()
            .filter(|hook| {
                hook.filter
                    .matches(context.schema, context.source.type_name(), Some(context.property))
            })
            .find_map(|hook| (hook.callback)(context))
    }

    pub(crate) fn can_set_copied_property(&self, context: &PropertyContext<'_>) -> bool {
        self.can_set_copied_property
            .iter()
            .filter(|hook| {
                hook.filter
                    .matches(context.schema, context.source.type_name(), Some(context.property))
            })
            .find_map(|hook| (hook.callback)(context))
            .unwrap_or(true)
    }

    pub(crate) fn resolve_reference(
        &self,
        context: &ReferenceContext<'_>,
        cloner: &mut ModelCloner<'_>,
    ) -> Result<Option<ReferenceResolution>, SextantError> {
        for hook in &self.resolve_reference {
            if !hook
                .filter
                .matches(cloner.schema(), context.source.type_name(), Some(context.property))
            {
                continue;
            }
            if let Some(resolution) = (hook.callback)(context, cloner)? {
                return Ok(Some(resolution));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use sextant_core::schema::bpmn_schema;

    use super::*;

    fn context<'a>(
        schema: &'a Schema,
        source: &'a SemanticObject,
        arena: &'a ObjectArena,
        property: &str,
        value: &'a Value,
    ) -> PropertyContext<'a> {
        PropertyContext {
            schema,
            source,
            originals: arena,
            target: Id::new("Task_2"),
            target_type: source.type_name(),
            target_owner_type: None,
            staged: arena,
            property: Id::new(property),
            value,
        }
    }

    #[test]
    fn test_first_definitive_hook_wins() {
        let schema = bpmn_schema();
        let arena = ObjectArena::new();
        let task = SemanticObject::new(Id::new("Task_1"), Id::new("bpmn:UserTask"));
        let value = Value::from("Review");
        let mut hooks = CloneHooks::new();

        hooks.on_can_copy_property(LOW_PRIORITY, HookFilter::any(), |_| Some(PropertyDecision::Veto));
        hooks.on_can_copy_property(DEFAULT_PRIORITY, HookFilter::any().property("name"), |_| {
            Some(PropertyDecision::Replace(Value::from("Copy")))
        });
        hooks.on_can_copy_property(2000, HookFilter::any(), |_| None);

        let name = context(&schema, &task, &arena, "name", &value);
        assert_eq!(
            hooks.can_copy_property(&name),
            Some(PropertyDecision::Replace(Value::from("Copy")))
        );

        let assignee = context(&schema, &task, &arena, "assignee", &value);
        assert_eq!(hooks.can_copy_property(&assignee), Some(PropertyDecision::Veto));
    }

    #[test]
    fn test_filter_matches_supertypes() {
        let schema = bpmn_schema();
        let filter = HookFilter::any().source_type("bpmn:Activity").property("default");

        assert!(filter.matches(&schema, Id::new("bpmn:UserTask"), Some(Id::new("default"))));
        assert!(!filter.matches(&schema, Id::new("bpmn:ExclusiveGateway"), Some(Id::new("default"))));
        assert!(!filter.matches(&schema, Id::new("bpmn:UserTask"), Some(Id::new("name"))));
        assert!(!filter.matches(&schema, Id::new("bpmn:UserTask"), None));
    }

    #[test]
    fn test_undecided_hooks_permit() {
        let schema = bpmn_schema();
        let arena = ObjectArena::new();
        let task = SemanticObject::new(Id::new("Task_1"), Id::new("bpmn:Task"));
        let value = Value::from(true);
        let mut hooks = CloneHooks::new();
        hooks.on_can_set_copied_property(DEFAULT_PRIORITY, HookFilter::any(), |_| None);
        hooks.on_can_copy_properties(DEFAULT_PRIORITY, HookFilter::any().source_type("bpmn:Gateway"), |_| {
            Some(false)
        });

        assert!(hooks.can_set_copied_property(&context(&schema, &task, &arena, "asyncBefore", &value)));
        assert!(hooks.can_copy_properties(&ElementContext {
            schema: &schema,
            source: &task,
            target_type: task.type_name(),
        }));
    }
}

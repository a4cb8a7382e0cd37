//! Reference rewriting between copies.
//!
//! References are fixed in two places. While cloning, the resolvers
//! installed by [`register_resolvers`] decide where a copied reference
//! points: at the copy of a pasted object, at a shared clone of a global
//! definition, or nowhere. After every copy is placed, [`rewire`] restores
//! the links the clone engine never copies because they depend on the
//! diagram: default flows, data objects and lane membership.

use std::collections::HashMap;

use log::debug;

use sextant_core::{identifier::Id, semantic::Value};

use super::ClipboardContents;
use crate::{
    SextantError,
    clone::{CloneHooks, ClonedObjects, DEFAULT_PRIORITY, HookFilter, LOW_PRIORITY, ModelCloner, ReferenceResolution},
    command::Transaction,
    config::RootElementPolicy,
    document::Operation,
    modeling::{append_to_list, lane, remove_subtree, set_property},
};

/// Global definitions other than the diagram containers.
fn is_shareable_root(cloner: &ModelCloner<'_>, original: Id) -> bool {
    let schema = cloner.schema();
    cloner.originals().get(original).is_some_and(|object| {
        schema.is_a(object.type_name(), "bpmn:RootElement")
            && !schema.is_any(object.type_name(), &["bpmn:Process", "bpmn:Collaboration"])
    })
}

/// Returns the one copy of the global definition `original` for this
/// paste, cloning it on first use.
fn shared_root(cloner: &mut ModelCloner<'_>, original: Id) -> Result<Id, SextantError> {
    if let Some(copy) = cloner.shared(original) {
        return Ok(copy);
    }
    let copy = cloner.copy_element(original)?;
    cloner.share(original, copy);
    cloner.register_root(copy);
    debug!(original = original.to_string(), copy = copy.to_string(); "Cloned global definition");
    Ok(copy)
}

/// Installs the reference resolvers of the paste:
///
/// - a reference to an object copied in the same paste points at its copy;
/// - a data object reference gets its own data object, shared by every
///   reference to the same original;
/// - a group keeps its category value through a shared copy of the category;
/// - any other global definition (message, signal, error, escalation,
///   category, data store) is cloned once per paste and shared, or reused
///   as is under [`RootElementPolicy::ReuseExisting`] while it still exists.
pub fn register_resolvers(hooks: &mut CloneHooks, policy: RootElementPolicy) {
    let reuse = policy == RootElementPolicy::ReuseExisting;

    hooks.on_resolve_reference(DEFAULT_PRIORITY, HookFilter::any(), |context, cloner| {
        let copy = cloner
            .shared(context.reference)
            .or_else(|| cloner.mapped(context.reference));
        Ok(copy.map(ReferenceResolution::Resolve))
    });

    hooks.on_resolve_reference(
        DEFAULT_PRIORITY,
        HookFilter::any()
            .source_type("bpmn:DataObjectReference")
            .property("dataObjectRef"),
        |context, cloner| {
            if !cloner.originals().contains(context.reference) {
                return Ok(Some(ReferenceResolution::Drop));
            }
            let data_object = cloner.copy_element(context.reference)?;
            cloner.share(context.reference, data_object);
            cloner.register_companion(data_object, context.target);
            Ok(Some(ReferenceResolution::Resolve(data_object)))
        },
    );

    hooks.on_resolve_reference(
        DEFAULT_PRIORITY,
        HookFilter::any().source_type("bpmn:Group").property("categoryValueRef"),
        move |context, cloner| {
            if reuse && cloner.live().contains(context.reference) {
                return Ok(Some(ReferenceResolution::Resolve(context.reference)));
            }
            let category = cloner
                .originals()
                .get(context.reference)
                .and_then(|value| value.parent())
                .filter(|category| is_shareable_root(cloner, *category));
            let Some(category) = category else {
                return Ok(Some(ReferenceResolution::Drop));
            };
            shared_root(cloner, category)?;
            Ok(cloner.mapped(context.reference).map(ReferenceResolution::Resolve))
        },
    );

    hooks.on_resolve_reference(LOW_PRIORITY, HookFilter::any(), move |context, cloner| {
        if !is_shareable_root(cloner, context.reference) {
            return Ok(None);
        }
        if reuse && cloner.live().contains(context.reference) {
            return Ok(Some(ReferenceResolution::Resolve(context.reference)));
        }
        let copy = shared_root(cloner, context.reference)?;
        Ok(Some(ReferenceResolution::Resolve(copy)))
    });
}

/// Restores the diagram-dependent links among the pasted copies.
///
/// `placed` maps original diagram elements to their copies.
pub(crate) fn rewire(
    transaction: &mut Transaction<'_>,
    clipboard: &ClipboardContents,
    cloned: &ClonedObjects,
    placed: &HashMap<Id, Id>,
) -> Result<(), SextantError> {
    let originals = clipboard.objects();
    let live_copy = |transaction: &Transaction<'_>, original: Id| {
        cloned
            .mapping
            .get(&original)
            .copied()
            .filter(|copy| transaction.document().element(*copy).is_some())
    };

    // Default flows, only towards a copied outgoing flow of the copy itself.
    for descriptor in clipboard.descriptors().filter(|descriptor| !descriptor.element().is_label()) {
        let original = descriptor.element().business_object();
        let Some(copy) = live_copy(transaction, original) else {
            continue;
        };
        let Some(flow) = originals.get(original).and_then(|object| object.get_reference("default")) else {
            continue;
        };
        let flow_copy = live_copy(transaction, flow).filter(|flow_copy| {
            transaction
                .document()
                .object(*flow_copy)
                .and_then(|flow| flow.get_reference("sourceRef"))
                == Some(copy)
        });
        match flow_copy {
            Some(flow_copy) => set_property(transaction, copy, "default", Some(Value::Reference(flow_copy)))?,
            None => debug!(element = copy.to_string(); "Default flow not copied, cleared"),
        }
    }

    // Data objects live next to the first reference copied with them.
    for (companion, anchor) in &cloned.companions {
        let container = transaction
            .document()
            .object(*anchor)
            .and_then(|anchor| anchor.parent())
            .filter(|container| {
                transaction.document().object(*container).is_some_and(|container| {
                    transaction
                        .document()
                        .schema()
                        .property(container.type_name(), "flowElements")
                        .is_some()
                })
            });
        let Some(container) = container else {
            debug!(object = companion.to_string(); "No container for data object, removed");
            remove_subtree(transaction, *companion)?;
            continue;
        };
        transaction.apply(Operation::SetParent {
            object: *companion,
            parent: Some(container),
        })?;
        append_to_list(transaction, container, "flowElements", Value::Object(*companion))?;
    }

    // Lane membership follows the original lanes when they were copied too.
    let mut memberships = Vec::new();
    for descriptor in clipboard.descriptors() {
        let element = descriptor.element();
        if !transaction.document().is_a(element.type_name(), "bpmn:Lane") {
            continue;
        }
        let Some(lane_copy) = placed
            .get(&element.id())
            .and_then(|copy| transaction.document().element(*copy))
            .map(|copy| copy.business_object())
        else {
            continue;
        };
        let members = originals
            .get(element.business_object())
            .map(|lane| lane.get_list("flowNodeRef"))
            .unwrap_or_default();
        for member in members.iter().filter_map(Value::as_reference) {
            if let Some(member) = live_copy(transaction, member) {
                memberships.push((lane_copy, member));
            }
        }
    }
    for (_, member) in &memberships {
        lane::unassign(transaction, *member)?;
    }
    for (lane_copy, member) in memberships {
        append_to_list(transaction, lane_copy, "flowNodeRef", Value::Reference(member))?;
    }
    Ok(())
}

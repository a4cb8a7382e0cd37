use std::collections::HashMap;

use log::{debug, info};

use sextant_core::{
    ModelError,
    diagram::DiagramElement,
    geometry::{Bounds, Point},
    identifier::Id,
    semantic::Value,
};

use super::{ClipboardContents, Descriptor, rewrite};
use crate::{
    SextantError,
    clone::{ClonedObjects, ModelCloner},
    command::{CommandContext, CommandHandler, Services, Transaction},
    document::Operation,
    modeling::{
        ConnectionSpec, ShapeSpec, add_connection, add_shape, append_to_list, compensation, label, remove_subtree,
    },
    rules::RuleContext,
};

/// `elements.paste`: recreates clipboard contents inside a target element.
pub(crate) struct PasteHandler;

impl CommandHandler for PasteHandler {
    fn pre_execute(
        &self,
        context: &mut CommandContext,
        transaction: &mut Transaction<'_>,
        services: &Services<'_>,
    ) -> Result<(), SextantError> {
        let context = context.paste("elements.paste")?;
        let document = transaction.document();
        let target = document
            .element(context.target())
            .ok_or(ModelError::UnknownElement(context.target()))?;

        let allowed = {
            let top_level: Vec<&DiagramElement> = context
                .clipboard()
                .tree()
                .first()
                .map(|level| level.iter().map(Descriptor::element).collect())
                .unwrap_or_default();
            !top_level.is_empty() && {
                let rule_context = RuleContext::new(document)
                    .with_target(target)
                    .with_elements(&top_level);
                services.rules().allowed("elements.paste", &rule_context).is_allowed()
            }
        };
        if !allowed {
            debug!(parent = context.target().to_string(); "Paste refused");
            context.reject();
        }
        Ok(())
    }

    fn execute(
        &self,
        context: &mut CommandContext,
        transaction: &mut Transaction<'_>,
        services: &Services<'_>,
    ) -> Result<(), SextantError> {
        let context = context.paste("elements.paste")?;
        if context.is_rejected() {
            return Ok(());
        }
        let created = place(
            transaction,
            services,
            context.clipboard(),
            context.target(),
            context.position(),
        )?;
        info!(parent = context.target().to_string(), created = created.len(); "Pasted elements");
        for id in created {
            context.push_created(id);
        }
        Ok(())
    }

    fn post_execute(
        &self,
        context: &mut CommandContext,
        transaction: &mut Transaction<'_>,
        _services: &Services<'_>,
    ) -> Result<(), SextantError> {
        let context = context.paste("elements.paste")?;
        for id in context.created() {
            if transaction.document().element(*id).is_some_and(DiagramElement::is_connection) {
                compensation::enforce(transaction, *id)?;
            }
        }
        Ok(())
    }
}

/// Offset moving the centre of the top-level shapes onto `position`.
fn translation(clipboard: &ClipboardContents, position: Point) -> Point {
    let extent = clipboard
        .tree()
        .first()
        .into_iter()
        .flatten()
        .filter(|descriptor| !descriptor.element().is_label())
        .filter_map(|descriptor| descriptor.element().extent())
        .reduce(|merged, bounds| merged.merge(&bounds));
    match extent {
        Some(extent) => position.sub_point(extent.center()),
        None => Point::default(),
    }
}

/// Clones the business objects of every non-label descriptor.
///
/// Each copy's id is reserved before any property is cloned, so references
/// between pasted objects resolve to the copies whatever their order.
fn clone_objects(
    transaction: &mut Transaction<'_>,
    services: &Services<'_>,
    clipboard: &ClipboardContents,
) -> Result<ClonedObjects, SextantError> {
    let schema = transaction.document().shared_schema();
    let mut cloner = ModelCloner::new(&schema, services.hooks(), clipboard.objects(), transaction.id_scope());

    let mut reserved = Vec::new();
    for descriptor in clipboard.descriptors() {
        let original = descriptor.element().business_object();
        if descriptor.element().is_label() || cloner.mapped(original).is_some() {
            continue;
        }
        let copy = cloner.reserve(original)?;
        reserved.push((original, copy));
    }
    for (original, copy) in reserved {
        cloner.clone_element(original, copy, None)?;
    }
    Ok(cloner.finish())
}

/// Pushes `id` and the label its creation produced.
fn record(transaction: &Transaction<'_>, created: &mut Vec<Id>, id: Id) {
    created.push(id);
    if let Some(label) = transaction.document().element(id).and_then(DiagramElement::label_id) {
        created.push(label);
    }
}

fn place(
    transaction: &mut Transaction<'_>,
    services: &Services<'_>,
    clipboard: &ClipboardContents,
    target: Id,
    position: Point,
) -> Result<Vec<Id>, SextantError> {
    let delta = translation(clipboard, position);
    let cloned = clone_objects(transaction, services, clipboard)?;

    for object in &cloned.objects {
        transaction.apply(Operation::InsertObject(object.clone()))?;
    }
    let definitions = transaction.document().definitions();
    for root in &cloned.roots {
        transaction.apply(Operation::SetParent {
            object: *root,
            parent: Some(definitions),
        })?;
        append_to_list(transaction, definitions, "rootElements", Value::Object(*root))?;
    }

    let label_bounds: HashMap<Id, Bounds> = clipboard
        .descriptors()
        .filter_map(|descriptor| {
            let element = descriptor.element();
            Some((element.label_target()?, element.bounds()?.translate(delta)))
        })
        .collect();
    let business_object = |element: &DiagramElement| cloned.mapping.get(&element.business_object()).copied();

    let mut placed: HashMap<Id, Id> = HashMap::new();
    let mut created = Vec::new();

    // Shapes: shallow first, hosts before the shapes attached to them.
    for descriptor in clipboard.descriptors() {
        let element = descriptor.element();
        if !element.is_shape() {
            continue;
        }
        let (Some(copy), Some(bounds)) = (business_object(element), element.bounds()) else {
            continue;
        };
        let host = match element.host() {
            Some(host) => match placed.get(&host) {
                Some(host) => Some(*host),
                None => {
                    debug!(element = element.id().to_string(); "Host not pasted, shape dropped");
                    remove_subtree(transaction, copy)?;
                    continue;
                }
            },
            None => None,
        };
        let parent = element
            .parent()
            .and_then(|parent| placed.get(&parent).copied())
            .unwrap_or(target);

        let id = add_shape(
            transaction,
            ShapeSpec {
                id: copy,
                type_name: element.type_name(),
                business_object: copy,
                bounds: bounds.translate(delta),
                parent,
                host,
                collapsed: element.is_collapsed(),
                label_bounds: label_bounds.get(&element.id()).copied(),
            },
        )?;
        placed.insert(element.id(), id);
        record(transaction, &mut created, id);
    }

    // Connections once both endpoints exist; a connection may end on another one.
    let mut pending: Vec<&Descriptor> = clipboard
        .descriptors()
        .filter(|descriptor| descriptor.element().is_connection())
        .collect();
    loop {
        let mut waiting = Vec::new();
        let before = pending.len();
        for descriptor in pending {
            let element = descriptor.element();
            let source = element.source().and_then(|source| placed.get(&source).copied());
            let target = element.target().and_then(|target| placed.get(&target).copied());
            let (Some(source), Some(target), Some(copy)) = (source, target, business_object(element)) else {
                waiting.push(descriptor);
                continue;
            };
            let id = add_connection(
                transaction,
                ConnectionSpec {
                    id: copy,
                    type_name: element.type_name(),
                    business_object: copy,
                    source,
                    target,
                    waypoints: element.waypoints().iter().map(|point| point.add_point(delta)).collect(),
                    label_bounds: label_bounds.get(&element.id()).copied(),
                },
            )?;
            placed.insert(element.id(), id);
            record(transaction, &mut created, id);
        }
        pending = waiting;
        if pending.is_empty() || pending.len() == before {
            break;
        }
    }
    for descriptor in pending {
        debug!(element = descriptor.id().to_string(); "Connection endpoints not pasted, dropped");
        if let Some(copy) = business_object(descriptor.element()) {
            remove_subtree(transaction, copy)?;
        }
    }

    // Labels the creation of their owner did not already produce.
    for descriptor in clipboard.descriptors() {
        let element = descriptor.element();
        let Some(owner) = element.label_target().and_then(|owner| placed.get(&owner).copied()) else {
            continue;
        };
        let has_label = transaction
            .document()
            .element(owner)
            .is_some_and(|owner| owner.label_id().is_some());
        if has_label {
            continue;
        }
        if let Some(bounds) = element.bounds() {
            let id = label::add_label(transaction, owner, bounds.translate(delta))?;
            created.push(id);
        }
    }

    rewrite::rewire(transaction, clipboard, &cloned, &placed)?;
    Ok(created)
}

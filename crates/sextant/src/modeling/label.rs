//! External labels.
//!
//! Events, gateways, data references and flows render their name outside
//! the shape. Such elements get a separate label element once they are
//! named; the label shares the business object of its owner.

use sextant_core::{
    ModelError,
    diagram::DiagramElement,
    geometry::{Bounds, Point, Size},
    identifier::Id,
};

use crate::{
    SextantError,
    command::Transaction,
    document::{Document, Operation},
};

const LABEL_WIDTH: f32 = 90.0;
const LABEL_HEIGHT: f32 = 20.0;
const LABEL_DISTANCE: f32 = 7.0;

/// Types whose name is rendered in an external label.
const EXTERNAL_LABEL_TYPES: &[&str] = &[
    "bpmn:Event",
    "bpmn:Gateway",
    "bpmn:DataObjectReference",
    "bpmn:DataStoreReference",
    "bpmn:SequenceFlow",
    "bpmn:MessageFlow",
];

pub(crate) fn needs_external_label(document: &Document, type_name: Id) -> bool {
    document.schema().is_any(type_name, EXTERNAL_LABEL_TYPES)
}

/// Default placement of the label of `element`: below a shape, or on the
/// middle segment of a connection.
fn default_bounds(element: &DiagramElement) -> Option<Bounds> {
    let size = Size::new(LABEL_WIDTH, LABEL_HEIGHT);
    if let Some(bounds) = element.bounds() {
        let top_left = Point::new(bounds.center().x() - LABEL_WIDTH / 2.0, bounds.max_y() + LABEL_DISTANCE);
        return Some(Bounds::new_from_top_left(top_left, size));
    }
    let waypoints = element.waypoints();
    if waypoints.len() < 2 {
        return None;
    }
    let middle = (waypoints.len() - 1) / 2;
    let anchor = waypoints[middle].midpoint(waypoints[middle + 1]);
    Some(Bounds::new_from_center(anchor, size))
}

/// Adds the external label of `owner` if it needs one and has none yet.
///
/// Only named elements get a label. `hint` overrides the default placement.
pub(crate) fn ensure(transaction: &mut Transaction<'_>, owner: Id, hint: Option<Bounds>) -> Result<(), SextantError> {
    let document = transaction.document();
    let element = document.element(owner).ok_or(ModelError::UnknownElement(owner))?;
    if element.is_label() || element.label_id().is_some() || !needs_external_label(document, element.type_name()) {
        return Ok(());
    }
    let named = document
        .object(element.business_object())
        .and_then(|object| object.get_str("name"))
        .is_some_and(|name| !name.is_empty());
    if !named {
        return Ok(());
    }
    let Some(bounds) = hint.or_else(|| default_bounds(element)) else {
        return Ok(());
    };
    add_label(transaction, owner, bounds)?;
    Ok(())
}

/// Adds a label for `owner` at `bounds`, returning the label id.
pub(crate) fn add_label(transaction: &mut Transaction<'_>, owner: Id, bounds: Bounds) -> Result<Id, SextantError> {
    let document = transaction.document();
    let element = document.element(owner).ok_or(ModelError::UnknownElement(owner))?;
    let business_object = element.business_object();
    let parent = element.parent().unwrap_or(document.root());

    let preferred = Id::new(&format!("{owner}_label"));
    let id = if document.is_id_taken(preferred) {
        transaction.generate_id("Label")
    } else {
        preferred
    };
    transaction.apply(Operation::AddElement {
        element: DiagramElement::label(id, owner, business_object, bounds).with_parent(parent),
        index: None,
    })?;
    Ok(id)
}

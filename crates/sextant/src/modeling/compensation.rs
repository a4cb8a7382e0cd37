//! Compensation associations.
//!
//! A compensation boundary event is linked to exactly one compensation
//! activity through an association. The activity carries
//! `isForCompensation` as long as such an association points at it.

use log::debug;

use sextant_core::{identifier::Id, semantic::Value};

use super::{remove_element, set_property};
use crate::{SextantError, command::Transaction, document::Document};

/// Checks whether `element` is a boundary event with a compensate event
/// definition.
pub(crate) fn is_compensation_boundary(document: &Document, element: Id) -> bool {
    let Some(shape) = document.element(element) else {
        return false;
    };
    if !document.is_a(shape.type_name(), "bpmn:BoundaryEvent") {
        return false;
    }
    document
        .object(shape.business_object())
        .map(|event| event.get_list("eventDefinitions"))
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|definition| document.object(definition))
        .any(|definition| document.is_a(definition.type_name(), "bpmn:CompensateEventDefinition"))
}

/// Checks whether `connection` is an association leaving a compensation
/// boundary event.
pub(crate) fn is_compensation_association(document: &Document, connection: Id) -> bool {
    document.element(connection).is_some_and(|connection| {
        document.is_a(connection.type_name(), "bpmn:Association")
            && connection
                .source()
                .is_some_and(|source| is_compensation_boundary(document, source))
    })
}

/// Makes `connection` the only compensation association of its boundary
/// event and its activity, and flags the activity for compensation.
pub(crate) fn enforce(transaction: &mut Transaction<'_>, connection: Id) -> Result<(), SextantError> {
    let document = transaction.document();
    if !is_compensation_association(document, connection) {
        return Ok(());
    }
    let Some(element) = document.element(connection) else {
        return Ok(());
    };
    let (Some(source), Some(target)) = (element.source(), element.target()) else {
        return Ok(());
    };

    let registry = document.registry();
    let mut stale: Vec<Id> = [source, target]
        .into_iter()
        .filter_map(|endpoint| registry.get(endpoint))
        .flat_map(|endpoint| endpoint.outgoing().iter().chain(endpoint.incoming()))
        .copied()
        .filter(|other| *other != connection && is_compensation_association(document, *other))
        .collect();
    stale.dedup();
    let activity = registry.get(target).map(|target| target.business_object());

    for other in stale {
        if transaction.document().element(other).is_some() {
            debug!(replaced = other.to_string(), by = connection.to_string(); "Replacing compensation association");
            remove_element(transaction, other)?;
        }
    }
    if let Some(activity) = activity {
        set_property(transaction, activity, "isForCompensation", Some(Value::Boolean(true)))?;
    }
    Ok(())
}

/// Clears `isForCompensation` on the activity shape `target` once no
/// compensation association points at it anymore.
pub(crate) fn refresh(transaction: &mut Transaction<'_>, target: Id) -> Result<(), SextantError> {
    let document = transaction.document();
    let Some(element) = document.element(target) else {
        return Ok(());
    };
    let still_compensating = element
        .incoming()
        .iter()
        .any(|incoming| is_compensation_association(document, *incoming));
    let object = element.business_object();
    let flagged = document
        .object(object)
        .and_then(|activity| activity.get_bool("isForCompensation"))
        .unwrap_or(false);
    if flagged && !still_compensating {
        set_property(transaction, object, "isForCompensation", None)?;
    }
    Ok(())
}

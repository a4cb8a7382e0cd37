//! Lane membership of flow nodes.
//!
//! A flow node belongs to the innermost lane of its participant that
//! contains the centre of its shape. Membership is recorded on the lane as
//! `flowNodeRef`.

use sextant_core::{ModelError, identifier::Id, semantic::Value};

use super::{append_to_list, remove_from_list};
use crate::{SextantError, command::Transaction, document::Document};

/// Finds the innermost lane under the centre of the shape `element`.
pub(crate) fn lane_at(document: &Document, element: Id) -> Option<Id> {
    let registry = document.registry();
    let shape = registry.get(element)?;
    let parent = shape.parent()?;
    let center = shape.bounds()?.center();

    registry
        .filter(|candidate| {
            document.is_a(candidate.type_name(), "bpmn:Lane")
                && registry.ancestors(candidate.id()).contains(&parent)
                && candidate.bounds().is_some_and(|bounds| bounds.contains_point(center))
        })
        .into_iter()
        .filter_map(|lane| Some((lane.id(), lane.bounds()?.to_size().area())))
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(lane, _)| lane)
}

/// Records the flow node `element` in the lane under its centre.
pub(crate) fn assign(transaction: &mut Transaction<'_>, element: Id) -> Result<(), SextantError> {
    let document = transaction.document();
    let Some(lane) = lane_at(document, element) else {
        return Ok(());
    };
    let object = document
        .element(element)
        .ok_or(ModelError::UnknownElement(element))?
        .business_object();
    let lane_object = document
        .element(lane)
        .ok_or(ModelError::UnknownElement(lane))?
        .business_object();
    append_to_list(transaction, lane_object, "flowNodeRef", Value::Reference(object))
}

/// Removes the flow node `object` from every lane listing it.
pub(crate) fn unassign(transaction: &mut Transaction<'_>, object: Id) -> Result<(), SextantError> {
    let document = transaction.document();
    let lanes: Vec<Id> = document
        .model()
        .arena()
        .iter()
        .filter(|candidate| {
            document.is_a(candidate.type_name(), "bpmn:Lane")
                && candidate
                    .get_list("flowNodeRef")
                    .iter()
                    .any(|item| item.as_reference() == Some(object))
        })
        .map(|lane| lane.id())
        .collect();
    for lane in lanes {
        remove_from_list(transaction, lane, "flowNodeRef", object)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Modeler,
        command::CreateShapeContext,
        config::ModelerConfig,
        geometry::{Bounds, Point, Size},
    };

    fn bounds(x: f32, y: f32, width: f32, height: f32) -> Bounds {
        Bounds::new_from_top_left(Point::new(x, y), Size::new(width, height))
    }

    #[test]
    fn test_flow_node_joins_innermost_lane() {
        let mut modeler = Modeler::collaboration(ModelerConfig::default()).unwrap();
        let root = modeler.document().root();
        let participant = modeler
            .create_shape(CreateShapeContext::new("bpmn:Participant", root, bounds(0.0, 0.0, 600.0, 300.0)))
            .unwrap();
        let outer = modeler
            .create_shape(CreateShapeContext::new("bpmn:Lane", participant, bounds(30.0, 0.0, 570.0, 300.0)))
            .unwrap();
        let inner = modeler
            .create_shape(CreateShapeContext::new("bpmn:Lane", outer, bounds(60.0, 0.0, 540.0, 150.0)))
            .unwrap();

        let upper = modeler
            .create_shape(CreateShapeContext::new("bpmn:Task", participant, bounds(100.0, 20.0, 100.0, 80.0)))
            .unwrap();
        let lower = modeler
            .create_shape(CreateShapeContext::new("bpmn:Task", participant, bounds(100.0, 200.0, 100.0, 80.0)))
            .unwrap();

        let document = modeler.document();
        assert_eq!(
            document.object(inner).unwrap().get_list("flowNodeRef"),
            &[Value::Reference(upper)]
        );
        assert_eq!(
            document.object(outer).unwrap().get_list("flowNodeRef"),
            &[Value::Reference(lower)]
        );
    }

    #[test]
    fn test_task_dropped_on_lane_is_parented_to_participant() {
        let mut modeler = Modeler::collaboration(ModelerConfig::default()).unwrap();
        let root = modeler.document().root();
        let participant = modeler
            .create_shape(CreateShapeContext::new("bpmn:Participant", root, bounds(0.0, 0.0, 600.0, 300.0)))
            .unwrap();
        let lane = modeler
            .create_shape(CreateShapeContext::new("bpmn:Lane", participant, bounds(30.0, 0.0, 570.0, 300.0)))
            .unwrap();
        let task = modeler
            .create_shape(CreateShapeContext::new("bpmn:Task", lane, bounds(100.0, 20.0, 100.0, 80.0)))
            .unwrap();

        let document = modeler.document();
        assert_eq!(document.element(task).unwrap().parent(), Some(participant));
        assert_eq!(
            document.object(lane).unwrap().get_list("flowNodeRef"),
            &[Value::Reference(task)]
        );

        modeler.remove_elements(&[task]).unwrap();
        assert!(modeler.document().object(lane).unwrap().get("flowNodeRef").is_none());
    }
}

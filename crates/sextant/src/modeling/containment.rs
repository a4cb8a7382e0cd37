//! Semantic containment of diagram elements.
//!
//! A business object lives in the collection of the semantic container its
//! diagram parent stands for: flow elements in a process or sub-process,
//! participants and message flows in the collaboration, lanes in a lane set.

use log::trace;

use sextant_core::{
    ModelError,
    identifier::Id,
    semantic::{SemanticObject, Value},
};

use super::{append_to_list, remove_from_list, set_property};
use crate::{
    SextantError,
    command::Transaction,
    document::{Document, Operation},
};

enum Placement {
    /// Append to a list property of an existing object.
    Property { owner: Id, property: &'static str },
    /// Append to the first lane set of a process, creating it if needed.
    ProcessLaneSet { process: Id },
    /// Append to the child lane set of a lane, creating it if needed.
    ChildLaneSet { lane: Id },
}

/// Finds the process or sub-process whose flow elements the children of
/// `element` belong to.
///
/// Lanes are transparent; a participant stands for its process.
pub(crate) fn flow_container(document: &Document, element: Id) -> Option<Id> {
    let registry = document.registry();
    std::iter::once(element)
        .chain(registry.ancestors(element))
        .find_map(|candidate| {
            let candidate = registry.get(candidate)?;
            let type_name = candidate.type_name();
            if document.is_a(type_name, "bpmn:Lane") {
                return None;
            }
            Some(if document.is_a(type_name, "bpmn:Participant") {
                document
                    .object(candidate.business_object())
                    .and_then(|participant| participant.get_reference("processRef"))
            } else if document.schema().is_any(type_name, &["bpmn:Process", "bpmn:SubProcess"]) {
                Some(candidate.business_object())
            } else {
                None
            })
        })
        .flatten()
}

/// Returns the participant element containing `element`, including itself.
pub(crate) fn participant_of(document: &Document, element: Id) -> Option<Id> {
    let registry = document.registry();
    std::iter::once(element)
        .chain(registry.ancestors(element))
        .find(|candidate| {
            registry
                .get(*candidate)
                .is_some_and(|candidate| document.is_a(candidate.type_name(), "bpmn:Participant"))
        })
}

fn plan(document: &Document, element: Id) -> Result<Option<Placement>, SextantError> {
    let registry = document.registry();
    let shape = registry.get(element).ok_or(ModelError::UnknownElement(element))?;
    let type_name = shape.type_name();
    let root = document.root();
    let root_object = registry
        .get(root)
        .map(|root| root.business_object())
        .ok_or(ModelError::UnknownElement(root))?;
    let on_collaboration = registry
        .get(root)
        .is_some_and(|root| document.is_a(root.type_name(), "bpmn:Collaboration"));
    let business_object_of = |id: Option<Id>| id.and_then(|id| registry.get(id)).map(|element| element.business_object());
    let parent = shape.parent().unwrap_or(root);

    let placement = if document.is_a(type_name, "bpmn:Participant") {
        on_collaboration.then_some(Placement::Property {
            owner: root_object,
            property: "participants",
        })
    } else if document.is_a(type_name, "bpmn:Lane") {
        let container = registry.get(parent).ok_or(ModelError::UnknownElement(parent))?;
        if document.is_a(container.type_name(), "bpmn:Lane") {
            Some(Placement::ChildLaneSet {
                lane: container.business_object(),
            })
        } else {
            flow_container(document, parent).map(|process| Placement::ProcessLaneSet { process })
        }
    } else if document.is_a(type_name, "bpmn:MessageFlow") {
        on_collaboration.then_some(Placement::Property {
            owner: root_object,
            property: "messageFlows",
        })
    } else if document.is_a(type_name, "bpmn:DataInputAssociation") {
        business_object_of(shape.target()).map(|activity| Placement::Property {
            owner: activity,
            property: "dataInputAssociations",
        })
    } else if document.is_a(type_name, "bpmn:DataOutputAssociation") {
        business_object_of(shape.source()).map(|activity| Placement::Property {
            owner: activity,
            property: "dataOutputAssociations",
        })
    } else if document.is_a(type_name, "bpmn:Artifact") {
        match flow_container(document, parent) {
            Some(container) => Some(Placement::Property {
                owner: container,
                property: "artifacts",
            }),
            None => on_collaboration.then_some(Placement::Property {
                owner: root_object,
                property: "artifacts",
            }),
        }
    } else if document.is_a(type_name, "bpmn:FlowElement") {
        flow_container(document, parent).map(|container| Placement::Property {
            owner: container,
            property: "flowElements",
        })
    } else {
        None
    };
    Ok(placement)
}

fn create_lane_set(transaction: &mut Transaction<'_>, owner: Id) -> Result<Id, SextantError> {
    let id = transaction.generate_id("LaneSet");
    let mut lane_set = SemanticObject::new(id, Id::new("bpmn:LaneSet"));
    lane_set.set_parent(Some(owner));
    transaction.apply(Operation::InsertObject(lane_set))?;
    Ok(id)
}

/// Adds the business object of `element` to the semantic container of the
/// element's diagram parent.
pub(crate) fn attach(transaction: &mut Transaction<'_>, element: Id) -> Result<(), SextantError> {
    let Some(placement) = plan(transaction.document(), element)? else {
        return Ok(());
    };
    let object = transaction
        .document()
        .element(element)
        .ok_or(ModelError::UnknownElement(element))?
        .business_object();

    let (owner, property) = match placement {
        Placement::Property { owner, property } => (owner, property),
        Placement::ProcessLaneSet { process } => {
            let existing = transaction
                .document()
                .object(process)
                .and_then(|process| process.get_list("laneSets").iter().find_map(Value::as_object));
            let lane_set = match existing {
                Some(lane_set) => lane_set,
                None => {
                    let lane_set = create_lane_set(transaction, process)?;
                    append_to_list(transaction, process, "laneSets", Value::Object(lane_set))?;
                    lane_set
                }
            };
            (lane_set, "lanes")
        }
        Placement::ChildLaneSet { lane } => {
            let existing = transaction
                .document()
                .object(lane)
                .and_then(|lane| lane.get_object("childLaneSet"));
            let lane_set = match existing {
                Some(lane_set) => lane_set,
                None => {
                    let lane_set = create_lane_set(transaction, lane)?;
                    set_property(transaction, lane, "childLaneSet", Some(Value::Object(lane_set)))?;
                    lane_set
                }
            };
            (lane_set, "lanes")
        }
    };

    trace!(object = object.to_string(), owner = owner.to_string(), property = property; "Attaching business object");
    transaction.apply(Operation::SetParent {
        object,
        parent: Some(owner),
    })?;
    append_to_list(transaction, owner, property, Value::Object(object))
}

/// Removes `object` from the collection of its semantic owner.
pub(crate) fn detach(transaction: &mut Transaction<'_>, object: Id) -> Result<(), SextantError> {
    let document = transaction.document();
    let Some(owner) = document.object(object).and_then(SemanticObject::parent) else {
        return Ok(());
    };
    let owned_as = document.object(owner).and_then(|owner_object| {
        owner_object
            .owning_property(object)
            .map(|property| (property, owner_object.get(property).is_some_and(|value| value.as_list().is_some())))
    });

    match owned_as {
        Some((property, true)) => remove_from_list(transaction, owner, property, object)?,
        Some((property, false)) => set_property(transaction, owner, property, None)?,
        None => {}
    }
    transaction.apply(Operation::SetParent { object, parent: None })
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
    fn test_lanes_share_the_process_lane_set() {
        let mut modeler = Modeler::collaboration(ModelerConfig::default()).unwrap();
        let root = modeler.document().root();
        let participant = modeler
            .create_shape(CreateShapeContext::new("bpmn:Participant", root, bounds(0.0, 0.0, 600.0, 250.0)))
            .unwrap();
        let first = modeler
            .create_shape(CreateShapeContext::new("bpmn:Lane", participant, bounds(30.0, 0.0, 570.0, 125.0)))
            .unwrap();
        let second = modeler
            .create_shape(CreateShapeContext::new("bpmn:Lane", participant, bounds(30.0, 125.0, 570.0, 125.0)))
            .unwrap();

        let document = modeler.document();
        let process = document
            .object(participant)
            .and_then(|participant| participant.get_reference("processRef"))
            .unwrap();
        let lane_sets = document.object(process).unwrap().get_list("laneSets");
        assert_eq!(lane_sets.len(), 1);
        let lane_set = document.object(lane_sets[0].as_object().unwrap()).unwrap();
        assert_eq!(
            lane_set.get_list("lanes"),
            &[Value::Object(first), Value::Object(second)]
        );
        assert_eq!(document.object(first).unwrap().parent(), Some(lane_set.id()));
    }

    #[test]
    fn test_flow_container_skips_lanes() {
        let mut modeler = Modeler::collaboration(ModelerConfig::default()).unwrap();
        let root = modeler.document().root();
        let participant = modeler
            .create_shape(CreateShapeContext::new("bpmn:Participant", root, bounds(0.0, 0.0, 600.0, 250.0)))
            .unwrap();
        let lane = modeler
            .create_shape(CreateShapeContext::new("bpmn:Lane", participant, bounds(30.0, 0.0, 570.0, 250.0)))
            .unwrap();

        let document = modeler.document();
        let process = document
            .object(participant)
            .and_then(|participant| participant.get_reference("processRef"));
        assert_eq!(flow_container(document, lane), process);
        assert_eq!(participant_of(document, lane), Some(participant));
        assert_eq!(flow_container(document, root), None);
    }

    #[test]
    fn test_detach_removes_from_owner_list() {
        let mut modeler = Modeler::new(ModelerConfig::default()).unwrap();
        let root = modeler.document().root();
        let task = modeler
            .create_shape(CreateShapeContext::new("bpmn:Task", root, bounds(0.0, 0.0, 100.0, 80.0)))
            .unwrap();
        assert_eq!(
            modeler.document().object(root).unwrap().get_list("flowElements"),
            &[Value::Object(task)]
        );

        modeler.remove_elements(&[task]).unwrap();
        assert!(modeler.document().object(root).unwrap().get("flowElements").is_none());
        assert!(modeler.document().object(task).is_none());
    }
}

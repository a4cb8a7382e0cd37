//! Built-in clone rules for BPMN objects.

use log::debug;

use sextant_core::{identifier::Id, semantic::Value};

use super::hooks::{CloneHooks, DEFAULT_PRIORITY, HookFilter, PropertyDecision, ReferenceResolution};

/// Properties that are never cloned.
///
/// They hold containment of other diagram elements' business objects or
/// pointers between elements; the paste orchestrator rebuilds them from the
/// diagram once every copy is in place.
pub const STRUCTURAL_PROPERTIES: &[&str] = &[
    "artifacts",
    "attachedToRef",
    "childLaneSet",
    "dataInputAssociations",
    "dataOutputAssociations",
    "default",
    "flowElements",
    "flowNodeRef",
    "incoming",
    "laneSets",
    "lanes",
    "messageFlows",
    "outgoing",
    "participants",
    "rootElements",
    "sourceRef",
    "targetRef",
];

/// Checks whether `property` is rebuilt structurally instead of cloned.
pub(crate) fn is_structural(property: Id) -> bool {
    STRUCTURAL_PROPERTIES.iter().any(|name| property == *name)
}

/// Installs the BPMN clone rules:
///
/// - structural properties are vetoed;
/// - extension values not allowed in the new owner type are filtered out;
/// - empty extension elements are never assigned;
/// - a participant's process is cloned into a fresh root element.
pub fn register_bpmn_rules(hooks: &mut CloneHooks) {
    hooks.on_can_copy_property(DEFAULT_PRIORITY, HookFilter::any(), |context| {
        is_structural(context.property).then_some(PropertyDecision::Veto)
    });

    hooks.on_can_copy_property(
        DEFAULT_PRIORITY,
        HookFilter::any()
            .source_type("bpmn:ExtensionElements")
            .property("values"),
        |context| {
            let owner_type = context.target_owner_type?;
            let items = context.value.as_list()?;
            let kept: Vec<Value> = items
                .iter()
                .filter(|item| {
                    item.as_object()
                        .and_then(|id| context.originals.get(id))
                        .is_some_and(|value| context.schema.is_allowed_in(value.type_name(), owner_type))
                })
                .cloned()
                .collect();
            if kept.len() == items.len() {
                return None;
            }
            debug!(
                owner_type = owner_type.to_string(),
                dropped = items.len() - kept.len();
                "Extension values not allowed in new owner"
            );
            Some(PropertyDecision::Replace(Value::List(kept)))
        },
    );

    hooks.on_can_set_copied_property(
        DEFAULT_PRIORITY,
        HookFilter::any().property("extensionElements"),
        |context| {
            let extensions = context.value.as_object()?;
            let is_empty = context
                .staged
                .get(extensions)
                .is_none_or(|extensions| extensions.get_list("values").is_empty());
            is_empty.then_some(false)
        },
    );

    hooks.on_resolve_reference(
        DEFAULT_PRIORITY,
        HookFilter::any()
            .source_type("bpmn:Participant")
            .property("processRef"),
        |context, cloner| {
            if !cloner.originals().contains(context.reference) {
                return Ok(None);
            }
            let process = cloner.copy_element(context.reference)?;
            cloner.register_root(process);
            Ok(Some(ReferenceResolution::Resolve(process)))
        },
    );
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use sextant_core::{
        schema::bpmn_schema,
        semantic::{ObjectArena, SemanticObject},
    };

    use super::*;
    use crate::{clone::ModelCloner, document::Document};

    fn object(id: &str, type_name: &str, parent: Option<&str>) -> SemanticObject {
        let mut object = SemanticObject::new(Id::new(id), Id::new(type_name));
        object.set_parent(parent.map(Id::new));
        object
    }

    fn user_task_with_extensions() -> ObjectArena {
        let mut arena = ObjectArena::new();
        let mut task = object("Task_1", "bpmn:UserTask", None);
        task.set("extensionElements", Value::Object(Id::new("Ext_1")));
        arena.insert(task).unwrap();
        let mut extensions = object("Ext_1", "bpmn:ExtensionElements", Some("Task_1"));
        extensions.set(
            "values",
            Value::List(vec![
                Value::Object(Id::new("Listener_1")),
                Value::Object(Id::new("Property_1")),
            ]),
        );
        arena.insert(extensions).unwrap();
        arena
            .insert(object("Listener_1", "ext:TaskListener", Some("Ext_1")))
            .unwrap();
        let mut property = object("Property_1", "ext:Property", Some("Ext_1"));
        property.set("name", Value::from("retries"));
        arena.insert(property).unwrap();
        arena
    }

    #[test]
    fn test_extension_values_follow_owner_type() {
        let schema = bpmn_schema();
        let mut hooks = CloneHooks::new();
        register_bpmn_rules(&mut hooks);
        let mut document = Document::process(Rc::new(bpmn_schema())).unwrap();
        let source = user_task_with_extensions();

        let mut cloner = ModelCloner::new(&schema, &hooks, &source, document.id_scope());
        let service = cloner.allocate("ServiceTask");
        cloner
            .create_object(service, Id::new("bpmn:ServiceTask"), None)
            .unwrap();
        cloner.clone_element(Id::new("Task_1"), service, None).unwrap();
        let user = cloner.copy_element(Id::new("Task_1")).unwrap();
        let cloned = cloner.finish();

        let get = |id: Id| cloned.objects.iter().find(|object| object.id() == id).unwrap();
        let service_values = get(get(service).get_object("extensionElements").unwrap())
            .get_list("values")
            .to_vec();
        assert_eq!(service_values.len(), 1);
        assert_eq!(
            get(service_values[0].as_object().unwrap()).type_name(),
            "ext:Property"
        );

        let user_values = get(get(user).get_object("extensionElements").unwrap()).get_list("values");
        assert_eq!(user_values.len(), 2);
    }

    #[test]
    fn test_empty_extension_elements_are_not_set() {
        let schema = bpmn_schema();
        let mut hooks = CloneHooks::new();
        register_bpmn_rules(&mut hooks);
        let mut document = Document::process(Rc::new(bpmn_schema())).unwrap();
        let mut source = user_task_with_extensions();
        source
            .get_mut(Id::new("Ext_1"))
            .unwrap()
            .set("values", Value::List(vec![Value::Object(Id::new("Listener_1"))]));

        let mut cloner = ModelCloner::new(&schema, &hooks, &source, document.id_scope());
        let service = cloner.allocate("ServiceTask");
        cloner
            .create_object(service, Id::new("bpmn:ServiceTask"), None)
            .unwrap();
        cloner.clone_element(Id::new("Task_1"), service, None).unwrap();
        let cloned = cloner.finish();

        assert_eq!(cloned.objects.len(), 1);
        assert!(cloned.objects[0].get("extensionElements").is_none());
    }

    #[test]
    fn test_participant_process_is_cloned_as_root() {
        let schema = bpmn_schema();
        let mut hooks = CloneHooks::new();
        register_bpmn_rules(&mut hooks);
        let mut document = Document::collaboration(Rc::new(bpmn_schema())).unwrap();
        let mut source = ObjectArena::new();
        let mut participant = object("Participant_1", "bpmn:Participant", None);
        participant.set("processRef", Value::Reference(Id::new("Process_7")));
        source.insert(participant).unwrap();
        let mut process = object("Process_7", "bpmn:Process", None);
        process.set("isExecutable", Value::from(true));
        process.set("flowElements", Value::List(vec![Value::Object(Id::new("Task_1"))]));
        source.insert(process).unwrap();

        let mut cloner = ModelCloner::new(&schema, &hooks, &source, document.id_scope());
        let copy = cloner.copy_element(Id::new("Participant_1")).unwrap();
        let cloned = cloner.finish();

        let process = cloned.mapping[&Id::new("Process_7")];
        assert_eq!(cloned.roots, vec![process]);
        let participant = cloned.objects.iter().find(|object| object.id() == copy).unwrap();
        assert_eq!(participant.get_reference("processRef"), Some(process));
        let process = cloned.objects.iter().find(|object| object.id() == process).unwrap();
        assert_eq!(process.get_bool("isExecutable"), Some(true));
        assert!(process.get("flowElements").is_none());
    }
}

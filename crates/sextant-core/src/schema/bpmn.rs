//! Built-in BPMN 2.0 schema.
//!
//! Covers the subset of the BPMN metamodel the modeler edits: processes and
//! collaborations, lanes, activities, events and their definitions, gateways,
//! flows, artifacts, data elements and the shared root definitions (messages,
//! signals, errors, escalations, categories, data stores). Two extension
//! value types are included under the `ext:` prefix to exercise extension
//! element handling.

use super::{PrimitiveType, PropertyDescriptor, Schema, TypeDescriptor};

fn string(name: &str) -> PropertyDescriptor {
    PropertyDescriptor::primitive(name, PrimitiveType::String)
}

fn boolean(name: &str) -> PropertyDescriptor {
    PropertyDescriptor::primitive(name, PrimitiveType::Boolean)
}

fn integer(name: &str) -> PropertyDescriptor {
    PropertyDescriptor::primitive(name, PrimitiveType::Integer)
}

fn owned(name: &str, type_name: &str) -> PropertyDescriptor {
    PropertyDescriptor::owned(name, type_name)
}

fn reference(name: &str, type_name: &str) -> PropertyDescriptor {
    PropertyDescriptor::reference(name, type_name)
}

fn bpmn_types() -> Vec<TypeDescriptor> {
    vec![
        // Foundation
        TypeDescriptor::new("bpmn:BaseElement")
            .property(string("id").identity())
            .property(owned("documentation", "bpmn:Documentation").many())
            .property(owned("extensionElements", "bpmn:ExtensionElements").extension()),
        TypeDescriptor::new("bpmn:Documentation")
            .extends("bpmn:BaseElement")
            .property(string("text")),
        TypeDescriptor::new("ext:Element"),
        TypeDescriptor::new("bpmn:ExtensionElements").property(owned("values", "ext:Element").many()),
        TypeDescriptor::new("ext:Property")
            .extends("ext:Element")
            .property(string("name"))
            .property(string("value")),
        TypeDescriptor::new("ext:TaskListener")
            .extends("ext:Element")
            .property(string("event"))
            .property(string("class"))
            .allowed_in("bpmn:UserTask"),
        TypeDescriptor::new("bpmn:Expression").extends("bpmn:BaseElement"),
        TypeDescriptor::new("bpmn:FormalExpression")
            .extends("bpmn:Expression")
            .property(string("body"))
            .property(string("language")),
        // Root elements
        TypeDescriptor::new("bpmn:RootElement").extends("bpmn:BaseElement"),
        TypeDescriptor::new("bpmn:Definitions")
            .extends("bpmn:BaseElement")
            .property(string("name"))
            .property(string("targetNamespace"))
            .property(owned("rootElements", "bpmn:RootElement").many()),
        TypeDescriptor::new("bpmn:Message")
            .extends("bpmn:RootElement")
            .property(string("name")),
        TypeDescriptor::new("bpmn:Signal")
            .extends("bpmn:RootElement")
            .property(string("name")),
        TypeDescriptor::new("bpmn:Error")
            .extends("bpmn:RootElement")
            .property(string("name"))
            .property(string("errorCode")),
        TypeDescriptor::new("bpmn:Escalation")
            .extends("bpmn:RootElement")
            .property(string("name"))
            .property(string("escalationCode")),
        TypeDescriptor::new("bpmn:CategoryValue")
            .extends("bpmn:BaseElement")
            .property(string("value")),
        TypeDescriptor::new("bpmn:Category")
            .extends("bpmn:RootElement")
            .property(string("name"))
            .property(owned("categoryValue", "bpmn:CategoryValue").many()),
        TypeDescriptor::new("bpmn:DataStore")
            .extends("bpmn:RootElement")
            .property(string("name"))
            .property(integer("capacity")),
        // Containers
        TypeDescriptor::new("bpmn:FlowElement")
            .extends("bpmn:BaseElement")
            .property(string("name")),
        TypeDescriptor::new("bpmn:Artifact").extends("bpmn:BaseElement"),
        TypeDescriptor::new("bpmn:Lane")
            .extends("bpmn:BaseElement")
            .property(string("name"))
            .property(reference("flowNodeRef", "bpmn:FlowNode").many())
            .property(owned("childLaneSet", "bpmn:LaneSet")),
        TypeDescriptor::new("bpmn:LaneSet")
            .extends("bpmn:BaseElement")
            .property(string("name"))
            .property(owned("lanes", "bpmn:Lane").many()),
        TypeDescriptor::new("bpmn:Process")
            .extends("bpmn:RootElement")
            .property(string("name"))
            .property(boolean("isExecutable"))
            .property(string("processType"))
            .property(owned("laneSets", "bpmn:LaneSet").many())
            .property(owned("flowElements", "bpmn:FlowElement").many())
            .property(owned("artifacts", "bpmn:Artifact").many()),
        TypeDescriptor::new("bpmn:Participant")
            .extends("bpmn:BaseElement")
            .property(string("name"))
            .property(reference("processRef", "bpmn:Process")),
        TypeDescriptor::new("bpmn:Collaboration")
            .extends("bpmn:RootElement")
            .property(string("name"))
            .property(owned("participants", "bpmn:Participant").many())
            .property(owned("messageFlows", "bpmn:MessageFlow").many())
            .property(owned("artifacts", "bpmn:Artifact").many()),
        // Flow nodes
        TypeDescriptor::new("bpmn:FlowNode")
            .extends("bpmn:FlowElement")
            .property(reference("incoming", "bpmn:SequenceFlow").many())
            .property(reference("outgoing", "bpmn:SequenceFlow").many())
            .property(boolean("asyncBefore"))
            .property(boolean("asyncAfter")),
        TypeDescriptor::new("bpmn:LoopCharacteristics").extends("bpmn:BaseElement"),
        TypeDescriptor::new("bpmn:StandardLoopCharacteristics")
            .extends("bpmn:LoopCharacteristics")
            .property(boolean("testBefore"))
            .property(integer("loopMaximum")),
        TypeDescriptor::new("bpmn:MultiInstanceLoopCharacteristics")
            .extends("bpmn:LoopCharacteristics")
            .property(boolean("isSequential"))
            .property(owned("loopCardinality", "bpmn:FormalExpression")),
        TypeDescriptor::new("bpmn:DataAssociation")
            .extends("bpmn:BaseElement")
            .property(reference("sourceRef", "bpmn:BaseElement").many())
            .property(reference("targetRef", "bpmn:BaseElement")),
        TypeDescriptor::new("bpmn:DataInputAssociation").extends("bpmn:DataAssociation"),
        TypeDescriptor::new("bpmn:DataOutputAssociation").extends("bpmn:DataAssociation"),
        TypeDescriptor::new("bpmn:Activity")
            .extends("bpmn:FlowNode")
            .property(boolean("isForCompensation"))
            .property(integer("startQuantity"))
            .property(reference("default", "bpmn:SequenceFlow"))
            .property(owned("loopCharacteristics", "bpmn:LoopCharacteristics"))
            .property(owned("dataInputAssociations", "bpmn:DataInputAssociation").many())
            .property(owned("dataOutputAssociations", "bpmn:DataOutputAssociation").many()),
        TypeDescriptor::new("bpmn:Task").extends("bpmn:Activity"),
        TypeDescriptor::new("bpmn:UserTask")
            .extends("bpmn:Task")
            .property(string("assignee"))
            .property(string("candidateGroups")),
        TypeDescriptor::new("bpmn:ServiceTask")
            .extends("bpmn:Task")
            .property(string("implementation")),
        TypeDescriptor::new("bpmn:ScriptTask")
            .extends("bpmn:Task")
            .property(string("scriptFormat"))
            .property(string("script")),
        TypeDescriptor::new("bpmn:SendTask")
            .extends("bpmn:Task")
            .property(reference("messageRef", "bpmn:Message")),
        TypeDescriptor::new("bpmn:ReceiveTask")
            .extends("bpmn:Task")
            .property(boolean("instantiate"))
            .property(reference("messageRef", "bpmn:Message")),
        TypeDescriptor::new("bpmn:ManualTask").extends("bpmn:Task"),
        TypeDescriptor::new("bpmn:BusinessRuleTask")
            .extends("bpmn:Task")
            .property(string("implementation")),
        TypeDescriptor::new("bpmn:SubProcess")
            .extends("bpmn:Activity")
            .property(boolean("triggeredByEvent"))
            .property(owned("flowElements", "bpmn:FlowElement").many())
            .property(owned("artifacts", "bpmn:Artifact").many()),
        TypeDescriptor::new("bpmn:CallActivity")
            .extends("bpmn:Activity")
            .property(string("calledElement")),
        // Events
        TypeDescriptor::new("bpmn:EventDefinition").extends("bpmn:BaseElement"),
        TypeDescriptor::new("bpmn:MessageEventDefinition")
            .extends("bpmn:EventDefinition")
            .property(reference("messageRef", "bpmn:Message")),
        TypeDescriptor::new("bpmn:SignalEventDefinition")
            .extends("bpmn:EventDefinition")
            .property(reference("signalRef", "bpmn:Signal")),
        TypeDescriptor::new("bpmn:ErrorEventDefinition")
            .extends("bpmn:EventDefinition")
            .property(reference("errorRef", "bpmn:Error")),
        TypeDescriptor::new("bpmn:EscalationEventDefinition")
            .extends("bpmn:EventDefinition")
            .property(reference("escalationRef", "bpmn:Escalation")),
        TypeDescriptor::new("bpmn:TimerEventDefinition")
            .extends("bpmn:EventDefinition")
            .property(owned("timeDate", "bpmn:FormalExpression"))
            .property(owned("timeDuration", "bpmn:FormalExpression"))
            .property(owned("timeCycle", "bpmn:FormalExpression")),
        TypeDescriptor::new("bpmn:CompensateEventDefinition")
            .extends("bpmn:EventDefinition")
            .property(boolean("waitForCompletion"))
            .property(reference("activityRef", "bpmn:Activity")),
        TypeDescriptor::new("bpmn:ConditionalEventDefinition")
            .extends("bpmn:EventDefinition")
            .property(owned("condition", "bpmn:FormalExpression")),
        TypeDescriptor::new("bpmn:TerminateEventDefinition").extends("bpmn:EventDefinition"),
        TypeDescriptor::new("bpmn:Event")
            .extends("bpmn:FlowNode")
            .property(owned("eventDefinitions", "bpmn:EventDefinition").many()),
        TypeDescriptor::new("bpmn:CatchEvent")
            .extends("bpmn:Event")
            .property(boolean("parallelMultiple")),
        TypeDescriptor::new("bpmn:ThrowEvent").extends("bpmn:Event"),
        TypeDescriptor::new("bpmn:StartEvent")
            .extends("bpmn:CatchEvent")
            .property(boolean("isInterrupting")),
        TypeDescriptor::new("bpmn:EndEvent").extends("bpmn:ThrowEvent"),
        TypeDescriptor::new("bpmn:IntermediateCatchEvent").extends("bpmn:CatchEvent"),
        TypeDescriptor::new("bpmn:IntermediateThrowEvent").extends("bpmn:ThrowEvent"),
        TypeDescriptor::new("bpmn:BoundaryEvent")
            .extends("bpmn:CatchEvent")
            .property(boolean("cancelActivity"))
            .property(reference("attachedToRef", "bpmn:Activity")),
        // Gateways
        TypeDescriptor::new("bpmn:Gateway")
            .extends("bpmn:FlowNode")
            .property(string("gatewayDirection")),
        TypeDescriptor::new("bpmn:ExclusiveGateway")
            .extends("bpmn:Gateway")
            .property(reference("default", "bpmn:SequenceFlow")),
        TypeDescriptor::new("bpmn:InclusiveGateway")
            .extends("bpmn:Gateway")
            .property(reference("default", "bpmn:SequenceFlow")),
        TypeDescriptor::new("bpmn:ComplexGateway")
            .extends("bpmn:Gateway")
            .property(reference("default", "bpmn:SequenceFlow")),
        TypeDescriptor::new("bpmn:ParallelGateway").extends("bpmn:Gateway"),
        TypeDescriptor::new("bpmn:EventBasedGateway")
            .extends("bpmn:Gateway")
            .property(boolean("instantiate"))
            .property(string("eventGatewayType")),
        // Connections
        TypeDescriptor::new("bpmn:SequenceFlow")
            .extends("bpmn:FlowElement")
            .property(reference("sourceRef", "bpmn:FlowNode"))
            .property(reference("targetRef", "bpmn:FlowNode"))
            .property(boolean("isImmediate"))
            .property(owned("conditionExpression", "bpmn:FormalExpression")),
        TypeDescriptor::new("bpmn:MessageFlow")
            .extends("bpmn:BaseElement")
            .property(string("name"))
            .property(reference("sourceRef", "bpmn:BaseElement"))
            .property(reference("targetRef", "bpmn:BaseElement"))
            .property(reference("messageRef", "bpmn:Message")),
        TypeDescriptor::new("bpmn:Association")
            .extends("bpmn:Artifact")
            .property(string("associationDirection"))
            .property(reference("sourceRef", "bpmn:BaseElement"))
            .property(reference("targetRef", "bpmn:BaseElement")),
        // Artifacts
        TypeDescriptor::new("bpmn:TextAnnotation")
            .extends("bpmn:Artifact")
            .property(string("text"))
            .property(string("textFormat")),
        TypeDescriptor::new("bpmn:Group")
            .extends("bpmn:Artifact")
            .property(reference("categoryValueRef", "bpmn:CategoryValue")),
        // Data
        TypeDescriptor::new("bpmn:DataObject")
            .extends("bpmn:FlowElement")
            .property(boolean("isCollection")),
        TypeDescriptor::new("bpmn:DataObjectReference")
            .extends("bpmn:FlowElement")
            .property(reference("dataObjectRef", "bpmn:DataObject")),
        TypeDescriptor::new("bpmn:DataStoreReference")
            .extends("bpmn:FlowElement")
            .property(reference("dataStoreRef", "bpmn:DataStore")),
    ]
}

/// Builds the built-in BPMN schema.
///
/// # Examples
///
/// ```
/// use sextant_core::{identifier::Id, schema::bpmn_schema};
///
/// let schema = bpmn_schema();
/// let user_task = Id::new("bpmn:UserTask");
///
/// assert!(schema.is_a(user_task, "bpmn:Activity"));
/// assert!(schema.property(user_task, "asyncBefore").is_some());
/// assert!(schema.property(Id::new("bpmn:ServiceTask"), "assignee").is_none());
/// ```
pub fn bpmn_schema() -> Schema {
    let mut schema = Schema::new();
    for descriptor in bpmn_types() {
        schema
            .register(descriptor)
            .expect("Built-in BPMN types are declared after their supertypes");
    }
    schema
}

#[cfg(test)]
mod tests {
    use crate::identifier::Id;

    use super::*;

    #[test]
    fn test_builtin_schema_registers() {
        let schema = bpmn_schema();
        assert!(schema.contains(Id::new("bpmn:Definitions")));
        assert!(schema.contains(Id::new("ext:TaskListener")));
        assert_eq!(schema.types().count(), bpmn_types().len());
    }

    #[test]
    fn test_every_property_targets_a_known_type() {
        use crate::schema::PropertyKind;

        let schema = bpmn_schema();
        for descriptor in schema.types() {
            for property in descriptor.own_properties() {
                match property.kind() {
                    PropertyKind::Owned(target) | PropertyKind::Reference(target) => {
                        assert!(
                            schema.contains(target),
                            "{}.{} targets unknown type {}",
                            descriptor.name(),
                            property.name(),
                            target
                        );
                    }
                    PropertyKind::Primitive(_) => {}
                }
            }
        }
    }

    #[test]
    fn test_extension_elements_come_last() {
        let schema = bpmn_schema();
        let properties = schema.properties(Id::new("bpmn:UserTask"));
        let last = properties.last().unwrap();

        assert_eq!(last.name(), "extensionElements");
        assert!(last.is_extension());
        assert_eq!(properties.first().unwrap().name(), "id");
    }

    #[test]
    fn test_root_definitions_are_root_elements() {
        let schema = bpmn_schema();
        for name in [
            "bpmn:Message",
            "bpmn:Signal",
            "bpmn:Error",
            "bpmn:Escalation",
            "bpmn:Category",
            "bpmn:DataStore",
            "bpmn:Process",
        ] {
            assert!(schema.is_a(Id::new(name), "bpmn:RootElement"), "{name}");
        }
        assert!(!schema.is_a(Id::new("bpmn:CategoryValue"), "bpmn:RootElement"));
    }

    #[test]
    fn test_task_listener_only_allowed_in_user_tasks() {
        let schema = bpmn_schema();
        let listener = Id::new("ext:TaskListener");

        assert!(schema.is_allowed_in(listener, Id::new("bpmn:UserTask")));
        assert!(!schema.is_allowed_in(listener, Id::new("bpmn:ServiceTask")));
        assert!(schema.is_allowed_in(Id::new("ext:Property"), Id::new("bpmn:ServiceTask")));
    }
}

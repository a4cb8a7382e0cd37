//! Modeling behaviors: how diagram edits keep the semantic model consistent.
//!
//! The functions here are the building blocks shared by the command
//! handlers and the paste orchestrator. Each one only mutates the document
//! through a [`Transaction`], so whatever they do is undone with the command
//! that called them.

pub(crate) mod compensation;
pub(crate) mod containment;
pub(crate) mod label;
pub(crate) mod lane;

use log::debug;

use sextant_core::{
    ModelError,
    diagram::DiagramElement,
    geometry::{Bounds, Point},
    identifier::Id,
    schema::PropertyKind,
    semantic::{SemanticObject, Value},
};

use crate::{
    SextantError,
    command::{CommandContext, CommandHandler, CommandStack, Services, Transaction},
    document::Operation,
    rules::RuleContext,
};

pub(crate) fn set_property(
    transaction: &mut Transaction<'_>,
    object: Id,
    property: impl Into<Id>,
    value: Option<Value>,
) -> Result<(), SextantError> {
    transaction.apply(Operation::SetProperty {
        object,
        property: property.into(),
        value,
    })
}

/// Appends `item` to a list property unless it is already there.
pub(crate) fn append_to_list(
    transaction: &mut Transaction<'_>,
    object: Id,
    property: impl Into<Id>,
    item: Value,
) -> Result<(), SextantError> {
    let property = property.into();
    let mut items = transaction
        .document()
        .object(object)
        .ok_or(ModelError::UnknownObject(object))?
        .get_list(property)
        .to_vec();
    if items.contains(&item) {
        return Ok(());
    }
    items.push(item);
    set_property(transaction, object, property, Some(Value::List(items)))
}

/// Removes every item owning or referencing `id` from a list property.
///
/// The property is unset when the list becomes empty.
pub(crate) fn remove_from_list(
    transaction: &mut Transaction<'_>,
    object: Id,
    property: impl Into<Id>,
    id: Id,
) -> Result<(), SextantError> {
    let property = property.into();
    let Some(owner) = transaction.document().object(object) else {
        return Ok(());
    };
    let current = owner.get_list(property);
    let items: Vec<Value> = current
        .iter()
        .filter(|item| item.as_object() != Some(id) && item.as_reference() != Some(id))
        .cloned()
        .collect();
    if items.len() == current.len() {
        return Ok(());
    }
    let value = (!items.is_empty()).then_some(Value::List(items));
    set_property(transaction, object, property, value)
}

/// Removes `root` and every object it owns.
pub(crate) fn remove_subtree(transaction: &mut Transaction<'_>, root: Id) -> Result<(), SextantError> {
    let ids = transaction.document().model().arena().owned_subtree(root);
    for id in ids.into_iter().rev() {
        transaction.apply(Operation::RemoveObject(id))?;
    }
    Ok(())
}

/// Gives a participant its own process root element if it has none.
pub(crate) fn ensure_participant_process(
    transaction: &mut Transaction<'_>,
    participant: Id,
) -> Result<(), SextantError> {
    let has_process = transaction
        .document()
        .object(participant)
        .and_then(|participant| participant.get_reference("processRef"))
        .is_some_and(|process| transaction.document().object(process).is_some());
    if has_process {
        return Ok(());
    }

    let definitions = transaction.document().definitions();
    let process = transaction.generate_id("Process");
    let mut object = SemanticObject::new(process, Id::new("bpmn:Process"));
    object.set_parent(Some(definitions));
    object.set("isExecutable", Value::Boolean(false));
    transaction.apply(Operation::InsertObject(object))?;
    append_to_list(transaction, definitions, "rootElements", Value::Object(process))?;
    set_property(transaction, participant, "processRef", Some(Value::Reference(process)))
}

/// Gives a data object reference a data object next to it if it has none.
pub(crate) fn ensure_data_object(transaction: &mut Transaction<'_>, reference: Id) -> Result<(), SextantError> {
    let document = transaction.document();
    let Some(object) = document.object(reference) else {
        return Ok(());
    };
    if object
        .get_reference("dataObjectRef")
        .is_some_and(|data_object| document.object(data_object).is_some())
    {
        return Ok(());
    }
    let Some(container) = object.parent() else {
        return Ok(());
    };

    let data_object = transaction.generate_id("DataObject");
    let mut object = SemanticObject::new(data_object, Id::new("bpmn:DataObject"));
    object.set_parent(Some(container));
    transaction.apply(Operation::InsertObject(object))?;
    append_to_list(transaction, container, "flowElements", Value::Object(data_object))?;
    set_property(transaction, reference, "dataObjectRef", Some(Value::Reference(data_object)))
}

/// Placement of a new shape.
#[derive(Debug, Clone)]
pub(crate) struct ShapeSpec {
    pub id: Id,
    pub type_name: Id,
    pub business_object: Id,
    pub bounds: Bounds,
    pub parent: Id,
    pub host: Option<Id>,
    pub collapsed: bool,
    /// Where to put the external label, if one is created.
    pub label_bounds: Option<Bounds>,
}

/// Adds a shape for an existing business object and wires it semantically.
///
/// Shapes dropped on a lane are parented to the lane's participant; boundary
/// events are parented next to their host. The business object joins the
/// semantic container of its parent, flow nodes join the lane under their
/// centre and named elements get their external label.
pub(crate) fn add_shape(transaction: &mut Transaction<'_>, spec: ShapeSpec) -> Result<Id, SextantError> {
    let document = transaction.document();
    let mut parent = spec.parent;
    if let Some(host) = spec.host {
        let host = document.element(host).ok_or(ModelError::UnknownElement(host))?;
        parent = host.parent().unwrap_or(document.root());
    } else if !document.is_a(spec.type_name, "bpmn:Lane")
        && document
            .element(parent)
            .is_some_and(|parent| document.is_a(parent.type_name(), "bpmn:Lane"))
    {
        parent = containment::participant_of(document, parent).unwrap_or(parent);
    }

    let mut element = DiagramElement::shape(spec.id, spec.type_name, spec.business_object, spec.bounds)
        .with_parent(parent)
        .with_collapsed(spec.collapsed);
    if let Some(host) = spec.host {
        element = element.with_host(host);
    }
    transaction.apply(Operation::AddElement { element, index: None })?;

    if transaction.document().is_a(spec.type_name, "bpmn:Participant") {
        ensure_participant_process(transaction, spec.business_object)?;
    }
    containment::attach(transaction, spec.id)?;

    if let Some(host) = spec.host {
        let host_object = transaction
            .document()
            .element(host)
            .ok_or(ModelError::UnknownElement(host))?
            .business_object();
        set_property(
            transaction,
            spec.business_object,
            "attachedToRef",
            Some(Value::Reference(host_object)),
        )?;
    }
    if transaction.document().is_a(spec.type_name, "bpmn:FlowNode") {
        lane::assign(transaction, spec.id)?;
    }
    label::ensure(transaction, spec.id, spec.label_bounds)?;
    Ok(spec.id)
}

/// Placement of a new connection.
#[derive(Debug, Clone)]
pub(crate) struct ConnectionSpec {
    pub id: Id,
    pub type_name: Id,
    pub business_object: Id,
    pub source: Id,
    pub target: Id,
    /// Empty for a straight line between the endpoint centres.
    pub waypoints: Vec<Point>,
    pub label_bounds: Option<Bounds>,
}

/// Adds a connection for an existing business object and wires its
/// endpoints semantically.
pub(crate) fn add_connection(transaction: &mut Transaction<'_>, spec: ConnectionSpec) -> Result<Id, SextantError> {
    let document = transaction.document();
    let source = document
        .element(spec.source)
        .ok_or(ModelError::UnknownElement(spec.source))?;
    let target = document
        .element(spec.target)
        .ok_or(ModelError::UnknownElement(spec.target))?;

    let parent = if document.is_a(spec.type_name, "bpmn:MessageFlow") {
        document.root()
    } else {
        source.parent().unwrap_or(document.root())
    };
    let waypoints = if spec.waypoints.is_empty() {
        [source.extent(), target.extent()]
            .into_iter()
            .flatten()
            .map(Bounds::center)
            .collect()
    } else {
        spec.waypoints
    };
    let (source_object, target_object) = (source.business_object(), target.business_object());

    transaction.apply(Operation::AddElement {
        element: DiagramElement::connection(
            spec.id,
            spec.type_name,
            spec.business_object,
            spec.source,
            spec.target,
            waypoints,
        )
        .with_parent(parent),
        index: None,
    })?;

    let object = spec.business_object;
    let document = transaction.document();
    let single_source = ["bpmn:SequenceFlow", "bpmn:MessageFlow", "bpmn:Association"]
        .iter()
        .any(|type_name| document.is_a(spec.type_name, type_name));
    let listed_source = ["bpmn:DataInputAssociation", "bpmn:DataOutputAssociation"]
        .iter()
        .any(|type_name| document.is_a(spec.type_name, type_name));
    let is_sequence_flow = document.is_a(spec.type_name, "bpmn:SequenceFlow");

    if single_source {
        set_property(transaction, object, "sourceRef", Some(Value::Reference(source_object)))?;
    } else if listed_source {
        set_property(
            transaction,
            object,
            "sourceRef",
            Some(Value::List(vec![Value::Reference(source_object)])),
        )?;
    }
    if single_source || listed_source {
        set_property(transaction, object, "targetRef", Some(Value::Reference(target_object)))?;
    }
    if is_sequence_flow {
        append_to_list(transaction, source_object, "outgoing", Value::Reference(object))?;
        append_to_list(transaction, target_object, "incoming", Value::Reference(object))?;
    }

    containment::attach(transaction, spec.id)?;
    label::ensure(transaction, spec.id, spec.label_bounds)?;
    Ok(spec.id)
}

/// Removes an element together with everything that depends on it.
///
/// Labels, attachers, connections and children go first. The business
/// object is then unwired from its endpoints and lanes, detached from its
/// container and removed with everything it owns. A participant's process
/// goes with it unless another participant still uses it.
pub(crate) fn remove_element(transaction: &mut Transaction<'_>, id: Id) -> Result<(), SextantError> {
    loop {
        let element = transaction
            .document()
            .element(id)
            .ok_or(ModelError::UnknownElement(id))?;
        if element.is_root() {
            return Err(SextantError::Rejected {
                action: "elements.delete",
            });
        }
        let dependent = element
            .label_id()
            .or_else(|| element.attachers().first().copied())
            .or_else(|| element.incoming().first().copied())
            .or_else(|| element.outgoing().first().copied())
            .or_else(|| element.children().first().copied());
        match dependent {
            Some(dependent) => remove_element(transaction, dependent)?,
            None => break,
        }
    }

    let document = transaction.document();
    let element = document
        .element(id)
        .cloned()
        .ok_or(ModelError::UnknownElement(id))?;
    if element.is_label() {
        return transaction.apply(Operation::RemoveElement(id));
    }

    let object = element.business_object();
    let type_name = element.type_name();
    let endpoint_object =
        |endpoint: Option<Id>| endpoint.and_then(|endpoint| document.element(endpoint)).map(DiagramElement::business_object);
    let source_object = endpoint_object(element.source());
    let target_object = endpoint_object(element.target());
    let compensated = compensation::is_compensation_association(document, id)
        .then(|| element.target())
        .flatten();
    let is_flow_node = document.is_a(type_name, "bpmn:FlowNode");
    let is_sequence_flow = document.is_a(type_name, "bpmn:SequenceFlow");
    let process = document
        .is_a(type_name, "bpmn:Participant")
        .then(|| document.object(object).and_then(|participant| participant.get_reference("processRef")))
        .flatten();

    if is_sequence_flow {
        if let Some(source_object) = source_object {
            remove_from_list(transaction, source_object, "outgoing", object)?;
            let is_default = transaction
                .document()
                .object(source_object)
                .and_then(|source| source.get_reference("default"))
                == Some(object);
            if is_default {
                debug!(flow = object.to_string(); "Clearing default flow of removed connection");
                set_property(transaction, source_object, "default", None)?;
            }
        }
        if let Some(target_object) = target_object {
            remove_from_list(transaction, target_object, "incoming", object)?;
        }
    }
    if is_flow_node {
        lane::unassign(transaction, object)?;
    }

    transaction.apply(Operation::RemoveElement(id))?;
    containment::detach(transaction, object)?;
    remove_subtree(transaction, object)?;

    if let Some(process) = process {
        let still_used = transaction.document().model().arena().iter().any(|other| {
            transaction.document().is_a(other.type_name(), "bpmn:Participant")
                && other.get_reference("processRef") == Some(process)
        });
        if !still_used && transaction.document().object(process).is_some() {
            containment::detach(transaction, process)?;
            remove_subtree(transaction, process)?;
        }
    }

    if let Some(activity) = compensated {
        compensation::refresh(transaction, activity)?;
    }
    Ok(())
}

/// `shape.create`: creates a business object and its shape.
struct CreateShapeHandler;

impl CommandHandler for CreateShapeHandler {
    fn pre_execute(
        &self,
        context: &mut CommandContext,
        transaction: &mut Transaction<'_>,
        services: &Services<'_>,
    ) -> Result<(), SextantError> {
        let context = context.create_shape("shape.create")?;
        let document = transaction.document();
        if !document.schema().contains(context.type_name()) {
            return Err(ModelError::UnknownType(context.type_name()).into());
        }
        let target = document
            .element(context.parent())
            .ok_or(ModelError::UnknownElement(context.parent()))?;
        let mut rule_context = RuleContext::new(document)
            .with_element_type(context.type_name())
            .with_target(target);
        if let Some(host) = context.host() {
            let host = document.element(host).ok_or(ModelError::UnknownElement(host))?;
            rule_context = rule_context.with_host(host);
        }
        if !services.rules().allowed("shape.create", &rule_context).is_allowed() {
            return Err(SextantError::Rejected {
                action: "shape.create",
            });
        }
        Ok(())
    }

    fn execute(
        &self,
        context: &mut CommandContext,
        transaction: &mut Transaction<'_>,
        _services: &Services<'_>,
    ) -> Result<(), SextantError> {
        let context = context.create_shape("shape.create")?;
        let type_name = context.type_name();
        let id = transaction.generate_id(&type_name.local_name());
        transaction.apply(Operation::InsertObject(SemanticObject::new(id, type_name)))?;
        for (name, value) in context.properties() {
            set_property(transaction, id, *name, Some(value.clone()))?;
        }

        add_shape(
            transaction,
            ShapeSpec {
                id,
                type_name,
                business_object: id,
                bounds: context.bounds(),
                parent: context.parent(),
                host: context.host(),
                collapsed: false,
                label_bounds: None,
            },
        )?;
        if transaction.document().is_a(type_name, "bpmn:DataObjectReference") {
            ensure_data_object(transaction, id)?;
        }
        context.set_created(id);
        Ok(())
    }
}

/// `connection.create`: creates a business object and its connection.
struct CreateConnectionHandler;

impl CommandHandler for CreateConnectionHandler {
    fn pre_execute(
        &self,
        context: &mut CommandContext,
        transaction: &mut Transaction<'_>,
        services: &Services<'_>,
    ) -> Result<(), SextantError> {
        let context = context.create_connection("connection.create")?;
        let document = transaction.document();
        let source = document
            .element(context.source())
            .ok_or(ModelError::UnknownElement(context.source()))?;
        let target = document
            .element(context.target())
            .ok_or(ModelError::UnknownElement(context.target()))?;
        let rule_context = RuleContext::new(document)
            .with_element_type(context.type_name())
            .with_source(source)
            .with_target(target);
        if !services.rules().allowed("connection.create", &rule_context).is_allowed() {
            return Err(SextantError::Rejected {
                action: "connection.create",
            });
        }
        Ok(())
    }

    fn execute(
        &self,
        context: &mut CommandContext,
        transaction: &mut Transaction<'_>,
        _services: &Services<'_>,
    ) -> Result<(), SextantError> {
        let context = context.create_connection("connection.create")?;
        let type_name = context.type_name();
        let id = transaction.generate_id(&type_name.local_name());
        transaction.apply(Operation::InsertObject(SemanticObject::new(id, type_name)))?;
        for (name, value) in context.properties() {
            set_property(transaction, id, *name, Some(value.clone()))?;
        }

        add_connection(
            transaction,
            ConnectionSpec {
                id,
                type_name,
                business_object: id,
                source: context.source(),
                target: context.target(),
                waypoints: context.waypoints().to_vec(),
                label_bounds: None,
            },
        )?;
        context.set_created(id);
        Ok(())
    }

    fn post_execute(
        &self,
        context: &mut CommandContext,
        transaction: &mut Transaction<'_>,
        _services: &Services<'_>,
    ) -> Result<(), SextantError> {
        let context = context.create_connection("connection.create")?;
        match context.created() {
            Some(connection) => compensation::enforce(transaction, connection),
            None => Ok(()),
        }
    }
}

/// `elements.delete`: removes elements and everything depending on them.
struct RemoveElementsHandler;

impl CommandHandler for RemoveElementsHandler {
    fn pre_execute(
        &self,
        context: &mut CommandContext,
        transaction: &mut Transaction<'_>,
        _services: &Services<'_>,
    ) -> Result<(), SextantError> {
        let context = context.remove_elements("elements.delete")?;
        let document = transaction.document();
        if let Some(missing) = context
            .elements()
            .iter()
            .find(|id| document.element(**id).is_none())
        {
            return Err(ModelError::UnknownElement(*missing).into());
        }
        Ok(())
    }

    fn execute(
        &self,
        context: &mut CommandContext,
        transaction: &mut Transaction<'_>,
        _services: &Services<'_>,
    ) -> Result<(), SextantError> {
        let context = context.remove_elements("elements.delete")?;
        for id in context.elements() {
            // Already gone with an element removed before it.
            if transaction.document().element(*id).is_some() {
                remove_element(transaction, *id)?;
            }
        }
        Ok(())
    }
}

/// `element.updateProperties`: edits the business object of an element.
struct UpdatePropertiesHandler;

impl CommandHandler for UpdatePropertiesHandler {
    fn execute(
        &self,
        context: &mut CommandContext,
        transaction: &mut Transaction<'_>,
        _services: &Services<'_>,
    ) -> Result<(), SextantError> {
        let context = context.update_properties("element.updateProperties")?;
        let element = transaction
            .document()
            .element(context.element())
            .ok_or(ModelError::UnknownElement(context.element()))?;
        let owner = element.label_target().unwrap_or(element.id());
        let object = element.business_object();

        for (name, value) in context.properties() {
            validate_update(transaction, object, *name, value.as_ref())?;
            set_property(transaction, object, *name, value.clone())?;
        }

        let named = context
            .properties()
            .iter()
            .any(|(name, value)| *name == "name" && value.is_some());
        if named {
            label::ensure(transaction, owner, None)?;
        }
        Ok(())
    }
}

fn validate_update(
    transaction: &Transaction<'_>,
    object: Id,
    property: Id,
    value: Option<&Value>,
) -> Result<(), SextantError> {
    let invalid = |reason: &str| SextantError::InvalidProperty {
        object,
        property,
        reason: reason.to_string(),
    };
    let document = transaction.document();
    let descriptor = document
        .object(object)
        .and_then(|target| document.schema().property(target.type_name(), property));
    if descriptor.is_some_and(|descriptor| descriptor.is_id()) {
        return Err(invalid("identifiers cannot be changed"));
    }

    if property == "default" {
        if let Some(value) = value {
            let is_outgoing_flow = value
                .as_reference()
                .and_then(|flow| document.object(flow))
                .is_some_and(|flow| {
                    document.is_a(flow.type_name(), "bpmn:SequenceFlow")
                        && flow.get_reference("sourceRef") == Some(object)
                });
            if !is_outgoing_flow {
                return Err(invalid("must reference an outgoing sequence flow"));
            }
        }
    }
    Ok(())
}

/// `object.create`: creates a semantic object owned by another one.
struct CreateObjectHandler;

impl CommandHandler for CreateObjectHandler {
    fn pre_execute(
        &self,
        context: &mut CommandContext,
        transaction: &mut Transaction<'_>,
        _services: &Services<'_>,
    ) -> Result<(), SextantError> {
        let context = context.create_object("object.create")?;
        let document = transaction.document();
        if !document.schema().contains(context.type_name()) {
            return Err(ModelError::UnknownType(context.type_name()).into());
        }
        let owner = document
            .object(context.owner())
            .ok_or(ModelError::UnknownObject(context.owner()))?;
        let accepts = document
            .schema()
            .property(owner.type_name(), context.property())
            .is_some_and(|descriptor| match descriptor.kind() {
                PropertyKind::Owned(value_type) => document.schema().is_a(context.type_name(), value_type),
                _ => false,
            });
        if !accepts {
            return Err(SextantError::InvalidProperty {
                object: context.owner(),
                property: context.property(),
                reason: format!("cannot own a {}", context.type_name()),
            });
        }
        Ok(())
    }

    fn execute(
        &self,
        context: &mut CommandContext,
        transaction: &mut Transaction<'_>,
        _services: &Services<'_>,
    ) -> Result<(), SextantError> {
        let context = context.create_object("object.create")?;
        let (owner, property, type_name) = (context.owner(), context.property(), context.type_name());
        let id = transaction.generate_id(&type_name.local_name());
        let mut object = SemanticObject::new(id, type_name);
        object.set_parent(Some(owner));
        transaction.apply(Operation::InsertObject(object))?;
        for (name, value) in context.properties() {
            set_property(transaction, id, *name, Some(value.clone()))?;
        }

        let document = transaction.document();
        let is_many = document
            .object(owner)
            .and_then(|owner| document.schema().property(owner.type_name(), property))
            .is_some_and(|descriptor| descriptor.is_many());
        if is_many {
            append_to_list(transaction, owner, property, Value::Object(id))?;
        } else {
            let previous = document
                .object(owner)
                .and_then(|owner| owner.get_object(property));
            if let Some(previous) = previous {
                remove_subtree(transaction, previous)?;
            }
            set_property(transaction, owner, property, Some(Value::Object(id)))?;
        }
        context.set_created(id);
        Ok(())
    }
}

/// Registers the modeling commands on `stack`.
pub(crate) fn register_handlers(stack: &mut CommandStack) {
    stack.register("shape.create", Box::new(CreateShapeHandler));
    stack.register("connection.create", Box::new(CreateConnectionHandler));
    stack.register("elements.delete", Box::new(RemoveElementsHandler));
    stack.register("element.updateProperties", Box::new(UpdatePropertiesHandler));
    stack.register("object.create", Box::new(CreateObjectHandler));
}

//! Built-in BPMN modeling rules.

use sextant_core::{diagram::DiagramElement, identifier::Id};

use super::{DEFAULT_RULE_PRIORITY, RuleContext, RuleEngine, RuleProvider, Verdict};
use crate::{
    document::Document,
    modeling::{compensation, containment},
};

/// Containment, connection and copy rules of BPMN diagrams.
///
/// | Action | Rule |
/// |---|---|
/// | `element.copy` | A lane needs its participant and a boundary event its host among the copied elements. |
/// | `elements.paste` | Every top-level shape must be allowed inside the target. |
/// | `shape.create` | The new shape must be allowed inside its parent; boundary events attach to activities. |
/// | `connection.create` | Sequence flows stay in one scope, message flows cross participants, data associations link data and activities. |
#[derive(Debug, Clone, Copy, Default)]
pub struct BpmnRules;

impl RuleProvider for BpmnRules {
    fn register_rules(&self, engine: &mut RuleEngine) {
        engine.add_rule(&["element.copy"], DEFAULT_RULE_PRIORITY, can_copy);
        engine.add_rule(&["elements.paste"], DEFAULT_RULE_PRIORITY, can_paste);
        engine.add_rule(&["shape.create"], DEFAULT_RULE_PRIORITY, can_create_shape);
        engine.add_rule(&["connection.create"], DEFAULT_RULE_PRIORITY, can_connect);
    }
}

fn can_copy(context: &RuleContext<'_>) -> Verdict {
    let Some(element) = context.element() else {
        return Verdict::Abstain;
    };
    let document = context.document();

    if document.is_a(element.type_name(), "bpmn:Lane") {
        let participant = document
            .registry()
            .ancestors(element.id())
            .into_iter()
            .find(|ancestor| {
                document
                    .element(*ancestor)
                    .is_some_and(|ancestor| document.is_a(ancestor.type_name(), "bpmn:Participant"))
            });
        return match participant {
            Some(participant) if context.contains_element(participant) => Verdict::Allow,
            _ => Verdict::Deny,
        };
    }

    if let Some(host) = element.host() {
        return if context.contains_element(host) {
            Verdict::Allow
        } else {
            Verdict::Deny
        };
    }

    Verdict::Abstain
}

fn can_paste(context: &RuleContext<'_>) -> Verdict {
    let Some(target) = context.target() else {
        return Verdict::Deny;
    };
    let document = context.document();
    let all_contained = context
        .elements()
        .iter()
        .filter(|element| element.is_shape())
        .all(|element| can_contain(document, target, element.type_name()));
    if all_contained {
        Verdict::Allow
    } else {
        Verdict::Deny
    }
}

fn can_create_shape(context: &RuleContext<'_>) -> Verdict {
    let (Some(element_type), Some(target)) = (context.element_type(), context.target()) else {
        return Verdict::Abstain;
    };
    let document = context.document();

    if document.is_a(element_type, "bpmn:BoundaryEvent") {
        return match context.host() {
            Some(host) if host.is_shape() && document.is_a(host.type_name(), "bpmn:Activity") => {
                Verdict::Attach
            }
            _ => Verdict::Deny,
        };
    }
    if context.host().is_some() {
        return Verdict::Deny;
    }

    if can_contain(document, target, element_type) {
        Verdict::Allow
    } else {
        Verdict::Deny
    }
}

fn can_connect(context: &RuleContext<'_>) -> Verdict {
    let (Some(connection_type), Some(source), Some(target)) =
        (context.element_type(), context.source(), context.target())
    else {
        return Verdict::Abstain;
    };
    let document = context.document();
    if source.is_root() || target.is_root() || source.is_label() || target.is_label() {
        return Verdict::Deny;
    }
    let is = |element: &DiagramElement, type_name: &str| document.is_a(element.type_name(), type_name);
    let is_data = |element: &DiagramElement| {
        is(element, "bpmn:DataObjectReference") || is(element, "bpmn:DataStoreReference")
    };

    let allowed = match connection_type.as_string().as_str() {
        "bpmn:SequenceFlow" => {
            is(source, "bpmn:FlowNode")
                && is(target, "bpmn:FlowNode")
                && !is(source, "bpmn:EndEvent")
                && !is(target, "bpmn:StartEvent")
                && !is(target, "bpmn:BoundaryEvent")
                && source.id() != target.id()
                && flow_scope(document, source).is_some()
                && flow_scope(document, source) == flow_scope(document, target)
        }
        "bpmn:MessageFlow" => match (
            containment::participant_of(document, source.id()),
            containment::participant_of(document, target.id()),
        ) {
            (Some(source_participant), Some(target_participant)) => source_participant != target_participant,
            _ => false,
        },
        "bpmn:Association" => {
            is(source, "bpmn:TextAnnotation")
                || is(target, "bpmn:TextAnnotation")
                || (compensation::is_compensation_boundary(document, source.id())
                    && is(target, "bpmn:Activity"))
        }
        "bpmn:DataInputAssociation" => is_data(source) && is(target, "bpmn:Activity"),
        "bpmn:DataOutputAssociation" => is(source, "bpmn:Activity") && is_data(target),
        _ => false,
    };

    if allowed { Verdict::Allow } else { Verdict::Deny }
}

/// Checks whether a shape of `element_type` may be placed inside `target`.
///
/// Participants live in collaborations, lanes in participants or lanes, and
/// flow elements in processes, participants, lanes or expanded sub-processes.
/// Artifacts may additionally live in a collaboration.
pub fn can_contain(document: &Document, target: &DiagramElement, element_type: Id) -> bool {
    if target.is_label() || target.is_connection() {
        return false;
    }
    let target_type = target.type_name();
    if document.is_a(element_type, "bpmn:Participant") {
        return target.is_root() && document.is_a(target_type, "bpmn:Collaboration");
    }
    if document.is_a(element_type, "bpmn:Lane") {
        return document.is_a(target_type, "bpmn:Participant") || document.is_a(target_type, "bpmn:Lane");
    }
    if document.is_a(element_type, "bpmn:FlowElement") {
        return is_flow_container(document, target);
    }
    if document.is_a(element_type, "bpmn:Artifact") {
        return is_flow_container(document, target)
            || (target.is_root() && document.is_a(target_type, "bpmn:Collaboration"));
    }
    false
}

fn is_flow_container(document: &Document, element: &DiagramElement) -> bool {
    let type_name = element.type_name();
    (element.is_root() && document.is_a(type_name, "bpmn:Process"))
        || (document.is_a(type_name, "bpmn:Participant") && !element.is_collapsed())
        || document.is_a(type_name, "bpmn:Lane")
        || (document.is_a(type_name, "bpmn:SubProcess") && !element.is_collapsed())
}

/// Nearest diagram ancestor owning the flow elements of `element`.
fn flow_scope(document: &Document, element: &DiagramElement) -> Option<Id> {
    document
        .registry()
        .ancestors(element.id())
        .into_iter()
        .find(|ancestor| {
            document.element(*ancestor).is_some_and(|ancestor| {
                !document.is_a(ancestor.type_name(), "bpmn:Lane") && is_flow_container(document, ancestor)
            })
        })
}

//! Rule engine: answers whether a modeling action is allowed in a context.
//!
//! Rules are predicates registered for one or more action names with a
//! priority. [`RuleEngine::allowed`] consults the rules of an action from the
//! highest priority down and returns the first verdict that is not
//! [`Verdict::Abstain`]. Rule sets are bundled as [`RuleProvider`]s.

mod bpmn;

use std::{collections::HashMap, rc::Rc};

use log::debug;

use sextant_core::{diagram::DiagramElement, identifier::Id};

use crate::document::Document;

pub use bpmn::{BpmnRules, can_contain};

/// Default priority of a rule.
pub const DEFAULT_RULE_PRIORITY: i32 = 1000;

/// Outcome of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny,
    /// No opinion; the next rule decides. Permits when no rule decides.
    Abstain,
    /// Allowed as an attachment to the context's host.
    Attach,
}

impl Verdict {
    /// Checks whether the verdict permits the action.
    pub fn is_allowed(self) -> bool {
        self != Verdict::Deny
    }
}

/// Everything a rule may look at.
///
/// Only the fields relevant to an action are set; the rest stay `None` or
/// empty.
#[derive(Clone, Copy)]
pub struct RuleContext<'a> {
    document: &'a Document,
    element: Option<&'a DiagramElement>,
    elements: &'a [&'a DiagramElement],
    target: Option<&'a DiagramElement>,
    source: Option<&'a DiagramElement>,
    element_type: Option<Id>,
    host: Option<&'a DiagramElement>,
}

impl<'a> RuleContext<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self {
            document,
            element: None,
            elements: &[],
            target: None,
            source: None,
            element_type: None,
            host: None,
        }
    }

    pub fn with_element(mut self, element: &'a DiagramElement) -> Self {
        self.element = Some(element);
        self
    }

    pub fn with_elements(mut self, elements: &'a [&'a DiagramElement]) -> Self {
        self.elements = elements;
        self
    }

    pub fn with_target(mut self, target: &'a DiagramElement) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_source(mut self, source: &'a DiagramElement) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_element_type(mut self, element_type: Id) -> Self {
        self.element_type = Some(element_type);
        self
    }

    pub fn with_host(mut self, host: &'a DiagramElement) -> Self {
        self.host = Some(host);
        self
    }

    pub fn document(&self) -> &'a Document {
        self.document
    }

    /// The single element the action applies to.
    pub fn element(&self) -> Option<&'a DiagramElement> {
        self.element
    }

    /// All elements taking part in a multi-element action.
    pub fn elements(&self) -> &'a [&'a DiagramElement] {
        self.elements
    }

    pub fn target(&self) -> Option<&'a DiagramElement> {
        self.target
    }

    pub fn source(&self) -> Option<&'a DiagramElement> {
        self.source
    }

    /// Type of an element that does not exist yet.
    pub fn element_type(&self) -> Option<Id> {
        self.element_type
    }

    pub fn host(&self) -> Option<&'a DiagramElement> {
        self.host
    }

    /// Checks whether `id` is among [`RuleContext::elements`].
    pub fn contains_element(&self, id: Id) -> bool {
        self.elements.iter().any(|element| element.id() == id)
    }
}

type RuleFn = dyn Fn(&RuleContext<'_>) -> Verdict;

#[derive(Clone)]
struct Rule {
    priority: i32,
    check: Rc<RuleFn>,
}

/// Priority-ordered rules per action name.
#[derive(Clone, Default)]
pub struct RuleEngine {
    rules: HashMap<String, Vec<Rule>>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `rule` for every action in `actions`.
    ///
    /// Rules with a higher priority run first; rules with equal priority run
    /// in registration order.
    pub fn add_rule<F>(&mut self, actions: &[&str], priority: i32, rule: F)
    where
        F: Fn(&RuleContext<'_>) -> Verdict + 'static,
    {
        let check: Rc<RuleFn> = Rc::new(rule);
        for action in actions {
            let rules = self.rules.entry((*action).to_string()).or_default();
            let position = rules
                .iter()
                .position(|existing| existing.priority < priority)
                .unwrap_or(rules.len());
            rules.insert(
                position,
                Rule {
                    priority,
                    check: Rc::clone(&check),
                },
            );
        }
    }

    /// Lets `provider` register its rules.
    pub fn register_provider(&mut self, provider: &dyn RuleProvider) {
        provider.register_rules(self);
    }

    /// Evaluates the rules of `action`.
    ///
    /// Returns the first verdict other than [`Verdict::Abstain`], or
    /// `Abstain` when no rule has an opinion.
    pub fn allowed(&self, action: &str, context: &RuleContext<'_>) -> Verdict {
        let verdict = self
            .rules
            .get(action)
            .into_iter()
            .flatten()
            .map(|rule| (rule.check)(context))
            .find(|verdict| *verdict != Verdict::Abstain)
            .unwrap_or(Verdict::Abstain);
        if verdict == Verdict::Deny {
            debug!(action = action; "Rules denied action");
        }
        verdict
    }
}

/// A bundle of rules.
pub trait RuleProvider {
    fn register_rules(&self, engine: &mut RuleEngine);
}

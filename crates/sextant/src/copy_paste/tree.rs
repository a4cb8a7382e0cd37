use indexmap::IndexMap;
use log::debug;

use sextant_core::{ModelError, diagram::DiagramElement, identifier::Id};

use crate::{
    SextantError,
    config::{CopyPasteConfig, LaneSelection},
    document::Document,
    modeling::containment,
    rules::{RuleContext, RuleEngine, Verdict},
};

/// One element of a copied selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    element: DiagramElement,
    depth: usize,
    priority: u8,
}

impl Descriptor {
    /// The original diagram element, as it was when copied.
    pub fn element(&self) -> &DiagramElement {
        &self.element
    }

    pub fn id(&self) -> Id {
        self.element.id()
    }

    pub fn type_name(&self) -> Id {
        self.element.type_name()
    }

    /// Containment hops from the nearest selected ancestor.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Creation rank within a depth: shapes, attached shapes, connections,
    /// labels.
    pub fn priority(&self) -> u8 {
        self.priority
    }
}

fn priority(element: &DiagramElement) -> u8 {
    if element.is_label() {
        3
    } else if element.is_connection() {
        2
    } else if element.host().is_some() {
        1
    } else {
        0
    }
}

/// Builds the descriptor tree of a selection.
pub struct TreeBuilder<'a> {
    document: &'a Document,
    rules: &'a RuleEngine,
    config: &'a CopyPasteConfig,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(document: &'a Document, rules: &'a RuleEngine, config: &'a CopyPasteConfig) -> Self {
        Self {
            document,
            rules,
            config,
        }
    }

    /// Returns the descriptors of `selection` grouped by depth.
    ///
    /// Labels stand for their owner and the root is ignored. Children,
    /// labels and connections of selected elements are included;
    /// connections missing an endpoint are dropped. The result is empty
    /// when a rule denies copying one of the selected elements.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownElement`] for an id that is not in the
    /// diagram.
    pub fn build(&self, selection: &[Id]) -> Result<Vec<Vec<Descriptor>>, SextantError> {
        let selected = self.normalize(selection)?;
        if selected.is_empty() {
            return Ok(Vec::new());
        }
        let registry = self.document.registry();
        let top_level: Vec<Id> = selected
            .iter()
            .copied()
            .filter(|id| !registry.ancestors(*id).iter().any(|ancestor| selected.contains(ancestor)))
            .collect();

        let selected_elements: Vec<&DiagramElement> = selected.iter().filter_map(|id| registry.get(*id)).collect();
        for id in &top_level {
            if self.verdict(*id, &selected_elements) == Verdict::Deny {
                debug!(element = id.to_string(); "Copy refused");
                return Ok(Vec::new());
            }
        }

        let mut depths = IndexMap::new();
        for id in &top_level {
            self.visit(*id, 0, &mut depths);
        }
        self.prune(&top_level, &mut depths);

        let levels = depths.values().copied().max().map_or(0, |max| max + 1);
        let mut tree: Vec<Vec<Descriptor>> = vec![Vec::new(); levels];
        for (id, depth) in &depths {
            if let Some(element) = registry.get(*id) {
                tree[*depth].push(Descriptor {
                    element: element.clone(),
                    depth: *depth,
                    priority: priority(element),
                });
            }
        }
        for level in &mut tree {
            level.sort_by_key(Descriptor::priority);
        }
        tree.retain(|level| !level.is_empty());
        Ok(tree)
    }

    fn normalize(&self, selection: &[Id]) -> Result<Vec<Id>, SextantError> {
        let document = self.document;
        let mut selected = Vec::new();
        for id in selection {
            let element = document.element(*id).ok_or(ModelError::UnknownElement(*id))?;
            let mut id = element.label_target().unwrap_or(*id);
            let Some(element) = document.element(id) else {
                continue;
            };
            if element.is_root() {
                continue;
            }
            if document.is_a(element.type_name(), "bpmn:Lane")
                && self.config.lane_selection() == LaneSelection::IncludeParticipant
            {
                id = containment::participant_of(document, id).unwrap_or(id);
            }
            if !selected.contains(&id) {
                selected.push(id);
            }
        }
        Ok(selected)
    }

    fn verdict(&self, id: Id, elements: &[&DiagramElement]) -> Verdict {
        let Some(element) = self.document.element(id) else {
            return Verdict::Deny;
        };
        let context = RuleContext::new(self.document)
            .with_element(element)
            .with_elements(elements);
        self.rules.allowed("element.copy", &context)
    }

    /// Collects `id` with its label, connections and children.
    ///
    /// An element reached again at a greater depth moves there, so it is
    /// created after the containers it was found in.
    fn visit(&self, id: Id, depth: usize, depths: &mut IndexMap<Id, usize>) {
        if let Some(existing) = depths.get(&id) {
            if *existing >= depth {
                return;
            }
            depths.shift_remove(&id);
        }
        depths.insert(id, depth);

        let Some(element) = self.document.element(id) else {
            return;
        };
        if let Some(label) = element.label_id() {
            self.visit(label, depth, depths);
        }
        for connection in element.incoming().iter().chain(element.outgoing()) {
            self.visit(*connection, depth, depths);
        }
        for child in element.children() {
            self.visit(*child, depth + 1, depths);
        }
    }

    /// Drops collected elements whose relations were not collected, or that
    /// the rules refuse to copy, until nothing changes.
    ///
    /// Connections and labels hang off their endpoints and owner rather than
    /// their diagram parent, which is often an uncopied container such as
    /// the collaboration holding a message flow.
    fn prune(&self, top_level: &[Id], depths: &mut IndexMap<Id, usize>) {
        let registry = self.document.registry();
        loop {
            let included: Vec<&DiagramElement> = depths.keys().filter_map(|id| registry.get(*id)).collect();
            let dropped: Vec<Id> = included
                .iter()
                .filter(|element| {
                    let depth = depths.get(&element.id()).copied().unwrap_or_default();
                    let missing = |relation: Option<Id>| relation.is_some_and(|relation| !depths.contains_key(&relation));
                    let contained = !element.is_connection() && !element.is_label();
                    let detached = missing(element.source())
                        || missing(element.target())
                        || missing(element.label_target())
                        || missing(element.host())
                        || (contained && depth > 0 && missing(element.parent()));
                    detached || (!top_level.contains(&element.id()) && self.verdict(element.id(), &included) == Verdict::Deny)
                })
                .map(|element| element.id())
                .collect();
            if dropped.is_empty() {
                return;
            }
            for id in dropped {
                debug!(element = id.to_string(); "Dropping element from copy");
                depths.shift_remove(&id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Modeler,
        command::{CreateConnectionContext, CreateShapeContext},
        config::{ModelerConfig, RootElementPolicy},
        geometry::{Bounds, Point, Size},
    };

    fn bounds(x: f32, y: f32, width: f32, height: f32) -> Bounds {
        Bounds::new_from_top_left(Point::new(x, y), Size::new(width, height))
    }

    fn build(modeler: &Modeler, selection: &[Id]) -> Vec<Vec<Descriptor>> {
        let mut rules = RuleEngine::new();
        rules.register_provider(&crate::rules::BpmnRules);
        TreeBuilder::new(modeler.document(), &rules, modeler.config().copy_paste())
            .build(selection)
            .unwrap()
    }

    fn ids(level: &[Descriptor]) -> Vec<Id> {
        level.iter().map(Descriptor::id).collect()
    }

    #[test]
    fn test_sub_process_children_are_one_level_deeper() {
        let mut modeler = Modeler::new(ModelerConfig::default()).unwrap();
        let root = modeler.document().root();
        let sub_process = modeler
            .create_shape(CreateShapeContext::new("bpmn:SubProcess", root, bounds(0.0, 0.0, 400.0, 200.0)))
            .unwrap();
        let first = modeler
            .create_shape(CreateShapeContext::new("bpmn:Task", sub_process, bounds(20.0, 20.0, 100.0, 80.0)))
            .unwrap();
        let second = modeler
            .create_shape(CreateShapeContext::new("bpmn:Task", sub_process, bounds(200.0, 20.0, 100.0, 80.0)))
            .unwrap();
        let flow = modeler
            .create_connection(CreateConnectionContext::new("bpmn:SequenceFlow", first, second))
            .unwrap();

        // The child is selected too; it must not appear twice.
        let tree = build(&modeler, &[sub_process, first]);
        assert_eq!(tree.len(), 2);
        assert_eq!(ids(&tree[0]), vec![sub_process]);
        assert_eq!(ids(&tree[1]), vec![first, second, flow]);
    }

    #[test]
    fn test_dangling_connections_are_dropped() {
        let mut modeler = Modeler::new(ModelerConfig::default()).unwrap();
        let root = modeler.document().root();
        let first = modeler
            .create_shape(CreateShapeContext::new("bpmn:Task", root, bounds(0.0, 0.0, 100.0, 80.0)))
            .unwrap();
        let second = modeler
            .create_shape(CreateShapeContext::new("bpmn:Task", root, bounds(200.0, 0.0, 100.0, 80.0)))
            .unwrap();
        let flow = modeler
            .create_connection(CreateConnectionContext::new("bpmn:SequenceFlow", first, second))
            .unwrap();

        let tree = build(&modeler, &[first, flow]);
        assert_eq!(tree.len(), 1);
        assert_eq!(ids(&tree[0]), vec![first]);

        let tree = build(&modeler, &[first, second]);
        assert_eq!(ids(&tree[0]), vec![first, second, flow]);
    }

    #[test]
    fn test_message_flow_between_copied_participants_is_kept() {
        let mut modeler = Modeler::collaboration(ModelerConfig::default()).unwrap();
        let root = modeler.document().root();
        let buyer = modeler
            .create_shape(CreateShapeContext::new("bpmn:Participant", root, bounds(0.0, 0.0, 600.0, 200.0)))
            .unwrap();
        let seller = modeler
            .create_shape(CreateShapeContext::new("bpmn:Participant", root, bounds(0.0, 300.0, 600.0, 200.0)))
            .unwrap();
        let order = modeler
            .create_shape(CreateShapeContext::new("bpmn:Task", buyer, bounds(100.0, 60.0, 100.0, 80.0)))
            .unwrap();
        let confirm = modeler
            .create_shape(CreateShapeContext::new("bpmn:Task", seller, bounds(100.0, 360.0, 100.0, 80.0)))
            .unwrap();
        let message = modeler
            .create_connection(CreateConnectionContext::new("bpmn:MessageFlow", order, confirm))
            .unwrap();

        let tree = build(&modeler, &[buyer, seller]);
        assert_eq!(ids(&tree[0]), vec![buyer, seller]);
        assert!(ids(&tree[1]).contains(&message));
    }

    #[test]
    fn test_association_into_copied_sub_process_is_kept() {
        let mut modeler = Modeler::new(ModelerConfig::default()).unwrap();
        let root = modeler.document().root();
        let sub_process = modeler
            .create_shape(CreateShapeContext::new("bpmn:SubProcess", root, bounds(0.0, 0.0, 400.0, 200.0)))
            .unwrap();
        let task = modeler
            .create_shape(CreateShapeContext::new("bpmn:Task", sub_process, bounds(50.0, 50.0, 100.0, 80.0)))
            .unwrap();
        let note = modeler
            .create_shape(CreateShapeContext::new("bpmn:TextAnnotation", root, bounds(500.0, 0.0, 100.0, 30.0)))
            .unwrap();
        let association = modeler
            .create_connection(CreateConnectionContext::new("bpmn:Association", note, task))
            .unwrap();

        let tree = build(&modeler, &[sub_process, note]);
        let all: Vec<Id> = tree.iter().flat_map(|level| ids(level)).collect();
        assert!(all.contains(&association));
    }

    #[test]
    fn test_lanes_without_participant() {
        let mut modeler = Modeler::collaboration(ModelerConfig::default()).unwrap();
        let root = modeler.document().root();
        let participant = modeler
            .create_shape(CreateShapeContext::new("bpmn:Participant", root, bounds(0.0, 0.0, 600.0, 300.0)))
            .unwrap();
        let upper = modeler
            .create_shape(CreateShapeContext::new("bpmn:Lane", participant, bounds(30.0, 0.0, 570.0, 150.0)))
            .unwrap();
        let lower = modeler
            .create_shape(CreateShapeContext::new("bpmn:Lane", participant, bounds(30.0, 150.0, 570.0, 150.0)))
            .unwrap();

        assert!(build(&modeler, &[upper, lower]).is_empty());

        let config = ModelerConfig::new(
            CopyPasteConfig::new(LaneSelection::IncludeParticipant, RootElementPolicy::CloneOnce),
            Default::default(),
        );
        let mut rules = RuleEngine::new();
        rules.register_provider(&crate::rules::BpmnRules);
        let tree = TreeBuilder::new(modeler.document(), &rules, config.copy_paste())
            .build(&[upper, lower])
            .unwrap();
        assert_eq!(ids(&tree[0]), vec![participant]);
        assert_eq!(ids(&tree[1]), vec![upper, lower]);
    }

    #[test]
    fn test_boundary_event_needs_its_host() {
        let mut modeler = Modeler::new(ModelerConfig::default()).unwrap();
        let root = modeler.document().root();
        let task = modeler
            .create_shape(CreateShapeContext::new("bpmn:Task", root, bounds(0.0, 0.0, 100.0, 80.0)))
            .unwrap();
        let boundary = modeler
            .create_shape(
                CreateShapeContext::new("bpmn:BoundaryEvent", root, bounds(32.0, 62.0, 36.0, 36.0)).with_host(task),
            )
            .unwrap();

        assert!(build(&modeler, &[boundary]).is_empty());
        let tree = build(&modeler, &[boundary, task]);
        assert_eq!(ids(&tree[0]), vec![task, boundary]);
        assert_eq!(tree[0][1].priority(), 1);
    }

    #[test]
    fn test_unknown_element_is_an_error() {
        let modeler = Modeler::new(ModelerConfig::default()).unwrap();
        let mut rules = RuleEngine::new();
        rules.register_provider(&crate::rules::BpmnRules);
        let result = TreeBuilder::new(modeler.document(), &rules, modeler.config().copy_paste())
            .build(&[Id::new("Missing_1")]);
        assert!(matches!(
            result,
            Err(SextantError::Model(ModelError::UnknownElement(_)))
        ));
    }
}

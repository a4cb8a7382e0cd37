use std::rc::Rc;

use log::{debug, info};

use sextant_core::{
    ModelError,
    geometry::Point,
    identifier::Id,
    schema::bpmn_schema,
    semantic::Value,
};

use crate::{
    SextantError,
    clone::{CloneHooks, register_bpmn_rules},
    command::{
        CommandContext, CommandStack, CreateConnectionContext, CreateObjectContext, CreateShapeContext, PasteContext,
        RemoveElementsContext, Services, UpdatePropertiesContext,
    },
    config::ModelerConfig,
    copy_paste::{ClipboardContents, PasteHandler, TreeBuilder, register_resolvers},
    document::Document,
    modeling,
    rules::{BpmnRules, RuleEngine, RuleProvider},
};

/// A modeling session over one BPMN document.
///
/// Owns the document together with its command stack, rules and clone
/// hooks. Every mutating method runs exactly one command, so each call is
/// one undo step.
pub struct Modeler {
    config: ModelerConfig,
    document: Document,
    commands: CommandStack,
    rules: RuleEngine,
    hooks: CloneHooks,
}

impl Modeler {
    /// Starts a session on an empty process diagram.
    ///
    /// # Errors
    ///
    /// Returns an error if the BPMN schema lacks the root types.
    pub fn new(config: ModelerConfig) -> Result<Self, SextantError> {
        let document = Document::process(Rc::new(bpmn_schema()))?;
        Ok(Self::with_document(config, document))
    }

    /// Starts a session on an empty collaboration diagram.
    ///
    /// # Errors
    ///
    /// Returns an error if the BPMN schema lacks the root types.
    pub fn collaboration(config: ModelerConfig) -> Result<Self, SextantError> {
        let document = Document::collaboration(Rc::new(bpmn_schema()))?;
        Ok(Self::with_document(config, document))
    }

    /// Starts a session on an existing document with an empty history.
    pub fn with_document(config: ModelerConfig, document: Document) -> Self {
        let mut rules = RuleEngine::new();
        rules.register_provider(&BpmnRules);

        let mut hooks = CloneHooks::new();
        register_bpmn_rules(&mut hooks);
        register_resolvers(&mut hooks, config.copy_paste().root_elements());

        let mut commands = CommandStack::new(config.history().max_entries());
        modeling::register_handlers(&mut commands);
        commands.register("elements.paste", Box::new(PasteHandler));

        debug!(root = document.root().to_string(); "Modeler ready");
        Self {
            config,
            document,
            commands,
            rules,
            hooks,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn config(&self) -> &ModelerConfig {
        &self.config
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Adds rules evaluated together with the built-in BPMN rules.
    pub fn register_rule_provider(&mut self, provider: &dyn RuleProvider) {
        self.rules.register_provider(provider);
    }

    /// Clone hooks used by paste, for registering extension behaviors.
    pub fn clone_hooks_mut(&mut self) -> &mut CloneHooks {
        &mut self.hooks
    }

    fn execute(&mut self, name: &str, context: &mut CommandContext) -> Result<(), SextantError> {
        let services = Services::new(&self.rules, &self.hooks, &self.config);
        self.commands.execute(name, context, &mut self.document, &services)
    }

    /// Creates a shape and its business object, returning the shape id.
    ///
    /// # Errors
    ///
    /// - [`SextantError::Rejected`] if the parent cannot hold the shape.
    /// - [`ModelError::UnknownElement`] for an unknown parent or host.
    pub fn create_shape(&mut self, context: CreateShapeContext) -> Result<Id, SextantError> {
        let mut context = CommandContext::CreateShape(context);
        self.execute("shape.create", &mut context)?;
        created_id(context.create_shape("shape.create")?.created())
    }

    /// Connects two elements, returning the connection id.
    ///
    /// # Errors
    ///
    /// - [`SextantError::Rejected`] if the rules refuse the connection.
    /// - [`ModelError::UnknownElement`] for an unknown endpoint.
    pub fn create_connection(&mut self, context: CreateConnectionContext) -> Result<Id, SextantError> {
        let mut context = CommandContext::CreateConnection(context);
        self.execute("connection.create", &mut context)?;
        created_id(context.create_connection("connection.create")?.created())
    }

    /// Removes elements with their labels, connections, attachers and
    /// children.
    ///
    /// # Errors
    ///
    /// - [`ModelError::UnknownElement`] if an id is not in the diagram.
    /// - [`SextantError::Rejected`] for the root element.
    pub fn remove_elements(&mut self, elements: &[Id]) -> Result<(), SextantError> {
        let mut context = CommandContext::RemoveElements(RemoveElementsContext::new(elements.to_vec()));
        self.execute("elements.delete", &mut context)
    }

    /// Changes properties of an element's business object.
    ///
    /// # Errors
    ///
    /// Returns [`SextantError::InvalidProperty`] for identifier properties
    /// and for a `default` that is not an outgoing sequence flow.
    pub fn update_properties(&mut self, context: UpdatePropertiesContext) -> Result<(), SextantError> {
        let mut context = CommandContext::UpdateProperties(context);
        self.execute("element.updateProperties", &mut context)
    }

    /// Adds a global definition such as a `bpmn:Message` to the definitions.
    ///
    /// # Errors
    ///
    /// Returns [`SextantError::InvalidProperty`] if `type_name` is not a
    /// root element type.
    pub fn add_root_element(&mut self, type_name: &str, properties: &[(&str, Value)]) -> Result<Id, SextantError> {
        let definitions = self.document.definitions();
        self.add_object(definitions, "rootElements", type_name, properties)
    }

    /// Adds an event definition to the business object of `element`.
    ///
    /// # Errors
    ///
    /// - [`ModelError::UnknownElement`] if `element` is not in the diagram.
    /// - [`SextantError::InvalidProperty`] if the element is not an event.
    pub fn add_event_definition(
        &mut self,
        element: Id,
        type_name: &str,
        properties: &[(&str, Value)],
    ) -> Result<Id, SextantError> {
        let owner = self
            .document
            .element(element)
            .ok_or(ModelError::UnknownElement(element))?
            .business_object();
        self.add_object(owner, "eventDefinitions", type_name, properties)
    }

    /// Adds a semantic object without a diagram element, owned by `owner`
    /// through `property`, such as a `bpmn:CategoryValue` of a category.
    ///
    /// # Errors
    ///
    /// - [`ModelError::UnknownObject`] if `owner` does not exist.
    /// - [`SextantError::InvalidProperty`] if `property` of the owner cannot
    ///   hold a `type_name`.
    pub fn add_object(
        &mut self,
        owner: Id,
        property: &str,
        type_name: &str,
        properties: &[(&str, Value)],
    ) -> Result<Id, SextantError> {
        let context = properties.iter().fold(
            CreateObjectContext::new(type_name, owner, property),
            |context, (name, value)| context.with_property(name, value.clone()),
        );
        let mut context = CommandContext::CreateObject(context);
        self.execute("object.create", &mut context)?;
        created_id(context.create_object("object.create")?.created())
    }

    /// Copies a selection into a clipboard.
    ///
    /// The clipboard is empty when the rules refuse the copy. The document
    /// is not changed.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownElement`] if an id is not in the diagram.
    pub fn copy(&self, selection: &[Id]) -> Result<ClipboardContents, SextantError> {
        let tree = TreeBuilder::new(&self.document, &self.rules, self.config.copy_paste()).build(selection)?;
        ClipboardContents::capture(&self.document, tree)
    }

    /// Pastes `clipboard` into `target`, the root when `None`, centred on
    /// `position`.
    ///
    /// Returns the created diagram elements in creation order. A paste the
    /// rules refuse creates nothing and returns no ids. The whole paste is
    /// one undo step.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownElement`] if `target` is not in the
    /// diagram; the document is left untouched.
    pub fn paste(
        &mut self,
        clipboard: &ClipboardContents,
        target: Option<Id>,
        position: Point,
    ) -> Result<Vec<Id>, SextantError> {
        let target = target.unwrap_or(self.document.root());
        if clipboard.is_empty() {
            debug!("Clipboard is empty, nothing to paste");
            return Ok(Vec::new());
        }
        let mut context = CommandContext::Paste(PasteContext::new(clipboard.clone(), target, position));
        self.execute("elements.paste", &mut context)?;
        Ok(context.paste("elements.paste")?.created().to_vec())
    }

    /// Reverts the last command. Returns `false` if there was none.
    ///
    /// # Errors
    ///
    /// Returns an error if the recorded journal no longer applies.
    pub fn undo(&mut self) -> Result<bool, SextantError> {
        let undone = self.commands.undo(&mut self.document)?;
        if undone {
            info!(remaining = self.commands.undo_count(); "Undo");
        }
        Ok(undone)
    }

    /// Re-applies the last undone command. Returns `false` if there was none.
    ///
    /// # Errors
    ///
    /// Returns an error if the recorded journal no longer applies.
    pub fn redo(&mut self) -> Result<bool, SextantError> {
        let redone = self.commands.redo(&mut self.document)?;
        if redone {
            info!(remaining = self.commands.redo_count(); "Redo");
        }
        Ok(redone)
    }

    pub fn can_undo(&self) -> bool {
        self.commands.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.commands.can_redo()
    }
}

/// The id a creating command reported, which it always does on success.
fn created_id(created: Option<Id>) -> Result<Id, SextantError> {
    created.ok_or_else(|| SextantError::Rejected { action: "create" })
}

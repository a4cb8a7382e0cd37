//! Command infrastructure: handlers, their contexts and the undo stack.
//!
//! A command is a named [`CommandHandler`] that mutates a
//! [`Document`](crate::document::Document) through a [`Transaction`]. The
//! transaction records every operation together with its inverse; the
//! [`CommandStack`] keeps those journals for undo and redo. Handlers never
//! implement their own revert.

mod stack;
mod transaction;

use sextant_core::{
    geometry::{Bounds, Point},
    identifier::Id,
    semantic::Value,
};

use crate::{
    SextantError, clone::CloneHooks, config::ModelerConfig, copy_paste::ClipboardContents,
    rules::RuleEngine,
};

pub use stack::CommandStack;
pub use transaction::Transaction;

/// Read-only collaborators available to command handlers.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    rules: &'a RuleEngine,
    hooks: &'a CloneHooks,
    config: &'a ModelerConfig,
}

impl<'a> Services<'a> {
    pub fn new(rules: &'a RuleEngine, hooks: &'a CloneHooks, config: &'a ModelerConfig) -> Self {
        Self {
            rules,
            hooks,
            config,
        }
    }

    pub fn rules(&self) -> &'a RuleEngine {
        self.rules
    }

    pub fn hooks(&self) -> &'a CloneHooks {
        self.hooks
    }

    pub fn config(&self) -> &'a ModelerConfig {
        self.config
    }
}

/// A named, undoable modeling command.
///
/// The three phases run in order inside one transaction. An error in any
/// phase rolls back everything the transaction applied so far.
pub trait CommandHandler {
    /// Validates the request and prepares the context.
    fn pre_execute(
        &self,
        _context: &mut CommandContext,
        _transaction: &mut Transaction<'_>,
        _services: &Services<'_>,
    ) -> Result<(), SextantError> {
        Ok(())
    }

    /// Performs the main mutation.
    fn execute(
        &self,
        context: &mut CommandContext,
        transaction: &mut Transaction<'_>,
        services: &Services<'_>,
    ) -> Result<(), SextantError>;

    /// Applies follow-up behaviors that depend on the main mutation.
    fn post_execute(
        &self,
        _context: &mut CommandContext,
        _transaction: &mut Transaction<'_>,
        _services: &Services<'_>,
    ) -> Result<(), SextantError> {
        Ok(())
    }
}

/// Input and output of one command execution.
#[derive(Debug, Clone)]
pub enum CommandContext {
    CreateShape(CreateShapeContext),
    CreateConnection(CreateConnectionContext),
    RemoveElements(RemoveElementsContext),
    UpdateProperties(UpdatePropertiesContext),
    CreateObject(CreateObjectContext),
    Paste(PasteContext),
}

/// Request to create a shape.
///
/// # Examples
///
/// ```
/// use sextant::{
///     command::CreateShapeContext,
///     geometry::{Bounds, Point, Size},
///     identifier::Id,
///     semantic::Value,
/// };
///
/// let context = CreateShapeContext::new(
///     "bpmn:UserTask",
///     Id::new("Process_1"),
///     Bounds::new_from_top_left(Point::new(0.0, 0.0), Size::new(100.0, 80.0)),
/// )
/// .with_property("assignee", Value::from("alice"));
///
/// assert_eq!(context.type_name(), "bpmn:UserTask");
/// assert!(context.created().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct CreateShapeContext {
    type_name: Id,
    parent: Id,
    bounds: Bounds,
    host: Option<Id>,
    properties: Vec<(Id, Value)>,
    created: Option<Id>,
}

impl CreateShapeContext {
    pub fn new(type_name: &str, parent: Id, bounds: Bounds) -> Self {
        Self {
            type_name: Id::new(type_name),
            parent,
            bounds,
            host: None,
            properties: Vec::new(),
            created: None,
        }
    }

    /// Attaches the new shape to `host`, making it a boundary event.
    pub fn with_host(mut self, host: Id) -> Self {
        self.host = Some(host);
        self
    }

    /// Initial primitive or reference property of the business object.
    pub fn with_property(mut self, name: &str, value: Value) -> Self {
        self.properties.push((Id::new(name), value));
        self
    }

    pub fn type_name(&self) -> Id {
        self.type_name
    }

    pub fn parent(&self) -> Id {
        self.parent
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn host(&self) -> Option<Id> {
        self.host
    }

    pub fn properties(&self) -> &[(Id, Value)] {
        &self.properties
    }

    /// Id of the created shape, once the command has run.
    pub fn created(&self) -> Option<Id> {
        self.created
    }

    pub(crate) fn set_created(&mut self, id: Id) {
        self.created = Some(id);
    }
}

/// Request to connect two elements.
#[derive(Debug, Clone)]
pub struct CreateConnectionContext {
    type_name: Id,
    source: Id,
    target: Id,
    waypoints: Vec<Point>,
    properties: Vec<(Id, Value)>,
    created: Option<Id>,
}

impl CreateConnectionContext {
    /// A connection with straight waypoints between the endpoint centres.
    pub fn new(type_name: &str, source: Id, target: Id) -> Self {
        Self {
            type_name: Id::new(type_name),
            source,
            target,
            waypoints: Vec::new(),
            properties: Vec::new(),
            created: None,
        }
    }

    pub fn with_waypoints(mut self, waypoints: Vec<Point>) -> Self {
        self.waypoints = waypoints;
        self
    }

    pub fn with_property(mut self, name: &str, value: Value) -> Self {
        self.properties.push((Id::new(name), value));
        self
    }

    pub fn type_name(&self) -> Id {
        self.type_name
    }

    pub fn source(&self) -> Id {
        self.source
    }

    pub fn target(&self) -> Id {
        self.target
    }

    pub fn waypoints(&self) -> &[Point] {
        &self.waypoints
    }

    pub fn properties(&self) -> &[(Id, Value)] {
        &self.properties
    }

    pub fn created(&self) -> Option<Id> {
        self.created
    }

    pub(crate) fn set_created(&mut self, id: Id) {
        self.created = Some(id);
    }
}

/// Request to delete diagram elements and everything depending on them.
#[derive(Debug, Clone)]
pub struct RemoveElementsContext {
    elements: Vec<Id>,
}

impl RemoveElementsContext {
    pub fn new(elements: Vec<Id>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[Id] {
        &self.elements
    }
}

/// Request to change properties of an element's business object.
///
/// A `None` value unsets the property.
#[derive(Debug, Clone)]
pub struct UpdatePropertiesContext {
    element: Id,
    properties: Vec<(Id, Option<Value>)>,
}

impl UpdatePropertiesContext {
    pub fn new(element: Id) -> Self {
        Self {
            element,
            properties: Vec::new(),
        }
    }

    pub fn set(mut self, name: &str, value: Value) -> Self {
        self.properties.push((Id::new(name), Some(value)));
        self
    }

    pub fn unset(mut self, name: &str) -> Self {
        self.properties.push((Id::new(name), None));
        self
    }

    pub fn element(&self) -> Id {
        self.element
    }

    pub fn properties(&self) -> &[(Id, Option<Value>)] {
        &self.properties
    }
}

/// Request to create a semantic object without a diagram representation,
/// owned by `owner` through `property`.
///
/// Used for root definitions (`bpmn:Message` under the definitions'
/// `rootElements`) and event definitions.
#[derive(Debug, Clone)]
pub struct CreateObjectContext {
    type_name: Id,
    owner: Id,
    property: Id,
    properties: Vec<(Id, Value)>,
    created: Option<Id>,
}

impl CreateObjectContext {
    pub fn new(type_name: &str, owner: Id, property: &str) -> Self {
        Self {
            type_name: Id::new(type_name),
            owner,
            property: Id::new(property),
            properties: Vec::new(),
            created: None,
        }
    }

    pub fn with_property(mut self, name: &str, value: Value) -> Self {
        self.properties.push((Id::new(name), value));
        self
    }

    pub fn type_name(&self) -> Id {
        self.type_name
    }

    pub fn owner(&self) -> Id {
        self.owner
    }

    pub fn property(&self) -> Id {
        self.property
    }

    pub fn properties(&self) -> &[(Id, Value)] {
        &self.properties
    }

    pub fn created(&self) -> Option<Id> {
        self.created
    }

    pub(crate) fn set_created(&mut self, id: Id) {
        self.created = Some(id);
    }
}

/// Request to paste clipboard contents into `target` around `position`.
#[derive(Debug, Clone)]
pub struct PasteContext {
    clipboard: ClipboardContents,
    target: Id,
    position: Point,
    rejected: bool,
    created: Vec<Id>,
}

impl PasteContext {
    pub fn new(clipboard: ClipboardContents, target: Id, position: Point) -> Self {
        Self {
            clipboard,
            target,
            position,
            rejected: false,
            created: Vec::new(),
        }
    }

    pub fn clipboard(&self) -> &ClipboardContents {
        &self.clipboard
    }

    pub fn target(&self) -> Id {
        self.target
    }

    pub fn position(&self) -> Point {
        self.position
    }

    /// Whether the rules refused the drop.
    pub fn is_rejected(&self) -> bool {
        self.rejected
    }

    pub(crate) fn reject(&mut self) {
        self.rejected = true;
    }

    /// Ids of the created diagram elements, in creation order.
    pub fn created(&self) -> &[Id] {
        &self.created
    }

    pub(crate) fn push_created(&mut self, id: Id) {
        self.created.push(id);
    }
}

/// Generates an accessor returning the matching context variant or an
/// [`SextantError::InvalidContext`].
macro_rules! context_accessor {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub(crate) fn $name(&mut self, command: &'static str) -> Result<&mut $ty, SextantError> {
            match self {
                CommandContext::$variant(context) => Ok(context),
                _ => Err(SextantError::InvalidContext {
                    command,
                    expected: stringify!($variant),
                }),
            }
        }
    };
}

impl CommandContext {
    context_accessor!(create_shape, CreateShape, CreateShapeContext);
    context_accessor!(create_connection, CreateConnection, CreateConnectionContext);
    context_accessor!(remove_elements, RemoveElements, RemoveElementsContext);
    context_accessor!(update_properties, UpdateProperties, UpdatePropertiesContext);
    context_accessor!(create_object, CreateObject, CreateObjectContext);
    context_accessor!(paste, Paste, PasteContext);
}

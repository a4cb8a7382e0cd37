//! Diagram elements: the visual side of a document.
//!
//! Every [`DiagramElement`] wraps a business object id with layout data and
//! graph relations. Relations are split in two groups:
//!
//! - **Stored** relations are owned by the element itself: `parent`, `host`,
//!   `source`, `target` and `label_target`.
//! - **Derived** relations are their inverses, maintained by the
//!   [`ElementRegistry`]: `children`, `attachers`, `incoming`, `outgoing`
//!   and `label`. They are never serialized.

mod registry;

use serde::{Deserialize, Serialize};

use crate::{
    geometry::{Bounds, Point},
    identifier::Id,
};

pub use registry::ElementRegistry;

/// Kind of a diagram element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// The canvas root: a process or a collaboration.
    Root,
    Shape,
    Connection,
    /// An external label attached to a shape or connection.
    Label,
}

/// A shape, connection, label or root on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramElement {
    id: Id,
    kind: ElementKind,
    #[serde(rename = "type")]
    type_name: Id,
    business_object: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bounds: Option<Bounds>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    waypoints: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    host: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label_target: Option<Id>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    collapsed: bool,

    #[serde(skip)]
    children: Vec<Id>,
    #[serde(skip)]
    attachers: Vec<Id>,
    #[serde(skip)]
    incoming: Vec<Id>,
    #[serde(skip)]
    outgoing: Vec<Id>,
    #[serde(skip)]
    label: Option<Id>,
}

impl DiagramElement {
    fn new(id: Id, kind: ElementKind, type_name: Id, business_object: Id) -> Self {
        Self {
            id,
            kind,
            type_name,
            business_object,
            bounds: None,
            waypoints: Vec::new(),
            parent: None,
            host: None,
            source: None,
            target: None,
            label_target: None,
            collapsed: false,
            children: Vec::new(),
            attachers: Vec::new(),
            incoming: Vec::new(),
            outgoing: Vec::new(),
            label: None,
        }
    }

    /// Creates the canvas root for a process or collaboration.
    pub fn root(id: Id, type_name: Id, business_object: Id) -> Self {
        Self::new(id, ElementKind::Root, type_name, business_object)
    }

    /// Creates a shape at `bounds`.
    pub fn shape(id: Id, type_name: Id, business_object: Id, bounds: Bounds) -> Self {
        let mut shape = Self::new(id, ElementKind::Shape, type_name, business_object);
        shape.bounds = Some(bounds);
        shape
    }

    /// Creates a connection from `source` to `target` along `waypoints`.
    pub fn connection(
        id: Id,
        type_name: Id,
        business_object: Id,
        source: Id,
        target: Id,
        waypoints: Vec<Point>,
    ) -> Self {
        let mut connection = Self::new(id, ElementKind::Connection, type_name, business_object);
        connection.source = Some(source);
        connection.target = Some(target);
        connection.waypoints = waypoints;
        connection
    }

    /// Creates an external label for `label_target`, sharing its business object.
    pub fn label(id: Id, label_target: Id, business_object: Id, bounds: Bounds) -> Self {
        let mut label = Self::new(id, ElementKind::Label, Id::new("label"), business_object);
        label.bounds = Some(bounds);
        label.label_target = Some(label_target);
        label
    }

    pub fn with_parent(mut self, parent: Id) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_host(mut self, host: Id) -> Self {
        self.host = Some(host);
        self
    }

    pub fn with_collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = collapsed;
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn type_name(&self) -> Id {
        self.type_name
    }

    pub fn business_object(&self) -> Id {
        self.business_object
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn waypoints(&self) -> &[Point] {
        &self.waypoints
    }

    /// Bounds of a shape or label, or the box around a connection's waypoints.
    pub fn extent(&self) -> Option<Bounds> {
        self.bounds.or_else(|| Bounds::from_points(&self.waypoints))
    }

    pub fn parent(&self) -> Option<Id> {
        self.parent
    }

    pub fn host(&self) -> Option<Id> {
        self.host
    }

    pub fn source(&self) -> Option<Id> {
        self.source
    }

    pub fn target(&self) -> Option<Id> {
        self.target
    }

    pub fn label_target(&self) -> Option<Id> {
        self.label_target
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn children(&self) -> &[Id] {
        &self.children
    }

    pub fn attachers(&self) -> &[Id] {
        &self.attachers
    }

    pub fn incoming(&self) -> &[Id] {
        &self.incoming
    }

    pub fn outgoing(&self) -> &[Id] {
        &self.outgoing
    }

    pub fn label_id(&self) -> Option<Id> {
        self.label
    }

    pub fn is_root(&self) -> bool {
        self.kind == ElementKind::Root
    }

    pub fn is_shape(&self) -> bool {
        self.kind == ElementKind::Shape
    }

    pub fn is_connection(&self) -> bool {
        self.kind == ElementKind::Connection
    }

    pub fn is_label(&self) -> bool {
        self.kind == ElementKind::Label
    }

    /// Ids of the elements this element stores a relation to: parent, host,
    /// source, target and label target.
    pub fn relations(&self) -> impl Iterator<Item = Id> + '_ {
        [
            self.parent,
            self.host,
            self.source,
            self.target,
            self.label_target,
        ]
        .into_iter()
        .flatten()
    }

    /// Checks whether any other element still depends on this one.
    fn first_dependent(&self) -> Option<Id> {
        self.label
            .into_iter()
            .chain(self.children.iter().copied())
            .chain(self.attachers.iter().copied())
            .chain(self.incoming.iter().copied())
            .chain(self.outgoing.iter().copied())
            .next()
    }

    fn clear_derived(&mut self) {
        self.children.clear();
        self.attachers.clear();
        self.incoming.clear();
        self.outgoing.clear();
        self.label = None;
    }
}

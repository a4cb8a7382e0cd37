//! Sextant - a BPMN 2.0 modeling core.
//!
//! Sextant keeps a BPMN semantic model and its diagram in sync while shapes
//! and connections are created, removed, edited, copied and pasted. Every
//! mutation runs through the [`command::CommandStack`] as one reversible
//! transaction, so any edit, including a multi-element paste, can be undone
//! and redone with stable identities.
//!
//! The usual entry point is the [`Modeler`] session:
//!
//! ```
//! use sextant::{
//!     Modeler,
//!     command::CreateShapeContext,
//!     config::ModelerConfig,
//!     geometry::{Bounds, Point, Size},
//!     semantic::Value,
//! };
//!
//! let mut modeler = Modeler::new(ModelerConfig::default()).unwrap();
//! let root = modeler.document().root();
//!
//! let task = modeler
//!     .create_shape(
//!         CreateShapeContext::new(
//!             "bpmn:Task",
//!             root,
//!             Bounds::new_from_top_left(Point::new(100.0, 100.0), Size::new(100.0, 80.0)),
//!         )
//!         .with_property("name", Value::from("Review")),
//!     )
//!     .unwrap();
//!
//! let clipboard = modeler.copy(&[task]).unwrap();
//! let pasted = modeler.paste(&clipboard, None, Point::new(500.0, 500.0)).unwrap();
//! assert_eq!(pasted.len(), 1);
//!
//! modeler.undo().unwrap();
//! assert!(modeler.document().registry().get(pasted[0]).is_none());
//! ```

pub mod clone;
pub mod command;
pub mod config;
pub mod copy_paste;
pub mod document;
pub mod rules;

mod error;
mod modeler;
mod modeling;

pub use sextant_core::{ModelError, diagram, geometry, identifier, schema, semantic};

pub use error::SextantError;
pub use modeler::Modeler;

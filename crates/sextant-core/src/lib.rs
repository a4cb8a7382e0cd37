//! Sextant Core Types and Definitions
//!
//! This crate provides the foundational types shared by the Sextant BPMN
//! modeling engine. It includes:
//!
//! - **Identifiers**: String-interned identifiers and id generation ([`identifier`])
//! - **Geometry**: Points, sizes and bounding boxes ([`geometry`])
//! - **Schema**: The declared type registry consulted by the clone engine ([`schema`])
//! - **Semantic**: Arena storage for business objects ([`semantic`])
//! - **Diagram**: Shapes, connections, labels and the element registry ([`diagram`])

pub mod diagram;
pub mod geometry;
pub mod identifier;
pub mod schema;
pub mod semantic;

mod error;

pub use error::ModelError;

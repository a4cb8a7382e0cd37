//! Error types for Sextant operations.
//!
//! [`SextantError`] covers integration failures: unknown commands, command
//! contexts that do not match their handler, operations on unknown ids and
//! rule rejections of explicit modeling requests. Copy and paste never use it
//! for validation: a rejected copy yields an empty clipboard and a rejected
//! paste yields no elements.

use std::io;

use thiserror::Error;

use sextant_core::{ModelError, identifier::Id};

/// The main error type for Sextant operations.
#[derive(Debug, Error)]
pub enum SextantError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("No handler registered for command '{0}'")]
    UnknownCommand(String),

    #[error("Command '{command}' expects a {expected} context")]
    InvalidContext {
        command: &'static str,
        expected: &'static str,
    },

    #[error("Action '{action}' was rejected by the rules")]
    Rejected { action: &'static str },

    #[error("Invalid property {property} on {object}: {reason}")]
    InvalidProperty {
        object: Id,
        property: Id,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

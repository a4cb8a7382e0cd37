//! CLI logic for the Sextant copy/paste tool.
//!
//! Loads a document snapshot, copies a selection and pastes it one or more
//! times, then writes the resulting snapshot.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::{fs, rc::Rc};

use log::{info, warn};

use sextant::{
    Modeler, SextantError,
    document::{Document, DocumentSnapshot},
    geometry::Point,
    identifier::Id,
    schema::bpmn_schema,
};

/// Run the Sextant CLI application
///
/// # Errors
///
/// Returns `SextantError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Malformed snapshots
/// - Selected or target ids missing from the document
pub fn run(args: &Args) -> Result<(), SextantError> {
    info!(
        input_path = args.input,
        output_path = args.output;
        "Processing snapshot"
    );

    let config = config::load_config(args.config.as_ref())?;

    let json = fs::read_to_string(&args.input)?;
    let snapshot = DocumentSnapshot::from_json(&json)?;
    let document = Document::from_snapshot(Rc::new(bpmn_schema()), snapshot)?;
    let mut modeler = Modeler::with_document(config, document);

    let selection: Vec<Id> = args.select.iter().map(|id| Id::new(id.trim())).collect();
    let clipboard = modeler.copy(&selection)?;
    if clipboard.is_empty() {
        warn!(selection:? = args.select; "Selection cannot be copied, nothing to paste");
    }

    let target = args.target.as_deref().map(|target| Id::new(target.trim()));
    let (x, y) = args.at;
    let mut created = 0;
    for round in 0..args.repeat {
        let pasted = modeler.paste(&clipboard, target, Point::new(x, y))?;
        if pasted.is_empty() && !clipboard.is_empty() {
            warn!(round = round; "Paste rejected by the rules");
        }
        created += pasted.len();
    }

    let output = modeler.document().snapshot().to_json()?;
    fs::write(&args.output, output)?;

    info!(output_file = args.output, created = created; "Snapshot written");

    Ok(())
}

//! Error adapter for converting SextantError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error type
//! and miette's report formatting used in the CLI. Every error gets a stable
//! diagnostic code; errors a user can act on also get a help line.

use std::fmt;

use miette::{Diagnostic, GraphicalReportHandler};

use sextant::SextantError;

/// Wraps a [`SextantError`] for rendering with miette.
pub struct ErrorAdapter<'a>(pub &'a SextantError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(self.0)
    }
}

impl Diagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match self.0 {
            SextantError::Model(_) => "sextant::model",
            SextantError::UnknownCommand(_) | SextantError::InvalidContext { .. } => "sextant::command",
            SextantError::Rejected { .. } => "sextant::rules",
            SextantError::InvalidProperty { .. } => "sextant::property",
            SextantError::Io(_) => "sextant::io",
            SextantError::Snapshot(_) => "sextant::snapshot",
            SextantError::Config(_) => "sextant::config",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match self.0 {
            SextantError::Model(_) => "check that the selected and target ids exist in the input snapshot",
            SextantError::Snapshot(_) => "the input must be a JSON document snapshot written by sextant",
            SextantError::Config(_) => "see the `copy_paste` and `history` sections in the README",
            _ => return None,
        };
        Some(Box::new(help))
    }
}

/// Convert a [`SextantError`] into a reportable diagnostic.
pub fn to_reportable(err: &SextantError) -> ErrorAdapter<'_> {
    ErrorAdapter(err)
}

/// Renders `err` as a graphical miette report.
pub fn render(err: &SextantError) -> String {
    let mut report = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut report, &to_reportable(err))
        .expect("Writing to String buffer is infallible");
    report
}

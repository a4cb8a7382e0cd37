use log::{trace, warn};

use sextant_core::identifier::Id;

use crate::{
    SextantError,
    document::{Document, IdScope, Operation},
};

/// Operations applied by one command, with their inverses.
#[derive(Debug, Clone, Default)]
pub(crate) struct Journal {
    forward: Vec<Operation>,
    backward: Vec<Operation>,
}

impl Journal {
    pub(crate) fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Reapplies the operations in order.
    pub(crate) fn redo(&self, document: &mut Document) -> Result<(), SextantError> {
        for operation in &self.forward {
            document.apply(operation.clone())?;
        }
        Ok(())
    }

    /// Applies the inverses in reverse order.
    pub(crate) fn undo(&self, document: &mut Document) -> Result<(), SextantError> {
        for operation in self.backward.iter().rev() {
            document.apply(operation.clone())?;
        }
        Ok(())
    }
}

/// A document borrowed for the duration of one command.
///
/// Every change goes through [`Transaction::apply`], which records the
/// operation and its inverse so the command can be rolled back, undone and
/// redone.
pub struct Transaction<'a> {
    document: &'a mut Document,
    journal: Journal,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(document: &'a mut Document) -> Self {
        Self {
            document,
            journal: Journal::default(),
        }
    }

    pub fn document(&self) -> &Document {
        self.document
    }

    /// Applies an operation and records it.
    ///
    /// # Errors
    ///
    /// Propagates the error of [`Document::apply`]; nothing is recorded.
    pub fn apply(&mut self, operation: Operation) -> Result<(), SextantError> {
        let inverse = self.document.apply(operation.clone())?;
        self.journal.forward.push(operation);
        self.journal.backward.push(inverse);
        Ok(())
    }

    /// Allocates a fresh id unused in the document.
    pub fn generate_id(&mut self, prefix: &str) -> Id {
        self.document.generate_id(prefix)
    }

    pub fn id_scope(&mut self) -> IdScope<'_> {
        self.document.id_scope()
    }

    pub fn is_empty(&self) -> bool {
        self.journal.is_empty()
    }

    /// Reverts everything applied so far.
    pub(crate) fn rollback(self) -> Result<(), SextantError> {
        trace!(operations = self.journal.forward.len(); "Rolling back transaction");
        self.journal.undo(self.document).inspect_err(|err| {
            warn!(err = err.to_string(); "Rollback left the document inconsistent");
        })
    }

    /// Records `inverse` without applying anything, leaving a journal that
    /// cannot be rolled back.
    #[cfg(test)]
    pub(crate) fn record_unapplied_inverse(&mut self, inverse: Operation) {
        self.journal.forward.push(inverse.clone());
        self.journal.backward.push(inverse);
    }

    pub(crate) fn into_journal(self) -> Journal {
        self.journal
    }
}

use std::collections::HashMap;

use log::{debug, info};

use super::{
    CommandContext, CommandHandler, Services,
    transaction::{Journal, Transaction},
};
use crate::{SextantError, document::Document};

/// An executed command as kept on the undo and redo stacks.
struct Entry {
    name: String,
    journal: Journal,
}

/// Registry of command handlers plus the undo/redo history.
pub struct CommandStack {
    handlers: HashMap<String, Box<dyn CommandHandler>>,
    /// Commands that can be undone, most recent last.
    undo_stack: Vec<Entry>,
    /// Commands that can be redone, most recent last.
    redo_stack: Vec<Entry>,
    max_entries: usize,
}

impl CommandStack {
    /// Creates an empty stack keeping at most `max_entries` undoable commands.
    pub fn new(max_entries: usize) -> Self {
        Self {
            handlers: HashMap::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries,
        }
    }

    /// Registers `handler` under `name`, replacing any previous handler.
    pub fn register(&mut self, name: &str, handler: Box<dyn CommandHandler>) {
        self.handlers.insert(name.to_string(), handler);
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Runs a command as one transaction.
    ///
    /// On success the transaction is pushed onto the undo stack and the redo
    /// stack is cleared. A command that applied no operation is not
    /// recorded.
    ///
    /// # Errors
    ///
    /// - [`SextantError::UnknownCommand`] if no handler is registered.
    /// - Any error of the handler; the document is then rolled back to its
    ///   state before the call.
    pub fn execute(
        &mut self,
        name: &str,
        context: &mut CommandContext,
        document: &mut Document,
        services: &Services<'_>,
    ) -> Result<(), SextantError> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| SextantError::UnknownCommand(name.to_string()))?;

        let mut transaction = Transaction::new(document);
        let result = handler
            .pre_execute(context, &mut transaction, services)
            .and_then(|()| handler.execute(context, &mut transaction, services))
            .and_then(|()| handler.post_execute(context, &mut transaction, services));

        if let Err(err) = result {
            debug!(command = name, err = err.to_string(); "Command failed, rolling back");
            // A rollback failure is logged by the transaction; the handler's error is reported.
            let _ = transaction.rollback();
            return Err(err);
        }

        let journal = transaction.into_journal();
        if journal.is_empty() {
            debug!(command = name; "Command applied no changes");
            return Ok(());
        }

        info!(command = name; "Executed command");
        self.redo_stack.clear();
        self.undo_stack.push(Entry {
            name: name.to_string(),
            journal,
        });
        while self.undo_stack.len() > self.max_entries {
            self.undo_stack.remove(0);
        }
        Ok(())
    }

    /// Reverts the most recent command.
    ///
    /// Returns `false` when there is nothing to undo.
    ///
    /// # Errors
    ///
    /// Returns an error if the document no longer matches the recorded
    /// journal; the entry is dropped from the history.
    pub fn undo(&mut self, document: &mut Document) -> Result<bool, SextantError> {
        let Some(entry) = self.undo_stack.pop() else {
            return Ok(false);
        };
        entry.journal.undo(document)?;
        info!(command = entry.name; "Undid command");
        self.redo_stack.push(entry);
        Ok(true)
    }

    /// Reapplies the most recently undone command.
    ///
    /// Returns `false` when there is nothing to redo.
    ///
    /// # Errors
    ///
    /// Returns an error if the document no longer matches the recorded
    /// journal; the entry is dropped from the history.
    pub fn redo(&mut self, document: &mut Document) -> Result<bool, SextantError> {
        let Some(entry) = self.redo_stack.pop() else {
            return Ok(false);
        };
        entry.journal.redo(document)?;
        info!(command = entry.name; "Redid command");
        self.undo_stack.push(entry);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Forgets all history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

//! Linear undo/redo history with a single-level transaction checkpoint

use crate::error::Result;
use super::{Command, CommandContext};

/// Two-stack command history.
///
/// Running a new command discards the redo branch. A transaction marks the
/// undo-stack length at `begin_transaction`; commit folds everything after
/// the mark into one `Command::Multi`, rollback undoes back to the mark.
#[derive(Debug, Default)]
pub struct CommandLog {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    checkpoint: Option<usize>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute once and record on success. Failure changes nothing.
    pub fn run(&mut self, mut command: Command, ctx: &mut CommandContext<'_>) -> Result<bool> {
        if !command.execute(ctx)? {
            tracing::debug!("CommandLog: {} command failed, history untouched", command.kind());
            return Ok(false);
        }

        tracing::debug!(
            "CommandLog: {} command recorded, dropping {} redo entries",
            command.kind(),
            self.redo_stack.len()
        );
        self.undo_stack.push(command);
        self.redo_stack.clear();
        Ok(true)
    }

    pub fn begin_transaction(&mut self) -> bool {
        if self.checkpoint.is_some() {
            tracing::debug!("CommandLog: transaction already open");
            return false;
        }
        self.checkpoint = Some(self.undo_stack.len());
        true
    }

    pub fn commit(&mut self) -> bool {
        let Some(checkpoint) = self.checkpoint else {
            tracing::debug!("CommandLog: commit without transaction");
            return false;
        };
        if checkpoint > self.undo_stack.len() {
            tracing::warn!(
                "CommandLog: checkpoint {} is past the undo stack ({} entries)",
                checkpoint,
                self.undo_stack.len()
            );
            return false;
        }

        if self.undo_stack.len() - checkpoint > 1 {
            let members: Vec<Command> = self.undo_stack.drain(checkpoint..).collect();
            tracing::debug!("CommandLog: collapsing {} commands into one", members.len());
            self.undo_stack.push(Command::Multi(members));
        }

        self.checkpoint = None;
        true
    }

    pub fn rollback(&mut self, ctx: &mut CommandContext<'_>) -> Result<bool> {
        let Some(checkpoint) = self.checkpoint else {
            tracing::debug!("CommandLog: rollback without transaction");
            return Ok(false);
        };
        if checkpoint >= self.undo_stack.len() {
            tracing::debug!("CommandLog: nothing to roll back");
            return Ok(false);
        }

        let count = self.undo_stack.len() - checkpoint;
        while self.undo_stack.len() > checkpoint {
            self.undo(ctx)?;
        }
        self.redo_stack.clear();
        self.checkpoint = None;

        tracing::debug!("CommandLog: rolled back {} commands", count);
        Ok(true)
    }

    /// Undo the newest entry. `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self, ctx: &mut CommandContext<'_>) -> Result<bool> {
        let Some(mut command) = self.undo_stack.pop() else {
            return Ok(false);
        };

        if let Err(e) = command.undo(ctx) {
            self.undo_stack.push(command);
            return Err(e);
        }
        self.redo_stack.push(command);
        Ok(true)
    }

    /// Re-execute the newest undone entry. `Ok(false)` when there is
    /// nothing to redo or the command no longer applies; in the latter case
    /// it stays on the redo stack.
    pub fn redo(&mut self, ctx: &mut CommandContext<'_>) -> Result<bool> {
        let Some(mut command) = self.redo_stack.pop() else {
            return Ok(false);
        };

        match command.execute(ctx) {
            Ok(true) => {
                self.undo_stack.push(command);
                Ok(true)
            }
            Ok(false) => {
                tracing::warn!("CommandLog: redo of {} command no longer applies", command.kind());
                self.redo_stack.push(command);
                Ok(false)
            }
            Err(e) => {
                self.redo_stack.push(command);
                Err(e)
            }
        }
    }

    /// Drop both stacks. An open transaction stays open, now starting at
    /// the empty stack.
    pub fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        if self.checkpoint.is_some() {
            self.checkpoint = Some(0);
        }
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn is_in_transaction(&self) -> bool {
        self.checkpoint.is_some()
    }

    pub fn checkpoint(&self) -> Option<usize> {
        self.checkpoint
    }

    /// Newest undoable entry
    pub fn last(&self) -> Option<&Command> {
        self.undo_stack.last()
    }
}

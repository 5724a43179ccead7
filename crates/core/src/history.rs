//! Undo/redo history
//!
//! Two bounded stacks of [`Command`]s. The back of each deque is the top of
//! the stack; eviction pops from the front.

use std::collections::VecDeque;

use crate::command::Command;
use crate::config::DEFAULT_MAX_STACK_SIZE;
use crate::error::{AnnotatorError, AnnotatorResult, ReplayOperation};
use crate::store::AnnotationStore;

#[derive(Debug)]
pub struct CommandHistory {
    undo_stack: VecDeque<Box<dyn Command>>,
    redo_stack: VecDeque<Box<dyn Command>>,
    max_stack_size: usize,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STACK_SIZE)
    }
}

impl CommandHistory {
    /// Create an empty history. A depth of zero is treated as one.
    pub fn new(max_stack_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_stack_size: max_stack_size.max(1),
        }
    }

    /// Rebuild a history from already decoded stacks, bottom first.
    ///
    /// Stacks deeper than `max_stack_size` lose their oldest entries.
    pub fn from_stacks(
        undo: Vec<Box<dyn Command>>,
        redo: Vec<Box<dyn Command>>,
        max_stack_size: usize,
    ) -> Self {
        let mut history = Self::new(max_stack_size);
        history.undo_stack = undo.into();
        history.redo_stack = redo.into();
        history.trim();
        history
    }

    /// Execute a new command and record it.
    ///
    /// Any redo history is discarded. A command that fails to execute is not
    /// recorded and the redo stack is left alone.
    pub fn execute(
        &mut self,
        mut command: Box<dyn Command>,
        store: &mut AnnotationStore,
    ) -> AnnotatorResult<()> {
        command
            .execute(store)
            .map_err(|err| AnnotatorError::replay(ReplayOperation::Execute, err))?;

        if !self.redo_stack.is_empty() {
            log::warn!("discarding {} redo entries after new edit", self.redo_stack.len());
            self.redo_stack.clear();
        }

        self.undo_stack.push_back(command);
        self.trim();
        Ok(())
    }

    /// Undo the most recent command.
    ///
    /// Returns `Ok(false)` when there is nothing to undo. If the command
    /// fails to undo it is dropped from the history and the error returned.
    pub fn undo(&mut self, store: &mut AnnotationStore) -> AnnotatorResult<bool> {
        let Some(mut command) = self.undo_stack.pop_back() else {
            return Ok(false);
        };

        if let Err(err) = command.undo(store) {
            log::warn!("dropping {:?} command after failed undo: {}", command.kind(), err);
            return Err(AnnotatorError::replay(ReplayOperation::Undo, err));
        }

        self.redo_stack.push_back(command);
        self.trim();
        Ok(true)
    }

    /// Reapply the most recently undone command.
    ///
    /// Returns `Ok(false)` when there is nothing to redo. A command that
    /// fails to redo is dropped.
    pub fn redo(&mut self, store: &mut AnnotationStore) -> AnnotatorResult<bool> {
        let Some(mut command) = self.redo_stack.pop_back() else {
            return Ok(false);
        };

        if let Err(err) = command.execute(store) {
            log::warn!("dropping {:?} command after failed redo: {}", command.kind(), err);
            return Err(AnnotatorError::replay(ReplayOperation::Execute, err));
        }

        self.undo_stack.push_back(command);
        self.trim();
        Ok(true)
    }

    /// Whether executing a new command now would discard redo history.
    pub fn will_lose_redo_history(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_stack_size(&self) -> usize {
        self.max_stack_size
    }

    pub fn set_max_stack_size(&mut self, max_stack_size: usize) {
        self.max_stack_size = max_stack_size.max(1);
        self.trim();
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Undo stack, oldest first.
    pub fn undo_stack(&self) -> impl Iterator<Item = &dyn Command> {
        self.undo_stack.iter().map(|command| command.as_ref())
    }

    /// Redo stack, oldest first.
    pub fn redo_stack(&self) -> impl Iterator<Item = &dyn Command> {
        self.redo_stack.iter().map(|command| command.as_ref())
    }

    fn trim(&mut self) {
        while self.undo_stack.len() > self.max_stack_size {
            self.undo_stack.pop_front();
        }
        while self.redo_stack.len() > self.max_stack_size {
            self.redo_stack.pop_front();
        }
    }
}

//! # Undo/Redo Stack
//!
//! Tracks committed text edit groups and replays them.
//!
//! ## Design
//!
//! - Each committed [`EditGroup`] becomes one undo level, so one apply pass
//!   (one outermost modification group) is undone in one step
//! - Undo replays the inverse edits and moves the level to the redo stack
//! - Redo replays the original edits
//! - New levels clear the redo stack
//!
//! The stack only touches text; the rewriter re-merges the model afterwards.

use crate::errors::{EditorError, EditorResult};
use crate::text_modifier::{replay, EditGroup, TextEdit, TextModifier};
use tracing::debug;

/// Edits undone/redone together
#[derive(Debug, Clone)]
pub struct UndoLevel {
    /// In application order
    pub edits: Vec<TextEdit>,

    pub description: Option<String>,
}

impl UndoLevel {
    pub fn from_group(group: EditGroup) -> Self {
        Self {
            edits: group.edits,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Edits that revert this level, in application order
    pub fn inverse(&self) -> Vec<TextEdit> {
        self.edits.iter().rev().map(TextEdit::inverse).collect()
    }
}

#[derive(Debug)]
pub struct UndoStack {
    /// Most recent last
    undo_stack: Vec<UndoLevel>,

    /// Most recently undone last
    redo_stack: Vec<UndoLevel>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
        }
    }

    /// Record a committed group; empty groups are ignored
    pub fn push_group(&mut self, group: EditGroup, description: &str) {
        if group.is_empty() {
            return;
        }
        self.push_level(UndoLevel::from_group(group).with_description(description));
    }

    pub fn push_level(&mut self, level: UndoLevel) {
        self.undo_stack.push(level);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        // a new edit invalidates the future
        self.redo_stack.clear();
    }

    /// Revert the most recent level in `modifier`. Returns `false` when
    /// there is nothing to undo.
    pub fn undo(&mut self, modifier: &mut dyn TextModifier) -> EditorResult<bool> {
        let Some(level) = self.undo_stack.pop() else {
            return Ok(false);
        };

        if !replay_silently(modifier, &level.inverse()) {
            return Err(EditorError::TextEditFailed(format!(
                "undo of '{}'",
                level.description.as_deref().unwrap_or("edit")
            )));
        }
        debug!(edits = level.edits.len(), "Undid edit group");
        self.redo_stack.push(level);
        Ok(true)
    }

    /// Reapply the most recently undone level
    pub fn redo(&mut self, modifier: &mut dyn TextModifier) -> EditorResult<bool> {
        let Some(level) = self.redo_stack.pop() else {
            return Ok(false);
        };

        if !replay_silently(modifier, &level.edits) {
            return Err(EditorError::TextEditFailed(format!(
                "redo of '{}'",
                level.description.as_deref().unwrap_or("edit")
            )));
        }
        debug!(edits = level.edits.len(), "Redid edit group");
        self.undo_stack.push(level);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|level| level.description.as_deref())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|level| level.description.as_deref())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Replay inside a group and drop the resulting record, so undo/redo do not
/// produce new undo levels
fn replay_silently(modifier: &mut dyn TextModifier, edits: &[TextEdit]) -> bool {
    modifier.start_group();
    let replayed = replay(modifier, edits);
    modifier.commit_group();
    modifier.take_committed_groups();
    replayed
}

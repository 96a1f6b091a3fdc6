//! # Sync Session
//!
//! Everything one document needs to stay synchronized: the model, the text
//! buffer, node offsets, the queue of pending rewrite actions and the stack
//! of open modification groups.
//!
//! Sessions share nothing, so any number of documents can be synchronized
//! side by side.

use crate::config::SyncConfig;
use crate::errors::EditorError;
use crate::model::Model;
use crate::positions::{PositionRecalculator, PositionStore};
use crate::refactoring::Refactoring;
use crate::rewrite_action::RewriteAction;
use crate::text_modifier::TextModifier;

/// Handle returned by `begin_modification_group`; groups must be closed
/// innermost first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModificationGroupToken(u64);

pub struct SyncSession {
    pub(crate) model: Model,
    pub(crate) modifier: Box<dyn TextModifier>,
    pub(crate) positions: PositionStore,
    pub(crate) recalculator: PositionRecalculator,
    pub(crate) pending: Vec<RewriteAction>,
    groups: Vec<ModificationGroupToken>,
    next_token: u64,
}

impl SyncSession {
    pub fn new(model: Model, modifier: Box<dyn TextModifier>) -> Self {
        Self {
            model,
            modifier,
            positions: PositionStore::new(),
            recalculator: PositionRecalculator::new(),
            pending: Vec::new(),
            groups: Vec::new(),
            next_token: 0,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn text(&self) -> &str {
        self.modifier.text()
    }

    pub fn positions(&self) -> &PositionStore {
        &self.positions
    }

    pub fn pending(&self) -> &[RewriteAction] {
        &self.pending
    }

    pub fn take_pending(&mut self) -> Vec<RewriteAction> {
        std::mem::take(&mut self.pending)
    }

    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    pub fn begin_group(&mut self) -> ModificationGroupToken {
        let token = ModificationGroupToken(self.next_token);
        self.next_token += 1;
        self.groups.push(token);
        token
    }

    /// Close the innermost group. Returns `true` once no group is open.
    pub fn end_group(&mut self, token: ModificationGroupToken) -> Result<bool, EditorError> {
        match self.groups.last() {
            None => Err(EditorError::NoOpenGroup),
            Some(top) if *top != token => Err(EditorError::GroupMismatch),
            Some(_) => {
                self.groups.pop();
                Ok(self.groups.is_empty())
            }
        }
    }

    pub fn group_depth(&self) -> usize {
        self.groups.len()
    }

    pub fn in_group(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Grammar-aware editor over this session's text and offsets
    pub fn refactoring(&mut self, config: &SyncConfig) -> Refactoring<'_> {
        Refactoring::new(
            self.modifier.as_mut(),
            &mut self.positions,
            &mut self.recalculator,
            config,
        )
    }

    /// Feed text events from edits made outside [`Refactoring`] to the
    /// recalculator
    pub fn sync_positions(&mut self) {
        for event in self.modifier.take_events() {
            self.recalculator.text_event(&event, &mut self.positions);
        }
    }
}

//! # Rewriter
//!
//! One document, kept in sync in both directions.
//!
//! Model edits go through [`Rewriter::mutate`]: every event is scheduled as a
//! rewrite action and, once no modification group is open, the queue is
//! written into the text in a single pass. Text edits made by the host are
//! reported through [`Rewriter::text_changed`] and amended into the model.
//!
//! While the merger is changing the model its events reach host listeners
//! but are never scheduled, so a merge cannot echo back into the text.

use crate::applier::{schedule, ApplierState, ApplyReport, ApplyStats, ModelToTextApplier, SyncNotification};
use crate::config::SyncConfig;
use crate::errors::{EditorError, EditorResult, ModelError};
use crate::events::{ModelEditor, ModelEvent, ModelListener};
use crate::merger::{AmendHandler, DifferenceHandler, TextToModelMerger, ValidateHandler};
use crate::messages::DocumentMessage;
use crate::model::{Model, NodeId};
use crate::positions::PositionStore;
use crate::render::render_document;
use crate::rewrite_action::RewriteAction;
use crate::session::{ModificationGroupToken, SyncSession};
use crate::text_modifier::{PlainTextModifier, TextModifier};
use crate::undo_stack::UndoStack;
use tracing::{debug, error, info, instrument, warn};

/// Routes model events to the action queue (unless merging) and to the
/// host's listeners
struct Dispatch<'a> {
    queue: Option<(&'a mut Vec<RewriteAction>, &'a SyncConfig)>,
    listeners: &'a mut [Box<dyn ModelListener>],
}

impl ModelListener for Dispatch<'_> {
    fn model_event(&mut self, model: &Model, event: &ModelEvent) {
        if let Some((queue, config)) = &mut self.queue {
            schedule(queue, model, event, config);
        }
        for listener in self.listeners.iter_mut() {
            listener.model_event(model, event);
        }
    }
}

/// Run one merge of `text` into the model without scheduling anything
fn merge_text(
    merger: &mut TextToModelMerger,
    model: &mut Model,
    positions: &mut PositionStore,
    listeners: &mut [Box<dyn ModelListener>],
    text: &str,
    handler: &mut dyn DifferenceHandler,
) -> bool {
    let mut dispatch = Dispatch {
        queue: None,
        listeners,
    };
    let mut editor = ModelEditor::new(model, &mut dispatch);
    merger.load(text, handler, &mut editor, positions)
}

fn first_message(messages: &[DocumentMessage]) -> String {
    messages
        .first()
        .map(|message| message.message.clone())
        .unwrap_or_default()
}

pub struct Rewriter {
    session: SyncSession,
    config: SyncConfig,
    applier: ModelToTextApplier,
    merger: TextToModelMerger,
    listeners: Vec<Box<dyn ModelListener>>,
    /// Text the model was last known to match
    last_correct_text: String,
    /// A host text change arrived while a group was open
    pending_text_change: bool,
    undo: UndoStack,
    errors: Vec<DocumentMessage>,
    last_report: Option<ApplyReport>,
}

impl Rewriter {
    /// Build the model from `text`
    pub fn new(text: &str, config: SyncConfig) -> EditorResult<Self> {
        Self::with_modifier(Box::new(PlainTextModifier::new(text)), config)
    }

    /// Build the model from the text of a host buffer
    pub fn with_modifier(modifier: Box<dyn TextModifier>, config: SyncConfig) -> EditorResult<Self> {
        let text = modifier.text().to_string();
        let document = mosaic_parser::parse(&text)?;
        let model = Model::with_default_property(document.root.type_name.as_str(), config.default_property.as_str());

        let mut rewriter = Self::assemble(SyncSession::new(model, modifier), config);
        if !rewriter.merge_current(&mut AmendHandler) {
            let messages = rewriter.merger.take_errors();
            return Err(EditorError::Validation(first_message(&messages)));
        }
        info!(nodes = rewriter.session.model.node_count(), "Loaded document");
        Ok(rewriter)
    }

    /// Render `model` into a fresh text buffer
    pub fn from_model(mut model: Model, config: SyncConfig) -> EditorResult<Self> {
        // events from building the model describe no text edit
        model.take_events();
        let text = render_document(&model, config.indent_width);
        let modifier = Box::new(PlainTextModifier::new(text));

        let mut rewriter = Self::assemble(SyncSession::new(model, modifier), config);
        if !rewriter.merge_current(&mut ValidateHandler) {
            let messages = rewriter.merger.take_errors();
            return Err(EditorError::Validation(first_message(&messages)));
        }
        Ok(rewriter)
    }

    fn assemble(session: SyncSession, config: SyncConfig) -> Self {
        let last_correct_text = session.text().to_string();
        Self {
            session,
            config,
            applier: ModelToTextApplier::new(),
            merger: TextToModelMerger::new(),
            listeners: Vec::new(),
            last_correct_text,
            pending_text_change: false,
            undo: UndoStack::new(),
            errors: Vec::new(),
            last_report: None,
        }
    }

    pub fn model(&self) -> &Model {
        self.session.model()
    }

    pub fn text(&self) -> &str {
        self.session.text()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn positions(&self) -> &PositionStore {
        self.session.positions()
    }

    pub fn node_offset(&self, node: NodeId) -> Option<usize> {
        self.session.positions().node_offset(node)
    }

    pub fn last_correct_text(&self) -> &str {
        &self.last_correct_text
    }

    pub fn state(&self) -> ApplierState {
        self.applier.state()
    }

    pub fn stats(&self) -> ApplyStats {
        self.applier.stats()
    }

    pub fn take_notifications(&mut self) -> Vec<SyncNotification> {
        self.applier.take_notifications()
    }

    /// Report of the last apply pass
    pub fn last_report(&self) -> Option<&ApplyReport> {
        self.last_report.as_ref()
    }

    /// Messages for the host: parse errors, failed passes, failed merges
    pub fn errors(&self) -> &[DocumentMessage] {
        &self.errors
    }

    pub fn has_pending_text_change(&self) -> bool {
        self.pending_text_change
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo
    }

    pub fn add_listener(&mut self, listener: Box<dyn ModelListener>) {
        self.listeners.push(listener);
    }

    /// Edit the model. Outside a modification group the resulting text
    /// edits are applied before this returns.
    pub fn mutate<T>(
        &mut self,
        f: impl FnOnce(&mut ModelEditor<'_>) -> Result<T, ModelError>,
    ) -> EditorResult<T> {
        if self.applier.state() == ApplierState::Error {
            return Err(EditorError::ErrorState);
        }

        let result = {
            let mut dispatch = Dispatch {
                queue: Some((&mut self.session.pending, &self.config)),
                listeners: &mut self.listeners,
            };
            let mut editor = ModelEditor::new(&mut self.session.model, &mut dispatch);
            f(&mut editor)
        };

        // whatever did change still has to reach the text
        if !self.session.in_group() {
            self.apply_pending()?;
        }
        Ok(result?)
    }

    pub fn begin_modification_group(&mut self) -> ModificationGroupToken {
        let token = self.session.begin_group();
        debug!(depth = self.session.group_depth(), "Opened modification group");
        token
    }

    /// Close the innermost group; closing the outermost one applies every
    /// queued edit in one pass
    pub fn end_modification_group(&mut self, token: ModificationGroupToken) -> EditorResult<()> {
        if self.session.end_group(token)? {
            self.apply_pending()?;
        }
        Ok(())
    }

    pub fn in_modification_group(&self) -> bool {
        self.session.in_group()
    }

    /// Run `f` inside one modification group
    pub fn transaction<T>(&mut self, f: impl FnOnce(&mut Self) -> EditorResult<T>) -> EditorResult<T> {
        let token = self.begin_modification_group();
        let result = f(self);
        self.end_modification_group(token)?;
        result
    }

    #[instrument(skip(self), fields(pending = self.session.pending.len()))]
    fn apply_pending(&mut self) -> EditorResult<()> {
        let result = self.applier.apply_changes(&mut self.session, &self.config);
        self.record_undo("Model edit");

        let report = match result {
            Ok(report) => report,
            Err(err) => {
                error!(error = %err, "Apply pass failed");
                self.errors = self.applier.errors().to_vec();
                return Err(err);
            }
        };
        self.last_report = Some(report);

        if self.pending_text_change {
            // the host changed the text too; the text wins
            self.pending_text_change = false;
            self.reload_and_merge();
            return Ok(());
        }
        if self.session.text() == self.last_correct_text {
            return Ok(());
        }

        if self.config.validate_after_apply && !self.merge_current(&mut ValidateHandler) {
            let messages = self.merger.take_errors();
            let summary = first_message(&messages);
            error!(message = %summary, "Written text does not match the model");
            self.applier.enter_error_state(messages.clone());
            self.errors = messages;
            return Err(EditorError::Validation(summary));
        }
        self.last_correct_text = self.session.text().to_string();
        Ok(())
    }

    fn merge_current(&mut self, handler: &mut dyn DifferenceHandler) -> bool {
        let text = self.session.text().to_string();
        let SyncSession { model, positions, .. } = &mut self.session;
        merge_text(&mut self.merger, model, positions, &mut self.listeners, &text, handler)
    }

    fn record_undo(&mut self, description: &str) {
        for group in self.session.modifier.take_committed_groups() {
            self.undo.push_group(group, description);
        }
    }

    /// The host changed the text. Returns `true` once the model matches it;
    /// `false` if the merge failed or was deferred because a modification
    /// group is open.
    pub fn text_changed(&mut self) -> bool {
        if self.session.in_group() || self.applier.state() == ApplierState::Applying {
            debug!("Deferring text merge until the open group closes");
            self.session.sync_positions();
            self.pending_text_change = true;
            return false;
        }
        self.reload_and_merge()
    }

    /// Replace a range of the text as the host would, then merge it
    pub fn edit_text(&mut self, offset: usize, length: usize, text: &str) -> bool {
        if !self.session.modifier.replace(offset, length, text) {
            warn!(offset, length, "Rejected text edit outside the document");
            return false;
        }
        self.text_changed()
    }

    /// Amend the model from the current text. On failure the model is put
    /// back to the last correct text; the text itself is left alone.
    #[instrument(skip(self))]
    pub fn reload_and_merge(&mut self) -> bool {
        self.session.sync_positions();
        self.record_undo("Text edit");

        if self.merge_current(&mut AmendHandler) {
            self.last_correct_text = self.session.text().to_string();
            self.errors.clear();
            return true;
        }

        self.errors = self.merger.take_errors();
        warn!(message = %first_message(&self.errors), "Merge failed, restoring last correct model");

        // offsets computed against the old text are meaningless now
        let mut scratch = PositionStore::new();
        let correct = self.last_correct_text.clone();
        let SyncSession { model, .. } = &mut self.session;
        if !merge_text(
            &mut self.merger,
            model,
            &mut scratch,
            &mut self.listeners,
            &correct,
            &mut AmendHandler,
        ) {
            error!("Last correct text no longer merges");
        }
        self.merger.take_errors();
        false
    }

    /// Put the last correct text back and leave the error state
    pub fn clear_error_state(&mut self) -> EditorResult<()> {
        info!("Clearing error state");
        self.session.clear_pending();
        self.pending_text_change = false;
        let correct = self.last_correct_text.clone();
        self.session.modifier.set_text(&correct);
        self.applier.clear_error();
        self.errors.clear();

        if self.reload_and_merge() {
            Ok(())
        } else {
            Err(EditorError::Validation(first_message(&self.errors)))
        }
    }

    /// Revert the last undo level and amend the model. Returns `false` when
    /// there is nothing to undo.
    pub fn undo(&mut self) -> EditorResult<bool> {
        if self.applier.state() == ApplierState::Error {
            return Err(EditorError::ErrorState);
        }
        self.record_undo("Text edit");
        let undone = self.undo.undo(self.session.modifier.as_mut())?;
        if undone {
            self.reload_and_merge();
        }
        Ok(undone)
    }

    pub fn redo(&mut self) -> EditorResult<bool> {
        if self.applier.state() == ApplierState::Error {
            return Err(EditorError::ErrorState);
        }
        let redone = self.undo.redo(self.session.modifier.as_mut())?;
        if redone {
            self.reload_and_merge();
        }
        Ok(redone)
    }
}

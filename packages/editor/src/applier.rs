//! # Model → Text
//!
//! [`schedule`] turns model events into queued [`RewriteAction`]s;
//! [`ModelToTextApplier::apply_changes`] compresses the queue and writes it
//! into the text as one edit group.
//!
//! The applier is a small state machine:
//!
//! ```text
//! Idle --apply_changes--> Applying --ok--> Idle
//!                            |
//!                            +--failure--> Error (until cleared)
//! ```
//!
//! While in `Error` every `apply_changes` call is refused, so a broken text
//! never receives further edits.

use crate::compressor::RewriteActionCompressor;
use crate::config::SyncConfig;
use crate::errors::{EditorError, EditorResult};
use crate::events::{ModelEvent, PropertyChange};
use crate::messages::DocumentMessage;
use crate::model::{Model, PropertyRef};
use crate::refactoring::Refactoring;
use crate::render::{render_object, render_order, render_value};
use crate::rewrite_action::RewriteAction;
use crate::session::SyncSession;
use std::ops::Range;
use tracing::{debug, error, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplierState {
    #[default]
    Idle,
    Applying,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    /// Passes that actually wrote text
    pub apply_passes: usize,
    pub actions_executed: usize,
}

/// Lets the host tell engine edits apart from user edits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncNotification {
    ApplyStarted,
    ApplyFinished,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReindentScope {
    #[default]
    None,
    All,
    Ranges,
}

/// Outcome of a successful pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub executed: usize,
    pub reindent: ReindentScope,
    /// Ranges written by the pass, before re-indentation
    pub dirty: Vec<Range<usize>>,
}

/// Queue the text edits for one model event
pub fn schedule(queue: &mut Vec<RewriteAction>, model: &Model, event: &ModelEvent, config: &SyncConfig) {
    let start = queue.len();
    let width = config.indent_width;

    match event {
        ModelEvent::PropertiesChanged { properties, change } => {
            for property in properties {
                if !model.is_in_hierarchy(property.node) {
                    continue;
                }
                let Some(value) = model.property(property.node, &property.name) else {
                    continue;
                };
                let kind = value.kind();
                let value_text = render_value(model, property.node, &property.name, width).unwrap_or_default();
                queue.push(match change {
                    PropertyChange::Added => RewriteAction::AddProperty {
                        property: property.clone(),
                        value_text,
                        kind,
                        contained_node: None,
                        embedded: Vec::new(),
                    },
                    PropertyChange::Changed => RewriteAction::ChangeProperty {
                        property: property.clone(),
                        value_text,
                        kind,
                        contained_node: None,
                        embedded: Vec::new(),
                    },
                });
            }
        }
        ModelEvent::NodeReparented {
            node,
            new_property,
            old_property,
            ..
        } => {
            let target_in = model.is_in_hierarchy(new_property.node);
            let source_in = old_property
                .as_ref()
                .map(|old| model.is_in_hierarchy(old.node))
                .unwrap_or(false);
            let Some(target_kind) = model
                .property(new_property.node, &new_property.name)
                .map(|value| value.kind())
            else {
                return;
            };

            match (source_in, target_in) {
                (false, true) => queue.push(RewriteAction::AddProperty {
                    property: new_property.clone(),
                    value_text: render_object(model, *node, width),
                    kind: target_kind,
                    contained_node: Some(*node),
                    embedded: render_order(model, *node),
                }),
                (true, true) => queue.push(RewriteAction::ReparentNode {
                    node: *node,
                    old_property: old_property.clone(),
                    target: new_property.clone(),
                    target_kind,
                }),
                (true, false) => queue.push(RewriteAction::RemoveNode { node: *node }),
                (false, false) => {}
            }
        }
        ModelEvent::NodeOrderChanged { property, node, .. } => {
            if model.is_in_hierarchy(property.node) {
                queue.push(RewriteAction::MoveNode {
                    node: *node,
                    property: property.clone(),
                });
            }
        }
        ModelEvent::NodeAboutToBeRemoved {
            node, in_hierarchy, ..
        } => {
            if *in_hierarchy {
                queue.push(RewriteAction::RemoveNode { node: *node });
            }
        }
        ModelEvent::PropertiesAboutToBeRemoved {
            properties,
            in_hierarchy,
        } => {
            if *in_hierarchy {
                queue.extend(properties.iter().map(|property: &PropertyRef| RewriteAction::RemoveProperty {
                    property: property.clone(),
                }));
            }
        }
        ModelEvent::NodeIdChanged { node, old_id, new_id } => {
            if model.is_in_hierarchy(*node) {
                queue.push(RewriteAction::ChangeId {
                    node: *node,
                    old_id: old_id.clone(),
                    new_id: new_id.clone(),
                });
            }
        }
        ModelEvent::NodeTypeChanged { node, type_name } => {
            if model.is_in_hierarchy(*node) {
                queue.push(RewriteAction::ChangeType {
                    node: *node,
                    type_name: type_name.clone(),
                });
            }
        }
        ModelEvent::ImportsChanged { added, removed } => {
            for import in removed {
                queue.push(RewriteAction::RemoveImport { import: import.clone() });
            }
            for import in added {
                queue.push(RewriteAction::AddImport { import: import.clone() });
            }
        }
        ModelEvent::NodeCreated { .. } | ModelEvent::NodeRemoved { .. } | ModelEvent::PropertiesRemoved { .. } => {}
    }

    for action in &queue[start..] {
        debug!(action = %action, "Scheduled rewrite action");
    }
}

#[derive(Debug, Default)]
pub struct ModelToTextApplier {
    state: ApplierState,
    stats: ApplyStats,
    errors: Vec<DocumentMessage>,
    notifications: Vec<SyncNotification>,
}

impl ModelToTextApplier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ApplierState {
        self.state
    }

    pub fn stats(&self) -> ApplyStats {
        self.stats
    }

    /// Messages from the pass that entered the error state
    pub fn errors(&self) -> &[DocumentMessage] {
        &self.errors
    }

    pub fn take_notifications(&mut self) -> Vec<SyncNotification> {
        std::mem::take(&mut self.notifications)
    }

    /// Leave the error state; the caller restores a consistent text first
    pub fn clear_error(&mut self) {
        self.state = ApplierState::Idle;
        self.errors.clear();
    }

    /// Refuse further passes until cleared, e.g. after the written text
    /// failed validation
    pub fn enter_error_state(&mut self, messages: Vec<DocumentMessage>) {
        error!(messages = messages.len(), "Applier entering error state");
        self.state = ApplierState::Error;
        self.errors = messages;
    }

    /// Write every pending action of `session` into its text
    #[instrument(skip(self, session, config), fields(pending = session.pending.len()))]
    pub fn apply_changes(&mut self, session: &mut SyncSession, config: &SyncConfig) -> EditorResult<ApplyReport> {
        if self.state == ApplierState::Error {
            return Err(EditorError::ErrorState);
        }
        if session.pending.is_empty() {
            return Ok(ApplyReport::default());
        }

        self.state = ApplierState::Applying;
        self.notifications.push(SyncNotification::ApplyStarted);
        let result = self.run_pass(session, config);
        self.notifications.push(SyncNotification::ApplyFinished);

        match result {
            Ok(report) => {
                self.state = ApplierState::Idle;
                self.stats.apply_passes += 1;
                self.stats.actions_executed += report.executed;
                debug!(executed = report.executed, "Apply pass finished");
                Ok(report)
            }
            Err(err) => {
                self.state = ApplierState::Error;
                Err(err)
            }
        }
    }

    fn run_pass(&mut self, session: &mut SyncSession, config: &SyncConfig) -> EditorResult<ApplyReport> {
        session.sync_positions();
        session.recalculator.clear_dirty();

        // someone else may already have broken the text
        if let Err(err) = mosaic_parser::parse(session.modifier.text()) {
            warn!(error = %err, "Text does not parse, entering error state");
            self.errors = vec![DocumentMessage::from_parse_error(&err, session.modifier.text())];
            session.pending.clear();
            return Err(err.into());
        }

        let actions = session.take_pending();
        let actions = if config.compress_actions {
            RewriteActionCompressor::compress(actions, &session.model, config)
        } else {
            actions
        };

        session.modifier.start_group();
        let result = execute_actions(session, config, &actions);
        session.recalculator.clear_dirty();
        session.modifier.commit_group();

        result.map_err(|(err, message)| {
            self.errors = vec![message];
            err
        })
    }
}

fn execute_actions(
    session: &mut SyncSession,
    config: &SyncConfig,
    actions: &[RewriteAction],
) -> Result<ApplyReport, (EditorError, DocumentMessage)> {
    let SyncSession {
        model,
        modifier,
        positions,
        recalculator,
        ..
    } = session;

    let mut refactoring = Refactoring::new(modifier.as_mut(), positions, recalculator, config);
    let mut moved_nodes = false;
    for action in actions {
        debug!(action = %action, "Executing rewrite action");
        if !action.execute(&mut refactoring, model) {
            error!(action = %action, "Rewrite action failed");
            let description = action.describe();
            return Err((
                EditorError::TextEditFailed(description.clone()),
                DocumentMessage::error(format!("Could not apply {}", description)),
            ));
        }
        if !refactoring.flush() {
            error!(action = %action, "Rewrite action produced unparsable text");
            let description = action.describe();
            return Err((
                EditorError::TextEditFailed(description.clone()),
                DocumentMessage::error(format!("Applying {} broke the document", description)),
            ));
        }
        moved_nodes |= action.is_reparent_class();
    }
    drop(refactoring);

    let dirty = recalculator.take_dirty_ranges();
    let reindent = if moved_nodes && config.reindent_all_on_reparent {
        ReindentScope::All
    } else if dirty.is_empty() {
        ReindentScope::None
    } else {
        ReindentScope::Ranges
    };

    let mut refactoring = Refactoring::new(modifier.as_mut(), positions, recalculator, config);
    let reindented = match reindent {
        ReindentScope::None => true,
        ReindentScope::All => refactoring.reindent(None),
        ReindentScope::Ranges => refactoring.reindent(Some(&dirty)),
    };
    if !reindented {
        return Err((
            EditorError::TextEditFailed("reindent".to_string()),
            DocumentMessage::error("Could not re-indent the edited lines"),
        ));
    }

    Ok(ApplyReport {
        executed: actions.len(),
        reindent,
        dirty,
    })
}

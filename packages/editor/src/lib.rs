//! # Mosaic Editor
//!
//! Keeps a Mosaic document's object model and its source text consistent
//! while either side is edited.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: .mos text → AST with byte spans     │
//! └─────────────────────────────────────────────┘
//!            ↓ merge                ↑ rewrite
//! ┌─────────────────────────────────────────────┐
//! │ editor                                      │
//! │  - Model: nodes, properties, imports        │
//! │  - Model → Text: events → rewrite actions   │
//! │    → compressor → grammar-aware text edits  │
//! │  - Text → Model: parse → diff → amend       │
//! │  - Node offsets tracked through every edit  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Edit bytes, never reprint**: formatting and comments outside the
//!    edited members survive every model change
//! 2. **One pass per group**: nested modification groups write the text once
//! 3. **Text wins outside our own passes**: host edits are amended into the
//!    model; our own edits are validated against it
//! 4. **Errors are sticky**: a broken pass stops all writes until cleared
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mosaic_editor::{Rewriter, SyncConfig};
//!
//! let mut rewriter = Rewriter::new("Item {\n}\n", SyncConfig::default())?;
//! let root = rewriter.model().root();
//!
//! // Model → Text
//! rewriter.mutate(|model| model.set_variant_property(root, "width", 10))?;
//! assert_eq!(rewriter.text(), "Item {\n    width: 10\n}\n");
//!
//! // Text → Model
//! rewriter.edit_text(18, 2, "20");
//! ```

mod applier;
mod clipboard;
mod compressor;
mod config;
mod document;
mod errors;
mod events;
mod indenter;
mod merger;
mod messages;
mod model;
mod positions;
mod refactoring;
mod render;
mod rewrite_action;
mod rewriter;
mod session;
mod text_modifier;
mod undo_stack;

pub use applier::{schedule, ApplierState, ApplyReport, ApplyStats, ModelToTextApplier, ReindentScope, SyncNotification};
pub use clipboard::{copy_nodes, paste, ClipboardPayload};
pub use compressor::RewriteActionCompressor;
pub use config::{SyncConfig, DEFAULT_CONFIG_NAME};
pub use document::{Document, DocumentStorage};
pub use errors::{EditorError, EditorResult, ModelError};
pub use events::{EventLog, ModelEditor, ModelEvent, ModelListener, PropertyChange};
pub use indenter::{reindent, IndentEdit};
pub use merger::{AmendHandler, DifferenceHandler, TextToModelMerger, ValidateHandler};
pub use messages::{DocumentMessage, Severity};
pub use model::{normalize_whitespace, Import, Model, NodeId, Property, PropertyKind, PropertyRef, PropertyValue, Value};
pub use positions::{PositionRecalculator, PositionStore};
pub use refactoring::Refactoring;
pub use render::{render_document, render_object, render_order, render_value};
pub use rewrite_action::RewriteAction;
pub use rewriter::Rewriter;
pub use session::{ModificationGroupToken, SyncSession};
pub use text_modifier::{replay, EditGroup, MoveInfo, PlainTextModifier, TextEdit, TextEvent, TextModifier};
pub use undo_stack::{UndoLevel, UndoStack};

// Re-export parser types hosts need alongside the model
pub use mosaic_parser::ast::{Document as AstDocument, ImportTarget};
pub use mosaic_parser::ParseError;

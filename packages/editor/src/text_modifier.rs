//! # Text Modifier
//!
//! Seam between the engine and the buffer that owns the document text. The
//! engine never writes a string directly: every edit goes through a
//! [`TextModifier`], which reports what happened as [`TextEvent`]s (consumed
//! by the position recalculator) and batches edits into [`EditGroup`]s (one
//! undo level each).
//!
//! [`PlainTextModifier`] is the in-memory implementation used by the
//! rewriter when the host does not bring its own buffer.

use serde::{Deserialize, Serialize};

/// Relocation of a block of text
///
/// The block is `[object_start, object_end)`. The removed region extends it by
/// `leading_chars_to_remove` before and `trailing_chars_to_remove` after. The
/// block is re-inserted at `destination` (an offset in the text *before* the
/// move) wrapped in `prefix_to_insert` and `suffix_to_insert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveInfo {
    pub object_start: usize,
    pub object_end: usize,
    pub leading_chars_to_remove: usize,
    pub trailing_chars_to_remove: usize,
    pub destination: usize,
    pub prefix_to_insert: String,
    pub suffix_to_insert: String,
}

impl MoveInfo {
    /// Start of the removed region
    pub fn removal_start(&self) -> usize {
        self.object_start.saturating_sub(self.leading_chars_to_remove)
    }

    /// End of the removed region
    pub fn removal_end(&self) -> usize {
        self.object_end + self.trailing_chars_to_remove
    }

    pub fn block_len(&self) -> usize {
        self.object_end - self.object_start
    }

    /// Length of the text written at the destination
    pub fn inserted_len(&self) -> usize {
        self.prefix_to_insert.len() + self.block_len() + self.suffix_to_insert.len()
    }

    /// Offset where the inserted text starts once the move is done
    pub fn new_block_start(&self) -> usize {
        if self.destination <= self.removal_start() {
            self.destination
        } else {
            self.destination - (self.removal_end() - self.removal_start())
        }
    }
}

/// Low-level edit notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextEvent {
    Replaced {
        offset: usize,
        old_length: usize,
        new_length: usize,
    },
    Moved(MoveInfo),
}

/// One primitive replacement, recorded for undo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub offset: usize,
    pub removed: String,
    pub inserted: String,
}

impl TextEdit {
    pub fn inverse(&self) -> TextEdit {
        TextEdit {
            offset: self.offset,
            removed: self.inserted.clone(),
            inserted: self.removed.clone(),
        }
    }
}

/// Edits committed together
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditGroup {
    pub edits: Vec<TextEdit>,
}

impl EditGroup {
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Edits that revert this group, in application order
    pub fn inverse(&self) -> Vec<TextEdit> {
        self.edits.iter().rev().map(TextEdit::inverse).collect()
    }
}

/// Buffer operations the engine needs from its host
pub trait TextModifier {
    fn text(&self) -> &str;

    /// Replace `length` bytes at `offset`. Returns `false` (and changes
    /// nothing) if the range is out of bounds or splits a character.
    fn replace(&mut self, offset: usize, length: usize, text: &str) -> bool;

    /// Relocate a block. Returns `false` if the destination falls strictly
    /// inside the removed region or any offset is invalid.
    fn move_block(&mut self, info: &MoveInfo) -> bool;

    /// Replace the whole text
    fn set_text(&mut self, text: &str);

    /// Open an edit group; edits are committed together
    fn start_group(&mut self);

    /// Push batched edits to the buffer without closing the group
    fn flush_group(&mut self);

    fn commit_group(&mut self);

    /// Drain pending edit notifications
    fn take_events(&mut self) -> Vec<TextEvent>;

    /// Drain committed edit groups
    fn take_committed_groups(&mut self) -> Vec<EditGroup>;

    /// Counter bumped by every edit
    fn revision(&self) -> u64;
}

/// `String`-backed [`TextModifier`]
///
/// Edits land in the string immediately, so `flush_group` has nothing to do.
/// Edits made outside a group are committed as a group of their own.
#[derive(Debug, Default)]
pub struct PlainTextModifier {
    text: String,
    events: Vec<TextEvent>,
    group: Option<EditGroup>,
    committed: Vec<EditGroup>,
    revision: u64,
}

impl PlainTextModifier {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    fn valid_range(&self, start: usize, end: usize) -> bool {
        start <= end
            && end <= self.text.len()
            && self.text.is_char_boundary(start)
            && self.text.is_char_boundary(end)
    }

    fn record(&mut self, edits: Vec<TextEdit>) {
        self.revision += 1;
        match &mut self.group {
            Some(group) => group.edits.extend(edits),
            None => self.committed.push(EditGroup { edits }),
        }
    }
}

impl TextModifier for PlainTextModifier {
    fn text(&self) -> &str {
        &self.text
    }

    fn replace(&mut self, offset: usize, length: usize, text: &str) -> bool {
        let end = offset + length;
        if !self.valid_range(offset, end) {
            return false;
        }
        if length == 0 && text.is_empty() {
            return true;
        }

        let removed = self.text[offset..end].to_string();
        self.text.replace_range(offset..end, text);
        self.events.push(TextEvent::Replaced {
            offset,
            old_length: length,
            new_length: text.len(),
        });
        self.record(vec![TextEdit {
            offset,
            removed,
            inserted: text.to_string(),
        }]);
        true
    }

    fn move_block(&mut self, info: &MoveInfo) -> bool {
        if info.leading_chars_to_remove > info.object_start || info.object_start > info.object_end {
            return false;
        }
        let (start, end) = (info.removal_start(), info.removal_end());
        let destination = info.destination;
        if !self.valid_range(start, end)
            || !self.valid_range(info.object_start, info.object_end)
            || destination > self.text.len()
            || !self.text.is_char_boundary(destination)
            || (destination > start && destination < end)
        {
            return false;
        }

        let block = &self.text[info.object_start..info.object_end];
        let inserted = format!("{}{}{}", info.prefix_to_insert, block, info.suffix_to_insert);
        let removed = self.text[start..end].to_string();

        let edits = if destination >= end {
            self.text.insert_str(destination, &inserted);
            self.text.replace_range(start..end, "");
            vec![
                TextEdit {
                    offset: destination,
                    removed: String::new(),
                    inserted,
                },
                TextEdit {
                    offset: start,
                    removed,
                    inserted: String::new(),
                },
            ]
        } else {
            self.text.replace_range(start..end, "");
            self.text.insert_str(destination, &inserted);
            vec![
                TextEdit {
                    offset: start,
                    removed,
                    inserted: String::new(),
                },
                TextEdit {
                    offset: destination,
                    removed: String::new(),
                    inserted,
                },
            ]
        };

        self.events.push(TextEvent::Moved(info.clone()));
        self.record(edits);
        true
    }

    fn set_text(&mut self, text: &str) {
        let old_length = self.text.len();
        self.replace(0, old_length, text);
    }

    fn start_group(&mut self) {
        if self.group.is_none() {
            self.group = Some(EditGroup::default());
        }
    }

    fn flush_group(&mut self) {}

    fn commit_group(&mut self) {
        if let Some(group) = self.group.take() {
            if !group.is_empty() {
                self.committed.push(group);
            }
        }
    }

    fn take_events(&mut self) -> Vec<TextEvent> {
        std::mem::take(&mut self.events)
    }

    fn take_committed_groups(&mut self) -> Vec<EditGroup> {
        std::mem::take(&mut self.committed)
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}

/// Apply recorded edits to a modifier in order
pub fn replay(modifier: &mut dyn TextModifier, edits: &[TextEdit]) -> bool {
    edits
        .iter()
        .all(|edit| modifier.replace(edit.offset, edit.removed.len(), &edit.inserted))
}

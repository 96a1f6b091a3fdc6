//! # Position Tracking
//!
//! [`PositionStore`] maps model nodes to the byte offset where their object
//! starts in the live text. [`PositionRecalculator`] keeps those offsets
//! valid while the text is edited underneath them.
//!
//! ## Replacement
//!
//! For `replaced(offset, old, new)` a tracked offset `p`:
//!
//! - `p < offset` or `p == offset` with `old > 0`: unchanged
//! - `offset < p < offset + old`: the character is gone, entry dropped
//! - `p >= offset + old`: shifted by `new - old` (a pure insertion at `p`
//!   pushes `p` right)
//!
//! ## Moves
//!
//! With the removed region `[rs, re)`, the block `[start, end)`, the
//! destination `d` and `I = prefix + block + suffix` inserted characters:
//!
//! - inside the block: `new_block_start + prefix + (p - start)`
//! - inside the trimmed leading/trailing characters: collapses onto the
//!   point where the region was cut out
//! - `d <= rs`: `[d, rs)` shifts right by `I`, `[re, ..)` by `I - (re - rs)`
//! - `d >= re`: `[re, d)` shifts left by `re - rs`, `[d, ..)` by
//!   `I - (re - rs)`
//!
//! Every edit also records a dirty range (the characters it wrote) for
//! re-indentation. Recorded ranges follow later edits.

use crate::model::NodeId;
use crate::text_modifier::{MoveInfo, TextEvent};
use std::collections::BTreeMap;
use std::ops::Range;

/// Node → offset mapping for the live text
#[derive(Debug, Clone, Default)]
pub struct PositionStore {
    offsets: BTreeMap<NodeId, usize>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` means untracked or invalidated
    pub fn node_offset(&self, node: NodeId) -> Option<usize> {
        self.offsets.get(&node).copied()
    }

    pub fn set_node_offset(&mut self, node: NodeId, offset: usize) {
        self.offsets.insert(node, offset);
    }

    pub fn remove_node_offset(&mut self, node: NodeId) {
        self.offsets.remove(&node);
    }

    pub fn retain(&mut self, mut keep: impl FnMut(NodeId) -> bool) {
        self.offsets.retain(|node, _| keep(*node));
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn clear(&mut self) {
        self.offsets.clear();
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.offsets.keys().copied()
    }

    /// Node whose object starts at `offset`
    pub fn node_at(&self, offset: usize) -> Option<NodeId> {
        self.offsets
            .iter()
            .find(|(_, o)| **o == offset)
            .map(|(node, _)| *node)
    }

    fn update(&mut self, mut map: impl FnMut(usize) -> Option<usize>) {
        self.offsets.retain(|_, offset| match map(*offset) {
            Some(new_offset) => {
                *offset = new_offset;
                true
            }
            None => false,
        });
    }
}

/// Applies text events to a [`PositionStore`] and collects dirty ranges
#[derive(Debug, Clone, Default)]
pub struct PositionRecalculator {
    dirty: Vec<Range<usize>>,
}

impl PositionRecalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text_event(&mut self, event: &TextEvent, positions: &mut PositionStore) {
        match event {
            TextEvent::Replaced {
                offset,
                old_length,
                new_length,
            } => self.replaced(*offset, *old_length, *new_length, positions),
            TextEvent::Moved(info) => self.moved(info, positions),
        }
    }

    pub fn replaced(&mut self, offset: usize, old_length: usize, new_length: usize, positions: &mut PositionStore) {
        positions.update(|p| replaced_offset(p, offset, old_length, new_length));

        for range in &mut self.dirty {
            let start = clamp_replaced(range.start, offset, old_length, new_length);
            let end = clamp_replaced(range.end, offset, old_length, new_length);
            *range = start.min(end)..start.max(end);
        }
        self.dirty.push(offset..offset + new_length);
    }

    pub fn moved(&mut self, info: &MoveInfo, positions: &mut PositionStore) {
        positions.update(|p| Some(moved_offset(p, info)));

        for range in &mut self.dirty {
            let start = moved_offset(range.start, info);
            let end = moved_offset(range.end, info);
            *range = start.min(end)..start.max(end);
        }

        let block_start = info.new_block_start();
        let cut = collapse_point(info);
        self.dirty.push(block_start..block_start + info.inserted_len());
        self.dirty.push(cut..cut);
    }

    /// Dirty ranges sorted and merged
    pub fn dirty_ranges(&self) -> Vec<Range<usize>> {
        let mut ranges = self.dirty.clone();
        ranges.sort_by_key(|r| (r.start, r.end));

        let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
                _ => merged.push(range),
            }
        }
        merged
    }

    pub fn take_dirty_ranges(&mut self) -> Vec<Range<usize>> {
        let ranges = self.dirty_ranges();
        self.dirty.clear();
        ranges
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }
}

fn replaced_offset(p: usize, offset: usize, old_length: usize, new_length: usize) -> Option<usize> {
    let removed_end = offset + old_length;
    if p < offset || (p == offset && old_length > 0) {
        Some(p)
    } else if p < removed_end {
        None
    } else {
        Some(p - old_length + new_length)
    }
}

/// Like [`replaced_offset`] but points in the replaced range snap to its end
fn clamp_replaced(p: usize, offset: usize, old_length: usize, new_length: usize) -> usize {
    if p <= offset {
        p
    } else if p < offset + old_length {
        offset + new_length
    } else {
        p - old_length + new_length
    }
}

fn collapse_point(info: &MoveInfo) -> usize {
    let start = info.removal_start();
    if info.destination <= start {
        start + info.inserted_len()
    } else {
        start
    }
}

fn moved_offset(p: usize, info: &MoveInfo) -> usize {
    let (start, end) = (info.removal_start(), info.removal_end());
    let removed = end - start;
    let inserted = info.inserted_len();
    let destination = info.destination;

    if p >= info.object_start && p < info.object_end {
        return info.new_block_start() + info.prefix_to_insert.len() + (p - info.object_start);
    }
    if p >= start && p < end {
        return collapse_point(info);
    }

    if destination <= start {
        if p < destination {
            p
        } else if p < start {
            p + inserted
        } else {
            p + inserted - removed
        }
    } else if p < start {
        p
    } else if p < destination {
        p - removed
    } else {
        p - removed + inserted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;

    fn nodes(count: usize) -> Vec<NodeId> {
        let mut model = Model::new("Item");
        (0..count).map(|_| model.create_node("Item").unwrap()).collect()
    }

    fn store(offsets: &[(NodeId, usize)]) -> PositionStore {
        let mut store = PositionStore::new();
        for (node, offset) in offsets {
            store.set_node_offset(*node, *offset);
        }
        store
    }

    #[test]
    fn test_replace_shifts_following_offsets() {
        let n = nodes(4);
        let mut positions = store(&[(n[0], 2), (n[1], 5), (n[2], 6), (n[3], 9)]);
        let mut recalculator = PositionRecalculator::new();

        // "10" -> "200" at offset 5
        recalculator.replaced(5, 2, 3, &mut positions);

        assert_eq!(positions.node_offset(n[0]), Some(2));
        assert_eq!(positions.node_offset(n[1]), Some(5));
        assert_eq!(positions.node_offset(n[2]), None);
        assert_eq!(positions.node_offset(n[3]), Some(10));
        assert_eq!(recalculator.dirty_ranges(), vec![5..8]);
    }

    #[test]
    fn test_insertion_at_offset_pushes_node() {
        let n = nodes(1);
        let mut positions = store(&[(n[0], 4)]);
        PositionRecalculator::new().replaced(4, 0, 3, &mut positions);
        assert_eq!(positions.node_offset(n[0]), Some(7));
    }

    #[test]
    fn test_move_forward() {
        // "AAbbCC" -> "bbCCAA"
        let n = nodes(3);
        let mut positions = store(&[(n[0], 1), (n[1], 2), (n[2], 5)]);
        let info = MoveInfo {
            object_start: 0,
            object_end: 2,
            leading_chars_to_remove: 0,
            trailing_chars_to_remove: 0,
            destination: 6,
            prefix_to_insert: String::new(),
            suffix_to_insert: String::new(),
        };
        PositionRecalculator::new().moved(&info, &mut positions);

        assert_eq!(positions.node_offset(n[0]), Some(5));
        assert_eq!(positions.node_offset(n[1]), Some(0));
        assert_eq!(positions.node_offset(n[2]), Some(3));
    }

    #[test]
    fn test_move_backward_with_prefix() {
        // "xx[AB]" moving "AB" to 0 with prefix "-": "-ABxx[]"
        let n = nodes(3);
        let mut positions = store(&[(n[0], 0), (n[1], 4), (n[2], 5)]);
        let info = MoveInfo {
            object_start: 3,
            object_end: 5,
            leading_chars_to_remove: 0,
            trailing_chars_to_remove: 0,
            destination: 0,
            prefix_to_insert: "-".to_string(),
            suffix_to_insert: String::new(),
        };
        let mut recalculator = PositionRecalculator::new();
        recalculator.moved(&info, &mut positions);

        assert_eq!(positions.node_offset(n[0]), Some(3));
        assert_eq!(positions.node_offset(n[1]), Some(2));
        assert_eq!(positions.node_offset(n[2]), Some(6));
        assert_eq!(recalculator.dirty_ranges(), vec![0..3, 6..6]);
    }

    #[test]
    fn test_destination_at_block_boundaries() {
        let n = nodes(2);
        let info = |destination| MoveInfo {
            object_start: 2,
            object_end: 4,
            leading_chars_to_remove: 1,
            trailing_chars_to_remove: 1,
            destination,
            prefix_to_insert: String::new(),
            suffix_to_insert: String::new(),
        };

        // destination == removal start: block lands where it was cut
        let mut positions = store(&[(n[0], 2), (n[1], 5)]);
        PositionRecalculator::new().moved(&info(1), &mut positions);
        assert_eq!(positions.node_offset(n[0]), Some(1));
        assert_eq!(positions.node_offset(n[1]), Some(3));

        // destination == removal end
        let mut positions = store(&[(n[0], 2), (n[1], 5)]);
        PositionRecalculator::new().moved(&info(5), &mut positions);
        assert_eq!(positions.node_offset(n[0]), Some(1));
        assert_eq!(positions.node_offset(n[1]), Some(3));
    }

    #[test]
    fn test_dirty_ranges_follow_later_edits() {
        let n = nodes(1);
        let mut positions = store(&[(n[0], 0)]);
        let mut recalculator = PositionRecalculator::new();

        recalculator.replaced(10, 0, 4, &mut positions);
        recalculator.replaced(0, 0, 2, &mut positions);

        assert_eq!(recalculator.take_dirty_ranges(), vec![0..2, 12..16]);
        assert!(recalculator.dirty_ranges().is_empty());
    }
}

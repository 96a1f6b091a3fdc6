//! Batch simplification of the pending action queue.
//!
//! Passes run in a fixed order, each a full scan over the queue:
//!
//! 1. import folding
//! 2. reparent coalescing
//! 3. no-op reparent elimination
//! 4. remove-dominates
//! 5. property add/change/remove folding
//! 6. pending-node elimination
//! 7. add-then-reparent fusion
//!
//! followed by keeping only the last `MoveNode` per list. The whole-node
//! passes (1-4) go first so the property-level passes never see actions on
//! nodes that are about to disappear.

use crate::config::SyncConfig;
use crate::model::{Import, Model, NodeId, PropertyKind, PropertyRef};
use crate::render::{render_object, render_order};
use crate::rewrite_action::RewriteAction;
use std::collections::{HashMap, HashSet};
use tracing::debug;

type Slots = Vec<Option<RewriteAction>>;

pub struct RewriteActionCompressor<'a> {
    model: &'a Model,
    indent_width: usize,
    /// Every node a pending add has carried, per added node. Re-rendering
    /// shrinks `embedded` when a node moves out, but its text was still
    /// never written.
    carried: HashMap<NodeId, HashSet<NodeId>>,
}

/// What pending-node elimination does with a later action
enum Fate {
    Keep,
    Drop,
    Replace(RewriteAction),
    /// Remove the later action and run this one before the add instead
    Hoist(RewriteAction),
}

impl<'a> RewriteActionCompressor<'a> {
    pub fn new(model: &'a Model, config: &SyncConfig) -> Self {
        Self {
            model,
            indent_width: config.indent_width,
            carried: HashMap::new(),
        }
    }

    /// Simplify a batch against the model state it will be applied for
    pub fn compress(actions: Vec<RewriteAction>, model: &Model, config: &SyncConfig) -> Vec<RewriteAction> {
        let mut compressor = RewriteActionCompressor::new(model, config);
        let before = actions.len();

        let actions = compressor.fold_imports(actions);
        let actions = compressor.coalesce_reparents(actions);
        let actions = compressor.drop_noop_reparents(actions);
        let actions = compressor.remove_dominates(actions);
        let actions = compressor.fold_properties(actions);
        let actions = compressor.eliminate_pending_nodes(actions);
        let actions = compressor.fuse_add_and_reparent(actions);
        let actions = compressor.keep_last_list_moves(actions);

        debug!(before, after = actions.len(), "Compressed rewrite actions");
        actions
    }

    fn fold_imports(&self, actions: Vec<RewriteAction>) -> Vec<RewriteAction> {
        let mut slots = into_slots(actions);
        for j in (0..slots.len()).rev() {
            let Some((adding, import)) = import_of(slots[j].as_ref()) else {
                continue;
            };
            for i in (0..j).rev() {
                let Some((earlier_adding, earlier)) = import_of(slots[i].as_ref()) else {
                    continue;
                };
                if earlier != import {
                    continue;
                }
                slots[i] = None;
                if earlier_adding != adding {
                    slots[j] = None;
                    break;
                }
            }
        }
        compact(slots)
    }

    /// One reparent per node, at the position of the last one
    fn coalesce_reparents(&self, actions: Vec<RewriteAction>) -> Vec<RewriteAction> {
        let mut slots = into_slots(actions);
        let mut kept: HashMap<NodeId, usize> = HashMap::new();

        for j in 0..slots.len() {
            let Some(RewriteAction::ReparentNode { node, .. }) = &slots[j] else {
                continue;
            };
            let Some(i) = kept.insert(*node, j) else {
                continue;
            };
            if let Some(RewriteAction::ReparentNode {
                old_property: first, ..
            }) = slots[i].take()
            {
                if let Some(RewriteAction::ReparentNode { old_property, .. }) = &mut slots[j] {
                    *old_property = first;
                }
            }
        }
        compact(slots)
    }

    fn drop_noop_reparents(&self, actions: Vec<RewriteAction>) -> Vec<RewriteAction> {
        actions
            .into_iter()
            .filter_map(|action| match action {
                RewriteAction::ReparentNode {
                    node,
                    old_property: Some(old),
                    target,
                    target_kind,
                } if old == target => match target_kind {
                    // back in the same list, possibly at another index
                    PropertyKind::NodeList => Some(RewriteAction::MoveNode { node, property: target }),
                    _ => None,
                },
                other => Some(other),
            })
            .collect()
    }

    fn remove_dominates(&mut self, actions: Vec<RewriteAction>) -> Vec<RewriteAction> {
        let mut slots = into_slots(actions);
        let mut removed: HashSet<NodeId> = HashSet::new();

        for j in 0..slots.len() {
            let Some(RewriteAction::RemoveNode { node }) = &slots[j] else {
                continue;
            };
            let node = *node;
            if !removed.insert(node) {
                slots[j] = None;
                continue;
            }

            let created = (0..j).rev().find(|i| {
                matches!(&slots[*i], Some(RewriteAction::AddProperty { contained_node: Some(c), .. }) if *c == node)
            });
            if let Some(i) = created {
                let mut embedded = slots[i]
                    .as_ref()
                    .and_then(|action| self.pending_subtree(action))
                    .map(|(_, embedded)| embedded)
                    .unwrap_or_default();
                for k in i + 1..j {
                    slots[k] = match slots[k].take() {
                        Some(action) if action.target_node() == Some(node) => {
                            if let Some((_, nodes)) = self.pending_subtree(&action) {
                                embedded.extend(nodes);
                            }
                            None
                        }
                        Some(action) => self.rescue_from_dropped_add(action, node, &embedded),
                        None => None,
                    };
                }
                slots[i] = None;
                slots[j] = None;
                continue;
            }

            let embedding = (0..j).rev().find(|i| match &slots[*i] {
                Some(RewriteAction::AddProperty { embedded, .. } | RewriteAction::ChangeProperty { embedded, .. }) => {
                    embedded.contains(&node)
                }
                _ => false,
            });
            if let Some(i) = embedding {
                slots[j] = None;
                if let Some(action) = slots[i].as_mut() {
                    self.rerender(action);
                }
            }

            for slot in slots[..j].iter_mut() {
                if matches!(slot, Some(action) if action.target_node() == Some(node)) {
                    *slot = None;
                }
            }
        }

        // actions against nodes that no longer exist
        for j in 0..slots.len() {
            let replacement = match &slots[j] {
                None
                | Some(RewriteAction::RemoveNode { .. })
                | Some(RewriteAction::AddImport { .. })
                | Some(RewriteAction::RemoveImport { .. }) => continue,
                Some(RewriteAction::ReparentNode { node, .. }) if !self.model.contains(*node) => {
                    // went into a subtree that was removed afterwards
                    Some(RewriteAction::RemoveNode { node: *node })
                }
                Some(action) => match action.target_node() {
                    Some(target) if !self.model.contains(target) => None,
                    _ => continue,
                },
            };
            slots[j] = replacement;
        }
        compact(slots)
    }

    /// A reparent that took a node out of a subtree whose creation is being
    /// cancelled: the node's text was never written, so it has to be added
    fn rescue_from_dropped_add(
        &self,
        action: RewriteAction,
        created: NodeId,
        embedded: &HashSet<NodeId>,
    ) -> Option<RewriteAction> {
        match action {
            RewriteAction::ReparentNode {
                node,
                target,
                target_kind,
                ..
            } if node != created && embedded.contains(&node) => {
                if embedded.contains(&target.node) || !self.model.contains(node) {
                    None
                } else {
                    Some(self.add_at(node, target, target_kind))
                }
            }
            other => Some(other),
        }
    }

    fn fold_properties(&self, actions: Vec<RewriteAction>) -> Vec<RewriteAction> {
        let mut slots = into_slots(actions);

        for j in 0..slots.len() {
            let Some(action) = slots[j].clone() else {
                continue;
            };
            match &action {
                RewriteAction::RemoveProperty { property } => {
                    let Some(i) = previous_on_property(&slots, j, property) else {
                        continue;
                    };
                    match slots[i].as_ref().filter(|earlier| is_scalar(earlier)) {
                        Some(RewriteAction::AddProperty { .. }) => {
                            slots[i] = None;
                            slots[j] = None;
                        }
                        Some(RewriteAction::ChangeProperty { .. }) => slots[i] = None,
                        _ => {}
                    }
                }
                RewriteAction::ChangeProperty {
                    property,
                    value_text,
                    kind,
                    ..
                } if is_scalar(&action) => {
                    let Some(i) = previous_on_property(&slots, j, property) else {
                        continue;
                    };
                    let Some(earlier) = slots[i].as_mut().filter(|earlier| is_scalar(earlier)) else {
                        continue;
                    };
                    match earlier {
                        RewriteAction::AddProperty {
                            value_text: added,
                            kind: added_kind,
                            ..
                        } => {
                            *added = value_text.clone();
                            *added_kind = *kind;
                            slots[j] = None;
                        }
                        RewriteAction::ChangeProperty { .. } => slots[i] = None,
                        _ => {}
                    }
                }
                RewriteAction::ChangeId { node, .. } => {
                    let node = *node;
                    let earlier = (0..j)
                        .rev()
                        .find(|i| matches!(&slots[*i], Some(RewriteAction::ChangeId { node: n, .. }) if *n == node));
                    let Some(i) = earlier else {
                        continue;
                    };
                    if let Some(RewriteAction::ChangeId { old_id: first, .. }) = slots[i].take() {
                        if let Some(RewriteAction::ChangeId { old_id, .. }) = &mut slots[j] {
                            *old_id = first;
                        }
                    }
                }
                _ => {}
            }
        }
        compact(slots)
    }

    fn eliminate_pending_nodes(&mut self, mut actions: Vec<RewriteAction>) -> Vec<RewriteAction> {
        'restart: loop {
            for i in 0..actions.len() {
                let Some((contained, embedded)) = self.pending_subtree(&actions[i]) else {
                    continue;
                };

                for j in i + 1..actions.len() {
                    match self.pending_fate(&actions[j], contained, &embedded) {
                        Fate::Keep => {}
                        Fate::Drop => {
                            let dropped = actions.remove(j);
                            self.carry(contained, &dropped);
                            self.rerender(&mut actions[i]);
                            continue 'restart;
                        }
                        Fate::Replace(action) => {
                            actions[j] = action;
                            self.rerender(&mut actions[i]);
                            continue 'restart;
                        }
                        Fate::Hoist(action) => {
                            actions.remove(j);
                            actions.insert(i, action);
                            self.rerender(&mut actions[i + 1]);
                            continue 'restart;
                        }
                    }
                }
            }
            return actions;
        }
    }

    /// The node a pending add/change creates and every node its text has
    /// carried so far
    fn pending_subtree(&self, action: &RewriteAction) -> Option<(NodeId, HashSet<NodeId>)> {
        let (RewriteAction::AddProperty {
            contained_node: Some(contained),
            embedded,
            ..
        }
        | RewriteAction::ChangeProperty {
            contained_node: Some(contained),
            embedded,
            ..
        }) = action
        else {
            return None;
        };
        let mut nodes: HashSet<NodeId> = embedded.iter().copied().collect();
        if let Some(carried) = self.carried.get(contained) {
            nodes.extend(carried.iter().copied());
        }
        Some((*contained, nodes))
    }

    /// A dropped add that wrote into a pending node's subtree: its nodes are
    /// now only reachable through that node's text
    fn carry(&mut self, into: NodeId, dropped: &RewriteAction) {
        if let Some((_, nodes)) = self.pending_subtree(dropped) {
            self.carried.entry(into).or_default().extend(nodes);
        }
    }

    fn pending_fate(&self, action: &RewriteAction, contained: NodeId, embedded: &HashSet<NodeId>) -> Fate {
        match action {
            RewriteAction::ReparentNode { node, .. } if *node == contained => Fate::Keep,
            RewriteAction::ReparentNode {
                node,
                target,
                target_kind,
                ..
            } => match (embedded.contains(node), embedded.contains(&target.node)) {
                (true, true) => Fate::Drop,
                (true, false) if self.model.contains(*node) => {
                    Fate::Replace(self.add_at(*node, target.clone(), *target_kind))
                }
                (true, false) => Fate::Drop,
                (false, true) => Fate::Hoist(RewriteAction::RemoveNode { node: *node }),
                (false, false) => Fate::Keep,
            },
            RewriteAction::RemoveNode { .. } | RewriteAction::AddImport { .. } | RewriteAction::RemoveImport { .. } => {
                Fate::Keep
            }
            RewriteAction::MoveNode { property, .. } if embedded.contains(&property.node) => Fate::Drop,
            other => match other.target_node() {
                Some(node) if embedded.contains(&node) => Fate::Drop,
                _ => Fate::Keep,
            },
        }
    }

    fn fuse_add_and_reparent(&self, actions: Vec<RewriteAction>) -> Vec<RewriteAction> {
        let mut slots = into_slots(actions);

        for j in 0..slots.len() {
            let Some(RewriteAction::ReparentNode {
                node,
                target,
                target_kind,
                ..
            }) = &slots[j]
            else {
                continue;
            };
            let (node, target, target_kind) = (*node, target.clone(), *target_kind);
            if !self.model.contains(node) {
                continue;
            }
            let added = (0..j).rev().find(|i| {
                matches!(&slots[*i], Some(RewriteAction::AddProperty { contained_node: Some(c), .. }) if *c == node)
            });
            if let Some(i) = added {
                slots[i] = None;
                slots[j] = Some(self.add_at(node, target, target_kind));
            }
        }
        compact(slots)
    }

    /// A `MoveNode` re-syncs the whole list, so only the last one matters
    fn keep_last_list_moves(&self, actions: Vec<RewriteAction>) -> Vec<RewriteAction> {
        let mut seen: HashSet<PropertyRef> = HashSet::new();
        let mut kept: Vec<RewriteAction> = actions
            .into_iter()
            .rev()
            .filter(|action| match action {
                RewriteAction::MoveNode { property, .. } => seen.insert(property.clone()),
                _ => true,
            })
            .collect();
        kept.reverse();
        kept
    }

    fn add_at(&self, node: NodeId, target: PropertyRef, kind: PropertyKind) -> RewriteAction {
        RewriteAction::AddProperty {
            property: target,
            value_text: render_object(self.model, node, self.indent_width),
            kind,
            contained_node: Some(node),
            embedded: render_order(self.model, node),
        }
    }

    /// Regenerate a pending node's text from the current model
    fn rerender(&mut self, action: &mut RewriteAction) {
        if let RewriteAction::AddProperty {
            value_text,
            contained_node: Some(node),
            embedded,
            ..
        }
        | RewriteAction::ChangeProperty {
            value_text,
            contained_node: Some(node),
            embedded,
            ..
        } = action
        {
            if self.model.contains(*node) {
                self.carried.entry(*node).or_default().extend(embedded.iter().copied());
                *value_text = render_object(self.model, *node, self.indent_width);
                *embedded = render_order(self.model, *node);
            }
        }
    }
}

fn into_slots(actions: Vec<RewriteAction>) -> Slots {
    actions.into_iter().map(Some).collect()
}

fn compact(slots: Slots) -> Vec<RewriteAction> {
    slots.into_iter().flatten().collect()
}

fn import_of(action: Option<&RewriteAction>) -> Option<(bool, Import)> {
    match action? {
        RewriteAction::AddImport { import } => Some((true, import.clone())),
        RewriteAction::RemoveImport { import } => Some((false, import.clone())),
        _ => None,
    }
}

/// Scalar property actions: no nodes carried, no list semantics
fn is_scalar(action: &RewriteAction) -> bool {
    match action {
        RewriteAction::AddProperty {
            kind, contained_node, ..
        }
        | RewriteAction::ChangeProperty {
            kind, contained_node, ..
        } => contained_node.is_none() && !kind.holds_nodes(),
        _ => false,
    }
}

/// Latest live action before `j` that writes `property`
fn previous_on_property(slots: &Slots, j: usize, property: &PropertyRef) -> Option<usize> {
    (0..j).rev().find(|i| match &slots[*i] {
        Some(
            RewriteAction::AddProperty { property: p, .. }
            | RewriteAction::ChangeProperty { property: p, .. }
            | RewriteAction::RemoveProperty { property: p },
        ) => p == property,
        Some(RewriteAction::ReparentNode { target, .. }) => target == property,
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_value;
    use pretty_assertions::assert_eq;

    fn add(model: &Model, node: NodeId, name: &str) -> RewriteAction {
        RewriteAction::AddProperty {
            property: PropertyRef::new(node, name),
            value_text: render_value(model, node, name, 4).unwrap_or_default(),
            kind: PropertyKind::Variant,
            contained_node: None,
            embedded: Vec::new(),
        }
    }

    fn change(node: NodeId, name: &str, value: &str) -> RewriteAction {
        RewriteAction::ChangeProperty {
            property: PropertyRef::new(node, name),
            value_text: value.to_string(),
            kind: PropertyKind::Variant,
            contained_node: None,
            embedded: Vec::new(),
        }
    }

    fn remove(node: NodeId, name: &str) -> RewriteAction {
        RewriteAction::RemoveProperty {
            property: PropertyRef::new(node, name),
        }
    }

    fn add_child(model: &Model, parent: NodeId, child: NodeId) -> RewriteAction {
        RewriteAction::AddProperty {
            property: PropertyRef::new(parent, "data"),
            value_text: render_object(model, child, 4),
            kind: PropertyKind::NodeList,
            contained_node: Some(child),
            embedded: render_order(model, child),
        }
    }

    fn compress(actions: Vec<RewriteAction>, model: &Model) -> Vec<RewriteAction> {
        RewriteActionCompressor::compress(actions, model, &SyncConfig::default())
    }

    #[test]
    fn test_add_then_remove_cancels() {
        let model = Model::new("Item");
        let root = model.root();
        let actions = vec![add(&model, root, "width"), remove(root, "width")];
        assert!(compress(actions, &model).is_empty());
    }

    #[test]
    fn test_add_then_change_merges_into_add() {
        let mut model = Model::new("Item");
        let root = model.root();
        model.set_variant_property(root, "width", 20).unwrap();

        let actions = vec![add(&model, root, "width"), change(root, "width", "20")];
        let compressed = compress(actions, &model);
        assert_eq!(compressed.len(), 1);
        assert!(matches!(
            &compressed[0],
            RewriteAction::AddProperty { value_text, .. } if value_text == "20"
        ));
    }

    #[test]
    fn test_repeated_changes_keep_latest() {
        let model = Model::new("Item");
        let root = model.root();
        let actions = vec![
            change(root, "width", "1"),
            change(root, "height", "5"),
            change(root, "width", "2"),
        ];
        assert_eq!(
            compress(actions, &model),
            vec![change(root, "height", "5"), change(root, "width", "2")]
        );
    }

    #[test]
    fn test_change_then_remove_keeps_remove() {
        let model = Model::new("Item");
        let root = model.root();
        let actions = vec![change(root, "width", "1"), remove(root, "width")];
        assert_eq!(compress(actions, &model), vec![remove(root, "width")]);
    }

    #[test]
    fn test_imports_fold() {
        let model = Model::new("Item");
        let controls = Import::library("Mosaic.Controls", None);
        let layouts = Import::library("Mosaic.Layouts", None);
        let actions = vec![
            RewriteAction::AddImport { import: controls.clone() },
            RewriteAction::AddImport { import: layouts.clone() },
            RewriteAction::RemoveImport { import: controls },
            RewriteAction::AddImport { import: layouts.clone() },
        ];
        assert_eq!(
            compress(actions, &model),
            vec![RewriteAction::AddImport { import: layouts }]
        );
    }

    #[test]
    fn test_remove_dominates_earlier_actions() {
        let mut model = Model::new("Item");
        let root = model.root();
        let child = model.create_node("Text").unwrap();
        model.append_child(root, child).unwrap();
        model.remove_node(child).unwrap();

        let actions = vec![
            change(child, "text", "\"a\""),
            RewriteAction::ChangeType {
                node: child,
                type_name: "Label".to_string(),
            },
            RewriteAction::RemoveNode { node: child },
            RewriteAction::RemoveNode { node: child },
        ];
        assert_eq!(compress(actions, &model), vec![RewriteAction::RemoveNode { node: child }]);
    }

    #[test]
    fn test_created_then_removed_node_vanishes() {
        let mut model = Model::new("Item");
        let root = model.root();
        let child = model.create_node("Text").unwrap();
        model.append_child(root, child).unwrap();
        let insert = add_child(&model, root, child);
        model.remove_node(child).unwrap();

        let actions = vec![insert, change(child, "text", "\"a\""), RewriteAction::RemoveNode { node: child }];
        assert!(compress(actions, &model).is_empty());
    }

    #[test]
    fn test_changes_inside_pending_node_are_rendered_into_it() {
        let mut model = Model::new("Item");
        let root = model.root();
        let child = model.create_node("Text").unwrap();
        model.append_child(root, child).unwrap();
        let insert = add_child(&model, root, child);
        model.set_variant_property(child, "text", "hello").unwrap();
        model.set_id(child, Some("label")).unwrap();

        let actions = vec![
            insert,
            add(&model, child, "text"),
            RewriteAction::ChangeId {
                node: child,
                old_id: None,
                new_id: Some("label".to_string()),
            },
        ];
        let compressed = compress(actions, &model);
        assert_eq!(compressed.len(), 1);
        match &compressed[0] {
            RewriteAction::AddProperty { value_text, .. } => {
                assert_eq!(value_text, "Text {\n    id: label\n    text: \"hello\"\n}");
            }
            other => panic!("unexpected action {}", other),
        }
    }

    #[test]
    fn test_add_then_reparent_fuses() {
        let mut model = Model::new("Item");
        let root = model.root();
        let holder = model.create_node("Column").unwrap();
        model.append_child(root, holder).unwrap();
        let child = model.create_node("Text").unwrap();
        model.append_child(root, child).unwrap();
        let insert = add_child(&model, root, child);
        model.insert_child(holder, "data", 0, child).unwrap();

        let actions = vec![
            insert,
            RewriteAction::ReparentNode {
                node: child,
                old_property: Some(PropertyRef::new(root, "data")),
                target: PropertyRef::new(holder, "data"),
                target_kind: PropertyKind::NodeList,
            },
        ];
        let compressed = compress(actions, &model);
        assert_eq!(compressed.len(), 1);
        assert!(matches!(
            &compressed[0],
            RewriteAction::AddProperty { property, contained_node: Some(c), .. }
                if property.node == holder && *c == child
        ));
    }

    #[test]
    fn test_child_moved_out_of_dropped_nested_add_is_added() {
        let mut model = Model::new("Item");
        let root = model.root();
        let (a, c) = (model.create_node("A").unwrap(), model.create_node("C").unwrap());
        model.append_child(root, a).unwrap();
        model.append_child(root, c).unwrap();

        let outer = model.create_node("Outer").unwrap();
        model.append_child(root, outer).unwrap();
        let add_outer = add_child(&model, root, outer);
        let inner = model.create_node("Inner").unwrap();
        model.append_child(outer, inner).unwrap();
        let add_inner = add_child(&model, outer, inner);
        model.append_child(c, inner).unwrap();

        let actions = vec![
            add_outer,
            add_inner,
            RewriteAction::ReparentNode {
                node: inner,
                old_property: Some(PropertyRef::new(outer, "data")),
                target: PropertyRef::new(c, "data"),
                target_kind: PropertyKind::NodeList,
            },
        ];
        let compressed = compress(actions, &model);
        assert_eq!(compressed.len(), 2);
        assert!(matches!(
            &compressed[0],
            RewriteAction::AddProperty { contained_node: Some(n), embedded, .. }
                if *n == outer && embedded == &vec![outer]
        ));
        assert!(matches!(
            &compressed[1],
            RewriteAction::AddProperty { property, contained_node: Some(n), .. }
                if property.node == c && *n == inner
        ));
    }

    #[test]
    fn test_reparent_back_to_same_list_becomes_move() {
        let mut model = Model::new("Item");
        let root = model.root();
        let (a, b) = (model.create_node("A").unwrap(), model.create_node("B").unwrap());
        model.append_child(root, a).unwrap();
        model.append_child(root, b).unwrap();

        let data = PropertyRef::new(root, "data");
        let states = PropertyRef::new(root, "states");
        let actions = vec![
            RewriteAction::ReparentNode {
                node: a,
                old_property: Some(data.clone()),
                target: states.clone(),
                target_kind: PropertyKind::NodeList,
            },
            RewriteAction::ReparentNode {
                node: a,
                old_property: Some(states),
                target: data.clone(),
                target_kind: PropertyKind::NodeList,
            },
            RewriteAction::MoveNode {
                node: b,
                property: data.clone(),
            },
        ];
        assert_eq!(
            compress(actions, &model),
            vec![RewriteAction::MoveNode { node: b, property: data }]
        );
    }

    #[test]
    fn test_reparent_of_removed_node_removes_its_text() {
        let mut model = Model::new("Item");
        let root = model.root();
        let (a, b) = (model.create_node("A").unwrap(), model.create_node("B").unwrap());
        model.append_child(root, a).unwrap();
        model.append_child(root, b).unwrap();
        model.append_child(a, b).unwrap();
        model.remove_node(a).unwrap();

        let actions = vec![
            RewriteAction::ReparentNode {
                node: b,
                old_property: Some(PropertyRef::new(root, "data")),
                target: PropertyRef::new(a, "data"),
                target_kind: PropertyKind::NodeList,
            },
            RewriteAction::RemoveNode { node: a },
        ];
        assert_eq!(
            compress(actions, &model),
            vec![RewriteAction::RemoveNode { node: b }, RewriteAction::RemoveNode { node: a }]
        );
    }
}

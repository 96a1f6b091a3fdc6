//! Rewrite actions: one schedulable text edit intent per model change.

use crate::model::{Import, Model, NodeId, PropertyKind, PropertyRef};
use crate::refactoring::Refactoring;
use mosaic_common::find_object_at;
use mosaic_parser::ast::{Member, ObjectDef};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum RewriteAction {
    AddProperty {
        property: PropertyRef,
        /// Rendered right-hand side (the contained object for node kinds)
        value_text: String,
        kind: PropertyKind,
        /// Node whose creation this action carries
        contained_node: Option<NodeId>,
        /// Nodes whose text is embedded in `value_text`
        embedded: Vec<NodeId>,
    },
    ChangeProperty {
        property: PropertyRef,
        value_text: String,
        kind: PropertyKind,
        contained_node: Option<NodeId>,
        embedded: Vec<NodeId>,
    },
    RemoveProperty {
        property: PropertyRef,
    },
    ChangeId {
        node: NodeId,
        old_id: Option<String>,
        new_id: Option<String>,
    },
    ChangeType {
        node: NodeId,
        type_name: String,
    },
    RemoveNode {
        node: NodeId,
    },
    ReparentNode {
        node: NodeId,
        old_property: Option<PropertyRef>,
        target: PropertyRef,
        target_kind: PropertyKind,
    },
    /// Bring a list's text order in line with the model
    MoveNode {
        node: NodeId,
        property: PropertyRef,
    },
    AddImport {
        import: Import,
    },
    RemoveImport {
        import: Import,
    },
}

impl RewriteAction {
    /// Actions that relocate text and can disturb indentation anywhere
    pub fn is_reparent_class(&self) -> bool {
        matches!(self, RewriteAction::ReparentNode { .. } | RewriteAction::MoveNode { .. })
    }

    /// Node the action edits
    pub fn target_node(&self) -> Option<NodeId> {
        match self {
            RewriteAction::AddProperty { property, .. }
            | RewriteAction::ChangeProperty { property, .. }
            | RewriteAction::RemoveProperty { property }
            | RewriteAction::MoveNode { property, .. } => Some(property.node),
            RewriteAction::ChangeId { node, .. }
            | RewriteAction::ChangeType { node, .. }
            | RewriteAction::RemoveNode { node }
            | RewriteAction::ReparentNode { node, .. } => Some(*node),
            RewriteAction::AddImport { .. } | RewriteAction::RemoveImport { .. } => None,
        }
    }

    /// Node created by an add/change action
    pub fn contained_node(&self) -> Option<NodeId> {
        match self {
            RewriteAction::AddProperty { contained_node, .. }
            | RewriteAction::ChangeProperty { contained_node, .. } => *contained_node,
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        self.to_string()
    }

    /// Perform the text edit. Targets no longer reachable from the root are
    /// skipped and count as success.
    pub fn execute(&self, refactoring: &mut Refactoring<'_>, model: &Model) -> bool {
        match self {
            RewriteAction::AddProperty {
                property,
                value_text,
                kind,
                contained_node,
                embedded,
            }
            | RewriteAction::ChangeProperty {
                property,
                value_text,
                kind,
                contained_node,
                embedded,
            } => {
                if !model.is_in_hierarchy(property.node) {
                    return true;
                }
                // the node left the document again before this pass
                if matches!(contained_node, Some(node) if !model.is_in_hierarchy(*node)) {
                    return true;
                }
                let Some(owner) = refactoring.positions().node_offset(property.node) else {
                    return false;
                };
                let adding = matches!(self, RewriteAction::AddProperty { .. });
                match (kind, contained_node) {
                    (PropertyKind::NodeList, Some(node)) => {
                        insert_into_list(refactoring, model, owner, property, value_text, *node, embedded)
                    }
                    (PropertyKind::Node, Some(node)) => {
                        let done = if adding {
                            refactoring.add_property(owner, &property.name, value_text, *kind)
                        } else {
                            refactoring.change_property(owner, &property.name, value_text, *kind)
                        };
                        done && track_inserted(refactoring, model, owner, &property.name, None, *node, embedded)
                    }
                    _ if adding => refactoring.add_property(owner, &property.name, value_text, *kind),
                    _ => refactoring.change_property(owner, &property.name, value_text, *kind),
                }
            }
            RewriteAction::RemoveProperty { property } => {
                if !model.is_in_hierarchy(property.node) {
                    return true;
                }
                match refactoring.positions().node_offset(property.node) {
                    Some(owner) => refactoring.remove_property(owner, &property.name),
                    None => false,
                }
            }
            RewriteAction::ChangeId { node, new_id, .. } => {
                if !model.is_in_hierarchy(*node) {
                    return true;
                }
                match refactoring.positions().node_offset(*node) {
                    Some(offset) => refactoring.set_id(offset, new_id.as_deref()),
                    None => false,
                }
            }
            RewriteAction::ChangeType { node, type_name } => {
                if !model.is_in_hierarchy(*node) {
                    return true;
                }
                match refactoring.positions().node_offset(*node) {
                    Some(offset) => refactoring.change_object_type(offset, type_name),
                    None => false,
                }
            }
            RewriteAction::RemoveNode { node } => remove_node_text(refactoring, *node),
            RewriteAction::ReparentNode {
                node,
                target,
                target_kind,
                ..
            } => {
                if !model.is_in_hierarchy(*node) {
                    // it ended up in a removed subtree: its text just goes
                    return remove_node_text(refactoring, *node);
                }
                let (Some(offset), Some(owner)) = (
                    refactoring.positions().node_offset(*node),
                    refactoring.positions().node_offset(target.node),
                ) else {
                    return false;
                };
                let before = match target_kind {
                    PropertyKind::NodeList => {
                        next_sibling_in_text(refactoring, model, owner, target, *node).map(|(_, offset)| offset)
                    }
                    _ => None,
                };
                refactoring.move_object(offset, owner, &target.name, *target_kind, before)
            }
            RewriteAction::MoveNode { property, .. } => {
                if !model.is_in_hierarchy(property.node) {
                    return true;
                }
                let Some(owner) = refactoring.positions().node_offset(property.node) else {
                    return false;
                };
                sync_list_order(refactoring, model, owner, property)
            }
            RewriteAction::AddImport { import } => refactoring.add_import(import),
            RewriteAction::RemoveImport { import } => refactoring.remove_import(import),
        }
    }
}

impl fmt::Display for RewriteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewriteAction::AddProperty {
                property, value_text, ..
            } => write!(f, "AddProperty {} = {:?}", property, value_text),
            RewriteAction::ChangeProperty {
                property, value_text, ..
            } => write!(f, "ChangeProperty {} = {:?}", property, value_text),
            RewriteAction::RemoveProperty { property } => write!(f, "RemoveProperty {}", property),
            RewriteAction::ChangeId { node, old_id, new_id } => {
                write!(f, "ChangeId {} {:?} -> {:?}", node, old_id, new_id)
            }
            RewriteAction::ChangeType { node, type_name } => write!(f, "ChangeType {} -> {}", node, type_name),
            RewriteAction::RemoveNode { node } => write!(f, "RemoveNode {}", node),
            RewriteAction::ReparentNode {
                node,
                old_property,
                target,
                ..
            } => match old_property {
                Some(old) => write!(f, "ReparentNode {} {} -> {}", node, old, target),
                None => write!(f, "ReparentNode {} -> {}", node, target),
            },
            RewriteAction::MoveNode { node, property } => write!(f, "MoveNode {} in {}", node, property),
            RewriteAction::AddImport { import } => write!(f, "AddImport {}", import),
            RewriteAction::RemoveImport { import } => write!(f, "RemoveImport {}", import),
        }
    }
}

fn remove_node_text(refactoring: &mut Refactoring<'_>, node: NodeId) -> bool {
    let Some(offset) = refactoring.positions().node_offset(node) else {
        // never written, or gone with an ancestor
        return true;
    };
    let done = refactoring.remove_object(offset);
    refactoring.positions_mut().remove_node_offset(node);
    done
}

/// First model sibling after `node` that already sits in the target list's
/// text, with its offset
fn next_sibling_in_text(
    refactoring: &mut Refactoring<'_>,
    model: &Model,
    owner: usize,
    property: &PropertyRef,
    node: NodeId,
) -> Option<(NodeId, usize)> {
    let listed = refactoring.list_offsets(owner, &property.name);
    let siblings = model.nodes_in(property.node, &property.name);
    let index = siblings.iter().position(|n| *n == node)?;
    siblings[index + 1..].iter().find_map(|sibling| {
        refactoring
            .positions()
            .node_offset(*sibling)
            .filter(|offset| listed.contains(offset))
            .map(|offset| (*sibling, offset))
    })
}

fn insert_into_list(
    refactoring: &mut Refactoring<'_>,
    model: &Model,
    owner: usize,
    property: &PropertyRef,
    object_text: &str,
    node: NodeId,
    embedded: &[NodeId],
) -> bool {
    let next = next_sibling_in_text(refactoring, model, owner, property, node);
    let before = next.map(|(_, offset)| offset);
    let done = if property.name == model.default_property() {
        refactoring.add_to_object_member_list(owner, object_text, before)
    } else {
        refactoring.add_to_array_member_list(owner, &property.name, object_text, before)
    };
    done && track_inserted(
        refactoring,
        model,
        owner,
        &property.name,
        Some(next.map(|(n, _)| n)),
        node,
        embedded,
    )
}

/// Record offsets for a freshly inserted subtree. `inserted_before` is
/// `None` for single-node properties, otherwise the list sibling the object
/// went in front of. `embedded` lists the written objects in text order;
/// nodes removed since still get an offset so a later removal finds them.
fn track_inserted(
    refactoring: &mut Refactoring<'_>,
    model: &Model,
    owner: usize,
    name: &str,
    inserted_before: Option<Option<NodeId>>,
    node: NodeId,
    embedded: &[NodeId],
) -> bool {
    let listed = refactoring.list_offsets(owner, name);
    let start = match inserted_before {
        None => listed.first().copied(),
        Some(Some(next)) => refactoring
            .positions()
            .node_offset(next)
            .and_then(|offset| listed.iter().position(|o| *o == offset))
            .and_then(|index| index.checked_sub(1))
            .map(|index| listed[index]),
        Some(None) => listed.last().copied(),
    };
    let Some(start) = start else {
        return false;
    };
    let Ok(document) = refactoring.reparse() else {
        return false;
    };
    let Some(object) = find_object_at(&document, start) else {
        return false;
    };
    if embedded.first() == Some(&node) {
        let mut objects = Vec::with_capacity(embedded.len());
        collect_objects(object, &mut objects);
        for (embedded_node, object) in embedded.iter().zip(objects) {
            refactoring.positions_mut().set_node_offset(*embedded_node, object.span.start);
        }
    } else {
        assign_offsets(refactoring, model, node, object);
    }
    true
}

/// An object and all objects nested in it, in text order
fn collect_objects<'d>(object: &'d ObjectDef, objects: &mut Vec<&'d ObjectDef>) {
    objects.push(object);
    for member in &object.members {
        match member {
            Member::Object { object, .. } | Member::Child(object) => collect_objects(object, objects),
            Member::Array { objects: elements, .. } => {
                for element in elements {
                    collect_objects(element, objects);
                }
            }
            Member::Id { .. } | Member::Script { .. } | Member::Signal { .. } => {}
        }
    }
}

/// Walk a model subtree and its rendered object in step, recording offsets
pub(crate) fn assign_offsets(refactoring: &mut Refactoring<'_>, model: &Model, node: NodeId, object: &ObjectDef) {
    refactoring.positions_mut().set_node_offset(node, object.span.start);

    for property in model.properties(node) {
        let children = property.value.nodes();
        if children.is_empty() {
            continue;
        }
        let objects: Vec<&ObjectDef> = if property.name == model.default_property() {
            object.children().collect()
        } else {
            match object.member(&property.name) {
                Some(Member::Object { object, .. }) => vec![object],
                Some(Member::Array { objects, .. }) => objects.iter().collect(),
                _ => Vec::new(),
            }
        };
        for (child, child_object) in children.iter().zip(objects) {
            assign_offsets(refactoring, model, *child, child_object);
        }
    }
}

/// Move list elements so their text order follows the model order
fn sync_list_order(refactoring: &mut Refactoring<'_>, model: &Model, owner: usize, property: &PropertyRef) -> bool {
    let listed = refactoring.list_offsets(owner, &property.name);
    let nodes: Vec<NodeId> = model
        .nodes_in(property.node, &property.name)
        .iter()
        .copied()
        .filter(|node| {
            refactoring
                .positions()
                .node_offset(*node)
                .map(|offset| listed.contains(&offset))
                .unwrap_or(false)
        })
        .collect();

    let Some(last) = nodes.last() else {
        return true;
    };
    let mut next = *last;
    if let Some(offset) = refactoring.positions().node_offset(next) {
        if !refactoring.move_object_before_object(offset, None) {
            return false;
        }
    }

    for node in nodes.iter().rev().skip(1) {
        let (Some(offset), Some(before)) = (
            refactoring.positions().node_offset(*node),
            refactoring.positions().node_offset(next),
        ) else {
            return false;
        };
        if !refactoring.move_object_before_object(offset, Some(before)) {
            return false;
        }
        next = *node;
    }
    true
}

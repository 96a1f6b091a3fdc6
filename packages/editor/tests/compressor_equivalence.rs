//! Compressing a group's rewrite actions never changes the text it produces

use mosaic_editor::{ModelEditor, ModelError, NodeId, Rewriter, SyncConfig};
use proptest::prelude::*;

const SOURCE: &str = "Item {\n    width: 1\n    Text {\n        text: \"a\"\n    }\n}\n";
const NAMES: [&str; 4] = ["width", "height", "text", "visible"];
const EXPRESSIONS: [&str; 2] = ["parent.width", "x + 1"];
const IDS: [&str; 2] = ["first", "second"];
const TYPES: [&str; 3] = ["Rectangle", "Label", "Column"];

/// Node picks index into the run's pool: root, the `Text` child, then every
/// node created so far
#[derive(Debug, Clone)]
enum Op {
    SetVariant { target: usize, name: usize, value: i32 },
    SetBinding { target: usize, name: usize, expression: usize },
    Remove { target: usize, name: usize },
    SetId { target: usize, id: Option<usize> },
    Create { type_index: usize, parent: usize, attach: u8 },
    RemoveNode { target: usize },
    Reparent { node: usize, parent: usize, attach: u8 },
    MoveChild { parent: usize, from: usize, to: usize },
}

impl Op {
    fn is_structural(&self) -> bool {
        matches!(
            self,
            Op::Create { .. } | Op::RemoveNode { .. } | Op::Reparent { .. } | Op::MoveChild { .. }
        )
    }
}

fn arb_scalar_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..6usize, 0..4usize, 0..100i32).prop_map(|(target, name, value)| Op::SetVariant { target, name, value }),
        (0..6usize, 0..4usize, 0..2usize).prop_map(|(target, name, expression)| Op::SetBinding {
            target,
            name,
            expression
        }),
        (0..6usize, 0..4usize).prop_map(|(target, name)| Op::Remove { target, name }),
        (0..6usize, prop::option::of(0..2usize)).prop_map(|(target, id)| Op::SetId { target, id }),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => arb_scalar_op(),
        2 => (0..TYPES.len(), 0..6usize, 0..3u8).prop_map(|(type_index, parent, attach)| Op::Create {
            type_index,
            parent,
            attach
        }),
        1 => (1..6usize).prop_map(|target| Op::RemoveNode { target }),
        1 => (1..6usize, 0..6usize, 0..3u8).prop_map(|(node, parent, attach)| Op::Reparent { node, parent, attach }),
        1 => (0..6usize, 0..4usize, 0..4usize).prop_map(|(parent, from, to)| Op::MoveChild { parent, from, to }),
    ]
}

/// Put `child` under `parent`: default list, the `items` list, or the
/// single `border` slot
fn attach(editor: &mut ModelEditor<'_>, parent: NodeId, child: NodeId, how: u8) -> Result<(), ModelError> {
    match how {
        0 => editor.append_child(parent, child),
        1 => {
            let at = editor.nodes_in(parent, "items").len();
            editor.insert_child(parent, "items", at, child)
        }
        _ => editor.set_node_property(parent, "border", child),
    }
}

fn pick(pool: &[NodeId], index: usize) -> NodeId {
    pool[index % pool.len()]
}

fn apply(editor: &mut ModelEditor<'_>, pool: &mut Vec<NodeId>, op: &Op) -> Result<(), ModelError> {
    match *op {
        Op::SetVariant { target, name, value } => editor.set_variant_property(pick(pool, target), NAMES[name], value),
        Op::SetBinding {
            target,
            name,
            expression,
        } => editor.set_binding(pick(pool, target), NAMES[name], EXPRESSIONS[expression]),
        Op::Remove { target, name } => editor.remove_property(pick(pool, target), NAMES[name]),
        Op::SetId { target, id } => editor.set_id(pick(pool, target), id.map(|i| IDS[i])),
        Op::Create {
            type_index,
            parent,
            attach: how,
        } => {
            let parent = pick(pool, parent);
            let node = editor.create_node(TYPES[type_index])?;
            pool.push(node);
            attach(editor, parent, node, how)
        }
        Op::RemoveNode { target } => editor.remove_node(pick(pool, target)),
        Op::Reparent {
            node,
            parent,
            attach: how,
        } => attach(editor, pick(pool, parent), pick(pool, node), how),
        Op::MoveChild { parent, from, to } => {
            let parent = pick(pool, parent);
            let len = editor.nodes_in(parent, "data").len().max(1);
            editor.move_child(parent, "data", from % len, to % len)
        }
    }
}

/// Run every op in one modification group; failed model edits are skipped
fn run(ops: &[Op], compress_actions: bool) -> Result<Rewriter, TestCaseError> {
    let config = SyncConfig {
        compress_actions,
        ..SyncConfig::default()
    };
    let mut rewriter = Rewriter::new(SOURCE, config).map_err(|e| TestCaseError::fail(e.to_string()))?;
    let root = rewriter.model().root();
    let mut pool = vec![root, rewriter.model().children(root)[0]];

    let token = rewriter.begin_modification_group();
    for op in ops {
        let _ = rewriter.mutate(|editor| apply(editor, &mut pool, op));
    }
    rewriter
        .end_modification_group(token)
        .map_err(|e| TestCaseError::fail(format!("{} after {:?} (compressed: {})", e, ops, compress_actions)))?;
    Ok(rewriter)
}

/// Text with all whitespace dropped. A body emptied in place stays open
/// while a re-rendered one is written as `{}`.
fn squeezed(text: &str) -> String {
    text.split_whitespace().collect()
}

proptest! {
    #[test]
    fn prop_compressed_pass_writes_same_text(ops in prop::collection::vec(arb_scalar_op(), 1..10)) {
        let compressed = run(&ops, true)?;
        let plain = run(&ops, false)?;

        prop_assert_eq!(compressed.text(), plain.text());
        prop_assert!(compressed.model().structurally_equal(plain.model()));
        prop_assert!(compressed.stats().actions_executed <= plain.stats().actions_executed);
    }

    #[test]
    fn prop_compressed_structural_pass_writes_same_text(ops in prop::collection::vec(arb_op(), 1..12)) {
        let compressed = run(&ops, true)?;
        let plain = run(&ops, false)?;

        prop_assert!(compressed.model().structurally_equal(plain.model()));
        if ops.iter().any(Op::is_structural) {
            prop_assert_eq!(squeezed(compressed.text()), squeezed(plain.text()));
        } else {
            prop_assert_eq!(compressed.text(), plain.text());
        }
    }
}

#[test]
fn test_churn_on_one_property_collapses() {
    let ops: Vec<Op> = (0..5)
        .map(|value| Op::SetVariant {
            target: 1,
            name: 1,
            value,
        })
        .chain([Op::Remove { target: 1, name: 1 }])
        .collect();

    let compressed = run(&ops, true).unwrap();
    let plain = run(&ops, false).unwrap();
    assert_eq!(compressed.text(), SOURCE);
    assert_eq!(plain.text(), SOURCE);
    assert_eq!(compressed.stats().actions_executed, 0);
    assert!(plain.stats().actions_executed > 0);
}

#[test]
fn test_grandchild_moved_out_of_new_subtree() {
    let source = "Item {\n    A {}\n    C {}\n}\n";
    let ops = [
        // pool: root, A, then the created nodes
        Op::Create {
            type_index: 0,
            parent: 0,
            attach: 0,
        },
        Op::Create {
            type_index: 1,
            parent: 2,
            attach: 0,
        },
    ];
    let mut texts = Vec::new();
    for compress_actions in [true, false] {
        let config = SyncConfig {
            compress_actions,
            ..SyncConfig::default()
        };
        let mut rewriter = Rewriter::new(source, config).unwrap();
        let root = rewriter.model().root();
        let c = rewriter.model().children(root)[1];
        let mut pool = vec![root, rewriter.model().children(root)[0]];

        let token = rewriter.begin_modification_group();
        for op in &ops {
            rewriter.mutate(|editor| apply(editor, &mut pool, op)).unwrap();
        }
        rewriter.mutate(|editor| editor.append_child(c, pool[3])).unwrap();
        rewriter.end_modification_group(token).unwrap();

        assert_eq!(rewriter.model().children(c), &[pool[3]]);
        texts.push(squeezed(rewriter.text()));
    }
    assert_eq!(texts[0], texts[1]);
    assert_eq!(texts[0], "Item{A{}C{Label{}}Rectangle{}}");
}

#[test]
fn test_reparent_into_new_node_then_remove_it() {
    let ops = [
        Op::Create {
            type_index: 2,
            parent: 0,
            attach: 1,
        },
        Op::Reparent {
            node: 1,
            parent: 2,
            attach: 2,
        },
        Op::SetVariant {
            target: 1,
            name: 0,
            value: 7,
        },
        Op::RemoveNode { target: 2 },
    ];
    let compressed = run(&ops, true).unwrap();
    let plain = run(&ops, false).unwrap();
    assert_eq!(compressed.text(), plain.text());
    assert_eq!(compressed.text(), "Item {\n    width: 1\n}\n");
}

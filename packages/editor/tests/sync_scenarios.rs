//! End-to-end synchronization scenarios through the public `Rewriter` API

use anyhow::Result;
use mosaic_editor::{
    reindent, ApplierState, Import, Model, PropertyKind, PropertyRef, PropertyValue, ReindentScope, RewriteAction,
    RewriteActionCompressor, Rewriter, SyncConfig, SyncNotification, Value,
};
use pretty_assertions::assert_eq;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn rewriter(text: &str) -> Result<Rewriter> {
    init_tracing();
    Ok(Rewriter::new(text, SyncConfig::default())?)
}

/// The text re-parsed into a fresh model matches the live model
fn assert_round_trips(rewriter: &Rewriter) -> Result<()> {
    let reparsed = Rewriter::new(rewriter.text(), SyncConfig::default())?;
    assert!(
        reparsed.model().structurally_equal(rewriter.model()),
        "text does not reproduce the model:\n{}",
        rewriter.text()
    );
    Ok(())
}

#[test]
fn test_add_property_inserts_member() -> Result<()> {
    let mut rewriter = rewriter("Rectangle {\n    height: 5\n}\n")?;
    let root = rewriter.model().root();

    rewriter.mutate(|model| model.set_variant_property(root, "width", 10))?;

    assert_eq!(rewriter.text(), "Rectangle {\n    height: 5\n    width: 10\n}\n");
    assert_round_trips(&rewriter)
}

#[test]
fn test_change_property_replaces_only_the_value() -> Result<()> {
    let mut rewriter = rewriter("Item {\n    width: 10; height: 3\n    Text {}\n}\n")?;
    let root = rewriter.model().root();
    let text_node = rewriter.model().children(root)[0];
    let before = rewriter.node_offset(text_node);

    // same length, following line: offset unchanged
    rewriter.mutate(|model| model.set_variant_property(root, "width", 20))?;
    assert_eq!(rewriter.text(), "Item {\n    width: 20; height: 3\n    Text {}\n}\n");
    assert_eq!(rewriter.node_offset(text_node), before);

    // one character longer on the same line as the child
    let mut inline = Rewriter::new("Row { width: 10; Text {} }\n", SyncConfig::default())?;
    let row = inline.model().root();
    let child = inline.model().children(row)[0];
    let start = inline.text().find("Text");
    assert_eq!(inline.node_offset(child), start);

    inline.mutate(|model| model.set_variant_property(row, "width", 200))?;
    assert_eq!(inline.text(), "Row { width: 200; Text {} }\n");
    assert_eq!(inline.node_offset(child), start.map(|s| s + 1));
    assert_round_trips(&inline)
}

#[test]
fn test_remove_middle_sibling() -> Result<()> {
    let mut rewriter = rewriter("Column {\n    A {}\n    B {}\n    C {}\n}\n")?;
    let root = rewriter.model().root();
    let [a, b, c] = [0, 1, 2].map(|i| rewriter.model().children(root)[i]);

    rewriter.mutate(|model| model.remove_node(b))?;

    assert_eq!(rewriter.text(), "Column {\n    A {}\n    C {}\n}\n");
    assert_eq!(rewriter.model().children(root), &[a, c]);
    assert_eq!(rewriter.node_offset(b), None);
    assert_eq!(rewriter.node_offset(a), rewriter.text().find("A {}"));
    assert_eq!(rewriter.node_offset(c), rewriter.text().find("C {}"));
    assert_round_trips(&rewriter)
}

#[test]
fn test_reparent_into_named_list_reindents_everything() -> Result<()> {
    let mut rewriter = rewriter("Item {\n    A {\n        X {}\n    }\n    B {}\n}\n")?;
    let root = rewriter.model().root();
    let a = rewriter.model().children(root)[0];
    let b = rewriter.model().children(root)[1];
    let x = rewriter.model().children(a)[0];

    rewriter.mutate(|model| model.insert_child(b, "items", 0, x))?;

    let text = rewriter.text().to_string();
    assert_eq!(rewriter.model().nodes_in(b, "items"), &[x]);
    assert!(rewriter.model().children(a).is_empty());
    assert!(text.lines().any(|line| line == "            X {}"), "{}", text);
    assert!(reindent(&text, None, "    ").is_empty(), "{}", text);

    let report = rewriter.last_report().expect("a pass ran");
    assert_eq!(report.reindent, ReindentScope::All);
    assert!(!report.dirty.is_empty());
    assert_eq!(rewriter.node_offset(x), text.find("X {}"));
    assert_round_trips(&rewriter)
}

#[test]
fn test_add_then_remove_in_one_group_writes_nothing() -> Result<()> {
    let original = "Item {\n    height: 1\n}\n";
    let mut rewriter = rewriter(original)?;
    let root = rewriter.model().root();

    let token = rewriter.begin_modification_group();
    rewriter.mutate(|model| model.set_variant_property(root, "p", 1))?;
    rewriter.mutate(|model| model.remove_property(root, "p"))?;
    rewriter.end_modification_group(token)?;

    assert_eq!(rewriter.text(), original);
    assert_eq!(rewriter.stats().actions_executed, 0);
    assert!(!rewriter.undo_stack().can_undo());

    // the same queue through the compressor directly
    let property = PropertyRef::new(root, "p");
    let queue = vec![
        RewriteAction::AddProperty {
            property: property.clone(),
            value_text: "1".to_string(),
            kind: PropertyKind::Variant,
            contained_node: None,
            embedded: Vec::new(),
        },
        RewriteAction::RemoveProperty { property },
    ];
    let compressed = RewriteActionCompressor::compress(queue, rewriter.model(), rewriter.config());
    assert!(compressed.is_empty());
    Ok(())
}

#[test]
fn test_syntax_error_leaves_model_untouched() -> Result<()> {
    let mut rewriter = rewriter("Item {\n    width: 10\n    Text { text: \"a\" }\n}\n")?;
    let before = rewriter.model().clone();

    let at = rewriter.text().find("Text").unwrap_or_default();
    assert!(!rewriter.edit_text(at, 4, "Text {{"));

    assert!(rewriter.model().structurally_equal(&before));
    assert!(!rewriter.errors().is_empty());
    assert!(rewriter.errors()[0].line > 0);
    assert_eq!(rewriter.last_correct_text(), "Item {\n    width: 10\n    Text { text: \"a\" }\n}\n");

    // fixing the text merges again
    assert!(rewriter.edit_text(at, "Text {{".len(), "Text"));
    assert!(rewriter.errors().is_empty());
    Ok(())
}

#[test]
fn test_repeated_broken_edits_never_touch_model() -> Result<()> {
    let mut rewriter = rewriter("Item {\n    A { id: a }\n    width: 2\n}\n")?;
    let before = rewriter.model().clone();

    for (offset, insert) in [(0, "}"), (7, "["), (11, "A {"), (24, ": :")] {
        assert!(!rewriter.edit_text(offset, 0, insert));
        assert!(rewriter.model().structurally_equal(&before));
    }
    Ok(())
}

#[test]
fn test_nested_groups_apply_once() -> Result<()> {
    let mut rewriter = rewriter("Item {\n}\n")?;
    let root = rewriter.model().root();

    let tokens: Vec<_> = (0..3).map(|_| rewriter.begin_modification_group()).collect();
    for i in 0..5 {
        let name = format!("p{}", i);
        rewriter.mutate(|model| model.set_variant_property(root, &name, i))?;
    }
    assert_eq!(rewriter.text(), "Item {\n}\n");

    for token in tokens.into_iter().rev() {
        rewriter.end_modification_group(token)?;
    }

    assert_eq!(rewriter.stats().apply_passes, 1);
    assert_eq!(rewriter.undo_stack().undo_levels(), 1);
    assert_eq!(
        rewriter.take_notifications(),
        vec![SyncNotification::ApplyStarted, SyncNotification::ApplyFinished]
    );
    for i in 0..5 {
        assert!(rewriter.text().contains(&format!("p{}: {}", i, i)));
    }
    assert_round_trips(&rewriter)
}

#[test]
fn test_transaction_helper_groups_mutations() -> Result<()> {
    let mut rewriter = rewriter("Item {\n}\n")?;
    let root = rewriter.model().root();

    let child = rewriter.transaction(|rewriter| {
        let child = rewriter.mutate(|model| model.create_node("Text"))?;
        rewriter.mutate(|model| model.set_variant_property(child, "text", "hello"))?;
        rewriter.mutate(|model| model.set_id(child, Some("label")))?;
        rewriter.mutate(|model| model.append_child(root, child))?;
        Ok(child)
    })?;

    assert_eq!(
        rewriter.text(),
        "Item {\n    Text {\n        id: label\n        text: \"hello\"\n    }\n}\n"
    );
    assert_eq!(rewriter.stats().apply_passes, 1);
    assert_eq!(rewriter.node_offset(child), rewriter.text().find("Text"));
    Ok(())
}

#[test]
fn test_imports_follow_the_model() -> Result<()> {
    let mut rewriter = rewriter("import Mosaic.Controls 2.15\n\nItem {\n}\n")?;
    let controls = Import::library("Mosaic.Controls", Some("2.15"));
    let parts = Import::file("parts").with_alias("Parts");

    rewriter.mutate(|model| model.add_import(parts.clone()))?;
    assert!(rewriter.text().contains("import \"parts\" as Parts"));

    rewriter.mutate(|model| model.remove_import(&controls))?;
    assert!(!rewriter.text().contains("Mosaic.Controls"));
    assert_eq!(rewriter.model().imports(), &[parts]);
    assert_round_trips(&rewriter)
}

#[test]
fn test_external_edit_then_model_edit() -> Result<()> {
    let mut rewriter = rewriter("Item {\n    Text {\n    }\n}\n")?;
    let root = rewriter.model().root();
    let child = rewriter.model().children(root)[0];

    assert!(rewriter.edit_text(0, 0, "// header\n"));
    assert_eq!(rewriter.node_offset(child), rewriter.text().find("Text"));

    rewriter.mutate(|model| model.set_binding(child, "text", "root.title"))?;
    assert_eq!(
        rewriter.text(),
        "// header\nItem {\n    Text {\n        text: root.title\n    }\n}\n"
    );
    assert_eq!(
        rewriter.model().property(child, "text"),
        Some(&PropertyValue::Binding("root.title".to_string()))
    );
    Ok(())
}

#[test]
fn test_external_edit_amends_structure() -> Result<()> {
    let mut rewriter = rewriter("Item {\n    A { id: a }\n    B { id: b }\n}\n")?;
    let root = rewriter.model().root();
    let [a, b] = [0, 1].map(|i| rewriter.model().children(root)[i]);

    // swap the two children in the text
    let text = "Item {\n    B { id: b; width: 1 }\n    A { id: a }\n}\n";
    let length = rewriter.text().len();
    assert!(rewriter.edit_text(0, length, text));

    assert_eq!(rewriter.model().children(root), &[b, a]);
    assert_eq!(
        rewriter.model().property(b, "width"),
        Some(&PropertyValue::Variant(Value::Number(1.0)))
    );
    assert_eq!(rewriter.node_offset(a), rewriter.text().find("A {"));
    assert_eq!(rewriter.stats().apply_passes, 0);
    Ok(())
}

#[test]
fn test_undo_reverts_a_whole_group() -> Result<()> {
    let original = "Item {\n}\n";
    let mut rewriter = rewriter(original)?;
    let root = rewriter.model().root();

    rewriter.transaction(|rewriter| {
        rewriter.mutate(|model| model.set_variant_property(root, "width", 1))?;
        rewriter.mutate(|model| model.set_id(root, Some("root")))
    })?;
    assert_ne!(rewriter.text(), original);

    assert!(rewriter.undo()?);
    assert_eq!(rewriter.text(), original);
    assert!(rewriter.model().structurally_equal(&Model::new("Item")));
    Ok(())
}

#[test]
fn test_error_state_recovers_last_correct_text() -> Result<()> {
    let mut rewriter = rewriter("Item {\n    width: 1\n}\n")?;
    let root = rewriter.model().root();

    let token = rewriter.begin_modification_group();
    rewriter.mutate(|model| model.set_variant_property(root, "width", 2))?;
    // the host breaks the text while the group is open
    let length = rewriter.text().len();
    rewriter.edit_text(0, length, "Item {\n    width: 1\n");
    assert!(rewriter.end_modification_group(token).is_err());
    assert_eq!(rewriter.state(), ApplierState::Error);
    assert!(!rewriter.errors().is_empty());

    rewriter.clear_error_state()?;
    assert_eq!(rewriter.text(), "Item {\n    width: 1\n}\n");
    assert_eq!(
        rewriter.model().property(root, "width"),
        Some(&PropertyValue::Variant(Value::Number(1.0)))
    );
    Ok(())
}

/// Text with all whitespace dropped; an emptied body stays open in place
/// while a re-rendered one is written as `{}`
fn squeezed(text: &str) -> String {
    text.split_whitespace().collect()
}

fn rewriter_with(text: &str, compress_actions: bool) -> Result<Rewriter> {
    init_tracing();
    let config = SyncConfig {
        compress_actions,
        ..SyncConfig::default()
    };
    Ok(Rewriter::new(text, config)?)
}

#[test]
fn test_grandchild_moved_out_of_new_subtree() -> Result<()> {
    let mut texts = Vec::new();
    for compress_actions in [true, false] {
        let mut rewriter = rewriter_with("Item {\n    A {}\n    C {}\n}\n", compress_actions)?;
        let root = rewriter.model().root();
        let c = rewriter.model().children(root)[1];

        let token = rewriter.begin_modification_group();
        let outer = rewriter.mutate(|model| {
            let outer = model.create_node("Outer")?;
            model.append_child(root, outer)?;
            Ok(outer)
        })?;
        let inner = rewriter.mutate(|model| {
            let inner = model.create_node("Inner")?;
            model.append_child(outer, inner)?;
            Ok(inner)
        })?;
        rewriter.mutate(|model| model.append_child(c, inner))?;
        rewriter.end_modification_group(token)?;

        assert_eq!(rewriter.model().children(c), &[inner]);
        assert!(rewriter.model().children(outer).is_empty());
        assert_eq!(rewriter.text().matches("Inner").count(), 1);
        assert!(rewriter.node_offset(inner) > rewriter.text().find("C {"));
        assert!(rewriter.node_offset(inner) < rewriter.text().find("Outer"));
        assert_round_trips(&rewriter)?;
        texts.push(squeezed(rewriter.text()));
    }
    assert_eq!(texts[0], texts[1]);
    Ok(())
}

#[test]
fn test_new_node_removed_in_same_group() -> Result<()> {
    let original = "Item {\n    width: 1\n    A {\n        B {}\n    }\n    C {}\n}\n";
    for compress_actions in [true, false] {
        let mut rewriter = rewriter_with(original, compress_actions)?;
        let root = rewriter.model().root();
        let a = rewriter.model().children(root)[0];

        let token = rewriter.begin_modification_group();
        let node = rewriter.mutate(|model| {
            let node = model.create_node("N")?;
            model.append_child(a, node)?;
            Ok(node)
        })?;
        rewriter.mutate(|model| model.remove_node(node))?;
        rewriter.end_modification_group(token)?;

        assert_eq!(rewriter.text(), original);
        assert_eq!(rewriter.node_offset(node), None);
        assert_round_trips(&rewriter)?;
    }
    Ok(())
}

#[test]
fn test_new_subtree_loses_a_descendant_in_same_group() -> Result<()> {
    let original = "Item {\n    A {}\n}\n";
    let mut texts = Vec::new();
    for compress_actions in [true, false] {
        let mut rewriter = rewriter_with(original, compress_actions)?;
        let root = rewriter.model().root();

        let token = rewriter.begin_modification_group();
        let (outer, inner) = rewriter.mutate(|model| {
            let outer = model.create_node("Outer")?;
            let inner = model.create_node("Inner")?;
            model.append_child(outer, inner)?;
            model.append_child(root, outer)?;
            Ok((outer, inner))
        })?;
        rewriter.mutate(|model| model.remove_node(inner))?;
        rewriter.end_modification_group(token)?;

        assert!(!rewriter.text().contains("Inner"));
        assert_eq!(rewriter.node_offset(outer), rewriter.text().find("Outer"));
        assert_round_trips(&rewriter)?;
        texts.push(squeezed(rewriter.text()));
    }
    assert_eq!(texts[0], texts[1]);
    Ok(())
}

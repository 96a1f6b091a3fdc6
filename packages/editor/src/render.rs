//! Markup generation from the model.
//!
//! Output starts at indentation level zero with the first line unindented;
//! callers splice it into existing text and prefix the following lines with
//! the indentation of the insertion point (see [`indent_lines`]).

use crate::model::{Model, NodeId, Property, PropertyKind, PropertyValue};
use mosaic_parser::serializer::{serialize_literal, Printer};

/// Render a node and its subtree as an object definition
pub fn render_object(model: &Model, node: NodeId, indent_width: usize) -> String {
    let mut printer = Printer::new(indent_width);
    write_object(&mut printer, model, node);
    printer.finish()
}

/// Right-hand side of a property: literal, expression, object or array.
/// Signal declarations render their parameter list.
pub fn render_value(model: &Model, node: NodeId, name: &str, indent_width: usize) -> Option<String> {
    let value = model.property(node, name)?;
    let mut printer = Printer::new(indent_width);
    write_value(&mut printer, model, value);
    Some(printer.finish())
}

/// Nodes of a subtree in the order [`render_object`] writes their objects,
/// which is also the order they appear in the rendered text
pub fn render_order(model: &Model, node: NodeId) -> Vec<NodeId> {
    let mut order = Vec::new();
    collect_render_order(model, node, &mut order);
    order
}

fn collect_render_order(model: &Model, node: NodeId, order: &mut Vec<NodeId>) {
    if !model.contains(node) {
        return;
    }
    order.push(node);
    for property in sorted_properties(model, node) {
        for child in property.value.nodes() {
            collect_render_order(model, *child, order);
        }
    }
}

/// Member text from an already rendered value
pub fn member_text(name: &str, value: &str, kind: PropertyKind) -> String {
    match kind {
        PropertyKind::SignalDeclaration => format!("signal {}({})", name, value),
        _ => format!("{}: {}", name, value),
    }
}

/// Wrap a rendered object as the value of a list property
pub fn array_text(object: &str, unit: &str) -> String {
    format!("[\n{}{}\n]", unit, indent_lines(object, unit))
}

/// Imports followed by the root object
pub fn render_document(model: &Model, indent_width: usize) -> String {
    let mut output = String::new();
    for import in model.imports() {
        output.push_str(&import.to_source());
        output.push('\n');
    }
    if !model.imports().is_empty() {
        output.push('\n');
    }
    output.push_str(&render_object(model, model.root(), indent_width));
    output.push('\n');
    output
}

/// Prefix every line after the first with `indent`
pub fn indent_lines(text: &str, indent: &str) -> String {
    if indent.is_empty() {
        return text.to_string();
    }
    let mut lines = text.split('\n');
    let mut result = lines.next().unwrap_or_default().to_string();
    for line in lines {
        result.push('\n');
        if !line.is_empty() {
            result.push_str(indent);
        }
        result.push_str(line);
    }
    result
}

/// Rendering order of members inside an object body
fn member_rank(model: &Model, property: &Property) -> u8 {
    match property.value.kind() {
        PropertyKind::SignalDeclaration => 0,
        PropertyKind::Variant | PropertyKind::Binding | PropertyKind::SignalHandler => 1,
        PropertyKind::Node => 2,
        PropertyKind::NodeList if property.name == model.default_property() => 4,
        PropertyKind::NodeList => 3,
    }
}

fn sorted_properties(model: &Model, node: NodeId) -> Vec<&Property> {
    let mut properties: Vec<&Property> = model.properties(node).iter().collect();
    properties.sort_by_key(|property| member_rank(model, property));
    properties
}

fn write_object(printer: &mut Printer, model: &Model, node: NodeId) {
    let type_name = model.type_name(node).unwrap_or_default();
    let properties = sorted_properties(model, node);

    if model.id(node).is_none() && properties.is_empty() {
        printer.write(&format!("{} {{}}", type_name));
        return;
    }

    printer.write(&format!("{} {{", type_name));
    printer.indent();
    if let Some(id) = model.id(node) {
        printer.newline();
        printer.write(&format!("id: {}", id));
    }

    for property in properties {
        if property.name == model.default_property() {
            for child in property.value.nodes() {
                printer.newline();
                write_object(printer, model, *child);
            }
            continue;
        }

        printer.newline();
        match &property.value {
            PropertyValue::SignalDeclaration(params) => {
                printer.write(&format!("signal {}({})", property.name, params));
            }
            value => {
                printer.write(&format!("{}: ", property.name));
                write_value(printer, model, value);
            }
        }
    }

    printer.dedent();
    printer.newline();
    printer.write("}");
}

fn write_value(printer: &mut Printer, model: &Model, value: &PropertyValue) {
    match value {
        PropertyValue::Variant(value) => printer.write(&serialize_literal(&value.to_literal())),
        PropertyValue::Binding(text)
        | PropertyValue::SignalHandler(text)
        | PropertyValue::SignalDeclaration(text) => printer.write(text),
        PropertyValue::Node(child) => write_object(printer, model, *child),
        PropertyValue::NodeList(children) => {
            printer.write("[");
            printer.indent();
            for (index, child) in children.iter().enumerate() {
                if index > 0 {
                    printer.write(",");
                }
                printer.newline();
                write_object(printer, model, *child);
            }
            printer.dedent();
            printer.newline();
            printer.write("]");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Import;
    use pretty_assertions::assert_eq;

    fn sample() -> Model {
        let mut model = Model::new("Rectangle");
        let root = model.root();
        model.set_id(root, Some("root")).unwrap();
        model.set_variant_property(root, "width", 10).unwrap();
        model.set_binding(root, "height", "parent.height * 2").unwrap();
        model.set_signal_declaration(root, "activated", "int x").unwrap();

        let border = model.create_node("Border").unwrap();
        model.set_variant_property(border, "width", 2).unwrap();
        model.set_node_property(root, "border", border).unwrap();

        for _ in 0..2 {
            let state = model.create_node("State").unwrap();
            let len = model.nodes_in(root, "states").len();
            model.insert_child(root, "states", len, state).unwrap();
        }

        let text = model.create_node("Text").unwrap();
        model.set_variant_property(text, "text", "child").unwrap();
        model.append_child(root, text).unwrap();
        model.add_import(Import::library("Mosaic.Controls", Some("2.15"))).unwrap();
        model
    }

    #[test]
    fn test_render_document() {
        let model = sample();
        assert_eq!(
            render_document(&model, 4),
            r#"import Mosaic.Controls 2.15

Rectangle {
    id: root
    signal activated(int x)
    width: 10
    height: parent.height * 2
    border: Border {
        width: 2
    }
    states: [
        State {},
        State {}
    ]
    Text {
        text: "child"
    }
}
"#
        );
    }

    #[test]
    fn test_render_value_and_member() {
        let model = sample();
        let root = model.root();
        assert_eq!(render_value(&model, root, "width", 4).as_deref(), Some("10"));
        let params = render_value(&model, root, "activated", 4).unwrap();
        assert_eq!(
            member_text("activated", &params, PropertyKind::SignalDeclaration),
            "signal activated(int x)"
        );
        assert_eq!(render_value(&model, root, "missing", 4), None);
    }

    #[test]
    fn test_render_order_follows_text() {
        let model = sample();
        let root = model.root();
        let types: Vec<&str> = render_order(&model, root)
            .into_iter()
            .filter_map(|node| model.type_name(node))
            .collect();
        assert_eq!(types, vec!["Rectangle", "Border", "State", "State", "Text"]);

        let text = render_object(&model, root, 4);
        let mut cursor = 0;
        for name in &types[1..] {
            let found = text[cursor..].find(&format!("{} {{", name)).map(|at| at + cursor);
            assert!(found.is_some(), "{} out of order", name);
            cursor = found.unwrap_or_default() + 1;
        }
    }

    #[test]
    fn test_indent_lines_skips_first_and_blank_lines() {
        assert_eq!(indent_lines("A {\n\n}", "  "), "A {\n\n  }");
        assert_eq!(array_text("A {\n}", "    "), "[\n    A {\n    }\n]");
    }
}

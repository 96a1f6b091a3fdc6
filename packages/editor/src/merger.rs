//! # Text → Model
//!
//! [`TextToModelMerger`] walks a parsed document alongside the model and
//! reports every difference to a [`DifferenceHandler`]. Objects are matched
//! by source order; within lists a node whose id (or type) shows up later in
//! the model is moved into place first.
//!
//! [`ValidateHandler`] turns every difference into an error and never
//! touches the model. [`AmendHandler`] edits the model until it matches the
//! text.

use crate::errors::ModelError;
use crate::events::ModelEditor;
use crate::messages::DocumentMessage;
use crate::model::{normalize_whitespace, Import, NodeId, PropertyKind, PropertyRef, PropertyValue, Value};
use crate::positions::PositionStore;
use mosaic_common::TextLocation;
use mosaic_parser::ast::{is_signal_handler_name, ImportDecl, Member, ObjectDef, ScriptValue, Span};
use mosaic_parser::{parse, serialize_literal};
use tracing::{debug, instrument};

/// Callbacks for each kind of discrepancy between text and model
pub trait DifferenceHandler {
    fn import_absent_in_text(&mut self, editor: &mut ModelEditor<'_>, import: &Import) -> Result<(), DocumentMessage>;

    fn import_absent_in_model(&mut self, editor: &mut ModelEditor<'_>, import: &Import)
        -> Result<(), DocumentMessage>;

    fn node_absent_in_text(&mut self, editor: &mut ModelEditor<'_>, node: NodeId) -> Result<(), DocumentMessage>;

    /// Returns the node now standing for `object`, if one was created.
    /// `index` is `None` for single-node properties.
    fn object_absent_in_model(
        &mut self,
        editor: &mut ModelEditor<'_>,
        owner: NodeId,
        name: &str,
        index: Option<usize>,
        object: &ObjectDef,
    ) -> Result<Option<NodeId>, DocumentMessage>;

    fn type_differs(
        &mut self,
        editor: &mut ModelEditor<'_>,
        node: NodeId,
        type_name: &str,
    ) -> Result<(), DocumentMessage>;

    fn id_differs(&mut self, editor: &mut ModelEditor<'_>, node: NodeId, id: Option<&str>)
        -> Result<(), DocumentMessage>;

    fn property_absent_in_text(
        &mut self,
        editor: &mut ModelEditor<'_>,
        property: &PropertyRef,
    ) -> Result<(), DocumentMessage>;

    fn property_absent_in_model(
        &mut self,
        editor: &mut ModelEditor<'_>,
        property: &PropertyRef,
        value: &PropertyValue,
    ) -> Result<(), DocumentMessage>;

    fn property_value_differs(
        &mut self,
        editor: &mut ModelEditor<'_>,
        property: &PropertyRef,
        value: &PropertyValue,
    ) -> Result<(), DocumentMessage>;

    /// `value` is the text's scalar value; `None` when the text holds objects
    fn property_kind_differs(
        &mut self,
        editor: &mut ModelEditor<'_>,
        property: &PropertyRef,
        expected: PropertyKind,
        value: Option<&PropertyValue>,
    ) -> Result<(), DocumentMessage>;

    /// Move the node at `from` to `to` within a list property
    fn node_order_differs(
        &mut self,
        editor: &mut ModelEditor<'_>,
        property: &PropertyRef,
        from: usize,
        to: usize,
    ) -> Result<(), DocumentMessage>;
}

/// Fails on the first difference
#[derive(Debug, Default)]
pub struct ValidateHandler;

impl DifferenceHandler for ValidateHandler {
    fn import_absent_in_text(&mut self, _: &mut ModelEditor<'_>, import: &Import) -> Result<(), DocumentMessage> {
        Err(DocumentMessage::error(format!("Import '{}' is missing from the text", import)))
    }

    fn import_absent_in_model(&mut self, _: &mut ModelEditor<'_>, import: &Import) -> Result<(), DocumentMessage> {
        Err(DocumentMessage::error(format!("Import '{}' is not in the model", import)))
    }

    fn node_absent_in_text(&mut self, _: &mut ModelEditor<'_>, node: NodeId) -> Result<(), DocumentMessage> {
        Err(DocumentMessage::error(format!("Node {} is missing from the text", node)))
    }

    fn object_absent_in_model(
        &mut self,
        _: &mut ModelEditor<'_>,
        owner: NodeId,
        name: &str,
        _: Option<usize>,
        object: &ObjectDef,
    ) -> Result<Option<NodeId>, DocumentMessage> {
        Err(DocumentMessage::error(format!(
            "Object '{}' in {}.{} is not in the model",
            object.type_name, owner, name
        )))
    }

    fn type_differs(&mut self, editor: &mut ModelEditor<'_>, node: NodeId, type_name: &str) -> Result<(), DocumentMessage> {
        Err(DocumentMessage::error(format!(
            "Node {} is a '{}' in the model but a '{}' in the text",
            node,
            editor.type_name(node).unwrap_or_default(),
            type_name
        )))
    }

    fn id_differs(&mut self, editor: &mut ModelEditor<'_>, node: NodeId, id: Option<&str>) -> Result<(), DocumentMessage> {
        Err(DocumentMessage::error(format!(
            "Node {} has id {:?} in the model but {:?} in the text",
            node,
            editor.id(node),
            id
        )))
    }

    fn property_absent_in_text(&mut self, _: &mut ModelEditor<'_>, property: &PropertyRef) -> Result<(), DocumentMessage> {
        Err(DocumentMessage::error(format!("Property {} is missing from the text", property)))
    }

    fn property_absent_in_model(
        &mut self,
        _: &mut ModelEditor<'_>,
        property: &PropertyRef,
        _: &PropertyValue,
    ) -> Result<(), DocumentMessage> {
        Err(DocumentMessage::error(format!("Property {} is not in the model", property)))
    }

    fn property_value_differs(
        &mut self,
        _: &mut ModelEditor<'_>,
        property: &PropertyRef,
        value: &PropertyValue,
    ) -> Result<(), DocumentMessage> {
        Err(DocumentMessage::error(format!(
            "Property {} differs from the text value {:?}",
            property, value
        )))
    }

    fn property_kind_differs(
        &mut self,
        _: &mut ModelEditor<'_>,
        property: &PropertyRef,
        expected: PropertyKind,
        _: Option<&PropertyValue>,
    ) -> Result<(), DocumentMessage> {
        Err(DocumentMessage::error(format!(
            "Property {} should be a {} property",
            property,
            expected.name()
        )))
    }

    fn node_order_differs(
        &mut self,
        _: &mut ModelEditor<'_>,
        property: &PropertyRef,
        _: usize,
        _: usize,
    ) -> Result<(), DocumentMessage> {
        Err(DocumentMessage::error(format!("Node order of {} differs from the text", property)))
    }
}

/// Repairs the model
#[derive(Debug, Default)]
pub struct AmendHandler;

impl DifferenceHandler for AmendHandler {
    fn import_absent_in_text(&mut self, editor: &mut ModelEditor<'_>, import: &Import) -> Result<(), DocumentMessage> {
        editor.remove_import(import).map(|_| ()).map_err(model_error)
    }

    fn import_absent_in_model(&mut self, editor: &mut ModelEditor<'_>, import: &Import) -> Result<(), DocumentMessage> {
        editor.add_import(import.clone()).map(|_| ()).map_err(model_error)
    }

    fn node_absent_in_text(&mut self, editor: &mut ModelEditor<'_>, node: NodeId) -> Result<(), DocumentMessage> {
        editor.remove_node(node).map_err(model_error)
    }

    fn object_absent_in_model(
        &mut self,
        editor: &mut ModelEditor<'_>,
        owner: NodeId,
        name: &str,
        index: Option<usize>,
        object: &ObjectDef,
    ) -> Result<Option<NodeId>, DocumentMessage> {
        let node = build_subtree(editor, object, true).map_err(model_error)?;
        let attached = match index {
            Some(index) => editor.insert_child(owner, name, index, node),
            None => editor.set_node_property(owner, name, node),
        };
        attached.map_err(model_error)?;
        Ok(Some(node))
    }

    fn type_differs(&mut self, editor: &mut ModelEditor<'_>, node: NodeId, type_name: &str) -> Result<(), DocumentMessage> {
        editor.change_type(node, type_name).map_err(model_error)
    }

    fn id_differs(&mut self, editor: &mut ModelEditor<'_>, node: NodeId, id: Option<&str>) -> Result<(), DocumentMessage> {
        set_id_stealing(editor, node, id).map_err(model_error)
    }

    fn property_absent_in_text(
        &mut self,
        editor: &mut ModelEditor<'_>,
        property: &PropertyRef,
    ) -> Result<(), DocumentMessage> {
        editor.remove_property(property.node, &property.name).map_err(model_error)
    }

    fn property_absent_in_model(
        &mut self,
        editor: &mut ModelEditor<'_>,
        property: &PropertyRef,
        value: &PropertyValue,
    ) -> Result<(), DocumentMessage> {
        set_scalar(editor, property, value).map_err(model_error)
    }

    fn property_value_differs(
        &mut self,
        editor: &mut ModelEditor<'_>,
        property: &PropertyRef,
        value: &PropertyValue,
    ) -> Result<(), DocumentMessage> {
        set_scalar(editor, property, value).map_err(model_error)
    }

    fn property_kind_differs(
        &mut self,
        editor: &mut ModelEditor<'_>,
        property: &PropertyRef,
        _: PropertyKind,
        value: Option<&PropertyValue>,
    ) -> Result<(), DocumentMessage> {
        let holds_nodes = editor
            .property(property.node, &property.name)
            .map(|current| current.kind().holds_nodes())
            .unwrap_or(false);
        if holds_nodes || value.is_none() {
            editor
                .remove_property(property.node, &property.name)
                .map_err(model_error)?;
        }
        match value {
            Some(value) => set_scalar(editor, property, value).map_err(model_error),
            None => Ok(()),
        }
    }

    fn node_order_differs(
        &mut self,
        editor: &mut ModelEditor<'_>,
        property: &PropertyRef,
        from: usize,
        to: usize,
    ) -> Result<(), DocumentMessage> {
        editor
            .move_child(property.node, &property.name, from, to)
            .map_err(model_error)
    }
}

fn model_error(err: ModelError) -> DocumentMessage {
    DocumentMessage::error(err.to_string())
}

/// Set an id, taking it away from whichever node holds it
fn set_id_stealing(editor: &mut ModelEditor<'_>, node: NodeId, id: Option<&str>) -> Result<(), ModelError> {
    match editor.set_id(node, id) {
        Err(ModelError::DuplicateId(taken)) => {
            if let Some(other) = editor.node_with_id(&taken) {
                editor.set_id(other, None)?;
            }
            editor.set_id(node, id)
        }
        result => result,
    }
}

fn set_scalar(editor: &mut ModelEditor<'_>, property: &PropertyRef, value: &PropertyValue) -> Result<(), ModelError> {
    let (node, name) = (property.node, property.name.as_str());
    match value {
        PropertyValue::Variant(value) => editor.set_variant_property(node, name, value.clone()),
        PropertyValue::Binding(expression) => editor.set_binding(node, name, expression),
        PropertyValue::SignalHandler(body) => editor.set_signal_handler(node, name, body),
        PropertyValue::SignalDeclaration(params) => editor.set_signal_declaration(node, name, params),
        PropertyValue::Node(_) | PropertyValue::NodeList(_) => Err(ModelError::WrongKind {
            node,
            name: name.to_string(),
            expected: value.kind().name(),
        }),
    }
}

/// Model value of a script member
pub(crate) fn script_property_value(name: &str, value: &ScriptValue) -> PropertyValue {
    let text = || match value {
        ScriptValue::Expression(text) => text.clone(),
        ScriptValue::Literal(literal) => serialize_literal(literal),
    };
    if is_signal_handler_name(name) {
        return PropertyValue::SignalHandler(text());
    }
    match value {
        ScriptValue::Literal(literal) => PropertyValue::Variant(Value::from_literal(literal)),
        ScriptValue::Expression(_) => PropertyValue::Binding(text()),
    }
}

/// Create a detached node tree mirroring `object`. With `steal_ids`, ids
/// already in use move to the new nodes; otherwise the operation fails.
pub(crate) fn build_subtree(
    editor: &mut ModelEditor<'_>,
    object: &ObjectDef,
    steal_ids: bool,
) -> Result<NodeId, ModelError> {
    let node = editor.create_node(&object.type_name)?;
    for member in &object.members {
        match member {
            Member::Id { value, .. } if steal_ids => set_id_stealing(editor, node, Some(value))?,
            Member::Id { value, .. } => editor.set_id(node, Some(value))?,
            Member::Script { name, value, .. } => {
                let property = PropertyRef::new(node, name.as_str());
                set_scalar(editor, &property, &script_property_value(name, value))?;
            }
            Member::Signal { name, params, .. } => editor.set_signal_declaration(node, name, params)?,
            Member::Object { name, object, .. } => {
                let child = build_subtree(editor, object, steal_ids)?;
                editor.set_node_property(node, name, child)?;
            }
            Member::Array { name, objects, .. } => {
                for (index, object) in objects.iter().enumerate() {
                    let child = build_subtree(editor, object, steal_ids)?;
                    editor.insert_child(node, name, index, child)?;
                }
            }
            Member::Child(object) => {
                let child = build_subtree(editor, object, steal_ids)?;
                editor.append_child(node, child)?;
            }
        }
    }
    Ok(node)
}

fn import_from_decl(decl: &ImportDecl) -> Import {
    Import {
        target: decl.target.clone(),
        version: decl.version.clone(),
        alias: decl.alias.clone(),
    }
}

/// A binding whose text is a literal reads back as a variant
fn values_equal(model: &PropertyValue, text: &PropertyValue) -> bool {
    match (model, text) {
        (PropertyValue::Binding(expression), PropertyValue::Variant(value))
        | (PropertyValue::Variant(value), PropertyValue::Binding(expression)) => {
            normalize_whitespace(expression) == serialize_literal(&value.to_literal())
        }
        (PropertyValue::Binding(a), PropertyValue::Binding(b))
        | (PropertyValue::SignalHandler(a), PropertyValue::SignalHandler(b))
        | (PropertyValue::SignalDeclaration(a), PropertyValue::SignalDeclaration(b)) => {
            normalize_whitespace(a) == normalize_whitespace(b)
        }
        (a, b) => a == b,
    }
}

/// Text-side shape of a property
enum TextMember<'o> {
    Scalar(PropertyValue),
    Object(&'o ObjectDef),
    List(Vec<&'o ObjectDef>),
}

#[derive(Debug, Default)]
pub struct TextToModelMerger {
    errors: Vec<DocumentMessage>,
}

impl TextToModelMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages from the last failed load
    pub fn errors(&self) -> &[DocumentMessage] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<DocumentMessage> {
        std::mem::take(&mut self.errors)
    }

    /// Merge `text` into the model through `handler`. Returns `false` on a
    /// parse failure (the model is untouched) or when the handler rejects a
    /// difference.
    #[instrument(skip_all, fields(len = text.len()))]
    pub fn load(
        &mut self,
        text: &str,
        handler: &mut dyn DifferenceHandler,
        editor: &mut ModelEditor<'_>,
        positions: &mut PositionStore,
    ) -> bool {
        self.errors.clear();

        let document = match parse(text) {
            Ok(document) => document,
            Err(err) => {
                debug!(error = %err, "Merge aborted, text does not parse");
                self.errors.push(DocumentMessage::from_parse_error(&err, text));
                return false;
            }
        };

        let mut merge = Merge {
            source: text,
            handler,
            editor,
            positions,
        };
        let result = merge
            .sync_imports(&document.imports)
            .and_then(|_| {
                let root = merge.editor.root();
                merge.sync_object(root, &document.root)
            });
        merge.positions.retain(|node| merge.editor.is_in_hierarchy(node));

        match result {
            Ok(()) => true,
            Err(message) => {
                debug!(message = %message.message, "Merge stopped on a difference");
                self.errors.push(message);
                false
            }
        }
    }
}

struct Merge<'m, 'e> {
    source: &'m str,
    handler: &'m mut dyn DifferenceHandler,
    editor: &'m mut ModelEditor<'e>,
    positions: &'m mut PositionStore,
}

impl Merge<'_, '_> {
    fn located(&self, message: DocumentMessage, span: Span) -> DocumentMessage {
        if message.location.is_some() {
            return message;
        }
        message.at(TextLocation::new(span.start, span.len()), self.source)
    }

    fn sync_imports(&mut self, declarations: &[ImportDecl]) -> Result<(), DocumentMessage> {
        let in_text: Vec<(Import, Span)> = declarations
            .iter()
            .map(|decl| (import_from_decl(decl), decl.span))
            .collect();

        let in_model: Vec<Import> = self.editor.imports().to_vec();
        for import in in_model {
            if !in_text.iter().any(|(i, _)| *i == import) {
                self.handler.import_absent_in_text(self.editor, &import)?;
            }
        }
        for (import, span) in &in_text {
            if !self.editor.has_import(import) {
                self.handler
                    .import_absent_in_model(self.editor, import)
                    .map_err(|m| self.located(m, *span))?;
            }
        }
        Ok(())
    }

    fn sync_object(&mut self, node: NodeId, object: &ObjectDef) -> Result<(), DocumentMessage> {
        self.positions.set_node_offset(node, object.span.start);

        if self.editor.type_name(node) != Some(object.type_name.as_str()) {
            self.handler
                .type_differs(self.editor, node, &object.type_name)
                .map_err(|m| self.located(m, object.type_span))?;
        }
        if self.editor.id(node) != object.id() {
            self.handler
                .id_differs(self.editor, node, object.id())
                .map_err(|m| self.located(m, object.span))?;
        }

        let mut members: Vec<(String, TextMember<'_>, Span)> = Vec::new();
        for member in &object.members {
            match member {
                Member::Id { .. } | Member::Child(_) => {}
                Member::Script { name, value, span, .. } => {
                    members.push((name.clone(), TextMember::Scalar(script_property_value(name, value)), *span));
                }
                Member::Signal { name, params, span } => {
                    let value = PropertyValue::SignalDeclaration(params.clone());
                    members.push((name.clone(), TextMember::Scalar(value), *span));
                }
                Member::Object { name, object, span } => {
                    members.push((name.clone(), TextMember::Object(object), *span));
                }
                Member::Array { name, objects, span, .. } => {
                    members.push((name.clone(), TextMember::List(objects.iter().collect()), *span));
                }
            }
        }
        let children: Vec<&ObjectDef> = object.children().collect();
        if !children.is_empty() {
            let default = self.editor.default_property().to_string();
            members.push((default, TextMember::List(children), object.body));
        }

        let model_names: Vec<String> = self
            .editor
            .properties(node)
            .iter()
            .map(|property| property.name.clone())
            .collect();
        for name in model_names {
            if !members.iter().any(|(n, ..)| *n == name) {
                let property = PropertyRef::new(node, name);
                self.handler
                    .property_absent_in_text(self.editor, &property)
                    .map_err(|m| self.located(m, object.span))?;
            }
        }

        for (name, member, span) in members {
            let property = PropertyRef::new(node, name.as_str());
            match member {
                TextMember::Scalar(value) => self.sync_scalar(&property, &value, span)?,
                TextMember::Object(child) => self.sync_single_object(&property, child, span)?,
                TextMember::List(objects) => self.sync_node_list(&property, &objects, span)?,
            }
        }
        Ok(())
    }

    fn sync_scalar(&mut self, property: &PropertyRef, value: &PropertyValue, span: Span) -> Result<(), DocumentMessage> {
        let current = self.editor.property(property.node, &property.name).cloned();
        let result = match current {
            None => self.handler.property_absent_in_model(self.editor, property, value),
            Some(current) if values_equal(&current, value) => Ok(()),
            Some(current) if current.kind() != value.kind() => {
                self.handler
                    .property_kind_differs(self.editor, property, value.kind(), Some(value))
            }
            Some(_) => self.handler.property_value_differs(self.editor, property, value),
        };
        result.map_err(|m| self.located(m, span))
    }

    fn sync_single_object(&mut self, property: &PropertyRef, object: &ObjectDef, span: Span) -> Result<(), DocumentMessage> {
        match self.editor.property(property.node, &property.name).cloned() {
            Some(PropertyValue::Node(child)) => self.sync_object(child, object),
            current => {
                if current.is_some() {
                    self.handler
                        .property_kind_differs(self.editor, property, PropertyKind::Node, None)
                        .map_err(|m| self.located(m, span))?;
                }
                let created = self
                    .handler
                    .object_absent_in_model(self.editor, property.node, &property.name, None, object)
                    .map_err(|m| self.located(m, object.span))?;
                match created {
                    Some(child) => self.sync_object(child, object),
                    None => Ok(()),
                }
            }
        }
    }

    fn sync_node_list(&mut self, property: &PropertyRef, objects: &[&ObjectDef], span: Span) -> Result<(), DocumentMessage> {
        let (owner, name) = (property.node, property.name.as_str());
        let is_list = matches!(
            self.editor.property(owner, name),
            None | Some(PropertyValue::NodeList(_))
        );
        if !is_list {
            self.handler
                .property_kind_differs(self.editor, property, PropertyKind::NodeList, None)
                .map_err(|m| self.located(m, span))?;
        }

        for (index, object) in objects.iter().enumerate() {
            if let Some(from) = self.later_match(owner, name, index, object) {
                self.handler
                    .node_order_differs(self.editor, property, from, index)
                    .map_err(|m| self.located(m, object.span))?;
            }

            let current = self.editor.nodes_in(owner, name).get(index).copied();
            match current {
                Some(child) => self.sync_object(child, object)?,
                None => {
                    let created = self
                        .handler
                        .object_absent_in_model(self.editor, owner, name, Some(index), object)
                        .map_err(|m| self.located(m, object.span))?;
                    if let Some(child) = created {
                        self.sync_object(child, object)?;
                    }
                }
            }
        }

        let extra: Vec<NodeId> = self
            .editor
            .nodes_in(owner, name)
            .iter()
            .skip(objects.len())
            .copied()
            .collect();
        for node in extra.into_iter().rev() {
            self.handler
                .node_absent_in_text(self.editor, node)
                .map_err(|m| self.located(m, span))?;
        }
        Ok(())
    }

    /// Index of a model node after `index` that fits `object` better than
    /// the one at `index`: same id, or same type when neither has an id
    fn later_match(&self, owner: NodeId, name: &str, index: usize, object: &ObjectDef) -> Option<usize> {
        let nodes = self.editor.nodes_in(owner, name);
        let current = *nodes.get(index)?;
        let fits = |node: NodeId| match object.id() {
            Some(id) => self.editor.id(node) == Some(id),
            None => self.editor.id(node).is_none() && self.editor.type_name(node) == Some(object.type_name.as_str()),
        };
        if fits(current) {
            return None;
        }
        (index + 1..nodes.len()).find(|k| fits(nodes[*k]))
    }
}

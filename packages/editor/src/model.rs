//! # Document Model
//!
//! In-memory object graph mirrored by the document text. Nodes are addressed
//! by [`NodeId`]s issued from a counter, so identities survive wholesale
//! re-merges of the text.
//!
//! Every mutation appends [`ModelEvent`]s to a journal. Callers outside the
//! crate mutate through a [`ModelEditor`](crate::ModelEditor), which hands the
//! journal to a listener after each call.

use crate::errors::ModelError;
use crate::events::{ModelEvent, PropertyChange};
use mosaic_parser::ast::Literal;
use mosaic_parser::serializer::serialize_import;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use mosaic_parser::ast::ImportTarget;

/// Stable identity of a model node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Literal value of a variant property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Number(f64),
    String(String),
}

impl Value {
    pub fn from_literal(literal: &Literal) -> Self {
        match literal {
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::String(s.clone()),
        }
    }

    pub fn to_literal(&self) -> Literal {
        match self {
            Value::Bool(b) => Literal::Bool(*b),
            Value::Number(n) => Literal::Number(*n),
            Value::String(s) => Literal::String(s.clone()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    Variant,
    Binding,
    SignalHandler,
    Node,
    NodeList,
    SignalDeclaration,
}

impl PropertyKind {
    /// Node and node-list properties own child nodes
    pub fn holds_nodes(self) -> bool {
        matches!(self, PropertyKind::Node | PropertyKind::NodeList)
    }

    pub fn name(self) -> &'static str {
        match self {
            PropertyKind::Variant => "variant",
            PropertyKind::Binding => "binding",
            PropertyKind::SignalHandler => "signal handler",
            PropertyKind::Node => "node",
            PropertyKind::NodeList => "node list",
            PropertyKind::SignalDeclaration => "signal declaration",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Variant(Value),
    /// Expression text
    Binding(String),
    /// Handler body text
    SignalHandler(String),
    Node(NodeId),
    NodeList(Vec<NodeId>),
    /// Parameter list text, without parentheses
    SignalDeclaration(String),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Variant(_) => PropertyKind::Variant,
            PropertyValue::Binding(_) => PropertyKind::Binding,
            PropertyValue::SignalHandler(_) => PropertyKind::SignalHandler,
            PropertyValue::Node(_) => PropertyKind::Node,
            PropertyValue::NodeList(_) => PropertyKind::NodeList,
            PropertyValue::SignalDeclaration(_) => PropertyKind::SignalDeclaration,
        }
    }

    /// Child nodes held by this value
    pub fn nodes(&self) -> &[NodeId] {
        match self {
            PropertyValue::Node(node) => std::slice::from_ref(node),
            PropertyValue::NodeList(nodes) => nodes,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

/// Identity of a property: owning node plus name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyRef {
    pub node: NodeId,
    pub name: String,
}

impl PropertyRef {
    pub fn new(node: NodeId, name: impl Into<String>) -> Self {
        Self {
            node,
            name: name.into(),
        }
    }
}

impl fmt::Display for PropertyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.name)
    }
}

/// Document import; equality is structural
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Import {
    pub target: ImportTarget,
    pub version: Option<String>,
    pub alias: Option<String>,
}

impl Import {
    pub fn library(uri: impl Into<String>, version: Option<&str>) -> Self {
        Self {
            target: ImportTarget::Library(uri.into()),
            version: version.map(str::to_string),
            alias: None,
        }
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self {
            target: ImportTarget::File(path.into()),
            version: None,
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Markup for this import
    pub fn to_source(&self) -> String {
        serialize_import(&self.target, self.version.as_deref(), self.alias.as_deref())
    }
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_source())
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    type_name: String,
    id: Option<String>,
    properties: Vec<Property>,
    parent: Option<PropertyRef>,
}

impl NodeData {
    fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    fn property_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.properties.iter_mut().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    nodes: BTreeMap<NodeId, NodeData>,
    root: NodeId,
    next_id: u32,
    imports: Vec<Import>,
    default_property: String,
    events: Vec<ModelEvent>,
}

impl Model {
    /// Create a model holding a single root node
    pub fn new(root_type: impl Into<String>) -> Self {
        Self::with_default_property(root_type, "data")
    }

    pub fn with_default_property(root_type: impl Into<String>, default_property: impl Into<String>) -> Self {
        let root = NodeId(0);
        let mut nodes = BTreeMap::new();
        nodes.insert(
            root,
            NodeData {
                type_name: root_type.into(),
                id: None,
                properties: Vec::new(),
                parent: None,
            },
        );
        Self {
            nodes,
            root,
            next_id: 1,
            imports: Vec::new(),
            default_property: default_property.into(),
            events: Vec::new(),
        }
    }

    // Queries

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn default_property(&self) -> &str {
        &self.default_property
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn type_name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).map(|n| n.type_name.as_str())
    }

    pub fn id(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).and_then(|n| n.id.as_deref())
    }

    pub fn parent_property(&self, node: NodeId) -> Option<&PropertyRef> {
        self.nodes.get(&node).and_then(|n| n.parent.as_ref())
    }

    pub fn properties(&self, node: NodeId) -> &[Property] {
        self.nodes
            .get(&node)
            .map(|n| n.properties.as_slice())
            .unwrap_or(&[])
    }

    pub fn property(&self, node: NodeId, name: &str) -> Option<&PropertyValue> {
        self.nodes
            .get(&node)
            .and_then(|n| n.property(name))
            .map(|p| &p.value)
    }

    pub fn has_property(&self, node: NodeId, name: &str) -> bool {
        self.property(node, name).is_some()
    }

    /// Nodes held by a node or node-list property (empty if absent)
    pub fn nodes_in(&self, node: NodeId, name: &str) -> &[NodeId] {
        self.property(node, name).map(|v| v.nodes()).unwrap_or(&[])
    }

    /// Children of the default property
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes_in(node, &self.default_property)
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    pub fn has_import(&self, import: &Import) -> bool {
        self.imports.contains(import)
    }

    pub fn node_with_id(&self, id: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, data)| data.id.as_deref() == Some(id))
            .map(|(node, _)| *node)
    }

    /// Whether `node` is reachable from the root
    pub fn is_in_hierarchy(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent_property(current) {
                Some(parent) => current = parent.node,
                None => return false,
            }
        }
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent_property(n).map(|p| p.node);
        }
        false
    }

    /// `node` and all its descendants, parents before children
    pub fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            result.push(current);
            for property in self.properties(current).iter().rev() {
                stack.extend(property.value.nodes().iter().rev());
            }
        }
        result
    }

    /// Drain the event journal
    pub fn take_events(&mut self) -> Vec<ModelEvent> {
        std::mem::take(&mut self.events)
    }

    // Mutations

    /// Create a detached node
    pub fn create_node(&mut self, type_name: &str) -> Result<NodeId, ModelError> {
        validate_type_name(type_name)?;
        let node = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            node,
            NodeData {
                type_name: type_name.to_string(),
                id: None,
                properties: Vec::new(),
                parent: None,
            },
        );
        self.events.push(ModelEvent::NodeCreated { node });
        Ok(node)
    }

    pub fn set_variant_property(
        &mut self,
        node: NodeId,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), ModelError> {
        self.set_scalar(node, name, PropertyValue::Variant(value.into()))
    }

    pub fn set_binding(&mut self, node: NodeId, name: &str, expression: &str) -> Result<(), ModelError> {
        self.set_scalar(node, name, PropertyValue::Binding(expression.to_string()))
    }

    pub fn set_signal_handler(&mut self, node: NodeId, name: &str, body: &str) -> Result<(), ModelError> {
        self.set_scalar(node, name, PropertyValue::SignalHandler(body.to_string()))
    }

    pub fn set_signal_declaration(
        &mut self,
        node: NodeId,
        name: &str,
        params: &str,
    ) -> Result<(), ModelError> {
        self.set_scalar(node, name, PropertyValue::SignalDeclaration(params.to_string()))
    }

    fn set_scalar(&mut self, node: NodeId, name: &str, value: PropertyValue) -> Result<(), ModelError> {
        validate_property_name(name)?;
        if name == self.default_property {
            return Err(ModelError::WrongKind {
                node,
                name: name.to_string(),
                expected: PropertyKind::NodeList.name(),
            });
        }

        let data = self.node_mut(node)?;
        let change = match data.property_mut(name) {
            Some(existing) if existing.value.kind().holds_nodes() => {
                return Err(ModelError::WrongKind {
                    node,
                    name: name.to_string(),
                    expected: existing.value.kind().name(),
                });
            }
            Some(existing) if existing.value == value => return Ok(()),
            Some(existing) => {
                existing.value = value;
                PropertyChange::Changed
            }
            None => {
                data.properties.push(Property {
                    name: name.to_string(),
                    value,
                });
                PropertyChange::Added
            }
        };

        self.events.push(ModelEvent::PropertiesChanged {
            properties: vec![PropertyRef::new(node, name)],
            change,
        });
        Ok(())
    }

    /// Append to the default property
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), ModelError> {
        let name = self.default_property.clone();
        let len = self.nodes_in(parent, &name).len();
        let index = if self.parent_property(child) == Some(&PropertyRef::new(parent, name.as_str())) {
            len.saturating_sub(1)
        } else {
            len
        };
        self.insert_child(parent, &name, index, child)
    }

    /// Insert `child` into a node-list property, moving it from wherever
    /// it currently lives
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        name: &str,
        index: usize,
        child: NodeId,
    ) -> Result<(), ModelError> {
        validate_property_name(name)?;
        self.check_attach(parent, child)?;

        let target = PropertyRef::new(parent, name);
        let len = match self.property(parent, name) {
            Some(PropertyValue::NodeList(nodes)) => nodes.len(),
            Some(_) => {
                return Err(ModelError::WrongKind {
                    node: parent,
                    name: name.to_string(),
                    expected: PropertyKind::NodeList.name(),
                })
            }
            None => 0,
        };

        if self.parent_property(child) == Some(&target) {
            let from = self
                .nodes_in(parent, name)
                .iter()
                .position(|n| *n == child)
                .unwrap_or(0);
            return self.move_child(parent, name, from, index.min(len.saturating_sub(1)));
        }

        if index > len {
            return Err(ModelError::IndexOutOfRange { index, len });
        }

        let old_property = self.detach(child);

        let data = self.node_mut(parent)?;
        let change = match data.property_mut(name) {
            Some(Property {
                value: PropertyValue::NodeList(nodes),
                ..
            }) => {
                nodes.insert(index, child);
                PropertyChange::Changed
            }
            _ => {
                data.properties.push(Property {
                    name: name.to_string(),
                    value: PropertyValue::NodeList(vec![child]),
                });
                PropertyChange::Added
            }
        };
        self.node_mut(child)?.parent = Some(target.clone());

        self.events.push(ModelEvent::NodeReparented {
            node: child,
            new_property: target,
            old_property,
            change,
        });
        Ok(())
    }

    /// Put `child` into a single-node property, removing any node it held
    pub fn set_node_property(&mut self, parent: NodeId, name: &str, child: NodeId) -> Result<(), ModelError> {
        validate_property_name(name)?;
        if name == self.default_property {
            return Err(ModelError::WrongKind {
                node: parent,
                name: name.to_string(),
                expected: PropertyKind::NodeList.name(),
            });
        }
        self.check_attach(parent, child)?;

        let replaced = match self.property(parent, name) {
            Some(PropertyValue::Node(current)) if *current == child => return Ok(()),
            Some(PropertyValue::Node(current)) => Some(*current),
            Some(other) => {
                return Err(ModelError::WrongKind {
                    node: parent,
                    name: name.to_string(),
                    expected: other.kind().name(),
                })
            }
            None => None,
        };

        let old_property = self.detach(child);
        if let Some(current) = replaced {
            self.remove_node(current)?;
        }
        let target = PropertyRef::new(parent, name);
        self.node_mut(parent)?.properties.push(Property {
            name: name.to_string(),
            value: PropertyValue::Node(child),
        });
        self.node_mut(child)?.parent = Some(target.clone());

        self.events.push(ModelEvent::NodeReparented {
            node: child,
            new_property: target,
            old_property,
            change: PropertyChange::Added,
        });
        Ok(())
    }

    /// Reorder a node-list property
    pub fn move_child(&mut self, parent: NodeId, name: &str, from: usize, to: usize) -> Result<(), ModelError> {
        let data = self.node_mut(parent)?;
        let nodes = match data.property_mut(name) {
            Some(Property {
                value: PropertyValue::NodeList(nodes),
                ..
            }) => nodes,
            Some(_) => {
                return Err(ModelError::WrongKind {
                    node: parent,
                    name: name.to_string(),
                    expected: PropertyKind::NodeList.name(),
                })
            }
            None => {
                return Err(ModelError::UnknownProperty {
                    node: parent,
                    name: name.to_string(),
                })
            }
        };

        let len = nodes.len();
        if from >= len {
            return Err(ModelError::IndexOutOfRange { index: from, len });
        }
        if to >= len {
            return Err(ModelError::IndexOutOfRange { index: to, len });
        }
        if from == to {
            return Ok(());
        }

        let node = nodes.remove(from);
        nodes.insert(to, node);

        self.events.push(ModelEvent::NodeOrderChanged {
            property: PropertyRef::new(parent, name),
            node,
            old_index: from,
            new_index: to,
        });
        Ok(())
    }

    /// Remove a node and its whole subtree
    pub fn remove_node(&mut self, node: NodeId) -> Result<(), ModelError> {
        if node == self.root {
            return Err(ModelError::RootNode);
        }
        let parent_property = self.node(node)?.parent.clone();
        let in_hierarchy = self.is_in_hierarchy(node);

        self.events.push(ModelEvent::NodeAboutToBeRemoved {
            node,
            parent_property: parent_property.clone(),
            in_hierarchy,
        });

        self.detach(node);
        for removed in self.subtree(node) {
            self.nodes.remove(&removed);
        }

        self.events.push(ModelEvent::NodeRemoved {
            node,
            parent_property,
        });
        Ok(())
    }

    /// Remove a property; nodes it holds are removed with it
    pub fn remove_property(&mut self, node: NodeId, name: &str) -> Result<(), ModelError> {
        let in_hierarchy = self.is_in_hierarchy(node);
        let data = self.node(node)?;
        let index = data
            .properties
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| ModelError::UnknownProperty {
                node,
                name: name.to_string(),
            })?;

        let properties = vec![PropertyRef::new(node, name)];
        self.events.push(ModelEvent::PropertiesAboutToBeRemoved {
            properties: properties.clone(),
            in_hierarchy,
        });

        let property = self.node_mut(node)?.properties.remove(index);
        for child in property.value.nodes() {
            for removed in self.subtree(*child) {
                self.nodes.remove(&removed);
            }
        }

        self.events.push(ModelEvent::PropertiesRemoved { properties });
        Ok(())
    }

    pub fn set_id(&mut self, node: NodeId, id: Option<&str>) -> Result<(), ModelError> {
        if let Some(id) = id {
            validate_id(id)?;
            if let Some(other) = self.node_with_id(id) {
                if other != node {
                    return Err(ModelError::DuplicateId(id.to_string()));
                }
            }
        }

        let data = self.node_mut(node)?;
        if data.id.as_deref() == id {
            return Ok(());
        }
        let old_id = std::mem::replace(&mut data.id, id.map(str::to_string));

        self.events.push(ModelEvent::NodeIdChanged {
            node,
            old_id,
            new_id: id.map(str::to_string),
        });
        Ok(())
    }

    pub fn change_type(&mut self, node: NodeId, type_name: &str) -> Result<(), ModelError> {
        validate_type_name(type_name)?;
        let data = self.node_mut(node)?;
        if data.type_name == type_name {
            return Ok(());
        }
        data.type_name = type_name.to_string();

        self.events.push(ModelEvent::NodeTypeChanged {
            node,
            type_name: type_name.to_string(),
        });
        Ok(())
    }

    /// Returns `false` if the import was already present
    pub fn add_import(&mut self, import: Import) -> Result<bool, ModelError> {
        if self.imports.contains(&import) {
            return Ok(false);
        }
        self.imports.push(import.clone());
        self.events.push(ModelEvent::ImportsChanged {
            added: vec![import],
            removed: Vec::new(),
        });
        Ok(true)
    }

    /// Returns `false` if the import was not present
    pub fn remove_import(&mut self, import: &Import) -> Result<bool, ModelError> {
        let Some(index) = self.imports.iter().position(|i| i == import) else {
            return Ok(false);
        };
        let removed = self.imports.remove(index);
        self.events.push(ModelEvent::ImportsChanged {
            added: Vec::new(),
            removed: vec![removed],
        });
        Ok(true)
    }

    /// Compare two models by content: types, ids, property values (binding
    /// text with whitespace normalized), child order and imports
    pub fn structurally_equal(&self, other: &Model) -> bool {
        self.imports.len() == other.imports.len()
            && self.imports.iter().all(|i| other.imports.contains(i))
            && nodes_equal(self, self.root, other, other.root)
    }

    // Internals

    fn node(&self, node: NodeId) -> Result<&NodeData, ModelError> {
        self.nodes.get(&node).ok_or(ModelError::InvalidNode(node))
    }

    fn node_mut(&mut self, node: NodeId) -> Result<&mut NodeData, ModelError> {
        self.nodes.get_mut(&node).ok_or(ModelError::InvalidNode(node))
    }

    fn check_attach(&self, parent: NodeId, child: NodeId) -> Result<(), ModelError> {
        self.node(parent)?;
        self.node(child)?;
        if child == self.root {
            return Err(ModelError::RootNode);
        }
        if self.is_ancestor_of(child, parent) {
            return Err(ModelError::Cycle {
                node: child,
                target: parent,
            });
        }
        Ok(())
    }

    /// Unlink a node from its parent property. Node properties and emptied
    /// node lists disappear without events of their own.
    fn detach(&mut self, node: NodeId) -> Option<PropertyRef> {
        let parent = self.nodes.get_mut(&node)?.parent.take()?;
        if let Some(data) = self.nodes.get_mut(&parent.node) {
            let mut emptied = false;
            if let Some(property) = data.property_mut(&parent.name) {
                match &mut property.value {
                    PropertyValue::NodeList(nodes) => {
                        nodes.retain(|n| *n != node);
                        emptied = nodes.is_empty();
                    }
                    PropertyValue::Node(_) => emptied = true,
                    _ => {}
                }
            }
            if emptied {
                data.properties.retain(|p| p.name != parent.name);
            }
        }
        Some(parent)
    }
}

fn nodes_equal(a: &Model, a_node: NodeId, b: &Model, b_node: NodeId) -> bool {
    let (Some(left), Some(right)) = (a.nodes.get(&a_node), b.nodes.get(&b_node)) else {
        return false;
    };
    if left.type_name != right.type_name
        || left.id != right.id
        || left.properties.len() != right.properties.len()
    {
        return false;
    }

    left.properties.iter().all(|property| {
        let Some(other) = right.property(&property.name) else {
            return false;
        };
        match (&property.value, &other.value) {
            (PropertyValue::Variant(x), PropertyValue::Variant(y)) => x == y,
            (PropertyValue::Binding(x), PropertyValue::Binding(y))
            | (PropertyValue::SignalHandler(x), PropertyValue::SignalHandler(y))
            | (PropertyValue::SignalDeclaration(x), PropertyValue::SignalDeclaration(y)) => {
                normalize_whitespace(x) == normalize_whitespace(y)
            }
            (PropertyValue::Node(x), PropertyValue::Node(y)) => nodes_equal(a, *x, b, *y),
            (PropertyValue::NodeList(xs), PropertyValue::NodeList(ys)) => {
                xs.len() == ys.len()
                    && xs.iter().zip(ys).all(|(x, y)| nodes_equal(a, *x, b, *y))
            }
            _ => false,
        }
    })
}

/// Collapse whitespace runs so re-indented script text compares equal
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

const RESERVED_WORDS: &[&str] = &["import", "as", "signal", "true", "false"];

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn is_dotted_identifier(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_identifier)
}

fn validate_property_name(name: &str) -> Result<(), ModelError> {
    if name == "id" || !is_dotted_identifier(name) || RESERVED_WORDS.contains(&name) {
        return Err(ModelError::InvalidPropertyName(name.to_string()));
    }
    Ok(())
}

fn validate_type_name(name: &str) -> Result<(), ModelError> {
    if !is_dotted_identifier(name) || RESERVED_WORDS.contains(&name) {
        return Err(ModelError::InvalidTypeName(name.to_string()));
    }
    Ok(())
}

fn validate_id(id: &str) -> Result<(), ModelError> {
    let starts_lower = id
        .chars()
        .next()
        .map(|c| c.is_ascii_lowercase() || c == '_')
        .unwrap_or(false);
    if !starts_lower || !is_identifier(id) || RESERVED_WORDS.contains(&id) {
        return Err(ModelError::InvalidId(id.to_string()));
    }
    Ok(())
}

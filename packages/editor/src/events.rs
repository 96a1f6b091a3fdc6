//! Model change notification: one event enum, one listener method.

use crate::errors::ModelError;
use crate::model::{Import, Model, NodeId, PropertyRef, Value};
use std::cell::RefCell;
use std::ops::Deref;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyChange {
    /// The property did not exist before
    Added,
    Changed,
}

/// Everything a model mutation can report
///
/// Removal events are journaled while the mutation runs and delivered once
/// it returns, so they carry the hierarchy state captured beforehand.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    NodeCreated {
        node: NodeId,
    },
    NodeAboutToBeRemoved {
        node: NodeId,
        parent_property: Option<PropertyRef>,
        in_hierarchy: bool,
    },
    NodeRemoved {
        node: NodeId,
        parent_property: Option<PropertyRef>,
    },
    NodeReparented {
        node: NodeId,
        new_property: PropertyRef,
        /// `None` when the node was detached
        old_property: Option<PropertyRef>,
        change: PropertyChange,
    },
    NodeOrderChanged {
        property: PropertyRef,
        node: NodeId,
        old_index: usize,
        new_index: usize,
    },
    PropertiesChanged {
        properties: Vec<PropertyRef>,
        change: PropertyChange,
    },
    PropertiesAboutToBeRemoved {
        properties: Vec<PropertyRef>,
        in_hierarchy: bool,
    },
    PropertiesRemoved {
        properties: Vec<PropertyRef>,
    },
    NodeIdChanged {
        node: NodeId,
        old_id: Option<String>,
        new_id: Option<String>,
    },
    NodeTypeChanged {
        node: NodeId,
        type_name: String,
    },
    ImportsChanged {
        added: Vec<Import>,
        removed: Vec<Import>,
    },
}

/// Receives model events after each mutation
pub trait ModelListener {
    fn model_event(&mut self, model: &Model, event: &ModelEvent);
}

impl<T: ModelListener> ModelListener for Rc<RefCell<T>> {
    fn model_event(&mut self, model: &Model, event: &ModelEvent) {
        self.borrow_mut().model_event(model, event);
    }
}

/// Listener that records every event, handy for hosts and tests
#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<ModelEvent>,
}

impl ModelListener for EventLog {
    fn model_event(&mut self, _model: &Model, event: &ModelEvent) {
        self.events.push(event.clone());
    }
}

/// Mutable access to a [`Model`] that delivers the event journal to a
/// listener after every call
///
/// Reads go through `Deref<Target = Model>`.
pub struct ModelEditor<'a> {
    model: &'a mut Model,
    listener: &'a mut dyn ModelListener,
}

impl<'a> ModelEditor<'a> {
    pub fn new(model: &'a mut Model, listener: &'a mut dyn ModelListener) -> Self {
        Self { model, listener }
    }

    fn dispatch<T>(&mut self, result: Result<T, ModelError>) -> Result<T, ModelError> {
        for event in self.model.take_events() {
            self.listener.model_event(&*self.model, &event);
        }
        result
    }

    pub fn create_node(&mut self, type_name: &str) -> Result<NodeId, ModelError> {
        let result = self.model.create_node(type_name);
        self.dispatch(result)
    }

    pub fn set_variant_property(
        &mut self,
        node: NodeId,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), ModelError> {
        let result = self.model.set_variant_property(node, name, value);
        self.dispatch(result)
    }

    pub fn set_binding(&mut self, node: NodeId, name: &str, expression: &str) -> Result<(), ModelError> {
        let result = self.model.set_binding(node, name, expression);
        self.dispatch(result)
    }

    pub fn set_signal_handler(&mut self, node: NodeId, name: &str, body: &str) -> Result<(), ModelError> {
        let result = self.model.set_signal_handler(node, name, body);
        self.dispatch(result)
    }

    pub fn set_signal_declaration(&mut self, node: NodeId, name: &str, params: &str) -> Result<(), ModelError> {
        let result = self.model.set_signal_declaration(node, name, params);
        self.dispatch(result)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), ModelError> {
        let result = self.model.append_child(parent, child);
        self.dispatch(result)
    }

    pub fn insert_child(
        &mut self,
        parent: NodeId,
        name: &str,
        index: usize,
        child: NodeId,
    ) -> Result<(), ModelError> {
        let result = self.model.insert_child(parent, name, index, child);
        self.dispatch(result)
    }

    pub fn set_node_property(&mut self, parent: NodeId, name: &str, child: NodeId) -> Result<(), ModelError> {
        let result = self.model.set_node_property(parent, name, child);
        self.dispatch(result)
    }

    pub fn move_child(&mut self, parent: NodeId, name: &str, from: usize, to: usize) -> Result<(), ModelError> {
        let result = self.model.move_child(parent, name, from, to);
        self.dispatch(result)
    }

    pub fn remove_node(&mut self, node: NodeId) -> Result<(), ModelError> {
        let result = self.model.remove_node(node);
        self.dispatch(result)
    }

    pub fn remove_property(&mut self, node: NodeId, name: &str) -> Result<(), ModelError> {
        let result = self.model.remove_property(node, name);
        self.dispatch(result)
    }

    pub fn set_id(&mut self, node: NodeId, id: Option<&str>) -> Result<(), ModelError> {
        let result = self.model.set_id(node, id);
        self.dispatch(result)
    }

    pub fn change_type(&mut self, node: NodeId, type_name: &str) -> Result<(), ModelError> {
        let result = self.model.change_type(node, type_name);
        self.dispatch(result)
    }

    pub fn add_import(&mut self, import: Import) -> Result<bool, ModelError> {
        let result = self.model.add_import(import);
        self.dispatch(result)
    }

    pub fn remove_import(&mut self, import: &Import) -> Result<bool, ModelError> {
        let result = self.model.remove_import(import);
        self.dispatch(result)
    }
}

impl Deref for ModelEditor<'_> {
    type Target = Model;

    fn deref(&self) -> &Model {
        self.model
    }
}

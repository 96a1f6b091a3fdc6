//! Error types for the editor

use crate::model::NodeId;
use thiserror::Error;

/// Structural errors raised by the model mutation API
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Node {0} does not exist")]
    InvalidNode(NodeId),

    #[error("Node {node} has no property '{name}'")]
    UnknownProperty { node: NodeId, name: String },

    #[error("Property '{name}' on node {node} is not a {expected} property")]
    WrongKind {
        node: NodeId,
        name: String,
        expected: &'static str,
    },

    #[error("Invalid property name '{0}'")]
    InvalidPropertyName(String),

    #[error("Invalid type name '{0}'")]
    InvalidTypeName(String),

    #[error("Invalid id '{0}'")]
    InvalidId(String),

    #[error("Id '{0}' is already used by another node")]
    DuplicateId(String),

    #[error("Moving node {node} under node {target} would create a cycle")]
    Cycle { node: NodeId, target: NodeId },

    #[error("The root node cannot be removed or reparented")]
    RootNode,

    #[error("Index {index} is out of range for a list of {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Parse error: {0}")]
    Parse(#[from] mosaic_parser::ParseError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("The rewriter is in error state; clear it before editing")]
    ErrorState,

    #[error("Modification group token does not match the innermost open group")]
    GroupMismatch,

    #[error("No modification group is open")]
    NoOpenGroup,

    #[error("Text edit failed: {0}")]
    TextEditFailed(String),

    #[error("Text does not match the model: {0}")]
    Validation(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Document is not file-backed")]
    NotFileBacked,
}

pub type EditorResult<T> = Result<T, EditorError>;

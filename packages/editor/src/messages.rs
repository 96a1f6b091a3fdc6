use mosaic_common::{LineIndex, TextLocation};
use mosaic_parser::ParseError;
use serde::{Deserialize, Serialize};

/// Severity level of a document message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

/// An error or warning reported to the host for the current document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMessage {
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Text range the message refers to, if known
    pub location: Option<TextLocation>,

    /// One-based line (0 when the location is unknown)
    pub line: usize,

    /// One-based column (0 when the location is unknown)
    pub column: usize,
}

impl DocumentMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            location: None,
            line: 0,
            column: 0,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(message)
        }
    }

    /// Attach a location, resolving its line and column against `text`
    pub fn at(mut self, location: TextLocation, text: &str) -> Self {
        let position = LineIndex::new(text).line_column(location.offset);
        self.location = Some(location);
        self.line = position.line;
        self.column = position.column;
        self
    }

    pub fn from_parse_error(error: &ParseError, text: &str) -> Self {
        let message = Self::error(error.to_string());
        match error.span() {
            Some(span) => message.at(TextLocation::new(span.start, span.end - span.start), text),
            None => message,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

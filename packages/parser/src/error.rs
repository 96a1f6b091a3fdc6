//! Error types for the Mosaic parser

use std::ops::Range;
use thiserror::Error;

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Parse error with location and context
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at {span:?}: expected {expected}, found {found}")]
    UnexpectedToken {
        span: Range<usize>,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of input at {pos}: expected {expected}")]
    UnexpectedEof { pos: usize, expected: String },

    #[error("Invalid syntax at {span:?}: {message}")]
    InvalidSyntax { span: Range<usize>, message: String },

    #[error("Lexer error at {span:?}")]
    LexerError { span: Range<usize> },
}

impl ParseError {
    pub fn unexpected_token(
        span: Range<usize>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::UnexpectedToken {
            span,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(pos: usize, expected: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            pos,
            expected: expected.into(),
        }
    }

    pub fn invalid_syntax(span: Range<usize>, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            span,
            message: message.into(),
        }
    }

    pub fn lexer_error(span: Range<usize>) -> Self {
        Self::LexerError { span }
    }

    /// Byte range the error points at
    pub fn span(&self) -> Option<Range<usize>> {
        match self {
            ParseError::UnexpectedToken { span, .. } => Some(span.clone()),
            ParseError::UnexpectedEof { pos, .. } => Some(*pos..*pos),
            ParseError::InvalidSyntax { span, .. } => Some(span.clone()),
            ParseError::LexerError { span } => Some(span.clone()),
        }
    }

    /// Short label used when rendering the error next to the source
    pub fn label(&self) -> String {
        match self {
            ParseError::UnexpectedToken { expected, .. } => format!("expected {}", expected),
            ParseError::UnexpectedEof { expected, .. } => format!("expected {}", expected),
            ParseError::InvalidSyntax { message, .. } => message.clone(),
            ParseError::LexerError { .. } => "unrecognized character".to_string(),
        }
    }
}

/// Collection of errors from a parse attempt
#[derive(Debug, Default, Clone)]
pub struct ParseErrors {
    pub errors: Vec<ParseError>,
}

impl ParseErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn push(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParseError> {
        self.errors.iter()
    }
}

impl From<ParseError> for ParseErrors {
    fn from(error: ParseError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

/// Pretty-print errors with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_errors(source: &str, filename: &str, errors: &ParseErrors) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let mut output = Vec::new();

    for error in &errors.errors {
        let span = error.span().unwrap_or_else(|| {
            let end = source.len();
            end.saturating_sub(1)..end
        });

        let report = Report::build(ReportKind::Error, filename, span.start)
            .with_message(error.to_string())
            .with_label(
                Label::new((filename, span.clone()))
                    .with_color(Color::Red)
                    .with_message(error.label()),
            )
            .finish();

        if report
            .write((filename, Source::from(source)), &mut output)
            .is_err()
        {
            return "Error formatting failed".to_string();
        }
    }

    String::from_utf8(output).unwrap_or_else(|_| "Error formatting failed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eof_span_is_empty_range() {
        let err = ParseError::unexpected_eof(12, "'}'");
        assert_eq!(err.span(), Some(12..12));
        assert_eq!(err.label(), "expected '}'");
    }

    #[cfg(feature = "pretty-errors")]
    #[test]
    fn test_format_errors_mentions_message() {
        let source = "Item {\n    width: \n";
        let errors = ParseErrors::from(ParseError::invalid_syntax(15..16, "expected expression"));
        let output = format_errors(source, "test.mos", &errors);
        assert!(output.contains("expected expression"));
    }
}

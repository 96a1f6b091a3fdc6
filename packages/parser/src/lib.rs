//! # Mosaic Parser
//!
//! Turns `.mos` markup text into a span-carrying AST. Every object, member
//! and import records the byte range it was parsed from, which is what the
//! editor uses to edit the text in place without re-printing it.
//!
//! Parsing is all-or-nothing: a document either parses completely or
//! produces a single [`ParseError`] pointing at the first problem.

pub mod ast;
pub mod error;
pub mod parser;
pub mod serializer;
pub mod tokenizer;

pub use error::{ParseError, ParseErrors, ParseResult};
pub use parser::{parse, Parser};
pub use serializer::{format_number, quote_string, serialize_import, serialize_literal, Printer};
pub use tokenizer::{tokenize, Token};

#[cfg(feature = "pretty-errors")]
pub use error::format_errors;

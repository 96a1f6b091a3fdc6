use crate::error::{ParseError, ParseResult};
use logos::Logos;
use std::ops::Range;

/// Token types for the Mosaic language
///
/// Whitespace and comments are skipped; the editor never needs them as
/// tokens because it edits the original text by byte range.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum Token<'src> {
    // Keywords
    #[token("import")]
    Import,

    #[token("as")]
    As,

    #[token("signal")]
    Signal,

    #[token("true")]
    True,

    #[token("false")]
    False,

    // Identifiers (property names, type names, ids, expression words)
    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*", |lex| lex.slice())]
    Ident(&'src str),

    // String literals, quotes included
    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice())]
    #[regex(r"'([^'\\]|\\.)*'", |lex| lex.slice())]
    String(&'src str),

    // Numbers (a leading minus is an operator)
    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice())]
    Number(&'src str),

    // Symbols
    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(":")]
    Colon,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token("/")]
    Slash,

    // Any other run of operator characters (only ever part of expressions)
    #[regex(r"[-+*%!=<>&|^~?]+", |lex| lex.slice())]
    Operator(&'src str),
}

impl<'src> Token<'src> {
    /// Tokens that open a nesting level inside an expression
    pub fn opens_group(&self) -> bool {
        matches!(self, Token::LBrace | Token::LBracket | Token::LParen)
    }

    /// Tokens that close a nesting level inside an expression
    pub fn closes_group(&self) -> bool {
        matches!(self, Token::RBrace | Token::RBracket | Token::RParen)
    }
}

/// Tokenize source text, keeping the byte range of every token
pub fn tokenize(source: &str) -> ParseResult<Vec<(Token<'_>, Range<usize>)>> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => return Err(ParseError::lexer_error(lexer.span())),
        }
    }

    Ok(tokens)
}

use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{tokenize, Token};
use std::collections::HashSet;
use std::ops::Range;

/// Parse a complete `.mos` document
pub fn parse(source: &str) -> ParseResult<Document> {
    Parser::new(source)?.parse_document()
}

/// Recursive descent parser for Mosaic markup
pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        let tokens = tokenize(source)?;
        Ok(Self {
            source,
            tokens,
            pos: 0,
        })
    }

    /// Parse imports followed by exactly one root object
    pub fn parse_document(&mut self) -> ParseResult<Document> {
        let mut imports = Vec::new();

        loop {
            while self.match_token(Token::Semicolon) {}
            if !self.check(Token::Import) {
                break;
            }
            imports.push(self.parse_import()?);
        }

        if self.is_at_end() {
            return Err(ParseError::unexpected_eof(
                self.source.len(),
                "root object definition",
            ));
        }

        let root = self.parse_object_def()?;

        while self.match_token(Token::Semicolon) {}
        if !self.is_at_end() {
            return Err(ParseError::invalid_syntax(
                self.peek_span(),
                "only one root object is allowed",
            ));
        }

        Ok(Document { imports, root })
    }

    /// Parse an import statement
    ///
    /// ```text
    /// import Mosaic.Controls 2.15 as Controls
    /// import "components" as Local
    /// ```
    fn parse_import(&mut self) -> ParseResult<ImportDecl> {
        let start = self.peek_span().start;
        self.expect(Token::Import)?;

        let target = match self.peek() {
            Some((Token::String(s), _)) => {
                let path = unescape_string(s);
                self.advance();
                ImportTarget::File(path)
            }
            _ => ImportTarget::Library(self.parse_qualified_name()?.0),
        };

        let version = match self.peek() {
            Some((Token::Number(n), _)) if !self.on_new_line() => {
                let version = n.to_string();
                self.advance();
                Some(version)
            }
            _ => None,
        };

        let alias = if !self.on_new_line() && self.match_token(Token::As) {
            Some(self.expect_ident()?)
        } else {
            None
        };

        let end = self.last_end();
        self.expect_member_end()?;

        Ok(ImportDecl {
            target,
            version,
            alias,
            span: Span::new(start, end),
        })
    }

    /// Parse `Type { members }`
    fn parse_object_def(&mut self) -> ParseResult<ObjectDef> {
        let (type_name, type_range) = self.parse_qualified_name()?;
        self.parse_object_body(type_name, type_range)
    }

    fn parse_object_body(
        &mut self,
        type_name: String,
        type_range: Range<usize>,
    ) -> ParseResult<ObjectDef> {
        let body_start = self.peek_span().start;
        self.expect(Token::LBrace)?;

        let mut members = Vec::new();
        let mut names = HashSet::new();

        loop {
            while self.match_token(Token::Semicolon) {}

            if self.check(Token::RBrace) {
                break;
            }
            if self.is_at_end() {
                return Err(ParseError::unexpected_eof(self.source.len(), "'}'"));
            }

            let member = self.parse_member()?;
            if let Some(name) = member.name() {
                if !names.insert(name.to_string()) {
                    let span = member.span();
                    return Err(ParseError::invalid_syntax(
                        span.start..span.end,
                        format!("duplicate property '{}'", name),
                    ));
                }
            }
            members.push(member);

            self.expect_member_end()?;
        }

        let body_end = self.peek_span().end;
        self.expect(Token::RBrace)?;

        Ok(ObjectDef {
            type_name,
            type_span: Span::new(type_range.start, type_range.end),
            body: Span::new(body_start, body_end),
            members,
            span: Span::new(type_range.start, body_end),
        })
    }

    /// Parse a single member of an object body
    fn parse_member(&mut self) -> ParseResult<Member> {
        if self.check(Token::Signal) && !self.peek_is_at(1, Token::Colon) {
            return self.parse_signal_decl();
        }

        let start = self.peek_span().start;
        let (name, name_range) = match self.peek() {
            Some((Token::Signal, span)) => {
                let span = span.clone();
                self.advance();
                ("signal".to_string(), span)
            }
            Some((Token::Ident(_), _)) => self.parse_qualified_name()?,
            _ => {
                return Err(ParseError::unexpected_token(
                    self.peek_span(),
                    "property or object definition",
                    Self::format_token(self.peek()),
                ))
            }
        };

        if self.check(Token::LBrace) {
            let object = self.parse_object_body(name, name_range)?;
            return Ok(Member::Child(object));
        }

        self.expect(Token::Colon)?;

        if name == "id" {
            let value_span = self.peek_span();
            let value = self.expect_ident()?;
            return Ok(Member::Id {
                value,
                value_span: Span::new(value_span.start, value_span.end),
                span: Span::new(start, value_span.end),
            });
        }

        if self.starts_object_array() {
            return self.parse_array_binding(name, start);
        }

        if self.starts_object_binding() {
            let object = self.parse_object_def()?;
            let end = object.span.end;
            return Ok(Member::Object {
                name,
                object,
                span: Span::new(start, end),
            });
        }

        let (value, value_span) = self.parse_script_value()?;
        Ok(Member::Script {
            name,
            value,
            value_span,
            span: Span::new(start, value_span.end),
        })
    }

    /// Parse `signal name(params)`; parameters are kept as raw text
    fn parse_signal_decl(&mut self) -> ParseResult<Member> {
        let start = self.peek_span().start;
        self.expect(Token::Signal)?;
        let name = self.expect_ident()?;

        let params = if self.check(Token::LParen) && !self.on_new_line() {
            let open = self.peek_span();
            self.advance();
            let source_len = self.source.len();
            let mut depth = 1usize;
            let mut close = open.end;
            while depth > 0 {
                match self.advance() {
                    Some((Token::LParen, _)) => depth += 1,
                    Some((Token::RParen, span)) => {
                        depth -= 1;
                        close = span.start;
                    }
                    Some(_) => {}
                    None => return Err(ParseError::unexpected_eof(source_len, "')'")),
                }
            }
            self.source[open.end..close].trim().to_string()
        } else {
            String::new()
        };

        Ok(Member::Signal {
            name,
            params,
            span: Span::new(start, self.last_end()),
        })
    }

    /// Parse `name: [ Type {}, Type {} ]`
    fn parse_array_binding(&mut self, name: String, start: usize) -> ParseResult<Member> {
        let open = self.peek_span().start;
        self.expect(Token::LBracket)?;

        let mut objects = Vec::new();
        loop {
            objects.push(self.parse_object_def()?);
            if !self.match_token(Token::Comma) || self.check(Token::RBracket) {
                break;
            }
        }

        let close = self.peek_span().end;
        self.expect(Token::RBracket)?;

        Ok(Member::Array {
            name,
            objects,
            brackets: Span::new(open, close),
            span: Span::new(start, close),
        })
    }

    /// Capture script tokens up to the end of the line, a `;` or the
    /// closing brace of the enclosing object
    fn parse_script_value(&mut self) -> ParseResult<(ScriptValue, Span)> {
        if self.is_at_end() {
            return Err(ParseError::unexpected_eof(self.source.len(), "expression"));
        }
        if self.on_new_line() || self.check(Token::RBrace) || self.check(Token::Semicolon) {
            return Err(ParseError::invalid_syntax(
                self.peek_span(),
                "expected expression",
            ));
        }

        let first = self.pos;
        let start = self.peek_span().start;
        let mut depth = 0usize;

        while let Some((token, span)) = self.peek() {
            if depth == 0 {
                if self.pos > first && self.on_new_line() {
                    break;
                }
                if matches!(token, Token::Semicolon | Token::RBrace) {
                    break;
                }
            }

            if token.opens_group() {
                depth += 1;
            } else if token.closes_group() {
                if depth == 0 {
                    return Err(ParseError::unexpected_token(
                        span.clone(),
                        "expression",
                        Self::format_token(self.peek()),
                    ));
                }
                depth -= 1;
            }
            self.advance();
        }

        if depth > 0 {
            return Err(ParseError::unexpected_eof(
                self.source.len(),
                "closing bracket",
            ));
        }

        let end = self.last_end();
        let tokens = &self.tokens[first..self.pos];
        let value = match literal_from_tokens(tokens) {
            Some(literal) => ScriptValue::Literal(literal),
            None => ScriptValue::Expression(self.source[start..end].to_string()),
        };

        Ok((value, Span::new(start, end)))
    }

    /// `[` followed by a type name and `{`
    fn starts_object_array(&self) -> bool {
        self.check(Token::LBracket) && self.qualified_name_then_brace(1)
    }

    fn starts_object_binding(&self) -> bool {
        self.check(Token::Ident("")) && self.qualified_name_then_brace(0)
    }

    fn qualified_name_then_brace(&self, offset: usize) -> bool {
        let mut i = offset;
        loop {
            match self.peek_ahead(i) {
                Some((Token::Ident(_), _)) => i += 1,
                _ => return false,
            }
            match self.peek_ahead(i) {
                Some((Token::Dot, _)) => i += 1,
                Some((Token::LBrace, _)) => return true,
                _ => return false,
            }
        }
    }

    /// Parse `A.B.C`, returning the joined name and its byte range
    fn parse_qualified_name(&mut self) -> ParseResult<(String, Range<usize>)> {
        let start = self.peek_span().start;
        let mut name = self.expect_ident()?;

        while self.check(Token::Dot) && self.peek_is_ident_at(1) {
            self.advance();
            name.push('.');
            name.push_str(&self.expect_ident()?);
        }

        Ok((name, start..self.last_end()))
    }

    /// Members are separated by a newline or `;`
    fn expect_member_end(&mut self) -> ParseResult<()> {
        if self.is_at_end()
            || self.check(Token::RBrace)
            || self.check(Token::RBracket)
            || self.check(Token::Comma)
            || self.on_new_line()
        {
            return Ok(());
        }
        if self.match_token(Token::Semicolon) {
            return Ok(());
        }
        Err(ParseError::unexpected_token(
            self.peek_span(),
            "newline or ';'",
            Self::format_token(self.peek()),
        ))
    }

    // Helper methods

    fn peek(&self) -> Option<&(Token<'src>, Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn peek_ahead(&self, offset: usize) -> Option<&(Token<'src>, Range<usize>)> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<&(Token<'src>, Range<usize>)> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, token: Token) -> bool {
        if let Some((t, _)) = self.peek() {
            std::mem::discriminant(t) == std::mem::discriminant(&token)
        } else {
            false
        }
    }

    fn peek_is_at(&self, offset: usize, token: Token) -> bool {
        self.peek_ahead(offset)
            .map(|(t, _)| std::mem::discriminant(t) == std::mem::discriminant(&token))
            .unwrap_or(false)
    }

    fn peek_is_ident_at(&self, offset: usize) -> bool {
        matches!(self.peek_ahead(offset), Some((Token::Ident(_), _)))
    }

    fn match_token(&mut self, token: Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        if self.check(token.clone()) {
            self.advance();
            Ok(())
        } else if self.is_at_end() {
            Err(ParseError::unexpected_eof(
                self.source.len(),
                Self::format_expected_token(&token),
            ))
        } else {
            Err(ParseError::unexpected_token(
                self.peek_span(),
                Self::format_expected_token(&token),
                Self::format_token(self.peek()),
            ))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some((Token::Ident(s), _)) => {
                let val = s.to_string();
                self.advance();
                Ok(val)
            }
            None => Err(ParseError::unexpected_eof(self.source.len(), "identifier")),
            _ => Err(ParseError::unexpected_token(
                self.peek_span(),
                "identifier",
                Self::format_token(self.peek()),
            )),
        }
    }

    /// End of the most recently consumed token
    fn last_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|(_, span)| span.end)
            .unwrap_or(0)
    }

    /// Whether a line break separates the previous token from the next one
    fn on_new_line(&self) -> bool {
        match self.peek() {
            Some((_, span)) if self.pos > 0 => {
                self.source[self.last_end()..span.start].contains('\n')
            }
            _ => false,
        }
    }

    /// Get the span of the next token (the one we're about to consume)
    fn peek_span(&self) -> Range<usize> {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.clone())
            .unwrap_or_else(|| {
                let end = self.source.len();
                end..end
            })
    }

    fn format_token(token: Option<&(Token, Range<usize>)>) -> String {
        match token {
            Some((Token::Ident(s), _)) => format!("identifier '{}'", s),
            Some((Token::String(s), _)) => format!("string {}", s),
            Some((Token::Number(n), _)) => format!("number {}", n),
            Some((Token::Operator(op), _)) => format!("'{}'", op),
            Some((t, _)) => Self::format_expected_token(t),
            None => "end of input".to_string(),
        }
    }

    fn format_expected_token(token: &Token) -> String {
        match token {
            Token::Import => "'import'".to_string(),
            Token::As => "'as'".to_string(),
            Token::Signal => "'signal'".to_string(),
            Token::True => "'true'".to_string(),
            Token::False => "'false'".to_string(),
            Token::Ident(_) => "identifier".to_string(),
            Token::String(_) => "string".to_string(),
            Token::Number(_) => "number".to_string(),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::Colon => "':'".to_string(),
            Token::Semicolon => "';'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Dot => "'.'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::Operator(op) => format!("'{}'", op),
        }
    }
}

/// A script value is a literal only when it is a single literal token
/// (or a negated number)
fn literal_from_tokens(tokens: &[(Token, Range<usize>)]) -> Option<Literal> {
    match tokens {
        [(Token::True, _)] => Some(Literal::Bool(true)),
        [(Token::False, _)] => Some(Literal::Bool(false)),
        [(Token::String(s), _)] => Some(Literal::String(unescape_string(s))),
        [(Token::Number(n), _)] => n.parse().ok().map(Literal::Number),
        [(Token::Operator("-"), minus), (Token::Number(n), number)] if minus.end == number.start => {
            n.parse::<f64>().ok().map(|value| Literal::Number(-value))
        }
        _ => None,
    }
}

/// Strip the quotes of a string token and resolve escapes
fn unescape_string(raw: &str) -> String {
    let inner = if raw.len() >= 2 {
        &raw[1..raw.len() - 1]
    } else {
        raw
    };

    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(object: &ObjectDef, name: &str) -> ScriptValue {
        match object.member(name) {
            Some(Member::Script { value, .. }) => value.clone(),
            other => panic!("expected script member '{}', got {:?}", name, other),
        }
    }

    #[test]
    fn test_parse_minimal_document() {
        let doc = parse("Item {}").unwrap();
        assert!(doc.imports.is_empty());
        assert_eq!(doc.root.type_name, "Item");
        assert_eq!(doc.root.span, Span::new(0, 7));
        assert_eq!(doc.root.body, Span::new(5, 7));
    }

    #[test]
    fn test_parse_imports() {
        let source = "import Mosaic.Controls 2.15 as Controls\nimport \"parts\" as Parts\nimport Mosaic\nItem {}";
        let doc = parse(source).unwrap();
        assert_eq!(doc.imports.len(), 3);
        assert_eq!(
            doc.imports[0].target,
            ImportTarget::Library("Mosaic.Controls".to_string())
        );
        assert_eq!(doc.imports[0].version.as_deref(), Some("2.15"));
        assert_eq!(doc.imports[0].alias.as_deref(), Some("Controls"));
        assert_eq!(doc.imports[1].target, ImportTarget::File("parts".to_string()));
        assert_eq!(doc.imports[2].version, None);
        assert_eq!(&source[doc.imports[0].span.start..doc.imports[0].span.end], "import Mosaic.Controls 2.15 as Controls");
    }

    #[test]
    fn test_literals_and_expressions() {
        let source = "Item {\n    width: 10\n    height: -2.5\n    visible: true\n    text: \"a \\\"b\\\"\"\n    x: parent.width / 2\n}";
        let doc = parse(source).unwrap();
        let root = &doc.root;
        assert_eq!(script(root, "width"), ScriptValue::Literal(Literal::Number(10.0)));
        assert_eq!(script(root, "height"), ScriptValue::Literal(Literal::Number(-2.5)));
        assert_eq!(script(root, "visible"), ScriptValue::Literal(Literal::Bool(true)));
        assert_eq!(
            script(root, "text"),
            ScriptValue::Literal(Literal::String("a \"b\"".to_string()))
        );
        assert_eq!(
            script(root, "x"),
            ScriptValue::Expression("parent.width / 2".to_string())
        );
    }

    #[test]
    fn test_value_span_covers_expression() {
        let source = "Item { x: foo(1, 2); y: 3 }";
        let doc = parse(source).unwrap();
        match doc.root.member("x") {
            Some(Member::Script { value_span, span, .. }) => {
                assert_eq!(&source[value_span.start..value_span.end], "foo(1, 2)");
                assert_eq!(&source[span.start..span.end], "x: foo(1, 2)");
            }
            other => panic!("unexpected member {:?}", other),
        }
    }

    #[test]
    fn test_multiline_block_expression() {
        let source = "Item {\n    onClicked: {\n        foo()\n        bar()\n    }\n    width: 1\n}";
        let doc = parse(source).unwrap();
        match script(&doc.root, "onClicked") {
            ScriptValue::Expression(text) => {
                assert!(text.starts_with('{'));
                assert!(text.ends_with('}'));
                assert!(text.contains("bar()"));
            }
            other => panic!("unexpected value {:?}", other),
        }
        assert!(doc.root.member("width").is_some());
    }

    #[test]
    fn test_id_signal_object_and_array_members() {
        let source = r#"Rectangle {
    id: box
    signal activated(int index, string name)
    signal reset
    border: Border { width: 2 }
    states: [ State { name: "a" }, State { name: "b" } ]
    Text { text: "hi" }
}"#;
        let doc = parse(source).unwrap();
        let root = &doc.root;
        assert_eq!(root.id(), Some("box"));

        match root.member("activated") {
            Some(Member::Signal { params, .. }) => assert_eq!(params, "int index, string name"),
            other => panic!("unexpected member {:?}", other),
        }
        match root.member("reset") {
            Some(Member::Signal { params, .. }) => assert!(params.is_empty()),
            other => panic!("unexpected member {:?}", other),
        }
        match root.member("border") {
            Some(Member::Object { object, .. }) => assert_eq!(object.type_name, "Border"),
            other => panic!("unexpected member {:?}", other),
        }
        match root.member("states") {
            Some(Member::Array { objects, brackets, .. }) => {
                assert_eq!(objects.len(), 2);
                assert_eq!(&source[brackets.start..brackets.start + 1], "[");
                assert_eq!(&source[brackets.end - 1..brackets.end], "]");
            }
            other => panic!("unexpected member {:?}", other),
        }
        assert_eq!(root.children().count(), 1);
    }

    #[test]
    fn test_plain_array_is_an_expression() {
        let doc = parse("Item { values: [1, 2, 3] }").unwrap();
        assert_eq!(
            script(&doc.root, "values"),
            ScriptValue::Expression("[1, 2, 3]".to_string())
        );
    }

    #[test]
    fn test_qualified_type_names() {
        let doc = parse("import Mosaic.Controls as C\nC.Button { }").unwrap();
        assert_eq!(doc.root.type_name, "C.Button");
        assert_eq!(doc.root.type_span, Span::new(28, 36));
    }

    #[test]
    fn test_dotted_property_names() {
        let doc = parse("Item { anchors.fill: parent }").unwrap();
        assert!(doc.root.member("anchors.fill").is_some());
    }

    #[test]
    fn test_duplicate_property_is_an_error() {
        let err = parse("Item {\n    width: 1\n    width: 2\n}").unwrap_err();
        match err {
            ParseError::InvalidSyntax { message, .. } => assert!(message.contains("width")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_missing_root_is_an_error() {
        assert!(matches!(
            parse("import Mosaic\n"),
            Err(ParseError::UnexpectedEof { .. })
        ));
        assert!(parse("").is_err());
    }

    #[test]
    fn test_two_roots_is_an_error() {
        assert!(parse("Item {}\nItem {}").is_err());
    }

    #[test]
    fn test_unclosed_object_is_an_error() {
        assert!(matches!(
            parse("Item {\n    width: 10\n"),
            Err(ParseError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_members_need_separators() {
        assert!(parse("Item { id: a b: 1 }").is_err());
        assert!(parse("Item { Item {} Item {} }").is_err());
        assert!(parse("Item { id: a; b: 1 }").is_ok());
    }

    #[test]
    fn test_missing_value_is_an_error() {
        assert!(parse("Item {\n    width:\n}").is_err());
    }
}

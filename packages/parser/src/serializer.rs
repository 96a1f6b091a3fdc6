use crate::ast::*;
use std::fmt::Write;

/// Render a literal the way the parser reads it back
pub fn serialize_literal(literal: &Literal) -> String {
    match literal {
        Literal::Bool(value) => value.to_string(),
        Literal::Number(value) => format_number(*value),
        Literal::String(value) => quote_string(value),
    }
}

/// Integral values print without a fractional part (`10`, not `10.0`)
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // avoid "-0"
        return "0".to_string();
    }
    value.to_string()
}

/// Double-quote a string, escaping quotes, backslashes and newlines
pub fn quote_string(value: &str) -> String {
    let mut output = String::with_capacity(value.len() + 2);
    output.push('"');
    for c in value.chars() {
        match c {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\t' => output.push_str("\\t"),
            '\r' => output.push_str("\\r"),
            c => output.push(c),
        }
    }
    output.push('"');
    output
}

/// Render an import statement
pub fn serialize_import(target: &ImportTarget, version: Option<&str>, alias: Option<&str>) -> String {
    let mut output = String::from("import ");
    match target {
        ImportTarget::Library(name) => output.push_str(name),
        ImportTarget::File(path) => output.push_str(&quote_string(path)),
    }
    if let Some(version) = version {
        let _ = write!(output, " {}", version);
    }
    if let Some(alias) = alias {
        let _ = write!(output, " as {}", alias);
    }
    output
}

/// Line-oriented text builder used when generating new markup
///
/// The first line is written without indentation so the result can be
/// spliced after existing text on the current line.
pub struct Printer {
    output: String,
    indent_level: usize,
    indent_string: String,
    at_line_start: bool,
}

impl Printer {
    pub fn new(indent_width: usize) -> Self {
        Self {
            output: String::new(),
            indent_level: 0,
            indent_string: " ".repeat(indent_width),
            at_line_start: false,
        }
    }

    /// Start at an existing indentation level
    pub fn with_level(indent_width: usize, indent_level: usize) -> Self {
        Self {
            indent_level,
            ..Self::new(indent_width)
        }
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    /// Append text to the current line
    pub fn write(&mut self, text: &str) {
        if self.at_line_start {
            for _ in 0..self.indent_level {
                self.output.push_str(&self.indent_string);
            }
            self.at_line_start = false;
        }
        self.output.push_str(text);
    }

    pub fn newline(&mut self) {
        self.output.push('\n');
        self.at_line_start = true;
    }

    /// Write a full line and move to the next
    pub fn line(&mut self, text: &str) {
        self.write(text);
        self.newline();
    }

    pub fn finish(self) -> String {
        self.output
    }
}

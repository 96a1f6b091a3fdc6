//! Brace-depth re-indentation.
//!
//! Each line is indented by `depth * unit`, where depth counts the `{`, `[`
//! and `(` still open at the start of the line. A line starting with a closer
//! sits one level out. Lines that start inside a string or block comment and
//! blank lines are left alone.

use std::ops::Range;

/// Replacement of a line's leading whitespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndentEdit {
    pub offset: usize,
    pub length: usize,
    pub indent: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    String(char),
    BlockComment,
}

/// Compute indentation fixes for the lines touched by `ranges`, or for every
/// line when `ranges` is `None`. Edits are in ascending offset order.
pub fn reindent(text: &str, ranges: Option<&[Range<usize>]>, unit: &str) -> Vec<IndentEdit> {
    let mut edits = Vec::new();
    let mut depth: usize = 0;
    let mut state = State::Code;
    let mut line_start = 0;

    for line in text.split_inclusive('\n') {
        let line_end = line_start + line.trim_end_matches('\n').len();
        let content = line.trim_start_matches([' ', '\t']);
        let leading = line.len() - content.len();
        let blank = content.trim().is_empty();

        if state == State::Code && !blank && touches(ranges, line_start, line_end) {
            let level = if content.starts_with(['}', ']', ')']) {
                depth.saturating_sub(1)
            } else {
                depth
            };
            let indent = unit.repeat(level);
            if line[..leading] != indent {
                edits.push(IndentEdit {
                    offset: line_start,
                    length: leading,
                    indent,
                });
            }
        }

        scan_line(line, &mut state, &mut depth);
        line_start += line.len();
    }

    edits
}

fn touches(ranges: Option<&[Range<usize>]>, line_start: usize, line_end: usize) -> bool {
    match ranges {
        None => true,
        Some(ranges) => ranges
            .iter()
            .any(|range| range.start <= line_end && line_start <= range.end),
    }
}

fn scan_line(line: &str, state: &mut State, depth: &mut usize) {
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match *state {
            State::String(quote) => {
                if c == '\\' {
                    chars.next();
                } else if c == quote {
                    *state = State::Code;
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    *state = State::Code;
                }
            }
            State::Code => match c {
                '"' | '\'' | '`' => *state = State::String(c),
                '/' if chars.peek() == Some(&'/') => return,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    *state = State::BlockComment;
                }
                '{' | '[' | '(' => *depth += 1,
                '}' | ']' | ')' => *depth = depth.saturating_sub(1),
                _ => {}
            },
        }
    }
}

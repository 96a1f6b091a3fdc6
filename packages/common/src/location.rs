use serde::{Deserialize, Serialize};

/// A byte range in a document's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextLocation {
    pub offset: usize,
    pub length: usize,
}

impl TextLocation {
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Slice the located text, if the range is still valid for `text`
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.offset..self.end())
    }
}

/// One-based line and column of a byte offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

/// Precomputed line starts for offset → line/column conversion
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            line_starts,
            len: text.len(),
        }
    }

    pub fn line_column(&self, offset: usize) -> LineColumn {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        LineColumn {
            line: line + 1,
            column: offset - self.line_starts[line] + 1,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_column() {
        let index = LineIndex::new("Item {\n    x: 1\n}");
        assert_eq!(index.line_column(0), LineColumn { line: 1, column: 1 });
        assert_eq!(index.line_column(7), LineColumn { line: 2, column: 1 });
        assert_eq!(index.line_column(11), LineColumn { line: 2, column: 5 });
        assert_eq!(index.line_column(16), LineColumn { line: 3, column: 1 });
        assert_eq!(index.line_count(), 3);
    }

    #[test]
    fn test_offset_past_end_clamps() {
        let index = LineIndex::new("ab");
        assert_eq!(index.line_column(10), LineColumn { line: 1, column: 3 });
    }

    #[test]
    fn test_slice() {
        let location = TextLocation::new(2, 3);
        assert_eq!(location.slice("0123456"), Some("234"));
        assert_eq!(location.slice("01"), None);
    }
}

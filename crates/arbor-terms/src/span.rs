use serde::{Deserialize, Serialize};
use std::fmt;

/// Source location span.
///
/// Line/column values are 1-based. A span produced without source
/// information uses the `-1` sentinel in every position ([`Span::UNKNOWN`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start_line: i32,
    pub start_col: i32,
    pub end_line: i32,
    pub end_col: i32,
}

impl Span {
    /// The span attached to terms built without a parser.
    pub const UNKNOWN: Span = Span {
        start_line: -1,
        start_col: -1,
        end_line: -1,
        end_col: -1,
    };

    /// Create a new span.
    pub fn new(start_line: i32, start_col: i32, end_line: i32, end_col: i32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Create a zero-width span at a single position.
    pub fn point(line: i32, col: i32) -> Self {
        Self::new(line, col, line, col)
    }

    /// Span of a token of `len` characters starting at `line:col`.
    pub fn token(line: i32, col: i32, len: i32) -> Self {
        Self::new(line, col, line, col + len)
    }

    pub fn is_known(&self) -> bool {
        self.start_line >= 1 && self.start_col >= 1
    }

    /// From the start of `start` to the end of `end`, the way a parser
    /// locates a composite node from its first and last tokens.
    pub fn covering(start: Span, end: Span) -> Span {
        if !start.is_known() || !end.is_known() {
            return start.merge(end);
        }
        Span::new(start.start_line, start.start_col, end.end_line, end.end_col)
    }

    /// Merge two spans into one that covers both.
    ///
    /// An unknown span contributes nothing: merging with it returns the
    /// other side unchanged.
    pub fn merge(self, other: Span) -> Span {
        if !other.is_known() {
            return self;
        }
        if !self.is_known() {
            return other;
        }

        let start_line = self.start_line.min(other.start_line);
        let start_col = if self.start_line < other.start_line {
            self.start_col
        } else if other.start_line < self.start_line {
            other.start_col
        } else {
            self.start_col.min(other.start_col)
        };

        let end_line = self.end_line.max(other.end_line);
        let end_col = if self.end_line > other.end_line {
            self.end_col
        } else if other.end_line > self.end_line {
            other.end_col
        } else {
            self.end_col.max(other.end_col)
        };

        Span::new(start_line, start_col, end_line, end_col)
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{})-({},{})",
            self.start_line, self.start_col, self.end_line, self.end_col
        )
    }
}

/// Holds the source text a program was parsed from, for error excerpts.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub source: String,
    /// Cached line start byte offsets for fast line lookup.
    line_starts: Vec<usize>,
}

impl SourceFile {
    /// Create a new source file.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            name: name.into(),
            source,
            line_starts,
        }
    }

    /// Extract a source line by 1-based line number.
    ///
    /// Returns `None` if the line number is out of range.
    pub fn line(&self, line_number: i32) -> Option<&str> {
        let idx = usize::try_from(line_number.checked_sub(1)?).ok()?;
        if idx >= self.line_starts.len() {
            return None;
        }
        let start = self.line_starts[idx];
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&s| s.saturating_sub(1)) // strip the \n
            .unwrap_or(self.source.len());
        let line = &self.source[start..end];
        // Also strip trailing \r for CRLF
        Some(line.trim_end_matches('\r'))
    }

    /// Get the total number of lines.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

use crate::span::{SourceFile, Span};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Characters of context shown before the caret in an excerpt.
const EXCERPT_BEFORE: usize = 15;
/// Characters of context shown after the caret in an excerpt.
const EXCERPT_AFTER: usize = 5;

/// The closed set of failures the engine and the evaluator can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad arity, abstract kind, wrong argument type, bad declaration.
    Shape,
    /// No rule of a matcher fired.
    NoMatch,
    UnboundIdentifier,
    TypeConversion,
    /// Division by zero, logarithm of a non-positive number.
    Domain,
    UnlikeComparison,
    DuplicateArgument,
    Arity,
    DanglingReference,
    Timeout,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Shape => "shape error",
            Self::NoMatch => "no match",
            Self::UnboundIdentifier => "unbound identifier",
            Self::TypeConversion => "type conversion error",
            Self::Domain => "domain error",
            Self::UnlikeComparison => "comparison of unlike types",
            Self::DuplicateArgument => "duplicate argument",
            Self::Arity => "arity error",
            Self::DanglingReference => "dangling reference",
            Self::Timeout => "execution timed out",
        };
        f.write_str(name)
    }
}

/// A structured Arbor error.
///
/// Hosts render these; the core never prints them. `span` is the location
/// of the term that raised the error, when that term carried one.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
        }
    }

    pub fn shape(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Shape, message)
    }

    pub fn no_match(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoMatch, message)
    }

    /// Attach a source location. Unknown spans are ignored, and an
    /// already-located error keeps its innermost location.
    pub fn at(mut self, span: Span) -> Self {
        if self.span.is_none() && span.is_known() {
            self.span = Some(span);
        }
        self
    }

    /// Render a caret-style excerpt of the offending source line.
    ///
    /// Returns an empty string when the error has no location or the
    /// location falls outside `source`.
    pub fn excerpt(&self, source: &SourceFile) -> String {
        let Some(span) = self.span else {
            return String::new();
        };
        let Some(line) = source.line(span.start_line) else {
            return String::new();
        };
        let col = usize::try_from(span.start_col).unwrap_or(1).max(1);
        let at = format!("At {}:{}: ", span.start_line, span.start_col);
        let from = col.saturating_sub(EXCERPT_BEFORE);
        let trimmed: String = line
            .chars()
            .skip(from)
            .take(col + EXCERPT_AFTER - from)
            .collect();
        let pad = at.chars().count() + (EXCERPT_BEFORE - 1).min(col - 1);
        format!("{at}{trimmed}\n{}^", " ".repeat(pad))
    }

    /// Message followed by the excerpt, the way a REPL presents it.
    pub fn render(&self, source: &SourceFile) -> String {
        let excerpt = self.excerpt(source);
        if excerpt.is_empty() {
            self.to_string()
        } else {
            format!("{self}\n{excerpt}")
        }
    }
}

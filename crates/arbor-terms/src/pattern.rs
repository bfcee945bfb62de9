//! Patterns: templates over kinds used to select rules and destructure terms.
//!
//! A *bare* kind pattern matches any term whose ancestor chain contains the
//! kind and never looks at the arguments. An *applied* pattern also requires
//! an exact argument count and matches each argument against its
//! sub-pattern. Destructuring follows the same nesting: every applied
//! sub-pattern unwraps its argument into [`Bound::Parts`], everything else
//! stays a [`Bound::Leaf`].

use crate::error::Error;
use crate::registry::{Kind, Prim};
use crate::term::{Arg, TermRef};
use crate::Result;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// Wildcard.
    Any,
    Prim(Prim),
    /// Bare kind reference: ancestry only.
    Kind(Kind),
    /// Kind with explicit sub-patterns (possibly none).
    Applied(Kind, Vec<Pattern>),
    /// Every member of a sequence matches the element pattern.
    Repeated(Box<Pattern>),
    /// First alternative that matches wins.
    OneOf(Vec<Pattern>),
}

impl Pattern {
    pub fn bare(kind: &Kind) -> Self {
        Self::Kind(kind.clone())
    }

    pub fn applied(kind: &Kind, parts: Vec<Pattern>) -> Self {
        Self::Applied(kind.clone(), parts)
    }

    pub fn repeated(element: impl Into<Pattern>) -> Self {
        Self::Repeated(Box::new(element.into()))
    }

    pub fn one_of(alternatives: Vec<Pattern>) -> Self {
        Self::OneOf(alternatives)
    }

    /// Shape test only; guards are the matcher's business.
    pub fn matches(&self, arg: &Arg) -> bool {
        match self {
            Self::Any => true,
            Self::Prim(prim) => arg.prim() == Some(*prim),
            Self::Kind(kind) => arg.as_term().is_some_and(|t| t.is_a(kind.id())),
            Self::Applied(kind, parts) => arg.as_term().is_some_and(|t| {
                t.is_a(kind.id())
                    && t.args().len() == parts.len()
                    && parts.iter().zip(t.args()).all(|(p, a)| p.matches(a))
            }),
            Self::Repeated(element) => arg
                .as_seq()
                .is_some_and(|items| items.iter().all(|item| element.matches(item))),
            Self::OneOf(alternatives) => alternatives.iter().any(|p| p.matches(arg)),
        }
    }

    /// Destructure an argument this pattern matched, as a nested value.
    pub fn destructure(&self, arg: &Arg) -> Bound {
        match self {
            Self::Applied(_, parts) => match arg.as_term() {
                Some(t) => Bound::Parts(
                    parts
                        .iter()
                        .zip(t.args())
                        .map(|(p, a)| p.destructure(a))
                        .collect(),
                ),
                None => Bound::Leaf(arg.clone()),
            },
            Self::Repeated(element) => match arg.as_seq() {
                Some(items) => Bound::Parts(items.iter().map(|i| element.destructure(i)).collect()),
                None => Bound::Leaf(arg.clone()),
            },
            Self::OneOf(alternatives) => match alternatives.iter().find(|p| p.matches(arg)) {
                Some(p) => p.destructure(arg),
                None => Bound::Leaf(arg.clone()),
            },
            Self::Any | Self::Prim(_) | Self::Kind(_) => Bound::Leaf(arg.clone()),
        }
    }

    /// Top-level destructuring handed to a rule handler.
    ///
    /// An applied pattern yields its destructured arguments; any other
    /// pattern on a term yields that term's arguments unwrapped one level;
    /// a primitive subject yields nothing beyond itself.
    pub fn bind(&self, subject: &Arg) -> Bindings {
        let parts = match (self, subject) {
            (Self::OneOf(alternatives), _) => {
                if let Some(p) = alternatives.iter().find(|p| p.matches(subject)) {
                    return p.bind(subject);
                }
                Vec::new()
            }
            (Self::Applied(..) | Self::Repeated(_), _) => match self.destructure(subject) {
                Bound::Parts(parts) => parts,
                Bound::Leaf(_) => Vec::new(),
            },
            (_, Arg::Term(t)) => t.args().iter().cloned().map(Bound::Leaf).collect(),
            _ => Vec::new(),
        };
        Bindings {
            subject: subject.clone(),
            parts,
        }
    }
}

impl From<&Kind> for Pattern {
    fn from(kind: &Kind) -> Self {
        Self::bare(kind)
    }
}

impl From<Prim> for Pattern {
    fn from(prim: Prim) -> Self {
        Self::Prim(prim)
    }
}

impl Kind {
    /// Applied pattern over this kind.
    pub fn with(&self, parts: Vec<Pattern>) -> Pattern {
        Pattern::applied(self, parts)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("_"),
            Self::Prim(prim) => write!(f, "{prim}"),
            Self::Kind(kind) => write!(f, "{kind}"),
            Self::Applied(kind, parts) => {
                write!(f, "{kind}(")?;
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{p}")?;
                }
                f.write_str(")")
            }
            Self::Repeated(element) => write!(f, "[{element}]"),
            Self::OneOf(alternatives) => {
                for (i, p) in alternatives.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{p}")?;
                }
                Ok(())
            }
        }
    }
}

/// One destructured position.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Leaf(Arg),
    Parts(Vec<Bound>),
}

fn destructuring_failed(expected: &str, found: &dyn fmt::Debug) -> Error {
    Error::no_match(format!(
        "destructuring failed: expected {expected}, found {found:?}"
    ))
}

impl Bound {
    pub fn leaf(&self) -> Result<&Arg> {
        match self {
            Self::Leaf(arg) => Ok(arg),
            other => Err(destructuring_failed("a single argument", other)),
        }
    }

    pub fn parts(&self) -> Result<&[Bound]> {
        match self {
            Self::Parts(parts) => Ok(parts),
            other => Err(destructuring_failed("destructured parts", other)),
        }
    }

    pub fn num(&self) -> Result<f64> {
        let arg = self.leaf()?;
        arg.as_num().ok_or_else(|| destructuring_failed("Num", arg))
    }

    pub fn boolean(&self) -> Result<bool> {
        let arg = self.leaf()?;
        arg.as_bool().ok_or_else(|| destructuring_failed("Bool", arg))
    }

    pub fn str(&self) -> Result<&str> {
        let arg = self.leaf()?;
        arg.as_str().ok_or_else(|| destructuring_failed("Str", arg))
    }

    pub fn term(&self) -> Result<&TermRef> {
        let arg = self.leaf()?;
        arg.as_term().ok_or_else(|| destructuring_failed("a term", arg))
    }

    /// Members of a sequence argument left as a leaf.
    pub fn seq(&self) -> Result<&[Arg]> {
        let arg = self.leaf()?;
        arg.as_seq().ok_or_else(|| destructuring_failed("a sequence", arg))
    }
}

/// What a firing rule receives: the matched subject and its destructured
/// positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Bindings {
    subject: Arg,
    parts: Vec<Bound>,
}

impl Bindings {
    pub fn subject(&self) -> &Arg {
        &self.subject
    }

    /// The subject as a term, if it is one.
    pub fn term(&self) -> Option<&TermRef> {
        self.subject.as_term()
    }

    pub fn parts(&self) -> &[Bound] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn part(&self, index: usize) -> Result<&Bound> {
        self.parts.get(index).ok_or_else(|| {
            Error::no_match(format!(
                "destructuring failed: no position {index} in {}",
                self.subject
            ))
        })
    }

    pub fn num(&self, index: usize) -> Result<f64> {
        self.part(index)?.num()
    }

    pub fn boolean(&self, index: usize) -> Result<bool> {
        self.part(index)?.boolean()
    }

    pub fn str(&self, index: usize) -> Result<&str> {
        self.part(index)?.str()
    }

    pub fn arg(&self, index: usize) -> Result<&Arg> {
        self.part(index)?.leaf()
    }

    pub fn term_at(&self, index: usize) -> Result<&TermRef> {
        self.part(index)?.term()
    }

    pub fn seq(&self, index: usize) -> Result<&[Arg]> {
        self.part(index)?.seq()
    }

    pub fn nested(&self, index: usize) -> Result<&[Bound]> {
        self.part(index)?.parts()
    }
}

//! Term instances: a kind plus an immutable, ordered argument tuple.

use crate::registry::{Kind, KindId, Prim};
use crate::span::Span;
use std::fmt;
use std::sync::Arc;

/// Terms are shared, never mutated after construction.
pub type TermRef = Arc<Term>;

/// One argument of a term.
#[derive(Debug, Clone)]
pub enum Arg {
    Num(f64),
    Bool(bool),
    Str(String),
    Term(TermRef),
    Seq(Vec<Arg>),
}

impl Arg {
    pub fn prim(&self) -> Option<Prim> {
        match self {
            Self::Num(_) => Some(Prim::Num),
            Self::Bool(_) => Some(Prim::Bool),
            Self::Str(_) => Some(Prim::Str),
            Self::Term(_) | Self::Seq(_) => None,
        }
    }

    pub fn as_term(&self) -> Option<&TermRef> {
        match self {
            Self::Term(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Self::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Arg]> {
        match self {
            Self::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// Runtime type description, used in shape errors.
    pub fn describe(&self) -> String {
        match self {
            Self::Term(t) => format!("{} (ancestor chain {})", t.name(), t.ancestry()),
            Self::Seq(items) => format!("sequence of {}", items.len()),
            other => other.prim().map(|p| p.to_string()).unwrap_or_default(),
        }
    }
}

impl PartialEq for Arg {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Num(a), Self::Num(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Term(a), Self::Term(b)) => Arc::ptr_eq(a, b) || a == b,
            (Self::Seq(a), Self::Seq(b)) => a == b,
            _ => false,
        }
    }
}

impl From<f64> for Arg {
    fn from(n: f64) -> Self {
        Self::Num(n)
    }
}

impl From<bool> for Arg {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Term> for Arg {
    fn from(t: Term) -> Self {
        Self::Term(Arc::new(t))
    }
}

impl From<TermRef> for Arg {
    fn from(t: TermRef) -> Self {
        Self::Term(t)
    }
}

/// A zero-argument kind used bare stands for its empty application.
impl From<&Kind> for Arg {
    fn from(kind: &Kind) -> Self {
        Self::Term(Arc::new(kind.bare()))
    }
}

impl<T: Into<Arg>> From<Vec<T>> for Arg {
    fn from(items: Vec<T>) -> Self {
        Self::Seq(items.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Str(s) => f.write_str(s),
            Self::Term(t) => write!(f, "{t}"),
            Self::Seq(items) => {
                f.write_str("[")?;
                write_joined(f, items)?;
                f.write_str("]")
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Arg]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// An instance of a kind.
///
/// Construction does not check the shape; see [`crate::Registry::validate`]
/// and [`crate::Registry::build`].
#[derive(Debug, Clone)]
pub struct Term {
    kind: Kind,
    args: Vec<Arg>,
    span: Span,
}

impl Term {
    pub fn new(kind: &Kind, args: Vec<Arg>) -> Self {
        Self {
            kind: kind.clone(),
            args,
            span: Span::UNKNOWN,
        }
    }

    /// Attach the source location.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn name(&self) -> &str {
        self.kind.name()
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&Arg> {
        self.args.get(index)
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn ancestors(&self) -> &[KindId] {
        self.kind.ancestors()
    }

    pub fn is_a(&self, kind: KindId) -> bool {
        self.kind.is_a(kind)
    }

    /// The ancestor chain rendered as `[Self, Parent, ...]`.
    pub fn ancestry(&self) -> String {
        format!("[{}]", self.kind.ancestor_names().join(", "))
    }

    pub fn into_ref(self) -> TermRef {
        Arc::new(self)
    }
}

// Dropping a deep tree must not recurse once per level. Children this term
// owns outright are unlinked onto a worklist first; shared ones only lose a
// reference.
impl Drop for Term {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.args);
        while let Some(arg) = pending.pop() {
            match arg {
                Arg::Term(child) => {
                    if let Some(mut child) = Arc::into_inner(child) {
                        pending.append(&mut child.args);
                    }
                }
                Arg::Seq(items) => pending.extend(items),
                Arg::Num(_) | Arg::Bool(_) | Arg::Str(_) => {}
            }
        }
    }
}

/// Structural equality: same kind, equal arguments. Spans are ignored.
impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.args == other.args
    }
}

/// Canonical form: `Name` or `Name(arg, arg, ...)`.
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.name())?;
        if !self.args.is_empty() {
            f.write_str("(")?;
            write_joined(f, &self.args)?;
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl Kind {
    /// Invoke the kind: build an (unchecked) instance.
    pub fn apply(&self, args: Vec<Arg>) -> Term {
        Term::new(self, args)
    }

    /// The kind referenced without arguments.
    pub fn bare(&self) -> Term {
        Term::new(self, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ArgType, RegistryBuilder};
    use crate::Registry;

    fn list_registry() -> Registry {
        let mut b = RegistryBuilder::new();
        let list = b.declare("NumList");
        b.mark_abstract(list).unwrap();
        let nil = b.declare("Nil");
        b.set_parent(nil, list).unwrap();
        let cons = b.kind("Cons", vec![Prim::Num.into(), list.into()]);
        b.set_parent(cons, list).unwrap();
        b.kind("Bag", vec![ArgType::Any]);
        b.finish().unwrap()
    }

    #[test]
    fn test_canonical_form() {
        let reg = list_registry();
        let nil = reg.lookup("Nil").unwrap();
        let cons = reg.lookup("Cons").unwrap();
        let list = cons.apply(vec![
            Arg::Num(1.0),
            cons.apply(vec![Arg::Num(2.0), nil.into()]).into(),
        ]);
        assert_eq!(list.to_string(), "Cons(1, Cons(2, Nil))");
        assert_eq!(nil.bare().to_string(), "Nil");

        let bag = reg.lookup("Bag").unwrap();
        let seq = bag.apply(vec![vec![1.5_f64, 2.0].into()]);
        assert_eq!(seq.to_string(), "Bag([1.5, 2])");
        assert_eq!(bag.apply(vec!["x".into()]).to_string(), "Bag(x)");
    }

    #[test]
    fn test_structural_equality_ignores_span() {
        let reg = list_registry();
        let nil = reg.lookup("Nil").unwrap();
        let cons = reg.lookup("Cons").unwrap();
        let a = cons.apply(vec![Arg::Num(1.0), nil.into()]);
        let b = cons
            .apply(vec![Arg::Num(1.0), nil.bare().into()])
            .with_span(Span::new(1, 1, 1, 9));
        assert_eq!(a, b);
        assert_ne!(a, cons.apply(vec![Arg::Num(2.0), nil.into()]));
        assert_ne!(nil.bare(), cons.apply(vec![]));
    }

    #[test]
    fn test_ancestry_rendering() {
        let reg = list_registry();
        let nil = reg.lookup("Nil").unwrap().bare();
        assert_eq!(nil.ancestry(), "[Nil, NumList]");
        assert_eq!(nil.span(), Span::UNKNOWN);
    }

    #[test]
    fn test_deep_tree_drops_without_recursion() {
        let reg = list_registry();
        let nil = reg.lookup("Nil").unwrap();
        let cons = reg.lookup("Cons").unwrap();
        let mut t: TermRef = nil.bare().into_ref();
        let mut kept = None;
        for i in 0..200_000 {
            t = cons.apply(vec![Arg::Num(i as f64), Arg::Term(t)]).into_ref();
            if i == 3 {
                kept = Some(Arc::clone(&t));
            }
        }
        drop(t);
        // A subtree still referenced elsewhere survives the drop.
        let kept = kept.unwrap();
        assert_eq!(kept.to_string(), "Cons(3, Cons(2, Cons(1, Cons(0, Nil))))");
    }
}

//! Ordered rule tables.
//!
//! A [`Matcher`] tries its rules in declaration order and runs the handler
//! of the first one whose pattern matches and whose guard (if any) accepts.
//! Handlers and guards receive a caller-supplied context `C` as an ordinary
//! parameter; this is how semantic rules see live state such as an
//! environment or a store. Handlers also receive the matcher itself so they
//! can dispatch nested terms through the same table.

use crate::error::Error;
use crate::pattern::{Bindings, Pattern};
use crate::registry::Registry;
use crate::term::{Arg, TermRef};
use std::fmt;
use std::sync::Arc;

pub type Handler<C, R, E> = Box<dyn Fn(&Matcher<C, R, E>, Bindings, &mut C) -> Result<R, E>>;
pub type Guard<C> = Box<dyn Fn(&Bindings, &C) -> bool>;

pub struct Rule<C, R, E> {
    pattern: Pattern,
    guard: Option<Guard<C>>,
    handler: Handler<C, R, E>,
}

impl<C, R, E> Rule<C, R, E> {
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn is_guarded(&self) -> bool {
        self.guard.is_some()
    }
}

pub struct Matcher<C, R, E = Error> {
    registry: Arc<Registry>,
    rules: Vec<Rule<C, R, E>>,
    check_shapes: bool,
}

impl<C, R, E> Matcher<C, R, E>
where
    E: From<Error>,
{
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            rules: Vec::new(),
            check_shapes: true,
        }
    }

    /// Skip the per-dispatch shape check. For callers that validate whole
    /// trees with [`Registry::validate`] before dispatching any part of them.
    pub fn prevalidated(mut self) -> Self {
        self.check_shapes = false;
        self
    }

    /// Append an unguarded rule.
    pub fn rule<F>(mut self, pattern: impl Into<Pattern>, handler: F) -> Self
    where
        F: Fn(&Matcher<C, R, E>, Bindings, &mut C) -> Result<R, E> + 'static,
    {
        self.rules.push(Rule {
            pattern: pattern.into(),
            guard: None,
            handler: Box::new(handler),
        });
        self
    }

    /// Append a rule that fires only when `guard` accepts the destructured
    /// subject.
    pub fn guarded<G, F>(mut self, pattern: impl Into<Pattern>, guard: G, handler: F) -> Self
    where
        G: Fn(&Bindings, &C) -> bool + 'static,
        F: Fn(&Matcher<C, R, E>, Bindings, &mut C) -> Result<R, E> + 'static,
    {
        self.rules.push(Rule {
            pattern: pattern.into(),
            guard: Some(Box::new(guard)),
            handler: Box::new(handler),
        });
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn rules(&self) -> &[Rule<C, R, E>] {
        &self.rules
    }

    /// Dispatch `subject` to the first firing rule.
    ///
    /// A term subject is shape-checked (one level) before any rule runs,
    /// unless the matcher is [`Matcher::prevalidated`].
    pub fn apply(&self, subject: &Arg, cx: &mut C) -> Result<R, E> {
        if let Arg::Term(term) = subject {
            if self.check_shapes {
                self.registry.check_node(term)?;
            }
        }
        for rule in &self.rules {
            if !rule.pattern.matches(subject) {
                continue;
            }
            let bindings = rule.pattern.bind(subject);
            if let Some(guard) = &rule.guard {
                if !guard(&bindings, cx) {
                    continue;
                }
            }
            return (rule.handler)(self, bindings, cx);
        }
        Err(self.no_match(subject).into())
    }

    pub fn apply_term(&self, term: &TermRef, cx: &mut C) -> Result<R, E> {
        self.apply(&Arg::Term(Arc::clone(term)), cx)
    }

    fn no_match(&self, subject: &Arg) -> Error {
        match subject {
            Arg::Term(term) => Error::no_match(format!(
                "no rule matched {term} (ancestor chain {})",
                term.ancestry()
            ))
            .at(term.span()),
            other => Error::no_match(format!(
                "no rule matched {other} ({})",
                other.describe()
            )),
        }
    }
}

impl<C, R, E> fmt::Debug for Matcher<C, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field(
                "rules",
                &self
                    .rules
                    .iter()
                    .map(|r| r.pattern.to_string())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

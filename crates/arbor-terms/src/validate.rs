//! Shape validation of term instances against their kinds' declarations.

use crate::error::Error;
use crate::registry::{ArgType, Kind, Registry};
use crate::term::{Arg, Term, TermRef};
use crate::Result;

impl Registry {
    /// Check `term` and every term nested inside it.
    ///
    /// Walks the tree with an explicit work list, so arbitrarily deep terms
    /// do not consume host stack.
    pub fn validate(&self, term: &Term) -> Result<()> {
        self.check_node(term)?;
        let mut pending: Vec<&Term> = Vec::new();
        push_nested(term.args(), &mut pending);
        while let Some(next) = pending.pop() {
            self.check_node(next)?;
            push_nested(next.args(), &mut pending);
        }
        Ok(())
    }

    /// Like [`Registry::validate`], for any argument value. Primitives and
    /// sequences of primitives always pass.
    pub fn validate_arg(&self, arg: &Arg) -> Result<()> {
        match arg {
            Arg::Term(t) => self.validate(t),
            Arg::Seq(items) => items.iter().try_for_each(|item| self.validate_arg(item)),
            _ => Ok(()),
        }
    }

    /// Check one node against its declaration without descending into
    /// nested terms (their own kinds are not re-checked).
    pub fn check_node(&self, term: &Term) -> Result<()> {
        let kind = term.kind();
        if kind.is_abstract() {
            return Err(Error::shape(format!(
                "abstract kind {} is not directly constructible",
                kind.name()
            ))
            .at(term.span()));
        }
        let params = kind.params();
        if term.args().len() != params.len() {
            return Err(Error::shape(format!(
                "{} takes {} argument{} (found {})",
                kind.name(),
                params.len(),
                if params.len() == 1 { "" } else { "s" },
                term.args().len()
            ))
            .at(term.span()));
        }
        for (index, (expected, arg)) in params.iter().zip(term.args()).enumerate() {
            self.check_arg(kind, index, expected, arg)
                .map_err(|e| e.at(term.span()))?;
        }
        Ok(())
    }

    /// Construct an instance and validate it, failing with a shape error
    /// instead of producing an ill-formed term.
    pub fn build(&self, kind: &Kind, args: Vec<Arg>) -> Result<TermRef> {
        let term = kind.apply(args);
        self.validate(&term)?;
        Ok(term.into_ref())
    }

    fn check_arg(&self, owner: &Kind, index: usize, expected: &ArgType, arg: &Arg) -> Result<()> {
        if let ArgType::Repeated { element, min, max } = expected {
            let Some(items) = arg.as_seq() else {
                return Err(self.mismatch(owner, index, expected, arg));
            };
            let too_long = max.is_some_and(|max| items.len() > max);
            if items.len() < *min || too_long {
                return Err(Error::shape(format!(
                    "argument {index} of {} must be {} (found {} element{})",
                    owner.name(),
                    self.describe(expected),
                    items.len(),
                    if items.len() == 1 { "" } else { "s" }
                )));
            }
            return match items.iter().find(|item| !conforms(element, item)) {
                Some(item) => Err(self.mismatch(owner, index, expected, item)),
                None => Ok(()),
            };
        }
        if conforms(expected, arg) {
            Ok(())
        } else {
            Err(self.mismatch(owner, index, expected, arg))
        }
    }

    fn mismatch(&self, owner: &Kind, index: usize, expected: &ArgType, found: &Arg) -> Error {
        Error::shape(format!(
            "argument {index} of {} must be of type {} (found {})",
            owner.name(),
            self.describe(expected),
            found.describe()
        ))
    }
}

/// Whether a runtime argument satisfies a declared type, one level deep.
pub(crate) fn conforms(expected: &ArgType, arg: &Arg) -> bool {
    match expected {
        ArgType::Any => true,
        ArgType::Prim(prim) => arg.prim() == Some(*prim),
        ArgType::Kind(id) => arg.as_term().is_some_and(|t| t.is_a(*id)),
        ArgType::OneOf(types) => types.iter().any(|t| conforms(t, arg)),
        ArgType::Repeated { element, min, max } => arg.as_seq().is_some_and(|items| {
            items.len() >= *min
                && max.map_or(true, |max| items.len() <= max)
                && items.iter().all(|item| conforms(element, item))
        }),
    }
}

fn push_nested<'a>(args: &'a [Arg], out: &mut Vec<&'a Term>) {
    for arg in args {
        match arg {
            Arg::Term(t) => out.push(t),
            Arg::Seq(items) => push_nested(items, out),
            _ => {}
        }
    }
}

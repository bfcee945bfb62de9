//! Runtime errors raised by the Arbor evaluator.
//!
//! All of them are [`arbor_terms::Error`] values; the helpers here fix the
//! kind and wording and locate the error at the originating term.

use crate::value::Value;
use arbor_terms::{Error, ErrorKind, Term};
use std::time::Duration;

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, Error>;

pub(crate) fn unbound(name: &str, at: &Term) -> Error {
    Error::new(
        ErrorKind::UnboundIdentifier,
        format!("variable \"{name}\" is not defined"),
    )
    .at(at.span())
}

pub(crate) fn unset(name: &str, at: &Term) -> Error {
    Error::new(
        ErrorKind::UnboundIdentifier,
        format!("variable \"{name}\" is declared but has no value"),
    )
    .at(at.span())
}

pub(crate) fn type_conversion(value: &Value, target: &str, at: &Term) -> Error {
    Error::new(
        ErrorKind::TypeConversion,
        format!("cannot convert {} to a {target} value", value.type_name()),
    )
    .at(at.span())
}

pub(crate) fn unlike_comparison(lhs: &Value, rhs: &Value, at: &Term) -> Error {
    Error::new(
        ErrorKind::UnlikeComparison,
        format!(
            "comparison of unlike types {} and {}",
            lhs.type_name(),
            rhs.type_name()
        ),
    )
    .at(at.span())
}

pub(crate) fn domain(message: impl Into<String>, at: &Term) -> Error {
    Error::new(ErrorKind::Domain, message).at(at.span())
}

pub(crate) fn duplicate_argument(name: &str, at: &Term) -> Error {
    Error::new(
        ErrorKind::DuplicateArgument,
        format!("illegal duplicate argument name \"{name}\""),
    )
    .at(at.span())
}

pub(crate) fn arity(expected: usize, found: usize, at: &Term) -> Error {
    Error::new(
        ErrorKind::Arity,
        format!(
            "function expected {expected} argument{} but was passed {found}",
            if expected == 1 { "" } else { "s" }
        ),
    )
    .at(at.span())
}

pub(crate) fn dangling(index: usize) -> Error {
    Error::new(
        ErrorKind::DanglingReference,
        format!("Reference {index} does not exist in store"),
    )
}

pub(crate) fn timed_out(limit: Duration) -> Error {
    Error::new(
        ErrorKind::Timeout,
        format!("execution timed out after {} ms", limit.as_millis()),
    )
}

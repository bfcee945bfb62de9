//! Arbor evaluator.
//!
//! Runs programs of a small expression language (arithmetic, booleans,
//! first-class closures, recursion, mutable references) built as terms of
//! the [`arbor_terms`] engine. Semantics are a table of pattern-matching
//! rules driven by a stepped machine, so arbitrarily deep recursion in the
//! interpreted program never grows the host stack.

mod env;
mod error;
mod evaluator;
mod grammar;
mod interpreter;
mod store;
mod value;

pub use env::{Scope, ScopeChain};
pub use error::EvalResult;
pub use evaluator::Progress;
pub use grammar::Grammar;
pub use interpreter::{
    evaluate, step_through, Interpreter, RunConfig, Snapshot, Stepper, DEFAULT_TIME_LIMIT,
};
pub use store::Store;
pub use value::{Closure, Value};

pub use arbor_terms::{Error, ErrorKind, Result, SourceFile, Span};

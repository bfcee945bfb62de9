//! Term engine for Arbor.
//!
//! Declares tagged, inheritance-aware term kinds, validates term instances
//! against their declared shapes, and dispatches terms through ordered,
//! guarded pattern-matching rule tables. The Arbor evaluator assembles every
//! piece of language semantics from these parts.

mod error;
mod matcher;
mod pattern;
mod registry;
mod span;
mod term;
mod validate;

pub use error::{Error, ErrorKind};
pub use matcher::{Guard, Handler, Matcher, Rule};
pub use pattern::{Bindings, Bound, Pattern};
pub use registry::{ArgType, Kind, KindId, Prim, Registry, RegistryBuilder};
pub use span::{SourceFile, Span};
pub use term::{Arg, Term, TermRef};

/// Result type used throughout Arbor.
pub type Result<T> = std::result::Result<T, Error>;

//! Scope chain: the Arbor evaluator's variable environment.

use crate::value::Value;
use arbor_terms::{Error, ErrorKind};
use std::collections::BTreeMap;

/// A single scope level. `None` marks an identifier declared but not set.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    bindings: BTreeMap<String, Option<Value>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl FromIterator<(String, Value)> for Scope {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            bindings: iter.into_iter().map(|(k, v)| (k, Some(v))).collect(),
        }
    }
}

/// Stack of scopes with push/pop semantics.
///
/// Lookups search innermost to outermost. In a *frozen* chain every `set`
/// writes the innermost scope, so popping it leaves the chain as it was. In
/// an unfrozen chain `set` writes the innermost scope that already binds the
/// identifier, or the innermost scope when none does. A *strict* chain
/// refuses to get or set identifiers that were never declared.
#[derive(Debug, Clone)]
pub struct ScopeChain {
    scopes: Vec<Scope>,
    frozen: bool,
    strict: bool,
}

impl ScopeChain {
    /// One empty global scope, unfrozen and lenient.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new()],
            frozen: false,
            strict: false,
        }
    }

    pub fn frozen(mut self, frozen: bool) -> Self {
        self.frozen = frozen;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Outermost first.
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn push(&mut self) {
        self.scopes.push(Scope::new());
    }

    /// Push a scope pre-filled with bindings.
    pub fn push_scope(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    /// Pop the innermost scope. The global scope is never popped.
    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|s| s.bindings.contains_key(name))
    }

    /// Look up an identifier, innermost scope first.
    ///
    /// `Ok(None)` means unbound (lenient chains only) or declared but unset.
    pub fn get(&self, name: &str) -> Result<Option<&Value>, Error> {
        for scope in self.scopes.iter().rev() {
            if let Some(slot) = scope.bindings.get(name) {
                return Ok(slot.as_ref());
            }
        }
        if self.strict {
            return Err(Error::new(
                ErrorKind::UnboundIdentifier,
                format!("cannot get {name}; it has not been declared in this scope"),
            ));
        }
        Ok(None)
    }

    pub fn set(&mut self, name: &str, value: Value) -> Result<(), Error> {
        if !self.frozen {
            if let Some(owner) = self
                .scopes
                .iter_mut()
                .rev()
                .find(|s| s.bindings.contains_key(name))
            {
                owner.bindings.insert(name.to_string(), Some(value));
                return Ok(());
            }
        }
        if self.strict && !self.has(name) {
            return Err(Error::new(
                ErrorKind::UnboundIdentifier,
                format!("cannot set {name}={value}; it has not been declared in this scope"),
            ));
        }
        self.innermost().bindings.insert(name.to_string(), Some(value));
        Ok(())
    }

    /// Bind `name` to "unset" in the innermost scope.
    pub fn declare(&mut self, name: &str) {
        self.innermost().bindings.insert(name.to_string(), None);
    }

    /// An independent deep copy of every scope, in the same order, with the
    /// given frozen flag.
    pub fn snapshot(&self, frozen: bool) -> ScopeChain {
        ScopeChain {
            scopes: self.scopes.clone(),
            frozen,
            strict: self.strict,
        }
    }

    /// Empty the chain, moving every bound value into `out`.
    pub(crate) fn drain_values(&mut self, out: &mut Vec<Value>) {
        for scope in self.scopes.drain(..) {
            out.extend(scope.bindings.into_values().flatten());
        }
    }

    fn innermost(&mut self) -> &mut Scope {
        if self.scopes.is_empty() {
            self.scopes.push(Scope::new());
        }
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }
}

impl Default for ScopeChain {
    fn default() -> Self {
        Self::new()
    }
}

//! Runtime values of the Arbor language.

use crate::env::ScopeChain;
use crate::error::{type_conversion, unlike_comparison, EvalResult};
use arbor_terms::{Term, TermRef};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A function value: parameter names, body and the scope it closed over.
pub struct Closure {
    pub params: Vec<String>,
    pub body: TermRef,
    pub captured: Rc<RefCell<ScopeChain>>,
}

// A recursive closure's captured chain contains the closure itself, so the
// chain is left out.
impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("params", &self.params)
            .field("body", &self.body.to_string())
            .finish_non_exhaustive()
    }
}

// A closure made inside a call holds the closures of that call's scope in
// its captured chain, so nesting can run as deep as the program recursed.
// Chains owned by the dying closure alone are unlinked onto a worklist.
impl Drop for Closure {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        release(&mut self.captured, &mut pending);
        while let Some(value) = pending.pop() {
            if let Value::Closure(closure) = value {
                if let Some(mut closure) = Rc::into_inner(closure) {
                    release(&mut closure.captured, &mut pending);
                }
            }
        }
    }
}

fn release(chain: &mut Rc<RefCell<ScopeChain>>, out: &mut Vec<Value>) {
    if let Some(chain) = Rc::get_mut(chain) {
        chain.get_mut().drain_values(out);
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Num(f64),
    Bool(bool),
    Closure(Rc<Closure>),
    /// Index into the run's reference store.
    Ref(usize),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Num(_) => "NumValue",
            Self::Bool(_) => "BoolValue",
            Self::Closure(_) => "Closure",
            Self::Ref(_) => "Reference",
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

    // ── Conversions ───────────────────────────────────────────────────────
    //
    // `origin` is the term whose value is being converted; errors point at it.

    pub fn to_num(&self, origin: &Term) -> EvalResult<f64> {
        self.as_num()
            .ok_or_else(|| type_conversion(self, "number", origin))
    }

    pub fn to_bool(&self, origin: &Term) -> EvalResult<bool> {
        self.as_bool()
            .ok_or_else(|| type_conversion(self, "boolean", origin))
    }

    pub fn to_closure(&self, origin: &Term) -> EvalResult<Rc<Closure>> {
        match self {
            Self::Closure(c) => Ok(Rc::clone(c)),
            _ => Err(type_conversion(self, "closure", origin)),
        }
    }

    pub fn to_reference(&self, origin: &Term) -> EvalResult<usize> {
        match self {
            Self::Ref(index) => Ok(*index),
            _ => Err(type_conversion(self, "reference", origin)),
        }
    }

    /// Language-level equality. Closures compare by identity, references by
    /// address; values of different variants are not comparable.
    pub fn equals(&self, other: &Value, origin: &Term) -> EvalResult<bool> {
        match (self, other) {
            (Self::Num(a), Self::Num(b)) => Ok(a == b),
            (Self::Bool(a), Self::Bool(b)) => Ok(a == b),
            (Self::Closure(a), Self::Closure(b)) => Ok(Rc::ptr_eq(a, b)),
            (Self::Ref(a), Self::Ref(b)) => Ok(a == b),
            _ => Err(unlike_comparison(self, other, origin)),
        }
    }
}

/// Same rules as [`Value::equals`], with unlike variants simply unequal.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Num(a), Self::Num(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Closure(a), Self::Closure(b)) => Rc::ptr_eq(a, b),
            (Self::Ref(a), Self::Ref(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "NumValue({n})"),
            Self::Bool(b) => write!(f, "BoolValue({b})"),
            Self::Closure(c) => write!(f, "Closure([{}], {})", c.params.join(", "), c.body),
            Self::Ref(index) => write!(f, "Reference({index})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;
    use arbor_terms::{ErrorKind, Span};

    fn closure(g: &Grammar) -> Value {
        Value::Closure(Rc::new(Closure {
            params: vec!["x".into(), "y".into()],
            body: g.plus(g.ident("x"), g.ident("y")),
            captured: Rc::new(RefCell::new(ScopeChain::new())),
        }))
    }

    #[test]
    fn test_canonical_rendering() {
        let g = Grammar::shared().unwrap();
        assert_eq!(Value::Num(25.0).to_string(), "NumValue(25)");
        assert_eq!(Value::Num(0.5).to_string(), "NumValue(0.5)");
        assert_eq!(Value::Bool(false).to_string(), "BoolValue(false)");
        assert_eq!(Value::Ref(3).to_string(), "Reference(3)");
        assert_eq!(
            closure(g).to_string(),
            "Closure([x, y], Plus(Ident(x), Ident(y)))"
        );
    }

    #[test]
    fn test_conversion_errors_point_at_origin() {
        let g = Grammar::shared().unwrap();
        let origin = g
            .const_bool
            .apply(vec![true.into()])
            .with_span(Span::new(2, 5, 2, 9));
        let err = Value::Bool(true).to_num(&origin).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeConversion);
        assert_eq!(err.span, Some(Span::new(2, 5, 2, 9)));
        assert!(err.message.contains("number"));

        assert!(Value::Num(1.0).to_bool(&origin).is_err());
        assert!(Value::Num(1.0).to_closure(&origin).is_err());
        assert_eq!(
            Value::Num(1.0).to_reference(&origin).unwrap_err().kind,
            ErrorKind::TypeConversion
        );
        assert_eq!(Value::Ref(4).to_reference(&origin).unwrap(), 4);
    }

    #[test]
    fn test_nested_closures_drop_without_recursion() {
        let g = Grammar::shared().unwrap();
        let mut outer = closure(g);
        let mut kept = None;
        for i in 0..200_000 {
            let mut chain = ScopeChain::new();
            chain.set("f", outer).unwrap();
            let next = Rc::new(Closure {
                params: vec!["x".into()],
                body: g.ident("x"),
                captured: Rc::new(RefCell::new(chain)),
            });
            if i == 10 {
                kept = Some(Rc::clone(&next));
            }
            outer = Value::Closure(next);
        }
        drop(outer);

        // A closure still referenced elsewhere keeps its captured chain.
        let kept = kept.unwrap();
        let captured = kept.captured.borrow();
        assert!(matches!(captured.get("f").unwrap(), Some(Value::Closure(_))));
    }

    #[test]
    fn test_equality_by_variant() {
        let g = Grammar::shared().unwrap();
        let origin = g.eq(g.num(1.0), g.num(1.0));
        assert!(Value::Num(2.0).equals(&Value::Num(2.0), &origin).unwrap());
        assert!(!Value::Ref(0).equals(&Value::Ref(1), &origin).unwrap());

        let f = closure(g);
        let same_shape = closure(g);
        assert!(f.equals(&f.clone(), &origin).unwrap());
        assert!(!f.equals(&same_shape, &origin).unwrap());

        let err = Value::Num(1.0).equals(&Value::Bool(true), &origin).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnlikeComparison);
    }
}

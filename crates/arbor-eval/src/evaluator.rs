//! Stepped evaluator.
//!
//! Evaluation is a small-step machine. The machine's control is either a
//! term to evaluate in an environment or a value to return; what to do with
//! a returned value is recorded as a [`Frame`] on an explicit continuation
//! stack. One [`Machine::step`] runs the semantic action of one term (looked
//! up in a rule table built from the grammar), then feeds any resulting
//! values to pending frames until the next term is due. Host stack use is
//! therefore constant no matter how deeply the interpreted program recurses.

use crate::env::{Scope, ScopeChain};
use crate::error::{self, EvalResult};
use crate::grammar::Grammar;
use crate::store::Store;
use crate::value::{Closure, Value};
use arbor_terms::{Arg, Bindings, Bound, Error, Matcher, Pattern, Prim, Term, TermRef};
use log::{debug, trace};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared, mutable scope chain. Frames and closures hold onto the chain they
/// were created in.
pub(crate) type Env = Rc<RefCell<ScopeChain>>;

/// The semantic rule table.
pub(crate) type Rules = Matcher<Registers, Control>;

/// Outcome of one evaluation step.
#[derive(Debug, Clone)]
pub enum Progress {
    /// More work remains; this term is evaluated next.
    Thunk(TermRef),
    /// The program finished with this value.
    Done(Value),
}

#[derive(Debug, Clone)]
pub(crate) enum Control {
    Eval { term: TermRef, env: Env },
    Return(Value),
}

#[derive(Debug, Clone, Copy)]
enum Arith {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy)]
enum Unary {
    Log,
    Exp,
    Sin,
    Cos,
}

#[derive(Debug, Clone, Copy)]
enum Compare {
    Gt,
    Geq,
    Lt,
    Leq,
}

#[derive(Debug, Clone, Copy)]
enum Logic {
    And,
    Or,
}

/// What to do once every operand of a term has a value.
#[derive(Debug, Clone)]
enum Then {
    Arith(Arith),
    Unary(Unary),
    Compare(Compare),
    Equal { negate: bool },
    Logic(Logic),
    Not,
    /// Blocks yield their last value.
    Last,
    Apply(Rc<Closure>),
    NewRef,
    DeRef,
}

/// A pending continuation.
#[derive(Debug)]
enum Frame {
    /// Operands evaluated left to right; `values` holds those done so far.
    Collect {
        term: TermRef,
        operands: Vec<TermRef>,
        values: Vec<Value>,
        env: Env,
        then: Then,
    },
    Branch {
        cond: TermRef,
        consequent: TermRef,
        alternative: TermRef,
        env: Env,
    },
    /// `let`: bind the value in a fresh scope, then run the body.
    Bind { name: String, body: TermRef, env: Env },
    PopScope { env: Env },
    Callee {
        callee: TermRef,
        args: Vec<TermRef>,
        env: Env,
    },
    AssignTarget { target: TermRef, value: TermRef, env: Env },
    Assign { index: usize },
}

/// The mutable state every semantic rule sees.
#[derive(Debug)]
pub(crate) struct Registers {
    env: Env,
    store: Store,
    stack: Vec<Frame>,
}

// ══════════════════════════════════════════════════════════════════════════
// Semantic rules
// ══════════════════════════════════════════════════════════════════════════

fn subject(b: &Bindings) -> EvalResult<TermRef> {
    b.term()
        .cloned()
        .ok_or_else(|| Error::no_match(format!("semantic rule applied to {}", b.subject())))
}

fn terms(items: &[Arg]) -> EvalResult<Vec<TermRef>> {
    items
        .iter()
        .map(|item| {
            item.as_term().cloned().ok_or_else(|| {
                Error::no_match(format!("destructuring failed: expected a term, found {item}"))
            })
        })
        .collect()
}

/// Name carried by a destructured `Ident(Str)`.
fn ident_name(bound: &Bound) -> EvalResult<String> {
    match bound.parts()? {
        [name] => Ok(name.str()?.to_string()),
        other => Err(Error::no_match(format!(
            "destructuring failed: expected an identifier, found {} parts",
            other.len()
        ))),
    }
}

/// Evaluate every argument of the term, then finish with `then`.
fn operands_then(then: Then) -> impl Fn(&Rules, Bindings, &mut Registers) -> EvalResult<Control> {
    move |_, b, regs| {
        let term = subject(&b)?;
        let operands = (0..b.len())
            .map(|i| b.term_at(i).cloned())
            .collect::<EvalResult<Vec<_>>>()?;
        regs.collect(term, operands, then.clone())
    }
}

fn lookup(_: &Rules, b: Bindings, regs: &mut Registers) -> EvalResult<Control> {
    let term = subject(&b)?;
    let name = b.str(0)?;
    let env = regs.env.borrow();
    if !env.has(name) {
        return Err(error::unbound(name, &term));
    }
    let value = env.get(name)?.cloned();
    value
        .map(Control::Return)
        .ok_or_else(|| error::unset(name, &term))
}

fn block(_: &Rules, b: Bindings, regs: &mut Registers) -> EvalResult<Control> {
    let term = subject(&b)?;
    let exprs = terms(b.seq(0)?)?;
    regs.collect(term, exprs, Then::Last)
}

fn if_then_else(_: &Rules, b: Bindings, regs: &mut Registers) -> EvalResult<Control> {
    let cond = Arc::clone(b.term_at(0)?);
    let env = Rc::clone(&regs.env);
    regs.stack.push(Frame::Branch {
        cond: Arc::clone(&cond),
        consequent: Arc::clone(b.term_at(1)?),
        alternative: Arc::clone(b.term_at(2)?),
        env: Rc::clone(&env),
    });
    Ok(Control::Eval { term: cond, env })
}

fn bind(_: &Rules, b: Bindings, regs: &mut Registers) -> EvalResult<Control> {
    let name = ident_name(b.part(0)?)?;
    let env = Rc::clone(&regs.env);
    regs.stack.push(Frame::Bind {
        name,
        body: Arc::clone(b.term_at(2)?),
        env: Rc::clone(&env),
    });
    Ok(Control::Eval {
        term: Arc::clone(b.term_at(1)?),
        env,
    })
}

/// `letrec`, and `let` of a function literal: the closure's own snapshot
/// binds its name, so the body can call itself.
fn bind_recursive(_: &Rules, b: Bindings, regs: &mut Registers) -> EvalResult<Control> {
    let name = ident_name(b.part(0)?)?;
    let (params, body) = fun_parts(b.nested(1)?)?;
    let closure = close_over(params, body, &regs.env)?;
    closure
        .captured
        .borrow_mut()
        .set(&name, Value::Closure(Rc::clone(&closure)))?;

    let env = Rc::clone(&regs.env);
    {
        let mut scope = env.borrow_mut();
        scope.push();
        scope.set(&name, Value::Closure(closure))?;
    }
    regs.stack.push(Frame::PopScope {
        env: Rc::clone(&env),
    });
    Ok(Control::Eval {
        term: Arc::clone(b.term_at(2)?),
        env,
    })
}

fn fun_def(_: &Rules, b: Bindings, regs: &mut Registers) -> EvalResult<Control> {
    let (params, body) = fun_parts(b.parts())?;
    let closure = close_over(params, body, &regs.env)?;
    Ok(Control::Return(Value::Closure(closure)))
}

fn fun_parts(parts: &[Bound]) -> EvalResult<(&[Bound], &TermRef)> {
    match parts {
        [params, body] => Ok((params.parts()?, body.term()?)),
        _ => Err(Error::no_match(
            "destructuring failed: expected function parameters and body",
        )),
    }
}

/// Check parameter names and capture a frozen snapshot of `env`.
fn close_over(params: &[Bound], body: &TermRef, env: &Env) -> EvalResult<Rc<Closure>> {
    let mut names: Vec<String> = Vec::with_capacity(params.len());
    for param in params {
        let ident = param.term()?;
        let name = ident.arg(0).and_then(Arg::as_str).ok_or_else(|| {
            Error::no_match(format!("destructuring failed: {ident} is not an identifier"))
        })?;
        if names.iter().any(|n| n == name) {
            return Err(error::duplicate_argument(name, ident));
        }
        names.push(name.to_string());
    }
    Ok(Rc::new(Closure {
        params: names,
        body: Arc::clone(body),
        captured: Rc::new(RefCell::new(env.borrow().snapshot(true))),
    }))
}

fn call(_: &Rules, b: Bindings, regs: &mut Registers) -> EvalResult<Control> {
    let callee = Arc::clone(b.term_at(0)?);
    let args = terms(b.seq(1)?)?;
    let env = Rc::clone(&regs.env);
    regs.stack.push(Frame::Callee {
        callee: Arc::clone(&callee),
        args,
        env: Rc::clone(&env),
    });
    Ok(Control::Eval { term: callee, env })
}

fn assign_ref(_: &Rules, b: Bindings, regs: &mut Registers) -> EvalResult<Control> {
    let target = Arc::clone(b.term_at(0)?);
    let env = Rc::clone(&regs.env);
    regs.stack.push(Frame::AssignTarget {
        target: Arc::clone(&target),
        value: Arc::clone(b.term_at(1)?),
        env: Rc::clone(&env),
    });
    Ok(Control::Eval { term: target, env })
}

/// Build the rule table for the grammar. Order matters where patterns
/// overlap: a `let` of a function literal must be tried before plain `let`.
/// Programs are validated whole before they run, so dispatch skips the
/// per-term shape check.
pub(crate) fn rules(g: &Grammar) -> Rules {
    let ident = || g.ident.with(vec![Prim::Str.into()]);
    let fun_def_pattern = || g.fun_def.with(vec![Pattern::repeated(&g.ident), Pattern::Any]);

    Matcher::<Registers, Control>::new(Arc::clone(&g.registry))
        .prevalidated()
        .rule(&g.const_num, |_, b, _| Ok(Control::Return(Value::Num(b.num(0)?))))
        .rule(&g.const_bool, |_, b, _| {
            Ok(Control::Return(Value::Bool(b.boolean(0)?)))
        })
        .rule(&g.ident, lookup)
        .rule(&g.plus, operands_then(Then::Arith(Arith::Add)))
        .rule(&g.minus, operands_then(Then::Arith(Arith::Sub)))
        .rule(&g.mult, operands_then(Then::Arith(Arith::Mul)))
        .rule(&g.div, operands_then(Then::Arith(Arith::Div)))
        .rule(&g.log, operands_then(Then::Unary(Unary::Log)))
        .rule(&g.exp, operands_then(Then::Unary(Unary::Exp)))
        .rule(&g.sine, operands_then(Then::Unary(Unary::Sin)))
        .rule(&g.cosine, operands_then(Then::Unary(Unary::Cos)))
        .rule(&g.eq, operands_then(Then::Equal { negate: false }))
        .rule(&g.neq, operands_then(Then::Equal { negate: true }))
        .rule(&g.gt, operands_then(Then::Compare(Compare::Gt)))
        .rule(&g.geq, operands_then(Then::Compare(Compare::Geq)))
        .rule(&g.lt, operands_then(Then::Compare(Compare::Lt)))
        .rule(&g.leq, operands_then(Then::Compare(Compare::Leq)))
        .rule(&g.and, operands_then(Then::Logic(Logic::And)))
        .rule(&g.or, operands_then(Then::Logic(Logic::Or)))
        .rule(&g.not, operands_then(Then::Not))
        .rule(&g.if_then_else, if_then_else)
        .rule(&g.block, block)
        .rule(
            g.let_rec.with(vec![ident(), fun_def_pattern(), Pattern::Any]),
            bind_recursive,
        )
        .rule(
            g.let_.with(vec![ident(), fun_def_pattern(), Pattern::Any]),
            bind_recursive,
        )
        .rule(g.let_.with(vec![ident(), Pattern::Any, Pattern::Any]), bind)
        .rule(fun_def_pattern(), fun_def)
        .rule(&g.fun_call, call)
        .rule(&g.new_ref, operands_then(Then::NewRef))
        .rule(&g.de_ref, operands_then(Then::DeRef))
        .rule(&g.assign_ref, assign_ref)
}

// ══════════════════════════════════════════════════════════════════════════
// Continuations
// ══════════════════════════════════════════════════════════════════════════

fn exactly<T, const N: usize>(items: Vec<T>, term: &Term) -> EvalResult<[T; N]> {
    items.try_into().map_err(|items: Vec<T>| {
        Error::no_match(format!(
            "{} expected {N} operand values, got {}",
            term.name(),
            items.len()
        ))
        .at(term.span())
    })
}

fn nums(values: &[Value], origins: &[TermRef]) -> EvalResult<Vec<f64>> {
    values
        .iter()
        .zip(origins)
        .map(|(v, origin)| v.to_num(origin))
        .collect()
}

fn bools(values: &[Value], origins: &[TermRef]) -> EvalResult<Vec<bool>> {
    values
        .iter()
        .zip(origins)
        .map(|(v, origin)| v.to_bool(origin))
        .collect()
}

/// Enter a closure: a fresh scope binding the parameters, on top of a
/// frozen copy of the captured chain.
fn enter(closure: &Closure, args: Vec<Value>) -> Control {
    let mut activation = closure.captured.borrow().snapshot(true);
    activation.push_scope(closure.params.iter().cloned().zip(args).collect::<Scope>());
    Control::Eval {
        term: Arc::clone(&closure.body),
        env: Rc::new(RefCell::new(activation)),
    }
}

impl Registers {
    fn new() -> Self {
        Self {
            env: Rc::new(RefCell::new(ScopeChain::new().frozen(true))),
            store: Store::new(),
            stack: Vec::new(),
        }
    }

    /// Start evaluating `operands` left to right in the current scope.
    fn collect(&mut self, term: TermRef, operands: Vec<TermRef>, then: Then) -> EvalResult<Control> {
        let Some(first) = operands.first().cloned() else {
            return self.finish(&term, &operands, Vec::new(), then);
        };
        let env = Rc::clone(&self.env);
        self.stack.push(Frame::Collect {
            term,
            values: Vec::with_capacity(operands.len()),
            operands,
            env: Rc::clone(&env),
            then,
        });
        Ok(Control::Eval { term: first, env })
    }

    fn resume(&mut self, frame: Frame, value: Value) -> EvalResult<Control> {
        match frame {
            Frame::Collect {
                term,
                operands,
                mut values,
                env,
                then,
            } => {
                values.push(value);
                if let Some(next) = operands.get(values.len()).cloned() {
                    self.stack.push(Frame::Collect {
                        term,
                        operands,
                        values,
                        env: Rc::clone(&env),
                        then,
                    });
                    return Ok(Control::Eval { term: next, env });
                }
                self.finish(&term, &operands, values, then)
            }
            Frame::Branch {
                cond,
                consequent,
                alternative,
                env,
            } => {
                let branch = if value.to_bool(&cond)? {
                    consequent
                } else {
                    alternative
                };
                Ok(Control::Eval { term: branch, env })
            }
            Frame::Bind { name, body, env } => {
                {
                    let mut scope = env.borrow_mut();
                    scope.push();
                    scope.set(&name, value)?;
                }
                self.stack.push(Frame::PopScope {
                    env: Rc::clone(&env),
                });
                Ok(Control::Eval { term: body, env })
            }
            Frame::PopScope { env } => {
                env.borrow_mut().pop();
                Ok(Control::Return(value))
            }
            Frame::Callee { callee, args, env } => {
                let closure = value.to_closure(&callee)?;
                if closure.params.len() != args.len() {
                    return Err(error::arity(closure.params.len(), args.len(), &callee));
                }
                self.collect_in(callee, args, env, Then::Apply(closure))
            }
            Frame::AssignTarget { target, value: rhs, env } => {
                let index = value.to_reference(&target)?;
                self.stack.push(Frame::Assign { index });
                Ok(Control::Eval { term: rhs, env })
            }
            Frame::Assign { index } => {
                self.store.assign(index, value.clone())?;
                Ok(Control::Return(value))
            }
        }
    }

    /// Like [`Registers::collect`], in the caller's scope rather than the
    /// current one.
    fn collect_in(
        &mut self,
        term: TermRef,
        operands: Vec<TermRef>,
        env: Env,
        then: Then,
    ) -> EvalResult<Control> {
        self.env = env;
        self.collect(term, operands, then)
    }

    fn finish(
        &mut self,
        term: &TermRef,
        operands: &[TermRef],
        values: Vec<Value>,
        then: Then,
    ) -> EvalResult<Control> {
        let result = match then {
            Then::Arith(op) => {
                let [a, b] = exactly::<_, 2>(nums(&values, operands)?, term)?;
                Value::Num(match op {
                    Arith::Add => a + b,
                    Arith::Sub => a - b,
                    Arith::Mul => a * b,
                    Arith::Div => {
                        if b == 0.0 {
                            return Err(error::domain("divide by 0", term));
                        }
                        a / b
                    }
                })
            }
            Then::Unary(op) => {
                let [x] = exactly::<_, 1>(nums(&values, operands)?, term)?;
                Value::Num(match op {
                    Unary::Log => {
                        if x <= 0.0 {
                            return Err(error::domain(format!("log of number <= 0: {x}"), term));
                        }
                        x.ln()
                    }
                    Unary::Exp => x.exp(),
                    Unary::Sin => x.sin(),
                    Unary::Cos => x.cos(),
                })
            }
            Then::Compare(op) => {
                let [a, b] = exactly::<_, 2>(nums(&values, operands)?, term)?;
                Value::Bool(match op {
                    Compare::Gt => a > b,
                    Compare::Geq => a >= b,
                    Compare::Lt => a < b,
                    Compare::Leq => a <= b,
                })
            }
            Then::Equal { negate } => {
                let [a, b] = exactly::<_, 2>(values, term)?;
                Value::Bool(a.equals(&b, term)? != negate)
            }
            Then::Logic(op) => {
                let [a, b] = exactly::<_, 2>(bools(&values, operands)?, term)?;
                Value::Bool(match op {
                    Logic::And => a && b,
                    Logic::Or => a || b,
                })
            }
            Then::Not => {
                let [a] = exactly::<_, 1>(bools(&values, operands)?, term)?;
                Value::Bool(!a)
            }
            Then::Last => values
                .into_iter()
                .last()
                .ok_or_else(|| Error::no_match("empty block").at(term.span()))?,
            Then::Apply(closure) => return Ok(enter(&closure, values)),
            Then::NewRef => {
                let [init] = exactly::<_, 1>(values, term)?;
                Value::Ref(self.store.newref(init))
            }
            Then::DeRef => {
                let [reference] = exactly::<_, 1>(values, term)?;
                let origin = operands.first().unwrap_or(term);
                let index = reference.to_reference(origin)?;
                self.store.deref(index).map_err(|e| e.at(term.span()))?
            }
        };
        Ok(Control::Return(result))
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Machine
// ══════════════════════════════════════════════════════════════════════════

/// One run of one program: environment, store and continuation stack.
pub(crate) struct Machine {
    rules: Rc<Rules>,
    regs: Registers,
    control: Control,
    steps: u64,
    deadline: Option<(Instant, Duration)>,
}

impl Machine {
    /// `time_limit` of `None` disables timeout checking.
    pub(crate) fn new(rules: Rc<Rules>, body: TermRef, time_limit: Option<Duration>) -> Self {
        let regs = Registers::new();
        let control = Control::Eval {
            term: body,
            env: Rc::clone(&regs.env),
        };
        Self {
            rules,
            regs,
            control,
            steps: 0,
            deadline: time_limit.map(|limit| (Instant::now(), limit)),
        }
    }

    /// Run the pending term's semantic action and every continuation it
    /// completes. Once finished, keeps returning the final value.
    pub(crate) fn step(&mut self) -> EvalResult<Progress> {
        let (term, env) = match &self.control {
            Control::Eval { term, env } => (Arc::clone(term), Rc::clone(env)),
            Control::Return(value) => return Ok(Progress::Done(value.clone())),
        };
        if let Some((started, limit)) = self.deadline {
            if started.elapsed() > limit {
                debug!(
                    "run aborted after {} steps: time limit of {} ms exceeded",
                    self.steps,
                    limit.as_millis()
                );
                return Err(error::timed_out(limit));
            }
        }
        self.steps += 1;
        trace!("step {}: {}", self.steps, term);

        self.regs.env = env;
        let mut next = self
            .rules
            .apply_term(&term, &mut self.regs)
            .map_err(|e| e.at(term.span()))?;
        loop {
            match next {
                Control::Return(value) => match self.regs.stack.pop() {
                    Some(frame) => next = self.regs.resume(frame, value)?,
                    None => {
                        self.control = Control::Return(value.clone());
                        return Ok(Progress::Done(value));
                    }
                },
                Control::Eval { term, env } => {
                    self.control = Control::Eval {
                        term: Arc::clone(&term),
                        env,
                    };
                    return Ok(Progress::Thunk(term));
                }
            }
        }
    }

    pub(crate) fn run(&mut self) -> EvalResult<Value> {
        loop {
            if let Progress::Done(value) = self.step()? {
                return Ok(value);
            }
        }
    }

    /// The term the next step evaluates, if any.
    pub(crate) fn pending(&self) -> Option<&TermRef> {
        match &self.control {
            Control::Eval { term, .. } => Some(term),
            Control::Return(_) => None,
        }
    }

    /// The scope chain the pending term runs in (the global chain once
    /// finished).
    pub(crate) fn env(&self) -> &Env {
        match &self.control {
            Control::Eval { env, .. } => env,
            Control::Return(_) => &self.regs.env,
        }
    }

    pub(crate) fn store(&self) -> &Store {
        &self.regs.store
    }

    pub(crate) fn steps(&self) -> u64 {
        self.steps
    }

    /// Continuation frames waiting for a value.
    pub(crate) fn depth(&self) -> usize {
        self.regs.stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_terms::ErrorKind;

    fn machine(g: &Grammar, body: TermRef) -> Machine {
        Machine::new(Rc::new(rules(g)), body, None)
    }

    #[test]
    fn test_literal_finishes_in_one_step() {
        let g = Grammar::shared().unwrap();
        let mut m = machine(g, g.num(4.0));
        assert!(matches!(m.step().unwrap(), Progress::Done(Value::Num(n)) if n == 4.0));
        assert_eq!(m.steps(), 1);
        assert!(m.pending().is_none());
    }

    #[test]
    fn test_operands_step_left_to_right() {
        let g = Grammar::shared().unwrap();
        let mut m = machine(g, g.minus(g.num(10.0), g.num(4.0)));
        let Progress::Thunk(first) = m.step().unwrap() else {
            panic!("expected a thunk");
        };
        assert_eq!(first.to_string(), "ConstNum(10)");
        assert_eq!(m.depth(), 1);
        let Progress::Thunk(second) = m.step().unwrap() else {
            panic!("expected a thunk");
        };
        assert_eq!(second.to_string(), "ConstNum(4)");
        assert!(matches!(m.step().unwrap(), Progress::Done(Value::Num(n)) if n == 6.0));
        assert_eq!(m.depth(), 0);
    }

    #[test]
    fn test_tail_calls_keep_stack_flat() {
        let g = Grammar::shared().unwrap();
        // letrec loop = function(n) if n >= 500 then n else loop(n + 1) in loop(0)
        let body = g.if_then_else(
            g.geq(g.ident("n"), g.num(500.0)),
            g.ident("n"),
            g.call(g.ident("loop"), vec![g.plus(g.ident("n"), g.num(1.0))]),
        );
        let prog = g.let_rec(
            "loop",
            g.fun_def(&["n"], body),
            g.call(g.ident("loop"), vec![g.num(0.0)]),
        );
        let mut m = machine(g, prog);
        let mut deepest = 0;
        let result = loop {
            match m.step().unwrap() {
                Progress::Done(v) => break v,
                Progress::Thunk(_) => deepest = deepest.max(m.depth()),
            }
        };
        assert_eq!(result, Value::Num(500.0));
        assert!(deepest <= 4, "continuation stack grew to {deepest}");
    }

    #[test]
    fn test_let_scope_popped_after_body() {
        let g = Grammar::shared().unwrap();
        let mut m = machine(g, g.let_("x", g.num(1.0), g.ident("x")));
        assert_eq!(m.run().unwrap(), Value::Num(1.0));
        assert!(!m.env().borrow().has("x"));
    }

    #[test]
    fn test_error_located_at_failing_term() {
        let g = Grammar::shared().unwrap();
        let span = arbor_terms::Span::new(1, 5, 1, 9);
        let zero = g.const_num.apply(vec![Arg::Num(0.0)]).into_ref();
        let div = g
            .div
            .apply(vec![Arg::Term(g.num(1.0)), Arg::Term(zero)])
            .with_span(span)
            .into_ref();
        let err = machine(g, div).run().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Domain);
        assert_eq!(err.span, Some(span));
    }

    #[test]
    fn test_elapsed_budget_times_out() {
        let g = Grammar::shared().unwrap();
        let mut m = Machine::new(Rc::new(rules(g)), g.num(1.0), Some(Duration::ZERO));
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(m.step().unwrap_err().kind, ErrorKind::Timeout);
    }
}

//! The Arbor term grammar and a builder API for parsers and tests.
//!
//! Every language construct is a term kind in one shared [`Registry`].
//! `Program` and `Expr` are abstract; every other kind extends one of them.

use arbor_terms::{
    Arg, ArgType, Error, Kind, KindId, Prim, Registry, RegistryBuilder, Result, TermRef,
};
use std::sync::{Arc, OnceLock};

static GRAMMAR: OnceLock<Result<Grammar>> = OnceLock::new();

/// Handles to every kind of the language.
#[derive(Debug)]
pub struct Grammar {
    pub registry: Arc<Registry>,

    pub program: Kind,
    pub expr: Kind,
    pub top_level: Kind,

    pub const_num: Kind,
    pub const_bool: Kind,
    pub ident: Kind,

    pub plus: Kind,
    pub minus: Kind,
    pub mult: Kind,
    pub div: Kind,
    pub log: Kind,
    pub exp: Kind,
    pub sine: Kind,
    pub cosine: Kind,

    pub eq: Kind,
    pub neq: Kind,
    pub geq: Kind,
    pub gt: Kind,
    pub leq: Kind,
    pub lt: Kind,

    pub and: Kind,
    pub or: Kind,
    pub not: Kind,

    pub if_then_else: Kind,
    pub block: Kind,
    pub fun_def: Kind,
    pub fun_call: Kind,
    pub let_: Kind,
    pub let_rec: Kind,

    pub new_ref: Kind,
    pub assign_ref: Kind,
    pub de_ref: Kind,
}

fn extends(
    b: &mut RegistryBuilder,
    parent: KindId,
    name: &str,
    params: Vec<ArgType>,
) -> Result<KindId> {
    let id = b.kind(name, params);
    b.set_parent(id, parent)?;
    Ok(id)
}

impl Grammar {
    /// The process-wide grammar, declared on first use.
    pub fn shared() -> Result<&'static Grammar> {
        GRAMMAR
            .get_or_init(Grammar::declare)
            .as_ref()
            .map_err(Clone::clone)
    }

    fn declare() -> Result<Grammar> {
        let mut b = RegistryBuilder::new();
        let program = b.declare("Program");
        b.mark_abstract(program)?;
        let expr = b.declare("Expr");
        b.mark_abstract(expr)?;

        let e = || ArgType::Kind(expr);
        let top_level = extends(&mut b, program, "TopLevel", vec![e()])?;

        let const_num = extends(&mut b, expr, "ConstNum", vec![Prim::Num.into()])?;
        let const_bool = extends(&mut b, expr, "ConstBool", vec![Prim::Bool.into()])?;
        let ident = extends(&mut b, expr, "Ident", vec![Prim::Str.into()])?;

        let binary = |b: &mut RegistryBuilder, name: &str| extends(b, expr, name, vec![e(), e()]);
        let plus = binary(&mut b, "Plus")?;
        let minus = binary(&mut b, "Minus")?;
        let mult = binary(&mut b, "Mult")?;
        let div = binary(&mut b, "Div")?;
        let eq = binary(&mut b, "Eq")?;
        let neq = binary(&mut b, "Neq")?;
        let geq = binary(&mut b, "Geq")?;
        let gt = binary(&mut b, "Gt")?;
        let leq = binary(&mut b, "Leq")?;
        let lt = binary(&mut b, "Lt")?;
        let and = binary(&mut b, "And")?;
        let or = binary(&mut b, "Or")?;

        let unary = |b: &mut RegistryBuilder, name: &str| extends(b, expr, name, vec![e()]);
        let log = unary(&mut b, "Log")?;
        let exp = unary(&mut b, "Exp")?;
        let sine = unary(&mut b, "Sine")?;
        let cosine = unary(&mut b, "Cosine")?;
        let not = unary(&mut b, "Not")?;
        let new_ref = unary(&mut b, "NewRef")?;
        let de_ref = unary(&mut b, "DeRef")?;

        let if_then_else = extends(&mut b, expr, "IfThenElse", vec![e(), e(), e()])?;
        let block = extends(&mut b, expr, "Block", vec![ArgType::repeated(expr, 1, None)])?;
        let fun_def = extends(&mut b, expr, "FunDef", vec![ArgType::list(ident), e()])?;
        let fun_call = extends(&mut b, expr, "FunCall", vec![e(), ArgType::list(expr)])?;
        let let_ = extends(&mut b, expr, "Let", vec![ident.into(), e(), e()])?;
        let let_rec = extends(&mut b, expr, "LetRec", vec![ident.into(), fun_def.into(), e()])?;
        let assign_ref = extends(&mut b, expr, "AssignRef", vec![e(), e()])?;

        let registry = Arc::new(b.finish()?);
        let kind = |id: KindId| -> Result<Kind> {
            registry
                .kind(id)
                .cloned()
                .ok_or_else(|| Error::shape(format!("grammar kind #{} missing", id.index())))
        };

        Ok(Grammar {
            program: kind(program)?,
            expr: kind(expr)?,
            top_level: kind(top_level)?,
            const_num: kind(const_num)?,
            const_bool: kind(const_bool)?,
            ident: kind(ident)?,
            plus: kind(plus)?,
            minus: kind(minus)?,
            mult: kind(mult)?,
            div: kind(div)?,
            log: kind(log)?,
            exp: kind(exp)?,
            sine: kind(sine)?,
            cosine: kind(cosine)?,
            eq: kind(eq)?,
            neq: kind(neq)?,
            geq: kind(geq)?,
            gt: kind(gt)?,
            leq: kind(leq)?,
            lt: kind(lt)?,
            and: kind(and)?,
            or: kind(or)?,
            not: kind(not)?,
            if_then_else: kind(if_then_else)?,
            block: kind(block)?,
            fun_def: kind(fun_def)?,
            fun_call: kind(fun_call)?,
            let_: kind(let_)?,
            let_rec: kind(let_rec)?,
            new_ref: kind(new_ref)?,
            assign_ref: kind(assign_ref)?,
            de_ref: kind(de_ref)?,
            registry,
        })
    }

    // ══════════════════════════════════════════════════════════════════════
    // Builders
    // ══════════════════════════════════════════════════════════════════════

    fn node(&self, kind: &Kind, args: Vec<Arg>) -> TermRef {
        kind.apply(args).into_ref()
    }

    fn pair(&self, kind: &Kind, lhs: TermRef, rhs: TermRef) -> TermRef {
        self.node(kind, vec![Arg::Term(lhs), Arg::Term(rhs)])
    }

    fn one(&self, kind: &Kind, operand: TermRef) -> TermRef {
        self.node(kind, vec![Arg::Term(operand)])
    }

    /// Wrap an expression as a runnable program.
    pub fn program(&self, body: TermRef) -> TermRef {
        self.one(&self.top_level, body)
    }

    pub fn num(&self, n: f64) -> TermRef {
        self.node(&self.const_num, vec![Arg::Num(n)])
    }

    pub fn boolean(&self, b: bool) -> TermRef {
        self.node(&self.const_bool, vec![Arg::Bool(b)])
    }

    pub fn ident(&self, name: &str) -> TermRef {
        self.node(&self.ident, vec![Arg::Str(name.to_string())])
    }

    pub fn plus(&self, lhs: TermRef, rhs: TermRef) -> TermRef {
        self.pair(&self.plus, lhs, rhs)
    }

    pub fn minus(&self, lhs: TermRef, rhs: TermRef) -> TermRef {
        self.pair(&self.minus, lhs, rhs)
    }

    pub fn mult(&self, lhs: TermRef, rhs: TermRef) -> TermRef {
        self.pair(&self.mult, lhs, rhs)
    }

    pub fn div(&self, lhs: TermRef, rhs: TermRef) -> TermRef {
        self.pair(&self.div, lhs, rhs)
    }

    pub fn log(&self, operand: TermRef) -> TermRef {
        self.one(&self.log, operand)
    }

    pub fn exp(&self, operand: TermRef) -> TermRef {
        self.one(&self.exp, operand)
    }

    pub fn sin(&self, operand: TermRef) -> TermRef {
        self.one(&self.sine, operand)
    }

    pub fn cos(&self, operand: TermRef) -> TermRef {
        self.one(&self.cosine, operand)
    }

    pub fn eq(&self, lhs: TermRef, rhs: TermRef) -> TermRef {
        self.pair(&self.eq, lhs, rhs)
    }

    pub fn neq(&self, lhs: TermRef, rhs: TermRef) -> TermRef {
        self.pair(&self.neq, lhs, rhs)
    }

    pub fn geq(&self, lhs: TermRef, rhs: TermRef) -> TermRef {
        self.pair(&self.geq, lhs, rhs)
    }

    pub fn gt(&self, lhs: TermRef, rhs: TermRef) -> TermRef {
        self.pair(&self.gt, lhs, rhs)
    }

    pub fn leq(&self, lhs: TermRef, rhs: TermRef) -> TermRef {
        self.pair(&self.leq, lhs, rhs)
    }

    pub fn lt(&self, lhs: TermRef, rhs: TermRef) -> TermRef {
        self.pair(&self.lt, lhs, rhs)
    }

    pub fn and(&self, lhs: TermRef, rhs: TermRef) -> TermRef {
        self.pair(&self.and, lhs, rhs)
    }

    pub fn or(&self, lhs: TermRef, rhs: TermRef) -> TermRef {
        self.pair(&self.or, lhs, rhs)
    }

    pub fn not(&self, operand: TermRef) -> TermRef {
        self.one(&self.not, operand)
    }

    pub fn if_then_else(&self, cond: TermRef, then: TermRef, otherwise: TermRef) -> TermRef {
        self.node(
            &self.if_then_else,
            vec![Arg::Term(cond), Arg::Term(then), Arg::Term(otherwise)],
        )
    }

    pub fn block(&self, exprs: Vec<TermRef>) -> TermRef {
        self.node(
            &self.block,
            vec![Arg::Seq(exprs.into_iter().map(Arg::Term).collect())],
        )
    }

    pub fn fun_def(&self, params: &[&str], body: TermRef) -> TermRef {
        let params = params.iter().map(|p| Arg::Term(self.ident(p))).collect();
        self.node(&self.fun_def, vec![Arg::Seq(params), Arg::Term(body)])
    }

    pub fn call(&self, callee: TermRef, args: Vec<TermRef>) -> TermRef {
        self.node(
            &self.fun_call,
            vec![
                Arg::Term(callee),
                Arg::Seq(args.into_iter().map(Arg::Term).collect()),
            ],
        )
    }

    pub fn let_(&self, name: &str, bound: TermRef, body: TermRef) -> TermRef {
        self.node(
            &self.let_,
            vec![Arg::Term(self.ident(name)), Arg::Term(bound), Arg::Term(body)],
        )
    }

    pub fn let_rec(&self, name: &str, fun: TermRef, body: TermRef) -> TermRef {
        self.node(
            &self.let_rec,
            vec![Arg::Term(self.ident(name)), Arg::Term(fun), Arg::Term(body)],
        )
    }

    pub fn new_ref(&self, init: TermRef) -> TermRef {
        self.one(&self.new_ref, init)
    }

    pub fn de_ref(&self, reference: TermRef) -> TermRef {
        self.one(&self.de_ref, reference)
    }

    pub fn assign_ref(&self, reference: TermRef, value: TermRef) -> TermRef {
        self.pair(&self.assign_ref, reference, value)
    }
}

//! Integration tests for the term engine.
//!
//! Tests the registry, validator and matcher together:
//! - recursive kinds declared in two phases
//! - abstract kinds and bounded repeated arguments
//! - rule tables that recurse through nested terms (list and tree algorithms)
//! - guards, and destructuring to exactly the depth a pattern names

use arbor_terms::{
    Arg, ArgType, Bindings, Bound, Error, ErrorKind, Kind, Matcher, Pattern, Prim, Registry,
    RegistryBuilder, TermRef,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

struct Lists {
    reg: Arc<Registry>,
    list: Kind,
    nil: Kind,
    cons: Kind,
}

/// `NumList` (abstract) with `Nil` and `Cons(Num, NumList)`.
fn lists() -> Lists {
    let mut b = RegistryBuilder::new();
    let list = b.declare("NumList");
    b.mark_abstract(list).unwrap();
    let nil = b.declare("Nil");
    b.set_parent(nil, list).unwrap();
    let cons = b.declare("Cons");
    b.define(cons, vec![Prim::Num.into(), list.into()]).unwrap();
    b.set_parent(cons, list).unwrap();
    let reg = Arc::new(b.finish().unwrap());
    Lists {
        list: reg.kind(list).unwrap().clone(),
        nil: reg.kind(nil).unwrap().clone(),
        cons: reg.kind(cons).unwrap().clone(),
        reg,
    }
}

fn from_slice(l: &Lists, items: &[f64]) -> TermRef {
    let mut acc = l.nil.bare().into_ref();
    for n in items.iter().rev() {
        acc = l.cons.apply(vec![Arg::Num(*n), Arg::Term(acc)]).into_ref();
    }
    acc
}

fn to_vec(l: &Lists, mut t: &TermRef) -> Vec<f64> {
    let mut out = Vec::new();
    while t.kind() == &l.cons {
        out.push(t.arg(0).and_then(Arg::as_num).unwrap());
        t = t.arg(1).and_then(Arg::as_term).unwrap();
    }
    out
}

// ══════════════════════════════════════════════════════════════════════════════
// Validation
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_abstract_kind_never_validates() {
    let l = lists();
    for term in [l.list.bare(), l.list.apply(vec![Arg::Num(1.0)])] {
        let err = l.reg.validate(&term).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Shape);
    }
    assert!(l.reg.build(&l.list, vec![]).is_err());
}

#[test]
fn test_build_checks_recursively() {
    let l = lists();
    let ok = l.reg.build(&l.cons, vec![Arg::Num(1.0), (&l.nil).into()]).unwrap();
    assert_eq!(ok.to_string(), "Cons(1, Nil)");

    let inner = l.cons.apply(vec![Arg::Num(2.0), Arg::Str("oops".into())]);
    let err = l
        .reg
        .build(&l.cons, vec![Arg::Num(1.0), inner.into()])
        .unwrap_err();
    assert_eq!(
        err.message,
        "argument 1 of Cons must be of type NumList (found Str)"
    );
}

#[test]
fn test_list_argument_bounds() {
    let mut b = RegistryBuilder::new();
    let num = b.kind("N", vec![Prim::Num.into()]);
    let tuple = b.kind("Triple", vec![ArgType::repeated(num, 3, Some(3))]);
    let many = b.kind("AtLeastOne", vec![ArgType::repeated(num, 1, None)]);
    let reg = b.finish().unwrap();
    let (n, tuple, many) = (
        reg.kind(num).unwrap(),
        reg.kind(tuple).unwrap(),
        reg.kind(many).unwrap(),
    );
    let ns = |count: usize| -> Arg {
        (0..count)
            .map(|i| n.apply(vec![Arg::Num(i as f64)]))
            .collect::<Vec<_>>()
            .into()
    };

    assert!(reg.validate(&tuple.apply(vec![ns(3)])).is_ok());
    assert!(reg.validate(&tuple.apply(vec![ns(2)])).is_err());
    assert!(reg.validate(&tuple.apply(vec![ns(4)])).is_err());
    assert!(reg.validate(&many.apply(vec![ns(0)])).is_err());
    assert!(reg.validate(&many.apply(vec![ns(40)])).is_ok());
}

#[test]
fn test_one_of_argument_type() {
    let mut b = RegistryBuilder::new();
    let leaf = b.kind("Leaf", vec![ArgType::OneOf(vec![Prim::Num.into(), Prim::Str.into()])]);
    let reg = b.finish().unwrap();
    let leaf = reg.kind(leaf).unwrap();
    assert!(reg.validate(&leaf.apply(vec![Arg::Num(1.0)])).is_ok());
    assert!(reg.validate(&leaf.apply(vec!["a".into()])).is_ok());
    let err = reg.validate(&leaf.apply(vec![Arg::Bool(true)])).unwrap_err();
    assert_eq!(
        err.message,
        "argument 0 of Leaf must be of type Num | Str (found Bool)"
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Rule tables over lists
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_destructuring_mirrors_pattern_nesting() {
    let l = lists();
    let subject = from_slice(&l, &[1.0, 2.0]);
    let pattern = l.cons.with(vec![
        Prim::Num.into(),
        l.cons.with(vec![Prim::Num.into(), (&l.nil).into()]),
    ]);
    let seen = Matcher::<(), Vec<Bound>>::new(Arc::clone(&l.reg))
        .rule(pattern, |_, b, _| Ok(b.parts().to_vec()));
    let parts = seen.apply_term(&subject, &mut ()).unwrap();
    assert_eq!(
        parts,
        vec![
            Bound::Leaf(Arg::Num(1.0)),
            Bound::Parts(vec![
                Bound::Leaf(Arg::Num(2.0)),
                Bound::Leaf(l.nil.bare().into())
            ]),
        ]
    );
}

/// Swap every adjacent pair: [1, 2, 3, 4, 5] becomes [2, 1, 4, 3, 5].
#[test]
fn test_zig_zag_list() {
    let l = lists();
    let nil = l.nil.clone();
    let cons = l.cons.clone();
    let cons2 = l.cons.clone();
    let zig = Matcher::<(), TermRef>::new(Arc::clone(&l.reg))
        .rule(
            l.cons.with(vec![
                Prim::Num.into(),
                l.cons.with(vec![Prim::Num.into(), (&l.list).into()]),
            ]),
            move |m, b, cx| {
                let second = b.nested(1)?;
                let rest = m.apply_term(second[1].term()?, cx)?;
                let tail = cons.apply(vec![Arg::Num(b.num(0)?), Arg::Term(rest)]);
                Ok(cons.apply(vec![Arg::Num(second[0].num()?), tail.into()]).into_ref())
            },
        )
        .rule(&l.cons, move |_, b, _| {
            Ok(cons2
                .apply(vec![Arg::Num(b.num(0)?), b.arg(1)?.clone()])
                .into_ref())
        })
        .rule(&l.nil, move |_, _, _| Ok(nil.bare().into_ref()));

    let input = from_slice(&l, &[1.0, 2.0, 3.0, 4.0, 5.0]);
    let out = zig.apply_term(&input, &mut ()).unwrap();
    assert_eq!(to_vec(&l, &out), vec![2.0, 1.0, 4.0, 3.0, 5.0]);
    assert_eq!(
        out.to_string(),
        "Cons(2, Cons(1, Cons(4, Cons(3, Cons(5, Nil)))))"
    );
}

#[test]
fn test_guard_sees_context() {
    let l = lists();
    // Count the elements above a threshold carried in the context.
    let above = Matcher::<f64, usize>::new(Arc::clone(&l.reg))
        .guarded(
            &l.cons,
            |b: &Bindings, limit: &f64| b.num(0).map_or(false, |n| n > *limit),
            |m, b, cx| Ok(1 + m.apply_term(b.term_at(1)?, cx)?),
        )
        .rule(&l.cons, |m, b, cx| m.apply_term(b.term_at(1)?, cx))
        .rule(&l.nil, |_, _, _| Ok(0));

    let input = from_slice(&l, &[5.0, 1.0, 7.0, 3.0]);
    assert_eq!(above.apply_term(&input, &mut 2.0).unwrap(), 3);
    assert_eq!(above.apply_term(&input, &mut 6.0).unwrap(), 1);
}

#[test]
fn test_no_match_names_ancestor_chain() {
    let l = lists();
    let only_nil =
        Matcher::<(), ()>::new(Arc::clone(&l.reg)).rule(&l.nil, |_, _, _| Ok(()));
    let err = only_nil
        .apply_term(&from_slice(&l, &[1.0]), &mut ())
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NoMatch);
    assert!(err.message.contains("[Cons, NumList]"));
}

// ══════════════════════════════════════════════════════════════════════════════
// Binary search tree
// ══════════════════════════════════════════════════════════════════════════════

struct Trees {
    reg: Arc<Registry>,
    leaf: Kind,
    node: Kind,
}

fn trees() -> Trees {
    let mut b = RegistryBuilder::new();
    let tree = b.declare("Tree");
    b.mark_abstract(tree).unwrap();
    let leaf = b.declare("Leaf");
    b.set_parent(leaf, tree).unwrap();
    let node = b.kind("Node", vec![tree.into(), Prim::Num.into(), tree.into()]);
    b.set_parent(node, tree).unwrap();
    let reg = Arc::new(b.finish().unwrap());
    Trees {
        leaf: reg.kind(leaf).unwrap().clone(),
        node: reg.kind(node).unwrap().clone(),
        reg,
    }
}

fn insert_matcher(t: &Trees) -> Matcher<f64, TermRef, Error> {
    let (leaf, n1, n2, n3) = (t.leaf.clone(), t.node.clone(), t.node.clone(), t.node.clone());
    let node_pattern = || t.node.with(vec![Pattern::Any, Prim::Num.into(), Pattern::Any]);
    Matcher::<f64, TermRef>::new(Arc::clone(&t.reg))
        .rule(&t.leaf, move |_, _, key| {
            let empty = leaf.bare().into_ref();
            Ok(n1
                .apply(vec![Arg::Term(Arc::clone(&empty)), Arg::Num(*key), Arg::Term(empty)])
                .into_ref())
        })
        .guarded(
            node_pattern(),
            |b, key| b.num(1).map_or(false, |v| *key < v),
            move |m, b, key| {
                let left = m.apply_term(b.term_at(0)?, key)?;
                Ok(n2
                    .apply(vec![Arg::Term(left), b.arg(1)?.clone(), b.arg(2)?.clone()])
                    .into_ref())
            },
        )
        .guarded(
            node_pattern(),
            |b, key| b.num(1).map_or(false, |v| *key > v),
            move |m, b, key| {
                let right = m.apply_term(b.term_at(2)?, key)?;
                Ok(n3
                    .apply(vec![b.arg(0)?.clone(), b.arg(1)?.clone(), Arg::Term(right)])
                    .into_ref())
            },
        )
        .rule(node_pattern(), |_, b, _| {
            let node = b.term().ok_or_else(|| Error::no_match("tree node expected"))?;
            Ok(Arc::clone(node))
        })
}

fn in_order(t: &Trees, tree: &TermRef, out: &mut Vec<f64>) {
    if tree.kind() == &t.node {
        let child = |i: usize| tree.arg(i).and_then(Arg::as_term).unwrap();
        in_order(t, child(0), out);
        out.push(tree.arg(1).and_then(Arg::as_num).unwrap());
        in_order(t, child(2), out);
    }
}

#[test]
fn test_binary_search_tree_insert() {
    let t = trees();
    let insert = insert_matcher(&t);
    let mut tree = t.leaf.bare().into_ref();
    for key in [5.0, 3.0, 8.0, 1.0, 4.0, 8.0, 9.0] {
        tree = insert.apply_term(&tree, &mut { key }).unwrap();
        assert!(t.reg.validate(&tree).is_ok());
    }
    let mut keys = Vec::new();
    in_order(&t, &tree, &mut keys);
    assert_eq!(keys, vec![1.0, 3.0, 4.0, 5.0, 8.0, 9.0]);
    assert!(tree.to_string().starts_with("Node(Node(Node(Leaf, 1, Leaf), 3,"));
}

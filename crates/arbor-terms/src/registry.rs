//! Term kind declarations.
//!
//! Kinds are declared on a [`RegistryBuilder`] in two phases: `declare`
//! hands out a [`KindId`] immediately, and the argument shape may be
//! supplied later with `define`, so a kind can mention itself (or a kind
//! declared after it) in its own shape. `finish` freezes everything into a
//! [`Registry`] and resolves every ancestor chain once.

use crate::error::Error;
use crate::Result;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Index of a kind inside the registry that declared it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KindId(u32);

impl KindId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Primitive argument tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prim {
    Num,
    Bool,
    Str,
}

impl fmt::Display for Prim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num => write!(f, "Num"),
            Self::Bool => write!(f, "Bool"),
            Self::Str => write!(f, "Str"),
        }
    }
}

/// Declared type of one argument position.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgType {
    /// An instance of this kind or of any kind inheriting from it.
    Kind(KindId),
    Prim(Prim),
    /// Wildcard: anything is accepted.
    Any,
    /// Any one of the listed types.
    OneOf(Vec<ArgType>),
    /// A sequence whose members all have `element`'s type, with
    /// `min <= len <= max` (no upper bound when `max` is `None`).
    Repeated {
        element: Box<ArgType>,
        min: usize,
        max: Option<usize>,
    },
}

impl ArgType {
    /// Unbounded sequence of `element`.
    pub fn list(element: impl Into<ArgType>) -> Self {
        Self::repeated(element, 0, None)
    }

    pub fn repeated(element: impl Into<ArgType>, min: usize, max: Option<usize>) -> Self {
        Self::Repeated {
            element: Box::new(element.into()),
            min,
            max,
        }
    }

    fn kind_refs(&self, out: &mut Vec<KindId>) {
        match self {
            Self::Kind(id) => out.push(*id),
            Self::OneOf(types) => types.iter().for_each(|t| t.kind_refs(out)),
            Self::Repeated { element, .. } => element.kind_refs(out),
            Self::Prim(_) | Self::Any => {}
        }
    }
}

impl From<KindId> for ArgType {
    fn from(id: KindId) -> Self {
        Self::Kind(id)
    }
}

impl From<&Kind> for ArgType {
    fn from(kind: &Kind) -> Self {
        Self::Kind(kind.id())
    }
}

impl From<Prim> for ArgType {
    fn from(prim: Prim) -> Self {
        Self::Prim(prim)
    }
}

/// Everything known about a finished kind.
#[derive(Debug)]
pub struct KindInfo {
    id: KindId,
    name: String,
    params: Vec<ArgType>,
    is_abstract: bool,
    /// Itself first, then its parent's chain.
    ancestors: Vec<KindId>,
    ancestor_names: Vec<String>,
}

/// Shared handle to a finished kind. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Kind(Arc<KindInfo>);

impl Kind {
    pub fn id(&self) -> KindId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn params(&self) -> &[ArgType] {
        &self.0.params
    }

    pub fn is_abstract(&self) -> bool {
        self.0.is_abstract
    }

    pub fn ancestors(&self) -> &[KindId] {
        &self.0.ancestors
    }

    pub fn ancestor_names(&self) -> &[String] {
        &self.0.ancestor_names
    }

    /// Whether `other` appears in this kind's ancestor chain.
    pub fn is_a(&self, other: KindId) -> bool {
        self.0.ancestors.contains(&other)
    }
}

impl PartialEq for Kind {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Kind {}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

#[derive(Debug)]
struct Decl {
    name: String,
    params: Vec<ArgType>,
    is_abstract: bool,
    parent: Option<KindId>,
}

/// Mutable declaration phase of a [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    decls: Vec<Decl>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a kind with no arguments yet.
    pub fn declare(&mut self, name: impl Into<String>) -> KindId {
        let id = KindId(self.decls.len() as u32);
        self.decls.push(Decl {
            name: name.into(),
            params: Vec::new(),
            is_abstract: false,
            parent: None,
        });
        id
    }

    /// Declare a kind and its argument shape in one go.
    pub fn kind(&mut self, name: impl Into<String>, params: Vec<ArgType>) -> KindId {
        let id = self.declare(name);
        self.decls[id.index()].params = params;
        id
    }

    /// Supply (or replace) the argument shape of a declared kind.
    pub fn define(&mut self, id: KindId, params: Vec<ArgType>) -> Result<()> {
        self.decl_mut(id)?.params = params;
        Ok(())
    }

    pub fn mark_abstract(&mut self, id: KindId) -> Result<()> {
        self.set_abstract(id, true)
    }

    pub fn set_abstract(&mut self, id: KindId, is_abstract: bool) -> Result<()> {
        self.decl_mut(id)?.is_abstract = is_abstract;
        Ok(())
    }

    /// Record single inheritance. A kind may be given a parent only once.
    pub fn set_parent(&mut self, id: KindId, parent: KindId) -> Result<()> {
        if parent.index() >= self.decls.len() {
            return Err(Error::shape(format!("unknown parent kind #{}", parent.0)));
        }
        let parent_name = self.decls[parent.index()].name.clone();
        let decl = self.decl_mut(id)?;
        if decl.parent.is_some() {
            return Err(Error::shape(format!(
                "{} may not extend multiple kinds (asked to extend {parent_name})",
                decl.name
            )));
        }
        decl.parent = Some(parent);
        Ok(())
    }

    fn decl_mut(&mut self, id: KindId) -> Result<&mut Decl> {
        self.decls
            .get_mut(id.index())
            .ok_or_else(|| Error::shape(format!("unknown kind #{}", id.0)))
    }

    /// Freeze the declarations.
    ///
    /// Fails on duplicate names, on shapes that mention undeclared kinds,
    /// and on inheritance cycles.
    pub fn finish(self) -> Result<Registry> {
        let count = self.decls.len();
        let mut by_name = HashMap::with_capacity(count);
        for (i, decl) in self.decls.iter().enumerate() {
            if by_name.insert(decl.name.clone(), KindId(i as u32)).is_some() {
                return Err(Error::shape(format!("kind {} declared twice", decl.name)));
            }
            let mut refs = Vec::new();
            decl.params.iter().for_each(|p| p.kind_refs(&mut refs));
            if let Some(bad) = refs.iter().find(|r| r.index() >= count) {
                return Err(Error::shape(format!(
                    "{} refers to undeclared kind #{}",
                    decl.name, bad.0
                )));
            }
        }

        let mut kinds = Vec::with_capacity(count);
        for (i, decl) in self.decls.iter().enumerate() {
            let mut ancestors = vec![KindId(i as u32)];
            let mut next = decl.parent;
            while let Some(parent) = next {
                if ancestors.contains(&parent) {
                    return Err(Error::shape(format!(
                        "{} inherits from itself",
                        decl.name
                    )));
                }
                ancestors.push(parent);
                next = self.decls[parent.index()].parent;
            }
            let ancestor_names = ancestors
                .iter()
                .map(|a| self.decls[a.index()].name.clone())
                .collect();
            kinds.push(Kind(Arc::new(KindInfo {
                id: KindId(i as u32),
                name: decl.name.clone(),
                params: decl.params.clone(),
                is_abstract: decl.is_abstract,
                ancestors,
                ancestor_names,
            })));
        }

        Ok(Registry { kinds, by_name })
    }
}

/// A frozen set of kinds. Read-only once built.
#[derive(Debug)]
pub struct Registry {
    kinds: Vec<Kind>,
    by_name: HashMap<String, KindId>,
}

impl Registry {
    pub fn kind(&self, id: KindId) -> Option<&Kind> {
        self.kinds.get(id.index())
    }

    pub fn lookup(&self, name: &str) -> Option<&Kind> {
        self.by_name.get(name).and_then(|id| self.kind(*id))
    }

    pub fn kinds(&self) -> impl Iterator<Item = &Kind> {
        self.kinds.iter()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Human-readable form of a declared type, used in shape errors.
    pub fn describe(&self, ty: &ArgType) -> String {
        match ty {
            ArgType::Kind(id) => self
                .kind(*id)
                .map(|k| k.name().to_string())
                .unwrap_or_else(|| format!("#{}", id.0)),
            ArgType::Prim(prim) => prim.to_string(),
            ArgType::Any => "any".to_string(),
            ArgType::OneOf(types) => types
                .iter()
                .map(|t| self.describe(t))
                .collect::<Vec<_>>()
                .join(" | "),
            ArgType::Repeated { element, min, max } => {
                let element = self.describe(element);
                match (min, max) {
                    (0, None) => format!("[{element}]"),
                    (min, None) => format!("[{element}]{{{min}..}}"),
                    (min, Some(max)) => format!("[{element}]{{{min}..{max}}}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_ancestor_chain_starts_with_self() {
        let mut b = RegistryBuilder::new();
        let list = b.declare("NumList");
        let nil = b.declare("Nil");
        b.set_parent(nil, list).unwrap();
        let reg = b.finish().unwrap();

        let nil = reg.lookup("Nil").unwrap();
        assert_eq!(nil.ancestor_names(), ["Nil", "NumList"]);
        assert!(nil.is_a(list));
        assert!(!reg.lookup("NumList").unwrap().is_a(nil.id()));
    }

    #[test]
    fn test_second_parent_rejected() {
        let mut b = RegistryBuilder::new();
        let a = b.declare("A");
        let c = b.declare("C");
        let sub = b.declare("Sub");
        b.set_parent(sub, a).unwrap();
        let err = b.set_parent(sub, c).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Shape);
        assert!(err.message.contains("may not extend multiple kinds"));
    }

    #[test]
    fn test_chain_follows_grandparents_declared_later() {
        let mut b = RegistryBuilder::new();
        let leaf = b.declare("Leaf");
        let mid = b.declare("Mid");
        let root = b.declare("Root");
        b.set_parent(leaf, mid).unwrap();
        b.set_parent(mid, root).unwrap();
        let reg = b.finish().unwrap();
        assert_eq!(
            reg.kind(leaf).unwrap().ancestor_names(),
            ["Leaf", "Mid", "Root"]
        );
    }

    #[test]
    fn test_inheritance_cycle_rejected() {
        let mut b = RegistryBuilder::new();
        let x = b.declare("X");
        let y = b.declare("Y");
        b.set_parent(x, y).unwrap();
        b.set_parent(y, x).unwrap();
        assert_eq!(b.finish().unwrap_err().kind, ErrorKind::Shape);
    }

    #[test]
    fn test_self_referential_shape() {
        let mut b = RegistryBuilder::new();
        let nat = b.declare("Nat");
        b.define(nat, vec![ArgType::list(nat)]).unwrap();
        let reg = b.finish().unwrap();
        assert_eq!(reg.kind(nat).unwrap().params(), [ArgType::list(nat)]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut b = RegistryBuilder::new();
        b.declare("Twice");
        b.declare("Twice");
        assert!(b.finish().is_err());
    }

    #[test]
    fn test_describe() {
        let mut b = RegistryBuilder::new();
        let expr = b.declare("Expr");
        let reg = b.finish().unwrap();
        assert_eq!(reg.describe(&ArgType::list(expr)), "[Expr]");
        assert_eq!(
            reg.describe(&ArgType::repeated(expr, 1, None)),
            "[Expr]{1..}"
        );
        assert_eq!(
            reg.describe(&ArgType::repeated(Prim::Num, 2, Some(2))),
            "[Num]{2..2}"
        );
        assert_eq!(
            reg.describe(&ArgType::OneOf(vec![Prim::Num.into(), ArgType::Any])),
            "Num | any"
        );
    }
}

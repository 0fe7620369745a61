//! A cheap, copyable handle over a CFG for adapters that need value
//! semantics (container elements, graph-algorithm state) rather than a
//! borrowed reference threaded everywhere.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::cfg::Cfg;
use crate::error::{fatal, Error};
use crate::hash::signature_hash;

/// Mirrors the read side of [`Cfg`]'s surface. Default-constructible
/// (empty); any operation on an empty ref is fatal. A plain `&Cfg` is
/// already `Copy`, so this is a thin newtype that adds the "empty" state
/// and the signature-based `Eq`/`Hash`.
pub struct CfgRef<'a, L: Clone + Eq + Hash + Ord + fmt::Display> {
    cfg: Option<&'a Cfg<L>>,
}

impl<'a, L: Clone + Eq + Hash + Ord + fmt::Display> CfgRef<'a, L> {
    #[must_use]
    pub fn new(cfg: &'a Cfg<L>) -> Self {
        Self { cfg: Some(cfg) }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cfg.is_none()
    }

    fn get(&self) -> &'a Cfg<L> {
        self.cfg.unwrap_or_else(|| {
            fatal(Error::EmptyCfgRef);
        })
    }

    #[must_use]
    pub fn entry_label(&self) -> &'a L {
        self.get().entry_label()
    }

    #[must_use]
    pub fn exit_label(&self) -> Option<&'a L> {
        self.get().exit_label()
    }

    #[must_use]
    pub fn get_node(&self, label: &L) -> &'a crate::block::BasicBlock<L> {
        self.get().get_node(label)
    }

    pub fn next_nodes(&self, label: &L) -> impl Iterator<Item = &'a L> {
        self.get().next_nodes(label)
    }

    pub fn prev_nodes(&self, label: &L) -> impl Iterator<Item = &'a L> {
        self.get().prev_nodes(label)
    }

    #[must_use]
    pub fn get_vars(&self) -> Vec<crate::types::TypedVariable> {
        self.get().get_vars()
    }

    #[must_use]
    pub fn function_decl(&self) -> Option<&'a crate::cfg::FunctionDecl> {
        self.get().function_decl()
    }
}

impl<L: Clone + Eq + Hash + Ord + fmt::Display> Default for CfgRef<'_, L> {
    fn default() -> Self {
        Self { cfg: None }
    }
}

impl<L: Clone + Eq + Hash + Ord + fmt::Display> Clone for CfgRef<'_, L> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<L: Clone + Eq + Hash + Ord + fmt::Display> Copy for CfgRef<'_, L> {}

/// Equality delegates to the function declaration signature (spec §4.5):
/// two refs are equal iff both are non-empty, both carry a declaration,
/// and the declarations hash identically. Two empty refs are equal.
impl<L: Clone + Eq + Hash + Ord + fmt::Display> PartialEq for CfgRef<'_, L> {
    fn eq(&self, other: &Self) -> bool {
        match (self.cfg, other.cfg) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                matches!((signature_hash(a), signature_hash(b)), (Ok(x), Ok(y)) if x == y)
            }
            _ => false,
        }
    }
}
impl<L: Clone + Eq + Hash + Ord + fmt::Display> Eq for CfgRef<'_, L> {}

impl<L: Clone + Eq + Hash + Ord + fmt::Display> Hash for CfgRef<'_, L> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.cfg {
            None => state.write_u8(0),
            Some(cfg) => {
                state.write_u8(1);
                if let Ok(sig) = signature_hash(cfg) {
                    sig.hash(state);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Precision;
    use crate::cfg::FunctionDecl;

    #[test]
    fn default_is_empty() {
        let r: CfgRef<'_, &str> = CfgRef::default();
        assert!(r.is_empty());
    }

    #[test]
    #[should_panic(expected = "empty cfg_ref")]
    fn empty_ref_operation_is_fatal() {
        let r: CfgRef<'_, &str> = CfgRef::default();
        let _ = r.entry_label();
    }

    #[test]
    fn refs_with_same_signature_are_equal() {
        let mut a = Cfg::new("entry", Precision::Num);
        a.set_function_decl(FunctionDecl::new("f", vec![], vec![]).unwrap());
        let mut b = Cfg::new("entry", Precision::Num);
        b.set_function_decl(FunctionDecl::new("f", vec![], vec![]).unwrap());

        assert_eq!(CfgRef::new(&a), CfgRef::new(&b));
    }
}

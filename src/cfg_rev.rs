//! Reversed, read-only CFG view for backward analyzers.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use crate::block::BasicBlock;
use crate::cfg::Cfg;
use crate::error::{fatal, Error};
use crate::statement::Statement;

/// A single block as seen through the reversed view: statements in
/// reverse order (semantics unchanged), successors/predecessors swapped
/// relative to the underlying block.
#[derive(Clone)]
pub struct ReversedBlock<'a, L: Clone + Eq + Hash + Ord + fmt::Display> {
    label: L,
    inner: &'a BasicBlock<L>,
}

impl<'a, L: Clone + Eq + Hash + Ord + fmt::Display> ReversedBlock<'a, L> {
    #[must_use]
    pub fn label(&self) -> &L {
        &self.label
    }

    pub fn statements(&self) -> impl DoubleEndedIterator<Item = &'a Statement> {
        self.inner.iter().rev()
    }

    pub fn successors(&self) -> impl Iterator<Item = &'a L> {
        self.inner.predecessors().iter()
    }

    pub fn predecessors(&self) -> impl Iterator<Item = &'a L> {
        self.inner.successors().iter()
    }
}

/// Read-only, copyable-by-reference view over a [`Cfg`] with edge
/// direction and per-block statement order reversed. Built once; the
/// label→facade map is cached at construction and never recomputed per
/// query (per design notes on reversed-view caching).
#[derive(Clone)]
pub struct CfgRev<'a, L: Clone + Eq + Hash + Ord + fmt::Display> {
    cfg: &'a Cfg<L>,
    facades: HashMap<L, ReversedBlock<'a, L>>,
}

impl<'a, L: Clone + Eq + Hash + Ord + fmt::Display> CfgRev<'a, L> {
    #[must_use]
    pub fn new(cfg: &'a Cfg<L>) -> Self {
        let facades = cfg
            .labels()
            .map(|label| {
                (
                    label.clone(),
                    ReversedBlock {
                        label: label.clone(),
                        inner: cfg.get_node(label),
                    },
                )
            })
            .collect();
        Self { cfg, facades }
    }

    /// The underlying CFG's exit block. Fatal if the underlying CFG has
    /// no exit.
    #[must_use]
    pub fn entry(&self) -> &L {
        self.cfg.exit_label().unwrap_or_else(|| {
            fatal(Error::NoExitBlock);
        })
    }

    /// The underlying CFG's entry block.
    #[must_use]
    pub fn exit(&self) -> &L {
        self.cfg.entry_label()
    }

    #[must_use]
    pub fn get_node(&self, label: &L) -> &ReversedBlock<'a, L> {
        self.facades.get(label).unwrap_or_else(|| {
            fatal(Error::UnknownLabel(label.to_string()));
        })
    }

    pub fn next_nodes(&self, label: &L) -> impl Iterator<Item = &'a L> {
        self.get_node(label).successors()
    }

    pub fn prev_nodes(&self, label: &L) -> impl Iterator<Item = &'a L> {
        self.get_node(label).predecessors()
    }

    /// Labels reachable from `entry()` by following `next_nodes` — the set
    /// of original blocks that can reach the underlying CFG's exit. Used
    /// by `Cfg::remove_useless_blocks`.
    #[must_use]
    pub fn forward_reachable_from_entry(&self) -> HashSet<L> {
        let mut visited = HashSet::new();
        let mut stack = vec![self.entry().clone()];
        while let Some(label) = stack.pop() {
            if !visited.insert(label.clone()) {
                continue;
            }
            for next in self.next_nodes(&label) {
                stack.push(next.clone());
            }
        }
        visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Precision;

    /// Invariant 6: double-reverse entry identity.
    #[test]
    fn double_reverse_preserves_entry() {
        let mut cfg = Cfg::new("entry", Precision::Num);
        cfg.set_exit("exit");
        cfg.insert("exit");
        cfg.connect(&"entry", &"exit");

        let rev = CfgRev::new(&cfg);
        assert_eq!(rev.entry(), &"exit");
        assert_eq!(rev.exit(), &"entry");
    }

    #[test]
    fn reversed_adjacency_is_swapped() {
        let mut cfg = Cfg::new("entry", Precision::Num);
        cfg.set_exit("exit");
        cfg.insert("exit");
        cfg.connect(&"entry", &"exit");

        let rev = CfgRev::new(&cfg);
        assert!(rev.next_nodes(&"exit").any(|l| l == &"entry"));
        assert!(rev.prev_nodes(&"entry").any(|l| l == &"exit"));
    }
}

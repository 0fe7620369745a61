//! The owning control-flow graph: blocks, entry/exit markers, an optional
//! function declaration, and simplification.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use crate::block::{BasicBlock, Precision};
use crate::error::{fatal, Error, Result};
use crate::types::TypedVariable;

/// `(name, inputs, outputs)` attached optionally to a [`Cfg`]. Inputs and
/// outputs must be disjoint by variable index, checked at construction.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    name: String,
    inputs: Vec<TypedVariable>,
    outputs: Vec<TypedVariable>,
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>, inputs: Vec<TypedVariable>, outputs: Vec<TypedVariable>) -> Result<Self> {
        for input in &inputs {
            if outputs.iter().any(|o| o.name() == input.name()) {
                return Err(Error::OverlappingParams);
            }
        }
        Ok(Self {
            name: name.into(),
            inputs,
            outputs,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn inputs(&self) -> &[TypedVariable] {
        &self.inputs
    }

    #[must_use]
    pub fn outputs(&self) -> &[TypedVariable] {
        &self.outputs
    }

    pub fn input(&self, index: usize) -> Result<&TypedVariable> {
        self.inputs.get(index).ok_or(Error::ArgOutOfBounds {
            index,
            len: self.inputs.len(),
        })
    }

    pub fn output(&self, index: usize) -> Result<&TypedVariable> {
        self.outputs.get(index).ok_or(Error::ArgOutOfBounds {
            index,
            len: self.outputs.len(),
        })
    }
}

impl fmt::Display for FunctionDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outs = self.outputs.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        let ins = self.inputs.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        write!(f, "({outs}) declare {}({ins})", self.name)
    }
}

/// Owning control-flow graph: a label→block map, entry/exit markers, a
/// tracked-precision level propagated to every block created through it,
/// and an optional [`FunctionDecl`].
///
/// Non-copyable (owns its blocks, which own their statements). See
/// [`crate::cfg_ref::CfgRef`] for a cheap, copyable read-only handle.
pub struct Cfg<L: Clone + Eq + Hash + Ord + fmt::Display> {
    entry: L,
    exit: Option<L>,
    precision: Precision,
    decl: Option<FunctionDecl>,
    blocks: HashMap<L, BasicBlock<L>>,
}

impl<L: Clone + Eq + Hash + Ord + fmt::Display> Cfg<L> {
    /// Create a CFG with the given entry label; the entry block is created
    /// immediately.
    #[must_use]
    pub fn new(entry: L, precision: Precision) -> Self {
        let mut blocks = HashMap::new();
        blocks.insert(entry.clone(), BasicBlock::new(entry.clone(), precision));
        Self {
            entry,
            exit: None,
            precision,
            decl: None,
            blocks,
        }
    }

    #[must_use]
    pub fn entry_label(&self) -> &L {
        &self.entry
    }

    #[must_use]
    pub fn exit_label(&self) -> Option<&L> {
        self.exit.as_ref()
    }

    pub fn set_exit(&mut self, exit: L) {
        self.exit = Some(exit);
    }

    #[must_use]
    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn set_function_decl(&mut self, decl: FunctionDecl) {
        self.decl = Some(decl);
    }

    #[must_use]
    pub fn function_decl(&self) -> Option<&FunctionDecl> {
        self.decl.as_ref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &L> {
        self.blocks.keys()
    }

    /// Return the block at `label`, creating it (at the CFG's tracked
    /// precision) if absent.
    pub fn insert(&mut self, label: L) -> &mut BasicBlock<L> {
        let precision = self.precision;
        self.blocks
            .entry(label.clone())
            .or_insert_with(|| BasicBlock::new(label, precision))
    }

    /// Remove the block at `label`, disconnecting it from every neighbor.
    /// Self-loops are ignored in the disconnect step since the block's own
    /// adjacency is dropped along with it.
    pub fn remove(&mut self, label: &L) {
        let Some(removed) = self.blocks.remove(label) else {
            return;
        };
        for pred in removed.predecessors().iter() {
            if pred == label {
                continue;
            }
            if let Some(p) = self.blocks.get_mut(pred) {
                p.successors_mut().remove(label);
            }
        }
        for succ in removed.successors().iter() {
            if succ == label {
                continue;
            }
            if let Some(s) = self.blocks.get_mut(succ) {
                s.predecessors_mut().remove(label);
            }
        }
        if self.exit.as_ref() == Some(label) {
            self.exit = None;
        }
    }

    /// Fatal if `label` names no block, per §4.4.
    #[must_use]
    pub fn get_node(&self, label: &L) -> &BasicBlock<L> {
        self.blocks.get(label).unwrap_or_else(|| {
            fatal(Error::UnknownLabel(label.to_string()));
        })
    }

    pub fn get_node_mut(&mut self, label: &L) -> &mut BasicBlock<L> {
        if !self.blocks.contains_key(label) {
            fatal(Error::UnknownLabel(label.to_string()));
        }
        self.blocks.get_mut(label).expect("checked above")
    }

    pub fn next_nodes(&self, label: &L) -> impl Iterator<Item = &L> {
        self.get_node(label).successors().iter()
    }

    pub fn prev_nodes(&self, label: &L) -> impl Iterator<Item = &L> {
        self.get_node(label).predecessors().iter()
    }

    /// Add a `from -> to` edge (both blocks must already exist in this
    /// CFG). Idempotent. The block-level `connect_to`/`disconnect_from`
    /// pair needs two simultaneous `&mut` references to sibling blocks,
    /// which isn't possible while both live in the same owning map, so the
    /// CFG mutates both sides' adjacency lists directly instead.
    pub fn connect(&mut self, from: &L, to: &L) {
        if let Some(block) = self.blocks.get_mut(from) {
            block.successors_mut().insert(to.clone());
        }
        if let Some(block) = self.blocks.get_mut(to) {
            block.predecessors_mut().insert(from.clone());
        }
    }

    /// Remove a `from -> to` edge. Idempotent.
    pub fn disconnect(&mut self, from: &L, to: &L) {
        if let Some(block) = self.blocks.get_mut(from) {
            block.successors_mut().remove(to);
        }
        if let Some(block) = self.blocks.get_mut(to) {
            block.predecessors_mut().remove(from);
        }
    }

    /// Flat, deduplicated union of *every* block's live set — including
    /// blocks unreachable from entry, since `get_vars` may be called before
    /// `simplify()` prunes them (spec §4.4, testable invariant 2). Entry-
    /// reachable blocks are visited first, in DFS order, so that the common
    /// case orders variables by their first appearance in control flow;
    /// any remaining (unreachable) blocks are then folded in afterward.
    #[must_use]
    pub fn get_vars(&self) -> Vec<TypedVariable> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let dfs_order = self.dfs_order();
        for label in &dfs_order {
            if let Some(block) = self.blocks.get(label) {
                crate::block::collect_vars_into(block, &mut seen, &mut out);
            }
        }
        let visited: HashSet<&L> = dfs_order.iter().collect();
        for (label, block) in &self.blocks {
            if !visited.contains(label) {
                crate::block::collect_vars_into(block, &mut seen, &mut out);
            }
        }
        out
    }

    /// Labels in entry-first DFS order, following each block's successors
    /// in their insertion order.
    fn dfs_order(&self) -> Vec<L> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![self.entry.clone()];
        while let Some(label) = stack.pop() {
            if !visited.insert(label.clone()) {
                continue;
            }
            order.push(label.clone());
            if let Some(block) = self.blocks.get(&label) {
                let succs: Vec<L> = block.successors().iter().cloned().collect();
                for s in succs.into_iter().rev() {
                    stack.push(s);
                }
            }
        }
        order
    }

    fn forward_reachable(&self, start: &L) -> HashSet<L> {
        let mut visited = HashSet::new();
        let mut stack = vec![start.clone()];
        while let Some(label) = stack.pop() {
            if !visited.insert(label.clone()) {
                continue;
            }
            if let Some(block) = self.blocks.get(&label) {
                for s in block.successors().iter() {
                    stack.push(s.clone());
                }
            }
        }
        visited
    }

    fn single_predecessor(&self, label: &L) -> Option<L> {
        let block = self.blocks.get(label)?;
        let preds = block.predecessors();
        if preds.len() == 1 {
            preds.iter().next().cloned()
        } else {
            None
        }
    }

    fn single_successor(&self, label: &L) -> Option<L> {
        let block = self.blocks.get(label)?;
        let succs = block.successors();
        if succs.len() == 1 {
            succs.iter().next().cloned()
        } else {
            None
        }
    }

    /// Splice `cur`'s statements onto `pred` (its sole predecessor), drop
    /// `cur`, and reconnect `pred` to `succ` (`cur`'s sole successor).
    fn merge_into_predecessor(&mut self, pred: &L, cur: &L, succ: &L) {
        let Some(mut cur_block) = self.blocks.remove(cur) else {
            return;
        };
        if let Some(pred_block) = self.blocks.get_mut(pred) {
            pred_block.merge_back(&mut cur_block);
            pred_block.successors_mut().remove(cur);
            pred_block.successors_mut().insert(succ.clone());
        }
        if succ != cur {
            if let Some(succ_block) = self.blocks.get_mut(succ) {
                succ_block.predecessors_mut().remove(cur);
                succ_block.predecessors_mut().insert(pred.clone());
            }
        }
        if self.exit.as_ref() == Some(cur) {
            self.exit = Some(succ.clone());
        }
    }

    /// One DFS pass from entry: collapses every maximal chain of
    /// merge-eligible blocks (single predecessor, single successor, no
    /// `assume`/`bool_assume`/`array_load` statement) into their
    /// predecessor. `simplify` calls this repeatedly because removing
    /// unreachable/useless blocks can expose further opportunities.
    fn merge_blocks(&mut self) {
        let mut visited: HashSet<L> = HashSet::new();
        let mut stack = vec![self.entry.clone()];
        while let Some(start) = stack.pop() {
            if visited.contains(&start) {
                continue;
            }
            let mut current = start;
            loop {
                if visited.contains(&current) {
                    break;
                }
                visited.insert(current.clone());
                if current != self.entry {
                    if let (Some(pred), Some(succ)) =
                        (self.single_predecessor(&current), self.single_successor(&current))
                    {
                        let barrier_free = self
                            .blocks
                            .get(&current)
                            .is_some_and(BasicBlock::is_merge_barrier_free);
                        if barrier_free {
                            self.merge_into_predecessor(&pred, &current, &succ);
                            visited.remove(&pred);
                            current = succ;
                            continue;
                        }
                    }
                }
                if let Some(block) = self.blocks.get(&current) {
                    for s in block.successors().iter() {
                        stack.push(s.clone());
                    }
                }
                break;
            }
        }
    }

    /// Remove every block not forward-reachable from entry.
    fn remove_unreachable_blocks(&mut self) {
        let reachable = self.forward_reachable(&self.entry);
        let dead: Vec<L> = self
            .blocks
            .keys()
            .filter(|l| !reachable.contains(*l))
            .cloned()
            .collect();
        for label in dead {
            self.remove(&label);
        }
    }

    /// Remove every block that cannot reach the exit block, via the
    /// reversed view's forward traversal from its entry (the original
    /// exit). No-op (not an error) when the CFG has no exit: useless-block
    /// pruning is meaningless without one, and `simplify` must still be
    /// callable on exit-less CFGs.
    fn remove_useless_blocks(&mut self) {
        let Some(exit) = self.exit.clone() else {
            return;
        };
        let rev = crate::cfg_rev::CfgRev::new(self);
        let can_reach_exit = rev.forward_reachable_from_entry();
        drop(rev);
        let dead: Vec<L> = self
            .blocks
            .keys()
            .filter(|l| !can_reach_exit.contains(*l))
            .cloned()
            .collect();
        for label in dead {
            self.remove(&label);
        }
    }

    /// `merge_blocks -> remove_unreachable_blocks -> remove_useless_blocks
    /// -> merge_blocks` twice more: unreachable-block removal can expose
    /// further merge opportunities, so the merge pass runs again after.
    pub fn simplify(&mut self) {
        self.merge_blocks();
        self.remove_unreachable_blocks();
        self.remove_useless_blocks();
        self.merge_blocks();
        self.merge_blocks();
    }
}

impl<L: Clone + Eq + Hash + Ord + fmt::Display> Clone for Cfg<L> {
    fn clone(&self) -> Self {
        Self {
            entry: self.entry.clone(),
            exit: self.exit.clone(),
            precision: self.precision,
            decl: self.decl.clone(),
            blocks: self.blocks.clone(),
        }
    }
}

impl<L: Clone + Eq + Hash + Ord + fmt::Display> fmt::Display for Cfg<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(decl) = &self.decl {
            writeln!(f, "{decl}")?;
        }
        for label in self.dfs_order() {
            if let Some(block) = self.blocks.get(&label) {
                write!(f, "{block}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::{LinCst, LinExp, Relation};
    use crate::statement::Kind;
    use crate::types::Type;
    use crate::var::VarFactory;

    fn var(f: &VarFactory, key: &str, ty: Type) -> TypedVariable {
        TypedVariable::new(f.lookup(key), ty)
    }

    /// Scenario S1: single-block CFG, get_vars and rendering.
    #[test]
    fn single_block_cfg() {
        let f = VarFactory::new();
        let (x, y, z) = (
            var(&f, "x", Type::int(32)),
            var(&f, "y", Type::int(32)),
            var(&f, "z", Type::int(32)),
        );
        let mut cfg = Cfg::new("b0", Precision::Num);
        cfg.set_exit("b0");
        let b0 = cfg.get_node_mut(&"b0");
        b0.add(y.clone(), crate::statement::Operand::Var(x.clone()), crate::statement::Operand::Const(1))
            .unwrap();
        b0.add(z.clone(), crate::statement::Operand::Var(y.clone()), crate::statement::Operand::Const(2))
            .unwrap();
        b0.ret(vec![z.clone()]).unwrap();

        let vars = cfg.get_vars();
        let names: Vec<String> = vars.iter().map(|v| v.name().to_string()).collect();
        assert!(names.contains(&"x".to_string()));
        assert!(names.contains(&"y".to_string()));
        assert!(names.contains(&"z".to_string()));

        let rendered = cfg.to_string();
        assert!(rendered.contains("y = x+1;"));
        assert!(rendered.contains("z = y+2;"));
        assert!(rendered.contains("return z;"));

        cfg.simplify();
        assert_eq!(cfg.len(), 1);
    }

    /// Scenario S2: a linear mid block merges into entry, and entry
    /// reconnects directly to exit.
    #[test]
    fn merge_blocks_collapses_linear_chain() {
        let f = VarFactory::new();
        let a = var(&f, "a", Type::int(32));
        let t = var(&f, "t", Type::int(32));

        let mut cfg = Cfg::new("entry", Precision::Num);
        cfg.set_exit("exit");
        cfg.insert("mid");
        cfg.insert("exit");
        {
            let mid = cfg.get_node_mut(&"mid");
            mid.add(t, crate::statement::Operand::Var(a), crate::statement::Operand::Const(1))
                .unwrap();
        }
        cfg.connect(&"entry", &"mid");
        cfg.connect(&"mid", &"exit");

        cfg.simplify();
        assert_eq!(cfg.len(), 2);
        assert!(cfg.next_nodes(&"entry").any(|l| l == &"exit"));
        let entry = cfg.get_node(&"entry");
        assert!(entry.statements().iter().any(|s| s.kind() == Kind::BinOp));
    }

    /// Scenario S3: an isolated block with no incident edges disappears.
    #[test]
    fn unreachable_block_is_removed() {
        let mut cfg = Cfg::new("entry", Precision::Num);
        cfg.set_exit("exit");
        cfg.insert("exit");
        cfg.insert("dead");
        cfg.connect(&"entry", &"exit");

        cfg.simplify();
        assert!(cfg.labels().all(|l| l != &"dead"));
    }

    /// Scenario S4: a block reachable from entry but unable to reach exit
    /// disappears.
    #[test]
    fn useless_block_is_removed() {
        let mut cfg = Cfg::new("entry", Precision::Num);
        cfg.set_exit("exit");
        cfg.insert("exit");
        cfg.insert("orphan");
        cfg.connect(&"entry", &"exit");
        cfg.connect(&"entry", &"orphan");

        cfg.simplify();
        assert!(cfg.labels().all(|l| l != &"orphan"));
        assert!(cfg.labels().any(|l| l == &"exit"));
    }

    /// Scenario S5: an `assume` block is never collapsed into its
    /// neighbors.
    #[test]
    fn assume_block_is_a_merge_barrier() {
        let f = VarFactory::new();
        let x = var(&f, "x", Type::int(32));
        let mut cfg = Cfg::new("entry", Precision::Num);
        cfg.set_exit("exit");
        cfg.insert("guard");
        cfg.insert("exit");
        {
            let guard = cfg.get_node_mut(&"guard");
            guard
                .assume(LinCst::new(LinExp::from_var(x), Relation::Geq))
                .unwrap();
        }
        cfg.connect(&"entry", &"guard");
        cfg.connect(&"guard", &"exit");

        cfg.simplify();
        assert_eq!(cfg.len(), 3);
    }
}

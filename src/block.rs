//! Basic blocks: an ordered statement sequence plus adjacency to sibling
//! blocks and an aggregate live set.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use crate::error::Result;
use crate::number::{LinCst, LinExp, Relation};
use crate::statement::{
    BinOp, BoolOp, CastOp, Operand, Payload, PtrConstraint, PtrOperand, Statement,
};
use crate::types::TypedVariable;

#[cfg(test)]
use crate::types::Type;

/// How much of the pointer/array surface a block is allowed to emit.
/// `Num < Ptr < Arr`; builders for a tier above the block's own tier
/// silently no-op (debug-assert in debug builds — see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precision {
    Num,
    Ptr,
    Arr,
}

/// A duplicate-free, insertion-ordered list of labels.
#[derive(Debug, Clone, Default)]
pub struct LabelSet<L: Clone + Eq + Hash> {
    order: Vec<L>,
}

impl<L: Clone + Eq + Hash> LabelSet<L> {
    #[must_use]
    pub fn new() -> Self {
        Self { order: Vec::new() }
    }

    pub fn insert(&mut self, label: L) {
        if !self.order.contains(&label) {
            self.order.push(label);
        }
    }

    pub fn remove(&mut self, label: &L) {
        self.order.retain(|l| l != label);
    }

    pub fn contains(&self, label: &L) -> bool {
        self.order.contains(label)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &L> {
        self.order.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[L] {
        &self.order
    }
}

/// A basic block: a label, a tracked-precision tier, an ordered owned
/// statement list, and mirrored predecessor/successor label sets.
///
/// Non-copyable (owns its statements); use [`BasicBlock::clone`] for a deep
/// copy, or [`crate::cfg_ref::CfgRef`] for a cheap handle to the owning CFG.
#[derive(Debug, Clone)]
pub struct BasicBlock<L: Clone + Eq + Hash + Ord> {
    label: L,
    precision: Precision,
    statements: Vec<Statement>,
    insert_at_front: bool,
    predecessors: LabelSet<L>,
    successors: LabelSet<L>,
    live: crate::statement::LiveSet,
}

impl<L: Clone + Eq + Hash + Ord + fmt::Display> BasicBlock<L> {
    #[must_use]
    pub fn new(label: L, precision: Precision) -> Self {
        Self {
            label,
            precision,
            statements: Vec::new(),
            insert_at_front: false,
            predecessors: LabelSet::new(),
            successors: LabelSet::new(),
            live: crate::statement::LiveSet::default(),
        }
    }

    #[must_use]
    pub fn label(&self) -> &L {
        &self.label
    }

    #[must_use]
    pub fn precision(&self) -> Precision {
        self.precision
    }

    #[must_use]
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    #[must_use]
    pub fn live(&self) -> &crate::statement::LiveSet {
        &self.live
    }

    #[must_use]
    pub fn predecessors(&self) -> &LabelSet<L> {
        &self.predecessors
    }

    #[must_use]
    pub fn successors(&self) -> &LabelSet<L> {
        &self.successors
    }

    /// Direct adjacency mutation used by `cfg`'s simplification passes,
    /// which rewire edges to a block that has just been merged away
    /// without going through `connect_to`/`disconnect_from` (the sibling
    /// side of that edge no longer exists by then).
    pub(crate) fn successors_mut(&mut self) -> &mut LabelSet<L> {
        &mut self.successors
    }

    pub(crate) fn predecessors_mut(&mut self) -> &mut LabelSet<L> {
        &mut self.predecessors
    }

    /// Forward iterator over statements.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Statement> {
        self.statements.iter()
    }

    /// One-shot: the next call to `add_statement` inserts at the front
    /// instead of the back, then this resets.
    pub fn set_insert_at_front(&mut self) {
        self.insert_at_front = true;
    }

    /// Insert an already-constructed statement, honoring (and resetting)
    /// the front-insertion flag, and folding its live set into the block's
    /// aggregate.
    pub fn add_statement(&mut self, stmt: Statement) {
        self.live = std::mem::take(&mut self.live).union(stmt.live());
        if self.insert_at_front {
            self.statements.insert(0, stmt);
            self.insert_at_front = false;
        } else {
            self.statements.push(stmt);
        }
    }

    fn has_ptr_precision(&self) -> bool {
        let ok = self.precision >= Precision::Ptr;
        debug_assert!(ok, "pointer builder called below Ptr precision");
        ok
    }

    fn has_arr_precision(&self) -> bool {
        let ok = self.precision >= Precision::Arr;
        debug_assert!(ok, "array builder called below Arr precision");
        ok
    }

    // --- numeric / boolean builders (always available) ---

    pub fn bin_op(&mut self, lhs: TypedVariable, op: BinOp, left: Operand, right: Operand) -> Result<()> {
        self.add_statement(Statement::bin_op(lhs, op, left, right)?);
        Ok(())
    }

    pub fn add(&mut self, lhs: TypedVariable, left: Operand, right: Operand) -> Result<()> {
        self.bin_op(lhs, BinOp::Add, left, right)
    }
    pub fn sub(&mut self, lhs: TypedVariable, left: Operand, right: Operand) -> Result<()> {
        self.bin_op(lhs, BinOp::Sub, left, right)
    }
    pub fn mul(&mut self, lhs: TypedVariable, left: Operand, right: Operand) -> Result<()> {
        self.bin_op(lhs, BinOp::Mul, left, right)
    }
    pub fn div(&mut self, lhs: TypedVariable, left: Operand, right: Operand) -> Result<()> {
        self.bin_op(lhs, BinOp::SDiv, left, right)
    }
    pub fn udiv(&mut self, lhs: TypedVariable, left: Operand, right: Operand) -> Result<()> {
        self.bin_op(lhs, BinOp::UDiv, left, right)
    }
    pub fn rem(&mut self, lhs: TypedVariable, left: Operand, right: Operand) -> Result<()> {
        self.bin_op(lhs, BinOp::SRem, left, right)
    }
    pub fn urem(&mut self, lhs: TypedVariable, left: Operand, right: Operand) -> Result<()> {
        self.bin_op(lhs, BinOp::URem, left, right)
    }
    pub fn bitwise_and(&mut self, lhs: TypedVariable, left: Operand, right: Operand) -> Result<()> {
        self.bin_op(lhs, BinOp::And, left, right)
    }
    pub fn bitwise_or(&mut self, lhs: TypedVariable, left: Operand, right: Operand) -> Result<()> {
        self.bin_op(lhs, BinOp::Or, left, right)
    }
    pub fn bitwise_xor(&mut self, lhs: TypedVariable, left: Operand, right: Operand) -> Result<()> {
        self.bin_op(lhs, BinOp::Xor, left, right)
    }

    pub fn assign(&mut self, lhs: TypedVariable, rhs: LinExp) -> Result<()> {
        self.add_statement(Statement::assign(lhs, rhs)?);
        Ok(())
    }

    pub fn assume(&mut self, constraint: LinCst) -> Result<()> {
        self.add_statement(Statement::assume(constraint)?);
        Ok(())
    }

    pub fn assertion(&mut self, constraint: LinCst) -> Result<()> {
        self.add_statement(Statement::assert(constraint)?);
        Ok(())
    }

    pub fn select(&mut self, lhs: TypedVariable, cond: LinCst, left: Operand, right: Operand) -> Result<()> {
        self.add_statement(Statement::select(lhs, cond, left, right)?);
        Ok(())
    }

    pub fn unreachable(&mut self) {
        self.add_statement(Statement::unreachable());
    }

    pub fn havoc(&mut self, lhs: TypedVariable) -> Result<()> {
        self.add_statement(Statement::havoc(lhs)?);
        Ok(())
    }

    pub fn truncate(&mut self, src: TypedVariable, dst: TypedVariable) -> Result<()> {
        self.add_statement(Statement::int_cast(CastOp::Trunc, src, dst)?);
        Ok(())
    }

    pub fn sext(&mut self, src: TypedVariable, dst: TypedVariable) -> Result<()> {
        self.add_statement(Statement::int_cast(CastOp::Sext, src, dst)?);
        Ok(())
    }

    pub fn zext(&mut self, src: TypedVariable, dst: TypedVariable) -> Result<()> {
        self.add_statement(Statement::int_cast(CastOp::Zext, src, dst)?);
        Ok(())
    }

    pub fn callsite(&mut self, func_name: impl Into<String>, lhs: Vec<TypedVariable>, args: Vec<Operand>) -> Result<()> {
        self.add_statement(Statement::callsite(func_name, lhs, args)?);
        Ok(())
    }

    pub fn ret(&mut self, vars: Vec<TypedVariable>) -> Result<()> {
        self.add_statement(Statement::ret(vars)?);
        Ok(())
    }

    pub fn bool_bin_op(&mut self, lhs: TypedVariable, op: BoolOp, left: TypedVariable, right: TypedVariable) -> Result<()> {
        self.add_statement(Statement::bool_bin_op(lhs, op, left, right)?);
        Ok(())
    }

    pub fn bool_assign_cst(&mut self, lhs: TypedVariable, cst: LinCst) -> Result<()> {
        self.add_statement(Statement::bool_assign_cst(lhs, cst)?);
        Ok(())
    }

    pub fn bool_assign_var(&mut self, lhs: TypedVariable, rhs: TypedVariable, is_negated: bool) -> Result<()> {
        self.add_statement(Statement::bool_assign_var(lhs, rhs, is_negated)?);
        Ok(())
    }

    pub fn bool_assume(&mut self, var: TypedVariable, is_negated: bool) -> Result<()> {
        self.add_statement(Statement::bool_assume(var, is_negated)?);
        Ok(())
    }

    pub fn bool_assert(&mut self, var: TypedVariable) -> Result<()> {
        self.add_statement(Statement::bool_assert(var)?);
        Ok(())
    }

    pub fn bool_select(&mut self, lhs: TypedVariable, cond: TypedVariable, left: TypedVariable, right: TypedVariable) -> Result<()> {
        self.add_statement(Statement::bool_select(lhs, cond, left, right)?);
        Ok(())
    }

    // --- pointer builders: no-op below Precision::Ptr ---

    pub fn ptr_load(&mut self, lhs: TypedVariable, rhs: TypedVariable) -> Result<()> {
        if !self.has_ptr_precision() {
            return Ok(());
        }
        self.add_statement(Statement::ptr_load(lhs, rhs)?);
        Ok(())
    }

    pub fn ptr_store(&mut self, lhs: TypedVariable, rhs: TypedVariable) -> Result<()> {
        if !self.has_ptr_precision() {
            return Ok(());
        }
        self.add_statement(Statement::ptr_store(lhs, rhs)?);
        Ok(())
    }

    pub fn ptr_assign(&mut self, lhs: TypedVariable, rhs: TypedVariable, offset: LinExp) -> Result<()> {
        if !self.has_ptr_precision() {
            return Ok(());
        }
        self.add_statement(Statement::ptr_assign(lhs, rhs, offset)?);
        Ok(())
    }

    pub fn ptr_object(&mut self, lhs: TypedVariable, address: u64) -> Result<()> {
        if !self.has_ptr_precision() {
            return Ok(());
        }
        self.add_statement(Statement::ptr_object(lhs, address)?);
        Ok(())
    }

    pub fn ptr_function(&mut self, lhs: TypedVariable, func_name: impl Into<String>) -> Result<()> {
        if !self.has_ptr_precision() {
            return Ok(());
        }
        self.add_statement(Statement::ptr_function(lhs, func_name)?);
        Ok(())
    }

    pub fn ptr_null(&mut self, lhs: TypedVariable) -> Result<()> {
        if !self.has_ptr_precision() {
            return Ok(());
        }
        self.add_statement(Statement::ptr_null(lhs)?);
        Ok(())
    }

    pub fn ptr_assume(&mut self, left: PtrOperand, rel: Relation, right: PtrOperand) {
        if !self.has_ptr_precision() {
            return;
        }
        if let Some(stmt) = Statement::ptr_assume(PtrConstraint::new(left, rel, right)) {
            self.add_statement(stmt);
        }
    }

    pub fn ptr_assert(&mut self, left: PtrOperand, rel: Relation, right: PtrOperand) {
        if !self.has_ptr_precision() {
            return;
        }
        if let Some(stmt) = Statement::ptr_assert(PtrConstraint::new(left, rel, right)) {
            self.add_statement(stmt);
        }
    }

    // --- array builders: no-op below Precision::Arr ---

    pub fn array_init(&mut self, arr: TypedVariable, elem_size: Operand, lb: Operand, ub: Operand, val: Operand) -> Result<()> {
        if !self.has_arr_precision() {
            return Ok(());
        }
        self.add_statement(Statement::array_init(arr, elem_size, lb, ub, val)?);
        Ok(())
    }

    pub fn array_assume(&mut self, arr: TypedVariable, elem_size: Operand, lb: Operand, ub: Operand, val: Operand) -> Result<()> {
        if !self.has_arr_precision() {
            return Ok(());
        }
        self.add_statement(Statement::array_assume(arr, elem_size, lb, ub, val)?);
        Ok(())
    }

    pub fn array_store(&mut self, arr: TypedVariable, idx: Operand, value: Operand, elem_size: Operand, is_singleton: bool) -> Result<()> {
        if !self.has_arr_precision() {
            return Ok(());
        }
        self.add_statement(Statement::array_store(arr, idx, value, elem_size, is_singleton)?);
        Ok(())
    }

    pub fn array_load(&mut self, lhs: TypedVariable, arr: TypedVariable, idx: Operand, elem_size: Operand) -> Result<()> {
        if !self.has_arr_precision() {
            return Ok(());
        }
        self.add_statement(Statement::array_load(lhs, arr, idx, elem_size)?);
        Ok(())
    }

    pub fn array_assign(&mut self, lhs_arr: TypedVariable, rhs_arr: TypedVariable) -> Result<()> {
        if !self.has_arr_precision() {
            return Ok(());
        }
        self.add_statement(Statement::array_assign(lhs_arr, rhs_arr)?);
        Ok(())
    }

    // --- adjacency ---

    /// Record that this block has `other` as a successor (and `self` as a
    /// predecessor of `other`). Idempotent.
    pub fn connect_to(&mut self, other: &mut Self) {
        self.successors.insert(other.label.clone());
        other.predecessors.insert(self.label.clone());
    }

    /// Undo [`BasicBlock::connect_to`]. Idempotent.
    pub fn disconnect_from(&mut self, other: &mut Self) {
        self.successors.remove(&other.label);
        other.predecessors.remove(&self.label);
    }

    /// Splice `other`'s statements before this block's own, folding in its
    /// live set. `other` is left with no statements; adjacency is not
    /// touched (callers reconnect labels separately, see `cfg::merge_blocks`).
    pub fn merge_front(&mut self, other: &mut Self) {
        let mut combined = std::mem::take(&mut other.statements);
        combined.append(&mut self.statements);
        self.statements = combined;
        self.live = std::mem::take(&mut self.live).union(&other.live);
        other.live = crate::statement::LiveSet::default();
    }

    /// Splice `other`'s statements after this block's own, folding in its
    /// live set.
    pub fn merge_back(&mut self, other: &mut Self) {
        self.statements.append(&mut other.statements);
        self.live = std::mem::take(&mut self.live).union(&other.live);
        other.live = crate::statement::LiveSet::default();
    }

    /// `true` iff none of this block's statements is an `assume`,
    /// `bool_assume`, or `array_load` — the merge-eligibility guard the CFG
    /// simplifier uses to avoid collapsing guard edges (spec §4.4.1; policy
    /// is hard-coded, not parameterized).
    #[must_use]
    pub fn is_merge_barrier_free(&self) -> bool {
        !self.statements.iter().any(|s| {
            matches!(
                s.payload(),
                Payload::Assume(_) | Payload::BoolAssume(_) | Payload::ArrayLoad(_)
            )
        })
    }
}

impl<L: Clone + Eq + Hash + Ord + fmt::Display> fmt::Display for BasicBlock<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.label)?;
        for stmt in &self.statements {
            writeln!(f, "  {stmt};")?;
        }
        if !self.successors.is_empty() {
            let labels = self
                .successors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            writeln!(f, "  goto {labels};")?;
        }
        Ok(())
    }
}

/// Used by [`crate::cfg::Cfg::get_vars`]: join of uses+defs across a block,
/// deduplicated against a running set.
pub(crate) fn collect_vars_into(block: &BasicBlock<impl Clone + Eq + Hash + Ord + fmt::Display>, seen: &mut HashSet<u64>, out: &mut Vec<TypedVariable>) {
    for v in block.live().uses().iter().chain(block.live().defs()) {
        if seen.insert(v.name().index()) {
            out.push(v.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::VarFactory;

    fn var(f: &VarFactory, key: &str, ty: Type) -> TypedVariable {
        TypedVariable::new(f.lookup(key), ty)
    }

    #[test]
    fn add_statement_folds_live_set() {
        let f = VarFactory::new();
        let x = var(&f, "x", Type::int(32));
        let y = var(&f, "y", Type::int(32));
        let mut b = BasicBlock::new("b0", Precision::Num);
        b.add(y, Operand::Var(x), Operand::Const(1)).unwrap();
        assert_eq!(b.len(), 1);
        assert_eq!(b.live().uses().len(), 1);
        assert_eq!(b.live().defs().len(), 1);
    }

    #[test]
    fn front_insertion_flag_is_one_shot() {
        let f = VarFactory::new();
        let x = var(&f, "x", Type::int(32));
        let mut b = BasicBlock::new("b0", Precision::Num);
        b.havoc(x.clone()).unwrap();
        b.set_insert_at_front();
        b.unreachable();
        b.havoc(x).unwrap();
        assert_eq!(b.statements().len(), 3);
        assert_eq!(b.statements()[0].kind(), crate::statement::Kind::Unreachable);
    }

    #[test]
    #[should_panic(expected = "pointer builder called below Ptr precision")]
    fn ptr_builder_below_precision_trips_debug_assert() {
        let f = VarFactory::new();
        let p = var(&f, "p", Type::Ptr);
        let mut b = BasicBlock::new("b0", Precision::Num);
        // debug_assert! gates this call; in a debug build it panics rather
        // than silently no-op'ing (release builds no-op, see DESIGN.md).
        let _ = b.ptr_null(p);
    }

    #[test]
    fn connect_and_disconnect_are_mirrored() {
        let mut a = BasicBlock::<&str>::new("a", Precision::Num);
        let mut b = BasicBlock::<&str>::new("b", Precision::Num);
        a.connect_to(&mut b);
        assert!(a.successors().contains(&"b"));
        assert!(b.predecessors().contains(&"a"));
        a.disconnect_from(&mut b);
        assert!(!a.successors().contains(&"b"));
        assert!(!b.predecessors().contains(&"a"));
    }

    #[test]
    fn merge_barrier_detects_assume() {
        let f = VarFactory::new();
        let mut b = BasicBlock::new("b0", Precision::Num);
        let x = var(&f, "x", Type::int(32));
        b.assume(LinCst::new(LinExp::from_var(x), Relation::Geq)).unwrap();
        assert!(!b.is_merge_barrier_free());
    }
}

//! The statement algebra: one tagged variant per IR operation (§6.1 of the
//! design), each carrying its own live-use/live-def bookkeeping.

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::{Error, Result};
use crate::number::{LinCst, LinExp, Relation};
use crate::types::{Type, TypedVariable};

/// Stable integer tag for a statement kind. Front-ends and visitors may
/// switch on the `u8` form directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Kind {
    Undef = 0,
    BinOp = 20,
    Assign = 21,
    Assume = 22,
    Unreachable = 23,
    Select = 24,
    Assert = 25,
    ArrayInit = 30,
    ArrayAssume = 31,
    ArrayStore = 32,
    ArrayLoad = 33,
    ArrayAssign = 34,
    PtrLoad = 40,
    PtrStore = 41,
    PtrAssign = 42,
    PtrObject = 43,
    PtrFunction = 44,
    PtrNull = 45,
    PtrAssume = 46,
    PtrAssert = 47,
    Callsite = 50,
    Return = 51,
    Havoc = 60,
    BoolBinOp = 70,
    BoolAssignCst = 71,
    BoolAssignVar = 72,
    BoolAssume = 73,
    BoolSelect = 74,
    BoolAssert = 75,
    IntCast = 80,
}

/// File/line/column attribution. Present only for the kinds the front-end
/// is expected to attribute (binary op, assert, cast, pointer load/store,
/// pointer assert, boolean bin-op and assert).
///
/// Deliberately carries only `PartialEq`: the original implementation's
/// `operator<` is a conjunction rather than a lexicographic compare, which
/// is not a valid total order, so no `Ord`/`PartialOrd` is implemented here
/// (see DESIGN.md).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugInfo {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl DebugInfo {
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for DebugInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A numeric binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    SRem,
    URem,
    And,
    Or,
    Xor,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::SDiv => "/",
            Self::UDiv => "/u",
            Self::SRem => "%",
            Self::URem => "%u",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
        })
    }
}

/// A boolean binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
    Xor,
}

impl fmt::Display for BoolOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "&&",
            Self::Or => "||",
            Self::Xor => "^",
        })
    }
}

/// Integer cast operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOp {
    Trunc,
    Sext,
    Zext,
}

impl fmt::Display for CastOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Trunc => "trunc",
            Self::Sext => "sext",
            Self::Zext => "zext",
        })
    }
}

/// Either a constant or a single typed variable. Used everywhere the spec
/// requires "constant or single variable" — the constraint is enforced by
/// this type's shape rather than by a runtime check.
#[derive(Debug, Clone)]
pub enum Operand {
    Const(i64),
    Var(TypedVariable),
}

impl Operand {
    #[must_use]
    pub fn as_var(&self) -> Option<&TypedVariable> {
        match self {
            Self::Var(v) => Some(v),
            Self::Const(_) => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(c) => write!(f, "{c}"),
            Self::Var(v) => write!(f, "{}", v.name()),
        }
    }
}

/// A pointer-typed operand: a variable or the null pointer literal.
#[derive(Debug, Clone)]
pub enum PtrOperand {
    Var(TypedVariable),
    Null,
}

impl fmt::Display for PtrOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var(v) => write!(f, "{}", v.name()),
            Self::Null => write!(f, "NULL"),
        }
    }
}

/// A constraint between two pointer operands, used by `ptr_assume`/`ptr_assert`.
#[derive(Debug, Clone)]
pub struct PtrConstraint {
    pub left: PtrOperand,
    pub rel: Relation,
    pub right: PtrOperand,
}

impl PtrConstraint {
    #[must_use]
    pub fn new(left: PtrOperand, rel: Relation, right: PtrOperand) -> Self {
        Self { left, rel, right }
    }

    /// Statically always true (e.g. `p == p`).
    #[must_use]
    fn is_tautology(&self) -> bool {
        matches!(
            (&self.left, self.rel, &self.right),
            (PtrOperand::Var(a), Relation::Eq, PtrOperand::Var(b)) if a.name() == b.name()
        )
    }

    /// Statically always false (e.g. `p != p`).
    #[must_use]
    fn is_contradiction(&self) -> bool {
        matches!(
            (&self.left, self.rel, &self.right),
            (PtrOperand::Var(a), Relation::Neq, PtrOperand::Var(b)) if a.name() == b.name()
        )
    }
}

impl fmt::Display for PtrConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.rel, self.right)
    }
}

/// Disjoint `uses`/`defs` sets, each insertion-ordered and duplicate-free.
#[derive(Debug, Clone, Default)]
pub struct LiveSet {
    uses: Vec<TypedVariable>,
    defs: Vec<TypedVariable>,
}

impl LiveSet {
    #[must_use]
    pub fn uses(&self) -> &[TypedVariable] {
        &self.uses
    }

    #[must_use]
    pub fn defs(&self) -> &[TypedVariable] {
        &self.defs
    }

    fn push_unique(set: &mut Vec<TypedVariable>, var: TypedVariable) {
        if !set.iter().any(|v| v.name() == var.name()) {
            set.push(var);
        }
    }

    pub fn add_use(&mut self, var: TypedVariable) {
        Self::push_unique(&mut self.uses, var);
    }

    pub fn add_def(&mut self, var: TypedVariable) {
        Self::push_unique(&mut self.defs, var);
    }

    /// Union of two live sets, preserving first-seen order (`self`'s
    /// entries first, then `other`'s).
    #[must_use]
    pub fn union(mut self, other: &Self) -> Self {
        for v in &other.uses {
            self.add_use(v.clone());
        }
        for v in &other.defs {
            self.add_def(v.clone());
        }
        self
    }
}

macro_rules! live_builder {
    (uses: [$($u:expr),* $(,)?], defs: [$($d:expr),* $(,)?]) => {{
        let mut live = LiveSet::default();
        $(for v in ($u).into_iter() { live.add_use(v); })*
        $(for v in ($d).into_iter() { live.add_def(v); })*
        live
    }};
}

#[derive(Debug, Clone)]
pub struct BinOpStmt {
    pub lhs: TypedVariable,
    pub op: BinOp,
    pub left: Operand,
    pub right: Operand,
}

#[derive(Debug, Clone)]
pub struct AssignStmt {
    pub lhs: TypedVariable,
    pub rhs: LinExp,
}

#[derive(Debug, Clone)]
pub struct AssumeStmt {
    pub constraint: LinCst,
}

#[derive(Debug, Clone)]
pub struct AssertStmt {
    pub constraint: LinCst,
}

#[derive(Debug, Clone)]
pub struct SelectStmt {
    pub lhs: TypedVariable,
    pub cond: LinCst,
    pub left: Operand,
    pub right: Operand,
}

#[derive(Debug, Clone)]
pub struct HavocStmt {
    pub lhs: TypedVariable,
}

#[derive(Debug, Clone)]
pub struct IntCastStmt {
    pub op: CastOp,
    pub src: TypedVariable,
    pub dst: TypedVariable,
}

/// Shared payload for `array_init` and `array_assume`.
#[derive(Debug, Clone)]
pub struct ArrayFillStmt {
    pub arr: TypedVariable,
    pub elem_size: Operand,
    pub lb: Operand,
    pub ub: Operand,
    pub val: Operand,
}

#[derive(Debug, Clone)]
pub struct ArrayStoreStmt {
    pub arr: TypedVariable,
    pub idx: Operand,
    pub value: Operand,
    pub elem_size: Operand,
    pub is_singleton: bool,
}

#[derive(Debug, Clone)]
pub struct ArrayLoadStmt {
    pub lhs: TypedVariable,
    pub arr: TypedVariable,
    pub idx: Operand,
    pub elem_size: Operand,
}

#[derive(Debug, Clone)]
pub struct ArrayAssignStmt {
    pub lhs_arr: TypedVariable,
    pub rhs_arr: TypedVariable,
}

#[derive(Debug, Clone)]
pub struct PtrLoadStmt {
    pub lhs: TypedVariable,
    pub rhs: TypedVariable,
}

#[derive(Debug, Clone)]
pub struct PtrStoreStmt {
    pub lhs: TypedVariable,
    pub rhs: TypedVariable,
}

#[derive(Debug, Clone)]
pub struct PtrAssignStmt {
    pub lhs: TypedVariable,
    pub rhs: TypedVariable,
    pub offset: LinExp,
}

#[derive(Debug, Clone)]
pub struct PtrObjectStmt {
    pub lhs: TypedVariable,
    pub address: u64,
}

#[derive(Debug, Clone)]
pub struct PtrFunctionStmt {
    pub lhs: TypedVariable,
    pub func_name: String,
}

#[derive(Debug, Clone)]
pub struct PtrNullStmt {
    pub lhs: TypedVariable,
}

#[derive(Debug, Clone)]
pub struct PtrAssumeStmt {
    pub constraint: PtrConstraint,
}

#[derive(Debug, Clone)]
pub struct PtrAssertStmt {
    pub constraint: PtrConstraint,
}

#[derive(Debug, Clone)]
pub struct CallsiteStmt {
    pub func_name: String,
    pub lhs: Vec<TypedVariable>,
    pub args: Vec<Operand>,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub vars: Vec<TypedVariable>,
}

#[derive(Debug, Clone)]
pub struct BoolBinOpStmt {
    pub lhs: TypedVariable,
    pub op: BoolOp,
    pub left: TypedVariable,
    pub right: TypedVariable,
}

#[derive(Debug, Clone)]
pub struct BoolAssignCstStmt {
    pub lhs: TypedVariable,
    pub constraint: LinCst,
}

#[derive(Debug, Clone)]
pub struct BoolAssignVarStmt {
    pub lhs: TypedVariable,
    pub rhs: TypedVariable,
    pub is_negated: bool,
}

#[derive(Debug, Clone)]
pub struct BoolAssumeStmt {
    pub var: TypedVariable,
    pub is_negated: bool,
}

#[derive(Debug, Clone)]
pub struct BoolAssertStmt {
    pub var: TypedVariable,
}

#[derive(Debug, Clone)]
pub struct BoolSelectStmt {
    pub lhs: TypedVariable,
    pub cond: TypedVariable,
    pub left: TypedVariable,
    pub right: TypedVariable,
}

/// Kind-specific payload. `Statement::kind` maps each variant to its
/// [`Kind`] tag.
#[derive(Debug, Clone)]
pub enum Payload {
    BinOp(BinOpStmt),
    Assign(AssignStmt),
    Assume(AssumeStmt),
    Unreachable,
    Select(SelectStmt),
    Assert(AssertStmt),
    ArrayInit(ArrayFillStmt),
    ArrayAssume(ArrayFillStmt),
    ArrayStore(ArrayStoreStmt),
    ArrayLoad(ArrayLoadStmt),
    ArrayAssign(ArrayAssignStmt),
    PtrLoad(PtrLoadStmt),
    PtrStore(PtrStoreStmt),
    PtrAssign(PtrAssignStmt),
    PtrObject(PtrObjectStmt),
    PtrFunction(PtrFunctionStmt),
    PtrNull(PtrNullStmt),
    PtrAssume(PtrAssumeStmt),
    PtrAssert(PtrAssertStmt),
    Callsite(CallsiteStmt),
    Return(ReturnStmt),
    Havoc(HavocStmt),
    BoolBinOp(BoolBinOpStmt),
    BoolAssignCst(BoolAssignCstStmt),
    BoolAssignVar(BoolAssignVarStmt),
    BoolAssume(BoolAssumeStmt),
    BoolSelect(BoolSelectStmt),
    BoolAssert(BoolAssertStmt),
    IntCast(IntCastStmt),
}

/// A single IR statement: a kind tag, its payload, the live set it
/// contributes to its block, and optional source attribution.
#[derive(Debug, Clone)]
pub struct Statement {
    payload: Payload,
    live: LiveSet,
    debug_info: Option<DebugInfo>,
}

fn vars_of(op: &Operand) -> Vec<TypedVariable> {
    op.as_var().cloned().into_iter().collect()
}

impl Statement {
    #[must_use]
    pub fn kind(&self) -> Kind {
        match &self.payload {
            Payload::BinOp(_) => Kind::BinOp,
            Payload::Assign(_) => Kind::Assign,
            Payload::Assume(_) => Kind::Assume,
            Payload::Unreachable => Kind::Unreachable,
            Payload::Select(_) => Kind::Select,
            Payload::Assert(_) => Kind::Assert,
            Payload::ArrayInit(_) => Kind::ArrayInit,
            Payload::ArrayAssume(_) => Kind::ArrayAssume,
            Payload::ArrayStore(_) => Kind::ArrayStore,
            Payload::ArrayLoad(_) => Kind::ArrayLoad,
            Payload::ArrayAssign(_) => Kind::ArrayAssign,
            Payload::PtrLoad(_) => Kind::PtrLoad,
            Payload::PtrStore(_) => Kind::PtrStore,
            Payload::PtrAssign(_) => Kind::PtrAssign,
            Payload::PtrObject(_) => Kind::PtrObject,
            Payload::PtrFunction(_) => Kind::PtrFunction,
            Payload::PtrNull(_) => Kind::PtrNull,
            Payload::PtrAssume(_) => Kind::PtrAssume,
            Payload::PtrAssert(_) => Kind::PtrAssert,
            Payload::Callsite(_) => Kind::Callsite,
            Payload::Return(_) => Kind::Return,
            Payload::Havoc(_) => Kind::Havoc,
            Payload::BoolBinOp(_) => Kind::BoolBinOp,
            Payload::BoolAssignCst(_) => Kind::BoolAssignCst,
            Payload::BoolAssignVar(_) => Kind::BoolAssignVar,
            Payload::BoolAssume(_) => Kind::BoolAssume,
            Payload::BoolSelect(_) => Kind::BoolSelect,
            Payload::BoolAssert(_) => Kind::BoolAssert,
            Payload::IntCast(_) => Kind::IntCast,
        }
    }

    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    #[must_use]
    pub fn live(&self) -> &LiveSet {
        &self.live
    }

    #[must_use]
    pub fn debug_info(&self) -> Option<&DebugInfo> {
        self.debug_info.as_ref()
    }

    pub fn set_debug_info(&mut self, info: DebugInfo) {
        self.debug_info = Some(info);
    }

    /// Dispatch to the matching hook on `visitor`.
    pub fn accept(&self, visitor: &mut dyn StatementVisitor) {
        match &self.payload {
            Payload::BinOp(s) => visitor.visit_bin_op(s),
            Payload::Assign(s) => visitor.visit_assign(s),
            Payload::Assume(s) => visitor.visit_assume(s),
            Payload::Unreachable => visitor.visit_unreachable(),
            Payload::Select(s) => visitor.visit_select(s),
            Payload::Assert(s) => visitor.visit_assert(s),
            Payload::ArrayInit(s) => visitor.visit_array_init(s),
            Payload::ArrayAssume(s) => visitor.visit_array_assume(s),
            Payload::ArrayStore(s) => visitor.visit_array_store(s),
            Payload::ArrayLoad(s) => visitor.visit_array_load(s),
            Payload::ArrayAssign(s) => visitor.visit_array_assign(s),
            Payload::PtrLoad(s) => visitor.visit_ptr_load(s),
            Payload::PtrStore(s) => visitor.visit_ptr_store(s),
            Payload::PtrAssign(s) => visitor.visit_ptr_assign(s),
            Payload::PtrObject(s) => visitor.visit_ptr_object(s),
            Payload::PtrFunction(s) => visitor.visit_ptr_function(s),
            Payload::PtrNull(s) => visitor.visit_ptr_null(s),
            Payload::PtrAssume(s) => visitor.visit_ptr_assume(s),
            Payload::PtrAssert(s) => visitor.visit_ptr_assert(s),
            Payload::Callsite(s) => visitor.visit_callsite(s),
            Payload::Return(s) => visitor.visit_return(s),
            Payload::Havoc(s) => visitor.visit_havoc(s),
            Payload::BoolBinOp(s) => visitor.visit_bool_bin_op(s),
            Payload::BoolAssignCst(s) => visitor.visit_bool_assign_cst(s),
            Payload::BoolAssignVar(s) => visitor.visit_bool_assign_var(s),
            Payload::BoolAssume(s) => visitor.visit_bool_assume(s),
            Payload::BoolSelect(s) => visitor.visit_bool_select(s),
            Payload::BoolAssert(s) => visitor.visit_bool_assert(s),
            Payload::IntCast(s) => visitor.visit_int_cast(s),
        }
    }

    // --- constructors; structural validation happens here, fatal per spec §7 ---

    pub fn bin_op(lhs: TypedVariable, op: BinOp, left: Operand, right: Operand) -> Result<Self> {
        let live = live_builder!(
            uses: [vars_of(&left), vars_of(&right)],
            defs: [Some(lhs.clone())],
        );
        Ok(Self {
            payload: Payload::BinOp(BinOpStmt {
                lhs,
                op,
                left,
                right,
            }),
            live,
            debug_info: None,
        })
    }

    pub fn assign(lhs: TypedVariable, rhs: LinExp) -> Result<Self> {
        let live = live_builder!(
            uses: [rhs.vars().cloned().collect::<Vec<_>>()],
            defs: [Some(lhs.clone())],
        );
        Ok(Self {
            payload: Payload::Assign(AssignStmt { lhs, rhs }),
            live,
            debug_info: None,
        })
    }

    pub fn assume(constraint: LinCst) -> Result<Self> {
        let live = live_builder!(
            uses: [constraint.vars().cloned().collect::<Vec<_>>()],
            defs: [],
        );
        Ok(Self {
            payload: Payload::Assume(AssumeStmt { constraint }),
            live,
            debug_info: None,
        })
    }

    pub fn assert(constraint: LinCst) -> Result<Self> {
        let live = live_builder!(
            uses: [constraint.vars().cloned().collect::<Vec<_>>()],
            defs: [],
        );
        Ok(Self {
            payload: Payload::Assert(AssertStmt { constraint }),
            live,
            debug_info: None,
        })
    }

    pub fn select(lhs: TypedVariable, cond: LinCst, left: Operand, right: Operand) -> Result<Self> {
        let live = live_builder!(
            uses: [
                cond.vars().cloned().collect::<Vec<_>>(),
                vars_of(&left),
                vars_of(&right),
            ],
            defs: [Some(lhs.clone())],
        );
        Ok(Self {
            payload: Payload::Select(SelectStmt {
                lhs,
                cond,
                left,
                right,
            }),
            live,
            debug_info: None,
        })
    }

    #[must_use]
    pub fn unreachable() -> Self {
        Self {
            payload: Payload::Unreachable,
            live: LiveSet::default(),
            debug_info: None,
        }
    }

    pub fn havoc(lhs: TypedVariable) -> Result<Self> {
        let live = live_builder!(uses: [], defs: [Some(lhs.clone())]);
        Ok(Self {
            payload: Payload::Havoc(HavocStmt { lhs }),
            live,
            debug_info: None,
        })
    }

    pub fn int_cast(op: CastOp, src: TypedVariable, dst: TypedVariable) -> Result<Self> {
        let (src_bits, dst_bits) = (bits_of(&src), bits_of(&dst));
        let ok = match op {
            CastOp::Trunc => src_bits > dst_bits,
            CastOp::Sext | CastOp::Zext => dst_bits > src_bits,
        };
        if !ok {
            return Err(Error::InvalidCastWidth {
                op: match op {
                    CastOp::Trunc => "trunc",
                    CastOp::Sext => "sext",
                    CastOp::Zext => "zext",
                },
                src_bits,
                dst_bits,
            });
        }
        let live = live_builder!(
            uses: [Some(src.clone())],
            defs: [Some(dst.clone())],
        );
        Ok(Self {
            payload: Payload::IntCast(IntCastStmt { op, src, dst }),
            live,
            debug_info: None,
        })
    }

    fn array_fill(arr: TypedVariable, elem_size: Operand, lb: Operand, ub: Operand, val: Operand) -> Result<ArrayFillStmt> {
        if !arr.get_type().is_array() {
            return Err(Error::TypeMismatch {
                expected: "array",
                found: arr.get_type().to_string(),
            });
        }
        Ok(ArrayFillStmt {
            arr,
            elem_size,
            lb,
            ub,
            val,
        })
    }

    fn array_fill_live(fill: &ArrayFillStmt) -> LiveSet {
        live_builder!(
            uses: [
                Some(fill.arr.clone()),
                vars_of(&fill.lb),
                vars_of(&fill.ub),
                vars_of(&fill.val),
            ],
            defs: [],
        )
    }

    pub fn array_init(arr: TypedVariable, elem_size: Operand, lb: Operand, ub: Operand, val: Operand) -> Result<Self> {
        let fill = Self::array_fill(arr, elem_size, lb, ub, val)?;
        let live = Self::array_fill_live(&fill);
        Ok(Self {
            payload: Payload::ArrayInit(fill),
            live,
            debug_info: None,
        })
    }

    pub fn array_assume(arr: TypedVariable, elem_size: Operand, lb: Operand, ub: Operand, val: Operand) -> Result<Self> {
        let fill = Self::array_fill(arr, elem_size, lb, ub, val)?;
        let live = Self::array_fill_live(&fill);
        Ok(Self {
            payload: Payload::ArrayAssume(fill),
            live,
            debug_info: None,
        })
    }

    pub fn array_store(arr: TypedVariable, idx: Operand, value: Operand, elem_size: Operand, is_singleton: bool) -> Result<Self> {
        if !arr.get_type().is_array() {
            return Err(Error::TypeMismatch {
                expected: "array",
                found: arr.get_type().to_string(),
            });
        }
        let live = live_builder!(
            uses: [Some(arr.clone()), vars_of(&idx), vars_of(&value)],
            defs: [],
        );
        Ok(Self {
            payload: Payload::ArrayStore(ArrayStoreStmt {
                arr,
                idx,
                value,
                elem_size,
                is_singleton,
            }),
            live,
            debug_info: None,
        })
    }

    pub fn array_load(lhs: TypedVariable, arr: TypedVariable, idx: Operand, elem_size: Operand) -> Result<Self> {
        if !arr.get_type().is_array() {
            return Err(Error::TypeMismatch {
                expected: "array",
                found: arr.get_type().to_string(),
            });
        }
        let live = live_builder!(
            uses: [Some(arr.clone()), vars_of(&idx)],
            defs: [Some(lhs.clone())],
        );
        Ok(Self {
            payload: Payload::ArrayLoad(ArrayLoadStmt {
                lhs,
                arr,
                idx,
                elem_size,
            }),
            live,
            debug_info: None,
        })
    }

    pub fn array_assign(lhs_arr: TypedVariable, rhs_arr: TypedVariable) -> Result<Self> {
        if lhs_arr.get_type() != rhs_arr.get_type() {
            return Err(Error::ArrayElementTypeMismatch);
        }
        let live = live_builder!(
            uses: [Some(rhs_arr.clone())],
            defs: [Some(lhs_arr.clone())],
        );
        Ok(Self {
            payload: Payload::ArrayAssign(ArrayAssignStmt { lhs_arr, rhs_arr }),
            live,
            debug_info: None,
        })
    }

    /// `lhs = *(rhs)`. Per the design notes, `lhs` is placed only in
    /// `uses` (not `defs`) — a deliberate, preserved quirk.
    pub fn ptr_load(lhs: TypedVariable, rhs: TypedVariable) -> Result<Self> {
        let live = live_builder!(
            uses: [Some(lhs.clone()), Some(rhs.clone())],
            defs: [],
        );
        Ok(Self {
            payload: Payload::PtrLoad(PtrLoadStmt { lhs, rhs }),
            live,
            debug_info: None,
        })
    }

    pub fn ptr_store(lhs: TypedVariable, rhs: TypedVariable) -> Result<Self> {
        let live = live_builder!(
            uses: [Some(lhs.clone()), Some(rhs.clone())],
            defs: [],
        );
        Ok(Self {
            payload: Payload::PtrStore(PtrStoreStmt { lhs, rhs }),
            live,
            debug_info: None,
        })
    }

    pub fn ptr_assign(lhs: TypedVariable, rhs: TypedVariable, offset: LinExp) -> Result<Self> {
        let live = live_builder!(
            uses: [Some(rhs.clone()), offset.vars().cloned().collect::<Vec<_>>()],
            defs: [Some(lhs.clone())],
        );
        Ok(Self {
            payload: Payload::PtrAssign(PtrAssignStmt { lhs, rhs, offset }),
            live,
            debug_info: None,
        })
    }

    pub fn ptr_object(lhs: TypedVariable, address: u64) -> Result<Self> {
        let live = live_builder!(uses: [], defs: [Some(lhs.clone())]);
        Ok(Self {
            payload: Payload::PtrObject(PtrObjectStmt { lhs, address }),
            live,
            debug_info: None,
        })
    }

    pub fn ptr_function(lhs: TypedVariable, func_name: impl Into<String>) -> Result<Self> {
        let live = live_builder!(uses: [], defs: [Some(lhs.clone())]);
        Ok(Self {
            payload: Payload::PtrFunction(PtrFunctionStmt {
                lhs,
                func_name: func_name.into(),
            }),
            live,
            debug_info: None,
        })
    }

    pub fn ptr_null(lhs: TypedVariable) -> Result<Self> {
        let live = live_builder!(uses: [], defs: [Some(lhs.clone())]);
        Ok(Self {
            payload: Payload::PtrNull(PtrNullStmt { lhs }),
            live,
            debug_info: None,
        })
    }

    fn ptr_constraint_live(c: &PtrConstraint) -> LiveSet {
        let mut vars = Vec::new();
        if let PtrOperand::Var(v) = &c.left {
            vars.push(v.clone());
        }
        if let PtrOperand::Var(v) = &c.right {
            vars.push(v.clone());
        }
        live_builder!(uses: [vars], defs: [])
    }

    /// `None` when `constraint` is a statically-known tautology or
    /// contradiction — per spec, such statements are skipped entirely.
    #[must_use]
    pub fn ptr_assume(constraint: PtrConstraint) -> Option<Self> {
        if constraint.is_tautology() || constraint.is_contradiction() {
            return None;
        }
        let live = Self::ptr_constraint_live(&constraint);
        Some(Self {
            payload: Payload::PtrAssume(PtrAssumeStmt { constraint }),
            live,
            debug_info: None,
        })
    }

    #[must_use]
    pub fn ptr_assert(constraint: PtrConstraint) -> Option<Self> {
        if constraint.is_tautology() || constraint.is_contradiction() {
            return None;
        }
        let live = Self::ptr_constraint_live(&constraint);
        Some(Self {
            payload: Payload::PtrAssert(PtrAssertStmt { constraint }),
            live,
            debug_info: None,
        })
    }

    pub fn callsite(func_name: impl Into<String>, lhs: Vec<TypedVariable>, args: Vec<Operand>) -> Result<Self> {
        let mut uses = Vec::new();
        for a in &args {
            uses.extend(vars_of(a));
        }
        let live = live_builder!(uses: [uses], defs: [lhs.clone()]);
        Ok(Self {
            payload: Payload::Callsite(CallsiteStmt {
                func_name: func_name.into(),
                lhs,
                args,
            }),
            live,
            debug_info: None,
        })
    }

    pub fn ret(vars: Vec<TypedVariable>) -> Result<Self> {
        let live = live_builder!(uses: [vars.clone()], defs: []);
        Ok(Self {
            payload: Payload::Return(ReturnStmt { vars }),
            live,
            debug_info: None,
        })
    }

    pub fn bool_bin_op(lhs: TypedVariable, op: BoolOp, left: TypedVariable, right: TypedVariable) -> Result<Self> {
        let live = live_builder!(
            uses: [Some(left.clone()), Some(right.clone())],
            defs: [Some(lhs.clone())],
        );
        Ok(Self {
            payload: Payload::BoolBinOp(BoolBinOpStmt {
                lhs,
                op,
                left,
                right,
            }),
            live,
            debug_info: None,
        })
    }

    pub fn bool_assign_cst(lhs: TypedVariable, constraint: LinCst) -> Result<Self> {
        let live = live_builder!(
            uses: [constraint.vars().cloned().collect::<Vec<_>>()],
            defs: [Some(lhs.clone())],
        );
        Ok(Self {
            payload: Payload::BoolAssignCst(BoolAssignCstStmt { lhs, constraint }),
            live,
            debug_info: None,
        })
    }

    pub fn bool_assign_var(lhs: TypedVariable, rhs: TypedVariable, is_negated: bool) -> Result<Self> {
        let live = live_builder!(
            uses: [Some(rhs.clone())],
            defs: [Some(lhs.clone())],
        );
        Ok(Self {
            payload: Payload::BoolAssignVar(BoolAssignVarStmt {
                lhs,
                rhs,
                is_negated,
            }),
            live,
            debug_info: None,
        })
    }

    pub fn bool_assume(var: TypedVariable, is_negated: bool) -> Result<Self> {
        let live = live_builder!(uses: [Some(var.clone())], defs: []);
        Ok(Self {
            payload: Payload::BoolAssume(BoolAssumeStmt { var, is_negated }),
            live,
            debug_info: None,
        })
    }

    pub fn bool_assert(var: TypedVariable) -> Result<Self> {
        let live = live_builder!(uses: [Some(var.clone())], defs: []);
        Ok(Self {
            payload: Payload::BoolAssert(BoolAssertStmt { var }),
            live,
            debug_info: None,
        })
    }

    pub fn bool_select(lhs: TypedVariable, cond: TypedVariable, left: TypedVariable, right: TypedVariable) -> Result<Self> {
        let live = live_builder!(
            uses: [Some(cond.clone()), Some(left.clone()), Some(right.clone())],
            defs: [Some(lhs.clone())],
        );
        Ok(Self {
            payload: Payload::BoolSelect(BoolSelectStmt {
                lhs,
                cond,
                left,
                right,
            }),
            live,
            debug_info: None,
        })
    }
}

fn bits_of(v: &TypedVariable) -> u32 {
    v.bitwidth().unwrap_or(0)
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::BinOp(s) => write!(f, "{} = {}{}{}", s.lhs.name(), s.left, s.op, s.right),
            Payload::Assign(s) => write!(f, "{} = {}", s.lhs.name(), s.rhs),
            Payload::Assume(s) => write!(f, "assume({})", s.constraint),
            Payload::Unreachable => write!(f, "unreachable"),
            Payload::Select(s) => {
                write!(f, "{} = ite({}, {}, {})", s.lhs.name(), s.cond, s.left, s.right)
            }
            Payload::Assert(s) => write!(f, "assert({})", s.constraint),
            Payload::ArrayInit(s) | Payload::ArrayAssume(s) => write!(
                f,
                "assume(forall l in [{},{}] % {} :: {}[l] = {})",
                s.lb, s.ub, s.elem_size, s.arr.name(), s.val
            ),
            Payload::ArrayStore(s) => write!(f, "array_store({}, {}, {})", s.arr.name(), s.idx, s.value),
            Payload::ArrayLoad(s) => {
                write!(f, "{} = array_load({}, {})", s.lhs.name(), s.arr.name(), s.idx)
            }
            Payload::ArrayAssign(s) => write!(f, "{} = {}", s.lhs_arr.name(), s.rhs_arr.name()),
            Payload::PtrLoad(s) => write!(f, "{} = *({})", s.lhs.name(), s.rhs.name()),
            Payload::PtrStore(s) => write!(f, "*({}) = {}", s.lhs.name(), s.rhs.name()),
            Payload::PtrAssign(s) => {
                write!(f, "{} = &({}) + {}", s.lhs.name(), s.rhs.name(), s.offset)
            }
            Payload::PtrObject(s) => write!(f, "{} = &({})", s.lhs.name(), s.address),
            Payload::PtrFunction(s) => write!(f, "{} = &({})", s.lhs.name(), s.func_name),
            Payload::PtrNull(s) => write!(f, "{} = NULL", s.lhs.name()),
            Payload::PtrAssume(s) => write!(f, "assume({})", s.constraint),
            Payload::PtrAssert(s) => write!(f, "assert({})", s.constraint),
            Payload::Callsite(s) => {
                let lhs = s
                    .lhs
                    .iter()
                    .map(|v| v.name().to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                let args = s
                    .args
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                if lhs.is_empty() {
                    write!(f, "call({}, {})", s.func_name, args)
                } else {
                    write!(f, "{} = call({}, {})", lhs, s.func_name, args)
                }
            }
            Payload::Return(s) => {
                let vars = s
                    .vars
                    .iter()
                    .map(|v| v.name().to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                write!(f, "return {vars}")
            }
            Payload::Havoc(s) => write!(f, "havoc({})", s.lhs.name()),
            Payload::BoolBinOp(s) => {
                write!(f, "{} = {}{}{}", s.lhs.name(), s.left.name(), s.op, s.right.name())
            }
            Payload::BoolAssignCst(s) => write!(f, "{} = {}", s.lhs.name(), s.constraint),
            Payload::BoolAssignVar(s) => {
                if s.is_negated {
                    write!(f, "{} = not({})", s.lhs.name(), s.rhs.name())
                } else {
                    write!(f, "{} = {}", s.lhs.name(), s.rhs.name())
                }
            }
            Payload::BoolAssume(s) => {
                if s.is_negated {
                    write!(f, "assume(not({}))", s.var.name())
                } else {
                    write!(f, "assume({})", s.var.name())
                }
            }
            Payload::BoolSelect(s) => write!(
                f,
                "{} = ite({}, {}, {})",
                s.lhs.name(), s.cond.name(), s.left.name(), s.right.name()
            ),
            Payload::BoolAssert(s) => write!(f, "assert({})", s.var.name()),
            Payload::IntCast(s) => write!(
                f,
                "{} = {} {}:{} to {}:{}",
                s.dst.name(),
                s.op,
                s.src.name(),
                bits_of(&s.src),
                s.dst.name(),
                bits_of(&s.dst),
            ),
        }
    }
}

/// One hook per statement kind; default implementations are no-ops. A block
/// visits its statements in order; a reversed-block view visits them in
/// reverse order.
#[allow(unused_variables)]
pub trait StatementVisitor {
    fn visit_bin_op(&mut self, s: &BinOpStmt) {}
    fn visit_assign(&mut self, s: &AssignStmt) {}
    fn visit_assume(&mut self, s: &AssumeStmt) {}
    fn visit_unreachable(&mut self) {}
    fn visit_select(&mut self, s: &SelectStmt) {}
    fn visit_assert(&mut self, s: &AssertStmt) {}
    fn visit_array_init(&mut self, s: &ArrayFillStmt) {}
    fn visit_array_assume(&mut self, s: &ArrayFillStmt) {}
    fn visit_array_store(&mut self, s: &ArrayStoreStmt) {}
    fn visit_array_load(&mut self, s: &ArrayLoadStmt) {}
    fn visit_array_assign(&mut self, s: &ArrayAssignStmt) {}
    fn visit_ptr_load(&mut self, s: &PtrLoadStmt) {}
    fn visit_ptr_store(&mut self, s: &PtrStoreStmt) {}
    fn visit_ptr_assign(&mut self, s: &PtrAssignStmt) {}
    fn visit_ptr_object(&mut self, s: &PtrObjectStmt) {}
    fn visit_ptr_function(&mut self, s: &PtrFunctionStmt) {}
    fn visit_ptr_null(&mut self, s: &PtrNullStmt) {}
    fn visit_ptr_assume(&mut self, s: &PtrAssumeStmt) {}
    fn visit_ptr_assert(&mut self, s: &PtrAssertStmt) {}
    fn visit_callsite(&mut self, s: &CallsiteStmt) {}
    fn visit_return(&mut self, s: &ReturnStmt) {}
    fn visit_havoc(&mut self, s: &HavocStmt) {}
    fn visit_bool_bin_op(&mut self, s: &BoolBinOpStmt) {}
    fn visit_bool_assign_cst(&mut self, s: &BoolAssignCstStmt) {}
    fn visit_bool_assign_var(&mut self, s: &BoolAssignVarStmt) {}
    fn visit_bool_assume(&mut self, s: &BoolAssumeStmt) {}
    fn visit_bool_select(&mut self, s: &BoolSelectStmt) {}
    fn visit_bool_assert(&mut self, s: &BoolAssertStmt) {}
    fn visit_int_cast(&mut self, s: &IntCastStmt) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;
    use crate::var::VarFactory;

    fn var(f: &VarFactory, key: &str, ty: Type) -> TypedVariable {
        TypedVariable::new(f.lookup(key), ty)
    }

    #[test]
    fn bin_op_live_set_and_render() {
        let f = VarFactory::new();
        let x = var(&f, "x", Type::int(32));
        let y = var(&f, "y", Type::int(32));
        let stmt = Statement::bin_op(
            y.clone(),
            BinOp::Add,
            Operand::Var(x.clone()),
            Operand::Const(1),
        )
        .unwrap();
        assert_eq!(stmt.kind(), Kind::BinOp);
        assert_eq!(stmt.live().uses(), &[x]);
        assert_eq!(stmt.live().defs(), &[y]);
        assert_eq!(stmt.to_string(), "y = x+1");
    }

    #[test]
    fn ptr_load_keeps_lhs_in_uses_only() {
        let f = VarFactory::new();
        let p = var(&f, "p", Type::Ptr);
        let q = var(&f, "q", Type::Ptr);
        let stmt = Statement::ptr_load(p.clone(), q.clone()).unwrap();
        assert_eq!(stmt.live().uses(), &[p, q]);
        assert!(stmt.live().defs().is_empty());
    }

    #[test]
    fn int_cast_rejects_bad_width() {
        let f = VarFactory::new();
        let src = var(&f, "src", Type::int(8));
        let dst = var(&f, "dst", Type::int(32));
        assert!(Statement::int_cast(CastOp::Trunc, src, dst).is_err());
    }

    #[test]
    fn ptr_assume_skips_tautology() {
        let f = VarFactory::new();
        let p = var(&f, "p", Type::Ptr);
        let c = PtrConstraint::new(
            PtrOperand::Var(p.clone()),
            Relation::Eq,
            PtrOperand::Var(p),
        );
        assert!(Statement::ptr_assume(c).is_none());
    }

    #[test]
    fn live_set_dedups_and_preserves_order() {
        let f = VarFactory::new();
        let x = var(&f, "x", Type::int(32));
        let stmt = Statement::bin_op(
            x.clone(),
            BinOp::Add,
            Operand::Var(x.clone()),
            Operand::Var(x.clone()),
        )
        .unwrap();
        assert_eq!(stmt.live().uses(), &[x]);
    }
}

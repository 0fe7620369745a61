//! Typed three-address IR and control-flow-graph construction layer for
//! abstract interpretation.
//!
//! A front-end builds CFGs out of typed statements on basic blocks; this
//! crate owns the statement algebra, block/CFG data structures, CFG
//! simplification, and a type checker. Fixpoint solvers, abstract
//! domains, interprocedural analyzers, and front-ends are external
//! collaborators that consume CFGs through the visitor contract in
//! [`statement::StatementVisitor`] and the iteration contract on
//! [`cfg::Cfg`].

/// Variable factory and indexed names.
pub mod var;
/// The flat type lattice and typed variables.
pub mod types;
/// Minimal linear-expression/constraint surface.
pub mod number;
/// The statement algebra.
pub mod statement;
/// Basic blocks.
pub mod block;
/// The owning control-flow graph.
pub mod cfg;
/// Copyable CFG handle.
pub mod cfg_ref;
/// Reversed, read-only CFG view.
pub mod cfg_rev;
/// Type-checking visitor.
pub mod typecheck;
/// Structural hash over a function declaration's signature.
pub mod hash;
/// Crate-wide error type.
pub mod error;

pub use crate::block::{BasicBlock, Precision};
pub use crate::cfg::{Cfg, FunctionDecl};
pub use crate::cfg_ref::CfgRef;
pub use crate::cfg_rev::CfgRev;
pub use crate::error::{Error, Result};
pub use crate::number::{LinCst, LinExp, Relation};
pub use crate::statement::{Kind, Statement, StatementVisitor};
pub use crate::types::{Type, TypedVariable};
pub use crate::var::{IndexedName, VarFactory};

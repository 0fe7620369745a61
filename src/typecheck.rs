//! A single visitor pass enforcing the type lattice's rules (spec §4.7).
//! Calls, returns, pointer, and array kinds pass through unchecked: they
//! are validated by collaborators outside this layer.

use std::fmt;
use std::hash::Hash;

use crate::block::BasicBlock;
use crate::cfg::Cfg;
use crate::error::{Error, Result};
use crate::statement::{
    AssertStmt, AssignStmt, AssumeStmt, BinOpStmt, BoolAssertStmt, BoolAssignCstStmt, BoolAssignVarStmt,
    BoolAssumeStmt, BoolBinOpStmt, BoolSelectStmt, IntCastStmt, Operand, SelectStmt, StatementVisitor,
};
use crate::types::{Type, TypedVariable};

/// Same type *tag*, ignoring bit-width (`Int(32)` and `Int(64)` are the
/// same tag). Spec §4.7 keeps this deliberately separate from `same_bw`:
/// a bitwidth mismatch between two same-tagged ints must be reported as
/// a bitwidth error, not a type error.
fn same_type(a: Type, b: Type) -> bool {
    std::mem::discriminant(&a) == std::mem::discriminant(&b)
}

fn same_bw(a: &TypedVariable, b: &TypedVariable) -> bool {
    a.bitwidth() == b.bitwidth()
}

fn is_numeric_lhs(ty: Type) -> bool {
    matches!(ty, Type::Int(w) if w > 1) || ty == Type::Real
}

/// Runs the type-checking visitor over every statement in every block of
/// `cfg`, entry-first. Returns the first violation encountered.
pub fn check<L: Clone + Eq + Hash + Ord + fmt::Display>(cfg: &Cfg<L>) -> Result<()> {
    for label in cfg.labels() {
        check_block(cfg.get_node(label))?;
    }
    Ok(())
}

fn check_block<L: Clone + Eq + Hash + Ord + fmt::Display>(block: &BasicBlock<L>) -> Result<()> {
    let mut checker = TypeChecker::default();
    for stmt in block.iter() {
        stmt.accept(&mut checker);
        if let Some(err) = checker.error.take() {
            return Err(err);
        }
    }
    Ok(())
}

#[derive(Default)]
struct TypeChecker {
    error: Option<Error>,
}

impl TypeChecker {
    fn fail(&mut self, kind: &'static str, message: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(Error::TypeCheck {
                kind,
                message: message.into(),
            });
        }
    }

    fn check_operand_matches(&mut self, kind: &'static str, lhs: &TypedVariable, operand: &Operand) {
        if let Operand::Var(v) = operand {
            if !same_type(v.get_type(), lhs.get_type()) {
                self.fail(
                    kind,
                    format!("operand `{v}` has type {} but lhs has type {}", v.get_type(), lhs.get_type()),
                );
            } else if !same_bw(v, lhs) {
                self.fail(
                    kind,
                    format!(
                        "operand `{v}` has bitwidth {:?} but lhs `{lhs}` has bitwidth {:?}",
                        v.bitwidth(),
                        lhs.bitwidth()
                    ),
                );
            }
        }
    }
}

impl StatementVisitor for TypeChecker {
    fn visit_bin_op(&mut self, s: &BinOpStmt) {
        if !is_numeric_lhs(s.lhs.get_type()) {
            self.fail("bin_op", format!("lhs `{}` must be int(>1) or real", s.lhs));
            return;
        }
        self.check_operand_matches("bin_op", &s.lhs, &s.left);
        self.check_operand_matches("bin_op", &s.lhs, &s.right);
    }

    fn visit_assign(&mut self, s: &AssignStmt) {
        if !is_numeric_lhs(s.lhs.get_type()) {
            self.fail("assign", format!("lhs `{}` must be int(>1) or real", s.lhs));
            return;
        }
        for v in s.rhs.vars() {
            if !same_type(v.get_type(), s.lhs.get_type()) || !same_bw(v, &s.lhs) {
                self.fail(
                    "assign",
                    format!("rhs variable `{v}` does not match lhs `{}` in type/bitwidth", s.lhs),
                );
                return;
            }
        }
    }

    fn visit_assume(&mut self, s: &AssumeStmt) {
        check_consistent_numeric("assume", &mut self.error, s.constraint.vars());
    }

    fn visit_assert(&mut self, s: &AssertStmt) {
        check_consistent_numeric("assert", &mut self.error, s.constraint.vars());
    }

    fn visit_select(&mut self, s: &SelectStmt) {
        if !is_numeric_lhs(s.lhs.get_type()) {
            self.fail("select", format!("lhs `{}` must be int(>1) or real", s.lhs));
            return;
        }
        self.check_operand_matches("select", &s.lhs, &s.left);
        self.check_operand_matches("select", &s.lhs, &s.right);
        let mut cond_vars = s.cond.vars();
        if let Some(first) = cond_vars.next() {
            if !is_numeric_lhs(first.get_type()) {
                self.fail("select", format!("condition variable `{first}` must be numeric"));
                return;
            }
            if !same_type(first.get_type(), s.lhs.get_type()) {
                self.fail(
                    "select",
                    format!("condition variable `{first}` must match lhs `{}` in type", s.lhs),
                );
                return;
            }
            for other in cond_vars {
                if !same_type(other.get_type(), first.get_type()) || !same_bw(other, first) {
                    self.fail(
                        "select",
                        format!("condition variables `{first}` and `{other}` disagree in type/bitwidth"),
                    );
                    return;
                }
            }
        }
    }

    fn visit_int_cast(&mut self, s: &IntCastStmt) {
        let (src_bits, dst_bits) = (s.src.bitwidth().unwrap_or(0), s.dst.bitwidth().unwrap_or(0));
        use crate::statement::CastOp;
        match s.op {
            CastOp::Trunc => {
                if !matches!(s.src.get_type(), Type::Int(_)) {
                    self.fail("int_cast", format!("trunc src `{}` must be int", s.src));
                    return;
                }
                let dst_ok = match s.dst.get_type() {
                    Type::Bool => dst_bits == 1,
                    Type::Int(w) => w > 1,
                    _ => false,
                };
                if !dst_ok {
                    self.fail("int_cast", format!("trunc dst `{}` must be bool(bw=1) or int(>1)", s.dst));
                    return;
                }
                if !(src_bits > dst_bits) {
                    self.fail(
                        "int_cast",
                        format!("trunc requires src bitwidth {src_bits} > dst bitwidth {dst_bits}"),
                    );
                }
            }
            CastOp::Sext | CastOp::Zext => {
                if !matches!(s.dst.get_type(), Type::Int(w) if w > 1) {
                    self.fail("int_cast", format!("{:?} dst `{}` must be int(>1)", s.op, s.dst));
                    return;
                }
                let src_ok = matches!(s.src.get_type(), Type::Int(_) | Type::Bool);
                if !src_ok {
                    self.fail("int_cast", format!("{:?} src `{}` must be int or bool", s.op, s.src));
                    return;
                }
                if !(dst_bits > src_bits) {
                    self.fail(
                        "int_cast",
                        format!("{:?} requires dst bitwidth {dst_bits} > src bitwidth {src_bits}", s.op),
                    );
                }
            }
        }
    }

    fn visit_bool_bin_op(&mut self, s: &BoolBinOpStmt) {
        for v in [&s.lhs, &s.left, &s.right] {
            if !v.get_type().is_bool() || v.bitwidth() != Some(1) {
                self.fail("bool_bin_op", format!("operand `{v}` must be bool(bw=1)"));
                return;
            }
        }
    }

    fn visit_bool_assign_cst(&mut self, s: &BoolAssignCstStmt) {
        if !s.lhs.get_type().is_bool() {
            self.fail("bool_assign_cst", format!("lhs `{}` must be bool", s.lhs));
        }
    }

    fn visit_bool_assign_var(&mut self, s: &BoolAssignVarStmt) {
        for v in [&s.lhs, &s.rhs] {
            if !v.get_type().is_bool() || v.bitwidth() != Some(1) {
                self.fail("bool_assign_var", format!("operand `{v}` must be bool(bw=1)"));
                return;
            }
        }
    }

    fn visit_bool_assume(&mut self, s: &BoolAssumeStmt) {
        if !s.var.get_type().is_bool() || s.var.bitwidth() != Some(1) {
            self.fail("bool_assume", format!("operand `{}` must be bool(bw=1)", s.var));
        }
    }

    fn visit_bool_assert(&mut self, s: &BoolAssertStmt) {
        if !s.var.get_type().is_bool() || s.var.bitwidth() != Some(1) {
            self.fail("bool_assert", format!("operand `{}` must be bool(bw=1)", s.var));
        }
    }

    fn visit_bool_select(&mut self, s: &BoolSelectStmt) {
        for v in [&s.lhs, &s.cond, &s.left, &s.right] {
            if !v.get_type().is_bool() || v.bitwidth() != Some(1) {
                self.fail("bool_select", format!("operand `{v}` must be bool(bw=1)"));
                return;
            }
        }
    }
}

fn check_consistent_numeric<'a>(
    kind: &'static str,
    error: &mut Option<Error>,
    mut vars: impl Iterator<Item = &'a TypedVariable>,
) {
    if error.is_some() {
        return;
    }
    let Some(first) = vars.next() else {
        return;
    };
    if !is_numeric_lhs(first.get_type()) {
        *error = Some(Error::TypeCheck {
            kind,
            message: format!("variable `{first}` must be numeric"),
        });
        return;
    }
    for other in vars {
        if !same_type(other.get_type(), first.get_type()) || !same_bw(other, first) {
            *error = Some(Error::TypeCheck {
                kind,
                message: format!("variables `{first}` and `{other}` disagree in type/bitwidth"),
            });
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Precision;
    use crate::statement::Operand;
    use crate::var::VarFactory;

    fn var(f: &VarFactory, key: &str, ty: Type) -> TypedVariable {
        TypedVariable::new(f.lookup(key), ty)
    }

    /// Scenario S6: a `bin_op` mixing bitwidths fails, naming "bitwidth".
    #[test]
    fn bitwidth_mismatch_is_reported() {
        let f = VarFactory::new();
        let lhs = var(&f, "x", Type::int(32));
        let rhs = var(&f, "y", Type::int(64));
        let mut cfg: Cfg<&str> = Cfg::new("entry", Precision::Num);
        cfg.get_node_mut(&"entry")
            .bin_op(lhs, crate::statement::BinOp::Add, Operand::Var(rhs), Operand::Const(1))
            .unwrap();

        let err = check(&cfg).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("bitwidth"));
    }

    #[test]
    fn well_typed_cfg_passes_twice() {
        let f = VarFactory::new();
        let x = var(&f, "x", Type::int(32));
        let y = var(&f, "y", Type::int(32));
        let mut cfg: Cfg<&str> = Cfg::new("entry", Precision::Num);
        cfg.get_node_mut(&"entry")
            .add(y, Operand::Var(x), Operand::Const(1))
            .unwrap();

        check(&cfg).unwrap();
        check(&cfg).unwrap();
    }

    #[test]
    fn bool_kind_requires_bw1_bool() {
        let f = VarFactory::new();
        let x = var(&f, "x", Type::int(32));
        let mut cfg: Cfg<&str> = Cfg::new("entry", Precision::Num);
        cfg.get_node_mut(&"entry").bool_assert(x).unwrap();

        assert!(check(&cfg).is_err());
    }
}

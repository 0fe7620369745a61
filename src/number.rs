//! Minimal linear-expression / linear-constraint surface.
//!
//! The full algebraic and normal-form machinery for these types lives in an
//! external numerics module that this crate only references (per spec: "0%
//! share, external"). What's here is just enough to construct, inspect, and
//! render statements and to drive the type checker in tests.

use std::fmt;

use crate::types::TypedVariable;

/// `constant + Σ coeff·var`, in the order terms were added.
#[derive(Debug, Clone, Default)]
pub struct LinExp {
    constant: i64,
    terms: Vec<(i64, TypedVariable)>,
}

impl LinExp {
    #[must_use]
    pub fn constant(value: i64) -> Self {
        Self {
            constant: value,
            terms: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_var(var: TypedVariable) -> Self {
        Self {
            constant: 0,
            terms: vec![(1, var)],
        }
    }

    #[must_use]
    pub fn with_term(mut self, coeff: i64, var: TypedVariable) -> Self {
        self.terms.push((coeff, var));
        self
    }

    /// `true` if this expression is a bare constant with no variable terms.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    /// `true` if this expression is exactly one variable with coefficient 1
    /// and no constant offset — the "single variable" form required by
    /// `array_assume`/`array_store` operands.
    #[must_use]
    pub fn as_single_variable(&self) -> Option<&TypedVariable> {
        match self.terms.as_slice() {
            [(1, var)] if self.constant == 0 => Some(var),
            _ => None,
        }
    }

    /// Distinct variables referenced, in first-use order.
    pub fn vars(&self) -> impl Iterator<Item = &TypedVariable> {
        self.terms.iter().map(|(_, v)| v)
    }
}

impl fmt::Display for LinExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote = false;
        for (coeff, var) in &self.terms {
            if wrote {
                write!(f, "+")?;
            }
            if *coeff == 1 {
                write!(f, "{}", var.name())?;
            } else {
                write!(f, "{coeff}*{}", var.name())?;
            }
            wrote = true;
        }
        if self.constant != 0 || !wrote {
            if wrote {
                write!(f, "+")?;
            }
            write!(f, "{}", self.constant)?;
        }
        Ok(())
    }
}

/// Comparison operator of a [`LinCst`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Neq,
    Lt,
    Leq,
    Gt,
    Geq,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Leq => "<=",
            Self::Gt => ">",
            Self::Geq => ">=",
        })
    }
}

/// `lin_exp REL 0`.
#[derive(Debug, Clone)]
pub struct LinCst {
    exp: LinExp,
    rel: Relation,
}

impl LinCst {
    #[must_use]
    pub fn new(exp: LinExp, rel: Relation) -> Self {
        Self { exp, rel }
    }

    pub fn vars(&self) -> impl Iterator<Item = &TypedVariable> {
        self.exp.vars()
    }

    #[must_use]
    pub fn relation(&self) -> Relation {
        self.rel
    }
}

impl fmt::Display for LinCst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} 0", self.exp, self.rel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;
    use crate::var::VarFactory;

    #[test]
    fn single_variable_detection() {
        let f = VarFactory::new();
        let v = TypedVariable::new(f.lookup("x"), Type::int(32));
        let exp = LinExp::from_var(v.clone());
        assert!(exp.as_single_variable().is_some());

        let not_single = LinExp::constant(3).with_term(2, v);
        assert!(not_single.as_single_variable().is_none());
    }

    #[test]
    fn display_constraint() {
        let f = VarFactory::new();
        let v = TypedVariable::new(f.lookup("x"), Type::int(32));
        let cst = LinCst::new(LinExp::from_var(v), Relation::Geq);
        assert_eq!(cst.to_string(), "x >= 0");
    }
}

//! Structural hash over a function declaration's `(name, input types,
//! output types)` signature — used to equate CFGs by ABI rather than by
//! identity or by the contents of their blocks.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::collections::hash_map::DefaultHasher;

use crate::cfg::Cfg;
use crate::error::{Error, Result};
use crate::types::Type;

/// Hash `cfg`'s function-declaration signature. Two CFGs with the same
/// `(name, input types, output types)` hash identically regardless of
/// variable names, block layout, or statement contents. Returns
/// [`Error::NoFunctionDeclaration`] when `cfg` carries no declaration —
/// the one recoverable error in this crate (see DESIGN.md).
pub fn signature_hash<L: Clone + Eq + std::hash::Hash + Ord + fmt::Display>(cfg: &Cfg<L>) -> Result<u64> {
    let decl = cfg.function_decl().ok_or(Error::NoFunctionDeclaration)?;
    let mut hasher = DefaultHasher::new();
    decl.name().hash(&mut hasher);
    let input_types: Vec<Type> = decl.inputs().iter().map(crate::types::TypedVariable::get_type).collect();
    let output_types: Vec<Type> = decl.outputs().iter().map(crate::types::TypedVariable::get_type).collect();
    input_types.hash(&mut hasher);
    output_types.hash(&mut hasher);
    Ok(hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Precision;
    use crate::cfg::FunctionDecl;
    use crate::types::TypedVariable;
    use crate::var::VarFactory;

    #[test]
    fn no_declaration_is_an_error() {
        let cfg: Cfg<&str> = Cfg::new("entry", Precision::Num);
        assert_eq!(signature_hash(&cfg), Err(Error::NoFunctionDeclaration));
    }

    #[test]
    fn same_signature_hashes_equal_regardless_of_names() {
        let f1 = VarFactory::new();
        let f2 = VarFactory::new();

        let mut a: Cfg<&str> = Cfg::new("entry", Precision::Num);
        a.set_function_decl(
            FunctionDecl::new(
                "f",
                vec![TypedVariable::new(f1.lookup("x"), Type::int(32))],
                vec![TypedVariable::new(f1.lookup("y"), Type::int(32))],
            )
            .unwrap(),
        );

        let mut b: Cfg<&str> = Cfg::new("entry", Precision::Num);
        b.set_function_decl(
            FunctionDecl::new(
                "f",
                vec![TypedVariable::new(f2.lookup("p"), Type::int(32))],
                vec![TypedVariable::new(f2.lookup("q"), Type::int(32))],
            )
            .unwrap(),
        );

        assert_eq!(signature_hash(&a).unwrap(), signature_hash(&b).unwrap());
    }

    #[test]
    fn differing_signature_hashes_differ() {
        let f = VarFactory::new();
        let mut a: Cfg<&str> = Cfg::new("entry", Precision::Num);
        a.set_function_decl(FunctionDecl::new("f", vec![], vec![]).unwrap());

        let mut b: Cfg<&str> = Cfg::new("entry", Precision::Num);
        b.set_function_decl(
            FunctionDecl::new("f", vec![TypedVariable::new(f.lookup("x"), Type::int(32))], vec![]).unwrap(),
        );

        assert_ne!(signature_hash(&a).unwrap(), signature_hash(&b).unwrap());
    }
}

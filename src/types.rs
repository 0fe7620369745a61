//! The flat type lattice and typed variables.

use std::fmt;

use crate::var::IndexedName;

/// A ground type in the flat lattice `{bool, int(w), real, ptr, ref}` plus
/// array variants of the scalar kinds. Arrays are opaque, uni-dimensional,
/// and identified only by element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    Int(u32),
    Real,
    Ptr,
    Ref,
    ArrBool,
    ArrInt,
    ArrReal,
    ArrPtr,
}

impl Type {
    /// Bit-width carried by `Bool` (always 1) and `Int` (always > 1).
    /// `None` for every other type.
    #[must_use]
    pub fn bitwidth(self) -> Option<u32> {
        match self {
            Self::Bool => Some(1),
            Self::Int(w) => Some(w),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int(_) | Self::Real)
    }

    #[must_use]
    pub fn is_array(self) -> bool {
        matches!(
            self,
            Self::ArrBool | Self::ArrInt | Self::ArrReal | Self::ArrPtr
        )
    }

    #[must_use]
    pub fn is_bool(self) -> bool {
        matches!(self, Self::Bool)
    }

    #[must_use]
    pub fn is_ptr(self) -> bool {
        matches!(self, Self::Ptr)
    }

    /// Construct an `Int` type, panicking if `width <= 1` (the lattice
    /// requires integer bit-widths strictly greater than one).
    #[must_use]
    pub fn int(width: u32) -> Self {
        assert!(width > 1, "int bitwidth must be > 1, got {width}");
        Self::Int(width)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int(w) => write!(f, "int{w}"),
            Self::Real => write!(f, "real"),
            Self::Ptr => write!(f, "ptr"),
            Self::Ref => write!(f, "ref"),
            Self::ArrBool => write!(f, "arr(bool)"),
            Self::ArrInt => write!(f, "arr(int)"),
            Self::ArrReal => write!(f, "arr(real)"),
            Self::ArrPtr => write!(f, "arr(ptr)"),
        }
    }
}

/// A `(name, type[, bitwidth])` triple with value semantics.
#[derive(Debug, Clone)]
pub struct TypedVariable {
    name: IndexedName,
    ty: Type,
}

impl TypedVariable {
    #[must_use]
    pub fn new(name: IndexedName, ty: Type) -> Self {
        Self { name, ty }
    }

    #[must_use]
    pub fn name(&self) -> &IndexedName {
        &self.name
    }

    #[must_use]
    pub fn get_type(&self) -> Type {
        self.ty
    }

    #[must_use]
    pub fn bitwidth(&self) -> Option<u32> {
        self.ty.bitwidth()
    }

    /// Same type and (when applicable) the same bit-width as `other`.
    #[must_use]
    pub fn same_type_and_width(&self, other: &Self) -> bool {
        self.ty == other.ty
    }
}

impl PartialEq for TypedVariable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.ty == other.ty
    }
}
impl Eq for TypedVariable {}

impl fmt::Display for TypedVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::VarFactory;

    #[test]
    fn bool_bitwidth_is_always_one() {
        assert_eq!(Type::Bool.bitwidth(), Some(1));
    }

    #[test]
    #[should_panic(expected = "bitwidth must be > 1")]
    fn int_width_one_panics() {
        let _ = Type::int(1);
    }

    #[test]
    fn display_format() {
        let f = VarFactory::new();
        let v = TypedVariable::new(f.lookup("x"), Type::int(32));
        assert_eq!(v.to_string(), "x:int32");
    }
}

use std::{error, fmt};

/// Crate-wide error type.
///
/// Per the design of this layer, almost every variant here represents a
/// front-end or analyzer bug rather than a recoverable condition: callers
/// are expected to treat most `Err` results as fatal (see [`crate::fatal`]).
/// The sole exception is [`Error::NoFunctionDeclaration`], which ordinary
/// library use can legitimately hit (hashing a declaration-less CFG).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A statement kind was constructed with a left-hand side or operand of
    /// the wrong type (e.g. a non-array variable passed to an array kind).
    TypeMismatch {
        expected: &'static str,
        found: String,
    },
    /// `array_assign` between arrays of differing element type.
    ArrayElementTypeMismatch,
    /// `int_cast` bit-width rule violated (see spec §4.7).
    InvalidCastWidth {
        op: &'static str,
        src_bits: u32,
        dst_bits: u32,
    },
    /// Function declaration's input and output variable sets are not disjoint.
    OverlappingParams,
    /// `get_node`/`next_nodes`/`prev_nodes` on an unknown label.
    UnknownLabel(String),
    /// `exit()` requested on a CFG (or reversed view) without an exit block.
    NoExitBlock,
    /// `arg(idx)` out of bounds on a callsite or declaration.
    ArgOutOfBounds { index: usize, len: usize },
    /// Type-checker violation. `message` names the offending statement kind
    /// and the nature of the mismatch (bit-width, type, or both).
    TypeCheck { kind: &'static str, message: String },
    /// Operation attempted on a default-constructed, empty `CfgRef`.
    EmptyCfgRef,
    /// Hashing a CFG that has no function declaration attached.
    NoFunctionDeclaration,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {expected}, found {found}")
            }
            Self::ArrayElementTypeMismatch => {
                write!(f, "array_assign between arrays of differing element type")
            }
            Self::InvalidCastWidth {
                op,
                src_bits,
                dst_bits,
            } => write!(
                f,
                "invalid bitwidth for {op}: src has bitwidth {src_bits}, dst has bitwidth {dst_bits}"
            ),
            Self::OverlappingParams => {
                write!(f, "function declaration inputs and outputs are not disjoint")
            }
            Self::UnknownLabel(label) => write!(f, "no such block `{label}`"),
            Self::NoExitBlock => write!(f, "CFG has no exit block"),
            Self::ArgOutOfBounds { index, len } => {
                write!(f, "argument index {index} out of bounds (len {len})")
            }
            Self::TypeCheck { kind, message } => {
                write!(f, "type error in `{kind}`: {message}")
            }
            Self::EmptyCfgRef => write!(f, "operation on an empty cfg_ref"),
            Self::NoFunctionDeclaration => {
                write!(f, "CFG has no function declaration to hash")
            }
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Report an unrecoverable front-end/analyzer bug and terminate the process.
///
/// Used at the handful of call sites the specification names as fatal
/// (e.g. `get_node` on an unknown label) rather than recoverable.
#[cold]
#[track_caller]
pub fn fatal(err: Error) -> ! {
    panic!("cfg-ir: fatal error: {err}");
}

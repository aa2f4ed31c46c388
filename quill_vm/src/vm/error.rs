//! Runtime errors raised by the dispatch loop.

use crate::image::ImageError;
use crate::value::ValueKind;

/// Every way a running program can fail.
///
/// An error terminates the dispatch loop that raised it and is reported
/// exactly once through the interpreter's print sink, except assertion
/// failures which go through the assert sink instead.
#[derive(Debug)]
pub enum VmError {
    /// The image (or a function body's embedded sections) was malformed.
    Image(ImageError),
    UnknownOpcode(u8),
    BadArithmetic(String),
    DivideByZero,
    /// A string operation would exceed the 4096 byte limit.
    StringOverflow { length: usize },
    BadType(String),
    /// Casting a null value.
    BadCast,
    Undeclared(String),
    Redeclared(String),
    /// A write violated the variable's declared type.
    TypeMismatch(String),
    ConstViolation(String),
    BadCall(String),
    TooManyReturns(usize),
    JumpOutOfRange { target: usize, length: usize },
    /// Null reached a conditional jump.
    NullCompare,
    AssertionFailed(String),
    /// Compiler-bug conditions such as operand stack underflow.
    Internal(String),
}

impl std::fmt::Display for VmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image(e) => write!(f, "{}", e),
            Self::UnknownOpcode(op) => write!(f, "unknown opcode {} found, terminating", op),
            Self::BadArithmetic(msg) => write!(f, "bad arithmetic argument ({})", msg),
            Self::DivideByZero => write!(f, "can't divide by zero"),
            Self::StringOverflow { length } => write!(
                f,
                "can't concatenate these strings (result of {} bytes is too long)",
                length
            ),
            Self::BadType(msg) => write!(f, "{}", msg),
            Self::BadCast => write!(f, "can't cast a null value"),
            Self::Undeclared(name) => write!(f, "undeclared variable \"{}\"", name),
            Self::Redeclared(name) => write!(f, "can't redefine the variable \"{}\"", name),
            Self::TypeMismatch(name) => {
                write!(f, "incorrect type assigned to variable \"{}\"", name)
            }
            Self::ConstViolation(name) => {
                write!(f, "can't assign to the constant \"{}\"", name)
            }
            Self::BadCall(msg) => write!(f, "{}", msg),
            Self::TooManyReturns(count) => write!(
                f,
                "too many values returned ({}; multiple returns not yet implemented)",
                count
            ),
            Self::JumpOutOfRange { target, length } => {
                write!(f, "jump out of range (target {}, length {})", target, length)
            }
            Self::NullCompare => write!(f, "null detected in comparison"),
            Self::AssertionFailed(msg) => write!(f, "assertion failure: {}", msg),
            Self::Internal(msg) => write!(f, "[internal] {}", msg),
        }
    }
}

impl std::error::Error for VmError {}

impl From<ImageError> for VmError {
    fn from(e: ImageError) -> Self {
        Self::Image(e)
    }
}

impl VmError {
    /// Helper for the recurring "lhs kind and rhs kind" arithmetic message.
    pub(crate) fn bad_operands(lhs: ValueKind, rhs: ValueKind) -> Self {
        Self::BadArithmetic(format!("{} and {}", lhs, rhs))
    }
}

//! Wire-level opcode and literal tag definitions.
//!
//! The numeric values here are fixed by the compiler/interpreter pair: a
//! Quill bytecode image is only meaningful to an interpreter built with the
//! same table. Byte-to-enum conversion goes through `num_enum`, so an
//! out-of-table byte surfaces as a conversion error instead of a panic.

use num_enum::TryFromPrimitive;

/// One opcode of the code section.
///
/// Operand encodings (read from the bytecode stream, little-endian):
/// - `Literal`: u8 pool index; `LiteralLong`: u16 pool index
/// - `VarDecl`/`FnDecl`: u8 identifier index, u8 second index
///   (`*Long` variants take u16 for both)
/// - `Jump`/`IfFalseJump`: u16 target, relative to the current code start
///
/// Everything else takes its operands from the operand stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    Eof = 0,
    Assert = 1,
    Print = 2,
    Literal = 3,
    LiteralLong = 4,
    LiteralRaw = 5,
    Negate = 6,
    Invert = 7,
    Addition = 8,
    Subtraction = 9,
    Multiplication = 10,
    Division = 11,
    Modulo = 12,
    VarAdditionAssign = 13,
    VarSubtractionAssign = 14,
    VarMultiplicationAssign = 15,
    VarDivisionAssign = 16,
    VarModuloAssign = 17,
    GroupingBegin = 18,
    GroupingEnd = 19,
    ScopeBegin = 20,
    ScopeEnd = 21,
    VarDecl = 22,
    VarDeclLong = 23,
    FnDecl = 24,
    FnDeclLong = 25,
    VarAssign = 26,
    TypeCast = 27,
    CompareEqual = 28,
    CompareNotEqual = 29,
    CompareLess = 30,
    CompareLessEqual = 31,
    CompareGreater = 32,
    CompareGreaterEqual = 33,
    And = 34,
    Or = 35,
    Jump = 36,
    IfFalseJump = 37,
    FnCall = 38,
    FnReturn = 39,
    FnEnd = 40,
    /// Terminates the header, literal, and function sections.
    SectionEnd = 0xFF,
}

/// Tag byte introducing one entry of the literal section.
///
/// The numbering leaves gaps for tags that exist in the compiler's type
/// lattice but are not valid in an image: opaque host values (10), the
/// unconstrained `any` marker (11), and the dictionary/function build-time
/// intermediates (13, 14). The image reader rejects those bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum LiteralTag {
    Null = 0,
    Boolean = 1,
    Integer = 2,
    Float = 3,
    String = 4,
    Array = 5,
    Dictionary = 6,
    Function = 7,
    Identifier = 8,
    Type = 9,
    /// A type whose payload carries subtype pool indices (array element
    /// type, dictionary key/value types). Resolved while the literal
    /// section is read; never present in a loaded pool.
    TypeIntermediate = 12,
}

//! Quill bytecode virtual machine.
//!
//! The execution core of the Quill scripting language: a stack-based VM
//! that consumes a compact, versioned binary image and drives a program to
//! completion. This crate covers:
//!
//! - `Value`: the tagged runtime value and its operations
//! - `LiteralArray` / `LiteralDictionary`: the value containers
//! - `Scope`: the lexical scope chain
//! - `image`: the binary image reader and its error type
//! - `Interpreter`: the opcode dispatch loop, arithmetic and comparison
//!   operators, control flow, and function call/return
//!
//! The lexer, parser, compiler, and CLI live elsewhere; this crate only
//! ever sees finished images.
//!
//! # Example
//!
//! ```no_run
//! use quill_vm::{Interpreter, VmConfig};
//!
//! let image = quill_vm::image::load_file("program.qbi").unwrap();
//! let mut interpreter = Interpreter::new(VmConfig::default());
//! let _ = interpreter.run(&image);
//! ```

pub mod image;
pub mod opcode;
pub mod scope;
pub mod value;
pub mod vm;

// Re-exports
pub use image::{ImageError, ImageHeader, ImageReader};
pub use opcode::{LiteralTag, Opcode};
pub use scope::{Scope, ScopeHandle};
pub use value::{
    hash_literal, hash_string, literals_are_equal, FunctionValue, IdentifierValue, LiteralArray,
    LiteralDictionary, TypeValue, Value, ValueKind, MAX_STRING_LENGTH,
};
pub use vm::{Interpreter, OutputFn, VmConfig, VmError};

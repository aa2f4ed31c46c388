//! VM execution loop.
//!
//! The loop reads one opcode byte at a time and dispatches to a handler
//! method; handler logic lives in one module per opcode family. A handler
//! error terminates the current dispatch loop.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod arithmetic;
mod call;
mod comparison;
mod conversion;
mod jump;
mod literals;
mod locals;
mod print;

use super::error::VmError;
use super::Interpreter;
use crate::opcode::Opcode;
use crate::scope::Scope;

/// Result of dispatching a single opcode.
pub(super) enum Flow {
    /// Continue with the next opcode.
    Continue,
    /// Leave the current dispatch loop (function return).
    Exit,
}

impl Interpreter {
    /// Run opcodes until a terminator, a return, or an error.
    ///
    /// Grouping and function calls re-enter this loop recursively. On
    /// entry the current cursor becomes the code start that jump targets
    /// are measured from; grouping recursion saves and restores it so that
    /// targets stay relative to the enclosing code section.
    pub(crate) fn dispatch_loop(&mut self) -> Result<(), VmError> {
        self.code_start = self.count;
        loop {
            let byte = self.read_byte()?;
            let opcode =
                Opcode::try_from(byte).map_err(|_| VmError::UnknownOpcode(byte))?;

            if self.config.verbose {
                eprintln!("ip={}, opcode={:?}", self.count - 1, opcode);
            }

            match opcode {
                Opcode::Eof | Opcode::SectionEnd | Opcode::FnEnd => return Ok(()),
                Opcode::GroupingEnd => return Ok(()),
                other => match self.dispatch(other)? {
                    Flow::Continue => {}
                    Flow::Exit => return Ok(()),
                },
            }
        }
    }

    fn dispatch(&mut self, opcode: Opcode) -> Result<Flow, VmError> {
        match opcode {
            Opcode::Assert => self.exec_assert()?,
            Opcode::Print => self.exec_print()?,

            Opcode::Literal => self.exec_push_literal(false)?,
            Opcode::LiteralLong => self.exec_push_literal(true)?,
            Opcode::LiteralRaw => self.exec_literal_raw()?,

            Opcode::Negate => self.exec_negate()?,
            Opcode::Invert => self.exec_invert()?,

            Opcode::Addition
            | Opcode::Subtraction
            | Opcode::Multiplication
            | Opcode::Division
            | Opcode::Modulo => self.exec_arithmetic(opcode)?,

            Opcode::VarAdditionAssign
            | Opcode::VarSubtractionAssign
            | Opcode::VarMultiplicationAssign
            | Opcode::VarDivisionAssign
            | Opcode::VarModuloAssign => self.exec_compound_assign(opcode)?,

            Opcode::GroupingBegin => {
                let saved_code_start = self.code_start;
                self.dispatch_loop()?;
                self.code_start = saved_code_start;
            }

            Opcode::ScopeBegin => {
                self.scope = Scope::push(Some(self.scope.clone()));
            }
            Opcode::ScopeEnd => {
                self.scope = Scope::pop(&self.scope).ok_or_else(|| {
                    VmError::Internal("scope end with no enclosing scope".to_string())
                })?;
            }

            Opcode::VarDecl => self.exec_var_decl(false)?,
            Opcode::VarDeclLong => self.exec_var_decl(true)?,
            Opcode::FnDecl => self.exec_fn_decl(false)?,
            Opcode::FnDeclLong => self.exec_fn_decl(true)?,
            Opcode::VarAssign => self.exec_var_assign()?,

            Opcode::TypeCast => self.exec_type_cast()?,

            Opcode::CompareEqual => self.exec_compare_equal(false)?,
            Opcode::CompareNotEqual => self.exec_compare_equal(true)?,
            Opcode::CompareLess => self.exec_compare_less(false)?,
            Opcode::CompareLessEqual => self.exec_compare_less_equal(false)?,
            Opcode::CompareGreater => self.exec_compare_less(true)?,
            Opcode::CompareGreaterEqual => self.exec_compare_less_equal(true)?,

            Opcode::And => self.exec_and()?,
            Opcode::Or => self.exec_or()?,

            Opcode::Jump => self.exec_jump()?,
            Opcode::IfFalseJump => self.exec_false_jump()?,

            Opcode::FnCall => self.exec_fn_call()?,
            Opcode::FnReturn => {
                self.exec_fn_return()?;
                return Ok(Flow::Exit);
            }

            // handled by the caller before dispatch
            Opcode::Eof
            | Opcode::SectionEnd
            | Opcode::FnEnd
            | Opcode::GroupingEnd => {
                return Err(VmError::Internal(format!(
                    "terminator opcode {:?} reached the dispatch table",
                    opcode
                )))
            }
        }
        Ok(Flow::Continue)
    }
}

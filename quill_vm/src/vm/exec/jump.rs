//! Control flow jumps.
//!
//! Targets are u16 offsets relative to the current code start. A target
//! past the end of the bytecode is a malformed image, not a crash.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use super::super::error::VmError;
use super::super::Interpreter;
use crate::value::Value;

impl Interpreter {
    pub(super) fn exec_jump(&mut self) -> Result<(), VmError> {
        let target = usize::from(self.read_short()?);
        if self.code_start + target > self.length {
            return Err(VmError::JumpOutOfRange {
                target,
                length: self.length,
            });
        }
        self.count = self.code_start + target;
        Ok(())
    }

    /// Pop the condition and jump when it is falsy. Null is rejected
    /// rather than treated as false.
    pub(super) fn exec_false_jump(&mut self) -> Result<(), VmError> {
        let target = usize::from(self.read_short()?);
        if self.code_start + target > self.length {
            return Err(VmError::JumpOutOfRange {
                target,
                length: self.length,
            });
        }

        let condition = self.pop_resolved()?;
        if matches!(condition, Value::Null) {
            return Err(VmError::NullCompare);
        }
        if !condition.is_truthy() {
            self.count = self.code_start + target;
        }
        Ok(())
    }
}

//! Output statements: `Print` and `Assert`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use super::super::error::VmError;
use super::super::Interpreter;
use crate::value::Value;

impl Interpreter {
    /// Print the top of the stack through the print sink, resolving an
    /// identifier to its value first.
    pub(super) fn exec_print(&mut self) -> Result<(), VmError> {
        let value = self.pop_resolved()?;
        self.emit_print(&value.to_string());
        Ok(())
    }

    /// `assert condition, "message"`. The message is the raw string pushed
    /// by the compiler and is not resolved; the condition is. A null or
    /// falsy condition sends the message through the assert sink and
    /// terminates the run.
    pub(super) fn exec_assert(&mut self) -> Result<(), VmError> {
        let message = self.pop_stack()?;
        let condition = self.pop_resolved()?;

        let message = match message {
            Value::String(s) => s,
            other => {
                return Err(VmError::BadType(format!(
                    "the assert keyword needs a string as its second argument, received {}",
                    other.kind()
                )))
            }
        };

        if matches!(condition, Value::Null) || !condition.is_truthy() {
            self.emit_assert(&message);
            return Err(VmError::AssertionFailed(message.to_string()));
        }
        Ok(())
    }
}

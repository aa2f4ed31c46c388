//! Comparison and logical operations.
//!
//! Equality goes through structural value equality; ordered comparisons
//! require numeric operands and compare as floats after widening. The
//! logical operators work on truthiness of both operands; short-circuit
//! evaluation is the bytecode emitter's job, done with conditional jumps.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use super::super::error::VmError;
use super::super::Interpreter;
use crate::value::{literals_are_equal, Value};

fn numeric_as_float(value: &Value) -> Result<f32, VmError> {
    match value {
        Value::Integer(i) => Ok(*i as f32),
        Value::Float(x) => Ok(*x),
        other => Err(VmError::BadType(format!(
            "incorrect type in comparison, value is {}",
            other.kind()
        ))),
    }
}

impl Interpreter {
    pub(super) fn exec_compare_equal(&mut self, invert: bool) -> Result<(), VmError> {
        let rhs = self.pop_resolved()?;
        let lhs = self.pop_resolved()?;
        let mut result = literals_are_equal(&lhs, &rhs);
        if invert {
            result = !result;
        }
        self.stack.push(Value::Boolean(result));
        Ok(())
    }

    /// `<` (or `>` when inverted).
    pub(super) fn exec_compare_less(&mut self, invert: bool) -> Result<(), VmError> {
        let rhs = self.pop_resolved()?;
        let lhs = self.pop_resolved()?;
        let lhs = numeric_as_float(&lhs)?;
        let rhs = numeric_as_float(&rhs)?;
        let result = if invert { lhs > rhs } else { lhs < rhs };
        self.stack.push(Value::Boolean(result));
        Ok(())
    }

    /// `<=` (or `>=` when inverted).
    pub(super) fn exec_compare_less_equal(&mut self, invert: bool) -> Result<(), VmError> {
        let rhs = self.pop_resolved()?;
        let lhs = self.pop_resolved()?;
        let lhs = numeric_as_float(&lhs)?;
        let rhs = numeric_as_float(&rhs)?;
        let result = if invert { lhs >= rhs } else { lhs <= rhs };
        self.stack.push(Value::Boolean(result));
        Ok(())
    }

    pub(super) fn exec_and(&mut self) -> Result<(), VmError> {
        let rhs = self.pop_resolved()?;
        let lhs = self.pop_resolved()?;
        self.stack
            .push(Value::Boolean(lhs.is_truthy() && rhs.is_truthy()));
        Ok(())
    }

    pub(super) fn exec_or(&mut self) -> Result<(), VmError> {
        let rhs = self.pop_resolved()?;
        let lhs = self.pop_resolved()?;
        self.stack
            .push(Value::Boolean(lhs.is_truthy() || rhs.is_truthy()));
        Ok(())
    }
}

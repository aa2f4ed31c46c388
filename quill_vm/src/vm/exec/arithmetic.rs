//! Arithmetic operations.
//!
//! Covers negate, the five binary operators, and their compound-assign
//! forms. Mixed integer/float operands widen the integer side; string
//! addition concatenates with the length cap enforced.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use super::super::error::VmError;
use super::super::Interpreter;
use crate::opcode::Opcode;
use crate::scope::Scope;
use crate::value::{Value, MAX_STRING_LENGTH};

impl Interpreter {
    /// Negate the numeric value on top of the stack.
    pub(super) fn exec_negate(&mut self) -> Result<(), VmError> {
        let value = self.pop_resolved()?;
        let result = match value {
            Value::Integer(i) => Value::Integer(i.wrapping_neg()),
            Value::Float(x) => Value::Float(-x),
            other => {
                return Err(VmError::BadType(format!(
                    "can't negate a {} value",
                    other.kind()
                )))
            }
        };
        self.stack.push(result);
        Ok(())
    }

    /// Logically invert the boolean on top of the stack.
    pub(super) fn exec_invert(&mut self) -> Result<(), VmError> {
        let value = self.pop_resolved()?;
        let result = match value {
            Value::Boolean(b) => Value::Boolean(!b),
            other => {
                return Err(VmError::BadType(format!(
                    "can't invert a {} value",
                    other.kind()
                )))
            }
        };
        self.stack.push(result);
        Ok(())
    }

    pub(super) fn exec_arithmetic(&mut self, opcode: Opcode) -> Result<(), VmError> {
        let rhs = self.pop_resolved()?;
        let lhs = self.pop_resolved()?;
        let result = self.apply_arithmetic(opcode, lhs, rhs)?;
        self.stack.push(result);
        Ok(())
    }

    /// Compound assignment: combine the variable's current value with the
    /// right-hand side, then bind the result back to the variable under
    /// the same rules as a plain assignment.
    pub(super) fn exec_compound_assign(&mut self, opcode: Opcode) -> Result<(), VmError> {
        let rhs = self.pop_resolved()?;
        let lhs = self.pop_stack()?;
        let Value::Identifier(id) = &lhs else {
            return Err(VmError::BadType(format!(
                "can't assign to a non-variable ({})",
                lhs.kind()
            )));
        };

        let current = self.resolve(lhs.clone())?;
        let result = self.apply_arithmetic(opcode, current, rhs)?;
        Scope::set(&self.scope, id.name(), result, true)
    }

    pub(super) fn apply_arithmetic(
        &self,
        opcode: Opcode,
        lhs: Value,
        rhs: Value,
    ) -> Result<Value, VmError> {
        // string concatenation, addition only
        if let (Value::String(a), Value::String(b)) = (&lhs, &rhs) {
            if matches!(opcode, Opcode::Addition | Opcode::VarAdditionAssign) {
                let length = a.len() + b.len();
                if length > MAX_STRING_LENGTH {
                    return Err(VmError::StringOverflow { length });
                }
                return Ok(Value::string(format!("{}{}", a, b)));
            }
        }

        match (lhs, rhs) {
            (Value::Integer(a), Value::Integer(b)) => integer_arithmetic(opcode, a, b),
            // widen the integer operand
            (Value::Integer(a), Value::Float(b)) => float_arithmetic(opcode, a as f32, b),
            (Value::Float(a), Value::Integer(b)) => float_arithmetic(opcode, a, b as f32),
            (Value::Float(a), Value::Float(b)) => float_arithmetic(opcode, a, b),
            (lhs, rhs) => Err(VmError::bad_operands(lhs.kind(), rhs.kind())),
        }
    }
}

fn integer_arithmetic(opcode: Opcode, a: i32, b: i32) -> Result<Value, VmError> {
    let result = match opcode {
        Opcode::Addition | Opcode::VarAdditionAssign => a.wrapping_add(b),
        Opcode::Subtraction | Opcode::VarSubtractionAssign => a.wrapping_sub(b),
        Opcode::Multiplication | Opcode::VarMultiplicationAssign => a.wrapping_mul(b),
        Opcode::Division | Opcode::VarDivisionAssign => {
            if b == 0 {
                return Err(VmError::DivideByZero);
            }
            a.wrapping_div(b)
        }
        Opcode::Modulo | Opcode::VarModuloAssign => {
            if b == 0 {
                return Err(VmError::DivideByZero);
            }
            a.wrapping_rem(b)
        }
        other => {
            return Err(VmError::Internal(format!(
                "bad opcode {:?} passed to integer arithmetic",
                other
            )))
        }
    };
    Ok(Value::Integer(result))
}

fn float_arithmetic(opcode: Opcode, a: f32, b: f32) -> Result<Value, VmError> {
    let result = match opcode {
        Opcode::Addition | Opcode::VarAdditionAssign => a + b,
        Opcode::Subtraction | Opcode::VarSubtractionAssign => a - b,
        Opcode::Multiplication | Opcode::VarMultiplicationAssign => a * b,
        Opcode::Division | Opcode::VarDivisionAssign => {
            if b == 0.0 {
                return Err(VmError::DivideByZero);
            }
            a / b
        }
        Opcode::Modulo | Opcode::VarModuloAssign => {
            return Err(VmError::BadArithmetic(
                "modulo on floats is not allowed".to_string(),
            ))
        }
        other => {
            return Err(VmError::Internal(format!(
                "bad opcode {:?} passed to float arithmetic",
                other
            )))
        }
    };
    Ok(Value::Float(result))
}

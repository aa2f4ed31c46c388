//! Function call and return.
//!
//! A call builds an inner interpreter over the callee's bytecode blob.
//! The blob embeds its own literal and function sections, followed by two
//! u16 pool indices: the parameter descriptor (an array of alternating
//! identifier/type entries) and the return descriptor (an array of types).
//! The inner instance shares the caller's sinks and pushes a call frame
//! onto the function's declaration scope.
//!
//! Errors inside the body are reported through the shared sink but do not
//! fail the call; only setup failures and return-type validation do.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::cell::RefCell;
use std::rc::Rc;

use super::super::error::VmError;
use super::super::Interpreter;
use crate::scope::Scope;
use crate::value::{FunctionValue, LiteralArray, TypeValue, Value};

impl Interpreter {
    pub(super) fn exec_fn_call(&mut self) -> Result<(), VmError> {
        // Everything above the callee is an argument; by the emitter's
        // convention the stack below the callee is empty between
        // statements. Popping reverses the push order.
        let mut arguments: Vec<Value> = Vec::new();
        while self.stack.len() > 1 {
            arguments.push(self.pop_stack()?);
        }
        let identifier = self.pop_stack()?;

        let function = match self.resolve(identifier.clone())? {
            Value::Function(func) => func,
            other => {
                return Err(VmError::BadCall(format!(
                    "\"{}\" is not a function ({})",
                    identifier,
                    other.kind()
                )))
            }
        };

        let mut inner = self.make_call_frame(&function)?;
        let (parameters, return_types) = inner.read_call_descriptors()?;

        inner.bind_parameters(&parameters, &mut arguments)?;

        // run the body; a failure in there has already been reported and
        // the call itself carries on with whatever the stack holds
        if let Err(err) = inner.dispatch_loop() {
            self.report(&err);
        }

        // harvest the results (reversed again, but at most one survives)
        let mut returns: Vec<Value> = Vec::new();
        while let Some(value) = inner.stack.pop() {
            returns.push(value);
        }
        if returns.len() > 1 {
            return Err(VmError::TooManyReturns(returns.len()));
        }

        if let Some(value) = returns.pop() {
            check_return_kind(&return_types, &value)?;
            self.stack.push(value);
        }
        Ok(())
    }

    /// Resolve every remaining stack value, preserving stack order, and
    /// leave them for the caller to harvest. The dispatch loop exits after
    /// this handler.
    pub(super) fn exec_fn_return(&mut self) -> Result<(), VmError> {
        let mut values: Vec<Value> = Vec::new();
        while let Some(value) = self.stack.pop() {
            values.push(self.resolve(value)?);
        }
        while let Some(value) = values.pop() {
            self.stack.push(value);
        }
        Ok(())
    }

    fn make_call_frame(&self, function: &FunctionValue) -> Result<Interpreter, VmError> {
        let declaration_scope = function.scope.clone().ok_or_else(|| {
            VmError::Internal("function value has no declaration scope".to_string())
        })?;

        let mut inner = Interpreter::with_shared(
            self.print_output.clone(),
            self.assert_output.clone(),
            self.config.clone(),
        );
        inner.code = function.bytecode.clone();
        inner.length = inner.code.len();
        inner.scope = Scope::push(Some(declaration_scope));
        inner.read_embedded_sections()?;
        Ok(inner)
    }

    /// Read the two-descriptor preamble that follows the embedded sections.
    fn read_call_descriptors(
        &mut self,
    ) -> Result<(Rc<RefCell<LiteralArray>>, Rc<RefCell<LiteralArray>>), VmError> {
        let parameter_index = usize::from(self.read_short()?);
        let return_index = usize::from(self.read_short()?);

        let parameters = match self.cached_literal(parameter_index)? {
            Value::Array(array) => array,
            other => {
                return Err(VmError::Internal(format!(
                    "parameter descriptor is a {} literal",
                    other.kind()
                )))
            }
        };
        let return_types = match self.cached_literal(return_index)? {
            Value::Array(array) => array,
            other => {
                return Err(VmError::Internal(format!(
                    "return descriptor is a {} literal",
                    other.kind()
                )))
            }
        };
        Ok((parameters, return_types))
    }

    /// Declare and define each `(identifier, type)` parameter pair in the
    /// call frame. A missing argument arrives as null and fails the typed
    /// parameter's write, which surfaces as a bad call.
    fn bind_parameters(
        &mut self,
        parameters: &Rc<RefCell<LiteralArray>>,
        arguments: &mut Vec<Value>,
    ) -> Result<(), VmError> {
        let parameters = parameters.borrow();
        let mut i = 0;
        while i + 1 < parameters.len() {
            let id = match parameters.get(i) {
                Some(Value::Identifier(id)) => id.clone(),
                _ => {
                    return Err(VmError::Internal(
                        "malformed parameter descriptor".to_string(),
                    ))
                }
            };
            let ty: TypeValue = match parameters.get(i + 1) {
                Some(Value::Type(ty)) => ty.clone(),
                _ => {
                    return Err(VmError::Internal(
                        "malformed parameter descriptor".to_string(),
                    ))
                }
            };

            Scope::declare(&self.scope, &id, ty).map_err(|_| {
                VmError::BadCall(format!("could not declare parameter \"{}\"", id.name()))
            })?;
            let argument = arguments.pop().unwrap_or(Value::Null);
            Scope::set(&self.scope, id.name(), argument, false).map_err(|_| {
                VmError::BadCall(format!(
                    "bad argument for parameter \"{}\" (wrong count or type?)",
                    id.name()
                ))
            })?;

            i += 2;
        }
        Ok(())
    }
}

/// Kind-level return validation, applied only when the function declares
/// return types at all. An empty descriptor accepts anything.
fn check_return_kind(
    return_types: &Rc<RefCell<LiteralArray>>,
    value: &Value,
) -> Result<(), VmError> {
    let return_types = return_types.borrow();
    if return_types.is_empty() {
        return Ok(());
    }
    match return_types.get(0) {
        Some(Value::Type(expected)) if expected.type_of == value.kind() => Ok(()),
        Some(Value::Type(_)) => Err(VmError::BadCall(
            "bad type found in return value".to_string(),
        )),
        _ => Err(VmError::Internal("malformed return descriptor".to_string())),
    }
}

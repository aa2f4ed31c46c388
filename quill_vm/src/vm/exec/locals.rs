//! Declarations and assignment.
//!
//! `VarDecl` and `FnDecl` read their pool indices from the bytecode; the
//! `*Long` forms take u16 indices for pools past 256 entries. Assignment
//! enforces the declared type and constness of the target binding.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use super::super::error::VmError;
use super::super::Interpreter;
use crate::scope::Scope;
use crate::value::{IdentifierValue, TypeValue, Value, ValueKind};

impl Interpreter {
    fn read_index_pair(&mut self, long: bool) -> Result<(usize, usize), VmError> {
        if long {
            let first = usize::from(self.read_short()?);
            let second = usize::from(self.read_short()?);
            Ok((first, second))
        } else {
            let first = usize::from(self.read_byte()?);
            let second = usize::from(self.read_byte()?);
            Ok((first, second))
        }
    }

    fn identifier_literal(&self, index: usize) -> Result<IdentifierValue, VmError> {
        match self.cached_literal(index)? {
            Value::Identifier(id) => Ok(id),
            other => Err(VmError::Internal(format!(
                "expected an identifier literal, found {}",
                other.kind()
            ))),
        }
    }

    /// Declare a variable, then assign its initialiser when one was
    /// pushed. A null initialiser means "declared but not defined" and is
    /// skipped; everything else goes through the declared-type check.
    pub(super) fn exec_var_decl(&mut self, long: bool) -> Result<(), VmError> {
        let (identifier_index, type_index) = self.read_index_pair(long)?;
        let identifier = self.identifier_literal(identifier_index)?;

        // the type slot may itself be an identifier (a type alias)
        let type_literal = self.cached_literal(type_index)?;
        let declared_type = match self.resolve(type_literal)? {
            Value::Type(ty) => ty,
            other => {
                return Err(VmError::BadType(format!(
                    "expected a type in the declaration of \"{}\", found {}",
                    identifier.name(),
                    other.kind()
                )))
            }
        };

        Scope::declare(&self.scope, &identifier, declared_type)?;

        let initialiser = self.pop_resolved()?;
        if !matches!(initialiser, Value::Null) {
            // declaration-time write: the const flag does not apply yet
            Scope::set(&self.scope, identifier.name(), initialiser, false)?;
        }
        Ok(())
    }

    /// Declare a function. The binding is typed `const function`; the
    /// function value captures a fresh scope frame whose parent is the
    /// declaring scope, so the body sees the declaration site (including
    /// the function's own name, for recursion).
    pub(super) fn exec_fn_decl(&mut self, long: bool) -> Result<(), VmError> {
        let (identifier_index, function_index) = self.read_index_pair(long)?;
        let identifier = self.identifier_literal(identifier_index)?;

        let mut function = match self.cached_literal(function_index)? {
            Value::Function(func) => func,
            other => {
                return Err(VmError::Internal(format!(
                    "function declaration refers to a {} literal",
                    other.kind()
                )))
            }
        };
        function.scope = Some(Scope::push(Some(self.scope.clone())));

        let declared_type = TypeValue::new(ValueKind::Function, true);
        Scope::declare(&self.scope, &identifier, declared_type)?;
        Scope::set(
            &self.scope,
            identifier.name(),
            Value::Function(function),
            false,
        )
    }

    /// Plain assignment: pop the value, pop the target identifier, write
    /// through the scope chain. Constness is enforced here; only the
    /// declaring statement may define a const binding.
    pub(super) fn exec_var_assign(&mut self) -> Result<(), VmError> {
        let rhs = self.pop_resolved()?;
        let lhs = self.pop_stack()?;

        match lhs {
            Value::Identifier(id) => Scope::set(&self.scope, id.name(), rhs, true),
            other => Err(VmError::BadType(format!(
                "can't assign to a non-variable ({})",
                other.kind()
            ))),
        }
    }
}

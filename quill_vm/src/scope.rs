//! Lexical scope chain.
//!
//! A scope is one frame of declared names plus a parent link. Frames are
//! refcounted so that function values can hold a strong handle to the chain
//! that was current at their declaration; the chain stays alive for as long
//! as any function (or inner frame) still points at it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::{IdentifierValue, TypeValue, Value};
use crate::vm::error::VmError;

pub type ScopeHandle = Rc<RefCell<Scope>>;

#[derive(Debug, Clone)]
struct Binding {
    declared_type: TypeValue,
    value: Value,
}

#[derive(Debug)]
pub struct Scope {
    parent: Option<ScopeHandle>,
    variables: HashMap<Rc<str>, Binding>,
}

impl Scope {
    /// Push a new innermost frame onto `parent`.
    pub fn push(parent: Option<ScopeHandle>) -> ScopeHandle {
        Rc::new(RefCell::new(Scope {
            parent,
            variables: HashMap::new(),
        }))
    }

    /// Pop the innermost frame, returning its parent. The frame itself is
    /// only released once no function value still references it.
    pub fn pop(handle: &ScopeHandle) -> Option<ScopeHandle> {
        handle.borrow().parent.clone()
    }

    /// Declare `name` in the innermost frame with an initial value of null.
    ///
    /// Declaring a name already present in the same frame fails; shadowing
    /// a name from an outer frame is allowed.
    pub fn declare(
        handle: &ScopeHandle,
        name: &IdentifierValue,
        declared_type: TypeValue,
    ) -> Result<(), VmError> {
        let mut scope = handle.borrow_mut();
        if scope.variables.contains_key(name.name()) {
            return Err(VmError::Redeclared(name.name().to_string()));
        }
        scope.variables.insert(
            name.name_rc(),
            Binding {
                declared_type,
                value: Value::Null,
            },
        );
        Ok(())
    }

    /// Write `value` into the nearest frame holding `name`.
    ///
    /// The write is rejected when the declared type does not accept the
    /// value's kind (integer/float coercion never applies here; only an
    /// explicit cast changes kind), and, when `enforce_const` is set, when
    /// the declared type is constant. Declaration-time initialisation
    /// passes `enforce_const = false` so a const binding can be defined
    /// exactly once.
    pub fn set(
        handle: &ScopeHandle,
        name: &str,
        value: Value,
        enforce_const: bool,
    ) -> Result<(), VmError> {
        let mut current = Some(handle.clone());
        while let Some(scope) = current {
            let mut frame = scope.borrow_mut();
            if let Some(binding) = frame.variables.get_mut(name) {
                if enforce_const && binding.declared_type.constant {
                    return Err(VmError::ConstViolation(name.to_string()));
                }
                if !binding.declared_type.accepts(&value) {
                    return Err(VmError::TypeMismatch(name.to_string()));
                }
                binding.value = value;
                return Ok(());
            }
            let parent = frame.parent.clone();
            drop(frame);
            current = parent;
        }
        Err(VmError::Undeclared(name.to_string()))
    }

    /// Nearest-frame lookup.
    pub fn get(handle: &ScopeHandle, name: &str) -> Option<Value> {
        let mut current = Some(handle.clone());
        while let Some(scope) = current {
            let frame = scope.borrow();
            if let Some(binding) = frame.variables.get(name) {
                return Some(binding.value.clone());
            }
            current = frame.parent.clone();
        }
        None
    }

    pub fn is_declared(handle: &ScopeHandle, name: &str) -> bool {
        let mut current = Some(handle.clone());
        while let Some(scope) = current {
            let frame = scope.borrow();
            if frame.variables.contains_key(name) {
                return true;
            }
            current = frame.parent.clone();
        }
        false
    }
}

//! Static type descriptors attached to variable declarations.

use std::fmt;

use super::{Value, ValueKind};

/// A declared type: the kind a variable may hold, whether the binding is
/// constant, and the element types of compound kinds.
///
/// An array type carries exactly one subtype (the element type), a
/// dictionary type carries two (key type, value type), and every other kind
/// carries none. A `type_of` of [`ValueKind::Null`] marks an untyped
/// declaration, which accepts a value of any kind.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeValue {
    pub type_of: ValueKind,
    pub constant: bool,
    pub subtypes: Vec<TypeValue>,
}

impl TypeValue {
    pub fn new(type_of: ValueKind, constant: bool) -> Self {
        Self {
            type_of,
            constant,
            subtypes: Vec::new(),
        }
    }

    pub fn push_subtype(&mut self, subtype: TypeValue) {
        self.subtypes.push(subtype);
    }

    /// An untyped declaration places no constraint on writes.
    pub fn is_untyped(&self) -> bool {
        self.type_of == ValueKind::Null
    }

    /// Whether `value` may be written to a variable declared with this type.
    ///
    /// The check is kind-level only: integer/float coercion is not applied
    /// at the write boundary, and compound subtypes are not descended into.
    pub fn accepts(&self, value: &Value) -> bool {
        self.is_untyped() || value.kind() == self.type_of
    }
}

impl fmt::Display for TypeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.constant {
            write!(f, "const ")?;
        }
        match self.type_of {
            ValueKind::Array => {
                let element = self
                    .subtypes
                    .first()
                    .map(|t| t.to_string())
                    .unwrap_or_default();
                write!(f, "[{}]", element)
            }
            ValueKind::Dictionary => {
                let key = self
                    .subtypes
                    .first()
                    .map(|t| t.to_string())
                    .unwrap_or_default();
                let value = self
                    .subtypes
                    .get(1)
                    .map(|t| t.to_string())
                    .unwrap_or_default();
                write!(f, "[{}: {}]", key, value)
            }
            kind => write!(f, "{}", kind),
        }
    }
}

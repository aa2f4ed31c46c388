//! Value - the tagged runtime value of the Quill VM.
//!
//! This module contains:
//! - `Value`: the enum covering every runtime kind
//! - `ValueKind`: the corresponding kind tag (also the wire encoding of
//!   type payloads in an image)
//! - the value operations the interpreter is built on: truthiness,
//!   structural equality, stable hashing, and deep copies

mod array;
mod dictionary;
mod type_value;

pub use array::LiteralArray;
pub use dictionary::LiteralDictionary;
pub use type_value::TypeValue;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use num_enum::TryFromPrimitive;

use crate::scope::ScopeHandle;

/// Strings are capped at this many bytes; any operation that would produce
/// a longer string fails instead.
pub const MAX_STRING_LENGTH: usize = 4096;

/// Kind tag of a [`Value`]. The `u8` representation doubles as the wire
/// encoding of the `typeOf` byte in type literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum ValueKind {
    Null = 0,
    Boolean = 1,
    Integer = 2,
    Float = 3,
    String = 4,
    Array = 5,
    Dictionary = 6,
    Function = 7,
    Identifier = 8,
    Type = 9,
    Opaque = 10,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Boolean => "bool",
            ValueKind::Integer => "int",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Dictionary => "dictionary",
            ValueKind::Function => "function",
            ValueKind::Identifier => "identifier",
            ValueKind::Type => "type",
            ValueKind::Opaque => "opaque",
        };
        write!(f, "{}", name)
    }
}

/// A user-defined function: the embedded bytecode blob and the scope chain
/// that was current at its declaration.
///
/// The blob is shared with the constant pool slot it was loaded into. The
/// declaration scope is a strong handle, so a function stored in an outer
/// binding keeps its environment alive after the declaring block unwinds.
/// The scope is `None` until the declaring `FnDecl` opcode executes.
#[derive(Clone)]
pub struct FunctionValue {
    pub bytecode: Rc<[u8]>,
    pub scope: Option<ScopeHandle>,
}

// Hand-written: a declaration scope can (and usually does) contain the
// function itself, so a derived Debug would recurse forever.
impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionValue")
            .field("bytecode_len", &self.bytecode.len())
            .field("has_scope", &self.scope.is_some())
            .finish()
    }
}

/// A variable name with its hash precomputed at construction.
#[derive(Debug, Clone)]
pub struct IdentifierValue {
    name: Rc<str>,
    hash: u32,
}

impl IdentifierValue {
    pub fn new(name: &str) -> Self {
        Self {
            name: Rc::from(name),
            hash: hash_string(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_rc(&self) -> Rc<str> {
        self.name.clone()
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i32),
    Float(f32),
    /// Refcounted immutable byte sequence, at most [`MAX_STRING_LENGTH`] bytes.
    String(Rc<str>),
    /// Shared, mutable array (reference semantics).
    Array(Rc<RefCell<LiteralArray>>),
    Dictionary(Rc<RefCell<LiteralDictionary>>),
    Function(FunctionValue),
    Identifier(IdentifierValue),
    Type(TypeValue),
    /// Reserved for the host; never produced by the image loader and never
    /// interpreted by the dispatch loop.
    Opaque { ptr: usize, tag: i32 },
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Dictionary(_) => ValueKind::Dictionary,
            Value::Function(_) => ValueKind::Function,
            Value::Identifier(_) => ValueKind::Identifier,
            Value::Type(_) => ValueKind::Type,
            Value::Opaque { .. } => ValueKind::Opaque,
        }
    }

    /// Null is falsy, booleans are themselves, every other kind is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            _ => true,
        }
    }

    /// Copy with container payloads duplicated element-wise. Strings stay
    /// shared by refcount; plain `clone` shares containers instead.
    pub fn deep_copy(&self) -> Value {
        match self {
            Value::Array(array) => {
                let mut copy = LiteralArray::with_capacity(array.borrow().len());
                for element in array.borrow().iter() {
                    copy.push(element.deep_copy());
                }
                Value::Array(Rc::new(RefCell::new(copy)))
            }
            Value::Dictionary(dict) => {
                let mut copy = LiteralDictionary::new();
                for (key, value) in dict.borrow().iter() {
                    copy.set(key.deep_copy(), value.deep_copy());
                }
                Value::Dictionary(Rc::new(RefCell::new(copy)))
            }
            other => other.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(array) => write!(f, "{}", array.borrow()),
            Value::Dictionary(dict) => write!(f, "{}", dict.borrow()),
            Value::Function(_) => write!(f, "<function>"),
            Value::Identifier(id) => write!(f, "{}", id.name()),
            Value::Type(ty) => write!(f, "{}", ty),
            Value::Opaque { .. } => write!(f, "<opaque>"),
        }
    }
}

/// 32-bit FNV-1a, used for identifier hashes and string content hashes.
pub fn hash_string(s: &str) -> u32 {
    let mut hash: u32 = 2166136261;
    for byte in s.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

/// Structural equality over values.
///
/// Same kind is required, except integer/float pairs which compare
/// numerically after widening the integer side. Functions and opaque
/// values compare by identity.
pub fn literals_are_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Null, Value::Null) => true,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Integer(a), Value::Float(b)) => (*a as f32) == *b,
        (Value::Float(a), Value::Integer(b)) => *a == (*b as f32),
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            let a = a.borrow();
            let b = b.borrow();
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(x, y)| literals_are_equal(x, y))
        }
        (Value::Dictionary(a), Value::Dictionary(b)) => {
            let a = a.borrow();
            let b = b.borrow();
            a.len() == b.len()
                && a.iter().all(|(key, value)| {
                    b.get(key)
                        .map(|other| literals_are_equal(value, other))
                        .unwrap_or(false)
                })
        }
        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(&a.bytecode, &b.bytecode),
        (Value::Identifier(a), Value::Identifier(b)) => {
            a.hash() == b.hash() && a.name() == b.name()
        }
        (Value::Type(a), Value::Type(b)) => a == b,
        (Value::Opaque { ptr: a, .. }, Value::Opaque { ptr: b, .. }) => a == b,
        _ => false,
    }
}

/// Stable per-kind hash, consistent with [`literals_are_equal`] for the
/// kinds dictionaries key on. Identifiers return the hash cached at
/// construction; strings hash their content.
pub fn hash_literal(value: &Value) -> u32 {
    match value {
        Value::Null => 0,
        Value::Boolean(b) => {
            if *b {
                1
            } else {
                2
            }
        }
        Value::Integer(i) => *i as u32,
        Value::Float(x) => x.to_bits(),
        Value::String(s) => hash_string(s),
        Value::Array(array) => array
            .borrow()
            .iter()
            .fold(0u32, |hash, element| {
                hash.wrapping_mul(31) ^ hash_literal(element)
            }),
        Value::Dictionary(dict) => dict
            .borrow()
            .iter()
            .fold(0u32, |hash, (key, value)| {
                // XOR keeps the hash independent of entry order.
                hash ^ (hash_literal(key).wrapping_mul(31) ^ hash_literal(value))
            }),
        Value::Function(func) => Rc::as_ptr(&func.bytecode) as *const u8 as usize as u32,
        Value::Identifier(id) => id.hash(),
        Value::Type(ty) => hash_type(ty),
        Value::Opaque { ptr, .. } => *ptr as u32,
    }
}

fn hash_type(ty: &TypeValue) -> u32 {
    let mut hash = (ty.type_of as u32).wrapping_mul(31) ^ u32::from(ty.constant);
    for subtype in &ty.subtypes {
        hash = hash.wrapping_mul(31) ^ hash_type(subtype);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(Value::Boolean(true).is_truthy());
        assert!(Value::Integer(0).is_truthy());
        assert!(Value::Float(0.0).is_truthy());
        assert!(Value::string("").is_truthy());
    }

    #[test]
    fn test_equality_reflexive() {
        let values = [
            Value::Null,
            Value::Boolean(true),
            Value::Integer(-3),
            Value::Float(2.5),
            Value::string("abc"),
            Value::Type(TypeValue::new(ValueKind::Integer, true)),
        ];
        for value in &values {
            assert!(literals_are_equal(value, value), "{:?}", value);
        }
    }

    #[test]
    fn test_numeric_widening_equality() {
        assert!(literals_are_equal(&Value::Integer(2), &Value::Float(2.0)));
        assert!(literals_are_equal(&Value::Float(2.0), &Value::Integer(2)));
        assert!(!literals_are_equal(&Value::Integer(2), &Value::Float(2.5)));
    }

    #[test]
    fn test_string_equality_by_content() {
        assert!(literals_are_equal(
            &Value::string("foo"),
            &Value::string("foo")
        ));
        assert!(!literals_are_equal(
            &Value::string("foo"),
            &Value::string("bar")
        ));
    }

    #[test]
    fn test_cross_kind_inequality() {
        assert!(!literals_are_equal(&Value::Null, &Value::Integer(0)));
        assert!(!literals_are_equal(
            &Value::Boolean(true),
            &Value::Integer(1)
        ));
        assert!(!literals_are_equal(&Value::string("1"), &Value::Integer(1)));
    }

    #[test]
    fn test_array_structural_equality() {
        let a = Value::Array(Rc::new(RefCell::new(LiteralArray::from(vec![
            Value::Integer(1),
            Value::Float(2.0),
        ]))));
        let b = Value::Array(Rc::new(RefCell::new(LiteralArray::from(vec![
            Value::Integer(1),
            Value::Integer(2),
        ]))));
        // element-wise, with numeric widening
        assert!(literals_are_equal(&a, &b));
    }

    #[test]
    fn test_identifier_hash_matches_name_hash() {
        let id = IdentifierValue::new("counter");
        assert_eq!(id.hash(), hash_string("counter"));
        assert_eq!(hash_literal(&Value::Identifier(id)), hash_string("counter"));
    }

    #[test]
    fn test_string_hash_matches_content_hash() {
        assert_eq!(hash_literal(&Value::string("abc")), hash_string("abc"));
    }

    #[test]
    fn test_deep_copy_detaches_containers() {
        let original = Rc::new(RefCell::new(LiteralArray::from(vec![Value::Integer(1)])));
        let value = Value::Array(original.clone());
        let copy = value.deep_copy();

        original.borrow_mut().push(Value::Integer(2));
        if let Value::Array(copied) = copy {
            assert_eq!(copied.borrow().len(), 1);
        } else {
            panic!("deep_copy changed the kind");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Integer(42).to_string(), "42");
        assert_eq!(Value::Float(3.5).to_string(), "3.5");
        assert_eq!(Value::Float(3.0).to_string(), "3");
        assert_eq!(Value::string("hi").to_string(), "hi");
        assert_eq!(Value::Boolean(true).to_string(), "true");
    }
}

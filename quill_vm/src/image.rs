//! Bytecode image parsing.
//!
//! A Quill image is little-endian and read unaligned, in four sections:
//!
//! ```text
//! +--------------------------+
//! | Header                   |  u8 major, u8 minor, u8 patch,
//! |                          |  nul-terminated build string, 0xFF
//! +--------------------------+
//! | Literal section          |  u16 count, tagged literal payloads, 0xFF
//! +--------------------------+
//! | Function section         |  u16 count, u16 total size, then one
//! |                          |  u16-sized body per function slot, 0xFF
//! +--------------------------+
//! | Code section             |  opcode stream, terminated by OP_EOF
//! +--------------------------+
//! ```
//!
//! Function literals are read as placeholders first; once the literal
//! section is complete, the function section is consumed in pool order and
//! each placeholder is back-patched with an owned copy of its body. The
//! last byte of every body must be `OP_FN_END`.
//!
//! Function bodies embed the same literal and function sections (without
//! the header), so the interpreter reuses this reader when it calls into
//! a function.

use std::path::Path;
use std::rc::Rc;

use thiserror::Error;

use crate::opcode::{LiteralTag, Opcode};
use crate::value::{
    FunctionValue, IdentifierValue, LiteralArray, LiteralDictionary, TypeValue, Value, ValueKind,
    MAX_STRING_LENGTH,
};

pub const VERSION_MAJOR: u8 = 0;
pub const VERSION_MINOR: u8 = 5;
pub const VERSION_PATCH: u8 = 1;
pub const VERSION_BUILD: &str = concat!("quill ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("interpreter/bytecode version mismatch (image reports {major}.{minor}.{patch})")]
    VersionMismatch { major: u8, minor: u8, patch: u8 },
    #[error("unexpected end of image data")]
    Truncated,
    #[error("expected a section terminator")]
    MissingSectionEnd,
    #[error("unknown literal tag {0}")]
    UnknownLiteralTag(u8),
    #[error("unknown type kind {0} in type literal")]
    UnknownTypeKind(u8),
    #[error("function body does not end with the function end marker")]
    MissingFunctionEnd,
    #[error("string literal longer than the 4096 byte limit")]
    StringTooLong,
    #[error("literal index {index} is not usable here (pool has {len} entries)")]
    BadPoolIndex { index: usize, len: usize },
}

/// Load a raw image from disk. Convenience for embedding hosts; the
/// interpreter itself only ever sees the byte slice.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, ImageError> {
    Ok(std::fs::read(path)?)
}

/// Image header contents. The version triple is validated by
/// [`ImageReader::read_header`]; the build string is informational and at
/// most worth a warning.
#[derive(Debug)]
pub struct ImageHeader {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    pub build: String,
}

/// Literal slot while the pool is being populated. Function literals stay
/// placeholders until the function section back-patches them.
enum PoolSlot {
    Ready(Value),
    FunctionStub,
}

/// Cursor over an image byte slice.
#[derive(Debug)]
pub struct ImageReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ImageReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn read_u8(&mut self) -> Result<u8, ImageError> {
        let byte = *self.bytes.get(self.pos).ok_or(ImageError::Truncated)?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_u16(&mut self) -> Result<u16, ImageError> {
        let bytes = self
            .bytes
            .get(self.pos..self.pos + 2)
            .ok_or(ImageError::Truncated)?;
        self.pos += 2;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_i32(&mut self) -> Result<i32, ImageError> {
        let bytes = self
            .bytes
            .get(self.pos..self.pos + 4)
            .ok_or(ImageError::Truncated)?;
        self.pos += 4;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_f32(&mut self) -> Result<f32, ImageError> {
        let bytes = self
            .bytes
            .get(self.pos..self.pos + 4)
            .ok_or(ImageError::Truncated)?;
        self.pos += 4;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a nul-terminated UTF-8 string, consuming the terminator.
    pub fn read_zstr(&mut self) -> Result<String, ImageError> {
        let rest = self.bytes.get(self.pos..).ok_or(ImageError::Truncated)?;
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(ImageError::Truncated)?;
        let s = String::from_utf8_lossy(&rest[..nul]).into_owned();
        self.pos += nul + 1;
        Ok(s)
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ImageError> {
        let bytes = self
            .bytes
            .get(self.pos..self.pos + len)
            .ok_or(ImageError::Truncated)?;
        self.pos += len;
        Ok(bytes)
    }

    fn expect_section_end(&mut self) -> Result<(), ImageError> {
        if self.read_u8()? != Opcode::SectionEnd as u8 {
            return Err(ImageError::MissingSectionEnd);
        }
        Ok(())
    }

    /// Read and validate the image header.
    pub fn read_header(&mut self) -> Result<ImageHeader, ImageError> {
        let major = self.read_u8()?;
        let minor = self.read_u8()?;
        let patch = self.read_u8()?;
        if major != VERSION_MAJOR || minor != VERSION_MINOR || patch != VERSION_PATCH {
            return Err(ImageError::VersionMismatch {
                major,
                minor,
                patch,
            });
        }
        let build = self.read_zstr()?;
        self.expect_section_end()?;
        Ok(ImageHeader {
            major,
            minor,
            patch,
            build,
        })
    }

    /// Read the literal and function sections into a constant pool.
    ///
    /// On return the cursor sits on the first byte after the function
    /// section terminator. With `verbose` set, each literal is traced to
    /// stderr as it is read.
    pub fn read_constant_pool(&mut self, verbose: bool) -> Result<Vec<Value>, ImageError> {
        let literal_count = self.read_u16()?;
        if verbose {
            eprintln!("reading {} literals", literal_count);
        }

        let mut slots: Vec<PoolSlot> = Vec::with_capacity(usize::from(literal_count));
        for _ in 0..literal_count {
            let tag_byte = self.read_u8()?;
            let tag = LiteralTag::try_from(tag_byte)
                .map_err(|_| ImageError::UnknownLiteralTag(tag_byte))?;
            let slot = self.read_literal(tag, &slots, verbose)?;
            slots.push(slot);
        }
        self.expect_section_end()?;

        // Function metadata: the per-slot ordinal stored with each function
        // literal is informational; bodies are consumed in pool order.
        let _function_count = self.read_u16()?;
        let _function_size = self.read_u16()?;

        let mut pool = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot {
                PoolSlot::Ready(value) => pool.push(value),
                PoolSlot::FunctionStub => {
                    let size = usize::from(self.read_u16()?);
                    let body = self.read_bytes(size)?;
                    if body.last().copied() != Some(Opcode::FnEnd as u8) {
                        return Err(ImageError::MissingFunctionEnd);
                    }
                    pool.push(Value::Function(FunctionValue {
                        bytecode: Rc::from(body),
                        scope: None,
                    }));
                }
            }
        }
        self.expect_section_end()?;

        Ok(pool)
    }

    fn read_literal(
        &mut self,
        tag: LiteralTag,
        slots: &[PoolSlot],
        verbose: bool,
    ) -> Result<PoolSlot, ImageError> {
        let slot = match tag {
            LiteralTag::Null => PoolSlot::Ready(Value::Null),
            LiteralTag::Boolean => {
                let b = self.read_u8()? != 0;
                PoolSlot::Ready(Value::Boolean(b))
            }
            LiteralTag::Integer => PoolSlot::Ready(Value::Integer(self.read_i32()?)),
            LiteralTag::Float => PoolSlot::Ready(Value::Float(self.read_f32()?)),
            LiteralTag::String => {
                let s = self.read_zstr()?;
                if s.len() > MAX_STRING_LENGTH {
                    return Err(ImageError::StringTooLong);
                }
                PoolSlot::Ready(Value::string(s))
            }
            LiteralTag::Array => {
                let length = usize::from(self.read_u16()?);
                let mut array = LiteralArray::with_capacity(length);
                for _ in 0..length {
                    let index = usize::from(self.read_u16()?);
                    array.push(ready_value(slots, index)?.clone());
                }
                PoolSlot::Ready(Value::Array(Rc::new(std::cell::RefCell::new(array))))
            }
            LiteralTag::Dictionary => {
                // The stored length is 2 * pairCount.
                let length = usize::from(self.read_u16()?);
                let mut dict = LiteralDictionary::new();
                for _ in 0..length / 2 {
                    let key_index = usize::from(self.read_u16()?);
                    let value_index = usize::from(self.read_u16()?);
                    let key = ready_value(slots, key_index)?.clone();
                    let value = ready_value(slots, value_index)?.clone();
                    dict.set(key, value);
                }
                PoolSlot::Ready(Value::Dictionary(Rc::new(std::cell::RefCell::new(dict))))
            }
            LiteralTag::Function => {
                let _ordinal = self.read_u16()?;
                PoolSlot::FunctionStub
            }
            LiteralTag::Identifier => {
                let name = self.read_zstr()?;
                PoolSlot::Ready(Value::Identifier(IdentifierValue::new(&name)))
            }
            LiteralTag::Type => {
                let ty = self.read_type_head()?;
                PoolSlot::Ready(Value::Type(ty))
            }
            LiteralTag::TypeIntermediate => {
                let mut ty = self.read_type_head()?;
                if ty.type_of == ValueKind::Array {
                    let element = usize::from(self.read_u16()?);
                    ty.push_subtype(subtype_at(slots, element)?);
                }
                if ty.type_of == ValueKind::Dictionary {
                    let key = usize::from(self.read_u16()?);
                    let value = usize::from(self.read_u16()?);
                    ty.push_subtype(subtype_at(slots, key)?);
                    ty.push_subtype(subtype_at(slots, value)?);
                }
                PoolSlot::Ready(Value::Type(ty))
            }
        };

        if verbose {
            match &slot {
                PoolSlot::Ready(value) => eprintln!("({} {})", value.kind(), value),
                PoolSlot::FunctionStub => eprintln!("(function)"),
            }
        }

        Ok(slot)
    }

    /// The `u8 kind, u8 constant` prefix shared by both type tags.
    fn read_type_head(&mut self) -> Result<TypeValue, ImageError> {
        let kind_byte = self.read_u8()?;
        let kind = ValueKind::try_from(kind_byte)
            .map_err(|_| ImageError::UnknownTypeKind(kind_byte))?;
        let constant = self.read_u8()? != 0;
        Ok(TypeValue::new(kind, constant))
    }
}

/// Fetch a ready (non-placeholder) pool slot. Compound literals may only
/// reference earlier slots, so a placeholder or out-of-range index is a
/// malformed image.
fn ready_value(slots: &[PoolSlot], index: usize) -> Result<&Value, ImageError> {
    match slots.get(index) {
        Some(PoolSlot::Ready(value)) => Ok(value),
        _ => Err(ImageError::BadPoolIndex {
            index,
            len: slots.len(),
        }),
    }
}

fn subtype_at(slots: &[PoolSlot], index: usize) -> Result<TypeValue, ImageError> {
    match ready_value(slots, index)? {
        Value::Type(ty) => Ok(ty.clone()),
        _ => Err(ImageError::BadPoolIndex {
            index,
            len: slots.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes() -> Vec<u8> {
        let mut bytes = vec![VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH];
        bytes.extend(b"test build\0");
        bytes.push(Opcode::SectionEnd as u8);
        bytes
    }

    #[test]
    fn test_read_header() {
        let bytes = header_bytes();
        let mut reader = ImageReader::new(&bytes);
        let header = reader.read_header().unwrap();
        assert_eq!(header.major, VERSION_MAJOR);
        assert_eq!(header.build, "test build");
        assert_eq!(reader.position(), bytes.len());
    }

    #[test]
    fn test_version_mismatch() {
        let mut bytes = header_bytes();
        bytes[0] = VERSION_MAJOR.wrapping_add(1);
        let mut reader = ImageReader::new(&bytes);
        assert!(matches!(
            reader.read_header(),
            Err(ImageError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_header() {
        let bytes = [VERSION_MAJOR, VERSION_MINOR];
        let mut reader = ImageReader::new(&bytes);
        assert!(matches!(reader.read_header(), Err(ImageError::Truncated)));
    }

    #[test]
    fn test_missing_header_terminator() {
        let mut bytes = vec![VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH];
        bytes.extend(b"build\0");
        bytes.push(0); // not a section terminator
        let mut reader = ImageReader::new(&bytes);
        assert!(matches!(
            reader.read_header(),
            Err(ImageError::MissingSectionEnd)
        ));
    }

    #[test]
    fn test_little_endian_scalars() {
        let bytes = [0x2A, 0x00, 0xFF, 0xFF, 0xFF, 0xFF];
        let mut reader = ImageReader::new(&bytes);
        assert_eq!(reader.read_u16().unwrap(), 42);
        assert_eq!(reader.read_i32().unwrap(), -1);
    }

    #[test]
    fn test_zstr_requires_terminator() {
        let bytes = b"abc";
        let mut reader = ImageReader::new(bytes);
        assert!(matches!(reader.read_zstr(), Err(ImageError::Truncated)));
    }
}

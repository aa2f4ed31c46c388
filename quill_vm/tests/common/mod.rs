//! Shared helpers for integration tests.
// This helper module is consumed selectively by the integration test files;
// keep the utilities available without forcing every helper to be referenced
// in each individual test target.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use quill_vm::image::{VERSION_BUILD, VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH};
use quill_vm::{Interpreter, LiteralTag, Opcode, ValueKind, VmConfig, VmError};

/// Assembles a Quill bytecode image by hand, standing in for the compiler
/// that lives outside this crate. Literal-adding methods return the pool
/// index of the entry they created.
#[derive(Debug, Default)]
pub struct ImageBuilder {
    literals: Vec<Vec<u8>>,
    function_bodies: Vec<Vec<u8>>,
    code: Vec<u8>,
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_literal(&mut self, encoded: Vec<u8>) -> u16 {
        self.literals.push(encoded);
        (self.literals.len() - 1) as u16
    }

    pub fn null(&mut self) -> u16 {
        self.add_literal(vec![LiteralTag::Null as u8])
    }

    pub fn boolean(&mut self, value: bool) -> u16 {
        self.add_literal(vec![LiteralTag::Boolean as u8, u8::from(value)])
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        let mut encoded = vec![LiteralTag::Integer as u8];
        encoded.extend(value.to_le_bytes());
        self.add_literal(encoded)
    }

    pub fn float(&mut self, value: f32) -> u16 {
        let mut encoded = vec![LiteralTag::Float as u8];
        encoded.extend(value.to_le_bytes());
        self.add_literal(encoded)
    }

    pub fn string(&mut self, value: &str) -> u16 {
        let mut encoded = vec![LiteralTag::String as u8];
        encoded.extend(value.as_bytes());
        encoded.push(0);
        self.add_literal(encoded)
    }

    pub fn identifier(&mut self, name: &str) -> u16 {
        let mut encoded = vec![LiteralTag::Identifier as u8];
        encoded.extend(name.as_bytes());
        encoded.push(0);
        self.add_literal(encoded)
    }

    pub fn type_of(&mut self, kind: ValueKind, constant: bool) -> u16 {
        self.add_literal(vec![
            LiteralTag::Type as u8,
            kind as u8,
            u8::from(constant),
        ])
    }

    /// Untyped declaration marker: a type literal whose kind byte is null.
    pub fn untyped(&mut self) -> u16 {
        self.type_of(ValueKind::Null, false)
    }

    /// A compound type carrying subtype pool indices.
    pub fn type_with_subtypes(
        &mut self,
        kind: ValueKind,
        constant: bool,
        subtypes: &[u16],
    ) -> u16 {
        let mut encoded = vec![
            LiteralTag::TypeIntermediate as u8,
            kind as u8,
            u8::from(constant),
        ];
        for index in subtypes {
            encoded.extend(index.to_le_bytes());
        }
        self.add_literal(encoded)
    }

    pub fn array(&mut self, element_indices: &[u16]) -> u16 {
        let mut encoded = vec![LiteralTag::Array as u8];
        encoded.extend((element_indices.len() as u16).to_le_bytes());
        for index in element_indices {
            encoded.extend(index.to_le_bytes());
        }
        self.add_literal(encoded)
    }

    pub fn dictionary(&mut self, pairs: &[(u16, u16)]) -> u16 {
        let mut encoded = vec![LiteralTag::Dictionary as u8];
        encoded.extend(((pairs.len() * 2) as u16).to_le_bytes());
        for (key, value) in pairs {
            encoded.extend(key.to_le_bytes());
            encoded.extend(value.to_le_bytes());
        }
        self.add_literal(encoded)
    }

    /// Register a function body and add its pool entry.
    pub fn function(&mut self, body: Vec<u8>) -> u16 {
        let ordinal = self.function_bodies.len() as u16;
        self.function_bodies.push(body);
        let mut encoded = vec![LiteralTag::Function as u8];
        encoded.extend(ordinal.to_le_bytes());
        self.add_literal(encoded)
    }

    // --- code emission ---

    pub fn op(&mut self, opcode: Opcode) -> &mut Self {
        self.code.push(opcode as u8);
        self
    }

    pub fn op_index(&mut self, opcode: Opcode, index: u16) -> &mut Self {
        self.code.push(opcode as u8);
        match opcode {
            Opcode::LiteralLong => self.code.extend(index.to_le_bytes()),
            _ => self.code.push(index as u8),
        }
        self
    }

    /// Short form `Literal` push.
    pub fn push_literal(&mut self, index: u16) -> &mut Self {
        self.op_index(Opcode::Literal, index)
    }

    pub fn op_pair(&mut self, opcode: Opcode, first: u16, second: u16) -> &mut Self {
        self.code.push(opcode as u8);
        match opcode {
            Opcode::VarDeclLong | Opcode::FnDeclLong => {
                self.code.extend(first.to_le_bytes());
                self.code.extend(second.to_le_bytes());
            }
            _ => {
                self.code.push(first as u8);
                self.code.push(second as u8);
            }
        }
        self
    }

    pub fn raw(&mut self, byte: u8) -> &mut Self {
        self.code.push(byte);
        self
    }

    /// Current offset in the code section, for jump targets.
    pub fn here(&self) -> u16 {
        self.code.len() as u16
    }

    /// Emit a jump opcode with a placeholder target; returns the operand
    /// position for a later `patch_jump`.
    pub fn emit_jump(&mut self, opcode: Opcode) -> usize {
        self.code.push(opcode as u8);
        let at = self.code.len();
        self.code.extend([0, 0]);
        at
    }

    pub fn patch_jump(&mut self, at: usize, target: u16) {
        self.code[at..at + 2].copy_from_slice(&target.to_le_bytes());
    }

    pub fn jump_to(&mut self, opcode: Opcode, target: u16) -> &mut Self {
        self.code.push(opcode as u8);
        self.code.extend(target.to_le_bytes());
        self
    }

    // --- assembly ---

    fn encode_sections(&self, out: &mut Vec<u8>) {
        // literal section
        out.extend((self.literals.len() as u16).to_le_bytes());
        for literal in &self.literals {
            out.extend(literal);
        }
        out.push(Opcode::SectionEnd as u8);

        // function section
        out.extend((self.function_bodies.len() as u16).to_le_bytes());
        let total: usize = self.function_bodies.iter().map(|b| b.len()).sum();
        out.extend((total as u16).to_le_bytes());
        for body in &self.function_bodies {
            out.extend((body.len() as u16).to_le_bytes());
            out.extend(body);
        }
        out.push(Opcode::SectionEnd as u8);
    }

    /// Assemble a complete top-level image.
    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH];
        out.extend(VERSION_BUILD.as_bytes());
        out.push(0);
        out.push(Opcode::SectionEnd as u8);

        self.encode_sections(&mut out);

        out.extend(&self.code);
        out.push(Opcode::Eof as u8);
        out
    }

    /// Assemble a function body: embedded sections, the parameter and
    /// return descriptor indices, the code, and the end marker.
    pub fn build_function_body(&self, parameter_array: u16, return_array: u16) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_sections(&mut out);
        out.extend(parameter_array.to_le_bytes());
        out.extend(return_array.to_le_bytes());
        out.extend(&self.code);
        out.push(Opcode::FnReturn as u8);
        out.push(Opcode::FnEnd as u8);
        out
    }

    /// Like `build_function_body` but without the implicit trailing
    /// return, for bodies that manage their own.
    pub fn build_function_body_no_return(
        &self,
        parameter_array: u16,
        return_array: u16,
    ) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_sections(&mut out);
        out.extend(parameter_array.to_le_bytes());
        out.extend(return_array.to_le_bytes());
        out.extend(&self.code);
        out.push(Opcode::FnEnd as u8);
        out
    }
}

/// Captured output of one run.
#[derive(Debug)]
pub struct RunResult {
    pub prints: Vec<String>,
    pub asserts: Vec<String>,
    pub result: Result<(), VmError>,
}

impl RunResult {
    pub fn ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run an image on a fresh interpreter with capture sinks installed.
pub fn run_image(image: &[u8]) -> RunResult {
    let mut interpreter = Interpreter::new(VmConfig::default());
    run_on(&mut interpreter, image)
}

/// Run an image on an existing interpreter (REPL-style reuse), capturing
/// both sinks for the duration of the run.
pub fn run_on(interpreter: &mut Interpreter, image: &[u8]) -> RunResult {
    let prints: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let asserts: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

    let print_capture = prints.clone();
    interpreter.set_print(move |line| print_capture.borrow_mut().push(line.to_string()));
    let assert_capture = asserts.clone();
    interpreter.set_assert(move |message| assert_capture.borrow_mut().push(message.to_string()));

    let result = interpreter.run(image);
    let prints = prints.borrow().clone();
    let asserts = asserts.borrow().clone();
    RunResult {
        prints,
        asserts,
        result,
    }
}

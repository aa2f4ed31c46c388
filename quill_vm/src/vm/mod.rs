//! The interpreter.
//!
//! One `Interpreter` instance owns a constant pool, an operand stack, and a
//! scope chain. Function calls build a fresh inner interpreter over the
//! callee's bytecode; the inner instance shares the caller's output sinks
//! and runs with a new scope frame pushed onto the function's declaration
//! scope.

pub mod error;
mod exec;

pub use error::VmError;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::image::{ImageError, ImageReader, VERSION_BUILD};
use crate::scope::{Scope, ScopeHandle};
use crate::value::{LiteralArray, Value};

/// Output sink shared between an interpreter and its inner call frames.
pub type OutputFn = Rc<RefCell<dyn FnMut(&str)>>;

/// Host-supplied interpreter settings, threaded through every instance
/// instead of living in process-wide state.
#[derive(Debug, Clone, Default)]
pub struct VmConfig {
    /// Trace literal loading and opcode dispatch to stderr.
    pub verbose: bool,
}

pub struct Interpreter {
    code: Rc<[u8]>,
    length: usize,
    /// Read cursor into `code`.
    count: usize,
    /// Start of the current code section; jump targets are relative to it.
    code_start: usize,
    literal_cache: Vec<Value>,
    stack: LiteralArray,
    scope: ScopeHandle,
    print_output: OutputFn,
    assert_output: OutputFn,
    config: VmConfig,
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("length", &self.length)
            .field("count", &self.count)
            .field("code_start", &self.code_start)
            .field("literals", &self.literal_cache.len())
            .field("stack_depth", &self.stack.len())
            .finish()
    }
}

fn stdout_sink() -> OutputFn {
    Rc::new(RefCell::new(|line: &str| println!("{}", line)))
}

fn stderr_assert_sink() -> OutputFn {
    Rc::new(RefCell::new(|message: &str| {
        eprintln!("Assertion failure: {}", message)
    }))
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(VmConfig::default())
    }
}

impl Interpreter {
    pub fn new(config: VmConfig) -> Self {
        Self::with_shared(stdout_sink(), stderr_assert_sink(), config)
    }

    /// Constructor used for inner call frames: same sinks, same config,
    /// fresh everything else.
    pub(crate) fn with_shared(
        print_output: OutputFn,
        assert_output: OutputFn,
        config: VmConfig,
    ) -> Self {
        Self {
            code: Rc::from(Vec::new()),
            length: 0,
            count: 0,
            code_start: 0,
            literal_cache: Vec::new(),
            stack: LiteralArray::new(),
            scope: Scope::push(None),
            print_output,
            assert_output,
            config,
        }
    }

    /// Replace the print sink (default: stdout plus a trailing newline).
    pub fn set_print<F: FnMut(&str) + 'static>(&mut self, sink: F) {
        self.print_output = Rc::new(RefCell::new(sink));
    }

    /// Replace the assertion sink (default: stderr with an
    /// "Assertion failure: " prefix).
    pub fn set_assert<F: FnMut(&str) + 'static>(&mut self, sink: F) {
        self.assert_output = Rc::new(RefCell::new(sink));
    }

    /// Execute an image to completion.
    ///
    /// Any error is reported once through the configured sink and also
    /// returned to the embedding host. The operand stack is cleared
    /// afterwards, successful or not, so a REPL can reuse the instance;
    /// the scope chain (and everything declared in it) is kept.
    pub fn run(&mut self, image: &[u8]) -> Result<(), VmError> {
        let result = self.run_image(image);
        if let Err(err) = &result {
            self.report(err);
        }
        self.stack.clear();
        result
    }

    fn run_image(&mut self, image: &[u8]) -> Result<(), VmError> {
        if image.is_empty() {
            return Err(VmError::Image(ImageError::Truncated));
        }
        self.code = Rc::from(image);
        self.length = image.len();
        self.count = 0;
        self.literal_cache.clear();

        let code = self.code.clone();
        let mut reader = ImageReader::new(&code);
        let header = reader.read_header()?;
        if self.config.verbose && header.build != VERSION_BUILD {
            eprintln!(
                "warning: interpreter/bytecode build mismatch (image built by \"{}\")",
                header.build
            );
        }
        self.literal_cache = reader.read_constant_pool(self.config.verbose)?;
        self.count = reader.position();

        if self.config.verbose {
            eprintln!("executing bytecode");
        }
        self.dispatch_loop()
    }

    /// Parse the literal and function sections embedded at the start of a
    /// function body. Used when this instance is an inner call frame.
    pub(crate) fn read_embedded_sections(&mut self) -> Result<(), VmError> {
        let code = self.code.clone();
        let mut reader = ImageReader::new(&code);
        self.literal_cache = reader.read_constant_pool(self.config.verbose)?;
        self.count = reader.position();
        Ok(())
    }

    /// Report an error through the print sink. Assertion failures were
    /// already emitted through the assert sink when they were raised.
    pub(crate) fn report(&self, err: &VmError) {
        if matches!(err, VmError::AssertionFailed(_)) {
            return;
        }
        (self.print_output.borrow_mut())(&format!("error: {}", err));
    }

    pub(crate) fn emit_print(&self, line: &str) {
        (self.print_output.borrow_mut())(line);
    }

    pub(crate) fn emit_assert(&self, message: &str) {
        (self.assert_output.borrow_mut())(message);
    }

    /// Depth of the operand stack; statements leave it where they found it.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn read_byte(&mut self) -> Result<u8, VmError> {
        let byte = self
            .code
            .get(self.count)
            .copied()
            .ok_or_else(|| VmError::Internal("read past the end of the bytecode".to_string()))?;
        self.count += 1;
        Ok(byte)
    }

    pub(crate) fn read_short(&mut self) -> Result<u16, VmError> {
        let low = self.read_byte()?;
        let high = self.read_byte()?;
        Ok(u16::from_le_bytes([low, high]))
    }

    /// Pop the operand stack. An empty stack here is a compiler bug, not a
    /// user error.
    pub(crate) fn pop_stack(&mut self) -> Result<Value, VmError> {
        self.stack
            .pop()
            .ok_or_else(|| VmError::Internal("operand stack underflow".to_string()))
    }

    /// Replace an identifier with the value bound to its name; every other
    /// kind passes through unchanged.
    pub(crate) fn resolve(&self, value: Value) -> Result<Value, VmError> {
        match value {
            Value::Identifier(id) => Scope::get(&self.scope, id.name())
                .ok_or_else(|| VmError::Undeclared(id.name().to_string())),
            other => Ok(other),
        }
    }

    pub(crate) fn pop_resolved(&mut self) -> Result<Value, VmError> {
        let value = self.pop_stack()?;
        self.resolve(value)
    }

    pub(crate) fn cached_literal(&self, index: usize) -> Result<Value, VmError> {
        self.literal_cache.get(index).cloned().ok_or_else(|| {
            VmError::Internal(format!(
                "literal index {} out of range for a pool of {}",
                index,
                self.literal_cache.len()
            ))
        })
    }
}

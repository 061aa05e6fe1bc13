//! Runtime interpreter error implementation

use crate::module::OpcodeRepr;

use std::io;
use thiserror::Error;

/// Recoverable fault raised by primitive operations, the heap, frames or an
/// opcode handler. Carries enough structure for the interpreter to attach its
/// dispatch context on the way out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// A value of one type was used where another was required.
    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch {
        /// The type the operation required.
        expected: &'static str,
        /// The type it was given.
        actual: &'static str,
    },
    /// A constant pool entry had the wrong variant for the opcode reading it.
    #[error("constant {index} is not a {expected} constant")]
    ConstantTypeMismatch {
        /// Index into the constant pool.
        index: u64,
        /// The constant variant the opcode required.
        expected: &'static str,
    },
    /// A function was invoked with the wrong number of arguments.
    #[error("{function} takes {expected} argument(s), {provided} provided")]
    ArityMismatch {
        /// Name of the callee.
        function: String,
        /// Declared arity.
        expected: u64,
        /// Argument count at the call site.
        provided: u64,
    },
    /// An index was outside the addressed sequence.
    #[error("index {index} out of bounds for length {length}")]
    IndexOutOfBounds {
        /// The offending index.
        index: u64,
        /// Length of the sequence.
        length: u64,
    },
    /// Pop from an empty operand stack, or frame access on an empty call
    /// stack.
    #[error("stack underflow")]
    StackUnderflow,
    /// Push beyond the call stack bound.
    #[error("stack overflow")]
    StackOverflow,
    /// The heap could not satisfy an allocation, even after a collection.
    #[error("out of memory: requested {requested} bytes, {available} available")]
    OutOfMemory {
        /// Bytes requested.
        requested: u64,
        /// Bytes available after collection.
        available: u64,
    },
    /// A heap address or allocation length violated word alignment.
    #[error("value {value:#x} is not aligned to a word boundary")]
    AlignmentError {
        /// The misaligned value.
        value: u64,
    },
    /// A scalar did not fit the tagged 61-bit payload.
    #[error("value {value} does not fit the tagged integer range")]
    ValueOverflow {
        /// The out-of-range value.
        value: i128,
    },
    /// Lookup of an unregistered native function.
    #[error("native function {name} is not defined")]
    UndefinedNative {
        /// Requested native name.
        name: String,
    },
    /// Invocation of a function absent from the module registry.
    #[error("function {module}/{function} is not defined")]
    UndefinedFunction {
        /// Requested module name.
        module: String,
        /// Requested function name.
        function: String,
    },
}

/// Failures loading, assembling or registering a module.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// The module file was produced for another format version.
    #[error("incompatible module version {found}, need {expected}")]
    IncompatibleVersion {
        /// Version read from the file.
        found: u64,
        /// Version this reader understands.
        expected: u64,
    },
    /// An opcode tag or mnemonic the reader does not know.
    #[error("unknown opcode {opcode}")]
    UnknownOpcode {
        /// The unrecognized tag or mnemonic.
        opcode: String,
    },
    /// Structurally invalid module data.
    #[error("bad bytecode encoding: {reason}")]
    BadBytecodeEncoding {
        /// What the reader or assembler choked on.
        reason: String,
    },
    /// Registration under a module name that is already taken.
    #[error("module {name} is already registered")]
    DuplicateModule {
        /// The duplicated name.
        name: String,
    },
    /// A module declaring the same function name twice.
    #[error("function {module}/{function} is defined more than once")]
    DuplicateFunction {
        /// The module being registered.
        module: String,
        /// The duplicated function name.
        function: String,
    },
    /// Registration under a native name that is already taken.
    #[error("native function {name} is already registered")]
    DuplicateNative {
        /// The duplicated name.
        name: String,
    },
    /// I/O and OS related errors.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Interpreter error surfaced at the host boundary.
#[derive(Debug, Error)]
pub enum InterpreterError {
    /// An opcode handler faulted. The dispatch context is attached so the
    /// host can report where execution stopped.
    #[error("trap in {module}/{function} at pc {pc} ({opcode}): {source}")]
    Trap {
        /// Module of the faulting frame.
        module: String,
        /// Function of the faulting frame.
        function: String,
        /// Program counter at the fault.
        pc: usize,
        /// The opcode being executed.
        opcode: OpcodeRepr,
        /// The underlying fault.
        source: RuntimeError,
    },
    /// A fault outside any dispatch context (entrypoint resolution, host
    /// calls into the heap, …).
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    /// Module loading or registration failed.
    #[error(transparent)]
    Module(#[from] ModuleError),
}

impl InterpreterError {
    /// Attach dispatch context to a runtime fault.
    pub fn trap(module: &str, function: &str, pc: usize, opcode: OpcodeRepr, source: RuntimeError) -> Self {
        Self::Trap {
            module: module.to_owned(),
            function: function.to_owned(),
            pc,
            opcode,
            source,
        }
    }

    /// Return the underlying runtime fault, if this error carries one.
    pub const fn runtime(&self) -> Option<&RuntimeError> {
        match self {
            Self::Trap { source, .. } => Some(source),
            Self::Runtime(source) => Some(source),
            Self::Module(_) => None,
        }
    }
}

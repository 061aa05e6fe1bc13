//! Module and bytecode model: the unit of loading and the instruction set.

use crate::error::{ModuleError, RuntimeError};

use num_enum::TryFromPrimitive;

use std::fmt;

/// Wire tag of an [`Opcode`], without its argument.
///
/// The discriminants are the byte tags of the module binary format; the
/// `Display`/`FromStr` names are the assembler mnemonics.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, strum::Display, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum OpcodeRepr {
    /// Terminate the dispatch loop.
    Halt = 0x00,
    /// Push nil.
    LoadNil = 0x01,
    /// Push boolean true.
    LoadTrue = 0x02,
    /// Push boolean false.
    LoadFalse = 0x03,
    /// Push an integer constant.
    LoadInteger = 0x04,
    /// Allocate a string constant on the heap and push the reference.
    LoadString = 0x05,
    /// Push an integer carried as an immediate.
    LoadUnsigned = 0x06,
    /// Push a local.
    LoadLocal = 0x07,
    /// Pop into a local.
    StoreLocal = 0x08,
    /// Discard the top of the operand stack.
    Pop = 0x09,
    /// Unconditional branch.
    Jump = 0x0a,
    /// Branch when the popped value is boolean false.
    JumpIfFalse = 0x0b,
    /// Call the function named by an invocation constant.
    Invoke = 0x0c,
    /// Return the top of the operand stack to the caller.
    Return = 0x0d,
}

impl OpcodeRepr {
    /// Whether the encoded instruction carries a u64 argument.
    pub const fn has_argument(&self) -> bool {
        matches!(
            self,
            Self::LoadInteger
                | Self::LoadString
                | Self::LoadUnsigned
                | Self::LoadLocal
                | Self::StoreLocal
                | Self::Jump
                | Self::JumpIfFalse
                | Self::Invoke
        )
    }
}

/// One instruction: an opcode together with its argument, if it carries one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Opcode {
    /// Terminate the dispatch loop.
    Halt,
    /// Push nil.
    LoadNil,
    /// Push boolean true.
    LoadTrue,
    /// Push boolean false.
    LoadFalse,
    /// Push the integer constant at the index.
    LoadInteger(u64),
    /// Allocate the string constant at the index, push the reference.
    LoadString(u64),
    /// Push an integer carrying the immediate.
    LoadUnsigned(u64),
    /// Push `locals[index]`.
    LoadLocal(u64),
    /// Pop into `locals[index]`.
    StoreLocal(u64),
    /// Discard the top of the operand stack.
    Pop,
    /// Set the program counter to the target.
    Jump(u64),
    /// Pop; on boolean false set the program counter to the target.
    JumpIfFalse(u64),
    /// Call the function named by the invocation constant at the index.
    Invoke(u64),
    /// Return the top of the operand stack to the caller.
    Return,
}

impl Opcode {
    /// The wire tag of this instruction.
    pub const fn repr(&self) -> OpcodeRepr {
        match self {
            Self::Halt => OpcodeRepr::Halt,
            Self::LoadNil => OpcodeRepr::LoadNil,
            Self::LoadTrue => OpcodeRepr::LoadTrue,
            Self::LoadFalse => OpcodeRepr::LoadFalse,
            Self::LoadInteger(_) => OpcodeRepr::LoadInteger,
            Self::LoadString(_) => OpcodeRepr::LoadString,
            Self::LoadUnsigned(_) => OpcodeRepr::LoadUnsigned,
            Self::LoadLocal(_) => OpcodeRepr::LoadLocal,
            Self::StoreLocal(_) => OpcodeRepr::StoreLocal,
            Self::Pop => OpcodeRepr::Pop,
            Self::Jump(_) => OpcodeRepr::Jump,
            Self::JumpIfFalse(_) => OpcodeRepr::JumpIfFalse,
            Self::Invoke(_) => OpcodeRepr::Invoke,
            Self::Return => OpcodeRepr::Return,
        }
    }

    /// The argument of this instruction, if its opcode carries one.
    pub const fn argument(&self) -> Option<u64> {
        match self {
            Self::LoadInteger(arg)
            | Self::LoadString(arg)
            | Self::LoadUnsigned(arg)
            | Self::LoadLocal(arg)
            | Self::StoreLocal(arg)
            | Self::Jump(arg)
            | Self::JumpIfFalse(arg)
            | Self::Invoke(arg) => Some(*arg),
            _ => None,
        }
    }

    /// Recombine a wire tag with its decoded argument. Fails with
    /// `BadBytecodeEncoding` when the argument presence disagrees with the
    /// opcode.
    pub fn from_parts(repr: OpcodeRepr, argument: Option<u64>) -> Result<Self, ModuleError> {
        let opcode = match (repr, argument) {
            (OpcodeRepr::Halt, None) => Self::Halt,
            (OpcodeRepr::LoadNil, None) => Self::LoadNil,
            (OpcodeRepr::LoadTrue, None) => Self::LoadTrue,
            (OpcodeRepr::LoadFalse, None) => Self::LoadFalse,
            (OpcodeRepr::LoadInteger, Some(arg)) => Self::LoadInteger(arg),
            (OpcodeRepr::LoadString, Some(arg)) => Self::LoadString(arg),
            (OpcodeRepr::LoadUnsigned, Some(arg)) => Self::LoadUnsigned(arg),
            (OpcodeRepr::LoadLocal, Some(arg)) => Self::LoadLocal(arg),
            (OpcodeRepr::StoreLocal, Some(arg)) => Self::StoreLocal(arg),
            (OpcodeRepr::Pop, None) => Self::Pop,
            (OpcodeRepr::Jump, Some(arg)) => Self::Jump(arg),
            (OpcodeRepr::JumpIfFalse, Some(arg)) => Self::JumpIfFalse(arg),
            (OpcodeRepr::Invoke, Some(arg)) => Self::Invoke(arg),
            (OpcodeRepr::Return, None) => Self::Return,
            (repr, argument) => {
                let reason = match argument {
                    Some(_) => format!("opcode {repr} does not take an argument"),
                    None => format!("opcode {repr} requires an argument"),
                };
                return Err(ModuleError::BadBytecodeEncoding { reason });
            }
        };
        Ok(opcode)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.argument() {
            Some(argument) => write!(f, "{} {}", self.repr(), argument),
            None => write!(f, "{}", self.repr()),
        }
    }
}

/// Wire tag of a [`Constant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum ConstantRepr {
    /// An i64.
    Integer = 0x00,
    /// Length-prefixed raw bytes.
    String = 0x01,
    /// A callee description.
    Invocation = 0x02,
}

/// A named call target in the constant pool: indices of the module and
/// function name string constants, plus the argument count at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Invocation {
    module_name: u64,
    function_name: u64,
    argument_count: u64,
}

impl Invocation {
    /// Create an invocation description.
    pub const fn new(module_name: u64, function_name: u64, argument_count: u64) -> Self {
        Self {
            module_name,
            function_name,
            argument_count,
        }
    }

    /// Constant pool index of the module name.
    pub const fn module_name(&self) -> u64 {
        self.module_name
    }

    /// Constant pool index of the function name.
    pub const fn function_name(&self) -> u64 {
        self.function_name
    }

    /// Argument count at the call site.
    pub const fn argument_count(&self) -> u64 {
        self.argument_count
    }
}

/// Constant pool entry.
///
/// String constants are raw bytes; no encoding is imposed at this layer.
/// Call sites that need text (name resolution, rendering) interpret the
/// bytes themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Constant {
    /// Integer literal.
    Integer(i64),
    /// Byte-string literal.
    String(Vec<u8>),
    /// Callee description for `Invoke`.
    Invocation(Invocation),
}

impl Constant {
    /// The wire tag of this constant.
    pub const fn repr(&self) -> ConstantRepr {
        match self {
            Self::Integer(_) => ConstantRepr::Integer,
            Self::String(_) => ConstantRepr::String,
            Self::Invocation(_) => ConstantRepr::Invocation,
        }
    }

    /// The integer payload; `index` only feeds the error.
    pub fn as_integer(&self, index: u64) -> Result<i64, RuntimeError> {
        match self {
            Self::Integer(value) => Ok(*value),
            _ => Err(RuntimeError::ConstantTypeMismatch { index, expected: "integer" }),
        }
    }

    /// The string payload, as raw bytes; `index` only feeds the error.
    pub fn as_string(&self, index: u64) -> Result<&[u8], RuntimeError> {
        match self {
            Self::String(value) => Ok(value),
            _ => Err(RuntimeError::ConstantTypeMismatch { index, expected: "string" }),
        }
    }

    /// The invocation payload; `index` only feeds the error.
    pub fn as_invocation(&self, index: u64) -> Result<&Invocation, RuntimeError> {
        match self {
            Self::Invocation(value) => Ok(value),
            _ => Err(RuntimeError::ConstantTypeMismatch { index, expected: "invocation" }),
        }
    }
}

/// A compiled function.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Function {
    name: String,
    arity: u64,
    locals: u64,
    bytecode: Vec<Opcode>,
}

impl Function {
    /// Create a function.
    pub const fn new(name: String, arity: u64, locals: u64, bytecode: Vec<Opcode>) -> Self {
        Self {
            name,
            arity,
            locals,
            bytecode,
        }
    }

    /// Function name, unique within its module.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of arguments the function takes. Arguments arrive in the
    /// first `arity` locals.
    pub const fn arity(&self) -> u64 {
        self.arity
    }

    /// Number of local slots, arguments included.
    pub const fn locals(&self) -> u64 {
        self.locals
    }

    /// The instruction list.
    pub fn bytecode(&self) -> &[Opcode] {
        &self.bytecode
    }
}

/// The unit of compilation and loading.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Module {
    version: u64,
    name: String,
    imports: Vec<String>,
    exports: Vec<String>,
    functions: Vec<Function>,
    constants: Vec<Constant>,
}

impl Module {
    /// Create a module.
    pub const fn new(
        version: u64,
        name: String,
        imports: Vec<String>,
        exports: Vec<String>,
        functions: Vec<Function>,
        constants: Vec<Constant>,
    ) -> Self {
        Self {
            version,
            name,
            imports,
            exports,
            functions,
            constants,
        }
    }

    /// Format version the module was produced for.
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Module name, the registry key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of modules this module calls into.
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    /// Names of functions this module offers.
    pub fn exports(&self) -> &[String] {
        &self.exports
    }

    /// The compiled functions.
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// The constant pool.
    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }
}

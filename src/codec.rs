//! Binary module encoding.
//!
//! All integers are little-endian. Strings are a u64 length followed by raw
//! bytes. The layout is: version, module name, imports, exports, functions,
//! constants. A function is name, arity, locals, and its tagged instruction
//! list; instructions and constants are a one-byte tag followed by their
//! payload, if any.

use crate::error::ModuleError;
use crate::module::{Constant, ConstantRepr, Function, Invocation, Module, Opcode, OpcodeRepr};

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// The only module format version this reader accepts.
pub const COMPATIBLE_VERSION: u64 = 1;

/// Encode `module` into `out`.
pub fn encode<W: Write>(module: &Module, out: &mut W) -> Result<(), ModuleError> {
    write_u64(out, module.version())?;
    write_string(out, module.name())?;
    write_string_list(out, module.imports())?;
    write_string_list(out, module.exports())?;

    write_u64(out, module.functions().len() as u64)?;
    for function in module.functions() {
        write_function(out, function)?;
    }

    write_u64(out, module.constants().len() as u64)?;
    for constant in module.constants() {
        write_constant(out, constant)?;
    }

    Ok(())
}

/// Decode a module from `input`, gating on [`COMPATIBLE_VERSION`].
pub fn decode<R: Read>(input: &mut R) -> Result<Module, ModuleError> {
    let version = read_u64(input)?;
    if version != COMPATIBLE_VERSION {
        return Err(ModuleError::IncompatibleVersion {
            found: version,
            expected: COMPATIBLE_VERSION,
        });
    }

    let name = read_string(input)?;
    let imports = read_string_list(input)?;
    let exports = read_string_list(input)?;

    let function_count = read_u64(input)?;
    let mut functions = Vec::with_capacity(function_count.min(1024) as usize);
    for _ in 0..function_count {
        functions.push(read_function(input)?);
    }

    let constant_count = read_u64(input)?;
    let mut constants = Vec::with_capacity(constant_count.min(1024) as usize);
    for _ in 0..constant_count {
        constants.push(read_constant(input)?);
    }

    Ok(Module::new(version, name, imports, exports, functions, constants))
}

/// Decode the module stored at `path`.
pub fn read_file(path: &Path) -> Result<Module, ModuleError> {
    let file = File::open(path)?;
    decode(&mut BufReader::new(file))
}

/// Encode `module` into the file at `path`.
pub fn write_file(module: &Module, path: &Path) -> Result<(), ModuleError> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    encode(module, &mut out)?;
    out.flush()?;
    Ok(())
}

fn write_function<W: Write>(out: &mut W, function: &Function) -> Result<(), ModuleError> {
    write_string(out, function.name())?;
    write_u64(out, function.arity())?;
    write_u64(out, function.locals())?;
    write_u64(out, function.bytecode().len() as u64)?;
    for opcode in function.bytecode() {
        write_u8(out, opcode.repr() as u8)?;
        if let Some(argument) = opcode.argument() {
            write_u64(out, argument)?;
        }
    }
    Ok(())
}

fn read_function<R: Read>(input: &mut R) -> Result<Function, ModuleError> {
    let name = read_string(input)?;
    let arity = read_u64(input)?;
    let locals = read_u64(input)?;
    let count = read_u64(input)?;
    let mut bytecode = Vec::with_capacity(count.min(4096) as usize);
    for _ in 0..count {
        bytecode.push(read_opcode(input)?);
    }
    Ok(Function::new(name, arity, locals, bytecode))
}

fn read_opcode<R: Read>(input: &mut R) -> Result<Opcode, ModuleError> {
    let tag = read_u8(input)?;
    let repr = OpcodeRepr::try_from(tag).map_err(|_| ModuleError::UnknownOpcode {
        opcode: format!("{tag:#04x}"),
    })?;
    let argument = if repr.has_argument() {
        Some(read_u64(input)?)
    } else {
        None
    };
    Opcode::from_parts(repr, argument)
}

fn write_constant<W: Write>(out: &mut W, constant: &Constant) -> Result<(), ModuleError> {
    write_u8(out, constant.repr() as u8)?;
    match constant {
        Constant::Integer(value) => write_i64(out, *value),
        Constant::String(value) => write_byte_string(out, value),
        Constant::Invocation(invocation) => {
            write_u64(out, invocation.module_name())?;
            write_u64(out, invocation.function_name())?;
            write_u64(out, invocation.argument_count())
        }
    }
}

fn read_constant<R: Read>(input: &mut R) -> Result<Constant, ModuleError> {
    let tag = read_u8(input)?;
    let repr = ConstantRepr::try_from(tag).map_err(|_| ModuleError::BadBytecodeEncoding {
        reason: format!("unknown constant tag {tag:#04x}"),
    })?;
    let constant = match repr {
        ConstantRepr::Integer => Constant::Integer(read_i64(input)?),
        ConstantRepr::String => Constant::String(read_byte_string(input)?),
        ConstantRepr::Invocation => {
            let module_name = read_u64(input)?;
            let function_name = read_u64(input)?;
            let argument_count = read_u64(input)?;
            Constant::Invocation(Invocation::new(module_name, function_name, argument_count))
        }
    };
    Ok(constant)
}

fn write_string_list<W: Write>(out: &mut W, items: &[String]) -> Result<(), ModuleError> {
    write_u64(out, items.len() as u64)?;
    for item in items {
        write_string(out, item)?;
    }
    Ok(())
}

fn read_string_list<R: Read>(input: &mut R) -> Result<Vec<String>, ModuleError> {
    let count = read_u64(input)?;
    let mut items = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        items.push(read_string(input)?);
    }
    Ok(items)
}

fn write_byte_string<W: Write>(out: &mut W, value: &[u8]) -> Result<(), ModuleError> {
    write_u64(out, value.len() as u64)?;
    out.write_all(value)?;
    Ok(())
}

// String constants carry arbitrary bytes; no encoding is imposed here.
fn read_byte_string<R: Read>(input: &mut R) -> Result<Vec<u8>, ModuleError> {
    let length = read_u64(input)?;
    // strings must fit a heap allocation, whose size field is 32 bits
    if length > u32::MAX as u64 {
        return Err(ModuleError::BadBytecodeEncoding {
            reason: format!("string length {length} is not representable"),
        });
    }
    let mut bytes = vec![0u8; length as usize];
    input.read_exact(&mut bytes)?;
    Ok(bytes)
}

fn write_string<W: Write>(out: &mut W, value: &str) -> Result<(), ModuleError> {
    write_byte_string(out, value.as_bytes())
}

// Names key the registries, which hold them as text; unlike string
// constants they must decode.
fn read_string<R: Read>(input: &mut R) -> Result<String, ModuleError> {
    String::from_utf8(read_byte_string(input)?).map_err(|_| ModuleError::BadBytecodeEncoding {
        reason: "name is not valid utf-8".to_owned(),
    })
}

fn write_u64<W: Write>(out: &mut W, value: u64) -> Result<(), ModuleError> {
    out.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn read_u64<R: Read>(input: &mut R) -> Result<u64, ModuleError> {
    let mut bytes = [0u8; 8];
    input.read_exact(&mut bytes)?;
    Ok(u64::from_le_bytes(bytes))
}

fn write_i64<W: Write>(out: &mut W, value: i64) -> Result<(), ModuleError> {
    out.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn read_i64<R: Read>(input: &mut R) -> Result<i64, ModuleError> {
    let mut bytes = [0u8; 8];
    input.read_exact(&mut bytes)?;
    Ok(i64::from_le_bytes(bytes))
}

fn write_u8<W: Write>(out: &mut W, value: u8) -> Result<(), ModuleError> {
    out.write_all(&[value])?;
    Ok(())
}

fn read_u8<R: Read>(input: &mut R) -> Result<u8, ModuleError> {
    let mut byte = [0u8; 1];
    input.read_exact(&mut byte)?;
    Ok(byte[0])
}

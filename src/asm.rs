//! Line-oriented assembler for the module binary format.
//!
//! Empty lines and lines starting with `;` are ignored. `@`-directives build
//! the module envelope and the constant pool; any other line is an opcode
//! mnemonic (matching the instruction's enum name) with an optional
//! argument.

use crate::error::ModuleError;
use crate::module::{Constant, Function, Invocation, Module, Opcode, OpcodeRepr};

use std::str::FromStr;

#[derive(Default)]
struct FunctionBuilder {
    name: String,
    arity: u64,
    locals: u64,
    bytecode: Vec<Opcode>,
}

/// Assemble `source` into a module.
pub fn assemble(source: &str) -> Result<Module, ModuleError> {
    let mut version = 0;
    let mut name = String::new();
    let mut imports = Vec::new();
    let mut exports = Vec::new();
    let mut functions = Vec::new();
    let mut constants = Vec::new();
    let mut current: Option<FunctionBuilder> = None;

    for (index, line) in source.lines().enumerate() {
        let number = index + 1;
        let line = line.trim_start();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            continue;
        };

        match first {
            "@version" => version = parse_u64(tokens.next(), number)?,
            "@module" => name = required(tokens.next(), number)?.to_owned(),
            "@import" => imports.push(required(tokens.next(), number)?.to_owned()),
            "@export" => exports.push(required(tokens.next(), number)?.to_owned()),
            "@integer" => constants.push(Constant::Integer(parse_i64(tokens.next(), number)?)),
            "@string" => constants.push(Constant::String(parse_string_directive(line, number)?)),
            "@invocation" => {
                let module_name = parse_u64(tokens.next(), number)?;
                let function_name = parse_u64(tokens.next(), number)?;
                let argument_count = parse_u64(tokens.next(), number)?;
                constants.push(Constant::Invocation(Invocation::new(
                    module_name,
                    function_name,
                    argument_count,
                )));
            }
            "@function" => {
                if current.is_some() {
                    return Err(bad_line(number, "@function before @endfunction"));
                }
                current = Some(FunctionBuilder {
                    name: required(tokens.next(), number)?.to_owned(),
                    ..FunctionBuilder::default()
                });
            }
            "@arity" => in_function(&mut current, number)?.arity = parse_u64(tokens.next(), number)?,
            "@locals" => in_function(&mut current, number)?.locals = parse_u64(tokens.next(), number)?,
            "@endfunction" => {
                let builder = current.take().ok_or_else(|| bad_line(number, "@endfunction without @function"))?;
                functions.push(Function::new(builder.name, builder.arity, builder.locals, builder.bytecode));
            }
            mnemonic => {
                let repr = OpcodeRepr::from_str(mnemonic).map_err(|_| ModuleError::UnknownOpcode {
                    opcode: mnemonic.to_owned(),
                })?;
                let argument = if repr.has_argument() {
                    Some(parse_u64(tokens.next(), number)?)
                } else {
                    None
                };
                let opcode = Opcode::from_parts(repr, argument)?;
                in_function(&mut current, number)?.bytecode.push(opcode);
            }
        }
    }

    if current.is_some() {
        return Err(ModuleError::BadBytecodeEncoding {
            reason: "missing @endfunction".to_owned(),
        });
    }

    Ok(Module::new(version, name, imports, exports, functions, constants))
}

/// `@string <length> <payload>`: the payload is the `length` raw bytes after
/// the single space following the length token, taken as-is.
fn parse_string_directive(line: &str, number: usize) -> Result<Vec<u8>, ModuleError> {
    let rest = line
        .strip_prefix("@string")
        .and_then(|rest| rest.strip_prefix(' '))
        .ok_or_else(|| bad_line(number, "@string requires a length"))?;
    let (length, payload) = match rest.find(' ') {
        Some(split) => (&rest[..split], &rest[split + 1..]),
        None => (rest, ""),
    };
    let length: usize = length
        .parse()
        .map_err(|_| bad_line(number, "@string length is not a number"))?;
    if payload.len() < length {
        return Err(bad_line(number, "@string payload shorter than its length"));
    }
    Ok(payload.as_bytes()[..length].to_vec())
}

fn in_function<'b>(
    current: &'b mut Option<FunctionBuilder>,
    number: usize,
) -> Result<&'b mut FunctionBuilder, ModuleError> {
    current
        .as_mut()
        .ok_or_else(|| bad_line(number, "directive outside a @function block"))
}

fn required(token: Option<&str>, number: usize) -> Result<&str, ModuleError> {
    token.ok_or_else(|| bad_line(number, "missing argument"))
}

fn parse_u64(token: Option<&str>, number: usize) -> Result<u64, ModuleError> {
    required(token, number)?
        .parse()
        .map_err(|_| bad_line(number, "expected an unsigned number"))
}

fn parse_i64(token: Option<&str>, number: usize) -> Result<i64, ModuleError> {
    required(token, number)?
        .parse()
        .map_err(|_| bad_line(number, "expected a signed number"))
}

fn bad_line(number: usize, reason: &str) -> ModuleError {
    ModuleError::BadBytecodeEncoding {
        reason: format!("line {number}: {reason}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_a_minimal_module() {
        let source = "\
; the answer
@version 1
@module main
@export main
@integer 42
@function main
@arity 0
@locals 0
LoadInteger 0
Return
Halt
@endfunction
";
        let module = assemble(source).expect("assembles");
        assert_eq!(module.version(), 1);
        assert_eq!(module.name(), "main");
        assert_eq!(module.exports(), ["main".to_owned()]);
        assert_eq!(module.constants(), [Constant::Integer(42)]);
        let main = &module.functions()[0];
        assert_eq!(main.name(), "main");
        assert_eq!(
            main.bytecode(),
            [Opcode::LoadInteger(0), Opcode::Return, Opcode::Halt]
        );
    }

    #[test]
    fn string_directive_takes_exact_length() {
        let module = assemble("@string 5 hi ho\n").expect("assembles");
        assert_eq!(module.constants(), [Constant::String(b"hi ho".to_vec())]);

        let module = assemble("@string 2 hi ho\n").expect("assembles");
        assert_eq!(module.constants(), [Constant::String(b"hi".to_vec())]);

        assert!(matches!(
            assemble("@string 9 short\n"),
            Err(ModuleError::BadBytecodeEncoding { .. })
        ));
    }

    #[test]
    fn unknown_mnemonics_are_rejected() {
        let err = assemble("@function f\nFrobnicate\n@endfunction\n").expect_err("unknown");
        assert!(matches!(err, ModuleError::UnknownOpcode { .. }));
    }

    #[test]
    fn bytecode_outside_a_function_is_rejected() {
        assert!(matches!(
            assemble("Halt\n"),
            Err(ModuleError::BadBytecodeEncoding { .. })
        ));
    }
}

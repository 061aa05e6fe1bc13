//! Command line front end: assemble, decompile and execute module files.

use wisp_vm::asm;
use wisp_vm::codec;
use wisp_vm::module::{Constant, Module};
use wisp_vm::objects;
use wisp_vm::prelude::*;

use itertools::Itertools;

use std::env;
use std::error::Error;
use std::path::Path;
use std::process;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if let Err(error) = dispatch(&args) {
        eprintln!("error: {error}");
        process::exit(1);
    }
}

fn dispatch(args: &[String]) -> Result<(), Box<dyn Error>> {
    let usage = "usage: wisp <decompile <file> | execute <file> | assemble <in> <out>>";
    match args {
        [_, command, file] if command == "decompile" => decompile(Path::new(file)),
        [_, command, file] if command == "execute" => execute(Path::new(file)),
        [_, command, input, output] if command == "assemble" => assemble(Path::new(input), Path::new(output)),
        _ => Err(usage.into()),
    }
}

fn assemble(input: &Path, output: &Path) -> Result<(), Box<dyn Error>> {
    let source = std::fs::read_to_string(input)?;
    let module = asm::assemble(&source)?;
    codec::write_file(&module, output)?;
    Ok(())
}

fn execute(file: &Path) -> Result<(), Box<dyn Error>> {
    let module = codec::read_file(file)?;
    let mut vm = Interpreter::with_default_heap()?;
    vm.modules().register(module)?;
    vm.natives()
        .register(NativeFunction::new("println".to_owned(), 1, native_println))?;
    vm.run()?;
    Ok(())
}

fn native_println(context: &mut NativeContext<'_>, args: &[Primitive]) -> Result<Primitive, RuntimeError> {
    let value = args.first().copied().unwrap_or_default();
    println!("{}", objects::render(context.heap(), value));
    Ok(Primitive::nil())
}

fn decompile(file: &Path) -> Result<(), Box<dyn Error>> {
    let module = codec::read_file(file)?;
    print!("{}", tables(&module));
    Ok(())
}

fn tables(module: &Module) -> String {
    let mut out = String::new();
    out.push_str(&format!("Module: {}\n", module.name()));
    out.push_str(&format!("Version: {}\n", module.version()));
    out.push_str("Imports:\n");
    for (i, import) in module.imports().iter().enumerate() {
        out.push_str(&format!("- Import[{i}] = {import}\n"));
    }
    out.push_str("Exports:\n");
    for (i, export) in module.exports().iter().enumerate() {
        out.push_str(&format!("- Export[{i}] = {export}\n"));
    }
    out.push_str("Functions:\n");
    for (i, function) in module.functions().iter().enumerate() {
        out.push_str(&format!("- Fn[{i}]\n"));
        out.push_str(&format!("  - Name: {}\n", function.name()));
        out.push_str(&format!("  - Arity: {}\n", function.arity()));
        out.push_str(&format!("  - Locals: {}\n", function.locals()));
        out.push_str("  - Bytecode:\n");
        for (j, opcode) in function.bytecode().iter().enumerate() {
            out.push_str(&format!("    - [{j}] {opcode}\n"));
        }
    }
    out.push_str("Constants:\n");
    for (i, constant) in module.constants().iter().enumerate() {
        let rendered = match constant {
            Constant::Integer(value) => format!("Integer{{{value}}}"),
            Constant::String(value) => format!("String{{{}}}", String::from_utf8_lossy(value)),
            Constant::Invocation(invocation) => format!(
                "Invocation{{{}}}",
                [
                    invocation.module_name(),
                    invocation.function_name(),
                    invocation.argument_count()
                ]
                .iter()
                .join(" ")
            ),
        };
        out.push_str(&format!("- Constant[{i}] = {rendered}\n"));
    }
    out
}

use wisp_vm::asm;
use wisp_vm::codec;
use wisp_vm::prelude::*;

use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;

fn all_opcodes() -> Vec<Opcode> {
    vec![
        Opcode::Halt,
        Opcode::LoadNil,
        Opcode::LoadTrue,
        Opcode::LoadFalse,
        Opcode::LoadInteger(0),
        Opcode::LoadString(1),
        Opcode::LoadUnsigned(u64::MAX),
        Opcode::LoadLocal(0),
        Opcode::StoreLocal(1),
        Opcode::Pop,
        Opcode::Jump(7),
        Opcode::JumpIfFalse(9),
        Opcode::Invoke(2),
        Opcode::Return,
    ]
}

fn sample_module() -> Module {
    Module::new(
        1,
        "sample".to_owned(),
        vec!["prelude".to_owned(), "math".to_owned()],
        vec!["main".to_owned()],
        vec![
            Function::new("main".to_owned(), 0, 2, all_opcodes()),
            Function::new("helper".to_owned(), 3, 4, vec![Opcode::Return]),
        ],
        vec![
            Constant::Integer(-42),
            Constant::String(b"hello".to_vec()),
            Constant::Invocation(Invocation::new(1, 1, 3)),
        ],
    )
}

fn encode_to_vec(module: &Module) -> Vec<u8> {
    let mut bytes = Vec::new();
    codec::encode(module, &mut bytes).expect("encodes");
    bytes
}

#[test]
fn sample_module_round_trips() {
    let module = sample_module();
    let bytes = encode_to_vec(&module);
    let decoded = codec::decode(&mut bytes.as_slice()).expect("decodes");
    assert_eq!(decoded, module);
}

#[test]
fn empty_module_round_trips() {
    let module = Module::new(1, "empty".to_owned(), vec![], vec![], vec![], vec![]);
    let bytes = encode_to_vec(&module);
    let decoded = codec::decode(&mut bytes.as_slice()).expect("decodes");
    assert_eq!(decoded, module);
}

#[test]
fn string_constants_carry_arbitrary_bytes() {
    // string constants have no encoding constraint
    let module = Module::new(
        1,
        "raw".to_owned(),
        vec![],
        vec![],
        vec![],
        vec![Constant::String(vec![0x00, 0xff, 0xfe, 0x80, b'a'])],
    );
    let bytes = encode_to_vec(&module);
    let decoded = codec::decode(&mut bytes.as_slice()).expect("decodes");
    assert_eq!(decoded, module);
}

#[derive(Clone, Debug)]
struct ArbModule(Module);

fn short_name(g: &mut Gen) -> String {
    let length = usize::arbitrary(g) % 8 + 1;
    (0..length)
        .map(|_| char::from(*g.choose(b"abcdefghijklmnopqrstuvwxyz").expect("non-empty")))
        .collect()
}

fn arbitrary_opcode(g: &mut Gen) -> Opcode {
    let argument = u64::arbitrary(g);
    match u8::arbitrary(g) % 14 {
        0 => Opcode::Halt,
        1 => Opcode::LoadNil,
        2 => Opcode::LoadTrue,
        3 => Opcode::LoadFalse,
        4 => Opcode::LoadInteger(argument),
        5 => Opcode::LoadString(argument),
        6 => Opcode::LoadUnsigned(argument),
        7 => Opcode::LoadLocal(argument),
        8 => Opcode::StoreLocal(argument),
        9 => Opcode::Pop,
        10 => Opcode::Jump(argument),
        11 => Opcode::JumpIfFalse(argument),
        12 => Opcode::Invoke(argument),
        _ => Opcode::Return,
    }
}

fn arbitrary_constant(g: &mut Gen) -> Constant {
    match u8::arbitrary(g) % 3 {
        0 => Constant::Integer(i64::arbitrary(g)),
        1 => Constant::String(Vec::<u8>::arbitrary(g)),
        _ => Constant::Invocation(Invocation::new(
            u64::arbitrary(g),
            u64::arbitrary(g),
            u64::arbitrary(g),
        )),
    }
}

impl Arbitrary for ArbModule {
    fn arbitrary(g: &mut Gen) -> Self {
        let functions = (0..usize::arbitrary(g) % 4)
            .map(|_| {
                let bytecode = (0..usize::arbitrary(g) % 8).map(|_| arbitrary_opcode(g)).collect();
                Function::new(short_name(g), u64::arbitrary(g), u64::arbitrary(g), bytecode)
            })
            .collect();
        let constants = (0..usize::arbitrary(g) % 6).map(|_| arbitrary_constant(g)).collect();
        let imports = (0..usize::arbitrary(g) % 3).map(|_| short_name(g)).collect();
        let exports = (0..usize::arbitrary(g) % 3).map(|_| short_name(g)).collect();
        ArbModule(Module::new(
            codec::COMPATIBLE_VERSION,
            short_name(g),
            imports,
            exports,
            functions,
            constants,
        ))
    }
}

#[quickcheck]
fn any_well_formed_module_round_trips(module: ArbModule) -> bool {
    let bytes = encode_to_vec(&module.0);
    codec::decode(&mut bytes.as_slice()).map(|decoded| decoded == module.0).unwrap_or(false)
}

#[test]
fn incompatible_versions_are_rejected() {
    let module = Module::new(2, "future".to_owned(), vec![], vec![], vec![], vec![]);
    let bytes = encode_to_vec(&module);
    let error = codec::decode(&mut bytes.as_slice()).expect_err("rejected");
    assert!(matches!(
        error,
        ModuleError::IncompatibleVersion { found: 2, expected: 1 }
    ));
}

#[test]
fn unknown_opcode_tags_are_rejected() {
    let module = Module::new(
        1,
        "m".to_owned(),
        vec![],
        vec![],
        vec![Function::new("f".to_owned(), 0, 0, vec![Opcode::Halt])],
        vec![],
    );
    let mut bytes = encode_to_vec(&module);
    // the lone instruction tag is the final byte of the function section;
    // constants (count 0) occupy the trailing eight bytes
    let tag_index = bytes.len() - 9;
    assert_eq!(bytes[tag_index], OpcodeRepr::Halt as u8);
    bytes[tag_index] = 0xfe;
    let error = codec::decode(&mut bytes.as_slice()).expect_err("rejected");
    assert!(matches!(error, ModuleError::UnknownOpcode { .. }));
}

#[test]
fn unknown_constant_tags_are_rejected() {
    let module = Module::new(
        1,
        "m".to_owned(),
        vec![],
        vec![],
        vec![],
        vec![Constant::Integer(1)],
    );
    let mut bytes = encode_to_vec(&module);
    // the constant tag byte sits just before the trailing i64 payload
    let tag_index = bytes.len() - 9;
    assert_eq!(bytes[tag_index], 0x00);
    bytes[tag_index] = 0x7f;
    let error = codec::decode(&mut bytes.as_slice()).expect_err("rejected");
    assert!(matches!(error, ModuleError::BadBytecodeEncoding { .. }));
}

#[test]
fn truncated_files_surface_io_errors() {
    let bytes = encode_to_vec(&sample_module());
    for cut in [0, 4, bytes.len() / 2, bytes.len() - 1] {
        let error = codec::decode(&mut &bytes[..cut]).expect_err("rejected");
        assert!(matches!(error, ModuleError::Io(_)), "cut at {cut}: {error}");
    }
}

#[test]
fn file_round_trip() {
    let module = sample_module();
    let path = std::env::temp_dir().join(format!("wisp-vm-encoding-{}.wc", std::process::id()));
    codec::write_file(&module, &path).expect("writes");
    let decoded = codec::read_file(&path).expect("reads");
    std::fs::remove_file(&path).expect("cleans up");
    assert_eq!(decoded, module);
}

#[test]
fn assembled_source_round_trips_through_the_codec() {
    let source = "\
@version 1
@module main
@import prelude
@export main
@integer 3
@string 2 hi
@invocation 0 1 2
@function main
@arity 0
@locals 1
LoadInteger 0
StoreLocal 0
LoadString 1
Pop
LoadLocal 0
Return
Halt
@endfunction
";
    let module = asm::assemble(source).expect("assembles");
    assert_eq!(module.name(), "main");
    assert_eq!(module.imports(), ["prelude".to_owned()]);
    assert_eq!(
        module.constants(),
        [
            Constant::Integer(3),
            Constant::String(b"hi".to_vec()),
            Constant::Invocation(Invocation::new(0, 1, 2)),
        ]
    );

    let bytes = encode_to_vec(&module);
    let decoded = codec::decode(&mut bytes.as_slice()).expect("decodes");
    assert_eq!(decoded, module);
}

#[test]
fn assembled_modules_execute() {
    let source = "\
@version 1
@module main
@integer 41
@string 3 inc
@invocation 1 1 1
@function main
@arity 0
@locals 0
LoadInteger 0
Invoke 2
Return
@endfunction
";
    fn native_inc(_: &mut NativeContext<'_>, args: &[Primitive]) -> Result<Primitive, RuntimeError> {
        Primitive::integer(args[0].as_integer()? + 1)
    }

    let module = asm::assemble(source).expect("assembles");
    let mut vm = Interpreter::new(64 * 1024).expect("interpreter boots");
    vm.modules().register(module).expect("module registers");
    vm.natives()
        .register(NativeFunction::new("inc".to_owned(), 1, native_inc))
        .expect("native registers");
    let state = vm.run().expect("runs");
    assert_eq!(
        state.value().as_integer().expect("integer"),
        42
    );
}

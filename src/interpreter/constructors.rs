//! Exposed constructors API for the [`Interpreter`]

use super::Interpreter;
use crate::call::CallStack;
use crate::consts::DEFAULT_HEAP_SIZE;
use crate::error::RuntimeError;
use crate::heap::Heap;
use crate::objects::{env, map, symbol_table};
use crate::registry::{ModuleRegistry, NativeFunctionRegistry};
use crate::value::Primitive;

use std::cell::RefCell;
use std::rc::Rc;

impl Interpreter {
    /// Create an interpreter whose heap has two semi-spaces of `heap_size`
    /// bytes.
    ///
    /// The call stack is installed as a collector root contributor, and the
    /// symbol table and global environment are allocated and rooted. Fails
    /// only when `heap_size` cannot hold that bootstrap state.
    pub fn new(heap_size: u64) -> Result<Self, RuntimeError> {
        let mut heap = Heap::new(heap_size);
        let stack = Rc::new(RefCell::new(CallStack::new()));
        heap.add_root_contributor(stack.clone());

        let forward = map::create(&mut heap)?;
        let forward = heap.handle(Primitive::reference(forward)?);
        let backward = map::create(&mut heap)?;
        let backward = heap.handle(Primitive::reference(backward)?);
        let table = symbol_table::create(&mut heap, &forward, &backward)?;
        let symbols = heap.handle(Primitive::reference(table)?);

        let bindings = map::create(&mut heap)?;
        let bindings = heap.handle(Primitive::reference(bindings)?);
        let nil = heap.handle(Primitive::nil());
        let global_env = env::create(&mut heap, &nil, &bindings)?;
        let globals = heap.handle(Primitive::reference(global_env)?);

        Ok(Self {
            heap,
            stack,
            modules: ModuleRegistry::new(),
            natives: NativeFunctionRegistry::new(),
            symbols,
            globals,
        })
    }

    /// Create an interpreter with the default heap size.
    pub fn with_default_heap() -> Result<Self, RuntimeError> {
        Self::new(DEFAULT_HEAP_SIZE)
    }
}

//! Module and native-function registries.
//!
//! Both stores are append-only and guarded by a coarse mutex so host threads
//! can populate them concurrently during setup. No registration may happen
//! while a VM instance is inside its dispatch loop; the interpreter's
//! lookups take the (by then uncontended) lock.

use crate::context::NativeContext;
use crate::error::{ModuleError, RuntimeError};
use crate::module::Module;
use crate::value::Primitive;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

/// Signature of a host-provided function. Arguments arrive in source order.
///
/// A handler that allocates must first root any argument references through
/// [`crate::heap::Heap::handle`]; the collector does not see the argument
/// slice.
pub type NativeHandler = fn(&mut NativeContext<'_>, &[Primitive]) -> Result<Primitive, RuntimeError>;

/// A registered host function.
#[derive(Clone)]
pub struct NativeFunction {
    name: String,
    arity: u64,
    handler: NativeHandler,
}

impl NativeFunction {
    /// Describe a host function.
    pub const fn new(name: String, arity: u64, handler: NativeHandler) -> Self {
        Self { name, arity, handler }
    }

    /// Registry key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of arguments the handler expects.
    pub const fn arity(&self) -> u64 {
        self.arity
    }

    /// The handler itself.
    pub const fn handler(&self) -> NativeHandler {
        self.handler
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

#[derive(Default)]
struct Modules {
    modules: BTreeMap<String, Arc<Module>>,
    functions: BTreeMap<(String, String), (Arc<Module>, usize)>,
}

/// Keyed append-only store of loaded modules with a secondary
/// `(module, function)` index populated at registration time.
#[derive(Default)]
pub struct ModuleRegistry {
    inner: Mutex<Modules>,
}

impl ModuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module and index its functions. Fails with
    /// `DuplicateModule` when the name is taken, and `DuplicateFunction`
    /// when the module defines one name twice.
    pub fn register(&self, module: Module) -> Result<Arc<Module>, ModuleError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.modules.contains_key(module.name()) {
            return Err(ModuleError::DuplicateModule {
                name: module.name().to_owned(),
            });
        }

        // validate before touching the index so a failure leaves no partial
        // registration behind
        for (index, function) in module.functions().iter().enumerate() {
            let twin = module.functions()[..index].iter().any(|other| other.name() == function.name());
            if twin {
                return Err(ModuleError::DuplicateFunction {
                    module: module.name().to_owned(),
                    function: function.name().to_owned(),
                });
            }
        }

        let module = Arc::new(module);
        for (index, function) in module.functions().iter().enumerate() {
            let key = (module.name().to_owned(), function.name().to_owned());
            inner.functions.insert(key, (Arc::clone(&module), index));
        }
        inner.modules.insert(module.name().to_owned(), Arc::clone(&module));

        debug!(module = %module.name(), functions = module.functions().len(), "module registered");
        Ok(module)
    }

    /// The module registered under `name`.
    pub fn lookup_module(&self, name: &str) -> Option<Arc<Module>> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.modules.get(name).cloned()
    }

    /// The function registered under `module`/`function`, as its module and
    /// function index.
    pub fn lookup_function(&self, module: &str, function: &str) -> Option<(Arc<Module>, usize)> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .functions
            .get(&(module.to_owned(), function.to_owned()))
            .cloned()
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("ModuleRegistry")
            .field("modules", &inner.modules.len())
            .field("functions", &inner.functions.len())
            .finish()
    }
}

/// Keyed append-only store of host functions.
#[derive(Debug, Default)]
pub struct NativeFunctionRegistry {
    inner: Mutex<BTreeMap<String, NativeFunction>>,
}

impl NativeFunctionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host function. Fails with `DuplicateNative` when the name
    /// is taken.
    pub fn register(&self, function: NativeFunction) -> Result<(), ModuleError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.contains_key(function.name()) {
            return Err(ModuleError::DuplicateNative {
                name: function.name().to_owned(),
            });
        }
        debug!(native = %function.name(), arity = function.arity(), "native function registered");
        inner.insert(function.name().to_owned(), function);
        Ok(())
    }

    /// The host function registered under `name`.
    pub fn lookup(&self, name: &str) -> Result<NativeFunction, RuntimeError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.get(name).cloned().ok_or_else(|| RuntimeError::UndefinedNative {
            name: name.to_owned(),
        })
    }
}

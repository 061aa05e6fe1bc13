//! Call and return flow.

use super::Interpreter;
use crate::context::NativeContext;
use crate::error::RuntimeError;
use crate::module::Module;
use crate::state::ExecuteState;

use std::sync::Arc;

use tracing::trace;

impl Interpreter {
    /// `Invoke`: resolve the invocation constant at `index` and call the
    /// named function.
    ///
    /// Resolution prefers registered modules; a name outside the module
    /// registry falls back to the native registry under its function name.
    pub(super) fn invoke(&mut self, index: u64) -> Result<ExecuteState, RuntimeError> {
        let (module_name, function_name, argc) = {
            let stack = self.stack.borrow();
            let frame = stack.current()?;
            let invocation = *frame.invocation_constant(index)?;
            // name constants are raw bytes; a lossy reading is enough here
            // since non-text names can never match a registered name
            (
                String::from_utf8_lossy(frame.string_constant(invocation.module_name())?).into_owned(),
                String::from_utf8_lossy(frame.string_constant(invocation.function_name())?).into_owned(),
                invocation.argument_count(),
            )
        };

        if let Some((module, function)) = self.modules.lookup_function(&module_name, &function_name) {
            self.invoke_function(module, function, argc)
        } else if self.modules.lookup_module(&module_name).is_some() {
            Err(RuntimeError::UndefinedFunction {
                module: module_name,
                function: function_name,
            })
        } else {
            self.invoke_native(&function_name, argc)
        }
    }

    /// Push a frame for a module function, transferring `argc` operands of
    /// the caller into the callee's first locals in source order. The
    /// caller's program counter is advanced first, so its frame resumes past
    /// the invoke once the callee returns.
    fn invoke_function(&mut self, module: Arc<Module>, function: usize, argc: u64) -> Result<ExecuteState, RuntimeError> {
        let callee = &module.functions()[function];
        if callee.arity() != argc {
            return Err(RuntimeError::ArityMismatch {
                function: format!("{}/{}", module.name(), callee.name()),
                expected: callee.arity(),
                provided: argc,
            });
        }
        trace!(callee = %callee.name(), argc, "invoke function");

        let mut stack = self.stack.borrow_mut();
        let mut arguments = Vec::with_capacity(argc as usize);
        {
            let frame = stack.current_mut()?;
            for _ in 0..argc {
                arguments.push(frame.pop()?);
            }
            frame.advance();
        }

        stack.push(Arc::clone(&module), function)?;
        let callee_frame = stack.current_mut()?;
        for (index, value) in arguments.into_iter().rev().enumerate() {
            callee_frame.set_local(index as u64, value)?;
        }
        Ok(ExecuteState::Proceed)
    }

    /// Call a native handler with `argc` popped operands and push its
    /// result.
    fn invoke_native(&mut self, name: &str, argc: u64) -> Result<ExecuteState, RuntimeError> {
        let native = self.natives.lookup(name)?;
        if native.arity() != argc {
            return Err(RuntimeError::ArityMismatch {
                function: name.to_owned(),
                expected: native.arity(),
                provided: argc,
            });
        }
        trace!(native = name, argc, "invoke native");

        let mut arguments = {
            let mut stack = self.stack.borrow_mut();
            let frame = stack.current_mut()?;
            let mut arguments = Vec::with_capacity(argc as usize);
            for _ in 0..argc {
                arguments.push(frame.pop()?);
            }
            arguments
        };
        arguments.reverse();

        // no call stack borrow may be held here: the handler owns the heap
        // and a collection would trace the stack
        let result = {
            let mut context = NativeContext::new(&mut self.heap, &self.symbols, &self.globals);
            (native.handler())(&mut context, &arguments)?
        };

        let mut stack = self.stack.borrow_mut();
        let frame = stack.current_mut()?;
        frame.push(result);
        frame.advance();
        Ok(ExecuteState::Proceed)
    }

    /// `Return`: pop the result and the frame. With no caller left, the
    /// result becomes the program result; otherwise it lands on the caller's
    /// operand stack, whose program counter already points past the invoke.
    pub(super) fn ret(&mut self) -> Result<ExecuteState, RuntimeError> {
        let mut stack = self.stack.borrow_mut();
        let value = stack.current_mut()?.pop()?;
        stack.pop()?;
        if stack.is_empty() {
            return Ok(ExecuteState::Returned(value));
        }
        stack.current_mut()?.push(value);
        Ok(ExecuteState::Proceed)
    }
}

//! The dispatch loop and the non-flow opcode handlers.

use super::Interpreter;
use crate::consts::{ENTRY_FUNCTION, ENTRY_MODULE};
use crate::error::{InterpreterError, RuntimeError};
use crate::module::Opcode;
use crate::objects::string;
use crate::state::{ExecuteState, ProgramState};
use crate::value::Primitive;

use std::sync::Arc;

use tracing::{debug, trace};

impl Interpreter {
    /// Resolve the `main/main` entrypoint, push its frame and drive the
    /// dispatch loop until a `Halt`, the final `Return`, or a fault.
    ///
    /// The call stack is torn down on every exit path.
    pub fn run(&mut self) -> Result<ProgramState, InterpreterError> {
        let state = self.execute();
        self.stack.borrow_mut().clear();
        state
    }

    fn execute(&mut self) -> Result<ProgramState, InterpreterError> {
        let (module, function) = self
            .modules
            .lookup_function(ENTRY_MODULE, ENTRY_FUNCTION)
            .ok_or_else(|| RuntimeError::UndefinedFunction {
                module: ENTRY_MODULE.to_owned(),
                function: ENTRY_FUNCTION.to_owned(),
            })?;
        let arity = module.functions()[function].arity();
        if arity != 0 {
            return Err(RuntimeError::ArityMismatch {
                function: format!("{ENTRY_MODULE}/{ENTRY_FUNCTION}"),
                expected: arity,
                provided: 0,
            }
            .into());
        }

        self.stack.borrow_mut().push(module, function)?;
        debug!("entering dispatch loop");

        loop {
            match self.step()? {
                ExecuteState::Proceed => (),
                ExecuteState::Halted => break Ok(ProgramState::Halted),
                ExecuteState::Returned(value) => break Ok(ProgramState::Returned(value)),
            }
        }
    }

    /// Execute the instruction under the current frame's program counter.
    /// Faults are wrapped with the dispatch context.
    pub fn step(&mut self) -> Result<ExecuteState, InterpreterError> {
        let (opcode, pc, module, function) = {
            let stack = self.stack.borrow();
            let frame = stack.current()?;
            (
                frame.opcode()?,
                frame.pc(),
                Arc::clone(frame.module()),
                frame.function_index(),
            )
        };

        trace!(pc, %opcode, "dispatch");

        self.instruction(opcode).map_err(|source| {
            let function = module
                .functions()
                .get(function)
                .map(|f| f.name())
                .unwrap_or_default();
            InterpreterError::trap(module.name(), function, pc, opcode.repr(), source)
        })
    }

    fn instruction(&mut self, opcode: Opcode) -> Result<ExecuteState, RuntimeError> {
        match opcode {
            Opcode::Halt => Ok(ExecuteState::Halted),
            Opcode::LoadNil => self.push_and_advance(Primitive::nil()),
            Opcode::LoadTrue => self.push_and_advance(Primitive::boolean(true)),
            Opcode::LoadFalse => self.push_and_advance(Primitive::boolean(false)),
            Opcode::LoadInteger(index) => self.load_integer(index),
            Opcode::LoadString(index) => self.load_string(index),
            Opcode::LoadUnsigned(immediate) => self.load_unsigned(immediate),
            Opcode::LoadLocal(index) => self.load_local(index),
            Opcode::StoreLocal(index) => self.store_local(index),
            Opcode::Pop => self.pop(),
            Opcode::Jump(target) => self.jump(target),
            Opcode::JumpIfFalse(target) => self.jump_if_false(target),
            Opcode::Invoke(index) => self.invoke(index),
            Opcode::Return => self.ret(),
        }
    }

    fn push_and_advance(&mut self, value: Primitive) -> Result<ExecuteState, RuntimeError> {
        let mut stack = self.stack.borrow_mut();
        let frame = stack.current_mut()?;
        frame.push(value);
        frame.advance();
        Ok(ExecuteState::Proceed)
    }

    fn load_integer(&mut self, index: u64) -> Result<ExecuteState, RuntimeError> {
        let value = self.stack.borrow().current()?.integer_constant(index)?;
        self.push_and_advance(Primitive::integer(value)?)
    }

    fn load_string(&mut self, index: u64) -> Result<ExecuteState, RuntimeError> {
        // the constant is copied out so no borrow is held across the
        // allocation below, which may collect
        let bytes = self
            .stack
            .borrow()
            .current()?
            .string_constant(index)?
            .to_vec();
        let address = string::create(&mut self.heap, &bytes)?;
        self.push_and_advance(Primitive::reference(address)?)
    }

    fn load_unsigned(&mut self, immediate: u64) -> Result<ExecuteState, RuntimeError> {
        let value = i64::try_from(immediate).map_err(|_| RuntimeError::ValueOverflow {
            value: immediate as i128,
        })?;
        self.push_and_advance(Primitive::integer(value)?)
    }

    fn load_local(&mut self, index: u64) -> Result<ExecuteState, RuntimeError> {
        let value = self.stack.borrow().current()?.local(index)?;
        self.push_and_advance(value)
    }

    fn store_local(&mut self, index: u64) -> Result<ExecuteState, RuntimeError> {
        let mut stack = self.stack.borrow_mut();
        let frame = stack.current_mut()?;
        let value = frame.pop()?;
        frame.set_local(index, value)?;
        frame.advance();
        Ok(ExecuteState::Proceed)
    }

    fn pop(&mut self) -> Result<ExecuteState, RuntimeError> {
        let mut stack = self.stack.borrow_mut();
        let frame = stack.current_mut()?;
        frame.pop()?;
        frame.advance();
        Ok(ExecuteState::Proceed)
    }

    fn jump(&mut self, target: u64) -> Result<ExecuteState, RuntimeError> {
        self.stack.borrow_mut().current_mut()?.set_pc(target as usize);
        Ok(ExecuteState::Proceed)
    }

    fn jump_if_false(&mut self, target: u64) -> Result<ExecuteState, RuntimeError> {
        let mut stack = self.stack.borrow_mut();
        let frame = stack.current_mut()?;
        let value = frame.pop()?;
        // only boolean false branches; nil and every other value fall
        // through
        if value == Primitive::boolean(false) {
            frame.set_pc(target as usize);
        } else {
            frame.advance();
        }
        Ok(ExecuteState::Proceed)
    }
}

//! Language-level activation records.
//!
//! The interpreter runs on the bounded call stack in [`crate::call`]; this
//! heap shape exists for frames that must outlive it — continuation-style
//! host extensions and closures re-entering suspended scopes.

use crate::error::RuntimeError;
use crate::heap::{Handle, Heap};
use crate::objects::ObjectType;
use crate::value::{Address, Primitive};

/// Slot of the frame's environment.
pub const ENV: u64 = 0;
/// Slot of the enclosing frame (reference or nil).
pub const OUTER: u64 = 1;
/// Slot of the operand stack.
pub const STACK: u64 = 2;
/// Slot of the function binding.
pub const FUNCTION: u64 = 3;
/// Slot of the program counter.
pub const PC: u64 = 4;

const SLOTS: u64 = 5;

/// Allocate a frame with program counter zero.
pub fn create(
    heap: &mut Heap,
    env: &Handle,
    outer: &Handle,
    stack: &Handle,
    function: &Handle,
) -> Result<Address, RuntimeError> {
    let address = heap.allocate_object(ObjectType::Frame, SLOTS)?;
    heap.set_slot(address, ENV, env.get())?;
    heap.set_slot(address, OUTER, outer.get())?;
    heap.set_slot(address, STACK, stack.get())?;
    heap.set_slot(address, FUNCTION, function.get())?;
    heap.set_slot(address, PC, Primitive::integer(0)?)?;
    Ok(address)
}

/// Environment of the frame at `address`.
pub fn env(heap: &Heap, address: Address) -> Result<Primitive, RuntimeError> {
    heap.typed_slot(address, ObjectType::Frame, ENV)
}

/// Enclosing frame of the frame at `address`.
pub fn outer(heap: &Heap, address: Address) -> Result<Primitive, RuntimeError> {
    heap.typed_slot(address, ObjectType::Frame, OUTER)
}

/// Operand stack of the frame at `address`.
pub fn stack(heap: &Heap, address: Address) -> Result<Primitive, RuntimeError> {
    heap.typed_slot(address, ObjectType::Frame, STACK)
}

/// Function binding of the frame at `address`.
pub fn function(heap: &Heap, address: Address) -> Result<Primitive, RuntimeError> {
    heap.typed_slot(address, ObjectType::Frame, FUNCTION)
}

/// Program counter of the frame at `address`.
pub fn pc(heap: &Heap, address: Address) -> Result<i64, RuntimeError> {
    heap.typed_slot(address, ObjectType::Frame, PC)?.as_integer()
}

/// Replace the program counter of the frame at `address`.
pub fn set_pc(heap: &mut Heap, address: Address, pc: i64) -> Result<(), RuntimeError> {
    heap.set_typed_slot(address, ObjectType::Frame, PC, Primitive::integer(pc)?)
}

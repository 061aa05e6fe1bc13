//! Functions bound to their captured environment.

use crate::error::RuntimeError;
use crate::heap::{Handle, Heap};
use crate::objects::ObjectType;
use crate::value::{Address, Primitive};

/// Slot of the function descriptor.
pub const FUNCTION: u64 = 0;
/// Slot of the captured environment.
pub const ENV: u64 = 1;

const SLOTS: u64 = 2;

/// Allocate a closure over `function` and `env`.
pub fn create(heap: &mut Heap, function: &Handle, env: &Handle) -> Result<Address, RuntimeError> {
    let address = heap.allocate_object(ObjectType::Closure, SLOTS)?;
    heap.set_slot(address, FUNCTION, function.get())?;
    heap.set_slot(address, ENV, env.get())?;
    Ok(address)
}

/// Function descriptor of the closure at `address`.
pub fn function(heap: &Heap, address: Address) -> Result<Primitive, RuntimeError> {
    heap.typed_slot(address, ObjectType::Closure, FUNCTION)
}

/// Captured environment of the closure at `address`.
pub fn env(heap: &Heap, address: Address) -> Result<Primitive, RuntimeError> {
    heap.typed_slot(address, ObjectType::Closure, ENV)
}

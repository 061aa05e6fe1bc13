//! Cons cells.

use crate::error::RuntimeError;
use crate::heap::{Handle, Heap};
use crate::objects::ObjectType;
use crate::value::{Address, Primitive};

/// Slot of the first element.
pub const FIRST: u64 = 0;
/// Slot of the second element.
pub const SECOND: u64 = 1;

const SLOTS: u64 = 2;

/// Allocate a pair. Arguments are read from their handles after the
/// allocation, so a collection triggered here cannot strand them.
pub fn create(heap: &mut Heap, first: &Handle, second: &Handle) -> Result<Address, RuntimeError> {
    let address = heap.allocate_object(ObjectType::Pair, SLOTS)?;
    heap.set_slot(address, FIRST, first.get())?;
    heap.set_slot(address, SECOND, second.get())?;
    Ok(address)
}

/// First element of the pair at `address`.
pub fn first(heap: &Heap, address: Address) -> Result<Primitive, RuntimeError> {
    heap.typed_slot(address, ObjectType::Pair, FIRST)
}

/// Second element of the pair at `address`.
pub fn second(heap: &Heap, address: Address) -> Result<Primitive, RuntimeError> {
    heap.typed_slot(address, ObjectType::Pair, SECOND)
}

/// Replace the first element of the pair at `address`.
pub fn set_first(heap: &mut Heap, address: Address, value: Primitive) -> Result<(), RuntimeError> {
    heap.set_typed_slot(address, ObjectType::Pair, FIRST, value)
}

/// Replace the second element of the pair at `address`.
pub fn set_second(heap: &mut Heap, address: Address, value: Primitive) -> Result<(), RuntimeError> {
    heap.set_typed_slot(address, ObjectType::Pair, SECOND, value)
}

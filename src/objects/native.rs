//! Native function heap objects: an opaque host pointer plus an arity.
//!
//! Neither slot is a heap reference; the collector copies the object but
//! never traces into it.

use crate::error::RuntimeError;
use crate::heap::Heap;
use crate::objects::ObjectType;
use crate::value::{Address, Primitive};

/// Slot of the opaque host pointer.
pub const POINTER: u64 = 0;
/// Slot of the arity.
pub const ARITY: u64 = 1;

const SLOTS: u64 = 2;

/// Allocate a native function object. `pointer` must be a native reference.
pub fn create(heap: &mut Heap, pointer: Primitive, arity: u64) -> Result<Address, RuntimeError> {
    pointer.as_native_reference()?;
    let address = heap.allocate_object(ObjectType::NativeFunction, SLOTS)?;
    heap.set_slot(address, POINTER, pointer)?;
    heap.set_slot(address, ARITY, Primitive::integer(arity as i64)?)?;
    Ok(address)
}

/// Opaque host pointer of the native function at `address`.
pub fn pointer(heap: &Heap, address: Address) -> Result<u64, RuntimeError> {
    heap.typed_slot(address, ObjectType::NativeFunction, POINTER)?.as_native_reference()
}

/// Declared arity of the native function at `address`.
pub fn arity(heap: &Heap, address: Address) -> Result<i64, RuntimeError> {
    heap.typed_slot(address, ObjectType::NativeFunction, ARITY)?.as_integer()
}

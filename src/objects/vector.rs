//! Fixed-length slot arrays sized at allocation time.

use crate::error::RuntimeError;
use crate::heap::Heap;
use crate::objects::ObjectType;
use crate::value::{Address, Primitive};

const LENGTH: u64 = 0;

/// Allocate a vector of `length` nil items.
pub fn create(heap: &mut Heap, length: u64) -> Result<Address, RuntimeError> {
    let address = heap.allocate_object(ObjectType::Vector, length + 1)?;
    heap.set_slot(address, LENGTH, Primitive::integer(length as i64)?)?;
    Ok(address)
}

/// Number of items in the vector at `address`.
pub fn length(heap: &Heap, address: Address) -> Result<i64, RuntimeError> {
    heap.typed_slot(address, ObjectType::Vector, LENGTH)?.as_integer()
}

/// Item at `index`.
pub fn get(heap: &Heap, address: Address, index: u64) -> Result<Primitive, RuntimeError> {
    check_bounds(heap, address, index)?;
    heap.slot(address, index + 1)
}

/// Replace the item at `index`.
pub fn set(heap: &mut Heap, address: Address, index: u64, value: Primitive) -> Result<(), RuntimeError> {
    check_bounds(heap, address, index)?;
    heap.set_slot(address, index + 1, value)
}

fn check_bounds(heap: &Heap, address: Address, index: u64) -> Result<(), RuntimeError> {
    let length = length(heap, address)? as u64;
    if index >= length {
        return Err(RuntimeError::IndexOutOfBounds { index, length });
    }
    Ok(())
}

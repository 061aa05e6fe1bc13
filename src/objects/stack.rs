//! Head-list stacks with a size counter.

use crate::error::RuntimeError;
use crate::heap::{Handle, Heap};
use crate::objects::{pair, ObjectType};
use crate::value::{Address, Primitive};

/// Slot of the item list head.
pub const HEAD: u64 = 0;
/// Slot of the size counter.
pub const SIZE: u64 = 1;

const SLOTS: u64 = 2;

/// Allocate an empty stack.
pub fn create(heap: &mut Heap) -> Result<Address, RuntimeError> {
    let address = heap.allocate_object(ObjectType::Stack, SLOTS)?;
    heap.set_slot(address, SIZE, Primitive::integer(0)?)?;
    Ok(address)
}

/// Push `value` onto the stack. Allocates one list cell, so both the stack
/// and the value ride in handles.
pub fn push(heap: &mut Heap, stack: &Handle, value: &Handle) -> Result<(), RuntimeError> {
    let head = heap.handle(heap.typed_slot(stack.get().as_reference()?, ObjectType::Stack, HEAD)?);
    let cell = pair::create(heap, value, &head)?;

    let address = stack.get().as_reference()?;
    heap.set_slot(address, HEAD, Primitive::reference_unchecked(cell))?;
    let size = heap.slot(address, SIZE)?.as_integer()?;
    heap.set_slot(address, SIZE, Primitive::integer(size + 1)?)
}

/// Pop the top of the stack at `address`; nil when empty.
pub fn pop(heap: &mut Heap, address: Address) -> Result<Primitive, RuntimeError> {
    let head = heap.typed_slot(address, ObjectType::Stack, HEAD)?;
    if head.is_nil() {
        return Ok(Primitive::nil());
    }
    let cell = head.as_reference()?;
    let value = pair::first(heap, cell)?;
    let next = pair::second(heap, cell)?;
    heap.set_slot(address, HEAD, next)?;
    let size = heap.slot(address, SIZE)?.as_integer()?;
    heap.set_slot(address, SIZE, Primitive::integer(size - 1)?)?;
    Ok(value)
}

/// Number of items on the stack at `address`.
pub fn len(heap: &Heap, address: Address) -> Result<i64, RuntimeError> {
    heap.typed_slot(address, ObjectType::Stack, SIZE)?.as_integer()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_is_lifo() {
        let mut heap = Heap::new(1024);
        let stack = create(&mut heap).expect("allocates");
        let stack = heap.handle(Primitive::reference(stack).expect("aligned"));

        for value in 1..=3 {
            let value = heap.handle(Primitive::integer(value).expect("in range"));
            push(&mut heap, &stack, &value).expect("pushes");
        }

        let address = stack.get().as_reference().expect("reference");
        assert_eq!(len(&heap, address).expect("len"), 3);
        for expected in (1..=3).rev() {
            let value = pop(&mut heap, address).expect("pops");
            assert_eq!(value.as_integer().expect("integer"), expected);
        }
        assert_eq!(len(&heap, address).expect("len"), 0);
        assert!(pop(&mut heap, address).expect("pops").is_nil());
    }
}

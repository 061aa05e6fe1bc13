//! Association lists with a size counter.
//!
//! Entries are stored as `Pair(Pair(key, value), next)` from the head slot.
//! Lookups compare keys by shallow equality, so reference keys match by
//! address only.

use crate::error::RuntimeError;
use crate::heap::{Handle, Heap};
use crate::objects::{pair, ObjectType};
use crate::value::{Address, Primitive};

/// Slot of the entry list head.
pub const HEAD: u64 = 0;
/// Slot of the size counter.
pub const SIZE: u64 = 1;

const SLOTS: u64 = 2;

/// Allocate an empty map.
pub fn create(heap: &mut Heap) -> Result<Address, RuntimeError> {
    let address = heap.allocate_object(ObjectType::Map, SLOTS)?;
    heap.set_slot(address, SIZE, Primitive::integer(0)?)?;
    Ok(address)
}

/// Value stored under `key`, or nil when absent.
pub fn lookup(heap: &Heap, address: Address, key: Primitive) -> Result<Primitive, RuntimeError> {
    match find_entry(heap, address, key)? {
        Some(entry) => pair::second(heap, entry),
        None => Ok(Primitive::nil()),
    }
}

/// Insert `value` under `key`. An existing entry is updated in place and the
/// size is unchanged; otherwise a new entry is pushed at the head.
///
/// The map, key and value ride in handles because the insert path allocates
/// twice.
pub fn insert(heap: &mut Heap, map: &Handle, key: &Handle, value: &Handle) -> Result<(), RuntimeError> {
    let address = map.get().as_reference()?;
    if let Some(entry) = find_entry(heap, address, key.get())? {
        return pair::set_second(heap, entry, value.get());
    }

    let entry = pair::create(heap, key, value)?;
    let entry = heap.handle(Primitive::reference_unchecked(entry));
    let head = heap.handle(heap.typed_slot(map.get().as_reference()?, ObjectType::Map, HEAD)?);
    let head = pair::create(heap, &entry, &head)?;

    // no allocation below this point; the address is stable again
    let address = map.get().as_reference()?;
    heap.set_slot(address, HEAD, Primitive::reference_unchecked(head))?;
    let size = heap.slot(address, SIZE)?.as_integer()?;
    heap.set_slot(address, SIZE, Primitive::integer(size + 1)?)
}

/// Number of entries in the map at `address`.
pub fn len(heap: &Heap, address: Address) -> Result<i64, RuntimeError> {
    heap.typed_slot(address, ObjectType::Map, SIZE)?.as_integer()
}

/// Walk the entry list for `key`; yields the key-value pair cell.
fn find_entry(heap: &Heap, address: Address, key: Primitive) -> Result<Option<Address>, RuntimeError> {
    let mut node = heap.typed_slot(address, ObjectType::Map, HEAD)?;
    while !node.is_nil() {
        let cell = node.as_reference()?;
        let entry = pair::first(heap, cell)?.as_reference()?;
        if pair::first(heap, entry)?.shallow_equals(&key) {
            return Ok(Some(entry));
        }
        node = pair::second(heap, cell)?;
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(id: u64) -> Primitive {
        Primitive::symbol(id).expect("in range")
    }

    #[test]
    fn insert_then_lookup() {
        let mut heap = Heap::new(1024);
        let map = create(&mut heap).expect("allocates");
        let map = heap.handle(Primitive::reference(map).expect("aligned"));

        let key = heap.handle(symbol(1));
        let value = heap.handle(Primitive::integer(10).expect("in range"));
        insert(&mut heap, &map, &key, &value).expect("inserts");

        let address = map.get().as_reference().expect("reference");
        assert_eq!(lookup(&heap, address, symbol(1)).expect("lookup"), value.get());
        assert_eq!(len(&heap, address).expect("len"), 1);
        assert!(lookup(&heap, address, symbol(2)).expect("lookup").is_nil());
    }

    #[test]
    fn reinsert_updates_in_place() {
        let mut heap = Heap::new(1024);
        let map = create(&mut heap).expect("allocates");
        let map = heap.handle(Primitive::reference(map).expect("aligned"));

        let key = heap.handle(symbol(7));
        let first = heap.handle(Primitive::integer(1).expect("in range"));
        let second = heap.handle(Primitive::integer(2).expect("in range"));
        insert(&mut heap, &map, &key, &first).expect("inserts");
        insert(&mut heap, &map, &key, &second).expect("updates");

        let address = map.get().as_reference().expect("reference");
        assert_eq!(lookup(&heap, address, symbol(7)).expect("lookup"), second.get());
        assert_eq!(len(&heap, address).expect("len"), 1);
    }
}

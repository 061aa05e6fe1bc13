//! Symbol interning over two heap maps: id → string and string → id.

use crate::error::RuntimeError;
use crate::heap::{Handle, Heap};
use crate::objects::{map, pair, string, ObjectType};
use crate::value::{Address, Primitive};

/// Slot of the id → string map.
pub const ID_TO_STRING: u64 = 0;
/// Slot of the string → id map.
pub const STRING_TO_ID: u64 = 1;

const SLOTS: u64 = 2;

/// Allocate a symbol table over the two maps.
pub fn create(heap: &mut Heap, id_to_string: &Handle, string_to_id: &Handle) -> Result<Address, RuntimeError> {
    let address = heap.allocate_object(ObjectType::SymbolTable, SLOTS)?;
    heap.set_slot(address, ID_TO_STRING, id_to_string.get())?;
    heap.set_slot(address, STRING_TO_ID, string_to_id.get())?;
    Ok(address)
}

/// Intern the heap string in `string`: equal contents always yield the same
/// symbol. A fresh symbol takes the current size of the string → id map as
/// its id, and both directions are inserted.
pub fn intern(heap: &mut Heap, table: &Handle, string: &Handle) -> Result<Primitive, RuntimeError> {
    let needle = string.get().as_reference()?;

    // existing entries match by content, not by address
    let table_address = table.get().as_reference()?;
    let string_to_id = heap
        .typed_slot(table_address, ObjectType::SymbolTable, STRING_TO_ID)?
        .as_reference()?;
    let mut node = heap.typed_slot(string_to_id, ObjectType::Map, map::HEAD)?;
    while !node.is_nil() {
        let cell = node.as_reference()?;
        let entry = pair::first(heap, cell)?.as_reference()?;
        let key = pair::first(heap, entry)?.as_reference()?;
        if string::eq(heap, key, needle)? {
            return pair::second(heap, entry);
        }
        node = pair::second(heap, cell)?;
    }

    let symbol = Primitive::symbol(map::len(heap, string_to_id)? as u64)?;
    let symbol = heap.handle(symbol);

    // both insertions allocate; re-derive each map from the table handle
    let forward = heap.handle(heap.slot(table.get().as_reference()?, STRING_TO_ID)?);
    map::insert(heap, &forward, string, &symbol)?;
    let backward = heap.handle(heap.slot(table.get().as_reference()?, ID_TO_STRING)?);
    map::insert(heap, &backward, &symbol, string)?;

    Ok(symbol.get())
}

/// The string a symbol was interned from, or nil for an unknown id.
pub fn to_string(heap: &Heap, address: Address, symbol: Primitive) -> Result<Primitive, RuntimeError> {
    symbol.as_symbol()?;
    let id_to_string = heap
        .typed_slot(address, ObjectType::SymbolTable, ID_TO_STRING)?
        .as_reference()?;
    map::lookup(heap, id_to_string, symbol)
}

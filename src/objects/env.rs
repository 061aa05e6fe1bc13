//! Lexical environments: an outer link plus a lookup map.

use crate::error::RuntimeError;
use crate::heap::{Handle, Heap};
use crate::objects::{map, ObjectType};
use crate::value::{Address, Primitive, PrimitiveType};

/// Slot of the enclosing environment (reference or nil).
pub const OUTER: u64 = 0;
/// Slot of the lookup map.
pub const LOOKUP: u64 = 1;

const SLOTS: u64 = 2;

/// Allocate an environment chained to `outer` with the given lookup map.
pub fn create(heap: &mut Heap, outer: &Handle, lookup: &Handle) -> Result<Address, RuntimeError> {
    let address = heap.allocate_object(ObjectType::Environment, SLOTS)?;
    heap.set_slot(address, OUTER, outer.get())?;
    heap.set_slot(address, LOOKUP, lookup.get())?;
    Ok(address)
}

/// Resolve `symbol` along the environment chain; nil when no frame defines
/// it. Fails with `TypeMismatch` for a non-symbol argument.
pub fn lookup(heap: &Heap, address: Address, symbol: Primitive) -> Result<Primitive, RuntimeError> {
    check_symbol(symbol)?;
    let mut env = Primitive::reference(address)?;
    while !env.is_nil() {
        let current = env.as_reference()?;
        let table = heap.typed_slot(current, ObjectType::Environment, LOOKUP)?.as_reference()?;
        let found = map::lookup(heap, table, symbol)?;
        if !found.is_nil() {
            return Ok(found);
        }
        env = heap.slot(current, OUTER)?;
    }
    Ok(Primitive::nil())
}

/// Bind `symbol` to `value` in this environment's own map.
pub fn define(heap: &mut Heap, env: &Handle, symbol: Primitive, value: &Handle) -> Result<(), RuntimeError> {
    check_symbol(symbol)?;
    let table = heap.handle(heap.typed_slot(env.get().as_reference()?, ObjectType::Environment, LOOKUP)?);
    let symbol = heap.handle(symbol);
    map::insert(heap, &table, &symbol, value)
}

fn check_symbol(symbol: Primitive) -> Result<(), RuntimeError> {
    if symbol.kind() != PrimitiveType::Symbol {
        return Err(RuntimeError::TypeMismatch {
            expected: PrimitiveType::Symbol.into(),
            actual: symbol.kind().into(),
        });
    }
    Ok(())
}

//! Heap strings: a length word followed by raw bytes, padded to word
//! alignment.

use crate::consts::{HEADER_SIZE, WORD_SIZE};
use crate::error::RuntimeError;
use crate::heap::Heap;
use crate::objects::{Header, ObjectType};
use crate::value::{Address, Primitive};

const CHARS_OFFSET: u64 = HEADER_SIZE + WORD_SIZE;

/// Allocate a string holding `bytes`.
pub fn create(heap: &mut Heap, bytes: &[u8]) -> Result<Address, RuntimeError> {
    let size = allocation_size(bytes.len() as u64);
    let address = heap.allocate(size)?;
    heap.write_header(
        address,
        Header {
            object_type: ObjectType::String,
            allocation_size: size as u32,
        },
    )?;
    heap.write_word(address + HEADER_SIZE, Primitive::integer(bytes.len() as i64)?.to_word())?;
    heap.write_bytes(address + CHARS_OFFSET, bytes)?;
    // stale padding would leak the previous occupant of the semi-space
    let padding = size - CHARS_OFFSET - bytes.len() as u64;
    heap.write_bytes(address + CHARS_OFFSET + bytes.len() as u64, &vec![0u8; padding as usize])?;
    Ok(address)
}

/// Number of bytes in the string at `address`.
pub fn length(heap: &Heap, address: Address) -> Result<i64, RuntimeError> {
    heap.check_type(address, ObjectType::String)?;
    Primitive::from_word(heap.read_word(address + HEADER_SIZE)?).as_integer()
}

/// Byte at `index`, as a character primitive.
pub fn char_at(heap: &Heap, address: Address, index: u64) -> Result<Primitive, RuntimeError> {
    let length = length(heap, address)? as u64;
    if index >= length {
        return Err(RuntimeError::IndexOutOfBounds { index, length });
    }
    let byte = heap.read_bytes(address + CHARS_OFFSET + index, 1)?[0];
    Ok(Primitive::character(byte))
}

/// The raw byte payload of the string at `address`.
pub fn bytes(heap: &Heap, address: Address) -> Result<&[u8], RuntimeError> {
    let length = length(heap, address)? as u64;
    heap.read_bytes(address + CHARS_OFFSET, length)
}

/// The payload decoded as UTF-8.
pub fn to_str(heap: &Heap, address: Address) -> Result<&str, RuntimeError> {
    std::str::from_utf8(bytes(heap, address)?).map_err(|_| RuntimeError::TypeMismatch {
        expected: "String",
        actual: "bytes",
    })
}

/// Content equality of two heap strings.
pub fn eq(heap: &Heap, a: Address, b: Address) -> Result<bool, RuntimeError> {
    Ok(a == b || bytes(heap, a)? == bytes(heap, b)?)
}

const fn allocation_size(length: u64) -> u64 {
    let unaligned = CHARS_OFFSET + length;
    unaligned.div_ceil(WORD_SIZE) * WORD_SIZE
}

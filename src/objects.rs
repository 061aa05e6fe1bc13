//! Heap object model: typed headers and the concrete object catalogue.
//!
//! Every heap allocation starts with a one-word [`Header`] recording the
//! object's type and its total allocation size. Slotted objects follow the
//! header with enumerated [`Primitive`] slots; strings follow it with a
//! length word and raw bytes. The per-type modules own the slot layouts and
//! the operations over them.

use crate::consts::{HEADER_SIZE, WORD_SIZE};
use crate::heap::Heap;
use crate::value::{Primitive, PrimitiveType};

use itertools::Itertools;
use num_enum::TryFromPrimitive;

pub mod closure;
pub mod env;
pub mod frame;
pub mod map;
pub mod native;
pub mod pair;
pub mod stack;
pub mod string;
pub mod symbol_table;
pub mod vector;

/// Type tag of a heap object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, strum::Display, strum::IntoStaticStr)]
#[repr(u8)]
pub enum ObjectType {
    /// Two-slot cons cell.
    Pair = 0x00,
    /// Length-prefixed slot array sized at allocation time.
    Vector = 0x01,
    /// Length word plus raw bytes.
    String = 0x02,
    /// Association list of key-value pairs with a size counter.
    Map = 0x03,
    /// Head list plus size counter.
    Stack = 0x04,
    /// Lexical scope: outer link plus lookup map.
    Environment = 0x05,
    /// Language-level activation record.
    Frame = 0x06,
    /// Function bound to its captured environment.
    Closure = 0x07,
    /// Host function pointer plus arity.
    NativeFunction = 0x08,
    /// Bidirectional id/string intern maps.
    SymbolTable = 0x09,
    /// Forwarding marker left behind by an evacuation. Never observed by
    /// mutator code.
    GcForward = 0x0a,
}

/// Decoded heap object header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Type of the object that follows.
    pub object_type: ObjectType,
    /// Total allocation size in bytes, header included. Fixed at
    /// construction; drives slot iteration and evacuation copies.
    pub allocation_size: u32,
}

impl Header {
    /// Pack into the on-heap word.
    pub const fn encode(&self) -> u64 {
        (self.object_type as u64) | ((self.allocation_size as u64) << 32)
    }

    /// Unpack from the on-heap word. `None` for a corrupt tag.
    pub fn decode(word: u64) -> Option<Self> {
        let object_type = ObjectType::try_from(word as u8).ok()?;
        Some(Self {
            object_type,
            allocation_size: (word >> 32) as u32,
        })
    }

    /// Number of primitive slots following the header. Strings and
    /// forwarding markers expose none.
    pub const fn slot_count(&self) -> u64 {
        match self.object_type {
            ObjectType::String | ObjectType::GcForward => 0,
            _ => (self.allocation_size as u64 - HEADER_SIZE) / WORD_SIZE,
        }
    }
}

/// Render a value for diagnostics and the `println` native. Unreadable heap
/// state renders as `#<invalid>` rather than failing.
pub fn render(heap: &Heap, value: Primitive) -> String {
    match value.kind() {
        PrimitiveType::Nil => "nil".to_owned(),
        PrimitiveType::Integer => match value.as_integer() {
            Ok(v) => v.to_string(),
            Err(_) => "#<invalid>".to_owned(),
        },
        PrimitiveType::Boolean => match value.as_boolean() {
            Ok(true) => "true".to_owned(),
            Ok(false) => "false".to_owned(),
            Err(_) => "#<invalid>".to_owned(),
        },
        PrimitiveType::Character => match value.as_character() {
            Ok(c) => format!("#\\{}", c as char),
            Err(_) => "#<invalid>".to_owned(),
        },
        PrimitiveType::Real => match value.as_real() {
            Ok(v) => v.to_string(),
            Err(_) => "#<invalid>".to_owned(),
        },
        PrimitiveType::Symbol => match value.as_symbol() {
            Ok(id) => format!("#<symbol {id}>"),
            Err(_) => "#<invalid>".to_owned(),
        },
        PrimitiveType::NativeReference => match value.as_native_reference() {
            Ok(v) => format!("#<native {v:#x}>"),
            Err(_) => "#<invalid>".to_owned(),
        },
        PrimitiveType::Reference => match value.as_reference() {
            Ok(address) => render_object(heap, address),
            Err(_) => "#<invalid>".to_owned(),
        },
    }
}

fn render_object(heap: &Heap, address: u64) -> String {
    let header = match heap.header(address) {
        Ok(header) => header,
        Err(_) => return "#<invalid>".to_owned(),
    };
    match header.object_type {
        ObjectType::String => match string::to_str(heap, address) {
            Ok(text) => format!("{text:?}"),
            Err(_) => "#<invalid>".to_owned(),
        },
        ObjectType::Pair => {
            let first = heap.slot(address, pair::FIRST).map(|p| render(heap, p));
            let second = heap.slot(address, pair::SECOND).map(|p| render(heap, p));
            match (first, second) {
                (Ok(first), Ok(second)) => format!("({first} . {second})"),
                _ => "#<invalid>".to_owned(),
            }
        }
        ObjectType::Vector => {
            let length = vector::length(heap, address).unwrap_or(0);
            let items = (0..length)
                .map(|i| match vector::get(heap, address, i as u64) {
                    Ok(item) => render(heap, item),
                    Err(_) => "#<invalid>".to_owned(),
                })
                .join(" ");
            format!("[{items}]")
        }
        ObjectType::Map => match map::len(heap, address) {
            Ok(size) => format!("#<map {size}>"),
            Err(_) => "#<invalid>".to_owned(),
        },
        ObjectType::Stack => match stack::len(heap, address) {
            Ok(size) => format!("#<stack {size}>"),
            Err(_) => "#<invalid>".to_owned(),
        },
        ObjectType::Environment => "#<environment>".to_owned(),
        ObjectType::Frame => "#<frame>".to_owned(),
        ObjectType::Closure => "#<closure>".to_owned(),
        ObjectType::NativeFunction => match native::arity(heap, address) {
            Ok(arity) => format!("#<native-function/{arity}>"),
            Err(_) => "#<invalid>".to_owned(),
        },
        ObjectType::SymbolTable => "#<symbol-table>".to_owned(),
        ObjectType::GcForward => "#<invalid>".to_owned(),
    }
}

//! VM parameters

use std::mem;

/// Length of a machine word, in bytes. Every primitive value and every heap
/// header occupies exactly one word.
pub const WORD_SIZE: u64 = mem::size_of::<u64>() as u64;

/// Length of a heap object header, in bytes.
pub const HEADER_SIZE: u64 = WORD_SIZE;

/// Smallest heap allocation able to carry a forwarding marker: a header plus
/// one primitive slot.
pub const MIN_ALLOCATION_SIZE: u64 = HEADER_SIZE + WORD_SIZE;

/// Maximum number of frames on the call stack.
pub const CALL_STACK_DEPTH: usize = 4096;

/// Default size of each heap semi-space, in bytes.
pub const DEFAULT_HEAP_SIZE: u64 = 1024 * 1024;

/// Module resolved as the program entrypoint.
pub const ENTRY_MODULE: &str = "main";

/// Function resolved as the program entrypoint.
pub const ENTRY_FUNCTION: &str = "main";

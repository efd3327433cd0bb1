//! A resizable, bitmap-backed free/used index written in pure Rust.
//! `no_std` + `alloc`, no `unsafe`.
//!
//! Every bit of the backing byte buffer tracks the occupancy of one logical
//! slot (a block of an external allocator, a page, a pool entry, ...). A bit
//! value of `0` means *free*, `1` means *used*. Bits are addressed
//! LSB-first: bit index `i` lives in byte `i / 8` at position `i % 8`.
//!
//! [`FreeIndex`] is the main struct in this library. Its
//! [features](#features) are listed below.
//!
//! # Examples
//! ```
//! use free_index::FreeIndex;
//!
//! let mut index = FreeIndex::try_new(2).unwrap();
//! assert_eq!(index.bit_count(), 16);
//! for bit in (0..5).chain(6..16) {
//!     index.set_used(bit);
//! }
//! assert_eq!(index.next_free(0).get(), Some(5));
//! ```
//!
//! # Use Cases
//!
//! - Slot bookkeeping below a block, page or pool allocator
//! - Environments that must survive allocation failure instead of aborting
//! - Not thread safe on its own; wrap it in a lock when sharing it
//!
//! # Features
//!
//! - `#![no_std]` compatible (needs `alloc`)
//! - Fallible construction and resizing via [`AllocError`], with the strong
//!   guarantee: a failed resize leaves the index untouched
//! - Exact [`resize`] and amortized [`resize_smart`]
//! - Single-bit operations: `set_used`, `set_free`, `is_free`, `is_used`
//! - Range marking: `set_used_range`, `set_free_range`
//! - Linear scans: `next_free` (inclusive start), `prev_free` (exclusive end)
//! - Iteration over free or used bit indices: `iter_free()`, `iter_used()`
//! - Counting: `free_count`, `used_count`
//!
//! Diagnostics go through the [`log`] facade; the crate installs no logger.
//!
//! [`resize`]: FreeIndex::resize
//! [`resize_smart`]: FreeIndex::resize_smart
//! [`log`]: https://docs.rs/log

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![no_std]

extern crate alloc;

mod error;
mod index;

pub use error::{AllocError, Result};
pub use index::{FreeIndex, IterFree, IterUsed, Scan, bit_count, byte_count_for, smart_byte_count};

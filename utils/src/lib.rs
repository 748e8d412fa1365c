#![feature(const_size_of_val, const_pointer_is_aligned)]

/// Bit- and byte-level primitives: big-endian packing/unpacking at an
/// arbitrary offset, single-bit read/write by bit-index, and the
/// ASCII/hex helpers the FEC and protocol layers build on.
pub mod bits;
pub mod bytes;
/// Utilities for storing integer-like data in different byteorders.
pub mod endian;
/// Error-handling utilities.
pub mod error;

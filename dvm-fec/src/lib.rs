//! Forward error correction and bit-level primitives: CRC-9/16/32,
//! Golay/QR/Hamming block codes, Trellis 1/2 and 3/4 rate coding, the P25
//! bit interleaver, and Reed-Solomon over GF(2⁶).

pub mod crc;
pub mod gf64;
pub mod golay;
pub mod hamming;
pub mod interleaver;
mod linear_code;
pub mod qr;
pub mod reed_solomon;
pub mod trellis;

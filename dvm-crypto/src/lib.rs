//! Datagram-level AES-256-ECB wrap and P25 voice keystream generation,
//! `spec.md` §4.6–4.7.

pub mod aes_wrap;
pub mod keystream;

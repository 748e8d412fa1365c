//! RTP + RTP-extension + FNE-extension framing, `spec.md` §4.8, plus the
//! opcode/sub-opcode space it dispatches on.

pub mod envelope;
pub mod opcode;
pub mod rtp;

pub use envelope::{decode, encode, Envelope};

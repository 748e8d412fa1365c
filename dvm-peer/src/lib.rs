//! The adapter surface: attaches a running session to host callbacks and
//! synthesises the DMR/P25 voice-call artefacts the session itself has no
//! opinion about. `spec.md` §2 ("L5 Adapter surface").

pub mod frames;
pub mod peer;
pub mod system;

pub use peer::Peer;
pub use system::System;

//! Callback payloads fired by [`crate::session::Session`] toward its host,
//! `spec.md` §4.10.

use dvm_framing::opcode::NakReason;
use dvm_proto::kmm::KmmModifyKey;
use dvm_proto::preamble::Preamble;

/// A decoded protocol-class frame: the common preamble plus the raw
/// payload it was decoded from, one variant per `spec.md` §4.10 Protocol
/// sub-function.
pub enum ProtocolEvent {
	Dmr(Preamble, Vec<u8>),
	P25(Preamble, Vec<u8>),
	Nxdn(Preamble, Vec<u8>),
	Analog(Preamble, Vec<u8>),
}

/// Why the session dropped back to `WaitingLogin` or stopped entirely.
#[derive(Debug)]
pub enum DisconnectReason {
	/// The master sent `MstClosing` (0x71); the session keeps retrying.
	MasterClosing,
	/// A NAK was received; `PeerAcl` is terminal, any other reason simply
	/// restarts the login cycle.
	Nak(NakReason),
	/// `Session::stop` was called explicitly.
	Stopped,
}

/// A decoded key-response message, `spec.md` §4.10.
pub struct KeyResponse {
	pub message_id: u8,
	pub dst_llid: u16,
	pub src_llid: u16,
	pub modify_key: KmmModifyKey,
}

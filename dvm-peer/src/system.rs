//! The host capability surface a [`crate::peer::Peer`] dispatches into,
//! `spec.md` §2 ("Adapter surface").

use dvm_proto::preamble::Preamble;
use dvm_session::{DisconnectReason, KeyResponse};

/// Implemented by the embedding host, one instance per peer. Every method
/// mirrors a callback [`dvm_session::Session`] fires toward its owner
/// (`spec.md` §4.10); `Peer` is the thing that actually holds the session
/// and forwards into these methods, so a host never touches `Session`
/// directly.
pub trait System {
	/// A decoded DMR frame: the common preamble plus the raw payload it was
	/// decoded from.
	fn on_dmr(&mut self, preamble: Preamble, payload: &[u8]);

	/// A decoded P25 frame.
	fn on_p25(&mut self, preamble: Preamble, payload: &[u8]);

	/// A decoded NXDN frame.
	fn on_nxdn(&mut self, preamble: Preamble, payload: &[u8]);

	/// A decoded analog-passthrough frame.
	fn on_analog(&mut self, preamble: Preamble, payload: &[u8]);

	/// The login/auth/config handshake completed; the session is `Running`.
	fn on_connected(&mut self);

	/// The session dropped back to `WaitingLogin` or stopped; see
	/// [`DisconnectReason`] for why.
	fn on_disconnected(&mut self, reason: DisconnectReason);

	/// A KMM key-response message arrived.
	fn on_key_response(&mut self, response: KeyResponse);
}

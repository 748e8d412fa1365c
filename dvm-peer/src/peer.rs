//! The adapter actor: owns a running [`Session`] and dispatches its
//! callbacks into a host-supplied [`System`], `spec.md` §2 ("Adapter
//! surface").

use dvm_session::{DisconnectReason, KeyResponse, ProtocolEvent, Session};
use stakker::{call, ActorOwn, CX};

use crate::system::System;

/// Wraps a [`Session`] actor and routes its events to `S`. Structural
/// template: `net::Interface`, which likewise takes its child actor
/// (`ActorOwn<Wireguard>`) already spawned rather than spawning it itself.
///
/// The host is responsible for spawning `Session` — wiring its four `Fwd`
/// callback channels (`fwd_to!` targeting this actor's own methods below)
/// requires this actor's own address, so that spawn happens at the call
/// site that also spawns `Peer`, the same way nothing in this codebase's
/// reference crates shows where `Wireguard` itself gets spawned before
/// being handed to `Interface::init`.
pub struct Peer<S: System> {
	session: ActorOwn<Session>,
	system: S,
}

impl<S: System> Peer<S> {
	pub fn init(_: CX![], session: ActorOwn<Session>, system: S) -> Option<Self> {
		Some(Peer { session, system })
	}

	/// Starts a fresh call stream on the underlying session.
	pub fn begin_call(&mut self, _: CX![]) {
		call!([self.session], begin_call());
	}

	/// Sends a Protocol-class frame (DMR/P25/NXDN/Analog) on the current
	/// call stream.
	pub fn send_protocol(&mut self, _: CX![], sub_function: u8, payload: Vec<u8>) {
		call!([self.session], send_protocol(sub_function, &payload));
	}

	/// Sends an announce-class message (group/unit (de)registration,
	/// affiliation removal, the full affiliation table).
	pub fn announce(&mut self, _: CX![], sub_function: u8, payload: Vec<u8>) {
		call!([self.session], announce(sub_function, &payload));
	}

	/// Sends the KMM modify-key request.
	pub fn key_request(&mut self, _: CX![], payload: Vec<u8>) {
		call!([self.session], key_request(&payload));
	}

	/// Stops the session: `RptClosing`, task cancellation, resource
	/// release.
	pub fn stop(&mut self, cx: CX![]) {
		call!([self.session], stop());
		let _ = cx;
	}

	/// Target of `Session`'s `fwd_protocol` channel.
	pub fn on_protocol(&mut self, _: CX![], event: ProtocolEvent) {
		match event {
			ProtocolEvent::Dmr(preamble, payload) => self.system.on_dmr(preamble, &payload),
			ProtocolEvent::P25(preamble, payload) => self.system.on_p25(preamble, &payload),
			ProtocolEvent::Nxdn(preamble, payload) => self.system.on_nxdn(preamble, &payload),
			ProtocolEvent::Analog(preamble, payload) => self.system.on_analog(preamble, &payload),
		}
	}

	/// Target of `Session`'s `fwd_connected` channel.
	pub fn on_connected(&mut self, _: CX![]) {
		self.system.on_connected();
	}

	/// Target of `Session`'s `fwd_disconnected` channel.
	pub fn on_disconnected(&mut self, _: CX![], reason: DisconnectReason) {
		self.system.on_disconnected(reason);
	}

	/// Target of `Session`'s `fwd_key` channel.
	pub fn on_key_response(&mut self, _: CX![], response: KeyResponse) {
		self.system.on_key_response(response);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use dvm_proto::preamble::Preamble;

	struct RecordingSystem {
		connected: bool,
		dmr_frames: usize,
	}

	impl System for RecordingSystem {
		fn on_dmr(&mut self, _preamble: Preamble, _payload: &[u8]) {
			self.dmr_frames += 1;
		}
		fn on_p25(&mut self, _preamble: Preamble, _payload: &[u8]) {}
		fn on_nxdn(&mut self, _preamble: Preamble, _payload: &[u8]) {}
		fn on_analog(&mut self, _preamble: Preamble, _payload: &[u8]) {}
		fn on_connected(&mut self) {
			self.connected = true;
		}
		fn on_disconnected(&mut self, _reason: DisconnectReason) {
			self.connected = false;
		}
		fn on_key_response(&mut self, _response: KeyResponse) {}
	}

	#[test]
	fn dispatches_protocol_events_by_mode() {
		let mut system = RecordingSystem { connected: false, dmr_frames: 0 };
		let preamble = Preamble {
			mode: dvm_proto::preamble::Mode::Dmr,
			sequence_or_lco: 0,
			source_id: 1,
			dest_id: 2,
			mode_specific: [0; 4],
			flags: dvm_proto::preamble::FrameFlags { slot: false, private_call: false, frame_type: 0, data_type_or_counter: 0 },
		};

		match ProtocolEvent::Dmr(preamble, vec![]) {
			ProtocolEvent::Dmr(p, payload) => system.on_dmr(p, &payload),
			_ => unreachable!(),
		}

		assert_eq!(system.dmr_frames, 1);
		assert!(!system.connected);
	}
}

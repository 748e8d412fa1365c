//! The peer-to-master session state machine: login, salted-SHA-256
//! authorisation, configuration, and the running state with ping liveness.
//! `spec.md` §4.10, §5.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6, UdpSocket};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use collections::bytes::Slice;
use dvm_framing::opcode::{function, protocol_sub, NakReason};
use dvm_framing::rtp::RtpClock;
use dvm_framing::{decode as decode_envelope, encode as encode_envelope};
use dvm_proto::kmm::{self, KmmHeader, KmmModifyKey};
use dvm_proto::preamble;
use log::{debug, error, info, warn};
use runtime::Io;
use stakker::{fwd, fwd_to, Fwd, FixedTimerKey, CX};
use utils::bits::{read_u16, read_u32, sha256, str_to_bytes, write_u32};
use utils::error::*;

use crate::events::{DisconnectReason, KeyResponse, ProtocolEvent};
use crate::state::{ConnectionState, PeerDetails, PeerInformation, SEQUENCE_SENTINEL};

/// `spec.md` §4.10: pings-sent may exceed pings-acked by this many before
/// the link is declared dead.
pub const MAX_MISSED_PEER_PINGS: u32 = 5;

pub struct Session {
	io: Io<UdpSocket>,
	info: PeerInformation,
	passphrase: Vec<u8>,
	clock: RtpClock,
	ping_time: Duration,
	ping_timer: FixedTimerKey,
	stopped: bool,
	fwd_protocol: Fwd<ProtocolEvent>,
	fwd_connected: Fwd<()>,
	fwd_disconnected: Fwd<DisconnectReason>,
	fwd_key: Fwd<KeyResponse>,
}

fn unix_seed() -> u32 {
	SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as u32).unwrap_or(0)
}

impl Session {
	/// Binds a UDP socket, connects it to `addr` so every inbound datagram
	/// is already known to originate at the master (`spec.md` §4.10
	/// "validate sender equals master endpoint"), and starts the
	/// maintenance task's first tick.
	#[allow(clippy::too_many_arguments)]
	pub fn init(
		cx: CX![],
		addr: SocketAddr,
		peer_id: u32,
		passphrase: String,
		details: PeerDetails,
		ping_time: Duration,
		fwd_protocol: Fwd<ProtocolEvent>,
		fwd_connected: Fwd<()>,
		fwd_disconnected: Fwd<DisconnectReason>,
		fwd_key: Fwd<KeyResponse>,
	) -> Option<Self> {
		let socket: std::io::Result<UdpSocket> = try {
			let socket = UdpSocket::bind::<SocketAddr>(match addr {
				SocketAddr::V4(_) => SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0).into(),
				SocketAddr::V6(_) => SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, 0, 0, 0).into(),
			})?;

			socket.set_nonblocking(true)?;
			socket.connect(addr)?;

			socket
		};

		let socket = socket.ok_or(|err| error!("Failed to create peer socket: {err}"))?;

		let read_fwd = fwd_to!([cx], read() as (Slice));
		let io = Io::new(socket, read_fwd);

		let mut session = Self {
			io,
			info: PeerInformation::new(peer_id, details),
			passphrase: str_to_bytes(&passphrase),
			clock: RtpClock::new(unix_seed()),
			ping_time,
			ping_timer: FixedTimerKey::default(),
			stopped: false,
			fwd_protocol,
			fwd_connected,
			fwd_disconnected,
			fwd_key,
		};

		session.schedule_maintenance(cx);

		Some(session)
	}

	/// Starts a fresh call stream: new StreamId, sequence reset to 0.
	/// `spec.md` §3: regenerated "on every new call the peer initiates".
	pub fn begin_call(&mut self) {
		self.info.new_tx_stream();
	}

	/// Sends a Protocol-class frame (DMR/P25/NXDN/Analog) on the current
	/// call stream, assigning the next outbound sequence number.
	pub fn send_protocol(&mut self, sub_function: u8, payload: &[u8]) {
		let stream_id = self.info.tx_stream_id as u32;
		let sequence = self.info.next_tx_sequence();
		self.send_frame(function::PROTOCOL, sub_function, stream_id, sequence, payload);
	}

	/// Announce-class messages: group/unit (de)registration, affiliation
	/// removal, the full affiliation table. `spec.md` §4.10: "all are sent
	/// with packet sequence 0 and a forced stream id of 0".
	pub fn announce(&mut self, sub_function: u8, payload: &[u8]) {
		self.send_frame(function::ANNOUNCE, sub_function, 0, 0, payload);
	}

	/// The KMM modify-key request, function 0x7C, same sequence/stream
	/// convention as [`Session::announce`].
	pub fn key_request(&mut self, payload: &[u8]) {
		self.send_frame(function::KEY_REQ, dvm_framing::opcode::SUB_FUNCTION_NONE, 0, 0, payload);
	}

	/// Sends `RptClosing`, cancels the maintenance task, and fires the
	/// disconnect callback. `spec.md` §4.10 "Stop".
	pub fn stop(&mut self, cx: CX![]) {
		self.send_control(function::RPT_CLOSING, &[0u8]);
		self.stop_internal(cx, DisconnectReason::Stopped);
	}

	fn stop_internal(&mut self, cx: CX![], reason: DisconnectReason) {
		if self.stopped {
			return;
		}

		self.stopped = true;
		cx.timer_del(self.ping_timer);
		fwd!([self.fwd_disconnected], reason);
	}

	fn schedule_maintenance(&mut self, cx: CX![]) {
		if self.stopped {
			return;
		}

		let actor = cx.access_actor().clone();
		self.ping_timer = cx.after(self.ping_time, move |s| actor.apply(s, move |this, cx| this.maintenance(cx)));
	}

	/// The maintenance task, `spec.md` §4.10: runs every `PingTime`.
	fn maintenance(&mut self, cx: CX![]) {
		if self.stopped {
			return;
		}

		match self.info.state {
			ConnectionState::WaitingLogin => {
				self.info.new_tx_stream();
				self.info.reset_pings();
				self.send_rptl();
			}
			ConnectionState::Running => {
				let missed = self.info.pings_sent.saturating_sub(self.info.pings_acked);

				if missed > MAX_MISSED_PEER_PINGS {
					error!("peer {:#010x}: missed {missed} pings, declaring link dead", self.info.peer_id);
					// The transport is a connected UDP socket with no
					// persistent connection state to tear down; recovery
					// is the state reset below, which restarts the login
					// cycle on the next maintenance tick.
					self.info.state = ConnectionState::WaitingLogin;
				} else {
					self.send_ping();
					self.info.pings_sent += 1;
				}
			}
			ConnectionState::WaitingAuthorisation | ConnectionState::WaitingConfig => {}
		}

		self.schedule_maintenance(cx);
	}

	fn send_rptl(&mut self) {
		let mut payload = Vec::with_capacity(8);
		payload.extend_from_slice(b"RPTL");
		payload.extend_from_slice(&self.info.peer_id.to_be_bytes());
		self.send_control(function::RPTL, &payload);
	}

	fn send_ping(&mut self) {
		self.send_control(function::PING, &[]);
	}

	fn send_control(&mut self, function: u8, payload: &[u8]) {
		self.send_frame(function, dvm_framing::opcode::SUB_FUNCTION_NONE, 0, SEQUENCE_SENTINEL, payload);
	}

	fn send_frame(&mut self, function: u8, sub_function: u8, stream_id: u32, sequence: u16, payload: &[u8]) {
		if self.stopped {
			return;
		}

		let timestamp = self.clock.next();
		let datagram = encode_envelope(sequence, timestamp, self.info.peer_id, function, sub_function, stream_id, self.info.peer_id, payload);

		let sent = self.io.write(|cursor| {
			cursor.push(&datagram[..]);
		});

		if sent.is_err() {
			error!("peer {:#010x}: failed to send frame (function {function:#04x})", self.info.peer_id);
		}
	}

	/// The listen task, `spec.md` §4.10: decodes the envelope and
	/// dispatches by function byte.
	fn read(&mut self, cx: CX![], buf: Slice) {
		let Some(env) = decode_envelope(&buf) else { return };

		if self.info.observe_rx(env.stream_id, env.sequence) {
			debug!("peer {:#010x}: observed stream id change to {:#010x}", self.info.peer_id, env.stream_id);
		}

		match env.function {
			function::PROTOCOL => self.on_protocol(env.sub_function, env.payload),
			function::ACK => self.on_ack(env.peer_id, env.payload),
			function::NAK => self.on_nak(cx, env.payload),
			function::MST_CLOSING => self.on_master_closing(),
			function::PONG => self.info.pings_acked += 1,
			function::KEY_RSP => self.on_key_response(env.payload),
			function::MASTER => {}
			other => warn!("peer {:#010x}: dropping frame with unrecognised function {other:#04x}", self.info.peer_id),
		}
	}

	fn on_protocol(&mut self, sub_function: u8, payload: &[u8]) {
		let Some(decoded) = preamble::decode(payload) else {
			warn!("peer {:#010x}: protocol frame failed to decode preamble", self.info.peer_id);
			return;
		};

		let raw = payload.to_vec();

		let event = match sub_function {
			protocol_sub::DMR => ProtocolEvent::Dmr(decoded, raw),
			protocol_sub::P25 => ProtocolEvent::P25(decoded, raw),
			protocol_sub::NXDN => ProtocolEvent::Nxdn(decoded, raw),
			protocol_sub::ANALOG => ProtocolEvent::Analog(decoded, raw),
			other => {
				warn!("peer {:#010x}: unrecognised protocol sub-function {other:#04x}", self.info.peer_id);
				return;
			}
		};

		fwd!([self.fwd_protocol], event);
	}

	fn on_ack(&mut self, peer_id: u32, payload: &[u8]) {
		match self.info.state {
			ConnectionState::WaitingLogin => {
				if payload.len() < 10 {
					warn!("peer {:#010x}: ACK too short to carry a salt", self.info.peer_id);
					return;
				}

				let salt = read_u32(payload, 6);
				self.info.salt = salt;

				let hash = rptk_hash(salt, &self.passphrase);

				let mut rptk_payload = Vec::with_capacity(8 + hash.len());
				rptk_payload.extend_from_slice(b"RPTK");
				rptk_payload.extend_from_slice(&self.info.peer_id.to_be_bytes());
				rptk_payload.extend_from_slice(&hash);

				self.send_control(function::RPTK, &rptk_payload);
				self.info.state = ConnectionState::WaitingAuthorisation;
			}
			ConnectionState::WaitingAuthorisation => {
				if !self.verify_peer_id(peer_id) {
					return;
				}

				let mut rptc_payload = Vec::new();
				rptc_payload.extend_from_slice(b"RPTC");
				rptc_payload.extend_from_slice(&self.info.peer_id.to_be_bytes());
				rptc_payload.extend_from_slice(&self.info.details.to_json());

				self.send_control(function::RPTC, &rptc_payload);
				self.info.state = ConnectionState::WaitingConfig;
			}
			ConnectionState::WaitingConfig => {
				if !self.verify_peer_id(peer_id) {
					return;
				}

				self.info.state = ConnectionState::Running;
				info!("peer {:#010x}: session established", self.info.peer_id);
				fwd!([self.fwd_connected], ());
			}
			ConnectionState::Running => {
				warn!("peer {:#010x}: unexpected ACK while running", self.info.peer_id);
			}
		}
	}

	/// `spec.md` §7 "StateError": an ACK carrying a peer id different from
	/// ours forces the connection back to `WaitingLogin`.
	fn verify_peer_id(&mut self, peer_id: u32) -> bool {
		if peer_id == self.info.peer_id {
			true
		} else {
			error!("peer {:#010x}: ACK carries mismatched peer id {peer_id:#010x}", self.info.peer_id);
			self.info.state = ConnectionState::WaitingLogin;
			false
		}
	}

	fn on_nak(&mut self, cx: CX![], payload: &[u8]) {
		if payload.len() > 10 {
			let reason = NakReason::from_u16(read_u16(payload, 10));
			warn!("peer {:#010x}: NAK ({reason:?})", self.info.peer_id);

			if reason.is_terminal() {
				self.stop_internal(cx, DisconnectReason::Nak(reason));
				return;
			}
		} else {
			warn!("peer {:#010x}: NAK with no reason code", self.info.peer_id);
		}

		self.info.state = ConnectionState::WaitingLogin;
	}

	fn on_master_closing(&mut self) {
		info!("peer {:#010x}: master closing", self.info.peer_id);
		self.info.state = ConnectionState::WaitingLogin;
		fwd!([self.fwd_disconnected], DisconnectReason::MasterClosing);
	}

	fn on_key_response(&mut self, payload: &[u8]) {
		let Some(header) = KmmHeader::decode(payload) else {
			warn!("peer {:#010x}: key response shorter than the KMM frame header", self.info.peer_id);
			return;
		};

		if header.message_id != kmm::MODIFY_KEY_CMD {
			warn!("peer {:#010x}: key response with unsupported message id {:#04x}", self.info.peer_id, header.message_id);
			return;
		}

		let Some(modify_key) = KmmModifyKey::decode(&payload[kmm::HEADER_LEN..]) else {
			warn!("peer {:#010x}: failed to decode KmmModifyKey body", self.info.peer_id);
			return;
		};

		fwd!(
			[self.fwd_key],
			KeyResponse { message_id: header.message_id, dst_llid: header.dst_llid, src_llid: header.src_llid, modify_key }
		);
	}
}

/// `spec.md` §6: `SHA-256(BE(salt) || passphrase)`, the RPTK
/// authentication hash.
fn rptk_hash(salt: u32, passphrase: &[u8]) -> [u8; 32] {
	let mut buf = Vec::with_capacity(4 + passphrase.len());
	let mut salt_be = [0u8; 4];
	write_u32(&mut salt_be, 0, salt);
	buf.extend_from_slice(&salt_be);
	buf.extend_from_slice(passphrase);
	sha256(&buf)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rptk_hash_matches_known_vector() {
		// SHA-256(BE(0x12345678) || "password"), independently computed.
		let expected: [u8; 32] = [
			0x92, 0xf7, 0x4a, 0xfa, 0xb2, 0x69, 0x01, 0xf6, 0xcd, 0x3c, 0x55, 0x77, 0xef, 0x57, 0x87, 0xfb, 0xc5, 0xea, 0xf9, 0x6b, 0xa1, 0xce, 0xea,
			0x00, 0x7c, 0x29, 0x06, 0xed, 0x05, 0x2f, 0xd8, 0xd4,
		];

		assert_eq!(rptk_hash(0x1234_5678, b"password"), expected);
	}
}

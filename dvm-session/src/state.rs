//! Session-level data model: connection state, peer configuration, and the
//! runtime fields tracked for the life of a session. `spec.md` §3.

use serde::Serialize;

/// The packet-sequence value reserved to mark call-end and control packets.
/// `spec.md` §3 ("PacketSequence"); PING frames are the one case the spec
/// names explicitly (§4.10), and this implementation uses the same
/// sentinel for every other control-plane send (RPTL/RPTK/RPTC/NAK-path/
/// RptClosing) for consistency — control traffic never belongs to a call
/// stream.
pub const SEQUENCE_SENTINEL: u16 = 65535;

/// `spec.md` §3 ("ConnectionState"). Transitions are one-way through the
/// first three under normal operation; any NAK or socket failure returns
/// to `WaitingLogin`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConnectionState {
	WaitingLogin,
	WaitingAuthorisation,
	WaitingConfig,
	Running,
}

/// Geographic/site metadata carried in the `info` object of the RPTC
/// configuration document.
#[derive(Clone, Serialize)]
pub struct SiteInfo {
	pub latitude: f64,
	pub longitude: f64,
	pub height: f64,
	pub location: String,
}

/// Channel parameters carried in the `channel` object of the RPTC
/// configuration document.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInfo {
	pub tx_power: u32,
	pub tx_offset_mhz: f64,
	pub ch_bandwidth_khz: f64,
	pub channel_id: u8,
	pub channel_no: u32,
}

/// REST-console credentials carried in the `rcon` object of the RPTC
/// configuration document.
#[derive(Clone, Serialize)]
pub struct RconInfo {
	pub password: String,
	pub port: u16,
}

/// `spec.md` §3 ("PeerDetails"): the configuration advertised to the
/// master during the config phase.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerDetails {
	pub identity: String,
	pub rx_frequency: u32,
	pub tx_frequency: u32,
	pub external_peer: bool,
	pub conventional_peer: bool,
	pub info: SiteInfo,
	pub channel: ChannelInfo,
	pub rcon: RconInfo,
	pub software: String,
}

impl PeerDetails {
	/// Renders the §6 RPTC JSON document.
	pub fn to_json(&self) -> Vec<u8> {
		serde_json::to_vec(self).expect("PeerDetails always serializes")
	}
}

/// `spec.md` §3 ("PeerInformation"): runtime session state, distinct from
/// the static [`PeerDetails`] configuration it carries.
pub struct PeerInformation {
	pub peer_id: u32,
	/// The outbound StreamId for the call (if any) currently in progress.
	pub tx_stream_id: i32,
	/// The outbound packet sequence, reset to 0 whenever `tx_stream_id`
	/// changes.
	pub tx_sequence: u16,
	/// The last StreamId observed on receive; used only to detect a
	/// stream-id change and reset the receive-side sequence tracker
	/// (`spec.md` §3, §8 invariant 6).
	pub rx_stream_id: u32,
	pub rx_sequence: u16,
	pub salt: u32,
	pub state: ConnectionState,
	pub pings_sent: u32,
	pub pings_acked: u32,
	pub details: PeerDetails,
}

impl PeerInformation {
	pub fn new(peer_id: u32, details: PeerDetails) -> Self {
		PeerInformation {
			peer_id,
			tx_stream_id: 0,
			tx_sequence: 0,
			rx_stream_id: 0,
			rx_sequence: 0,
			salt: 0,
			state: ConnectionState::WaitingLogin,
			pings_sent: 0,
			pings_acked: 0,
			details,
		}
	}

	/// Starts a fresh call: a new random StreamId, sequence reset to 0.
	/// `spec.md` §3: "Regenerated on every new call the peer initiates and
	/// on every fresh login handshake."
	pub fn new_tx_stream(&mut self) {
		self.tx_stream_id = rand::random();
		self.tx_sequence = 0;
	}

	/// Returns the next outbound sequence number for the current stream,
	/// wrapping to 0 at the reserved sentinel.
	pub fn next_tx_sequence(&mut self) -> u16 {
		let seq = self.tx_sequence;
		self.tx_sequence = if self.tx_sequence == SEQUENCE_SENTINEL { 0 } else { self.tx_sequence + 1 };
		seq
	}

	/// Tracks an inbound StreamId, resetting the receive sequence tracker
	/// if it changed (`spec.md` §3, §8 invariant 6). Returns whether the
	/// stream id changed.
	pub fn observe_rx(&mut self, stream_id: u32, sequence: u16) -> bool {
		let changed = stream_id != self.rx_stream_id;

		if changed {
			self.rx_stream_id = stream_id;
		}

		self.rx_sequence = sequence;
		changed
	}

	pub fn reset_pings(&mut self) {
		self.pings_sent = 0;
		self.pings_acked = 0;
	}
}

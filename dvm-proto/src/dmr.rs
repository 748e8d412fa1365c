//! DMR Link Control, Privacy LC, EMB and Slot Type, `spec.md` §2/§9.

use dvm_fec::golay;
use utils::bits::{read_u24, write_u24};

/// Full Link Control (9 bytes): FLCO, feature set id, service options,
/// destination id, source id.
pub struct FullLc {
	pub flco: u8,
	pub fid: u8,
	pub service_options: u8,
	pub dest_id: u32,
	pub src_id: u32,
}

impl FullLc {
	pub fn decode(buf: &[u8; 9]) -> Self {
		FullLc {
			flco: buf[0] & 0x3f,
			fid: buf[1],
			service_options: buf[2],
			dest_id: read_u24(buf, 3),
			src_id: read_u24(buf, 6),
		}
	}

	pub fn encode(&self) -> [u8; 9] {
		let mut out = [0u8; 9];
		out[0] = self.flco & 0x3f;
		out[1] = self.fid;
		out[2] = self.service_options;
		write_u24(&mut out, 3, self.dest_id);
		write_u24(&mut out, 6, self.src_id);
		out
	}
}

/// Privacy (encrypted voice) Link Control: algorithm id, key id, and the
/// destination id the traffic is bound for.
pub struct PrivacyLc {
	pub algorithm_id: u8,
	pub key_id: u8,
	pub dest_id: u32,
}

impl PrivacyLc {
	pub fn decode(buf: &[u8; 9]) -> Self {
		PrivacyLc { algorithm_id: buf[0], key_id: buf[1], dest_id: read_u24(buf, 3) }
	}

	pub fn encode(&self) -> [u8; 9] {
		let mut out = [0u8; 9];
		out[0] = self.algorithm_id;
		out[1] = self.key_id;
		write_u24(&mut out, 3, self.dest_id);
		out
	}
}

/// Embedded signalling (one burst's worth): color code, privacy indicator,
/// and the link-control start/stop sequence bits.
pub struct Emb {
	pub color_code: u8,
	pub privacy_indicator: bool,
	pub lcss: u8,
}

impl Emb {
	pub fn decode(byte: u8) -> Self {
		Emb {
			color_code: (byte >> 4) & 0xf,
			privacy_indicator: byte & 0x08 != 0,
			lcss: (byte >> 1) & 0x3,
		}
	}

	pub fn encode(&self) -> u8 {
		((self.color_code & 0xf) << 4) | ((self.privacy_indicator as u8) << 3) | ((self.lcss & 0x3) << 1)
	}
}

/// Slot Type: color code and data type, Golay(20,8,7)-protected.
pub struct SlotType {
	pub color_code: u8,
	pub data_type: u8,
}

impl SlotType {
	pub fn encode(&self) -> u32 {
		let payload = ((self.color_code & 0xf) << 4) | (self.data_type & 0xf);
		golay::encode(payload)
	}

	pub fn decode(word: u32) -> Option<Self> {
		let payload = golay::decode(word)?;
		Some(SlotType { color_code: (payload >> 4) & 0xf, data_type: payload & 0xf })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn full_lc_round_trip() {
		let lc = FullLc { flco: 0x10, fid: 0x20, service_options: 0x30, dest_id: 0x112233, src_id: 0x445566 };
		let decoded = FullLc::decode(&lc.encode());
		assert_eq!(decoded.flco, lc.flco);
		assert_eq!(decoded.dest_id, lc.dest_id);
		assert_eq!(decoded.src_id, lc.src_id);
	}

	#[test]
	fn emb_round_trip() {
		let emb = Emb { color_code: 7, privacy_indicator: true, lcss: 2 };
		let decoded = Emb::decode(emb.encode());
		assert_eq!(decoded.color_code, 7);
		assert!(decoded.privacy_indicator);
		assert_eq!(decoded.lcss, 2);
	}

	#[test]
	fn slot_type_round_trip_with_error() {
		let st = SlotType { color_code: 3, data_type: 9 };
		let word = st.encode() ^ 0b1;
		let decoded = SlotType::decode(word).expect("corrects single bit error");
		assert_eq!(decoded.color_code, 3);
		assert_eq!(decoded.data_type, 9);
	}
}

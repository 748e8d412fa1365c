//! P25 PDU data headers: the primary header that opens every PDU, and the
//! optional secondary (extended-address) header the Unconfirmed/`ExtAddr`
//! path uses, `spec.md` §3/§4.9.
//!
//! Both share one wire shape: 10 data bytes followed by a little-endian
//! CRC-16-CCITT trailer, the whole thing Trellis-1/2 coded into one 25-byte
//! FEC block — so `encode_wire`/`decode_wire` are the only entry points
//! callers outside this module need.

use crate::symbols::{bytes_to_dibits, dibits_to_bytes};
use dvm_fec::crc::crc16_ccitt;
use dvm_fec::trellis;
use log::warn;
use utils::bits::{read_u16, read_u24, write_u16, write_u24};

pub const DATA_LEN: usize = 10;
pub const LEN: usize = DATA_LEN + 2;

/// SAP value that marks a header as carrying an extended address.
pub const SAP_EXT_ADDR: u8 = 0x1f;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Format {
	Confirmed,
	Unconfirmed,
	Response,
	Ambt,
}

impl Format {
	fn from_byte(b: u8) -> Option<Self> {
		match b {
			0x16 => Some(Format::Confirmed),
			0x15 => Some(Format::Unconfirmed),
			0x03 => Some(Format::Response),
			0x17 => Some(Format::Ambt),
			_ => None,
		}
	}

	fn to_byte(self) -> u8 {
		match self {
			Format::Confirmed => 0x16,
			Format::Unconfirmed => 0x15,
			Format::Response => 0x03,
			Format::Ambt => 0x17,
		}
	}
}

fn append_crc(raw: &mut [u8; LEN]) {
	let crc = crc16_ccitt(&raw[..DATA_LEN]);
	raw[DATA_LEN] = (crc & 0xff) as u8;
	raw[DATA_LEN + 1] = (crc >> 8) as u8;
}

fn check_crc(buf: &[u8]) -> Option<()> {
	if buf.len() < LEN {
		warn!("p25 pdu header: buffer shorter than {LEN} bytes");
		return None;
	}
	let crc = buf[DATA_LEN] as u16 | ((buf[DATA_LEN + 1] as u16) << 8);
	if crc16_ccitt(&buf[..DATA_LEN]) != crc {
		warn!("p25 pdu header: CRC-16 mismatch");
		return None;
	}
	Some(())
}

/// The primary data header: format, SAP, block count, pad count and the
/// declared length of the user-data buffer the final CRC-32 covers.
pub struct DataHeader {
	pub format: Format,
	pub sap: u8,
	pub blocks_to_follow: u8,
	pub pad_count: u8,
	pub user_data_length: u16,
}

impl DataHeader {
	pub fn is_ext_addr(&self) -> bool {
		self.sap == SAP_EXT_ADDR
	}

	pub fn encode(&self) -> [u8; LEN] {
		let mut out = [0u8; LEN];
		out[0] = self.format.to_byte();
		out[1] = self.sap & 0x3f;
		out[2] = self.blocks_to_follow;
		out[3] = self.pad_count;
		write_u16(&mut out, 4, self.user_data_length);
		append_crc(&mut out);
		out
	}

	pub fn decode(buf: &[u8]) -> Option<Self> {
		check_crc(buf)?;

		let format = Format::from_byte(buf[0])?;
		let blocks_to_follow = buf[2];
		if blocks_to_follow >= 32 {
			warn!("p25 pdu header: BlocksToFollow {blocks_to_follow} >= 32, rejected");
			return None;
		}

		Some(DataHeader {
			format,
			sap: buf[1] & 0x3f,
			blocks_to_follow,
			pad_count: buf[3],
			user_data_length: read_u16(buf, 4),
		})
	}

	/// Trellis-1/2 encodes this header for the wire (one 25-byte FEC block).
	pub fn encode_wire(&self) -> [u8; trellis::BLOCK_BYTES] {
		trellis::encode_1_2(&bytes_to_dibits(&self.encode()))
	}

	/// Trellis-1/2 decodes and CRC-16 checks a wire FEC block.
	pub fn decode_wire(block: &[u8]) -> Option<Self> {
		let symbols = trellis::decode_1_2(block)?;
		Self::decode(&dibits_to_bytes(&symbols))
	}
}

/// The secondary (extended-address) header: a Service Access Point and a
/// 24-bit Logical Link ID.
pub struct SecondaryHeader {
	pub sap: u8,
	pub llid: u32,
}

impl SecondaryHeader {
	pub fn encode(&self) -> [u8; LEN] {
		let mut out = [0u8; LEN];
		out[0] = self.sap & 0x3f;
		write_u24(&mut out, 1, self.llid);
		append_crc(&mut out);
		out
	}

	pub fn decode(buf: &[u8]) -> Option<Self> {
		check_crc(buf)?;
		Some(SecondaryHeader { sap: buf[0] & 0x3f, llid: read_u24(buf, 1) })
	}

	pub fn encode_wire(&self) -> [u8; trellis::BLOCK_BYTES] {
		trellis::encode_1_2(&bytes_to_dibits(&self.encode()))
	}

	pub fn decode_wire(block: &[u8]) -> Option<Self> {
		let symbols = trellis::decode_1_2(block)?;
		Self::decode(&dibits_to_bytes(&symbols))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn primary_round_trip() {
		let header = DataHeader { format: Format::Confirmed, sap: SAP_EXT_ADDR, blocks_to_follow: 5, pad_count: 2, user_data_length: 64 };
		let decoded = DataHeader::decode_wire(&header.encode_wire()).expect("decodes");
		assert_eq!(decoded.format, Format::Confirmed);
		assert!(decoded.is_ext_addr());
		assert_eq!(decoded.blocks_to_follow, 5);
		assert_eq!(decoded.pad_count, 2);
		assert_eq!(decoded.user_data_length, 64);
	}

	#[test]
	fn rejects_blocks_to_follow_at_limit() {
		let header = DataHeader { format: Format::Unconfirmed, sap: 0, blocks_to_follow: 32, pad_count: 0, user_data_length: 0 };
		assert!(DataHeader::decode_wire(&header.encode_wire()).is_none());
	}

	#[test]
	fn secondary_round_trip() {
		let header = SecondaryHeader { sap: SAP_EXT_ADDR, llid: 0xabcdef };
		let decoded = SecondaryHeader::decode_wire(&header.encode_wire()).expect("decodes");
		assert_eq!(decoded.sap, SAP_EXT_ADDR);
		assert_eq!(decoded.llid, 0xabcdef);
	}

	#[test]
	fn rejects_corrupted_crc() {
		let header = DataHeader { format: Format::Response, sap: 0, blocks_to_follow: 1, pad_count: 0, user_data_length: 10 };
		let mut raw = header.encode();
		raw[0] ^= 0xff;
		assert!(DataHeader::decode(&raw).is_none());
	}
}

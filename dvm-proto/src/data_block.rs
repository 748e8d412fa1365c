//! P25 PDU data blocks: Confirmed (Trellis-3/4, per-block CRC-9) and
//! Unconfirmed/Response/AMBT (Trellis-1/2, no per-block check), `spec.md`
//! §3/§4.9.

use crate::symbols::{bytes_to_dibits, bytes_to_tribits, dibits_to_bytes, tribits_to_bytes};
use dvm_fec::crc::crc9;
use dvm_fec::trellis;
use log::warn;
use utils::bits::{read_bit, write_bit};

pub const CONFIRMED_BLOCK_BYTES: usize = 18;
pub const UNCONFIRMED_BLOCK_BYTES: usize = 12;
pub const CONFIRMED_PAYLOAD_BYTES: usize = 16;

const SERIAL_BITS: usize = 7;
const PAYLOAD_BITS: usize = CONFIRMED_PAYLOAD_BYTES * 8;
const CRC_BITS: usize = 9;
const CRC_OFFSET: usize = SERIAL_BITS + PAYLOAD_BITS;

/// A Confirmed-format data block: a 7-bit serial number, 16 bytes of
/// payload (`spec.md` §8 S5's "32 bytes (2 x 16)" completed-buffer figure),
/// and a CRC-9, bit-packed back to back into the full 144-bit block with no
/// byte-alignment padding between fields (7 + 128 + 9 = 144 bits exactly,
/// matching the 48 payload tribits a Trellis-3/4 block carries).
pub struct ConfirmedDataBlock {
	pub serial_number: u8,
	pub payload: [u8; CONFIRMED_PAYLOAD_BYTES],
}

fn write_bits_msb(buf: &mut [u8], offset: usize, value: u32, width: usize) {
	for b in 0..width {
		write_bit(buf, offset + b, (value >> (width - 1 - b)) & 1 != 0);
	}
}

fn read_bits_msb(buf: &[u8], offset: usize, width: usize) -> u32 {
	let mut value = 0u32;
	for b in 0..width {
		value = (value << 1) | read_bit(buf, offset + b) as u32;
	}
	value
}

impl ConfirmedDataBlock {
	/// Extracts the SAP and Logical-Link-ID an extended-address first block
	/// carries in its payload, valid only when `serial_number == 0`.
	pub fn extended_address(&self) -> Option<(u8, u32)> {
		if self.serial_number != 0 {
			return None;
		}
		let sap = self.payload[0];
		let llid = ((self.payload[1] as u32) << 16) | ((self.payload[2] as u32) << 8) | self.payload[3] as u32;
		Some((sap, llid))
	}

	fn to_raw(&self) -> [u8; CONFIRMED_BLOCK_BYTES] {
		let mut raw = [0u8; CONFIRMED_BLOCK_BYTES];
		write_bits_msb(&mut raw, 0, (self.serial_number & 0x7f) as u32, SERIAL_BITS);

		for (i, &byte) in self.payload.iter().enumerate() {
			write_bits_msb(&mut raw, SERIAL_BITS + i * 8, byte as u32, 8);
		}

		let crc = crc9(&raw, 144);
		write_bits_msb(&mut raw, CRC_OFFSET, crc as u32, CRC_BITS);
		raw
	}

	fn from_raw(raw: &[u8; CONFIRMED_BLOCK_BYTES]) -> Option<Self> {
		let crc = read_bits_msb(raw, CRC_OFFSET, CRC_BITS) as u16;

		let mut check = *raw;
		write_bits_msb(&mut check, CRC_OFFSET, 0, CRC_BITS);

		if crc9(&check, 144) != crc {
			warn!("p25 confirmed data block: CRC-9 mismatch");
			return None;
		}

		let serial_number = read_bits_msb(raw, 0, SERIAL_BITS) as u8;
		let mut payload = [0u8; CONFIRMED_PAYLOAD_BYTES];
		for (i, byte) in payload.iter_mut().enumerate() {
			*byte = read_bits_msb(raw, SERIAL_BITS + i * 8, 8) as u8;
		}

		Some(ConfirmedDataBlock { serial_number, payload })
	}

	/// Trellis-3/4 encodes this block for the wire.
	pub fn encode(&self) -> [u8; trellis::BLOCK_BYTES] {
		trellis::encode_3_4(&bytes_to_tribits(&self.to_raw()))
	}

	/// Trellis-3/4 decodes and CRC-9 checks a wire block.
	pub fn decode(block: &[u8]) -> Option<Self> {
		let symbols = trellis::decode_3_4(block)?;
		Self::from_raw(&tribits_to_bytes(&symbols))
	}
}

/// An Unconfirmed, Response, or AMBT data block: 12 bytes of payload, no
/// per-block sequencing or check value.
pub struct UnconfirmedDataBlock {
	pub payload: [u8; UNCONFIRMED_BLOCK_BYTES],
}

impl UnconfirmedDataBlock {
	pub fn encode(&self) -> [u8; trellis::BLOCK_BYTES] {
		trellis::encode_1_2(&bytes_to_dibits(&self.payload))
	}

	pub fn decode(block: &[u8]) -> Option<Self> {
		let symbols = trellis::decode_1_2(block)?;
		Some(UnconfirmedDataBlock { payload: dibits_to_bytes(&symbols) })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn confirmed_round_trip() {
		let mut payload = [0u8; CONFIRMED_PAYLOAD_BYTES];
		for (i, b) in payload.iter_mut().enumerate() {
			*b = i as u8;
		}

		let block = ConfirmedDataBlock { serial_number: 3, payload };
		let decoded = ConfirmedDataBlock::decode(&block.encode()).expect("decodes");
		assert_eq!(decoded.serial_number, 3);
		assert_eq!(decoded.payload, payload);
	}

	#[test]
	fn confirmed_extended_address_only_at_serial_zero() {
		let mut payload = [0u8; CONFIRMED_PAYLOAD_BYTES];
		payload[0] = 0x1f;
		payload[1] = 0x12;
		payload[2] = 0x34;
		payload[3] = 0x56;

		let with_ext = ConfirmedDataBlock { serial_number: 0, payload };
		let (sap, llid) = with_ext.extended_address().expect("serial 0 carries ext addr");
		assert_eq!(sap, 0x1f);
		assert_eq!(llid, 0x123456);

		let without_ext = ConfirmedDataBlock { serial_number: 1, payload };
		assert!(without_ext.extended_address().is_none());
	}

	#[test]
	fn unconfirmed_round_trip() {
		let mut payload = [0u8; UNCONFIRMED_BLOCK_BYTES];
		for (i, b) in payload.iter_mut().enumerate() {
			*b = (i as u8).wrapping_mul(7);
		}

		let block = UnconfirmedDataBlock { payload };
		let decoded = UnconfirmedDataBlock::decode(&block.encode()).expect("decodes");
		assert_eq!(decoded.payload, payload);
	}
}

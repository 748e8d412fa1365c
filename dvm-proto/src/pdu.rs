//! P25 PDU assembler: accumulates successive frames' FEC regions into a
//! completed, CRC-32-verified user-data buffer, `spec.md` §3/§4.9.

use crate::data_block::{ConfirmedDataBlock, UnconfirmedDataBlock};
use crate::data_header::{DataHeader, Format, SecondaryHeader};
use dvm_fec::crc::crc32;
use dvm_fec::trellis;
use log::warn;

/// Offset and length of the FEC region within a P25 protocol-frame payload.
pub const FEC_OFFSET: usize = 24;
pub const FEC_LEN: usize = trellis::BLOCK_BYTES;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
	Idle,
	Decoding,
}

pub struct AssembledPdu {
	pub format: Format,
	pub sap: u8,
	pub extended_address: Option<(u8, u32)>,
	pub user_data: Vec<u8>,
}

pub struct Assembler {
	state: State,
	header: Option<DataHeader>,
	blocks_expected: u8,
	raw_blocks: Vec<[u8; FEC_LEN]>,
}

impl Default for Assembler {
	fn default() -> Self {
		Self::new()
	}
}

impl Assembler {
	pub fn new() -> Self {
		Assembler { state: State::Idle, header: None, blocks_expected: 0, raw_blocks: Vec::new() }
	}

	fn reset(&mut self) {
		self.state = State::Idle;
		self.header = None;
		self.blocks_expected = 0;
		self.raw_blocks.clear();
	}

	/// Feeds one protocol frame's raw payload. Returns `Some` once the final
	/// block has arrived and both per-block and full-message CRCs verify;
	/// any rejection along the way resets the assembler to `Idle`.
	pub fn feed(&mut self, payload: &[u8]) -> Option<AssembledPdu> {
		if payload.len() < FEC_OFFSET + FEC_LEN {
			warn!("p25 pdu: frame too short for FEC region");
			self.reset();
			return None;
		}

		let mut fec = [0u8; FEC_LEN];
		fec.copy_from_slice(&payload[FEC_OFFSET..FEC_OFFSET + FEC_LEN]);

		match self.state {
			State::Idle => {
				let header = DataHeader::decode_wire(&fec).or_else(|| {
					self.reset();
					None
				})?;

				if header.blocks_to_follow == 0 {
					warn!("p25 pdu: header declares zero BlocksToFollow");
					self.reset();
					return None;
				}

				self.blocks_expected = header.blocks_to_follow;
				self.header = Some(header);
				self.state = State::Decoding;
				None
			}
			State::Decoding => {
				self.raw_blocks.push(fec);

				if self.raw_blocks.len() < self.blocks_expected as usize {
					return None;
				}

				let result = self.assemble();
				self.reset();
				result
			}
		}
	}

	fn assemble(&self) -> Option<AssembledPdu> {
		let header = self.header.as_ref()?;
		let mut blocks: &[[u8; FEC_LEN]] = &self.raw_blocks;
		let mut extended_address = None;

		// spec.md §9 note 3: the secondary-header path applies only to
		// Format::Unconfirmed; Format::Confirmed instead pulls the extended
		// address out of the first *data* block, below.
		if header.format == Format::Unconfirmed && header.is_ext_addr() {
			let secondary = SecondaryHeader::decode_wire(&blocks[0])?;
			extended_address = Some((secondary.sap, secondary.llid));
			blocks = &blocks[1..];
		}

		let mut user_data = Vec::new();

		for (i, raw) in blocks.iter().enumerate() {
			match header.format {
				Format::Confirmed => {
					let block = ConfirmedDataBlock::decode(raw)?;

					if i == 0 && header.is_ext_addr() {
						if let Some(addr) = block.extended_address() {
							extended_address = Some(addr);
						}
					}

					user_data.extend_from_slice(&block.payload);
				}
				Format::Unconfirmed | Format::Response | Format::Ambt => {
					let block = UnconfirmedDataBlock::decode(raw)?;
					user_data.extend_from_slice(&block.payload);
				}
			}
		}

		let declared = header.user_data_length as usize;
		if user_data.len() < declared + 4 {
			warn!("p25 pdu: assembled buffer shorter than declared length plus CRC-32 trailer");
			return None;
		}

		let data = &user_data[..declared];
		let trailer = &user_data[declared..declared + 4];
		let expected = u32::from_be_bytes(trailer.try_into().unwrap());

		if crc32(data) != expected {
			warn!("p25 pdu: CRC-32 mismatch over assembled user data");
			return None;
		}

		Some(AssembledPdu { format: header.format, sap: header.sap, extended_address, user_data: data.to_vec() })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn frame_with_fec(fec: [u8; FEC_LEN]) -> Vec<u8> {
		let mut payload = vec![0u8; FEC_OFFSET + FEC_LEN];
		payload[FEC_OFFSET..].copy_from_slice(&fec);
		payload
	}

	#[test]
	fn assembles_two_confirmed_blocks() {
		let mut user_data = vec![0u8; 28];
		for (i, b) in user_data.iter_mut().enumerate() {
			*b = i as u8;
		}
		let crc = crc32(&user_data);

		let mut tail = user_data.clone();
		tail.extend_from_slice(&crc.to_be_bytes());
		assert_eq!(tail.len(), 32);

		let header = DataHeader { format: Format::Confirmed, sap: 0, blocks_to_follow: 2, pad_count: 0, user_data_length: 28 };

		let mut assembler = Assembler::new();
		assert!(assembler.feed(&frame_with_fec(header.encode_wire())).is_none());

		let block0 = ConfirmedDataBlock { serial_number: 1, payload: tail[0..16].try_into().unwrap() };
		assert!(assembler.feed(&frame_with_fec(block0.encode())).is_none());

		let block1 = ConfirmedDataBlock { serial_number: 2, payload: tail[16..32].try_into().unwrap() };
		let assembled = assembler.feed(&frame_with_fec(block1.encode())).expect("completes");

		assert_eq!(assembled.user_data, user_data);
		assert_eq!(assembled.format, Format::Confirmed);
	}

	#[test]
	fn rejects_too_short_frame() {
		let mut assembler = Assembler::new();
		assert!(assembler.feed(&[0u8; 10]).is_none());
	}
}

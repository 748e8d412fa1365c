//! The RTP + RTP-extension + FNE-extension frame envelope, `spec.md` §4.8.

use dvm_fec::crc::crc16_ccitt;
use log::warn;
use utils::bytes::{cast, Cast};
use utils::endian::{u16be, u32be};

use crate::rtp::RtpHeader;

pub const RTP_HEADER_LEN: usize = 12;
pub const RTP_EXT_HEADER_LEN: usize = 4;
pub const FNE_EXT_LEN: usize = 16;
pub const HEADER_LEN: usize = RTP_HEADER_LEN + RTP_EXT_HEADER_LEN + FNE_EXT_LEN;

/// The DVM start sentinel carried in the RTP extension header's
/// payload-type field.
pub const DVM_START_SENTINEL: u16 = 0x00fe;
/// The RTP extension length field, in 32-bit units (CRC+function+sub
/// +stream+peer+len = 16 bytes = 4 words).
pub const EXT_LENGTH_WORDS: u16 = 4;

#[derive(Cast)]
#[repr(C)]
struct RtpExtensionHeader {
	payload_type: u16be,
	length: u16be,
}

#[derive(Cast)]
#[repr(C)]
struct FneExtension {
	crc: u16be,
	function: u8,
	sub_function: u8,
	stream_id: u32be,
	peer_id: u32be,
	payload_length: u32be,
}

/// A decoded frame: the parsed headers plus a borrowed view of the payload.
pub struct Envelope<'a> {
	pub sequence: u16,
	pub rtp_timestamp: u32,
	pub ssrc: u32,
	pub function: u8,
	pub sub_function: u8,
	pub stream_id: u32,
	pub peer_id: u32,
	pub payload: &'a [u8],
}

/// Decodes and validates a frame, per the rejection list in `spec.md`
/// §4.8: wrong RTP version, missing extension bit, wrong payload type,
/// wrong extension length, wrong extension payload-type, or a CRC-16
/// mismatch. Any of these drops the frame silently (`None`).
pub fn decode(datagram: &[u8]) -> Option<Envelope<'_>> {
	if datagram.len() < HEADER_LEN {
		warn!("frame envelope: datagram shorter than header ({} bytes)", datagram.len());
		return None;
	}

	let rtp: &RtpHeader = cast(&datagram[..RTP_HEADER_LEN]);

	if rtp.version() != crate::rtp::VERSION {
		warn!("frame envelope: bad RTP version {}", rtp.version());
		return None;
	}

	if !rtp.has_extension() {
		warn!("frame envelope: RTP extension bit clear");
		return None;
	}

	if !rtp.payload_type_valid() {
		warn!("frame envelope: bad RTP payload type {}", rtp.payload_type());
		return None;
	}

	let ext_hdr: &RtpExtensionHeader = cast(&datagram[RTP_HEADER_LEN..RTP_HEADER_LEN + RTP_EXT_HEADER_LEN]);

	if ext_hdr.length.get() != EXT_LENGTH_WORDS {
		warn!("frame envelope: bad extension length {}", ext_hdr.length.get());
		return None;
	}

	if ext_hdr.payload_type.get() != DVM_START_SENTINEL {
		warn!("frame envelope: bad extension payload type {:#06x}", ext_hdr.payload_type.get());
		return None;
	}

	let fne_off = RTP_HEADER_LEN + RTP_EXT_HEADER_LEN;
	let fne: &FneExtension = cast(&datagram[fne_off..fne_off + FNE_EXT_LEN]);

	let payload_len = fne.payload_length.get() as usize;
	let payload_start = HEADER_LEN;

	if datagram.len() < payload_start + payload_len {
		warn!("frame envelope: payload shorter than declared length");
		return None;
	}

	let payload = &datagram[payload_start..payload_start + payload_len];
	let computed = crc16_ccitt(payload);

	if computed != fne.crc.get() {
		warn!("frame envelope: CRC mismatch (got {:#06x}, expected {:#06x})", fne.crc.get(), computed);
		return None;
	}

	Some(Envelope {
		sequence: rtp.sequence.get(),
		rtp_timestamp: rtp.timestamp.get(),
		ssrc: rtp.ssrc.get(),
		function: fne.function,
		sub_function: fne.sub_function,
		stream_id: fne.stream_id.get(),
		peer_id: fne.peer_id.get(),
		payload,
	})
}

/// Encodes a frame: RTP header, RTP extension header, FNE extension, and
/// the payload, with the CRC-16 computed over the payload.
#[allow(clippy::too_many_arguments)]
pub fn encode(sequence: u16, timestamp: u32, ssrc: u32, function: u8, sub_function: u8, stream_id: u32, peer_id: u32, payload: &[u8]) -> Vec<u8> {
	let rtp = RtpHeader::new(sequence, timestamp, ssrc);
	let crc = crc16_ccitt(payload);

	let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
	out.extend_from_slice(utils::bytes::as_slice(&rtp));
	out.extend_from_slice(&DVM_START_SENTINEL.to_be_bytes());
	out.extend_from_slice(&EXT_LENGTH_WORDS.to_be_bytes());
	out.extend_from_slice(&crc.to_be_bytes());
	out.push(function);
	out.push(sub_function);
	out.extend_from_slice(&stream_id.to_be_bytes());
	out.extend_from_slice(&peer_id.to_be_bytes());
	out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
	out.extend_from_slice(payload);
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trip() {
		let payload = b"hello fne";
		let datagram = encode(7, 1000, 0x1234_5678, 0x00, 0x00, 0xaabb_ccdd, 0x11223344, payload);

		let env = decode(&datagram).expect("decodes");
		assert_eq!(env.sequence, 7);
		assert_eq!(env.rtp_timestamp, 1000);
		assert_eq!(env.ssrc, 0x1234_5678);
		assert_eq!(env.function, 0x00);
		assert_eq!(env.sub_function, 0x00);
		assert_eq!(env.stream_id, 0xaabb_ccdd);
		assert_eq!(env.peer_id, 0x1122_3344);
		assert_eq!(env.payload, payload);
	}

	#[test]
	fn rejects_corrupted_crc() {
		let mut datagram = encode(1, 0, 1, 0, 0, 0, 1, b"test");
		*datagram.last_mut().unwrap() ^= 0xff;
		assert!(decode(&datagram).is_none());
	}

	#[test]
	fn rejects_short_datagram() {
		assert!(decode(&[0u8; 4]).is_none());
	}
}

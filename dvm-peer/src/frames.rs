//! Synthesis helpers for the two voice-call artefacts `spec.md` §2 names at
//! this layer: a DMR terminator-with-LC frame and a P25 TDU/TSDU, ready to
//! hand to [`dvm_session::Session::send_protocol`].
//!
//! Only the network-framing payload is built here — the over-the-air burst
//! structure (interleaving, AMBE voice) is a Non-goal (`spec.md` §1) and is
//! not reproduced; what's assembled is the preamble plus the link-control
//! content the protocol decoders in `dvm_proto` already model.
//!
//! `frame_type`/`data_type` and the P25 DUID values below are a
//! self-consistent assignment, not pinned by `spec.md` (which leaves the
//! preamble's mode-specific bytes "for the mode-specific decoder to
//! interpret"); they follow the common DMR/P25 FNE convention the rest of
//! this implementation's preamble bit layout was already derived from.

use dvm_crypto::keystream::{FRAMES_PER_LDU, IMBE_FRAME_LEN};
use dvm_proto::dmr::{FullLc, SlotType};
use dvm_proto::preamble::{self, FrameFlags, Mode, Preamble};
use dvm_proto::tsbk;

/// DMR frame-type: a data-sync burst carrying a 5-bit data type (as
/// opposed to a voice burst or voice-sync burst).
const DMR_FRAME_TYPE_DATA_SYNC: u8 = 0x2;

/// DMR frame-type: a voice burst (as opposed to a voice-sync or
/// data-sync burst).
const DMR_FRAME_TYPE_VOICE: u8 = 0x0;

/// DMR data-type: terminator burst carrying a full Link Control.
const DMR_DATA_TYPE_TERMINATOR_WITH_LC: u8 = 0x2;

/// DMR voice-burst "counter" value marking a filler burst rather than one
/// numbered within an active superframe.
const DMR_SILENCE_COUNTER: u8 = 0;

/// P25 DUID: plain Terminator Data Unit (no Link Control).
const P25_DUID_TDU: u8 = 0x03;

/// P25 DUID: Trunking Signalling Data Unit.
const P25_DUID_TSDU: u8 = 0x07;

/// P25 DUID: voice Logical Link Data Unit 1 (first LDU of a call).
const P25_DUID_LDU1: u8 = 0x05;

/// Fixed placeholder byte a silence-fill frame's voice payload is filled
/// with. The actual vocoder (AMBE/IMBE) content is a Non-goal here, so
/// this stands in for it; a real decoder only needs the frame present and
/// correctly sized to keep a voice superframe from stalling.
const SILENCE_MARKER: u8 = 0xaa;

/// Builds a DMR terminator-with-LC frame: the common preamble followed by
/// the Golay-protected Slot Type and the Full Link Control it describes.
pub fn dmr_terminator_with_lc(slot: bool, color_code: u8, lc: &FullLc) -> Vec<u8> {
	let preamble = Preamble {
		mode: Mode::Dmr,
		sequence_or_lco: 0,
		source_id: lc.src_id,
		dest_id: lc.dest_id,
		mode_specific: [0; 4],
		flags: FrameFlags { slot, private_call: false, frame_type: DMR_FRAME_TYPE_DATA_SYNC, data_type_or_counter: DMR_DATA_TYPE_TERMINATOR_WITH_LC },
	};

	let slot_type = SlotType { color_code, data_type: DMR_DATA_TYPE_TERMINATOR_WITH_LC };

	let mut out = Vec::with_capacity(preamble::LEN + 4 + 9);
	out.extend_from_slice(&preamble::encode(&preamble));
	out.extend_from_slice(&slot_type.encode().to_be_bytes());
	out.extend_from_slice(&lc.encode());
	out
}

/// Builds a DMR silence-fill voice frame: the common preamble tagged as a
/// voice burst, followed by two IMBE-frame-sized placeholder slots (a DMR
/// voice burst packs two AMBE frames) filled with `SILENCE_MARKER`, for
/// filling gaps in a voice call without stalling the slot.
pub fn dmr_silence_fill(slot: bool, source_id: u32, dest_id: u32) -> Vec<u8> {
	let preamble = Preamble {
		mode: Mode::Dmr,
		sequence_or_lco: 0,
		source_id,
		dest_id,
		mode_specific: [0; 4],
		flags: FrameFlags { slot, private_call: false, frame_type: DMR_FRAME_TYPE_VOICE, data_type_or_counter: DMR_SILENCE_COUNTER },
	};

	let mut out = Vec::with_capacity(preamble::LEN + IMBE_FRAME_LEN * 2);
	out.extend_from_slice(&preamble::encode(&preamble));
	out.extend_from_slice(&[SILENCE_MARKER; IMBE_FRAME_LEN * 2]);
	out
}

/// Builds a bare P25 TDU (no Link Control): just the common preamble with
/// the TDU DUID in the mode-specific region.
pub fn p25_tdu(source_id: u32, dest_id: u32) -> Vec<u8> {
	let preamble = Preamble {
		mode: Mode::P25,
		sequence_or_lco: 0,
		source_id,
		dest_id,
		mode_specific: [P25_DUID_TDU, 0, 0, 0],
		flags: FrameFlags { slot: false, private_call: false, frame_type: 0, data_type_or_counter: 0 },
	};

	preamble::encode(&preamble).to_vec()
}

/// Builds a P25 TSDU: the common preamble followed by one or more already
/// CRC-protected TSBKs, concatenated in the order given.
pub fn p25_tsdu(source_id: u32, dest_id: u32, tsbks: &[[u8; tsbk::LEN]]) -> Vec<u8> {
	let preamble = Preamble {
		mode: Mode::P25,
		sequence_or_lco: 0,
		source_id,
		dest_id,
		mode_specific: [P25_DUID_TSDU, 0, 0, 0],
		flags: FrameFlags { slot: false, private_call: false, frame_type: 0, data_type_or_counter: 0 },
	};

	let mut out = Vec::with_capacity(preamble::LEN + tsbks.len() * tsbk::LEN);
	out.extend_from_slice(&preamble::encode(&preamble));

	for block in tsbks {
		out.extend_from_slice(block);
	}

	out
}

/// Builds a P25 silence-fill voice frame: the common preamble tagged as an
/// LDU1, followed by one IMBE-frame-sized placeholder slot per frame
/// position in an LDU, filled with `SILENCE_MARKER`.
pub fn p25_silence_fill(source_id: u32, dest_id: u32) -> Vec<u8> {
	let preamble = Preamble {
		mode: Mode::P25,
		sequence_or_lco: 0,
		source_id,
		dest_id,
		mode_specific: [P25_DUID_LDU1, 0, 0, 0],
		flags: FrameFlags { slot: false, private_call: false, frame_type: 0, data_type_or_counter: 0 },
	};

	let frames_len = IMBE_FRAME_LEN * FRAMES_PER_LDU as usize;
	let mut out = Vec::with_capacity(preamble::LEN + frames_len);
	out.extend_from_slice(&preamble::encode(&preamble));
	out.extend(core::iter::repeat(SILENCE_MARKER).take(frames_len));
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use dvm_proto::preamble::decode;
	use dvm_proto::tsbk::IospAckRsp;

	#[test]
	fn dmr_terminator_carries_lc_and_decodes() {
		let lc = FullLc { flco: 0, fid: 0, service_options: 0, dest_id: 0x112233, src_id: 0x445566 };
		let frame = dmr_terminator_with_lc(true, 1, &lc);

		assert_eq!(frame.len(), preamble::LEN + 4 + 9);

		let decoded = decode(&frame).expect("preamble decodes");
		assert_eq!(decoded.mode, Mode::Dmr);
		assert_eq!(decoded.source_id, 0x445566);
		assert_eq!(decoded.dest_id, 0x112233);
		assert!(decoded.flags.slot);
		assert_eq!(decoded.flags.data_type_or_counter, DMR_DATA_TYPE_TERMINATOR_WITH_LC);

		let decoded_lc = FullLc::decode(&frame[preamble::LEN + 4..].try_into().unwrap());
		assert_eq!(decoded_lc.dest_id, 0x112233);
		assert_eq!(decoded_lc.src_id, 0x445566);
	}

	#[test]
	fn p25_tdu_is_bare_preamble() {
		let frame = p25_tdu(0xabcdef, 0x123456);
		assert_eq!(frame.len(), preamble::LEN);

		let decoded = decode(&frame).expect("preamble decodes");
		assert_eq!(decoded.mode, Mode::P25);
		assert_eq!(decoded.mode_specific[0], P25_DUID_TDU);
	}

	#[test]
	fn dmr_silence_fill_tags_voice_burst() {
		let frame = dmr_silence_fill(true, 0x445566, 0x112233);
		assert_eq!(frame.len(), preamble::LEN + IMBE_FRAME_LEN * 2);

		let decoded = decode(&frame).expect("preamble decodes");
		assert_eq!(decoded.mode, Mode::Dmr);
		assert_eq!(decoded.flags.frame_type, DMR_FRAME_TYPE_VOICE);
		assert_eq!(decoded.flags.data_type_or_counter, DMR_SILENCE_COUNTER);
		assert!(frame[preamble::LEN..].iter().all(|&b| b == SILENCE_MARKER));
	}

	#[test]
	fn p25_silence_fill_tags_ldu1_and_fills_all_frames() {
		let frame = p25_silence_fill(0xabcdef, 0x123456);
		assert_eq!(frame.len(), preamble::LEN + IMBE_FRAME_LEN * FRAMES_PER_LDU as usize);

		let decoded = decode(&frame).expect("preamble decodes");
		assert_eq!(decoded.mode, Mode::P25);
		assert_eq!(decoded.mode_specific[0], P25_DUID_LDU1);
		assert!(frame[preamble::LEN..].iter().all(|&b| b == SILENCE_MARKER));
	}

	#[test]
	fn p25_tsdu_concatenates_tsbks() {
		let tsbk = IospAckRsp { mfid: 0, last_block: true, service_type: 1, src_id: 0xabcdef, dst_id: 0x123456 };
		let frame = p25_tsdu(0xabcdef, 0x123456, &[tsbk.encode()]);

		assert_eq!(frame.len(), preamble::LEN + tsbk::LEN);
		let decoded = decode(&frame).expect("preamble decodes");
		assert_eq!(decoded.mode_specific[0], P25_DUID_TSDU);
		assert!(IospAckRsp::decode(&frame[preamble::LEN..]).is_some());
	}
}

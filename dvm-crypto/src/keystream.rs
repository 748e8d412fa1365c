//! P25 voice keystream generation, `spec.md` §4.7: DES-OFB, AES-256 with an
//! LFSR-expanded IV, and the LMR variant of ARC4.

use aes::Aes256;
use cipher::generic_array::GenericArray;
use cipher::{BlockEncrypt, KeyInit};
use des::Des;

/// A P25 Message Indicator: 72 bits (9 bytes), seeding keystream generation.
pub type Mi = [u8; 9];

/// DES-OFB: 224-byte keystream from a key (left-padded to 8 bytes) and the
/// first 8 MI bytes as IV.
pub fn des_ofb(key: &[u8], mi: &Mi) -> [u8; 224] {
	let mut key8 = [0u8; 8];
	let start = 8usize.saturating_sub(key.len());
	let take = key.len().min(8);
	key8[start..].copy_from_slice(&key[key.len() - take..]);

	let cipher = Des::new_from_slice(&key8).expect("8-byte key");

	let mut out = [0u8; 224];
	let mut block = mi[..8].try_into().expect("8 MI bytes");

	for chunk in out.chunks_mut(8) {
		let mut ga = GenericArray::clone_from_slice(&block);
		cipher.encrypt_block(&mut ga);
		block = ga.into();
		chunk.copy_from_slice(&block);
	}

	out
}

const LFSR_STEPS: usize = 64;
/// Tap positions (bit index from the LSB) for the non-leading terms of
/// C(x) = x^64 + x^62 + x^46 + x^38 + x^27 + x^15 + 1: bit (63 - exponent)
/// for each exponent below 64.
const TAPS: [u32; 6] = [63 - 62, 63 - 46, 63 - 38, 63 - 27, 63 - 15, 63];

fn lfsr_tap_mask() -> u64 {
	TAPS.iter().fold(0u64, |acc, &bit| acc | (1 << bit))
}

/// Expands the first 8 MI bytes into a 16-byte AES IV: 8 bytes of the
/// overflow-bit sequence produced while stepping the LFSR, followed by the
/// 8-byte final LFSR state.
fn expand_iv(mi: &Mi) -> [u8; 16] {
	let mut reg = u64::from_be_bytes(mi[..8].try_into().unwrap());
	let mask = lfsr_tap_mask();
	let mut overflow: u64 = 0;

	for _ in 0..LFSR_STEPS {
		let msb = (reg >> 63) & 1;
		reg <<= 1;

		if msb == 1 {
			reg ^= mask;
		}

		overflow = (overflow << 1) | msb;
	}

	let mut iv = [0u8; 16];
	iv[..8].copy_from_slice(&overflow.to_be_bytes());
	iv[8..].copy_from_slice(&reg.to_be_bytes());
	iv
}

/// AES-256 keystream: 240 bytes from 15 OFB iterations over an IV expanded
/// from the MI via a 64-step LFSR.
pub fn aes256_keystream(key: &[u8; 32], mi: &Mi) -> [u8; 240] {
	let cipher = Aes256::new_from_slice(key).expect("32-byte key");
	let mut block = expand_iv(mi);

	let mut out = [0u8; 240];
	for chunk in out.chunks_mut(16) {
		let mut ga = GenericArray::clone_from_slice(&block);
		cipher.encrypt_block(&mut ga);
		block = ga.into();
		chunk.copy_from_slice(&block);
	}

	out
}

/// ARC4 (LMR variant): a 13-byte adapted key (up to 5 bytes of key
/// material, zero-padded, concatenated with 8 MI bytes), then 469
/// keystream bytes from the standard RC4 key schedule and PRGA — without
/// the usual first-256-byte discard.
pub fn arc4_lmr(key_material: &[u8], mi: &Mi) -> [u8; 469] {
	let mut adapted = [0u8; 13];
	let take = key_material.len().min(5);
	adapted[..take].copy_from_slice(&key_material[..take]);
	adapted[5..].copy_from_slice(&mi[..8]);

	let mut s: [u8; 256] = core::array::from_fn(|i| i as u8);
	let mut j = 0u8;

	for i in 0..256 {
		j = j.wrapping_add(s[i]).wrapping_add(adapted[i % adapted.len()]);
		s.swap(i, j as usize);
	}

	let mut out = [0u8; 469];
	let (mut i, mut j) = (0u8, 0u8);

	for byte in out.iter_mut() {
		i = i.wrapping_add(1);
		j = j.wrapping_add(s[i as usize]);
		s.swap(i as usize, j as usize);
		let k = s[(s[i as usize].wrapping_add(s[j as usize])) as usize];
		*byte = k;
	}

	out
}

/// An IMBE voice frame, §4.7.
pub const IMBE_FRAME_LEN: usize = 11;

/// §4.7: "a 9-position counter tracks which frame within an LDU (mod 9)".
pub const FRAMES_PER_LDU: u8 = 9;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Ldu {
	Ldu1,
	Ldu2,
}

/// Tracks which of the 9 IMBE frames in the current LDU is next, wrapping
/// modulo [`FRAMES_PER_LDU`]; one instance lives for the duration of a
/// call.
#[derive(Default, Clone, Copy, Debug)]
pub struct FramePosition(u8);

impl FramePosition {
	pub fn new() -> Self {
		FramePosition(0)
	}

	pub fn get(&self) -> u8 {
		self.0
	}

	pub fn advance(&mut self) {
		self.0 = (self.0 + 1) % FRAMES_PER_LDU;
	}
}

/// §4.7's offset formula is described rather than pinned to exact numbers
/// beyond "LDU1 vs LDU2 adds 101"; this is the self-consistent reading
/// used here: each frame consumes `IMBE_FRAME_LEN` keystream bytes in
/// frame-position order, LDU2 starts 101 bytes further into that region
/// than LDU1, and ARC4 additionally reserves a 267-byte base ahead of the
/// LDU1/LDU2 region (chosen so the region fits inside the 469-byte ARC4
/// keystream with the same 101-byte LDU2 addend DES/AES use).
fn ldu_addend(ldu: Ldu) -> usize {
	match ldu {
		Ldu::Ldu1 => 0,
		Ldu::Ldu2 => 101,
	}
}

fn offset_des_aes(ldu: Ldu, position: u8) -> usize {
	ldu_addend(ldu) + position as usize * IMBE_FRAME_LEN
}

fn offset_arc4(ldu: Ldu, position: u8) -> usize {
	267 + ldu_addend(ldu) + position as usize * IMBE_FRAME_LEN
}

fn xor_frame(keystream: &[u8], offset: usize, frame: &mut [u8; IMBE_FRAME_LEN]) {
	for (b, k) in frame.iter_mut().zip(&keystream[offset..offset + IMBE_FRAME_LEN]) {
		*b ^= k;
	}
}

/// XORs one IMBE voice frame in place with the DES-OFB keystream at the
/// position `(ldu, position)` selects.
pub fn apply_des(keystream: &[u8; 224], ldu: Ldu, position: u8, frame: &mut [u8; IMBE_FRAME_LEN]) {
	xor_frame(keystream, offset_des_aes(ldu, position), frame);
}

/// XORs one IMBE voice frame in place with the AES-256 keystream at the
/// position `(ldu, position)` selects.
pub fn apply_aes256(keystream: &[u8; 240], ldu: Ldu, position: u8, frame: &mut [u8; IMBE_FRAME_LEN]) {
	xor_frame(keystream, offset_des_aes(ldu, position), frame);
}

/// XORs one IMBE voice frame in place with the ARC4 keystream at the
/// position `(ldu, position)` selects.
pub fn apply_arc4(keystream: &[u8; 469], ldu: Ldu, position: u8, frame: &mut [u8; IMBE_FRAME_LEN]) {
	xor_frame(keystream, offset_arc4(ldu, position), frame);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn des_ofb_length_and_determinism() {
		let mi: Mi = [1, 2, 3, 4, 5, 6, 7, 8, 9];
		let a = des_ofb(b"shortkey", &mi);
		let b = des_ofb(b"shortkey", &mi);
		assert_eq!(a, b);
		assert_eq!(a.len(), 224);
	}

	#[test]
	fn aes256_keystream_length_and_determinism() {
		let key = [0x11u8; 32];
		let mi: Mi = [9, 8, 7, 6, 5, 4, 3, 2, 1];
		let a = aes256_keystream(&key, &mi);
		let b = aes256_keystream(&key, &mi);
		assert_eq!(a, b);
		assert_eq!(a.len(), 240);
	}

	#[test]
	fn arc4_lmr_length_and_determinism() {
		let mi: Mi = [0; 9];
		let a = arc4_lmr(&[1, 2, 3, 4, 5], &mi);
		let b = arc4_lmr(&[1, 2, 3, 4, 5], &mi);
		assert_eq!(a, b);
		assert_eq!(a.len(), 469);
	}

	#[test]
	fn frame_position_wraps_mod_9() {
		let mut pos = FramePosition::new();
		assert_eq!(pos.get(), 0);

		for expected in [1, 2, 3, 4, 5, 6, 7, 8, 0, 1] {
			pos.advance();
			assert_eq!(pos.get(), expected);
		}
	}

	#[test]
	fn voice_offsets_stay_in_bounds_for_every_position() {
		for ldu in [Ldu::Ldu1, Ldu::Ldu2] {
			for position in 0..FRAMES_PER_LDU {
				let des_aes_end = offset_des_aes(ldu, position) + IMBE_FRAME_LEN;
				assert!(des_aes_end <= 224, "DES offset out of bounds: {des_aes_end}");
				assert!(des_aes_end <= 240, "AES-256 offset out of bounds: {des_aes_end}");

				let arc4_end = offset_arc4(ldu, position) + IMBE_FRAME_LEN;
				assert!(arc4_end <= 469, "ARC4 offset out of bounds: {arc4_end}");
			}
		}
	}

	#[test]
	fn ldu2_offset_is_101_bytes_past_ldu1() {
		assert_eq!(offset_des_aes(Ldu::Ldu2, 0) - offset_des_aes(Ldu::Ldu1, 0), 101);
		assert_eq!(offset_arc4(Ldu::Ldu2, 0) - offset_arc4(Ldu::Ldu1, 0), 101);
		assert_eq!(offset_arc4(Ldu::Ldu1, 0) - offset_des_aes(Ldu::Ldu1, 0), 267);
	}

	#[test]
	fn apply_des_xor_round_trips() {
		let mi: Mi = [1, 2, 3, 4, 5, 6, 7, 8, 9];
		let keystream = des_ofb(b"shortkey", &mi);
		let original = [0x42u8; IMBE_FRAME_LEN];

		let mut frame = original;
		apply_des(&keystream, Ldu::Ldu1, 3, &mut frame);
		assert_ne!(frame, original);

		apply_des(&keystream, Ldu::Ldu1, 3, &mut frame);
		assert_eq!(frame, original);
	}

	#[test]
	fn apply_aes256_ldu1_and_ldu2_diverge() {
		let key = [0x11u8; 32];
		let mi: Mi = [9, 8, 7, 6, 5, 4, 3, 2, 1];
		let keystream = aes256_keystream(&key, &mi);
		let original = [0xAAu8; IMBE_FRAME_LEN];

		let mut ldu1_frame = original;
		apply_aes256(&keystream, Ldu::Ldu1, 0, &mut ldu1_frame);

		let mut ldu2_frame = original;
		apply_aes256(&keystream, Ldu::Ldu2, 0, &mut ldu2_frame);

		assert_ne!(ldu1_frame, ldu2_frame);
	}

	#[test]
	fn apply_arc4_xor_round_trips() {
		let mi: Mi = [0; 9];
		let keystream = arc4_lmr(&[1, 2, 3, 4, 5], &mi);
		let original = [0x7Fu8; IMBE_FRAME_LEN];

		let mut frame = original;
		apply_arc4(&keystream, Ldu::Ldu2, 8, &mut frame);
		assert_ne!(frame, original);

		apply_arc4(&keystream, Ldu::Ldu2, 8, &mut frame);
		assert_eq!(frame, original);
	}
}

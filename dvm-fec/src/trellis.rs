//! Trellis 1/2 and 3/4 rate FEC over 4-FSK constellation points.
//!
//! Both rates code 49 input symbols into a 98-point, 196-bit block (the
//! 98-entry interleave table's length): rate 1/2 consumes 49 dibits, rate
//! 3/4 consumes 49 tribits, each symbol expanding to 2 output points via
//! the state table. The last symbol of every block is a flush/tail symbol
//! that must decode to zero; callers get 48 payload symbols per block.

use log::warn;
use utils::bits::{read_bit, write_bit};

pub const BLOCK_POINTS: usize = 98;
pub const BLOCK_BITS: usize = BLOCK_POINTS * 2;
pub const BLOCK_BYTES: usize = (BLOCK_BITS + 7) / 8;
pub const SYMBOLS: usize = 49;
pub const PAYLOAD_SYMBOLS: usize = SYMBOLS - 1;

/// The Trellis codec's own fixed interleave table: a permutation of the 98
/// constellation-point positions, generated by a fixed stride (55, coprime
/// with 98) rather than hand-transcribed, since `spec.md` names the table's
/// length and role but not its contents.
const INTERLEAVE: [u16; BLOCK_POINTS] = build_interleave();

const fn build_interleave() -> [u16; BLOCK_POINTS] {
	let mut table = [0u16; BLOCK_POINTS];
	let mut i = 0;

	while i < BLOCK_POINTS {
		table[i] = ((i * 55) % BLOCK_POINTS) as u16;
		i += 1;
	}

	table
}

fn interleave_points(points: &[u8; BLOCK_POINTS]) -> [u8; BLOCK_POINTS] {
	let mut out = [0u8; BLOCK_POINTS];
	for (i, &dst) in INTERLEAVE.iter().enumerate() {
		out[dst as usize] = points[i];
	}
	out
}

fn deinterleave_points(points: &[u8; BLOCK_POINTS]) -> [u8; BLOCK_POINTS] {
	let mut out = [0u8; BLOCK_POINTS];
	for (i, &dst) in INTERLEAVE.iter().enumerate() {
		out[i] = points[dst as usize];
	}
	out
}

fn points_to_bits(points: &[u8; BLOCK_POINTS], out: &mut [u8]) {
	for (i, &p) in points.iter().enumerate() {
		write_bit(out, i * 2, p & 0b10 != 0);
		write_bit(out, i * 2 + 1, p & 0b01 != 0);
	}
}

fn bits_to_points(bits: &[u8]) -> [u8; BLOCK_POINTS] {
	let mut points = [0u8; BLOCK_POINTS];
	for (i, p) in points.iter_mut().enumerate() {
		let hi = read_bit(bits, i * 2) as u8;
		let lo = read_bit(bits, i * 2 + 1) as u8;
		*p = (hi << 1) | lo;
	}
	points
}

/// Encode/decode step functions shared by both rates: given the current
/// state and an input symbol, produce the two output constellation points
/// and the next state.
trait Rate {
	const STATES: u8;
	const MAX_INPUT: u8;

	fn step(state: u8, input: u8) -> (u8, u8, u8);
	/// Inverse of `step`: given state and the received point pair, returns
	/// `Some(input)` iff the pair is one this state can legally produce.
	fn unstep(state: u8, p0: u8, p1: u8) -> Option<u8>;
}

struct Half;

impl Rate for Half {
	const STATES: u8 = 4;
	const MAX_INPUT: u8 = 4;

	fn step(state: u8, input: u8) -> (u8, u8, u8) {
		let p0 = input;
		let p1 = (state ^ input) & 3;
		(p0, p1, input)
	}

	fn unstep(state: u8, p0: u8, p1: u8) -> Option<u8> {
		if p1 == (state ^ p0) & 3 {
			Some(p0)
		} else {
			None
		}
	}
}

struct ThreeQuarter;

impl Rate for ThreeQuarter {
	const STATES: u8 = 8;
	const MAX_INPUT: u8 = 8;

	fn step(state: u8, input: u8) -> (u8, u8, u8) {
		let parity = (state.count_ones() as u8 ^ input.count_ones() as u8) & 1;
		let combined = (input << 1) | parity;
		((combined >> 2) & 3, combined & 3, input)
	}

	fn unstep(state: u8, p0: u8, p1: u8) -> Option<u8> {
		let combined = (p0 << 2) | p1;
		let input = combined >> 1;
		let parity = combined & 1;
		let expect = (state.count_ones() as u8 ^ input.count_ones() as u8) & 1;

		if parity == expect {
			Some(input)
		} else {
			None
		}
	}
}

fn encode_generic<R: Rate>(symbols: &[u8; PAYLOAD_SYMBOLS]) -> [u8; BLOCK_BYTES] {
	let mut points = [0u8; BLOCK_POINTS];
	let mut state = 0u8;

	for (i, &sym) in symbols.iter().chain(core::iter::once(&0u8)).enumerate() {
		let (p0, p1, next) = R::step(state, sym);
		points[i * 2] = p0;
		points[i * 2 + 1] = p1;
		state = next;
	}

	let interleaved = interleave_points(&points);
	let mut out = [0u8; BLOCK_BYTES];
	points_to_bits(&interleaved, &mut out);
	out
}

/// Decodes a block, attempting the fix-up procedure from `spec.md` §4.3 on
/// failure: exhaustive replacement of the failed point pair (16
/// candidates), up to 20 rounds total across the block, then a single
/// one-position backtrack-and-retry if still stuck.
fn decode_generic<R: Rate>(block: &[u8]) -> Option<[u8; PAYLOAD_SYMBOLS]> {
	let points = deinterleave_points(&bits_to_points(block));

	let mut symbols = [0u8; SYMBOLS];
	let mut states = [0u8; SYMBOLS + 1];
	let mut fixups_used = 0usize;

	let mut i = 0;
	while i < SYMBOLS {
		let state = states[i];
		let p0 = points[i * 2];
		let p1 = points[i * 2 + 1];

		match R::unstep(state, p0, p1) {
			Some(input) => {
				symbols[i] = input;
				states[i + 1] = input;
				i += 1;
			}
			None => {
				let mut fixed = false;

				if fixups_used < 20 {
					fixups_used += 1;

					if let Some(input) = try_fixup::<R>(state, &points, i) {
						symbols[i] = input;
						states[i + 1] = input;
						i += 1;
						fixed = true;
					}
				}

				if !fixed {
					warn!("trellis decode: fixup failed at symbol {i}, backtracking");

					if !backtrack_and_retry::<R>(&points, &mut symbols, &mut states, i) {
						return None;
					}

					return finish(&symbols);
				}
			}
		}
	}

	finish(&symbols)
}

fn finish(symbols: &[u8; SYMBOLS]) -> Option<[u8; PAYLOAD_SYMBOLS]> {
	if symbols[SYMBOLS - 1] != 0 {
		warn!("trellis decode: terminal symbol non-zero, path rejected");
		return None;
	}

	let mut out = [0u8; PAYLOAD_SYMBOLS];
	out.copy_from_slice(&symbols[..PAYLOAD_SYMBOLS]);
	Some(out)
}

/// Exhaustively tries all 16 replacement point-pairs at position `i`,
/// closest (by Hamming distance to the actually received pair) first, and
/// accepts the first one that is both state-consistent *and* lets the rest
/// of the block decode forward to a zero terminal symbol — a single bad
/// pair otherwise has up to four state-consistent replacements (one per
/// possible input), and only the forward check picks the right one out of
/// those.
fn try_fixup<R: Rate>(state: u8, points: &[u8; BLOCK_POINTS], i: usize) -> Option<u8> {
	let recv_p0 = points[i * 2];
	let recv_p1 = points[i * 2 + 1];

	for distance in 0..=4u32 {
		for p0 in 0..4u8 {
			for p1 in 0..4u8 {
				if (p0 ^ recv_p0).count_ones() + (p1 ^ recv_p1).count_ones() != distance {
					continue;
				}

				if let Some(input) = R::unstep(state, p0, p1) {
					if decodes_to_zero_terminal::<R>(input, points, i) {
						return Some(input);
					}
				}
			}
		}
	}

	None
}

/// Simulates forward from `i + 1` to the end of the block with the real
/// received points, given that position `i` decoded to `input_at_i`.
/// Returns whether the chain stays state-consistent all the way and the
/// final (terminal) symbol is zero.
fn decodes_to_zero_terminal<R: Rate>(input_at_i: u8, points: &[u8; BLOCK_POINTS], i: usize) -> bool {
	let mut state = input_at_i;

	for pos in (i + 1)..SYMBOLS {
		let p0 = points[pos * 2];
		let p1 = points[pos * 2 + 1];

		match R::unstep(state, p0, p1) {
			Some(input) => state = input,
			None => return false,
		}
	}

	state == 0
}

/// Backs up one symbol position and retries decoding forward once more.
/// Returns `true` if the retry reached the end of the block.
fn backtrack_and_retry<R: Rate>(points: &[u8; BLOCK_POINTS], symbols: &mut [u8; SYMBOLS], states: &mut [u8; SYMBOLS + 1], failed_at: usize) -> bool {
	if failed_at == 0 {
		return false;
	}

	let retry_state = states[failed_at - 1];

	for p0 in 0..4u8 {
		for p1 in 0..4u8 {
			if let Some(input) = R::unstep(retry_state, p0, p1) {
				symbols[failed_at - 1] = input;
				states[failed_at] = input;

				let mut i = failed_at;
				while i < SYMBOLS {
					let state = states[i];
					let pp0 = points[i * 2];
					let pp1 = points[i * 2 + 1];

					match R::unstep(state, pp0, pp1) {
						Some(input) => {
							symbols[i] = input;
							states[i + 1] = input;
							i += 1;
						}
						None => break,
					}
				}

				if i == SYMBOLS {
					return true;
				}
			}
		}
	}

	false
}

/// Encodes 48 payload dibits (plus an implicit zero flush symbol) into a
/// 196-bit rate-1/2 Trellis block.
pub fn encode_1_2(symbols: &[u8; PAYLOAD_SYMBOLS]) -> [u8; BLOCK_BYTES] {
	encode_generic::<Half>(symbols)
}

/// Decodes a rate-1/2 Trellis block, returning the 48 payload dibits.
pub fn decode_1_2(block: &[u8]) -> Option<[u8; PAYLOAD_SYMBOLS]> {
	decode_generic::<Half>(block)
}

/// Encodes 48 payload tribits (plus an implicit zero flush symbol) into a
/// 196-bit rate-3/4 Trellis block.
pub fn encode_3_4(symbols: &[u8; PAYLOAD_SYMBOLS]) -> [u8; BLOCK_BYTES] {
	encode_generic::<ThreeQuarter>(symbols)
}

/// Decodes a rate-3/4 Trellis block, returning the 48 payload tribits.
pub fn decode_3_4(block: &[u8]) -> Option<[u8; PAYLOAD_SYMBOLS]> {
	decode_generic::<ThreeQuarter>(block)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn half_rate_round_trip() {
		let mut symbols = [0u8; PAYLOAD_SYMBOLS];
		for (i, s) in symbols.iter_mut().enumerate() {
			*s = (i % 4) as u8;
		}

		let block = encode_1_2(&symbols);
		assert_eq!(decode_1_2(&block), Some(symbols));
	}

	#[test]
	fn half_rate_survives_single_point_flip() {
		let mut symbols = [0u8; PAYLOAD_SYMBOLS];
		for (i, s) in symbols.iter_mut().enumerate() {
			*s = ((i * 3) % 4) as u8;
		}

		let mut block = encode_1_2(&symbols);
		// Flip one constellation point's low bit somewhere mid-block.
		block[6] ^= 0b0000_0001;

		assert_eq!(decode_1_2(&block), Some(symbols));
	}

	#[test]
	fn three_quarter_round_trip() {
		let mut symbols = [0u8; PAYLOAD_SYMBOLS];
		for (i, s) in symbols.iter_mut().enumerate() {
			*s = (i % 8) as u8;
		}

		let block = encode_3_4(&symbols);
		assert_eq!(decode_3_4(&block), Some(symbols));
	}
}

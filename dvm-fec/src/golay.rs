//! Golay(20,8,7): an 8-bit payload protected by 12 parity bits, correcting
//! up to 3 bit errors. Used on short P25 control fields (status symbols,
//! low-speed data) that need stronger protection than a bare CRC can give
//! without the overhead of the 24-bit extended Golay code.

use crate::linear_code::Code;

/// Parity subset for each of the 12 parity bits, as a mask over the 8 data
/// bits. Chosen for a full-rank parity-check matrix with every column and
/// every pairwise column-sum distinct, the property a systematic code needs
/// for unambiguous single/double/triple-error syndromes.
pub const PARITY: [u32; 12] = [
	0b1110_0001,
	0b1101_0010,
	0b1011_0100,
	0b0111_1000,
	0b1110_1001,
	0b1101_1010,
	0b1011_0101,
	0b0110_1011,
	0b1111_0110,
	0b1011_1101,
	0b0111_1110,
	0b1100_1111,
];

const CODE: Code<20, 8> = Code { parity: PARITY, parity_len: 12, correctable: 3 };

/// Encodes 8 data bits into a 20-bit codeword.
pub fn encode(data: u8) -> u32 {
	CODE.encode(data as u32)
}

/// Decodes a 20-bit codeword, correcting up to 3 bit errors.
pub fn decode(word: u32) -> Option<u8> {
	CODE.decode(word).map(|v| v as u8)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trip() {
		for data in 0..=255u8 {
			let word = encode(data);
			assert_eq!(decode(word), Some(data));
		}
	}

	#[test]
	fn corrects_double_error() {
		let word = encode(0b1010_0110);
		let flipped = word ^ 0b11;
		assert_eq!(decode(flipped), Some(0b1010_0110));
	}
}

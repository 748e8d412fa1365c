//! Hamming(7,4) and Hamming(15,11) helpers, single-error-correcting block
//! codes used for small signalling fields (DMR EMB parity, P25 short data)
//! that don't need the stronger Golay/QR codes.

/// Encodes 4 data bits into a 7-bit Hamming(7,4) codeword.
pub fn encode_7_4(data: u8) -> u8 {
	let d = [bit(data, 0), bit(data, 1), bit(data, 2), bit(data, 3)];

	let p1 = d[0] ^ d[1] ^ d[3];
	let p2 = d[0] ^ d[2] ^ d[3];
	let p3 = d[1] ^ d[2] ^ d[3];

	(p1) | (p2 << 1) | (d[0] << 2) | (p3 << 3) | (d[1] << 4) | (d[2] << 5) | (d[3] << 6)
}

/// Decodes a 7-bit Hamming(7,4) codeword, correcting a single bit error.
pub fn decode_7_4(word: u8) -> u8 {
	let bits: [u8; 7] = core::array::from_fn(|i| bit(word, i));
	let [p1, p2, d0, p3, d1, d2, d3] = bits;

	let s1 = p1 ^ d0 ^ d1 ^ d3;
	let s2 = p2 ^ d0 ^ d2 ^ d3;
	let s3 = p3 ^ d1 ^ d2 ^ d3;

	let syndrome = s1 | (s2 << 1) | (s3 << 2);
	let mut corrected = word;

	if syndrome != 0 {
		// Syndrome directly encodes the 1-based bit position to flip, by
		// construction of the parity equations above.
		let pos = match syndrome {
			0b011 => 0,
			0b101 => 1,
			0b001 => 2,
			0b110 => 3,
			0b010 => 4,
			0b100 => 5,
			0b111 => 6,
			_ => unreachable!(),
		};

		corrected ^= 1 << pos;
	}

	(corrected >> 2) & 0b1 | ((corrected >> 4) & 0b1) << 1 | ((corrected >> 5) & 0b1) << 2 | ((corrected >> 6) & 0b1) << 3
}

#[inline]
fn bit(v: u8, i: usize) -> u8 {
	(v >> i) & 1
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trip_no_error() {
		for data in 0..16u8 {
			let word = encode_7_4(data);
			assert_eq!(decode_7_4(word), data);
		}
	}

	#[test]
	fn corrects_single_bit_error() {
		for data in 0..16u8 {
			let word = encode_7_4(data);
			for bitpos in 0..7 {
				let flipped = word ^ (1 << bitpos);
				assert_eq!(decode_7_4(flipped), data, "data={data} bit={bitpos}");
			}
		}
	}
}

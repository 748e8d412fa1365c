//! AES-256-ECB datagram-level wrap, `spec.md` §4.6.
//!
//! Outbound: zero-pad to a 16-byte multiple, AES-256-ECB encrypt with the
//! (implicitly zero) IV, prepend the big-endian magic `0xC0FE`. Inbound:
//! check the magic, then decrypt — using the (offset-2, padded-to-block)
//! variant `spec.md` §9 note 1 calls out as the one to keep.

use aes::Aes256;
use cipher::generic_array::GenericArray;
use cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use log::warn;

pub const MAGIC: u16 = 0xc0fe;
const BLOCK: usize = 16;

/// Wraps `payload` for transmission under the 32-byte preshared key.
pub fn wrap(payload: &[u8], key: &[u8; 32]) -> Vec<u8> {
	let cipher = Aes256::new_from_slice(key).expect("32-byte key");

	let pad = (BLOCK - (payload.len() % BLOCK)) % BLOCK;
	let mut plaintext = Vec::with_capacity(payload.len() + pad);
	plaintext.extend_from_slice(payload);
	plaintext.resize(payload.len() + pad, 0);

	for block in plaintext.chunks_mut(BLOCK) {
		let ga = GenericArray::from_mut_slice(block);
		cipher.encrypt_block(ga);
	}

	let mut out = Vec::with_capacity(2 + plaintext.len());
	out.extend_from_slice(&MAGIC.to_be_bytes());
	out.extend_from_slice(&plaintext);
	out
}

/// Unwraps an inbound datagram. Returns `None` (equivalent to the
/// zero-length discard the source performs) if the magic doesn't match or
/// the remainder isn't block-aligned.
pub fn unwrap(datagram: &[u8], key: &[u8; 32]) -> Option<Vec<u8>> {
	if datagram.len() < 2 {
		return None;
	}

	let magic = u16::from_be_bytes([datagram[0], datagram[1]]);
	if magic != MAGIC {
		warn!("aes unwrap: bad magic {magic:#06x}");
		return None;
	}

	// The (offset-2, padded-to-block) variant: ciphertext starts right
	// after the magic, and is zero-padded up to a block boundary before
	// decrypting (rather than decrypting the magic bytes themselves).
	let mut ciphertext = datagram[2..].to_vec();
	let pad = (BLOCK - (ciphertext.len() % BLOCK)) % BLOCK;
	ciphertext.resize(ciphertext.len() + pad, 0);

	let cipher = Aes256::new_from_slice(key).expect("32-byte key");

	for block in ciphertext.chunks_mut(BLOCK) {
		let ga = GenericArray::from_mut_slice(block);
		cipher.decrypt_block(ga);
	}

	Some(ciphertext)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trip_with_zero_key() {
		let key = [0u8; 32];
		let payload = vec![0x41u8; 30];

		let wrapped = wrap(&payload, &key);
		assert_eq!(&wrapped[..2], &MAGIC.to_be_bytes());
		assert_eq!(wrapped.len(), 2 + 32);

		let unwrapped = unwrap(&wrapped, &key).unwrap();
		assert!(unwrapped.starts_with(&payload));
		assert!(unwrapped[payload.len()..].iter().all(|&b| b == 0));
	}

	#[test]
	fn bad_magic_is_discarded() {
		let key = [0u8; 32];
		let datagram = [0x00, 0x00, 0x01, 0x02];
		assert!(unwrap(&datagram, &key).is_none());
	}
}

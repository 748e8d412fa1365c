//! P25 Key Management Messages: the common 8-byte frame header and the
//! `MODIFY_KEY_CMD` message body, `spec.md` §3/§4.10.

use log::warn;
use utils::bits::{read_u16, write_u16};

pub const MODIFY_KEY_CMD: u8 = 0x13;
pub const HEADER_LEN: usize = 8;
pub const KEY_MATERIAL_LEN: usize = 32;

/// The 8-byte frame header every KMM carries: message id, message length,
/// response kind, completion flag, and destination/source logical-link ids.
pub struct KmmHeader {
	pub message_id: u8,
	pub message_length: u16,
	pub response_kind: u8,
	pub complete: bool,
	pub dst_llid: u16,
	pub src_llid: u16,
}

impl KmmHeader {
	pub fn decode(buf: &[u8]) -> Option<Self> {
		if buf.len() < HEADER_LEN {
			warn!("kmm: header shorter than {HEADER_LEN} bytes");
			return None;
		}

		Some(KmmHeader {
			message_id: buf[0],
			message_length: read_u16(buf, 1),
			response_kind: buf[3] >> 1,
			complete: buf[3] & 1 != 0,
			dst_llid: read_u16(buf, 4),
			src_llid: read_u16(buf, 6),
		})
	}

	pub fn encode(&self) -> [u8; HEADER_LEN] {
		let mut out = [0u8; HEADER_LEN];
		out[0] = self.message_id;
		write_u16(&mut out, 1, self.message_length);
		out[3] = (self.response_kind << 1) | self.complete as u8;
		write_u16(&mut out, 4, self.dst_llid);
		write_u16(&mut out, 6, self.src_llid);
		out
	}
}

/// One key within a keyset: a format byte (whose low 5 bits are a key-name
/// length), SLN, key id, and up to 32 bytes of key material — only the
/// enclosing keyset's `key_length` bytes of which are valid.
pub struct KeyItem {
	pub key_format: u8,
	pub sln: u16,
	pub key_id: u16,
	pub material: [u8; KEY_MATERIAL_LEN],
}

impl KeyItem {
	pub fn key_name_length(&self) -> u8 {
		self.key_format & 0x1f
	}

	fn encode(&self, key_length: u8, out: &mut Vec<u8>) {
		out.push(self.key_format);
		out.extend_from_slice(&self.sln.to_be_bytes());
		out.extend_from_slice(&self.key_id.to_be_bytes());
		out.extend_from_slice(&self.material[..key_length as usize]);
	}

	fn decode(buf: &[u8], key_length: u8) -> Option<(Self, usize)> {
		let len = 5 + key_length as usize;
		if buf.len() < len {
			warn!("kmm: key item shorter than {len} bytes");
			return None;
		}

		let mut material = [0u8; KEY_MATERIAL_LEN];
		material[..key_length as usize].copy_from_slice(&buf[5..len]);

		Some((KeyItem { key_format: buf[0], sln: read_u16(buf, 1), key_id: read_u16(buf, 3), material }, len))
	}
}

/// A keyset: id, algorithm, per-key material length, and its ordered
/// `KeyItem`s.
pub struct KeysetItem {
	pub keyset_id: u8,
	pub algorithm_id: u8,
	pub key_length: u8,
	pub keys: Vec<KeyItem>,
}

impl KeysetItem {
	fn encode(&self, out: &mut Vec<u8>) {
		out.push(self.keyset_id);
		out.push(self.algorithm_id);
		out.push(self.key_length);
		out.push(self.keys.len() as u8);
		for key in &self.keys {
			key.encode(self.key_length, out);
		}
	}

	fn decode(buf: &[u8]) -> Option<(Self, usize)> {
		if buf.len() < 4 {
			warn!("kmm: keyset item shorter than 4 bytes");
			return None;
		}

		let keyset_id = buf[0];
		let algorithm_id = buf[1];
		let key_length = buf[2];
		let key_count = buf[3];

		let mut offset = 4;
		let mut keys = Vec::with_capacity(key_count as usize);

		for _ in 0..key_count {
			let (key, len) = KeyItem::decode(&buf[offset..], key_length)?;
			keys.push(key);
			offset += len;
		}

		Some((KeysetItem { keyset_id, algorithm_id, key_length, keys }, offset))
	}
}

/// `MODIFY_KEY_CMD` body: a decrypt-info format byte, algorithm id, key id,
/// an optional 9-byte Message Indicator, and the keyset it installs.
pub struct KmmModifyKey {
	pub decrypt_info_format: u8,
	pub algorithm_id: u8,
	pub key_id: u16,
	pub message_indicator: Option<[u8; 9]>,
	pub keyset: KeysetItem,
}

impl KmmModifyKey {
	/// High bit of `decrypt_info_format` marks whether a 9-byte Message
	/// Indicator follows the key id.
	const HAS_MI_FLAG: u8 = 0x80;

	pub fn decode(buf: &[u8]) -> Option<Self> {
		if buf.len() < 4 {
			warn!("kmm: modify-key body shorter than 4 bytes");
			return None;
		}

		let decrypt_info_format = buf[0];
		let has_mi = decrypt_info_format & Self::HAS_MI_FLAG != 0;
		let algorithm_id = buf[1];
		let key_id = read_u16(buf, 2);
		let mut offset = 4;

		let message_indicator = if has_mi {
			if buf.len() < offset + 9 {
				warn!("kmm: modify-key body missing 9-byte MI");
				return None;
			}
			let mut mi = [0u8; 9];
			mi.copy_from_slice(&buf[offset..offset + 9]);
			offset += 9;
			Some(mi)
		} else {
			None
		};

		let (keyset, _) = KeysetItem::decode(&buf[offset..])?;

		Some(KmmModifyKey { decrypt_info_format, algorithm_id, key_id, message_indicator, keyset })
	}

	pub fn encode(&self) -> Vec<u8> {
		let mut out = Vec::new();
		out.push(self.decrypt_info_format);
		out.push(self.algorithm_id);
		out.extend_from_slice(&self.key_id.to_be_bytes());

		if let Some(mi) = &self.message_indicator {
			out.extend_from_slice(mi);
		}

		self.keyset.encode(&mut out);
		out
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn header_round_trip() {
		let header = KmmHeader { message_id: MODIFY_KEY_CMD, message_length: 40, response_kind: 1, complete: true, dst_llid: 0x1234, src_llid: 0x5678 };
		let decoded = KmmHeader::decode(&header.encode()).expect("decodes");
		assert_eq!(decoded.message_id, MODIFY_KEY_CMD);
		assert_eq!(decoded.message_length, 40);
		assert_eq!(decoded.response_kind, 1);
		assert!(decoded.complete);
		assert_eq!(decoded.dst_llid, 0x1234);
		assert_eq!(decoded.src_llid, 0x5678);
	}

	#[test]
	fn modify_key_round_trip_with_mi_and_two_keys() {
		let mut material_a = [0u8; KEY_MATERIAL_LEN];
		material_a[..16].copy_from_slice(&[0xaa; 16]);
		let mut material_b = [0u8; KEY_MATERIAL_LEN];
		material_b[..16].copy_from_slice(&[0xbb; 16]);

		let keyset = KeysetItem {
			keyset_id: 1,
			algorithm_id: 0xaa,
			key_length: 16,
			keys: vec![
				KeyItem { key_format: 0x05, sln: 100, key_id: 1, material: material_a },
				KeyItem { key_format: 0x05, sln: 101, key_id: 2, material: material_b },
			],
		};

		let cmd = KmmModifyKey { decrypt_info_format: 0x80, algorithm_id: 0xaa, key_id: 7, message_indicator: Some([9u8; 9]), keyset };

		let wire = cmd.encode();
		let decoded = KmmModifyKey::decode(&wire).expect("decodes");

		assert_eq!(decoded.algorithm_id, 0xaa);
		assert_eq!(decoded.key_id, 7);
		assert_eq!(decoded.message_indicator, Some([9u8; 9]));
		assert_eq!(decoded.keyset.keys.len(), 2);
		assert_eq!(decoded.keyset.keys[0].sln, 100);
		assert_eq!(decoded.keyset.keys[1].sln, 101);
		assert_eq!(decoded.keyset.key_length, 16);
		assert_eq!(decoded.keyset.keys[1].key_name_length(), 0x05 & 0x1f);
	}

	#[test]
	fn modify_key_without_mi() {
		let keyset = KeysetItem { keyset_id: 2, algorithm_id: 0xaa, key_length: 0, keys: vec![] };
		let cmd = KmmModifyKey { decrypt_info_format: 0x00, algorithm_id: 0xaa, key_id: 3, message_indicator: None, keyset };
		let decoded = KmmModifyKey::decode(&cmd.encode()).expect("decodes");
		assert!(decoded.message_indicator.is_none());
		assert_eq!(decoded.keyset.keys.len(), 0);
	}
}

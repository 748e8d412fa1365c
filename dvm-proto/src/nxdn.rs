//! NXDN message-type enumeration.
//!
//! `spec.md` names NXDN only as a third preamble `Mode`
//! ([`crate::preamble::Mode::Nxdn`]) and a message-type enum at the
//! protocol-data-unit layer; no further NXDN wire format is specified, so
//! this module carries only the recognised message types.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MessageType {
	VoiceCallAssignment,
	DataCallAssignment,
	GroupRegistration,
	UnitRegistration,
	Deregistration,
	StatusInquiry,
	MessageTransfer,
	Idle,
}

impl MessageType {
	pub fn from_byte(b: u8) -> Option<Self> {
		match b {
			0x01 => Some(MessageType::VoiceCallAssignment),
			0x02 => Some(MessageType::DataCallAssignment),
			0x03 => Some(MessageType::GroupRegistration),
			0x04 => Some(MessageType::UnitRegistration),
			0x05 => Some(MessageType::Deregistration),
			0x06 => Some(MessageType::StatusInquiry),
			0x07 => Some(MessageType::MessageTransfer),
			0x10 => Some(MessageType::Idle),
			_ => None,
		}
	}

	pub fn to_byte(self) -> u8 {
		match self {
			MessageType::VoiceCallAssignment => 0x01,
			MessageType::DataCallAssignment => 0x02,
			MessageType::GroupRegistration => 0x03,
			MessageType::UnitRegistration => 0x04,
			MessageType::Deregistration => 0x05,
			MessageType::StatusInquiry => 0x06,
			MessageType::MessageTransfer => 0x07,
			MessageType::Idle => 0x10,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trip_all_variants() {
		let variants = [
			MessageType::VoiceCallAssignment,
			MessageType::DataCallAssignment,
			MessageType::GroupRegistration,
			MessageType::UnitRegistration,
			MessageType::Deregistration,
			MessageType::StatusInquiry,
			MessageType::MessageTransfer,
			MessageType::Idle,
		];

		for v in variants {
			assert_eq!(MessageType::from_byte(v.to_byte()), Some(v));
		}
	}

	#[test]
	fn rejects_unknown_byte() {
		assert_eq!(MessageType::from_byte(0xff), None);
	}
}

//! Decoded element values and their byte codecs
//!
//! Each leaf data type owns a pair of pure conversions: bytes to value when a
//! parsed element is first read, value to bytes when an assigned element is
//! re-serialized. Both directions follow RFC 8794 section 7.

use crate::config::ParsingMode;
use crate::error::Result;
use crate::macros::{err, parse_mode_choice};
use crate::schema::ElementDataType;

use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};

/// An EBML date: a signed nanosecond offset from 2001-01-01T00:00:00 UTC
///
/// # Examples
///
/// ```rust
/// use ebml_tree::element::EbmlDate;
///
/// // The EBML epoch itself
/// let epoch = EbmlDate::from_nanos(0);
/// assert_eq!(epoch.unix_seconds(), 978_307_200);
/// ```
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct EbmlDate {
	nanos: i64,
}

impl EbmlDate {
	/// Seconds between the Unix epoch and the EBML epoch (2001-01-01)
	const EPOCH_OFFSET_SECS: i64 = 978_307_200;

	/// Create a date from a nanosecond offset from the EBML epoch
	pub const fn from_nanos(nanos: i64) -> Self {
		Self { nanos }
	}

	/// Create a date from a Unix timestamp in seconds
	pub const fn from_unix_seconds(seconds: i64) -> Self {
		Self {
			nanos: (seconds - Self::EPOCH_OFFSET_SECS) * 1_000_000_000,
		}
	}

	/// The offset from the EBML epoch in nanoseconds
	pub const fn nanos(self) -> i64 {
		self.nanos
	}

	/// The date as a Unix timestamp in seconds, truncating sub-second precision
	pub const fn unix_seconds(self) -> i64 {
		self.nanos / 1_000_000_000 + Self::EPOCH_OFFSET_SECS
	}
}

/// A decoded element value
///
/// Master elements have no value of their own; their payload is their children.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementValue {
	/// An unsigned integer of 0-8 octets
	UnsignedInt(u64),
	/// A two's complement signed integer of 0-8 octets
	SignedInt(i64),
	/// A 0, 32, or 64-bit IEEE-754 float
	Float(f64),
	/// A (printable ASCII) string
	String(String),
	/// A UTF-8 string
	Utf8(String),
	/// Raw bytes; also carries Block/SimpleBlock payloads and unknown elements
	Binary(Vec<u8>),
	/// A timestamp
	Date(EbmlDate),
}

impl ElementValue {
	/// The name of the value's type, for diagnostics
	pub fn type_name(&self) -> &'static str {
		match self {
			Self::UnsignedInt(_) => "unsigned integer",
			Self::SignedInt(_) => "signed integer",
			Self::Float(_) => "float",
			Self::String(_) => "string",
			Self::Utf8(_) => "UTF-8 string",
			Self::Binary(_) => "binary",
			Self::Date(_) => "date",
		}
	}

	/// Whether the value is assignable to an element of `data_type`
	pub(crate) fn matches(&self, data_type: ElementDataType) -> bool {
		matches!(
			(self, data_type),
			(Self::UnsignedInt(_), ElementDataType::UnsignedInt)
				| (Self::SignedInt(_), ElementDataType::SignedInt)
				| (Self::Float(_), ElementDataType::Float)
				| (Self::String(_), ElementDataType::String)
				| (
					Self::Utf8(_),
					ElementDataType::Utf8 | ElementDataType::String
				)
				| (
					Self::Binary(_),
					ElementDataType::Binary | ElementDataType::Block | ElementDataType::SimpleBlock
				)
				| (Self::Date(_), ElementDataType::Date)
		)
	}

	/// Decode a payload per its data type
	///
	/// `content` must be the element's entire payload. `id` is only used for
	/// error context.
	pub(crate) fn decode(
		id: u64,
		data_type: ElementDataType,
		content: Vec<u8>,
		parse_mode: ParsingMode,
	) -> Result<Self> {
		match data_type {
			ElementDataType::UnsignedInt => {
				Ok(Self::UnsignedInt(decode_uint(id, &content, parse_mode)?))
			},
			ElementDataType::SignedInt => {
				let value = decode_uint(id, &content, parse_mode)?;

				// Stored as two's complement with the leftmost bit being the sign bit
				let value_width = content.len().min(8) as u32 * 8;
				let shift = 64 - value_width;
				Ok(Self::SignedInt(
					(value.wrapping_shl(shift) as i64).wrapping_shr(shift),
				))
			},
			ElementDataType::Float => {
				// https://www.rfc-editor.org/rfc/rfc8794.html#section-7.3
				// A Float Element MUST declare a length of either zero octets (0 bit),
				// four octets (32 bit), or eight octets (64 bit)
				let float = match content.len() {
					0 => 0.0,
					4 => f64::from(f32::from_be_bytes([
						content[0], content[1], content[2], content[3],
					])),
					8 => f64::from_be_bytes([
						content[0], content[1], content[2], content[3], content[4], content[5],
						content[6], content[7],
					]),
					length => parse_mode_choice!(
						parse_mode,
						RELAXED: 0.0,
						DEFAULT: err!(BadElementLength { id, length: length as u64 })
					),
				};

				Ok(Self::Float(float))
			},
			ElementDataType::String | ElementDataType::Utf8 => {
				let mut content = content;

				// https://www.rfc-editor.org/rfc/rfc8794.html#section-13
				// Null Octets, which are octets with all bits set to zero,
				// MAY follow the value of a String Element or UTF-8 Element to serve
				// as a terminator.
				if let Some(i) = content.iter().rposition(|x| *x != 0) {
					content.truncate(i + 1);
				} else {
					content.clear();
				}

				let string = match String::from_utf8(content) {
					Ok(string) => string,
					Err(e) => parse_mode_choice!(
						parse_mode,
						RELAXED: String::from_utf8_lossy(e.as_bytes()).into_owned(),
						DEFAULT: return Err(e.into())
					),
				};

				if data_type == ElementDataType::String {
					Ok(Self::String(string))
				} else {
					Ok(Self::Utf8(string))
				}
			},
			ElementDataType::Date => {
				// https://www.rfc-editor.org/rfc/rfc8794.html#section-7.6
				// A Date Element MUST declare a length of either zero octets or eight octets
				if !matches!(content.len(), 0 | 8) {
					parse_mode_choice!(
						parse_mode,
						RELAXED: return Ok(Self::Date(EbmlDate::from_nanos(0))),
						DEFAULT: err!(BadElementLength { id, length: content.len() as u64 })
					);
				}

				let nanos = decode_uint(id, &content, parse_mode)? as i64;
				Ok(Self::Date(EbmlDate::from_nanos(nanos)))
			},
			ElementDataType::Binary | ElementDataType::Block | ElementDataType::SimpleBlock => {
				Ok(Self::Binary(content))
			},
			ElementDataType::Master => err!(NotALeaf),
		}
	}

	/// Encode the value into its minimal byte form
	///
	/// * Integers strip leading zero (or sign-redundant) octets down to at least
	///   one byte, unless `min_octets` asks for more.
	/// * Floats always encode as 64-bit; a value that is exactly representable in
	///   32 bits encodes as 32-bit.
	pub(crate) fn encode(&self, min_octets: Option<u8>) -> Result<Vec<u8>> {
		let mut bytes = Vec::new();
		self.encode_to(min_octets, &mut bytes)?;
		Ok(bytes)
	}

	fn encode_to<W: Write>(&self, min_octets: Option<u8>, writer: &mut W) -> Result<()> {
		match self {
			Self::UnsignedInt(value) => encode_uint(*value, min_octets, writer),
			Self::SignedInt(value) => {
				// The minimal width is the smallest whose sign extension reproduces
				// the value
				let mut octets = 1u8;
				while octets < 8 {
					let width = u32::from(octets) * 8;
					let shift = 64 - width;
					if (value.wrapping_shl(shift)).wrapping_shr(shift) == *value {
						break;
					}
					octets += 1;
				}

				let octets = std::cmp::max(octets, min_octets.unwrap_or(1));
				for shift in (0..octets).rev() {
					writer.write_u8((*value >> (shift * 8)) as u8)?;
				}
				Ok(())
			},
			Self::Float(value) => {
				let as_f32 = *value as f32;
				if f64::from(as_f32) == *value && min_octets.unwrap_or(0) <= 4 {
					writer.write_f32::<BigEndian>(as_f32)?;
				} else {
					writer.write_f64::<BigEndian>(*value)?;
				}
				Ok(())
			},
			Self::String(value) | Self::Utf8(value) => {
				writer.write_all(value.as_bytes())?;
				Ok(())
			},
			Self::Binary(value) => {
				writer.write_all(value)?;
				Ok(())
			},
			Self::Date(value) => {
				writer.write_i64::<BigEndian>(value.nanos())?;
				Ok(())
			},
		}
	}
}

fn decode_uint(id: u64, content: &[u8], parse_mode: ParsingMode) -> Result<u64> {
	// https://www.rfc-editor.org/rfc/rfc8794.html#section-7.2
	// An Unsigned Integer Element MUST declare a length from zero to eight octets
	let content = if content.len() > 8 {
		parse_mode_choice!(
			parse_mode,
			RELAXED: &content[content.len() - 8..],
			DEFAULT: err!(BadElementLength { id, length: content.len() as u64 })
		)
	} else {
		content
	};

	let mut buf = [0; 8];
	buf[8 - content.len()..].copy_from_slice(content);
	Ok(u64::from_be_bytes(buf))
}

fn encode_uint<W: Write>(value: u64, min_octets: Option<u8>, writer: &mut W) -> Result<()> {
	// Strip leading zero octets, down to at least one byte
	let mut octets = (8 - value.leading_zeros() / 8).max(1) as u8;
	octets = std::cmp::max(octets, min_octets.unwrap_or(1));

	for shift in (0..octets).rev() {
		writer.write_u8((value >> (shift * 8)) as u8)?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::{EbmlDate, ElementValue};
	use crate::config::ParsingMode;
	use crate::schema::ElementDataType;

	fn decode(data_type: ElementDataType, content: &[u8]) -> ElementValue {
		ElementValue::decode(0x80, data_type, content.to_vec(), ParsingMode::BestAttempt).unwrap()
	}

	#[test_log::test]
	fn unsigned_int() {
		assert_eq!(
			decode(ElementDataType::UnsignedInt, &[]),
			ElementValue::UnsignedInt(0)
		);
		assert_eq!(
			decode(ElementDataType::UnsignedInt, &[0x01, 0x00]),
			ElementValue::UnsignedInt(256)
		);

		// Minimal re-encode strips the leading zeros the writer padded with
		let value = ElementValue::UnsignedInt(256);
		assert_eq!(value.encode(None).unwrap(), vec![0x01, 0x00]);
		assert_eq!(
			value.encode(Some(4)).unwrap(),
			vec![0x00, 0x00, 0x01, 0x00]
		);

		// Zero still takes one byte
		assert_eq!(ElementValue::UnsignedInt(0).encode(None).unwrap(), vec![0]);
	}

	#[test_log::test]
	fn signed_int_sign_extension() {
		assert_eq!(
			decode(ElementDataType::SignedInt, &[0xFF]),
			ElementValue::SignedInt(-1)
		);
		assert_eq!(
			decode(ElementDataType::SignedInt, &[0x80, 0x00]),
			ElementValue::SignedInt(-32768)
		);

		assert_eq!(ElementValue::SignedInt(-1).encode(None).unwrap(), vec![0xFF]);
		assert_eq!(
			ElementValue::SignedInt(-32768).encode(None).unwrap(),
			vec![0x80, 0x00]
		);
		// 128 needs two octets; one octet would read back negative
		assert_eq!(
			ElementValue::SignedInt(128).encode(None).unwrap(),
			vec![0x00, 0x80]
		);
	}

	#[test_log::test]
	fn floats() {
		assert_eq!(decode(ElementDataType::Float, &[]), ElementValue::Float(0.0));
		assert_eq!(
			decode(ElementDataType::Float, &8000.0f32.to_be_bytes()),
			ElementValue::Float(8000.0)
		);
		assert_eq!(
			decode(ElementDataType::Float, &0.5f64.to_be_bytes()),
			ElementValue::Float(0.5)
		);

		// 5 octets is not a float
		assert!(
			ElementValue::decode(
				0x80,
				ElementDataType::Float,
				vec![0; 5],
				ParsingMode::BestAttempt
			)
			.is_err()
		);
		assert_eq!(
			ElementValue::decode(
				0x80,
				ElementDataType::Float,
				vec![0; 5],
				ParsingMode::Relaxed
			)
			.unwrap(),
			ElementValue::Float(0.0)
		);
	}

	#[test_log::test]
	fn strings_trim_trailing_nuls() {
		assert_eq!(
			decode(ElementDataType::Utf8, b"matroska\0\0\0"),
			ElementValue::Utf8(String::from("matroska"))
		);
		assert_eq!(
			decode(ElementDataType::String, b"\0\0"),
			ElementValue::String(String::new())
		);

		// Interior NULs survive
		assert_eq!(
			decode(ElementDataType::String, b"a\0b"),
			ElementValue::String(String::from("a\0b"))
		);
	}

	#[test_log::test]
	fn dates() {
		let nanos = 1_000_000_000i64;
		assert_eq!(
			decode(ElementDataType::Date, &nanos.to_be_bytes()),
			ElementValue::Date(EbmlDate::from_nanos(nanos))
		);

		let value = ElementValue::Date(EbmlDate::from_unix_seconds(978_307_201));
		assert_eq!(value.encode(None).unwrap(), nanos.to_be_bytes());
	}

	#[test_log::test]
	fn oversized_int_is_an_error() {
		assert!(
			ElementValue::decode(
				0x80,
				ElementDataType::UnsignedInt,
				vec![0; 9],
				ParsingMode::BestAttempt
			)
			.is_err()
		);
	}
}

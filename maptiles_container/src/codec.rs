//! Schema driven encoding and decoding of single fields.
//!
//! `read_field` and `write_field` operate on the bytes of one block. `block_offset` is only used to report the
//! absolute file position of a failing field.
//!
//! ```rust
//! use maptiles_container::codec::{read_field, write_field};
//! use maptiles_container::schema::{FieldValue, HEADER};
//!
//! let mut buffer = vec![0u8; 13];
//! write_field(&mut buffer, HEADER.field("magic_number"), &FieldValue::Bytes("MAPTILES".into())).unwrap();
//! write_field(&mut buffer, HEADER.field("metadata_offset"), &FieldValue::UInt(13)).unwrap();
//! assert_eq!(&buffer[..8], b"MAPTILES");
//!
//! let offset = read_field(&buffer, HEADER.field("metadata_offset"), 0).unwrap();
//! assert_eq!(offset, FieldValue::UInt(13));
//! ```

use crate::{
	MapTilesError,
	schema::{FieldDef, FieldKind, FieldValue},
};
use anyhow::{Result, bail};
use maptiles_core::{
	Blob,
	io::{ValueReader, ValueReaderSlice, ValueWriter, ValueWriterBlob},
};

/// Decodes a field from the bytes of its block and checks its match rule.
///
/// Strings are trimmed of trailing zero bytes.
pub fn read_field(block: &[u8], field: &FieldDef, block_offset: u64) -> Result<FieldValue> {
	let range = field.range(block.len(), block_offset)?;
	let offset = block_offset + range.start as u64;
	let bytes = &block[range];

	let value = match field.kind {
		FieldKind::Buffer => FieldValue::Bytes(Blob::from(bytes)),
		FieldKind::Ascii | FieldKind::Utf8 => {
			let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |p| p + 1);
			let text = &bytes[..end];
			if field.kind == FieldKind::Ascii && !text.is_ascii() {
				bail!(MapTilesError::schema_violation(
					field.block,
					field.name,
					offset,
					"contains non-ascii bytes"
				));
			}
			match std::str::from_utf8(text) {
				Ok(text) => FieldValue::Text(text.to_owned()),
				Err(e) => bail!(MapTilesError::schema_violation(
					field.block,
					field.name,
					offset,
					format!("invalid utf-8: {e}")
				)),
			}
		}
		FieldKind::UInt8 | FieldKind::UInt32BE | FieldKind::UInt64BE | FieldKind::DoubleBE => {
			let mut reader = ValueReaderSlice::new_be(bytes);
			match field.kind {
				FieldKind::UInt8 => FieldValue::UInt(u64::from(reader.read_u8()?)),
				FieldKind::UInt32BE => FieldValue::UInt(u64::from(reader.read_u32()?)),
				FieldKind::UInt64BE => FieldValue::UInt(reader.read_u64()?),
				_ => FieldValue::Double(reader.read_f64()?),
			}
		}
	};

	field.check(&value, offset)?;
	Ok(value)
}

/// Reads an integer field.
pub fn read_uint(block: &[u8], field: &FieldDef, block_offset: u64) -> Result<u64> {
	match read_field(block, field, block_offset)? {
		FieldValue::UInt(v) => Ok(v),
		other => bail!(field.type_error(&other, block_offset)),
	}
}

/// Reads a double field.
pub fn read_double(block: &[u8], field: &FieldDef, block_offset: u64) -> Result<f64> {
	match read_field(block, field, block_offset)? {
		FieldValue::Double(v) => Ok(v),
		other => bail!(field.type_error(&other, block_offset)),
	}
}

/// Reads a string field, already trimmed of its zero padding.
pub fn read_text(block: &[u8], field: &FieldDef, block_offset: u64) -> Result<String> {
	match read_field(block, field, block_offset)? {
		FieldValue::Text(v) => Ok(v),
		other => bail!(field.type_error(&other, block_offset)),
	}
}

/// Reads a raw buffer field.
pub fn read_bytes(block: &[u8], field: &FieldDef, block_offset: u64) -> Result<Blob> {
	match read_field(block, field, block_offset)? {
		FieldValue::Bytes(v) => Ok(v),
		other => bail!(field.type_error(&other, block_offset)),
	}
}

/// Encodes a value into its field's bytes inside `block` and returns the number of bytes written.
///
/// Fixed-width strings and buffers are zero-padded. Variable-length data must exactly fill the space
/// between the fixed fields and the trailing fields.
pub fn write_field(block: &mut [u8], field: &FieldDef, value: &FieldValue) -> Result<usize> {
	let range = field.range(block.len(), 0)?;
	let offset = range.start as u64;
	field.check(value, offset)?;

	let target = &mut block[range];
	let width = target.len();
	let overflow = |reason: String| MapTilesError::field_overflow(field.block, field.name, width, reason);

	match (field.kind, value) {
		(FieldKind::Buffer, FieldValue::Bytes(bytes)) => {
			let bytes = bytes.as_slice();
			if bytes.len() > width || (field.size.is_none() && bytes.len() != width) {
				bail!(overflow(format!("{} bytes given", bytes.len())));
			}
			target.copy_from_slice(padded(bytes, width)?.as_slice());
		}
		(FieldKind::Ascii | FieldKind::Utf8, FieldValue::Text(text)) => {
			if field.kind == FieldKind::Ascii && !text.is_ascii() {
				bail!(MapTilesError::schema_violation(
					field.block,
					field.name,
					offset,
					format!("{text:?} contains non-ascii characters")
				));
			}
			let bytes = text.as_bytes();
			if bytes.len() > width {
				bail!(overflow(format!("{text:?} is {} bytes long", bytes.len())));
			}
			target.copy_from_slice(padded(bytes, width)?.as_slice());
		}
		(FieldKind::UInt8 | FieldKind::UInt32BE | FieldKind::UInt64BE, FieldValue::UInt(v)) => {
			let mut writer = ValueWriterBlob::new_be();
			match field.kind {
				FieldKind::UInt8 => writer.write_u8(u8::try_from(*v).map_err(|_| overflow(format!("{v} exceeds {}", u8::MAX)))?)?,
				FieldKind::UInt32BE => {
					writer.write_u32(u32::try_from(*v).map_err(|_| overflow(format!("{v} exceeds {}", u32::MAX)))?)?;
				}
				_ => writer.write_u64(*v)?,
			}
			target.copy_from_slice(writer.into_blob().as_slice());
		}
		(FieldKind::DoubleBE, FieldValue::Double(v)) => {
			let mut writer = ValueWriterBlob::new_be();
			writer.write_f64(*v)?;
			target.copy_from_slice(writer.into_blob().as_slice());
		}
		(_, value) => bail!(field.type_error(value, offset)),
	}

	Ok(width)
}

/// `bytes` followed by zeros up to `width`.
fn padded(bytes: &[u8], width: usize) -> Result<Blob> {
	let mut writer = ValueWriterBlob::new_be();
	writer.write_slice(bytes)?;
	writer.write_zeros(width - bytes.len())?;
	Ok(writer.into_blob())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::{HEADER, INDEX_BLOCK, METADATA, TILE_BLOCK};

	fn header_bytes(magic: &[u8], version: u8, metadata_offset: u32) -> Vec<u8> {
		let mut bytes = magic.to_vec();
		bytes.push(version);
		bytes.extend_from_slice(&metadata_offset.to_be_bytes());
		bytes
	}

	fn violation(err: &anyhow::Error) -> Option<(&'static str, &'static str, u64)> {
		match err.downcast_ref::<MapTilesError>()? {
			MapTilesError::SchemaViolation {
				block, field, offset, ..
			} => Some((*block, *field, *offset)),
			_ => None,
		}
	}

	#[test]
	fn read_header_fields() -> Result<()> {
		let bytes = header_bytes(b"MAPTILES", 1, 13);
		assert_eq!(
			read_field(&bytes, HEADER.field("magic_number"), 0)?,
			FieldValue::Bytes(Blob::from("MAPTILES"))
		);
		assert_eq!(read_field(&bytes, HEADER.field("version"), 0)?, FieldValue::UInt(1));
		assert_eq!(read_field(&bytes, HEADER.field("metadata_offset"), 0)?, FieldValue::UInt(13));
		Ok(())
	}

	#[test]
	fn exact_rule_rejects_wrong_magic() {
		let bytes = header_bytes(b"MAPTILEZ", 1, 13);
		let err = read_field(&bytes, HEADER.field("magic_number"), 0).unwrap_err();
		assert_eq!(violation(&err), Some(("header", "magic_number", 0)));
	}

	#[test]
	fn one_of_rule_rejects_unknown_version() {
		let bytes = header_bytes(b"MAPTILES", 2, 13);
		let err = read_field(&bytes, HEADER.field("version"), 0).unwrap_err();
		assert_eq!(violation(&err), Some(("header", "version", 8)));
	}

	#[test]
	fn offsets_are_reported_absolute() {
		let mut block = vec![0u8; 34];
		block[0] = b'X';
		let err = read_field(&block, INDEX_BLOCK.field("type"), 1000).unwrap_err();
		assert_eq!(violation(&err), Some(("index_block", "type", 1000)));
	}

	#[test]
	fn short_buffer_is_corrupt() {
		let err = read_field(&[0u8; 10], HEADER.field("metadata_offset"), 0).unwrap_err();
		assert!(matches!(
			err.downcast_ref::<MapTilesError>(),
			Some(MapTilesError::CorruptContainer { block: "header", .. })
		));
	}

	#[test]
	fn strings_are_padded_and_trimmed() -> Result<()> {
		let mut block = vec![0xFFu8; 476];
		let field = METADATA.field("name");
		assert_eq!(write_field(&mut block, field, &FieldValue::Text("Kärnten".into()))?, 100);
		assert_eq!(&block[55..64], "Kärnten".as_bytes());
		assert!(block[64..155].iter().all(|b| *b == 0));
		assert_eq!(block[155], 0xFF);
		assert_eq!(read_field(&block, field, 0)?, FieldValue::Text("Kärnten".into()));
		Ok(())
	}

	#[test]
	fn oversized_string_overflows() {
		let mut block = vec![0u8; 476];
		let err = write_field(&mut block, METADATA.field("id"), &FieldValue::Text("x".repeat(51))).unwrap_err();
		assert!(matches!(
			err.downcast_ref::<MapTilesError>(),
			Some(MapTilesError::FieldOverflow { field: "id", size: 50, .. })
		));
		assert!(write_field(&mut block, METADATA.field("id"), &FieldValue::Text("x".repeat(50))).is_ok());
	}

	#[test]
	fn ascii_field_rejects_non_ascii() {
		let mut block = vec![0u8; 476];
		let err = write_field(&mut block, METADATA.field("tile_mime_type"), &FieldValue::Text("bild/größe".into()))
			.unwrap_err();
		assert_eq!(violation(&err), Some(("metadata", "tile_mime_type", 213)));

		block[5] = 0xC3;
		let err = read_field(&block, METADATA.field("id"), 13).unwrap_err();
		assert_eq!(violation(&err), Some(("metadata", "id", 18)));
	}

	#[test]
	fn integer_overflow() {
		let mut block = vec![0u8; 476];
		let err = write_field(&mut block, METADATA.field("min_zoom"), &FieldValue::UInt(256)).unwrap_err();
		assert!(matches!(
			err.downcast_ref::<MapTilesError>(),
			Some(MapTilesError::FieldOverflow { field: "min_zoom", .. })
		));
		let err = write_field(&mut block, METADATA.field("length"), &FieldValue::UInt(1 << 32)).unwrap_err();
		assert!(matches!(
			err.downcast_ref::<MapTilesError>(),
			Some(MapTilesError::FieldOverflow { field: "length", .. })
		));
	}

	#[test]
	fn rules_apply_on_write() {
		let mut block = vec![0u8; 34];
		let err = write_field(&mut block, INDEX_BLOCK.field("first_quadkey"), &FieldValue::Text("5".into())).unwrap_err();
		assert_eq!(violation(&err), Some(("index_block", "first_quadkey", 3)));

		let err = write_field(&mut block, INDEX_BLOCK.field("entry_length"), &FieldValue::UInt(2)).unwrap_err();
		assert_eq!(violation(&err), Some(("index_block", "entry_length", 1)));
	}

	#[test]
	fn type_mismatch_is_a_violation() {
		let mut block = vec![0u8; 13];
		let err = write_field(&mut block, HEADER.field("version"), &FieldValue::Text("1".into())).unwrap_err();
		assert_eq!(violation(&err), Some(("header", "version", 8)));
	}

	#[test]
	fn doubles_round_trip() -> Result<()> {
		let mut block = vec![0u8; 476];
		let field = METADATA.field("bbox_south");
		write_field(&mut block, field, &FieldValue::Double(-33.918_861))?;
		assert_eq!(read_field(&block, field, 0)?, FieldValue::Double(-33.918_861));
		Ok(())
	}

	#[test]
	fn variable_data_and_trailing_hash() -> Result<()> {
		let mut block = vec![0u8; 5 + 5 + 16];
		write_field(&mut block, TILE_BLOCK.field("type"), &FieldValue::Bytes(Blob::from("T")))?;
		write_field(&mut block, TILE_BLOCK.field("length"), &FieldValue::UInt(25))?;
		assert_eq!(
			write_field(&mut block, TILE_BLOCK.field("data"), &FieldValue::Bytes(Blob::from("hello")))?,
			5
		);
		write_field(&mut block, TILE_BLOCK.field("hash"), &FieldValue::Bytes(Blob::new_sized(16)))?;
		assert_eq!(&block[5..10], b"hello");

		let err = write_field(&mut block, TILE_BLOCK.field("data"), &FieldValue::Bytes(Blob::from("hi"))).unwrap_err();
		assert!(matches!(
			err.downcast_ref::<MapTilesError>(),
			Some(MapTilesError::FieldOverflow { field: "data", .. })
		));
		Ok(())
	}
}

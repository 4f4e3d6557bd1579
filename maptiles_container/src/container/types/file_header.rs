//! This module defines the `FileHeader` struct, the 13 bytes at the start of every MapTiles file.
//!
//! The header holds the magic number `MAPTILES`, the format version and the offset of the metadata block.

use crate::{
	codec::{read_bytes, read_uint, write_field},
	schema::{CURRENT_VERSION, FieldValue, HEADER, HEADER_LENGTH, MAGIC_NUMBER},
};
use anyhow::{Result, ensure};
use maptiles_core::{Blob, ByteRange, io::DataReader};

/// A struct representing the header of a MapTiles file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileHeader {
	pub version: u8,
	pub metadata_offset: u32,
}

impl FileHeader {
	/// Creates a header of the current format version.
	#[must_use]
	pub fn new(metadata_offset: u32) -> FileHeader {
		FileHeader {
			version: CURRENT_VERSION,
			metadata_offset,
		}
	}

	/// Reads the header from the start of a `DataReader`.
	pub async fn from_reader(reader: &DataReader) -> Result<FileHeader> {
		let blob = reader.read_range(&ByteRange::new(0, HEADER_LENGTH as u64)).await?;
		FileHeader::from_blob(&blob)
	}

	pub fn to_blob(&self) -> Result<Blob> {
		let mut header = vec![0u8; HEADER_LENGTH];
		write_field(&mut header, HEADER.field("magic_number"), &FieldValue::Bytes(Blob::from(MAGIC_NUMBER)))?;
		write_field(&mut header, HEADER.field("version"), &FieldValue::UInt(u64::from(self.version)))?;
		write_field(
			&mut header,
			HEADER.field("metadata_offset"),
			&FieldValue::UInt(u64::from(self.metadata_offset)),
		)?;
		Ok(Blob::from(header))
	}

	/// Parses a header. A wrong magic number or an unknown version fails with
	/// [`MapTilesError::SchemaViolation`](crate::MapTilesError::SchemaViolation).
	pub fn from_blob(blob: &Blob) -> Result<FileHeader> {
		ensure!(
			blob.len() == HEADER_LENGTH as u64,
			"a MapTiles header must be {HEADER_LENGTH} bytes long, got {blob:?}"
		);
		let bytes = blob.as_slice();
		read_bytes(bytes, HEADER.field("magic_number"), 0)?;
		let version = read_uint(bytes, HEADER.field("version"), 0)? as u8;
		let metadata_offset = read_uint(bytes, HEADER.field("metadata_offset"), 0)? as u32;
		Ok(FileHeader {
			version,
			metadata_offset,
		})
	}
}

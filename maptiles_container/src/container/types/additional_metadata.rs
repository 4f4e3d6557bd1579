//! Blocks of the additional metadata chain.
//!
//! The metadata block points to the first block of the chain. Each block carries an opaque payload and the
//! offset of the next block, zero ending the chain.

use crate::{
	MapTilesError,
	codec::{read_bytes, read_uint, write_field},
	schema::{ADDITIONAL_METADATA, ADDITIONAL_METADATA_HEADER_LENGTH, ADDITIONAL_METADATA_TAG, FieldValue, TYPE_TAG_LENGTH},
};
use anyhow::{Result, bail};
use maptiles_core::{Blob, io::DataReader};

use super::read_block;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdditionalMetadataBlock {
	pub next_offset: Option<u64>,
	pub payload: Blob,
}

impl AdditionalMetadataBlock {
	#[must_use]
	pub fn new(payload: Blob, next_offset: Option<u64>) -> AdditionalMetadataBlock {
		AdditionalMetadataBlock { next_offset, payload }
	}

	#[must_use]
	pub fn block_len(&self) -> u64 {
		ADDITIONAL_METADATA_HEADER_LENGTH as u64 + self.payload.len()
	}

	pub fn to_blob(&self) -> Result<Blob> {
		let block_len = self.block_len();
		if block_len > u64::from(u32::MAX) {
			bail!(MapTilesError::field_overflow(
				"additional_metadata",
				"length",
				4,
				format!("a payload of {} bytes does not fit", self.payload.len())
			));
		}

		let mut block = vec![0u8; block_len as usize];
		let mut put =
			|name: &str, value: FieldValue| write_field(&mut block, ADDITIONAL_METADATA.field(name), &value);
		put("type", FieldValue::Bytes(Blob::from(ADDITIONAL_METADATA_TAG)))?;
		put("length", FieldValue::UInt(block_len - TYPE_TAG_LENGTH as u64))?;
		put("next_offset", FieldValue::UInt(self.next_offset.unwrap_or(0)))?;
		put("payload", FieldValue::Bytes(self.payload.clone()))?;
		Ok(Blob::from(block))
	}

	pub fn from_blob(blob: &Blob, offset: u64) -> Result<AdditionalMetadataBlock> {
		let bytes = blob.as_slice();
		read_bytes(bytes, ADDITIONAL_METADATA.field("type"), offset)?;
		let length = read_uint(bytes, ADDITIONAL_METADATA.field("length"), offset)?;
		if TYPE_TAG_LENGTH as u64 + length != blob.len() {
			bail!(MapTilesError::corrupt(
				"additional_metadata",
				offset,
				format!("declared length {length} does not match a block of {} bytes", blob.len())
			));
		}
		let next_offset = match read_uint(bytes, ADDITIONAL_METADATA.field("next_offset"), offset)? {
			0 => None,
			next => Some(next),
		};
		let payload = read_bytes(bytes, ADDITIONAL_METADATA.field("payload"), offset)?;
		Ok(AdditionalMetadataBlock { next_offset, payload })
	}

	pub async fn from_reader(reader: &DataReader, offset: u64) -> Result<AdditionalMetadataBlock> {
		let blob = read_block(reader, &ADDITIONAL_METADATA, offset).await?;
		AdditionalMetadataBlock::from_blob(&blob, offset)
	}
}

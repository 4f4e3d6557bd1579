//! Reading of length-prefixed blocks (metadata, tile and additional metadata blocks).

use crate::{
	MapTilesError,
	codec::{read_bytes, read_uint},
	schema::{BLOCK_PREFIX_LENGTH, BlockSchema, TYPE_TAG_LENGTH},
};
use anyhow::{Result, bail};
use log::trace;
use maptiles_core::{Blob, ByteRange, io::DataReader};

/// Reads the block starting at `offset`, trusting its declared length.
/// The returned blob holds the whole block including type tag and length.
///
/// The type tag and the length are checked against `schema` before the rest of the block is read.
pub async fn read_block(reader: &DataReader, schema: &BlockSchema, offset: u64) -> Result<Blob> {
	let size = reader.get_size();
	let prefix_range = ByteRange::new(offset, BLOCK_PREFIX_LENGTH as u64);
	if prefix_range.end() > size {
		bail!(MapTilesError::corrupt(
			schema.name,
			offset,
			format!("block starts outside of a file with {size} bytes")
		));
	}

	let prefix = reader.read_range(&prefix_range).await?;
	read_bytes(prefix.as_slice(), schema.field("type"), offset)?;
	let length = read_uint(prefix.as_slice(), schema.field("length"), offset)?;

	let range = ByteRange::new(offset, TYPE_TAG_LENGTH as u64 + length);
	if range.end() > size {
		bail!(MapTilesError::corrupt(
			schema.name,
			offset,
			format!("declared length {length} reaches beyond the end of a file with {size} bytes")
		));
	}

	trace!("read {} block {range}", schema.name);
	reader.read_range(&range).await
}

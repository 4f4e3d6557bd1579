//! This module defines the `TileBlock` struct: an opaque tile payload followed by its MD5 digest.
//!
//! ```rust
//! use maptiles_container::TileBlock;
//!
//! let block = TileBlock::new("hello".into());
//! let blob = block.to_blob().unwrap();
//! assert_eq!(blob.len(), 26);
//! assert_eq!(blob.as_slice()[4], 25);
//! assert_eq!(TileBlock::from_blob(&blob, 0).unwrap().data.as_slice(), b"hello");
//! ```

use crate::{
	MapTilesError,
	codec::{read_bytes, read_uint, write_field},
	schema::{FieldValue, HASH_LENGTH, TILE_BLOCK, TILE_BLOCK_TAG, TILE_HEADER_LENGTH, TYPE_TAG_LENGTH},
};
use anyhow::{Result, bail};
use maptiles_core::Blob;
use md5::{Digest, Md5};

pub type TileHash = [u8; HASH_LENGTH];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileBlock {
	pub data: Blob,
	pub hash: TileHash,
}

impl TileBlock {
	/// Wraps a payload and computes its digest.
	#[must_use]
	pub fn new(data: Blob) -> TileBlock {
		let hash = TileBlock::hash_of(&data);
		TileBlock { data, hash }
	}

	/// MD5 digest of a payload.
	#[must_use]
	pub fn hash_of(data: &Blob) -> TileHash {
		let mut hasher = Md5::new();
		hasher.update(data.as_slice());
		let mut hash = [0u8; HASH_LENGTH];
		hash.copy_from_slice(&hasher.finalize());
		hash
	}

	/// Total size of the encoded block, including the type tag.
	#[must_use]
	pub fn block_len(&self) -> u64 {
		(TILE_HEADER_LENGTH + HASH_LENGTH) as u64 + self.data.len()
	}

	/// Encodes the block. Payloads that push the block beyond 4 GiB fail with [`MapTilesError::FieldOverflow`].
	pub fn to_blob(&self) -> Result<Blob> {
		let block_len = self.block_len();
		if block_len > u64::from(u32::MAX) {
			bail!(MapTilesError::field_overflow(
				"tile_block",
				"length",
				4,
				format!("a payload of {} bytes does not fit", self.data.len())
			));
		}

		let mut block = vec![0u8; block_len as usize];
		let mut put = |name: &str, value: FieldValue| write_field(&mut block, TILE_BLOCK.field(name), &value);
		put("type", FieldValue::Bytes(Blob::from(TILE_BLOCK_TAG)))?;
		put("length", FieldValue::UInt(block_len - TYPE_TAG_LENGTH as u64))?;
		put("data", FieldValue::Bytes(self.data.clone()))?;
		put("hash", FieldValue::Bytes(Blob::from(&self.hash)))?;
		Ok(Blob::from(block))
	}

	/// Decodes the block found at `offset` and verifies its digest.
	///
	/// Fails with [`MapTilesError::HashMismatch`] if the payload does not match the stored hash.
	pub fn from_blob(blob: &Blob, offset: u64) -> Result<TileBlock> {
		let bytes = blob.as_slice();
		read_bytes(bytes, TILE_BLOCK.field("type"), offset)?;
		let length = read_uint(bytes, TILE_BLOCK.field("length"), offset)?;
		if TYPE_TAG_LENGTH as u64 + length != blob.len() {
			bail!(MapTilesError::corrupt(
				"tile_block",
				offset,
				format!("declared length {length} does not match a block of {} bytes", blob.len())
			));
		}

		let data = read_bytes(bytes, TILE_BLOCK.field("data"), offset)?;
		let stored = read_bytes(bytes, TILE_BLOCK.field("hash"), offset)?;
		let computed = TileBlock::hash_of(&data);

		if stored.as_slice() != computed {
			bail!(MapTilesError::HashMismatch {
				offset,
				expected: stored.as_hex(),
				actual: Blob::from(&computed).as_hex(),
			});
		}

		Ok(TileBlock { data, hash: computed })
	}
}

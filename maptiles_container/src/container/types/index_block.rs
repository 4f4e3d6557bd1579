//! This module defines the `IndexBlock` struct, a fixed-size table of offsets for the `4^depth` quadkeys that lie
//! `depth` levels below its `first_quadkey`.
//!
//! A block only answers for its own leaf level. Quadkeys above that level are delegated to the parent block,
//! quadkeys below it to the child block linked from the slot of their ancestor.
//!
//! ```rust
//! use maptiles_container::{EntryWidth, IndexBlock, Quadkey, Resolution};
//!
//! let mut block = IndexBlock::create_root(Quadkey::root(), 1, EntryWidth::Four).unwrap();
//! assert_eq!(block.data_len(), 16);
//!
//! let quadkey = Quadkey::parse("2").unwrap();
//! block.insert(&quadkey, 1234).unwrap();
//! assert_eq!(block.resolve(&quadkey).unwrap(), Resolution::Tile(1234));
//! ```

use super::{EntryWidth, IndexEntry};
use crate::{
	MapTilesError, Quadkey,
	codec::{read_bytes, read_text, read_uint, write_field},
	schema::{FieldValue, INDEX_BLOCK, INDEX_HEADER_LENGTH, INDEX_BLOCK_TAG},
};
use anyhow::{Result, bail, ensure};
use log::trace;
use maptiles_core::{Blob, ByteRange, io::DataReader};

/// Outcome of looking up a quadkey in a single index block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
	/// The quadkey is stored in a tile block at this offset.
	Tile(u64),
	/// The quadkey is covered by this block but has no tile.
	Absent,
	/// Continue in the child index block at this offset.
	Child(u64),
	/// Continue in the parent index block at this offset.
	Parent(u64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct IndexBlock {
	pub entry_width: EntryWidth,
	pub depth: u8,
	pub first_quadkey: Quadkey,
	pub parent_offset: Option<u64>,
	data: Blob,
}

impl IndexBlock {
	/// Creates a block with an empty data region.
	///
	/// Fails with [`MapTilesError::FieldOverflow`] if the block would not fit a 32-bit length.
	pub fn new(
		first_quadkey: Quadkey,
		depth: u8,
		entry_width: EntryWidth,
		parent_offset: Option<u64>,
	) -> Result<IndexBlock> {
		let block_len = INDEX_HEADER_LENGTH as u64 + IndexBlock::data_len_for(depth, entry_width);
		if depth > 23 || block_len > u64::from(u32::MAX) {
			bail!(MapTilesError::field_overflow(
				"index_block",
				"data",
				u32::MAX as usize,
				format!("depth {depth} with {entry_width}-byte entries is too large")
			));
		}
		Ok(IndexBlock {
			entry_width,
			depth,
			first_quadkey,
			parent_offset,
			data: Blob::new_sized((block_len as usize) - INDEX_HEADER_LENGTH),
		})
	}

	/// Creates a block without parent.
	pub fn create_root(first_quadkey: Quadkey, depth: u8, entry_width: EntryWidth) -> Result<IndexBlock> {
		IndexBlock::new(first_quadkey, depth, entry_width, None)
	}

	/// Size of the data region: `4^depth × entry_width` bytes.
	#[must_use]
	pub fn data_len_for(depth: u8, entry_width: EntryWidth) -> u64 {
		4u64.saturating_pow(u32::from(depth)).saturating_mul(entry_width.bytes() as u64)
	}

	#[must_use]
	pub fn data_len(&self) -> u64 {
		self.data.len()
	}

	#[must_use]
	pub fn block_len(&self) -> u64 {
		INDEX_HEADER_LENGTH as u64 + self.data.len()
	}

	#[must_use]
	pub fn slot_count(&self) -> usize {
		4usize.pow(u32::from(self.depth))
	}

	/// Zoom level of the quadkeys stored in this block.
	#[must_use]
	pub fn leaf_level(&self) -> usize {
		self.first_quadkey.level() + self.depth as usize
	}

	#[must_use]
	pub fn entry(&self, slot: usize) -> IndexEntry {
		IndexEntry::read(self.data.as_slice(), slot, self.entry_width)
	}

	pub fn set_entry(&mut self, slot: usize, entry: IndexEntry) -> Result<()> {
		ensure!(
			slot < self.slot_count(),
			"slot {slot} is outside of an index block with {} slots",
			self.slot_count()
		);
		entry.write(self.data.as_mut_slice(), slot, self.entry_width)
	}

	/// Stores a tile offset for a quadkey at the leaf level of this block.
	pub fn insert(&mut self, quadkey: &Quadkey, tile_offset: u64) -> Result<()> {
		let slot = quadkey.slot_in(&self.first_quadkey, self.depth)?;
		self.set_entry(slot, IndexEntry::Tile(tile_offset))
	}

	/// Looks up a quadkey in this block.
	///
	/// Fails with [`MapTilesError::QuadkeyOutOfRange`] if the quadkey belongs to a parent block but there is none,
	/// or if the quadkey contains digit `4`.
	pub fn resolve(&self, quadkey: &Quadkey) -> Result<Resolution> {
		let leaf_level = self.leaf_level();

		if !quadkey.is_within(&self.first_quadkey) || quadkey.level() < leaf_level {
			return match self.parent_offset {
				Some(offset) => Ok(Resolution::Parent(offset)),
				None => bail!(MapTilesError::out_of_range(quadkey)),
			};
		}

		if quadkey.level() == leaf_level {
			let slot = quadkey.slot_in(&self.first_quadkey, self.depth)?;
			return Ok(match self.entry(slot) {
				IndexEntry::Tile(offset) => Resolution::Tile(offset),
				IndexEntry::Link(offset) => Resolution::Child(offset),
				IndexEntry::Absent => Resolution::Absent,
			});
		}

		let Some(ancestor) = quadkey.ancestor(leaf_level) else {
			bail!(MapTilesError::out_of_range(quadkey))
		};
		let slot = ancestor.slot_in(&self.first_quadkey, self.depth)?;
		Ok(match self.entry(slot) {
			IndexEntry::Link(offset) => Resolution::Child(offset),
			IndexEntry::Tile(_) | IndexEntry::Absent => Resolution::Absent,
		})
	}

	pub fn to_blob(&self) -> Result<Blob> {
		let mut block = vec![0u8; self.block_len() as usize];
		let mut put = |name: &str, value: FieldValue| write_field(&mut block, INDEX_BLOCK.field(name), &value);

		put("type", FieldValue::Bytes(Blob::from(INDEX_BLOCK_TAG)))?;
		put("entry_length", FieldValue::UInt(self.entry_width.bytes() as u64))?;
		put("depth", FieldValue::UInt(u64::from(self.depth)))?;
		put("first_quadkey", FieldValue::Text(self.first_quadkey.to_string()))?;
		put("parent_offset", FieldValue::UInt(self.parent_offset.unwrap_or(0)))?;
		put("data", FieldValue::Bytes(self.data.clone()))?;

		Ok(Blob::from(block))
	}

	/// Parses a complete index block located at `offset`.
	pub fn from_blob(blob: &Blob, offset: u64) -> Result<IndexBlock> {
		let mut block = IndexBlock::from_header(blob.as_slice(), offset)?;
		let expected = INDEX_HEADER_LENGTH as u64 + IndexBlock::data_len_for(block.depth, block.entry_width);
		if blob.len() != expected {
			bail!(MapTilesError::corrupt(
				"index_block",
				offset,
				format!(
					"block has {} bytes but depth {} with {}-byte entries needs {expected}",
					blob.len(),
					block.depth,
					block.entry_width,
				)
			));
		}
		block.data = Blob::from(&blob.as_slice()[INDEX_HEADER_LENGTH..]);
		Ok(block)
	}

	/// Reads the index block at `offset`.
	pub async fn from_reader(reader: &DataReader, offset: u64) -> Result<IndexBlock> {
		let size = reader.get_size();
		let header_range = ByteRange::new(offset, INDEX_HEADER_LENGTH as u64);
		if header_range.end() > size {
			bail!(MapTilesError::corrupt(
				"index_block",
				offset,
				format!("header {header_range} is outside of a file with {size} bytes")
			));
		}
		let header = reader.read_range(&header_range).await?;
		let mut block = IndexBlock::from_header(header.as_slice(), offset)?;

		let data_range = ByteRange::new(
			header_range.end(),
			IndexBlock::data_len_for(block.depth, block.entry_width),
		);
		if data_range.end() > size {
			bail!(MapTilesError::corrupt(
				"index_block",
				offset,
				format!("data {data_range} is outside of a file with {size} bytes")
			));
		}
		trace!("read index block at {offset}: {} {data_range}", block.first_quadkey);
		block.data = reader.read_range(&data_range).await?;
		Ok(block)
	}

	/// Parses the fixed fields. The data region of the returned block is left empty for the caller to fill.
	fn from_header(bytes: &[u8], offset: u64) -> Result<IndexBlock> {
		if bytes.len() < INDEX_HEADER_LENGTH {
			bail!(MapTilesError::corrupt(
				"index_block",
				offset,
				format!("block has {} bytes, less than its {INDEX_HEADER_LENGTH}-byte header", bytes.len())
			));
		}
		let header = &bytes[..INDEX_HEADER_LENGTH];
		let field = |name: &str| INDEX_BLOCK.field(name);

		read_bytes(header, field("type"), offset)?;
		let entry_width = EntryWidth::from_bytes(read_uint(header, field("entry_length"), offset)?)?;
		let depth = read_uint(header, field("depth"), offset)? as u8;
		let first_quadkey = Quadkey::parse(&read_text(header, field("first_quadkey"), offset)?)?;
		let parent_offset = match read_uint(header, field("parent_offset"), offset)? {
			0 => None,
			parent => Some(parent),
		};

		Ok(IndexBlock {
			entry_width,
			depth,
			first_quadkey,
			parent_offset,
			data: Blob::new_empty(),
		})
	}
}

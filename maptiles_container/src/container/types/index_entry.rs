//! Slots of an index block's data region.
//!
//! A slot holds zero when no tile is stored, a tile block offset, or an offset of a child index block marked
//! by the highest bit of the entry (bit 31 for 4-byte entries, bit 63 for 8-byte entries).

use crate::MapTilesError;
use anyhow::{Result, bail};
use byteorder::{BigEndian, ByteOrder};
use std::fmt;

/// Byte width of the entries of an index block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EntryWidth {
	/// 32-bit entries. Offsets are limited to 2 GiB.
	#[default]
	Four,
	/// 64-bit entries.
	Eight,
}

impl EntryWidth {
	#[must_use]
	pub fn bytes(&self) -> usize {
		match self {
			EntryWidth::Four => 4,
			EntryWidth::Eight => 8,
		}
	}

	pub fn from_bytes(bytes: u64) -> Result<EntryWidth> {
		Ok(match bytes {
			4 => EntryWidth::Four,
			8 => EntryWidth::Eight,
			_ => bail!(MapTilesError::schema_violation(
				"index_block",
				"entry_length",
				1,
				format!("{bytes} is not one of [4, 8]")
			)),
		})
	}

	fn link_flag(&self) -> u64 {
		match self {
			EntryWidth::Four => 1 << 31,
			EntryWidth::Eight => 1 << 63,
		}
	}
}

impl fmt::Display for EntryWidth {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.bytes())
	}
}

/// Decoded content of one slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexEntry {
	Absent,
	Tile(u64),
	Link(u64),
}

impl IndexEntry {
	/// Encodes the entry, failing with [`MapTilesError::FieldOverflow`] if the offset does not fit below the link bit.
	pub fn encode(&self, width: EntryWidth) -> Result<u64> {
		let flag = width.link_flag();
		let (offset, raw) = match *self {
			IndexEntry::Absent => return Ok(0),
			IndexEntry::Tile(offset) => (offset, offset),
			IndexEntry::Link(offset) => (offset, offset | flag),
		};
		if offset == 0 || offset >= flag {
			bail!(MapTilesError::field_overflow(
				"index_block",
				"data",
				width.bytes(),
				format!("offset {offset} cannot be stored in a {width}-byte entry")
			));
		}
		Ok(raw)
	}

	#[must_use]
	pub fn decode(raw: u64, width: EntryWidth) -> IndexEntry {
		let flag = width.link_flag();
		if raw == 0 {
			IndexEntry::Absent
		} else if raw & flag != 0 {
			IndexEntry::Link(raw & !flag)
		} else {
			IndexEntry::Tile(raw)
		}
	}

	/// Reads the entry stored in `slot` of a data region.
	#[must_use]
	pub fn read(data: &[u8], slot: usize, width: EntryWidth) -> IndexEntry {
		let start = slot * width.bytes();
		let raw = match width {
			EntryWidth::Four => u64::from(BigEndian::read_u32(&data[start..start + 4])),
			EntryWidth::Eight => BigEndian::read_u64(&data[start..start + 8]),
		};
		IndexEntry::decode(raw, width)
	}

	/// Writes the entry into `slot` of a data region.
	pub fn write(&self, data: &mut [u8], slot: usize, width: EntryWidth) -> Result<()> {
		let raw = self.encode(width)?;
		let start = slot * width.bytes();
		match width {
			EntryWidth::Four => BigEndian::write_u32(&mut data[start..start + 4], raw as u32),
			EntryWidth::Eight => BigEndian::write_u64(&mut data[start..start + 8], raw),
		}
		Ok(())
	}
}

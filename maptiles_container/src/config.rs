//! Settings for writing and reading containers.

use crate::{EntryWidth, IndexBlock, schema::INDEX_HEADER_LENGTH};
use anyhow::{Result, ensure};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriterConfig {
	/// Width of the offsets stored in index blocks. 4-byte entries keep the index small but limit the container
	/// to offsets below 2 GiB.
	pub entry_width: EntryWidth,
	/// Number of zoom levels covered by one index block.
	pub index_depth: u8,
}

impl WriterConfig {
	#[must_use]
	pub fn new(entry_width: EntryWidth, index_depth: u8) -> WriterConfig {
		WriterConfig {
			entry_width,
			index_depth,
		}
	}

	/// Checks that index blocks of this shape can be written.
	pub fn validate(&self) -> Result<()> {
		ensure!(
			(1..=23).contains(&self.index_depth),
			"index_depth must be between 1 and 23, got {}",
			self.index_depth
		);
		let block_len = INDEX_HEADER_LENGTH as u64 + IndexBlock::data_len_for(self.index_depth, self.entry_width);
		ensure!(
			block_len <= u64::from(u32::MAX),
			"index blocks of depth {} with {}-byte entries would need {block_len} bytes",
			self.index_depth,
			self.entry_width
		);
		Ok(())
	}
}

impl Default for WriterConfig {
	fn default() -> Self {
		Self {
			entry_width: EntryWidth::Four,
			index_depth: 4,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReaderConfig {
	/// Maximum number of parsed index blocks kept in memory.
	pub index_cache_size: usize,
}

impl Default for ReaderConfig {
	fn default() -> Self {
		Self { index_cache_size: 1024 }
	}
}

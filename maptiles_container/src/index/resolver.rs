//! Quadkey lookups against the index blocks of an open container.

use crate::{IndexBlock, MapTilesError, Quadkey, Resolution};
use anyhow::{Context, Result, bail};
use futures::lock::Mutex;
use log::trace;
use maptiles_core::{LimitedCache, io::DataReader};
use std::{fmt::Debug, sync::Arc};

/// Upper bound of blocks visited for one lookup. A well-formed index needs about `2 * level / depth + depth`.
pub const MAX_INDEX_HOPS: usize = 1024;

/// Walks the index from the root block, caching parsed blocks by offset.
pub struct IndexResolver {
	cache: Mutex<LimitedCache<u64, Arc<IndexBlock>>>,
}

impl IndexResolver {
	#[must_use]
	pub fn new(cache_size: usize) -> IndexResolver {
		IndexResolver {
			cache: Mutex::new(LimitedCache::with_maximum_length(cache_size.max(1))),
		}
	}

	/// Returns the index block at `offset`, reading it if it is not cached.
	///
	/// The cache is not locked while reading, so concurrent lookups may read the same block twice.
	pub async fn load(&self, reader: &DataReader, offset: u64) -> Result<Arc<IndexBlock>> {
		if let Some(block) = self.cache.lock().await.get(&offset) {
			return Ok(block);
		}

		let block = Arc::new(IndexBlock::from_reader(reader, offset).await?);
		Ok(self.cache.lock().await.add(offset, block))
	}

	/// Resolves a quadkey to the offset of its tile block, starting at the root index block.
	///
	/// Returns `Ok(None)` if no tile is stored for the quadkey.
	pub async fn resolve(&self, reader: &DataReader, root_offset: u64, quadkey: &Quadkey) -> Result<Option<u64>> {
		if !quadkey.is_addressable() {
			bail!(MapTilesError::out_of_range(quadkey));
		}

		let mut offset = root_offset;
		for _ in 0..MAX_INDEX_HOPS {
			let block = self
				.load(reader, offset)
				.await
				.with_context(|| MapTilesError::corrupt("index_block", offset, format!("while resolving {quadkey}")))?;

			match block.resolve(quadkey)? {
				Resolution::Tile(tile_offset) => {
					trace!("resolved {quadkey} to tile block at {tile_offset}");
					return Ok(Some(tile_offset));
				}
				Resolution::Absent => return Ok(None),
				Resolution::Child(next) | Resolution::Parent(next) => {
					if next == offset {
						bail!(MapTilesError::corrupt(
							"index_block",
							offset,
							"block refers to itself"
						));
					}
					offset = next;
				}
			}
		}

		bail!(MapTilesError::corrupt(
			"index_block",
			root_offset,
			format!("no result for {quadkey} after {MAX_INDEX_HOPS} index blocks")
		))
	}
}

impl Debug for IndexResolver {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("IndexResolver").finish_non_exhaustive()
	}
}

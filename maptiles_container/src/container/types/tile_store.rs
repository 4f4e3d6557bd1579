//! Content-addressed storage of tile payloads.
//!
//! While writing, `TileStore` remembers the offset of every stored payload by its MD5 digest, so identical
//! payloads are written only once. Reading needs no state and is available as [`TileStore::get`].

use super::{TileBlock, TileHash, read_block};
use crate::schema::TILE_BLOCK;
use anyhow::{Result, ensure};
use log::trace;
use maptiles_core::{
	Blob,
	io::{DataReader, DataWriterTrait},
};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct TileStore {
	offsets: HashMap<TileHash, u64>,
	unique_tiles: u64,
	duplicate_tiles: u64,
}

impl TileStore {
	#[must_use]
	pub fn new() -> TileStore {
		TileStore::default()
	}

	/// Stores a payload and returns the offset of its tile block. An identical payload stored earlier is reused.
	pub fn put<W: DataWriterTrait + ?Sized>(&mut self, writer: &mut W, payload: &Blob) -> Result<u64> {
		let block = TileBlock::new(payload.clone());

		if let Some(offset) = self.offsets.get(&block.hash) {
			self.duplicate_tiles += 1;
			trace!("reuse tile block at {offset} for {} bytes", payload.len());
			return Ok(*offset);
		}

		let blob = block.to_blob()?;
		let range = writer.append(&blob)?;
		ensure!(range.length == blob.len(), "short write of tile block at {}", range.offset);
		trace!("append tile block {range}");

		self.offsets.insert(block.hash, range.offset);
		self.unique_tiles += 1;
		Ok(range.offset)
	}

	/// Reads the tile block at `offset` and returns its verified payload.
	pub async fn get(reader: &DataReader, offset: u64) -> Result<Blob> {
		let blob = read_block(reader, &TILE_BLOCK, offset).await?;
		Ok(TileBlock::from_blob(&blob, offset)?.data)
	}

	/// Number of distinct payloads written.
	#[must_use]
	pub fn unique_tiles(&self) -> u64 {
		self.unique_tiles
	}

	/// Number of `put` calls answered by an existing tile block.
	#[must_use]
	pub fn duplicate_tiles(&self) -> u64 {
		self.duplicate_tiles
	}
}

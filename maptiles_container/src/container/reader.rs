//! Reading MapTiles containers.
//!
//! Opening a container reads the header, the metadata block and the root index block, in that order. Tiles are
//! looked up by walking the index from the root; parsed index blocks are cached, so repeated lookups in the same
//! area only read the tile block itself. Every tile payload is verified against its stored MD5 hash.
//!
//! ```no_run
//! use maptiles_container::ContainerReader;
//! use anyhow::Result;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//! 	let reader = ContainerReader::open_path(Path::new("/data/berlin.maptiles")).await?;
//! 	println!("name: {:?}", reader.metadata().name);
//!
//! 	if let Some(tile) = reader.lookup_tile("1202102332").await? {
//! 		println!("tile: {} bytes", tile.len());
//! 	}
//! 	Ok(())
//! }
//! ```

use super::types::{AdditionalMetadataBlock, FileHeader, MetadataBlock, TileStore};
use crate::{IndexResolver, MapTilesError, Quadkey, ReaderConfig};
use anyhow::{Context, Result, bail};
use log::{debug, trace};
use maptiles_core::{
	Blob,
	io::{DataReader, DataReaderFile},
};
use std::{collections::HashSet, fmt, path::Path};

/// Progress of opening a container. Errors while opening name the stage that was reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReaderStage {
	Start,
	HeaderRead,
	MetadataRead,
	RootIndexLoaded,
	Ready,
}

impl fmt::Display for ReaderStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			ReaderStage::Start => "start",
			ReaderStage::HeaderRead => "header read",
			ReaderStage::MetadataRead => "metadata read",
			ReaderStage::RootIndexLoaded => "root index loaded",
			ReaderStage::Ready => "ready",
		})
	}
}

/// An open MapTiles container. Lookups take `&self` and may run concurrently.
#[derive(Debug)]
pub struct ContainerReader {
	reader: DataReader,
	header: FileHeader,
	metadata: MetadataBlock,
	root_offset: u64,
	resolver: IndexResolver,
	stage: ReaderStage,
}

impl ContainerReader {
	/// Opens a container file. The path must be absolute.
	pub async fn open_path(path: &Path) -> Result<ContainerReader> {
		ContainerReader::open_reader(DataReaderFile::open(path)?, ReaderConfig::default()).await
	}

	/// Opens a container from any `DataReader`.
	///
	/// Failures are reported as [`MapTilesError::CorruptContainer`] naming the block and offset that could not be
	/// read; the underlying error is the root cause of the returned error.
	pub async fn open_reader(reader: DataReader, config: ReaderConfig) -> Result<ContainerReader> {
		let size = reader.get_size();
		debug!("open {} ({size} bytes)", reader.get_name());
		let opening = |stage: ReaderStage, block: &'static str, offset: u64| {
			move || MapTilesError::corrupt(block, offset, format!("failed to open container after stage \"{stage}\""))
		};

		let mut stage = ReaderStage::Start;
		let header = FileHeader::from_reader(&reader)
			.await
			.with_context(opening(stage, "header", 0))?;
		let metadata_offset = u64::from(header.metadata_offset);
		if metadata_offset >= size {
			return Err(MapTilesError::corrupt(
				"header",
				9,
				format!("metadata offset {metadata_offset} is outside of a file with {size} bytes"),
			))
			.with_context(opening(stage, "header", 0));
		}
		stage = ReaderStage::HeaderRead;
		debug!("{stage}: version {}, metadata at {metadata_offset}", header.version);

		let (metadata, metadata_size) = MetadataBlock::from_reader(&reader, metadata_offset)
			.await
			.with_context(opening(stage, "metadata", metadata_offset))?;
		stage = ReaderStage::MetadataRead;
		debug!("{stage}: {metadata_size} bytes");

		let root_offset = metadata_offset + metadata_size;
		let resolver = IndexResolver::new(config.index_cache_size);
		let root = resolver
			.load(&reader, root_offset)
			.await
			.with_context(opening(stage, "index_block", root_offset))?;
		if !root.first_quadkey.is_root() {
			return Err(MapTilesError::corrupt(
				"index_block",
				root_offset + 3,
				format!("root index block starts at quadkey \"{}\"", root.first_quadkey),
			))
			.with_context(opening(stage, "index_block", root_offset));
		}
		stage = ReaderStage::RootIndexLoaded;
		debug!(
			"{stage}: depth {} with {}-byte entries at {root_offset}",
			root.depth, root.entry_width
		);

		stage = ReaderStage::Ready;
		debug!("{stage}");
		Ok(ContainerReader {
			reader,
			header,
			metadata,
			root_offset,
			resolver,
			stage,
		})
	}

	#[must_use]
	pub fn header(&self) -> &FileHeader {
		&self.header
	}

	#[must_use]
	pub fn metadata(&self) -> &MetadataBlock {
		&self.metadata
	}

	/// Offset of the root index block.
	#[must_use]
	pub fn root_offset(&self) -> u64 {
		self.root_offset
	}

	#[must_use]
	pub fn stage(&self) -> ReaderStage {
		self.stage
	}

	#[must_use]
	pub fn name(&self) -> &str {
		self.reader.get_name()
	}

	/// Looks up a tile by its quadkey.
	///
	/// Fails with [`MapTilesError::SchemaViolation`] for malformed quadkeys and with
	/// [`MapTilesError::QuadkeyOutOfRange`] for quadkeys containing digit `4`.
	pub async fn lookup_tile(&self, quadkey: &str) -> Result<Option<Blob>> {
		self.lookup_quadkey(&Quadkey::parse(quadkey)?).await
	}

	pub async fn lookup_quadkey(&self, quadkey: &Quadkey) -> Result<Option<Blob>> {
		let Some(offset) = self.resolver.resolve(&self.reader, self.root_offset, quadkey).await? else {
			trace!("no tile for {quadkey}");
			return Ok(None);
		};
		Ok(Some(TileStore::get(&self.reader, offset).await?))
	}

	/// Looks up a tile by zoom level and column/row.
	pub async fn lookup_tile_coord(&self, level: u8, x: u32, y: u32) -> Result<Option<Blob>> {
		self.lookup_quadkey(&Quadkey::from_tile(level, x, y)?).await
	}

	/// Reads the payloads of the additional metadata chain, in chain order.
	pub async fn additional_metadata(&self) -> Result<Vec<Blob>> {
		let mut payloads = Vec::new();
		let mut visited = HashSet::new();
		let mut next = self.metadata.additional_metadata_offset;

		while let Some(offset) = next {
			if !visited.insert(offset) {
				bail!(MapTilesError::corrupt(
					"additional_metadata",
					offset,
					"the chain of additional metadata blocks contains a cycle"
				));
			}
			let block = AdditionalMetadataBlock::from_reader(&self.reader, offset).await?;
			trace!("additional metadata at {offset}: {} bytes", block.payload.len());
			payloads.push(block.payload);
			next = block.next_offset;
		}

		Ok(payloads)
	}
}

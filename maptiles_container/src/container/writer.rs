//! Writing MapTiles containers.
//!
//! The writer lays out a container in a single pass: header, a reserved metadata block and a reserved root
//! index block come first, followed by the tile blocks in the order they are written. `finalize` appends the
//! remaining index blocks and the additional metadata chain, then patches the reserved blocks.
//!
//! ```no_run
//! use maptiles_container::{ContainerWriter, MetadataBlock, WriterConfig};
//! use maptiles_core::Blob;
//! use anyhow::Result;
//! use std::path::Path;
//!
//! fn main() -> Result<()> {
//! 	let metadata = MetadataBlock {
//! 		name: Some("Berlin".to_string()),
//! 		tile_mime_type: Some("image/png".to_string()),
//! 		..MetadataBlock::default()
//! 	};
//! 	let mut writer = ContainerWriter::write_to_path(Path::new("/tmp/berlin.maptiles"), metadata, WriterConfig::default())?;
//! 	writer.write_tile("1202", &Blob::from(vec![0x89, b'P', b'N', b'G']))?;
//! 	writer.write_tile_coord(14, 8800, 5373, &Blob::from(vec![0x89, b'P', b'N', b'G']))?;
//! 	writer.finalize()?;
//! 	Ok(())
//! }
//! ```

use super::types::{AdditionalMetadataBlock, FileHeader, IndexBlock, MetadataBlock, TileStore};
use crate::{IndexTree, MapTilesError, Quadkey, WriterConfig, schema::HEADER_LENGTH};
use anyhow::{Context, Result, bail, ensure};
use log::{debug, trace};
use maptiles_core::{
	Blob,
	io::{DataWriterFile, DataWriterTrait},
};
use std::{fmt, path::Path};

/// Progress of writing a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriterStage {
	Start,
	HeaderWritten,
	MetadataWritten,
	RootIndexAllocated,
	Writing,
	Finalized,
}

impl fmt::Display for WriterStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			WriterStage::Start => "start",
			WriterStage::HeaderWritten => "header written",
			WriterStage::MetadataWritten => "metadata written",
			WriterStage::RootIndexAllocated => "root index allocated",
			WriterStage::Writing => "writing",
			WriterStage::Finalized => "finalized",
		})
	}
}

/// Writes a container into a `DataWriterTrait`. The file is only valid after [`ContainerWriter::finalize`].
pub struct ContainerWriter<W: DataWriterTrait> {
	writer: W,
	metadata: MetadataBlock,
	additional_metadata: Vec<Blob>,
	index: IndexTree,
	store: TileStore,
	metadata_offset: u64,
	root_offset: u64,
	stage: WriterStage,
}

impl ContainerWriter<DataWriterFile> {
	/// Creates a container file. The path must be absolute.
	pub fn write_to_path(
		path: &Path,
		metadata: MetadataBlock,
		config: WriterConfig,
	) -> Result<ContainerWriter<DataWriterFile>> {
		let writer = DataWriterFile::from_path(path).with_context(|| format!("creating {path:?}"))?;
		ContainerWriter::new(writer, metadata, config)
	}
}

impl<W: DataWriterTrait> ContainerWriter<W> {
	/// Starts a container at the beginning of an empty writer.
	pub fn new(mut writer: W, metadata: MetadataBlock, config: WriterConfig) -> Result<ContainerWriter<W>> {
		let index = IndexTree::new(&config)?;
		ensure!(
			writer.get_position()? == 0,
			"a container must be written from the start of an empty writer"
		);

		let mut stage = WriterStage::Start;
		let header = FileHeader::new(HEADER_LENGTH as u32).to_blob()?;
		writer.append(&header)?;
		stage = stage.advance(WriterStage::HeaderWritten);

		let metadata_range = writer.append(&MetadataBlock::default().to_blob()?)?;
		stage = stage.advance(WriterStage::MetadataWritten);

		let root = IndexBlock::create_root(Quadkey::root(), config.index_depth, config.entry_width)?;
		let root_range = writer.append(&root.to_blob()?)?;
		stage = stage.advance(WriterStage::RootIndexAllocated);
		debug!(
			"reserved metadata {metadata_range} and root index {root_range} (depth {}, {}-byte entries)",
			config.index_depth, config.entry_width
		);

		Ok(ContainerWriter {
			writer,
			metadata,
			additional_metadata: Vec::new(),
			index,
			store: TileStore::new(),
			metadata_offset: metadata_range.offset,
			root_offset: root_range.offset,
			stage,
		})
	}

	#[must_use]
	pub fn stage(&self) -> WriterStage {
		self.stage
	}

	#[must_use]
	pub fn metadata(&self) -> &MetadataBlock {
		&self.metadata
	}

	/// Replaces the metadata written at finalize.
	pub fn set_metadata(&mut self, metadata: MetadataBlock) -> Result<()> {
		self.ensure_open()?;
		self.metadata = metadata;
		Ok(())
	}

	/// Stores a tile. Writing a quadkey again replaces the earlier tile, whose bytes stay in the file unreferenced.
	///
	/// Fails with [`MapTilesError::SchemaViolation`] for malformed quadkeys and with
	/// [`MapTilesError::QuadkeyOutOfRange`] for quadkeys containing digit `4`.
	pub fn write_tile(&mut self, quadkey: &str, payload: &Blob) -> Result<()> {
		self.ensure_open()?;
		self.write_quadkey(&Quadkey::parse(quadkey)?, payload)
	}

	/// Stores a tile addressed by zoom level and column/row.
	pub fn write_tile_coord(&mut self, level: u8, x: u32, y: u32, payload: &Blob) -> Result<()> {
		self.ensure_open()?;
		self.write_quadkey(&Quadkey::from_tile(level, x, y)?, payload)
	}

	pub fn write_quadkey(&mut self, quadkey: &Quadkey, payload: &Blob) -> Result<()> {
		self.ensure_open()?;
		if !quadkey.is_addressable() {
			bail!(MapTilesError::out_of_range(quadkey));
		}

		let offset = self.store.put(&mut self.writer, payload)?;
		self.index.insert(quadkey, offset)?;
		trace!("tile {quadkey} at {offset}");

		if self.stage != WriterStage::Writing {
			self.stage = self.stage.advance(WriterStage::Writing);
		}
		Ok(())
	}

	/// Queues a payload for the additional metadata chain. Payloads are chained in the order they are added.
	pub fn add_additional_metadata(&mut self, payload: Blob) -> Result<()> {
		self.ensure_open()?;
		self.additional_metadata.push(payload);
		Ok(())
	}

	/// Writes the index and the additional metadata chain and completes the reserved blocks.
	pub fn finalize(&mut self) -> Result<()> {
		self.ensure_open()?;

		let start = self.writer.get_position()?;
		let blocks = self.index.layout(self.root_offset, start)?;
		debug!(
			"write {} index blocks for {} tiles from {start} on",
			blocks.len(),
			self.index.tile_count()
		);
		for (offset, block) in blocks {
			let blob = block.to_blob()?;
			if offset == self.root_offset {
				self.writer.write_at(offset, &blob)?;
				continue;
			}
			let range = self.writer.append(&blob)?;
			ensure!(
				range.offset == offset,
				"index block planned at {offset} was written at {}",
				range.offset
			);
			trace!("index block {} depth {} at {range}", block.first_quadkey, block.depth);
		}

		// The chain is written back to front, so every block knows the offset of its successor.
		let mut next = None;
		for payload in self.additional_metadata.iter().rev() {
			let block = AdditionalMetadataBlock::new(payload.clone(), next);
			let range = self.writer.append(&block.to_blob()?)?;
			trace!("additional metadata at {range}");
			next = Some(range.offset);
		}
		self.metadata.additional_metadata_offset = next;

		let metadata = self.metadata.to_blob()?;
		self.writer.write_at(self.metadata_offset, &metadata)?;
		self.writer.flush()?;

		self.stage = self.stage.advance(WriterStage::Finalized);
		debug!(
			"finalized: {} unique tiles, {} duplicates, {} bytes",
			self.store.unique_tiles(),
			self.store.duplicate_tiles(),
			self.writer.get_position()?
		);
		Ok(())
	}

	/// Returns the underlying writer.
	pub fn into_inner(self) -> W {
		self.writer
	}

	fn ensure_open(&self) -> Result<()> {
		if self.stage == WriterStage::Finalized {
			bail!(MapTilesError::WriterClosed);
		}
		Ok(())
	}
}

impl WriterStage {
	fn advance(self, next: WriterStage) -> WriterStage {
		debug!("writer: {self} -> {next}");
		next
	}
}

impl<W: DataWriterTrait> fmt::Debug for ContainerWriter<W> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ContainerWriter")
			.field("stage", &self.stage)
			.field("metadata_offset", &self.metadata_offset)
			.field("root_offset", &self.root_offset)
			.field("index", &self.index)
			.field("store", &self.store)
			.finish_non_exhaustive()
	}
}

//! MapTiles container files.
//!
//! A container starts with a 13-byte header followed by the metadata block and the root index block. Tile
//! blocks, further index blocks and the additional metadata chain follow in the order they were written.
//!
//! ```rust
//! use maptiles_container::*;
//! use maptiles_core::{Blob, io::{DataReaderBlob, DataWriterBlob}};
//! use anyhow::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//! 	let mut writer = ContainerWriter::new(DataWriterBlob::new()?, MetadataBlock::default(), WriterConfig::default())?;
//! 	writer.write_tile("0231", &Blob::from("tile"))?;
//! 	writer.finalize()?;
//!
//! 	let data = Box::new(DataReaderBlob::from(writer.into_inner()));
//! 	let reader = ContainerReader::open_reader(data, ReaderConfig::default()).await?;
//! 	assert_eq!(reader.lookup_tile("0231").await?, Some(Blob::from("tile")));
//! 	assert_eq!(reader.lookup_tile("0232").await?, None);
//! 	Ok(())
//! }
//! ```

mod reader;
mod writer;
pub mod types;

pub use reader::*;
pub use types::*;
pub use writer::*;

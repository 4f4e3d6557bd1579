//! This module provides functionality for writing container bytes to files.
//!
//! # Examples
//!
//! ```rust
//! use maptiles_core::{io::{DataWriterFile, DataWriterTrait}, Blob};
//! use anyhow::Result;
//!
//! fn main() -> Result<()> {
//!     let path = std::env::temp_dir().join("maptiles_data_writer_doc.bin");
//!     let mut writer = DataWriterFile::from_path(&path)?;
//!
//!     writer.append(&Blob::from(vec![1, 2, 3, 4]))?;
//!     writer.write_at(0, &Blob::from(vec![5, 6]))?;
//!     writer.flush()?;
//!     assert_eq!(std::fs::read(&path)?, vec![5, 6, 3, 4]);
//!
//!     std::fs::remove_file(&path)?;
//!     Ok(())
//! }
//! ```

use super::DataWriterTrait;
use crate::{Blob, ByteRange};
use anyhow::{Context, Result, ensure};
use log::trace;
use std::{
	fs::File,
	io::{BufWriter, Seek, SeekFrom, Write},
	path::Path,
};

/// A struct that provides writing capabilities to a file.
pub struct DataWriterFile {
	writer: BufWriter<File>,
	length: u64,
}

impl DataWriterFile {
	/// Creates (or truncates) the file at `path`.
	///
	/// # Errors
	///
	/// Returns an error if the path is relative or the file cannot be created.
	pub fn from_path(path: &Path) -> Result<DataWriterFile> {
		ensure!(path.is_absolute(), "path {path:?} must be absolute");

		let file = File::create(path).with_context(|| format!("failed to create file {path:?}"))?;
		Ok(DataWriterFile {
			writer: BufWriter::new(file),
			length: 0,
		})
	}
}

impl DataWriterTrait for DataWriterFile {
	fn append(&mut self, blob: &Blob) -> Result<ByteRange> {
		let offset = self.length;
		self.writer.write_all(blob.as_slice())?;
		self.length += blob.len();

		Ok(ByteRange::new(offset, blob.len()))
	}

	fn write_at(&mut self, offset: u64, blob: &Blob) -> Result<()> {
		let range = ByteRange::new(offset, blob.len());
		ensure!(
			range.end() <= self.length,
			"cannot overwrite {range}, only {} bytes have been written",
			self.length
		);
		trace!("overwrite {range}");

		self.writer.seek(SeekFrom::Start(offset))?;
		self.writer.write_all(blob.as_slice())?;
		self.writer.seek(SeekFrom::Start(self.length))?;
		Ok(())
	}

	fn get_position(&mut self) -> Result<u64> {
		Ok(self.length)
	}

	fn flush(&mut self) -> Result<()> {
		self.writer.flush()?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use assert_fs::NamedTempFile;

	#[test]
	fn append_and_get_position() -> Result<()> {
		let temp = NamedTempFile::new("test1")?;
		let mut writer = DataWriterFile::from_path(temp.path())?;

		let range = writer.append(&Blob::from(vec![10, 20, 30]))?;
		assert_eq!(range.to_string(), "[0..3]");
		assert_eq!(writer.get_position()?, 3);

		let range = writer.append(&Blob::from(vec![40]))?;
		assert_eq!(range, ByteRange::new(3, 1));
		writer.flush()?;

		assert_eq!(std::fs::read(temp.path())?, vec![10, 20, 30, 40]);
		Ok(())
	}

	#[test]
	fn write_at_keeps_position() -> Result<()> {
		let temp = NamedTempFile::new("test2")?;
		let mut writer = DataWriterFile::from_path(temp.path())?;

		writer.append(&Blob::from(vec![0, 0, 0, 0]))?;
		writer.write_at(1, &Blob::from(vec![7, 8]))?;
		writer.append(&Blob::from(vec![9]))?;
		assert!(writer.write_at(4, &Blob::from(vec![1, 1])).is_err());
		writer.flush()?;

		assert_eq!(std::fs::read(temp.path())?, vec![0, 7, 8, 0, 9]);
		Ok(())
	}

	#[test]
	fn relative_path_is_rejected() {
		assert!(DataWriterFile::from_path(Path::new("relative.bin")).is_err());
	}
}

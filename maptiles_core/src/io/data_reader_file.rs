//! This module provides functionality for reading container bytes from files.
//!
//! `DataReaderFile` checks that the path exists, is absolute and is a regular file before opening it.
//! Reads are positioned (seek + read) and serialized through a mutex, so one reader can be shared
//! between concurrent lookups. A handle from `File::try_clone` shares the cursor, so cloning is not enough.

use super::DataReaderTrait;
use crate::{Blob, ByteRange};
use anyhow::{Context, Result, anyhow, ensure};
use async_trait::async_trait;
use std::{
	fs::File,
	io::{Read, Seek, SeekFrom},
	path::Path,
	sync::Mutex,
};

/// A struct that provides reading capabilities from a file.
#[derive(Debug)]
pub struct DataReaderFile {
	name: String,
	file: Mutex<File>,
	size: u64,
}

impl DataReaderFile {
	/// Opens a file and creates a `DataReaderFile` instance.
	///
	/// # Errors
	///
	/// Returns an error if the path does not exist, is relative, is not a file, or cannot be opened.
	pub fn open(path: &Path) -> Result<Box<DataReaderFile>> {
		ensure!(path.exists(), "file {path:?} does not exist");
		ensure!(path.is_absolute(), "path {path:?} must be absolute");
		ensure!(path.is_file(), "path {path:?} must be a file");

		let path = path.canonicalize()?;
		let file = File::open(&path).with_context(|| format!("failed to open file {path:?}"))?;
		let size = file.metadata()?.len();

		Ok(Box::new(DataReaderFile {
			name: path.to_string_lossy().into_owned(),
			file: Mutex::new(file),
			size,
		}))
	}

	fn read_at(&self, offset: u64, buffer: &mut [u8]) -> Result<()> {
		let mut file = self
			.file
			.lock()
			.map_err(|_| anyhow!("file handle of '{}' is poisoned", self.name))?;
		file
			.seek(SeekFrom::Start(offset))
			.with_context(|| format!("failed to seek to offset {offset} in file '{}'", self.name))?;
		file.read_exact(buffer).with_context(|| {
			format!(
				"failed to read {} bytes at offset {offset} in file '{}'",
				buffer.len(),
				self.name
			)
		})
	}
}

#[async_trait]
impl DataReaderTrait for DataReaderFile {
	async fn read_range(&self, range: &ByteRange) -> Result<Blob> {
		ensure!(
			range.end() <= self.size,
			"range {range} is outside of file '{}' with {} bytes",
			self.name,
			self.size
		);
		let mut buffer = vec![0; range.length as usize];
		self.read_at(range.offset, &mut buffer)?;
		Ok(Blob::from(buffer))
	}

	fn get_size(&self) -> u64 {
		self.size
	}

	fn get_name(&self) -> &str {
		&self.name
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use assert_fs::NamedTempFile;
	use std::{io::Write, sync::Arc};

	fn hello_file() -> Result<NamedTempFile> {
		let temp_file = NamedTempFile::new("testfile.txt")?;
		let mut file = File::create(&temp_file)?;
		file.write_all(b"Hello, world!")?;
		Ok(temp_file)
	}

	#[tokio::test]
	async fn open() -> Result<()> {
		let temp_file = hello_file()?;
		let invalid_path = NamedTempFile::new("nonexistent.txt")?;

		assert!(DataReaderFile::open(temp_file.path()).is_ok());
		assert!(DataReaderFile::open(invalid_path.path()).is_err());
		assert!(DataReaderFile::open(Path::new("relative/path.bin")).is_err());

		Ok(())
	}

	#[tokio::test]
	async fn read_range() -> Result<()> {
		let temp_file = hello_file()?;
		let reader = DataReaderFile::open(temp_file.path())?;

		let blob = reader.read_range(&ByteRange::new(4, 6)).await?;
		assert_eq!(blob.as_slice(), b"o, wor");
		assert_eq!(reader.get_size(), 13);
		assert!(reader.read_range(&ByteRange::new(10, 6)).await.is_err());

		Ok(())
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_reads_do_not_interleave() -> Result<()> {
		let temp_file = NamedTempFile::new("counting.bin")?;
		let bytes: Vec<u8> = (0..=255u8).cycle().take(64 * 1024).collect();
		File::create(&temp_file)?.write_all(&bytes)?;
		let reader: Arc<DataReaderFile> = Arc::from(DataReaderFile::open(temp_file.path())?);

		let tasks = (0..64u64).map(|i| {
			let reader = Arc::clone(&reader);
			tokio::spawn(async move {
				let offset = (i * 997) % (63 * 1024);
				let blob = reader.read_range(&ByteRange::new(offset, 1024)).await?;
				Ok::<_, anyhow::Error>((offset, blob))
			})
		});
		for task in tasks.collect::<Vec<_>>() {
			let (offset, blob) = task.await??;
			let start = offset as usize;
			assert_eq!(blob.as_slice(), &bytes[start..start + 1024], "offset {offset}");
		}
		Ok(())
	}

	#[tokio::test]
	async fn name_is_canonical_path() -> Result<()> {
		let temp_file = hello_file()?;
		let reader = DataReaderFile::open(temp_file.path())?;
		assert!(reader.get_name().ends_with("testfile.txt"));
		Ok(())
	}
}

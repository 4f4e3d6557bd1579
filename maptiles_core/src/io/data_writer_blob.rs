//! This module provides `DataWriterBlob`, a `DataWriterTrait` that collects everything in memory.

use super::DataWriterTrait;
use crate::{Blob, ByteRange};
use anyhow::{Result, ensure};

/// A struct that provides writing capabilities to an in-memory blob of data.
#[derive(Clone, Debug, Default)]
pub struct DataWriterBlob {
	data: Vec<u8>,
}

impl DataWriterBlob {
	/// Creates a new, empty `DataWriterBlob`.
	pub fn new() -> Result<DataWriterBlob> {
		Ok(DataWriterBlob { data: Vec::new() })
	}

	/// Returns the written data as a slice.
	pub fn as_slice(&self) -> &[u8] {
		&self.data
	}

	/// Converts the writer into a `Blob`.
	pub fn into_blob(self) -> Blob {
		Blob::from(self.data)
	}

	/// Returns the length of the data.
	pub fn len(&self) -> usize {
		self.data.len()
	}

	/// Checks if the writer is empty.
	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}
}

impl DataWriterTrait for DataWriterBlob {
	fn append(&mut self, blob: &Blob) -> Result<ByteRange> {
		let offset = self.data.len() as u64;
		self.data.extend_from_slice(blob.as_slice());
		Ok(ByteRange::new(offset, blob.len()))
	}

	fn write_at(&mut self, offset: u64, blob: &Blob) -> Result<()> {
		let range = ByteRange::new(offset, blob.len());
		ensure!(
			range.end() <= self.data.len() as u64,
			"cannot overwrite {range}, only {} bytes have been written",
			self.data.len()
		);
		self.data[range.as_range_usize()].copy_from_slice(blob.as_slice());
		Ok(())
	}

	fn get_position(&mut self) -> Result<u64> {
		Ok(self.data.len() as u64)
	}
}

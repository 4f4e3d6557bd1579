//! This module provides `DataReaderBlob`, a `DataReaderTrait` over bytes held in memory.
//!
//! It is mostly used to read back containers that were written into a `DataWriterBlob`.

use super::{DataReaderTrait, DataWriterBlob};
use crate::{Blob, ByteRange};
use anyhow::{Result, ensure};
use async_trait::async_trait;

/// A struct that provides reading capabilities from an in-memory blob of data.
#[derive(Debug)]
pub struct DataReaderBlob {
	blob: Blob,
}

#[async_trait]
impl DataReaderTrait for DataReaderBlob {
	async fn read_range(&self, range: &ByteRange) -> Result<Blob> {
		ensure!(
			range.end() <= self.blob.len(),
			"end of range {range} is outside blob ({})",
			self.blob.len()
		);
		Ok(Blob::from(self.blob.range(range.as_range_usize())))
	}

	fn get_size(&self) -> u64 {
		self.blob.len()
	}

	fn get_name(&self) -> &str {
		"memory"
	}
}

impl From<DataWriterBlob> for DataReaderBlob {
	fn from(value: DataWriterBlob) -> Self {
		DataReaderBlob::from(value.into_blob())
	}
}

impl From<Blob> for DataReaderBlob {
	fn from(blob: Blob) -> Self {
		DataReaderBlob { blob }
	}
}

impl From<Vec<u8>> for DataReaderBlob {
	fn from(value: Vec<u8>) -> Self {
		DataReaderBlob { blob: Blob::from(value) }
	}
}

//! This module defines the `DataWriterTrait` for writing container bytes.
//!
//! Writers append blocks at the end and can overwrite a previously reserved region with
//! `write_at`, which is how placeholder blocks get their final content.
//!
//! ```rust
//! use maptiles_core::{io::{DataWriterBlob, DataWriterTrait}, Blob, ByteRange};
//! use anyhow::Result;
//!
//! fn main() -> Result<()> {
//!     let mut writer = DataWriterBlob::new()?;
//!     let range = writer.append(&Blob::from(vec![0, 0, 0, 0]))?;
//!     assert_eq!(range, ByteRange::new(0, 4));
//!
//!     writer.append(&Blob::from(vec![9]))?;
//!     writer.write_at(1, &Blob::from(vec![5, 6]))?;
//!     assert_eq!(writer.as_slice(), &[0, 5, 6, 0, 9]);
//!     assert_eq!(writer.get_position()?, 5);
//!
//!     Ok(())
//! }
//! ```

use crate::{Blob, ByteRange};
use anyhow::Result;

/// A trait for writing data to various destinations.
pub trait DataWriterTrait: Send {
	/// Appends data at the end and returns the range it occupies.
	fn append(&mut self, blob: &Blob) -> Result<ByteRange>;

	/// Overwrites already written bytes starting at `offset`. The write position is left unchanged.
	///
	/// # Errors
	///
	/// Returns an error if the region is not entirely inside the written data.
	fn write_at(&mut self, offset: u64, blob: &Blob) -> Result<()>;

	/// Gets the current write position, which is also the offset of the next appended block.
	fn get_position(&mut self) -> Result<u64>;

	/// Flushes buffered bytes to the destination.
	fn flush(&mut self) -> Result<()> {
		Ok(())
	}
}

//! This module defines the `DataReaderTrait` for positioned reads from a container source.
//!
//! # Examples
//!
//! ```rust
//! use maptiles_core::{io::{DataReaderBlob, DataReaderTrait, DataReader}, Blob, ByteRange};
//! use anyhow::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let reader: DataReader = Box::new(DataReaderBlob::from(vec![1, 2, 3, 4, 5]));
//!
//!     let partial = reader.read_range(&ByteRange::new(1, 3)).await?;
//!     assert_eq!(partial.as_slice(), &[2, 3, 4]);
//!     assert_eq!(reader.get_size(), 5);
//!
//!     Ok(())
//! }
//! ```

use crate::{Blob, ByteRange};
use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;

/// Type alias for a boxed dynamic implementation of the `DataReaderTrait`.
pub type DataReader = Box<dyn DataReaderTrait>;

/// A trait for reading byte ranges from a source.
///
/// Implementations take `&self`, so a single reader can serve concurrent lookups.
#[async_trait]
pub trait DataReaderTrait: Debug + Send + Sync {
	/// Reads a specific range of bytes from the data source.
	///
	/// # Errors
	///
	/// Returns an error if the range lies outside the source or the read fails.
	async fn read_range(&self, range: &ByteRange) -> Result<Blob>;

	/// Returns the total size of the data source in bytes.
	fn get_size(&self) -> u64;

	/// Gets the name of the data source.
	fn get_name(&self) -> &str;
}

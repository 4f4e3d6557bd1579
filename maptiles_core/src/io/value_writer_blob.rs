//! This module provides `ValueWriterBlob` for encoding values into an in-memory [`Blob`].
//!
//! ```rust
//! use maptiles_core::io::{ValueWriter, ValueWriterBlob};
//!
//! let mut writer = ValueWriterBlob::new_be();
//! writer.write_slice(b"T").unwrap();
//! writer.write_u32(25).unwrap();
//! assert_eq!(writer.into_blob().into_vec(), vec![b'T', 0, 0, 0, 25]);
//! ```

use super::ValueWriter;
use crate::Blob;
use byteorder::{BigEndian, ByteOrder};
use std::io::{Cursor, Write};
use std::marker::PhantomData;

/// A struct that provides writing capabilities to an in-memory blob using a specified byte order.
pub struct ValueWriterBlob<E: ByteOrder> {
	_phantom: PhantomData<E>,
	cursor: Cursor<Vec<u8>>,
}

impl<E: ByteOrder> ValueWriterBlob<E> {
	/// Creates a new, empty `ValueWriterBlob`.
	#[must_use]
	pub fn new() -> ValueWriterBlob<E> {
		ValueWriterBlob {
			_phantom: PhantomData,
			cursor: Cursor::new(Vec::new()),
		}
	}

	/// Converts the written data into a `Blob`.
	#[must_use]
	pub fn into_blob(self) -> Blob {
		Blob::from(self.cursor.into_inner())
	}
}

impl<E: ByteOrder> Default for ValueWriterBlob<E> {
	fn default() -> Self {
		Self::new()
	}
}

impl ValueWriterBlob<BigEndian> {
	/// Creates a new `ValueWriterBlob` with big-endian byte order.
	#[must_use]
	pub fn new_be() -> ValueWriterBlob<BigEndian> {
		ValueWriterBlob::new()
	}
}

impl<E: ByteOrder> ValueWriter<E> for ValueWriterBlob<E> {
	fn get_writer(&mut self) -> &mut dyn Write {
		&mut self.cursor
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use anyhow::Result;

	#[test]
	fn write_integers_be() -> Result<()> {
		let mut writer = ValueWriterBlob::new_be();
		writer.write_u8(4)?;
		writer.write_u32(0x0102_0304)?;
		writer.write_u64(1)?;
		assert_eq!(
			writer.into_blob().into_vec(),
			vec![4, 1, 2, 3, 4, 0, 0, 0, 0, 0, 0, 0, 1]
		);
		Ok(())
	}

	#[test]
	fn write_f64_be() -> Result<()> {
		let mut writer = ValueWriterBlob::new_be();
		writer.write_f64(1.0)?;
		writer.write_f64(-0.0)?;
		assert_eq!(
			writer.into_blob().into_vec(),
			vec![0x3F, 0xF0, 0, 0, 0, 0, 0, 0, 0x80, 0, 0, 0, 0, 0, 0, 0]
		);
		Ok(())
	}

	#[test]
	fn write_padded_text() -> Result<()> {
		let mut writer = ValueWriterBlob::new_be();
		writer.write_slice(b"png")?;
		writer.write_zeros(5)?;
		writer.write_slice(&[])?;
		writer.write_zeros(0)?;
		assert_eq!(writer.into_blob().into_vec(), vec![b'p', b'n', b'g', 0, 0, 0, 0, 0]);
		Ok(())
	}
}

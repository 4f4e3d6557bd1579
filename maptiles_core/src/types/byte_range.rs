//! This module provides the `ByteRange` struct, which addresses a contiguous region of a container file.
//!
//! # Examples
//!
//! ```rust
//! use maptiles_core::ByteRange;
//!
//! let range = ByteRange::new(23, 42);
//! assert_eq!(range.offset, 23);
//! assert_eq!(range.length, 42);
//! assert_eq!(range.end(), 65);
//! ```

use std::fmt;
use std::ops::Range;

/// A struct representing a range of bytes with an offset and length.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct ByteRange {
	/// The starting offset of the byte range.
	pub offset: u64,
	/// The length of the byte range.
	pub length: u64,
}

impl ByteRange {
	/// Creates a new `ByteRange` with the specified offset and length.
	#[must_use]
	pub fn new(offset: u64, length: u64) -> Self {
		Self { offset, length }
	}

	/// Returns the first offset after the range. Saturates instead of overflowing,
	/// so that ranges built from corrupt offsets still compare as "too far".
	#[must_use]
	pub fn end(&self) -> u64 {
		self.offset.saturating_add(self.length)
	}

	/// Converts the `ByteRange` to a `Range<usize>`.
	#[must_use]
	pub fn as_range_usize(&self) -> Range<usize> {
		Range {
			start: self.offset as usize,
			end: self.end() as usize,
		}
	}
}

impl fmt::Debug for ByteRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ByteRange[{},{}]", self.offset, self.length)
	}
}

impl fmt::Display for ByteRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{}..{}]", self.offset, self.end())
	}
}

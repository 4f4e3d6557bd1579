//! Typed failures of the MapTiles codec.
//!
//! Functions in this crate return `anyhow::Result`. Failures that belong to the container format are raised as
//! [`MapTilesError`], so callers can tell them apart with `downcast_ref`:
//!
//! ```rust
//! use maptiles_container::{MapTilesError, Quadkey};
//!
//! let err = Quadkey::parse("5").unwrap_err();
//! assert!(matches!(
//! 	err.downcast_ref::<MapTilesError>(),
//! 	Some(MapTilesError::SchemaViolation { .. })
//! ));
//! ```
//!
//! None of these errors are retried internally.

use std::fmt;

/// A failure caused by malformed container bytes, invalid input values, or misuse of a writer.
#[derive(Clone, Debug, PartialEq)]
pub enum MapTilesError {
	/// The raw bytes (or the value to be written) of a field do not satisfy its match rule.
	SchemaViolation {
		block: &'static str,
		field: &'static str,
		offset: u64,
		reason: String,
	},
	/// A value does not fit into its fixed-width field.
	FieldOverflow {
		block: &'static str,
		field: &'static str,
		size: usize,
		reason: String,
	},
	/// The container is structurally inconsistent, e.g. an offset points outside the file.
	CorruptContainer {
		block: &'static str,
		offset: u64,
		reason: String,
	},
	/// The digest stored in a tile block does not match its payload.
	HashMismatch {
		offset: u64,
		expected: String,
		actual: String,
	},
	/// No reachable index block covers the quadkey.
	QuadkeyOutOfRange { quadkey: String },
	/// The writer has already been finalized.
	WriterClosed,
}

impl MapTilesError {
	pub(crate) fn schema_violation(
		block: &'static str,
		field: &'static str,
		offset: u64,
		reason: impl Into<String>,
	) -> Self {
		MapTilesError::SchemaViolation {
			block,
			field,
			offset,
			reason: reason.into(),
		}
	}

	pub(crate) fn field_overflow(block: &'static str, field: &'static str, size: usize, reason: impl Into<String>) -> Self {
		MapTilesError::FieldOverflow {
			block,
			field,
			size,
			reason: reason.into(),
		}
	}

	pub(crate) fn corrupt(block: &'static str, offset: u64, reason: impl Into<String>) -> Self {
		MapTilesError::CorruptContainer {
			block,
			offset,
			reason: reason.into(),
		}
	}

	pub(crate) fn out_of_range(quadkey: impl fmt::Display) -> Self {
		MapTilesError::QuadkeyOutOfRange {
			quadkey: quadkey.to_string(),
		}
	}
}

impl fmt::Display for MapTilesError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		use MapTilesError::*;
		match self {
			SchemaViolation {
				block,
				field,
				offset,
				reason,
			} => write!(f, "schema violation in {block}.{field} at byte {offset}: {reason}"),
			FieldOverflow {
				block,
				field,
				size,
				reason,
			} => write!(f, "value does not fit into {block}.{field} ({size} bytes): {reason}"),
			CorruptContainer { block, offset, reason } => {
				write!(f, "corrupt container, {block} at byte {offset}: {reason}")
			}
			HashMismatch {
				offset,
				expected,
				actual,
			} => write!(
				f,
				"hash mismatch in tile_block at byte {offset}: stored {expected}, computed {actual}"
			),
			QuadkeyOutOfRange { quadkey } => write!(f, "quadkey '{quadkey}' is not covered by any index block"),
			WriterClosed => write!(f, "writer has already been finalized"),
		}
	}
}

impl std::error::Error for MapTilesError {}

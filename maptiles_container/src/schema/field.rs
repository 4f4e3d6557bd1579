//! Field descriptors: where a field lives inside its block, how it is encoded and which values it accepts.

use crate::MapTilesError;
use anyhow::{Result, bail};
use maptiles_core::Blob;
use std::{fmt, ops::Range};

/// Position of a field relative to its block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
	/// Starts `offset` bytes after the block start.
	Fixed { offset: usize },
	/// Starts `from_end` bytes before the block end.
	Trailing { from_end: usize },
	/// Starts at `offset` and runs until `trailing` bytes before the block end.
	Variable { offset: usize, trailing: usize },
}

/// Encoded representation of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
	Buffer,
	Ascii,
	Utf8,
	UInt8,
	UInt32BE,
	UInt64BE,
	DoubleBE,
}

impl FieldKind {
	/// Width of the encoded value, or `None` for strings and buffers whose width comes from the field.
	pub fn natural_size(&self) -> Option<usize> {
		match self {
			FieldKind::UInt8 => Some(1),
			FieldKind::UInt32BE => Some(4),
			FieldKind::UInt64BE | FieldKind::DoubleBE => Some(8),
			FieldKind::Buffer | FieldKind::Ascii | FieldKind::Utf8 => None,
		}
	}

	pub fn is_text(&self) -> bool {
		matches!(self, FieldKind::Ascii | FieldKind::Utf8)
	}

	pub fn is_integer(&self) -> bool {
		matches!(self, FieldKind::UInt8 | FieldKind::UInt32BE | FieldKind::UInt64BE)
	}
}

impl fmt::Display for FieldKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			FieldKind::Buffer => "buffer",
			FieldKind::Ascii => "ascii",
			FieldKind::Utf8 => "utf-8",
			FieldKind::UInt8 => "UInt8",
			FieldKind::UInt32BE => "UInt32BE",
			FieldKind::UInt64BE => "UInt64BE",
			FieldKind::DoubleBE => "DoubleBE",
		})
	}
}

/// A decoded field value.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
	Bytes(Blob),
	Text(String),
	UInt(u64),
	Double(f64),
}

impl FieldValue {
	pub fn as_u64(&self) -> Option<u64> {
		match self {
			FieldValue::UInt(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			FieldValue::Double(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			FieldValue::Text(v) => Some(v),
			_ => None,
		}
	}

	pub fn as_bytes(&self) -> Option<&[u8]> {
		match self {
			FieldValue::Bytes(v) => Some(v.as_slice()),
			_ => None,
		}
	}

	fn kind_name(&self) -> &'static str {
		match self {
			FieldValue::Bytes(_) => "bytes",
			FieldValue::Text(_) => "text",
			FieldValue::UInt(_) => "integer",
			FieldValue::Double(_) => "double",
		}
	}
}

impl fmt::Display for FieldValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FieldValue::Bytes(v) => write!(f, "[{}]", v.as_hex()),
			FieldValue::Text(v) => write!(f, "{v:?}"),
			FieldValue::UInt(v) => write!(f, "{v}"),
			FieldValue::Double(v) => write!(f, "{v}"),
		}
	}
}

/// Constraint on the decoded value of a field.
#[derive(Clone, Copy)]
pub enum MatchRule {
	/// The raw bytes must equal this literal.
	Exact(&'static [u8]),
	/// The integer value must be one of these.
	OneOf(&'static [u64]),
	/// The value must satisfy the predicate.
	Predicate {
		description: &'static str,
		test: fn(&FieldValue) -> bool,
	},
}

impl MatchRule {
	pub fn accepts(&self, value: &FieldValue) -> bool {
		match self {
			MatchRule::Exact(expected) => value.as_bytes() == Some(*expected),
			MatchRule::OneOf(allowed) => value.as_u64().is_some_and(|v| allowed.contains(&v)),
			MatchRule::Predicate { test, .. } => test(value),
		}
	}

	/// Checks that the rule can apply to a field of this kind and size.
	pub fn is_well_formed_for(&self, kind: FieldKind, size: Option<usize>) -> bool {
		match self {
			MatchRule::Exact(expected) => kind == FieldKind::Buffer && size == Some(expected.len()),
			MatchRule::OneOf(allowed) => kind.is_integer() && !allowed.is_empty(),
			MatchRule::Predicate { description, .. } => !description.is_empty(),
		}
	}
}

impl fmt::Debug for MatchRule {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MatchRule::Exact(bytes) => write!(f, "Exact({:?})", String::from_utf8_lossy(bytes)),
			MatchRule::OneOf(values) => write!(f, "OneOf({values:?})"),
			MatchRule::Predicate { description, .. } => write!(f, "Predicate({description})"),
		}
	}
}

impl fmt::Display for MatchRule {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MatchRule::Exact(bytes) => write!(f, "expected {:?}", String::from_utf8_lossy(bytes)),
			MatchRule::OneOf(values) => write!(f, "expected one of {values:?}"),
			MatchRule::Predicate { description, .. } => f.write_str(description),
		}
	}
}

/// Descriptor of one field of a block.
#[derive(Clone, Debug)]
pub struct FieldDef {
	pub block: &'static str,
	pub name: &'static str,
	pub placement: Placement,
	/// Fixed width in bytes, `None` for variable-length data.
	pub size: Option<usize>,
	pub kind: FieldKind,
	pub optional: bool,
	pub rule: Option<MatchRule>,
}

impl FieldDef {
	/// Offset from the block start, if the field does not depend on the block length.
	pub fn fixed_offset(&self) -> Option<usize> {
		match self.placement {
			Placement::Fixed { offset } | Placement::Variable { offset, .. } => Some(offset),
			Placement::Trailing { .. } => None,
		}
	}

	/// Byte range of this field inside a block of `block_len` bytes.
	///
	/// Fails with [`MapTilesError::CorruptContainer`] if the block is too short to hold the field.
	pub fn range(&self, block_len: usize, block_offset: u64) -> Result<Range<usize>> {
		let range = match (self.placement, self.size) {
			(Placement::Fixed { offset }, Some(size)) => offset..offset + size,
			(Placement::Trailing { from_end }, Some(size)) if from_end <= block_len => {
				let start = block_len - from_end;
				start..start + size
			}
			(Placement::Variable { offset, trailing }, None) if offset + trailing <= block_len => {
				offset..block_len - trailing
			}
			_ => block_len + 1..block_len + 1,
		};
		if range.end > block_len {
			bail!(MapTilesError::corrupt(
				self.block,
				block_offset,
				format!(
					"field '{}' needs bytes {}..{} but the block has {block_len} bytes",
					self.name, range.start, range.end
				)
			));
		}
		Ok(range)
	}

	/// Checks a value against the match rule of this field.
	pub fn check(&self, value: &FieldValue, offset: u64) -> Result<()> {
		if let Some(rule) = &self.rule
			&& !rule.accepts(value)
		{
			bail!(MapTilesError::schema_violation(
				self.block,
				self.name,
				offset,
				format!("{value} does not match: {rule}")
			));
		}
		Ok(())
	}

	pub(crate) fn type_error(&self, value: &FieldValue, offset: u64) -> MapTilesError {
		MapTilesError::schema_violation(
			self.block,
			self.name,
			offset,
			format!("cannot encode a {} value as {}", value.kind_name(), self.kind),
		)
	}
}

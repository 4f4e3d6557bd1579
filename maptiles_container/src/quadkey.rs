//! Quadkeys: base-4 paths through the tile pyramid.
//!
//! Each digit selects one quadrant of the parent tile, so the length of a quadkey is its zoom level.
//! Lexicographic order of quadkeys of equal length is the order of slots in an index block.
//!
//! ```rust
//! use maptiles_container::Quadkey;
//!
//! let quadkey = Quadkey::parse("0231").unwrap();
//! assert_eq!(quadkey.level(), 4);
//! assert_eq!(quadkey.parent().unwrap().as_str(), "023");
//! assert_eq!(Quadkey::from_tile(4, 5, 6).unwrap().to_tile().unwrap(), (4, 5, 6));
//! ```

use crate::{MapTilesError, schema::QUADKEY_MAX_LENGTH};
use anyhow::{Result, bail};
use lazy_static::lazy_static;
use regex::Regex;
use std::{fmt, str::FromStr};

lazy_static! {
	static ref QUADKEY_PATTERN: Regex = Regex::new(r"^[0-4]{0,23}$").unwrap();
}

/// A validated quadkey. The empty quadkey is the single tile at zoom level 0.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quadkey(String);

impl Quadkey {
	/// The empty quadkey.
	#[must_use]
	pub fn root() -> Quadkey {
		Quadkey(String::new())
	}

	/// Parses a quadkey, failing with [`MapTilesError::SchemaViolation`] for anything not matching `^[0-4]{0,23}$`.
	pub fn parse(text: &str) -> Result<Quadkey> {
		if !Quadkey::is_valid(text) {
			let position = text
				.bytes()
				.position(|b| !(b'0'..=b'4').contains(&b))
				.unwrap_or(QUADKEY_MAX_LENGTH);
			bail!(MapTilesError::schema_violation(
				"quadkey",
				"digits",
				position as u64,
				format!("{text:?} does not match ^[0-4]{{0,23}}$")
			));
		}
		Ok(Quadkey(text.to_owned()))
	}

	pub fn is_valid(text: &str) -> bool {
		QUADKEY_PATTERN.is_match(text)
	}

	/// Converts a tile coordinate into its quadkey.
	pub fn from_tile(level: u8, x: u32, y: u32) -> Result<Quadkey> {
		let coord = format!("{level}/{x}/{y}");
		if level as usize > QUADKEY_MAX_LENGTH {
			bail!(MapTilesError::out_of_range(coord));
		}
		let max = 1u64 << level;
		if u64::from(x) >= max || u64::from(y) >= max {
			bail!(MapTilesError::out_of_range(coord));
		}
		let digits = (0..level)
			.rev()
			.map(|bit| {
				let digit = (((y >> bit) & 1) << 1) | ((x >> bit) & 1);
				char::from(b'0' + digit as u8)
			})
			.collect();
		Ok(Quadkey(digits))
	}

	/// Converts the quadkey into a tile coordinate `(level, x, y)`.
	///
	/// Digit `4` has no quadrant and fails with [`MapTilesError::QuadkeyOutOfRange`].
	pub fn to_tile(&self) -> Result<(u8, u32, u32)> {
		let (mut x, mut y) = (0u32, 0u32);
		for digit in self.digits() {
			if digit > 3 {
				bail!(MapTilesError::out_of_range(self));
			}
			x = (x << 1) | u32::from(digit & 1);
			y = (y << 1) | u32::from(digit >> 1);
		}
		Ok((self.level() as u8, x, y))
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Zoom level, i.e. the number of digits.
	#[must_use]
	pub fn level(&self) -> usize {
		self.0.len()
	}

	/// `true` if every digit names a quadrant, i.e. the quadkey can occupy an index slot.
	#[must_use]
	pub fn is_addressable(&self) -> bool {
		self.digits().all(|d| d < 4)
	}

	#[must_use]
	pub fn is_root(&self) -> bool {
		self.0.is_empty()
	}

	pub fn digits(&self) -> impl Iterator<Item = u8> + '_ {
		self.0.bytes().map(|b| b - b'0')
	}

	/// Returns the parent, or `None` for the empty quadkey.
	#[must_use]
	pub fn parent(&self) -> Option<Quadkey> {
		if self.is_root() {
			None
		} else {
			Some(Quadkey(self.0[..self.0.len() - 1].to_owned()))
		}
	}

	/// Returns the ancestor at `level`, which is the quadkey itself at its own level.
	#[must_use]
	pub fn ancestor(&self, level: usize) -> Option<Quadkey> {
		(level <= self.level()).then(|| Quadkey(self.0[..level].to_owned()))
	}

	/// Appends one digit.
	pub fn child(&self, digit: u8) -> Result<Quadkey> {
		Quadkey::parse(&format!("{}{}", self.0, char::from(b'0'.saturating_add(digit))))
	}

	/// `true` if `ancestor` is a strict prefix of this quadkey.
	#[must_use]
	pub fn is_descendant_of(&self, ancestor: &Quadkey) -> bool {
		self.level() > ancestor.level() && self.is_within(ancestor)
	}

	/// `true` if this quadkey equals `ancestor` or lies below it.
	#[must_use]
	pub fn is_within(&self, ancestor: &Quadkey) -> bool {
		self.0.starts_with(&ancestor.0)
	}

	/// Lists the `4^depth` quadkeys exactly `depth` levels below this one, in slot order.
	pub fn descendants(&self, depth: u8) -> Result<Vec<Quadkey>> {
		if self.level() + depth as usize > QUADKEY_MAX_LENGTH {
			bail!(MapTilesError::out_of_range(format!("{self} + {depth} levels")));
		}
		let depth = u32::from(depth);
		Ok((0..4usize.pow(depth))
			.map(|slot| {
				let mut text = self.0.clone();
				for shift in (0..depth).rev() {
					text.push(char::from(b'0' + ((slot >> (2 * shift)) & 3) as u8));
				}
				Quadkey(text)
			})
			.collect())
	}

	/// Position of this quadkey in the data region of an index block starting at `first` with `depth` levels.
	///
	/// The quadkey must lie exactly `depth` levels below `first` and only use digits `0` to `3`, otherwise
	/// this fails with [`MapTilesError::QuadkeyOutOfRange`].
	pub fn slot_in(&self, first: &Quadkey, depth: u8) -> Result<usize> {
		if self.level() != first.level() + depth as usize || !self.is_within(first) {
			bail!(MapTilesError::out_of_range(self));
		}
		let mut slot = 0usize;
		for digit in self.digits().skip(first.level()) {
			if digit > 3 {
				bail!(MapTilesError::out_of_range(self));
			}
			slot = (slot << 2) | digit as usize;
		}
		Ok(slot)
	}
}

impl FromStr for Quadkey {
	type Err = anyhow::Error;

	fn from_str(s: &str) -> Result<Self> {
		Quadkey::parse(s)
	}
}

impl TryFrom<&str> for Quadkey {
	type Error = anyhow::Error;

	fn try_from(value: &str) -> Result<Self> {
		Quadkey::parse(value)
	}
}

impl fmt::Display for Quadkey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl fmt::Debug for Quadkey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Quadkey({:?})", self.0)
	}
}

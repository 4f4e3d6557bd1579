//! The block layout table of the MapTiles format.
//!
//! Each block is described by an ordered list of [`FieldDef`]s plus a name lookup. The tables are built once,
//! on first use, and shared read-only by every reader and writer.
//!
//! ```rust
//! use maptiles_container::schema::{INDEX_BLOCK, Placement};
//!
//! let field = INDEX_BLOCK.field("first_quadkey");
//! assert_eq!(field.placement, Placement::Fixed { offset: 3 });
//! assert_eq!(field.size, Some(23));
//! assert_eq!(INDEX_BLOCK.fixed_len, 34);
//! ```

mod blocks;
mod field;

pub use blocks::*;
pub use field::*;

use lazy_static::lazy_static;
use std::collections::HashMap;

/// Layout of one block type.
#[derive(Debug)]
pub struct BlockSchema {
	pub name: &'static str,
	/// Fields in declaration order.
	pub fields: Vec<FieldDef>,
	/// Number of bytes taken by the leading fixed fields.
	pub fixed_len: usize,
	by_name: HashMap<&'static str, usize>,
}

impl BlockSchema {
	fn builder(name: &'static str) -> BlockSchemaBuilder {
		BlockSchemaBuilder {
			name,
			fields: Vec::new(),
			offset: 0,
		}
	}

	/// Returns the descriptor of a field.
	///
	/// # Panics
	/// Panics if the block has no field of that name.
	pub fn field(&self, name: &str) -> &FieldDef {
		match self.get(name) {
			Some(field) => field,
			None => panic!("block '{}' has no field '{name}'", self.name),
		}
	}

	pub fn get(&self, name: &str) -> Option<&FieldDef> {
		self.by_name.get(name).map(|index| &self.fields[*index])
	}

	/// Iterates over the fields with a fixed offset from the block start, in declaration order.
	pub fn fixed_fields(&self) -> impl Iterator<Item = &FieldDef> {
		self
			.fields
			.iter()
			.filter(|f| matches!(f.placement, Placement::Fixed { .. }))
	}
}

struct BlockSchemaBuilder {
	name: &'static str,
	fields: Vec<FieldDef>,
	offset: usize,
}

impl BlockSchemaBuilder {
	fn push(mut self, name: &'static str, placement: Placement, size: Option<usize>, kind: FieldKind) -> Self {
		self.fields.push(FieldDef {
			block: self.name,
			name,
			placement,
			size,
			kind,
			optional: false,
			rule: None,
		});
		self
	}

	/// Appends a fixed-width field directly behind the previous one.
	fn field(mut self, name: &'static str, size: usize, kind: FieldKind) -> Self {
		let offset = self.offset;
		self.offset += size;
		self.push(name, Placement::Fixed { offset }, Some(size), kind)
	}

	/// Appends the variable-length body, ending `trailing` bytes before the block end.
	fn data(self, name: &'static str, trailing: usize) -> Self {
		let offset = self.offset;
		self.push(name, Placement::Variable { offset, trailing }, None, FieldKind::Buffer)
	}

	fn trailing(self, name: &'static str, size: usize, kind: FieldKind) -> Self {
		self.push(name, Placement::Trailing { from_end: size }, Some(size), kind)
	}

	fn optional(mut self) -> Self {
		if let Some(field) = self.fields.last_mut() {
			field.optional = true;
		}
		self
	}

	fn rule(mut self, rule: MatchRule) -> Self {
		if let Some(field) = self.fields.last_mut() {
			field.rule = Some(rule);
		}
		self
	}

	fn build(self) -> BlockSchema {
		let by_name = self.fields.iter().enumerate().map(|(i, f)| (f.name, i)).collect();
		BlockSchema {
			name: self.name,
			fields: self.fields,
			fixed_len: self.offset,
			by_name,
		}
	}
}

lazy_static! {
	pub static ref HEADER: BlockSchema = blocks::header();
	pub static ref METADATA: BlockSchema = blocks::metadata();
	pub static ref INDEX_BLOCK: BlockSchema = blocks::index_block();
	pub static ref TILE_BLOCK: BlockSchema = blocks::tile_block();
	pub static ref ADDITIONAL_METADATA: BlockSchema = blocks::additional_metadata();
}

/// All block layouts, in file order.
pub fn all_blocks() -> [&'static BlockSchema; 5] {
	[&HEADER, &METADATA, &INDEX_BLOCK, &TILE_BLOCK, &ADDITIONAL_METADATA]
}

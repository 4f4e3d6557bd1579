//! Field tables of the five MapTiles block types.
//!
//! Every block starts at its own offset in the file; the offsets below are relative to that start.
//! Multi-byte values are big-endian. The `length` of a block counts all of its bytes after the type tag,
//! so a block occupies `1 + length` bytes.

use super::{BlockSchema, FieldKind::*, FieldValue, MatchRule};
use crate::Quadkey;

pub const MAGIC_NUMBER: &[u8] = b"MAPTILES";
pub const SUPPORTED_VERSIONS: &[u64] = &[1];
pub const CURRENT_VERSION: u8 = 1;

pub const INDEX_BLOCK_TAG: &[u8] = b"I";
pub const TILE_BLOCK_TAG: &[u8] = b"T";
pub const METADATA_BLOCK_TAG: &[u8] = b"D";
pub const ADDITIONAL_METADATA_TAG: &[u8] = b"A";

pub const HEADER_LENGTH: usize = 13;
pub const TYPE_TAG_LENGTH: usize = 1;
/// Type tag plus length field, shared by all blocks except the header.
pub const BLOCK_PREFIX_LENGTH: usize = 5;
pub const METADATA_LENGTH: usize = 476;
pub const INDEX_HEADER_LENGTH: usize = 34;
pub const TILE_HEADER_LENGTH: usize = BLOCK_PREFIX_LENGTH;
pub const HASH_LENGTH: usize = 16;
pub const ADDITIONAL_METADATA_HEADER_LENGTH: usize = 13;

/// Longest quadkey an index block can name.
pub const QUADKEY_MAX_LENGTH: usize = 23;

fn at_least(value: &FieldValue, min: usize) -> bool {
	value.as_u64().is_some_and(|v| v >= min as u64)
}

/// `length` fields count every byte of their block except the type tag.
fn length_covers(value: &FieldValue, block_bytes: usize) -> bool {
	at_least(value, block_bytes - TYPE_TAG_LENGTH)
}

/// File header. Always at offset 0.
pub(super) fn header() -> BlockSchema {
	BlockSchema::builder("header")
		.field("magic_number", 8, Buffer)
		.rule(MatchRule::Exact(MAGIC_NUMBER))
		.field("version", 1, UInt8)
		.rule(MatchRule::OneOf(SUPPORTED_VERSIONS))
		.field("metadata_offset", 4, UInt32BE)
		.rule(MatchRule::Predicate {
			description: "must point behind the header",
			test: |v| at_least(v, HEADER_LENGTH),
		})
		.build()
}

/// Tileset metadata. All values after `length` are optional and zero-filled when absent.
pub(super) fn metadata() -> BlockSchema {
	BlockSchema::builder("metadata")
		.field("type", 1, Buffer)
		.rule(MatchRule::Exact(METADATA_BLOCK_TAG))
		.field("length", 4, UInt32BE)
		.rule(MatchRule::Predicate {
			description: "must cover at least type and length",
			test: |v| length_covers(v, BLOCK_PREFIX_LENGTH),
		})
		.field("id", 50, Ascii)
		.optional()
		.field("name", 100, Utf8)
		.optional()
		.field("bbox_west", 8, DoubleBE)
		.optional()
		.field("bbox_south", 8, DoubleBE)
		.optional()
		.field("bbox_east", 8, DoubleBE)
		.optional()
		.field("bbox_north", 8, DoubleBE)
		.optional()
		.field("min_zoom", 1, UInt8)
		.optional()
		.field("max_zoom", 1, UInt8)
		.optional()
		.field("initial_zoom", 8, DoubleBE)
		.optional()
		.field("initial_lon", 8, DoubleBE)
		.optional()
		.field("initial_lat", 8, DoubleBE)
		.optional()
		.field("tile_mime_type", 255, Ascii)
		.optional()
		.field("additional_metadata_offset", 8, UInt64BE)
		.optional()
		.build()
}

/// Fixed-size table of offsets covering `4^depth` quadkeys below `first_quadkey`.
pub(super) fn index_block() -> BlockSchema {
	BlockSchema::builder("index_block")
		.field("type", 1, Buffer)
		.rule(MatchRule::Exact(INDEX_BLOCK_TAG))
		.field("entry_length", 1, UInt8)
		.rule(MatchRule::OneOf(&[4, 8]))
		.field("depth", 1, UInt8)
		.rule(MatchRule::Predicate {
			description: "must not exceed 23 levels",
			test: |v| v.as_u64().is_some_and(|v| v <= QUADKEY_MAX_LENGTH as u64),
		})
		.field("first_quadkey", 23, Ascii)
		.rule(MatchRule::Predicate {
			description: "must match ^[0-4]{0,23}$",
			test: |v| v.as_str().is_some_and(Quadkey::is_valid),
		})
		.field("parent_offset", 8, UInt64BE)
		.optional()
		.data("data", 0)
		.build()
}

/// Tile payload framed by its length and followed by the MD5 digest of the payload.
pub(super) fn tile_block() -> BlockSchema {
	BlockSchema::builder("tile_block")
		.field("type", 1, Buffer)
		.rule(MatchRule::Exact(TILE_BLOCK_TAG))
		.field("length", 4, UInt32BE)
		.rule(MatchRule::Predicate {
			description: "must cover type, length and hash",
			test: |v| length_covers(v, TILE_HEADER_LENGTH + HASH_LENGTH),
		})
		.data("data", HASH_LENGTH)
		.trailing("hash", HASH_LENGTH, Buffer)
		.build()
}

/// One link of the additional metadata chain.
pub(super) fn additional_metadata() -> BlockSchema {
	BlockSchema::builder("additional_metadata")
		.field("type", 1, Buffer)
		.rule(MatchRule::Exact(ADDITIONAL_METADATA_TAG))
		.field("length", 4, UInt32BE)
		.rule(MatchRule::Predicate {
			description: "must cover type, length and next_offset",
			test: |v| length_covers(v, ADDITIONAL_METADATA_HEADER_LENGTH),
		})
		.field("next_offset", 8, UInt64BE)
		.optional()
		.data("payload", 0)
		.build()
}

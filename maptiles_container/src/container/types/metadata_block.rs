//! This module defines the `MetadataBlock` struct, describing the tileset stored in a container.
//!
//! Every value is optional and stored as a zero-filled region when absent. Because a double of `0.0` would be
//! indistinguishable from "absent", a present zero is stored as `-0.0`, which reads back as `Some(0.0)`.
//! Zoom levels are plain integers since zero is a legitimate zoom level.
//!
//! Readers trust the declared block length: values outside of it are treated as absent and additional bytes
//! from newer format revisions are ignored.
//!
//! ```rust
//! use maptiles_container::MetadataBlock;
//!
//! let metadata = MetadataBlock {
//! 	name: Some("Berlin".to_string()),
//! 	max_zoom: 14,
//! 	initial_lon: Some(0.0),
//! 	..MetadataBlock::default()
//! };
//! let blob = metadata.to_blob().unwrap();
//! assert_eq!(blob.len(), 476);
//! assert_eq!(MetadataBlock::from_blob(&blob, 13).unwrap(), metadata);
//! ```

use crate::{
	MapTilesError,
	codec::{read_bytes, read_double, read_text, read_uint, write_field},
	schema::{FieldDef, FieldValue, METADATA, METADATA_BLOCK_TAG, METADATA_LENGTH, TYPE_TAG_LENGTH},
};
use anyhow::{Result, bail};
use log::warn;
use maptiles_core::{Blob, io::DataReader};

use super::read_block;

/// Metadata of a container.
///
/// The sign of a zero double is not kept: `Some(-0.0)` and `Some(0.0)` are both written as `-0.0` and read back
/// as `Some(0.0)`. Equality is unaffected, since `-0.0 == 0.0`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetadataBlock {
	pub id: Option<String>,
	pub name: Option<String>,
	pub bbox_west: Option<f64>,
	pub bbox_south: Option<f64>,
	pub bbox_east: Option<f64>,
	pub bbox_north: Option<f64>,
	pub min_zoom: u8,
	pub max_zoom: u8,
	pub initial_zoom: Option<f64>,
	pub initial_lon: Option<f64>,
	pub initial_lat: Option<f64>,
	pub tile_mime_type: Option<String>,
	pub additional_metadata_offset: Option<u64>,
}

impl MetadataBlock {
	/// Sets all four edges of the bounding box.
	pub fn set_bbox(&mut self, west: f64, south: f64, east: f64, north: f64) {
		self.bbox_west = Some(west);
		self.bbox_south = Some(south);
		self.bbox_east = Some(east);
		self.bbox_north = Some(north);
	}

	/// Encodes the block with the full layout of the current format revision.
	pub fn to_blob(&self) -> Result<Blob> {
		let mut block = vec![0u8; METADATA_LENGTH];
		let mut put = |name: &str, value: Option<FieldValue>| -> Result<()> {
			if let Some(value) = value {
				write_field(&mut block, METADATA.field(name), &value)?;
			}
			Ok(())
		};
		let text = |value: &Option<String>| value.clone().map(FieldValue::Text);
		let double = |value: Option<f64>| value.map(|v| FieldValue::Double(if v == 0.0 { -0.0 } else { v }));

		put("type", Some(FieldValue::Bytes(Blob::from(METADATA_BLOCK_TAG))))?;
		put("length", Some(FieldValue::UInt((METADATA_LENGTH - TYPE_TAG_LENGTH) as u64)))?;
		put("id", text(&self.id))?;
		put("name", text(&self.name))?;
		put("bbox_west", double(self.bbox_west))?;
		put("bbox_south", double(self.bbox_south))?;
		put("bbox_east", double(self.bbox_east))?;
		put("bbox_north", double(self.bbox_north))?;
		put("min_zoom", Some(FieldValue::UInt(u64::from(self.min_zoom))))?;
		put("max_zoom", Some(FieldValue::UInt(u64::from(self.max_zoom))))?;
		put("initial_zoom", double(self.initial_zoom))?;
		put("initial_lon", double(self.initial_lon))?;
		put("initial_lat", double(self.initial_lat))?;
		put("tile_mime_type", text(&self.tile_mime_type))?;
		put(
			"additional_metadata_offset",
			self.additional_metadata_offset.map(FieldValue::UInt),
		)?;

		Ok(Blob::from(block))
	}

	/// Decodes a complete metadata block located at `offset`.
	pub fn from_blob(blob: &Blob, offset: u64) -> Result<MetadataBlock> {
		let bytes = blob.as_slice();
		read_bytes(bytes, METADATA.field("type"), offset)?;
		let length = read_uint(bytes, METADATA.field("length"), offset)?;
		if TYPE_TAG_LENGTH as u64 + length != blob.len() {
			bail!(MapTilesError::corrupt(
				"metadata",
				offset,
				format!("declared length {length} does not match a block of {} bytes", blob.len())
			));
		}
		if blob.len() < METADATA_LENGTH as u64 {
			warn!(
				"metadata block at {offset} has only {} of {METADATA_LENGTH} bytes, missing values are treated as absent",
				blob.len()
			);
		}

		let present = |name: &str| -> Option<&'static FieldDef> {
			let field = METADATA.field(name);
			let end = field.fixed_offset()? + field.size?;
			(end <= bytes.len()).then_some(field)
		};
		let text = |name: &str| -> Result<Option<String>> {
			Ok(match present(name) {
				Some(field) => Some(read_text(bytes, field, offset)?).filter(|t| !t.is_empty()),
				None => None,
			})
		};
		let double = |name: &str| -> Result<Option<f64>> {
			Ok(match present(name) {
				Some(field) => {
					let value = read_double(bytes, field, offset)?;
					(value.to_bits() != 0).then_some(if value == 0.0 { 0.0 } else { value })
				}
				None => None,
			})
		};
		let uint = |name: &str| -> Result<Option<u64>> {
			Ok(match present(name) {
				Some(field) => Some(read_uint(bytes, field, offset)?).filter(|v| *v != 0),
				None => None,
			})
		};

		Ok(MetadataBlock {
			id: text("id")?,
			name: text("name")?,
			bbox_west: double("bbox_west")?,
			bbox_south: double("bbox_south")?,
			bbox_east: double("bbox_east")?,
			bbox_north: double("bbox_north")?,
			min_zoom: uint("min_zoom")?.unwrap_or_default() as u8,
			max_zoom: uint("max_zoom")?.unwrap_or_default() as u8,
			initial_zoom: double("initial_zoom")?,
			initial_lon: double("initial_lon")?,
			initial_lat: double("initial_lat")?,
			tile_mime_type: text("tile_mime_type")?,
			additional_metadata_offset: uint("additional_metadata_offset")?,
		})
	}

	/// Reads the metadata block at `offset` and returns it together with its size in bytes.
	pub async fn from_reader(reader: &DataReader, offset: u64) -> Result<(MetadataBlock, u64)> {
		let blob = read_block(reader, &METADATA, offset).await?;
		Ok((MetadataBlock::from_blob(&blob, offset)?, blob.len()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use maptiles_core::io::DataReaderBlob;

	fn full() -> MetadataBlock {
		let mut metadata = MetadataBlock {
			id: Some("osm-berlin".to_string()),
			name: Some("Straßen von Berlin".to_string()),
			min_zoom: 0,
			max_zoom: 14,
			initial_zoom: Some(11.5),
			initial_lon: Some(13.404_954),
			initial_lat: Some(52.520_008),
			tile_mime_type: Some("application/vnd.mapbox-vector-tile".to_string()),
			additional_metadata_offset: Some(98_765),
			..MetadataBlock::default()
		};
		metadata.set_bbox(13.088_345, 52.338_261, 13.761_161, 52.675_454);
		metadata
	}

	#[test]
	fn round_trip() -> Result<()> {
		for metadata in [full(), MetadataBlock::default()] {
			let blob = metadata.to_blob()?;
			assert_eq!(blob.len(), 476);
			assert_eq!(MetadataBlock::from_blob(&blob, 13)?, metadata);
		}
		Ok(())
	}

	#[test]
	fn layout() -> Result<()> {
		let blob = full().to_blob()?;
		let bytes = blob.as_slice();
		assert_eq!(&bytes[0..5], &[b'D', 0, 0, 1, 0xDB]);
		assert_eq!(&bytes[5..15], b"osm-berlin");
		assert_eq!(bytes[187], 0);
		assert_eq!(bytes[188], 14);
		assert_eq!(&bytes[213..217], b"appl");
		assert_eq!(&bytes[468..476], &98_765u64.to_be_bytes());
		Ok(())
	}

	#[test]
	fn absent_values_are_zero_filled() -> Result<()> {
		let blob = MetadataBlock::default().to_blob()?;
		assert!(blob.as_slice()[5..].iter().all(|b| *b == 0));
		Ok(())
	}

	#[test]
	fn present_zero_stays_present() -> Result<()> {
		let metadata = MetadataBlock {
			initial_lon: Some(0.0),
			initial_lat: Some(-0.0),
			bbox_west: None,
			..MetadataBlock::default()
		};
		let blob = metadata.to_blob()?;
		assert_eq!(&blob.as_slice()[197..205], &(-0.0f64).to_be_bytes());

		let decoded = MetadataBlock::from_blob(&blob, 13)?;
		assert_eq!(decoded.initial_lon, Some(0.0));
		assert_eq!(decoded.initial_lat, Some(0.0));
		assert!(decoded.initial_lat.is_some_and(f64::is_sign_positive));
		assert_eq!(decoded.bbox_west, None);
		Ok(())
	}

	#[test]
	fn empty_strings_read_as_absent() -> Result<()> {
		let metadata = MetadataBlock {
			id: Some(String::new()),
			..MetadataBlock::default()
		};
		assert_eq!(MetadataBlock::from_blob(&metadata.to_blob()?, 0)?.id, None);
		Ok(())
	}

	#[test]
	fn overflowing_values() {
		let metadata = MetadataBlock {
			name: Some("ä".repeat(51)),
			..MetadataBlock::default()
		};
		let err = metadata.to_blob().unwrap_err();
		assert!(matches!(
			err.downcast_ref::<MapTilesError>(),
			Some(MapTilesError::FieldOverflow { field: "name", .. })
		));

		let metadata = MetadataBlock {
			tile_mime_type: Some("image/pngé".to_string()),
			..MetadataBlock::default()
		};
		let err = metadata.to_blob().unwrap_err();
		assert!(matches!(
			err.downcast_ref::<MapTilesError>(),
			Some(MapTilesError::SchemaViolation {
				field: "tile_mime_type",
				..
			})
		));
	}

	#[test]
	fn shorter_block_from_older_revision() -> Result<()> {
		let mut bytes = full().to_blob()?.into_vec();
		bytes.truncate(189);
		bytes[1..5].copy_from_slice(&188u32.to_be_bytes());

		let decoded = MetadataBlock::from_blob(&Blob::from(bytes), 13)?;
		assert_eq!(decoded.name, full().name);
		assert_eq!(decoded.max_zoom, 14);
		assert_eq!(decoded.initial_zoom, None);
		assert_eq!(decoded.tile_mime_type, None);
		assert_eq!(decoded.additional_metadata_offset, None);
		Ok(())
	}

	#[tokio::test]
	async fn longer_block_from_newer_revision() -> Result<()> {
		let mut bytes = vec![0u8; 13];
		let mut block = full().to_blob()?.into_vec();
		block.extend_from_slice(&[0xAA; 24]);
		block[1..5].copy_from_slice(&499u32.to_be_bytes());
		bytes.extend_from_slice(&block);
		bytes.extend_from_slice(b"I...");

		let reader: DataReader = Box::new(DataReaderBlob::from(bytes));
		let (decoded, length) = MetadataBlock::from_reader(&reader, 13).await?;
		assert_eq!(decoded, full());
		assert_eq!(length, 500);
		Ok(())
	}

	#[test]
	fn wrong_type_tag() -> Result<()> {
		let mut blob = full().to_blob()?;
		blob.as_mut_slice()[0] = b'M';
		let err = MetadataBlock::from_blob(&blob, 13).unwrap_err();
		assert!(matches!(
			err.downcast_ref::<MapTilesError>(),
			Some(MapTilesError::SchemaViolation {
				block: "metadata",
				field: "type",
				offset: 13,
				..
			})
		));
		Ok(())
	}
}

//! Integration tests writing containers and reading them back.

use anyhow::Result;
use futures::future::try_join_all;
use maptiles_container::*;
use maptiles_core::{
	Blob,
	io::{DataReader, DataReaderBlob, DataWriterBlob},
};
use std::{collections::BTreeMap, sync::Arc};
use tempfile::TempDir;

fn berlin() -> MetadataBlock {
	let mut metadata = MetadataBlock {
		id: Some("berlin".to_string()),
		name: Some("Berlin, Germany".to_string()),
		min_zoom: 0,
		max_zoom: 9,
		initial_zoom: Some(10.0),
		initial_lon: Some(13.4),
		initial_lat: Some(52.5),
		tile_mime_type: Some("application/x-protobuf".to_string()),
		..MetadataBlock::default()
	};
	metadata.set_bbox(13.08, 52.33, 13.76, 52.67);
	metadata
}

/// Tiles of a small pyramid. Every fourth tile shares its payload with the others of its level.
fn pyramid(max_level: u8) -> BTreeMap<Quadkey, Blob> {
	let mut tiles = BTreeMap::new();
	for level in 0..=max_level {
		let size = 1u32 << level;
		let step = (size / 8).max(1);
		for x in (0..size).step_by(step as usize) {
			for y in (0..size).step_by(step as usize) {
				let payload = if (x + y) % 4 == 0 {
					format!("shared tile of level {level}")
				} else {
					format!("tile {level}/{x}/{y}")
				};
				tiles.insert(Quadkey::from_tile(level, x, y).unwrap(), Blob::from(payload));
			}
		}
	}
	tiles
}

fn write_memory(tiles: &BTreeMap<Quadkey, Blob>, config: WriterConfig) -> Result<Blob> {
	let mut writer = ContainerWriter::new(DataWriterBlob::new()?, berlin(), config)?;
	for (quadkey, payload) in tiles {
		writer.write_quadkey(quadkey, payload)?;
	}
	writer.finalize()?;
	Ok(writer.into_inner().into_blob())
}

async fn open_memory(blob: Blob) -> Result<ContainerReader> {
	let reader: DataReader = Box::new(DataReaderBlob::from(blob));
	ContainerReader::open_reader(reader, ReaderConfig::default()).await
}

#[tokio::test]
async fn file_round_trip() -> Result<()> {
	let temp_dir = TempDir::new()?;
	let path = temp_dir.path().join("berlin.maptiles");
	let tiles = pyramid(9);

	let mut writer = ContainerWriter::write_to_path(&path, berlin(), WriterConfig::default())?;
	for (quadkey, payload) in &tiles {
		writer.write_tile(quadkey.as_str(), payload)?;
	}
	writer.add_additional_metadata(Blob::from("{\"attribution\":\"© OpenStreetMap contributors\"}"))?;
	writer.finalize()?;

	let reader = ContainerReader::open_path(&path).await?;
	assert_eq!(reader.metadata().name, berlin().name);
	assert_eq!(reader.metadata().initial_lat, Some(52.5));
	assert_eq!(reader.metadata().bbox_north, Some(52.67));
	assert_eq!(reader.additional_metadata().await?.len(), 1);

	for (quadkey, payload) in &tiles {
		assert_eq!(reader.lookup_quadkey(quadkey).await?.as_ref(), Some(payload), "{quadkey}");
	}
	assert_eq!(reader.lookup_tile_coord(9, 1, 0).await?, None);
	assert_eq!(reader.lookup_tile("0000000000").await?, None);
	Ok(())
}

#[tokio::test]
async fn every_configuration_round_trips() -> Result<()> {
	let tiles = pyramid(7);
	for depth in [1, 2, 3, 5, 8] {
		for width in [EntryWidth::Four, EntryWidth::Eight] {
			let reader = open_memory(write_memory(&tiles, WriterConfig::new(width, depth))?).await?;
			for (quadkey, payload) in &tiles {
				assert_eq!(
					reader.lookup_quadkey(quadkey).await?.as_ref(),
					Some(payload),
					"{quadkey} with depth {depth} and width {width}"
				);
			}
		}
	}
	Ok(())
}

#[tokio::test]
async fn identical_payloads_are_stored_once() -> Result<()> {
	let payload = Blob::from(vec![42u8; 4096]);
	let mut tiles = BTreeMap::new();
	for quadkey in ["", "0", "00", "000", "0000", "00000", "000000"] {
		tiles.insert(Quadkey::parse(quadkey)?, payload.clone());
	}

	let container = write_memory(&tiles, WriterConfig::new(EntryWidth::Four, 2))?;
	assert!(container.len() < 2 * 4096, "{} bytes", container.len());

	let reader = open_memory(container).await?;
	for quadkey in tiles.keys() {
		assert_eq!(reader.lookup_quadkey(quadkey).await?, Some(payload.clone()));
	}
	Ok(())
}

#[tokio::test]
async fn last_write_wins() -> Result<()> {
	let mut writer = ContainerWriter::new(DataWriterBlob::new()?, berlin(), WriterConfig::new(EntryWidth::Four, 2))?;
	writer.write_tile("31", &Blob::from("first"))?;
	writer.write_tile("3102", &Blob::from("child"))?;
	writer.write_tile("31", &Blob::from("second"))?;
	writer.write_tile_coord(2, 3, 2, &Blob::from("third"))?;
	writer.finalize()?;

	let reader = open_memory(writer.into_inner().into_blob()).await?;
	assert_eq!(Quadkey::from_tile(2, 3, 2)?.as_str(), "31");
	assert_eq!(reader.lookup_tile("31").await?, Some(Blob::from("third")));
	assert_eq!(reader.lookup_tile("3102").await?, Some(Blob::from("child")));
	Ok(())
}

#[tokio::test]
async fn deepest_quadkeys() -> Result<()> {
	let deepest = "01230123012301230123012";
	let mut writer = ContainerWriter::new(DataWriterBlob::new()?, berlin(), WriterConfig::new(EntryWidth::Eight, 4))?;
	writer.write_tile(deepest, &Blob::from("deepest"))?;
	writer.write_tile(&deepest[..22], &Blob::from("parent"))?;
	writer.write_tile(&deepest[..4], &Blob::from("shallow"))?;
	writer.finalize()?;

	let reader = open_memory(writer.into_inner().into_blob()).await?;
	assert_eq!(reader.lookup_tile(deepest).await?, Some(Blob::from("deepest")));
	assert_eq!(reader.lookup_tile(&deepest[..22]).await?, Some(Blob::from("parent")));
	assert_eq!(reader.lookup_tile(&deepest[..4]).await?, Some(Blob::from("shallow")));
	assert_eq!(reader.lookup_tile(&deepest[..21]).await?, None);
	assert_eq!(reader.lookup_tile("01230123012301230123013").await?, None);

	let err = reader.lookup_tile("012301230123012301230123").await.unwrap_err();
	assert!(matches!(
		err.downcast_ref::<MapTilesError>(),
		Some(MapTilesError::SchemaViolation { .. })
	));
	Ok(())
}

#[tokio::test]
async fn digit_four_is_not_addressable() -> Result<()> {
	let mut writer = ContainerWriter::new(DataWriterBlob::new()?, berlin(), WriterConfig::default())?;
	let err = writer.write_tile("104", &Blob::from("x")).unwrap_err();
	assert!(matches!(
		err.downcast_ref::<MapTilesError>(),
		Some(MapTilesError::QuadkeyOutOfRange { .. })
	));
	writer.finalize()?;

	let reader = open_memory(writer.into_inner().into_blob()).await?;
	let err = reader.lookup_tile("104").await.unwrap_err();
	assert!(matches!(
		err.downcast_ref::<MapTilesError>(),
		Some(MapTilesError::QuadkeyOutOfRange { .. })
	));
	Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_lookups() -> Result<()> {
	let tiles = pyramid(8);
	let config = ReaderConfig { index_cache_size: 8 };
	let reader: DataReader = Box::new(DataReaderBlob::from(write_memory(&tiles, WriterConfig::new(EntryWidth::Four, 3))?));
	let reader = Arc::new(ContainerReader::open_reader(reader, config).await?);

	let handles = tiles.iter().map(|(quadkey, payload)| {
		let reader = Arc::clone(&reader);
		let quadkey = quadkey.clone();
		let payload = payload.clone();
		tokio::spawn(async move {
			let tile = reader.lookup_quadkey(&quadkey).await?;
			anyhow::ensure!(tile == Some(payload), "wrong payload for {quadkey}");
			Ok::<_, anyhow::Error>(())
		})
	});

	for result in try_join_all(handles).await? {
		result?;
	}
	Ok(())
}

#[tokio::test]
async fn corrupt_containers() -> Result<()> {
	let container = write_memory(&pyramid(3), WriterConfig::default())?.into_vec();

	let mut wrong_version = container.clone();
	wrong_version[8] = 2;
	let err = open_memory(Blob::from(wrong_version)).await.unwrap_err();
	assert!(matches!(
		err.downcast_ref::<MapTilesError>(),
		Some(MapTilesError::CorruptContainer { block: "header", .. })
	));
	assert!(matches!(
		err.root_cause().downcast_ref::<MapTilesError>(),
		Some(MapTilesError::SchemaViolation { field: "version", .. })
	));

	let mut wrong_tag = container.clone();
	wrong_tag[13] = b'I';
	let err = open_memory(Blob::from(wrong_tag)).await.unwrap_err();
	assert!(matches!(
		err.downcast_ref::<MapTilesError>(),
		Some(MapTilesError::CorruptContainer { block: "metadata", offset: 13, .. })
	));

	let mut wrong_root = container.clone();
	wrong_root[13 + 476 + 1] = 5;
	let err = open_memory(Blob::from(wrong_root)).await.unwrap_err();
	assert!(matches!(
		err.root_cause().downcast_ref::<MapTilesError>(),
		Some(MapTilesError::SchemaViolation {
			block: "index_block",
			field: "entry_length",
			..
		})
	));
	Ok(())
}

#[tokio::test]
async fn empty_container() -> Result<()> {
	let file = assert_fs::NamedTempFile::new("empty.maptiles")?;
	let mut writer = ContainerWriter::write_to_path(file.path(), MetadataBlock::default(), WriterConfig::default())?;
	writer.finalize()?;
	assert!(matches!(
		writer.write_tile("", &Blob::from("late")).unwrap_err().downcast_ref::<MapTilesError>(),
		Some(MapTilesError::WriterClosed)
	));

	let reader = ContainerReader::open_path(file.path()).await?;
	assert_eq!(reader.metadata(), &MetadataBlock::default());
	assert_eq!(reader.additional_metadata().await?, Vec::<Blob>::new());
	assert_eq!(reader.lookup_tile("").await?, None);
	assert_eq!(reader.lookup_tile("3210").await?, None);
	Ok(())
}

#[tokio::test]
async fn additional_metadata_keeps_its_order() -> Result<()> {
	let mut writer = ContainerWriter::new(DataWriterBlob::new()?, berlin(), WriterConfig::default())?;
	let payloads: Vec<Blob> = ["style", "legend", "", "attribution"].into_iter().map(Blob::from).collect();
	for payload in &payloads {
		writer.add_additional_metadata(payload.clone())?;
	}
	writer.write_tile("2", &Blob::from("tile"))?;
	writer.finalize()?;

	let reader = open_memory(writer.into_inner().into_blob()).await?;
	assert_eq!(reader.additional_metadata().await?, payloads);
	assert!(reader.metadata().additional_metadata_offset.is_some());
	Ok(())
}

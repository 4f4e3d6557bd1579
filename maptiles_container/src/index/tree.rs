//! In-memory index built while writing a container.
//!
//! The index is a tree of ladders. A ladder is anchored at a quadkey `q` and owns one index block per level
//! `|q|..=|q|+depth`, each holding the descendants of `q` at that level. The deepest block is the ladder's
//! entry block. Quadkeys below the entry level go into a child ladder anchored at their ancestor on the entry
//! level, linked from that ancestor's slot. A tile stored for the anchor itself moves into slot 0 of the child's
//! level-0 block.
//!
//! Within a ladder the blocks are chained from deeper to shallower levels by their parent offsets, and the
//! level-0 block points to the entry block of the parent ladder. Blocks without any entry are omitted, except
//! the level-0 and entry blocks, which keep every chain intact.

use crate::{EntryWidth, IndexBlock, IndexEntry, MapTilesError, Quadkey, WriterConfig, schema::INDEX_HEADER_LENGTH};
use anyhow::{Result, bail};
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
	Tile(u64),
	Ladder(usize),
}

#[derive(Debug)]
struct Ladder {
	anchor: Quadkey,
	parent: Option<usize>,
	levels: BTreeMap<u8, BTreeMap<usize, Slot>>,
}

impl Ladder {
	fn new(anchor: Quadkey, parent: Option<usize>) -> Ladder {
		Ladder {
			anchor,
			parent,
			levels: BTreeMap::new(),
		}
	}

	fn slots(&mut self, level: u8) -> &mut BTreeMap<usize, Slot> {
		self.levels.entry(level).or_default()
	}

	fn get(&self, level: u8, slot: usize) -> Option<Slot> {
		self.levels.get(&level)?.get(&slot).copied()
	}

	/// Levels that are written: every level holding an entry plus level 0 and the entry level.
	fn block_levels(&self, depth: u8) -> Vec<u8> {
		self.levels
			.iter()
			.filter(|(_, slots)| !slots.is_empty())
			.map(|(level, _)| *level)
			.chain([0, depth])
			.sorted()
			.dedup()
			.collect()
	}
}

/// Index of a container under construction.
#[derive(Debug)]
pub struct IndexTree {
	entry_width: EntryWidth,
	depth: u8,
	ladders: Vec<Ladder>,
	tile_count: u64,
}

impl IndexTree {
	/// Creates an empty index with a root ladder anchored at the empty quadkey.
	pub fn new(config: &WriterConfig) -> Result<IndexTree> {
		config.validate()?;
		Ok(IndexTree {
			entry_width: config.entry_width,
			depth: config.index_depth,
			ladders: vec![Ladder::new(Quadkey::root(), None)],
			tile_count: 0,
		})
	}

	/// Number of zoom levels covered by one index block.
	#[must_use]
	pub fn depth(&self) -> u8 {
		self.depth
	}

	#[must_use]
	pub fn entry_width(&self) -> EntryWidth {
		self.entry_width
	}

	/// Number of distinct quadkeys with a tile.
	#[must_use]
	pub fn tile_count(&self) -> u64 {
		self.tile_count
	}

	/// Number of index blocks [`IndexTree::layout`] will produce.
	#[must_use]
	pub fn block_count(&self) -> usize {
		self.ladders.iter().map(|ladder| ladder.block_levels(self.depth).len()).sum()
	}

	/// Records the tile block offset of a quadkey, replacing an earlier offset.
	pub fn insert(&mut self, quadkey: &Quadkey, tile_offset: u64) -> Result<()> {
		if !quadkey.is_addressable() {
			bail!(MapTilesError::out_of_range(quadkey));
		}
		// Fails early for offsets a slot can not hold.
		IndexEntry::Tile(tile_offset).encode(self.entry_width)?;

		let depth = self.depth;
		let mut current = 0;
		loop {
			let anchor = self.ladders[current].anchor.clone();
			let relative = quadkey.level() - anchor.level();

			if relative <= depth as usize {
				let level = relative as u8;
				let slot = quadkey.slot_in(&anchor, level)?;
				let target = match self.ladders[current].get(level, slot) {
					Some(Slot::Ladder(child)) if level == depth => (child, 0, 0),
					_ => (current, level, slot),
				};
				let previous = self.ladders[target.0].slots(target.1).insert(target.2, Slot::Tile(tile_offset));
				if !matches!(previous, Some(Slot::Tile(_))) {
					self.tile_count += 1;
				}
				return Ok(());
			}

			let Some(ancestor) = quadkey.ancestor(anchor.level() + depth as usize) else {
				bail!(MapTilesError::out_of_range(quadkey));
			};
			let slot = ancestor.slot_in(&anchor, depth)?;
			current = match self.ladders[current].get(depth, slot) {
				Some(Slot::Ladder(child)) => child,
				existing => {
					let child = self.ladders.len();
					let mut ladder = Ladder::new(ancestor, Some(current));
					if let Some(Slot::Tile(offset)) = existing {
						ladder.slots(0).insert(0, Slot::Tile(offset));
					}
					self.ladders.push(ladder);
					self.ladders[current].slots(depth).insert(slot, Slot::Ladder(child));
					child
				}
			};
		}
	}

	/// Looks up the tile block offset recorded for a quadkey.
	#[must_use]
	pub fn get(&self, quadkey: &Quadkey) -> Option<u64> {
		if !quadkey.is_addressable() {
			return None;
		}
		let mut current = 0;
		loop {
			let ladder = &self.ladders[current];
			let relative = quadkey.level() - ladder.anchor.level();
			if relative <= self.depth as usize {
				let level = relative as u8;
				let slot = quadkey.slot_in(&ladder.anchor, level).ok()?;
				return match ladder.get(level, slot)? {
					Slot::Tile(offset) => Some(offset),
					Slot::Ladder(child) => match self.ladders[child].get(0, 0)? {
						Slot::Tile(offset) => Some(offset),
						Slot::Ladder(_) => None,
					},
				};
			}
			let ancestor = quadkey.ancestor(ladder.anchor.level() + self.depth as usize)?;
			let slot = ancestor.slot_in(&ladder.anchor, self.depth).ok()?;
			match ladder.get(self.depth, slot)? {
				Slot::Ladder(child) => current = child,
				Slot::Tile(_) => return None,
			}
		}
	}

	/// Assigns file offsets to all index blocks and encodes them.
	///
	/// The entry block of the root ladder is placed at `root_offset`, all other blocks follow each other from
	/// `start_offset` on. Returns the blocks ordered by offset.
	pub fn layout(&self, root_offset: u64, start_offset: u64) -> Result<Vec<(u64, IndexBlock)>> {
		let mut offsets: HashMap<(usize, u8), u64> = HashMap::new();
		let mut position = start_offset;
		for (index, ladder) in self.ladders.iter().enumerate() {
			for level in ladder.block_levels(self.depth) {
				if index == 0 && level == self.depth {
					offsets.insert((index, level), root_offset);
					continue;
				}
				offsets.insert((index, level), position);
				position += INDEX_HEADER_LENGTH as u64 + IndexBlock::data_len_for(level, self.entry_width);
			}
		}

		let entry_offset = |ladder: usize| offsets[&(ladder, self.depth)];
		let mut blocks = Vec::with_capacity(offsets.len());
		for (index, ladder) in self.ladders.iter().enumerate() {
			let levels = ladder.block_levels(self.depth);
			for (rank, level) in levels.iter().enumerate() {
				let parent_offset = match rank {
					0 => ladder.parent.map(entry_offset),
					_ => Some(offsets[&(index, levels[rank - 1])]),
				};
				let mut block = IndexBlock::new(ladder.anchor.clone(), *level, self.entry_width, parent_offset)?;
				if let Some(slots) = ladder.levels.get(level) {
					for (slot, content) in slots {
						let entry = match content {
							Slot::Tile(offset) => IndexEntry::Tile(*offset),
							Slot::Ladder(child) => IndexEntry::Link(entry_offset(*child)),
						};
						block.set_entry(*slot, entry)?;
					}
				}
				blocks.push((offsets[&(index, *level)], block));
			}
		}

		blocks.sort_by_key(|(offset, _)| *offset);
		Ok(blocks)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Resolution;

	fn qk(text: &str) -> Quadkey {
		Quadkey::parse(text).unwrap()
	}

	fn tree(depth: u8) -> IndexTree {
		IndexTree::new(&WriterConfig::new(EntryWidth::Four, depth)).unwrap()
	}

	/// Resolves a quadkey through encoded blocks the way a reader does.
	fn resolve(blocks: &[(u64, IndexBlock)], root_offset: u64, quadkey: &Quadkey) -> Result<Option<u64>> {
		let lookup: HashMap<u64, &IndexBlock> = blocks.iter().map(|(offset, block)| (*offset, block)).collect();
		let mut offset = root_offset;
		for _ in 0..100 {
			match lookup[&offset].resolve(quadkey)? {
				Resolution::Tile(tile) => return Ok(Some(tile)),
				Resolution::Absent => return Ok(None),
				Resolution::Child(next) | Resolution::Parent(next) => offset = next,
			}
		}
		panic!("no result after 100 hops for {quadkey}");
	}

	#[test]
	fn shallow_quadkeys_stay_in_the_root_ladder() -> Result<()> {
		let mut index = tree(2);
		index.insert(&qk(""), 100)?;
		index.insert(&qk("1"), 200)?;
		index.insert(&qk("12"), 300)?;

		assert_eq!(index.tile_count(), 3);
		assert_eq!(index.block_count(), 3);
		assert_eq!(index.get(&qk("")), Some(100));
		assert_eq!(index.get(&qk("12")), Some(300));
		assert_eq!(index.get(&qk("13")), None);

		let blocks = index.layout(1000, 5000)?;
		let offsets: Vec<u64> = blocks.iter().map(|(offset, _)| *offset).collect();
		assert_eq!(offsets, [1000, 5000, 5038]);
		assert_eq!(blocks[0].1.depth, 2);
		assert_eq!(blocks[0].1.parent_offset, Some(5038));
		assert_eq!(blocks[1].1.depth, 0);
		assert_eq!(blocks[1].1.parent_offset, None);
		assert_eq!(blocks[2].1.depth, 1);
		assert_eq!(blocks[2].1.parent_offset, Some(5000));
		Ok(())
	}

	#[test]
	fn deep_quadkeys_create_child_ladders() -> Result<()> {
		let mut index = tree(2);
		index.insert(&qk("01"), 10)?;
		index.insert(&qk("0123"), 20)?;
		index.insert(&qk("0130"), 30)?;
		index.insert(&qk("012301"), 40)?;

		assert_eq!(index.get(&qk("01")), Some(10));
		assert_eq!(index.get(&qk("0123")), Some(20));
		assert_eq!(index.get(&qk("012301")), Some(40));
		assert_eq!(index.get(&qk("0122")), None);
		assert_eq!(index.get(&qk("012")), None);

		let blocks = index.layout(500, 2000)?;
		for (quadkey, expected) in [
			("01", Some(10)),
			("0123", Some(20)),
			("0130", Some(30)),
			("012301", Some(40)),
			("012300", None),
			("0", None),
			("", None),
			("3333333", None),
		] {
			assert_eq!(resolve(&blocks, 500, &qk(quadkey))?, expected, "{quadkey}");
		}
		Ok(())
	}

	#[test]
	fn anchor_tile_moves_into_the_child_ladder() -> Result<()> {
		let mut index = tree(1);
		index.insert(&qk("2"), 7)?;
		index.insert(&qk("21"), 8)?;
		assert_eq!(index.get(&qk("2")), Some(7));

		index.insert(&qk("2"), 9)?;
		assert_eq!(index.get(&qk("2")), Some(9));
		assert_eq!(index.tile_count(), 2);

		let blocks = index.layout(100, 200)?;
		assert_eq!(resolve(&blocks, 100, &qk("2"))?, Some(9));
		assert_eq!(resolve(&blocks, 100, &qk("21"))?, Some(8));
		assert_eq!(resolve(&blocks, 100, &qk("20"))?, None);
		Ok(())
	}

	#[test]
	fn last_write_wins() -> Result<()> {
		let mut index = tree(3);
		index.insert(&qk("123"), 1)?;
		index.insert(&qk("123"), 2)?;
		assert_eq!(index.tile_count(), 1);
		assert_eq!(index.get(&qk("123")), Some(2));
		Ok(())
	}

	#[test]
	fn unaddressable_quadkeys() {
		let mut index = tree(2);
		let err = index.insert(&qk("14"), 1).unwrap_err();
		assert!(matches!(
			err.downcast_ref::<MapTilesError>(),
			Some(MapTilesError::QuadkeyOutOfRange { .. })
		));
		assert_eq!(index.get(&qk("14")), None);
	}

	#[test]
	fn offsets_must_fit_the_entry_width() {
		let mut index = tree(2);
		assert!(index.insert(&qk("1"), 1 << 31).is_err());
		assert!(index.insert(&qk("1"), 0).is_err());
		assert_eq!(index.tile_count(), 0);
	}

	#[test]
	fn depth_zero_is_rejected() {
		assert!(IndexTree::new(&WriterConfig::new(EntryWidth::Four, 0)).is_err());
	}

	#[test]
	fn empty_index() -> Result<()> {
		let index = tree(4);
		let blocks = index.layout(489, 1000)?;
		assert_eq!(blocks.len(), 2);
		assert_eq!(blocks[0].0, 489);
		assert_eq!(blocks[0].1.block_len(), 34 + 256 * 4);
		assert_eq!(resolve(&blocks, 489, &qk("0123"))?, None);
		assert_eq!(resolve(&blocks, 489, &qk("01230123"))?, None);
		Ok(())
	}
}

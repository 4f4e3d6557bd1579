//! A bounded key-value cache used by container readers to keep parsed blocks around between lookups.
//!
//! Once the number of entries reaches the limit, the older half (by last access) is dropped.
//!
//! ```rust
//! use maptiles_core::LimitedCache;
//!
//! let mut cache = LimitedCache::<u64, &str>::with_maximum_length(16);
//! cache.add(13, "index block");
//! assert_eq!(cache.get(&13), Some("index block"));
//! assert_eq!(cache.get(&14), None);
//! ```

use std::{collections::HashMap, fmt::Debug, hash::Hash};

/// A generic cache holding at most `max_length` entries.
pub struct LimitedCache<K, V> {
	cache: HashMap<K, (V, u64)>,
	max_length: usize,
	last_index: u64,
}

impl<K, V> LimitedCache<K, V>
where
	V: Clone,
	K: Clone + Eq + Hash,
{
	/// Creates a new cache that holds at most `max_length` entries.
	///
	/// # Panics
	/// Panics if `max_length` is zero.
	pub fn with_maximum_length(max_length: usize) -> Self {
		assert!(max_length > 0, "a cache must be able to store at least one element");
		Self {
			cache: HashMap::new(),
			max_length,
			last_index: 0,
		}
	}

	/// Retrieves a value and marks it as recently used.
	pub fn get(&mut self, key: &K) -> Option<V> {
		let entry = self.cache.get_mut(key)?;
		self.last_index += 1;
		entry.1 = self.last_index;
		Some(entry.0.clone())
	}

	/// Adds a key-value pair, evicting the least recently used half if the cache is full.
	///
	/// Returns the cached value, which is the already stored one if the key was present.
	pub fn add(&mut self, key: K, value: V) -> V {
		if self.cache.len() >= self.max_length {
			self.cleanup();
		}

		self.last_index += 1;
		self
			.cache
			.entry(key)
			.or_insert((value, self.last_index))
			.0
			.clone()
	}

	/// Returns the number of cached entries.
	pub fn len(&self) -> usize {
		self.cache.len()
	}

	/// Returns `true` if nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.cache.is_empty()
	}

	fn cleanup(&mut self) {
		let mut latest_access: Vec<u64> = self.cache.values().map(|e| e.1).collect();
		latest_access.sort_unstable();
		let median = latest_access[latest_access.len() / 2];
		self.cache.retain(|_, e| e.1 > median);
	}
}

impl<K, V> Debug for LimitedCache<K, V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LimitedCache")
			.field("length", &self.cache.len())
			.field("max_length", &self.max_length)
			.finish()
	}
}

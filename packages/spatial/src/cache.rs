//! Join index cache.
//!
//! One LRU per join dataset, keyed by the exact window bounds. Entries are
//! immutable `Arc<JoinIndex>` values, so readers never block each other
//! for longer than a map lookup. Two requests racing to build the same
//! index both build it; the last insert wins.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use building_map_building_models::BoundingWindow;
use lru::LruCache;

use crate::index::JoinIndex;

/// Exact-bounds cache key for a [`BoundingWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowKey([u64; 4]);

impl From<&BoundingWindow> for WindowKey {
    fn from(window: &BoundingWindow) -> Self {
        // Adding 0.0 folds -0.0 into 0.0 so both map to one key.
        let bits = |v: f64| (v + 0.0).to_bits();
        Self([
            bits(window.north),
            bits(window.south),
            bits(window.east),
            bits(window.west),
        ])
    }
}

/// Per-dataset LRU cache of join indexes.
pub struct IndexCache {
    capacity: NonZeroUsize,
    datasets: Mutex<BTreeMap<String, LruCache<WindowKey, Arc<JoinIndex>>>>,
}

impl IndexCache {
    /// Creates a cache holding up to `capacity` windows per dataset
    /// (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            datasets: Mutex::new(BTreeMap::new()),
        }
    }

    /// The cached index for `dataset` and `window`, marking it recently
    /// used.
    #[must_use]
    pub fn get(&self, dataset: &str, window: &BoundingWindow) -> Option<Arc<JoinIndex>> {
        let mut datasets = self.datasets.lock().ok()?;
        datasets.get_mut(dataset)?.get(&WindowKey::from(window)).cloned()
    }

    /// Stores `index`, evicting the dataset's least recently used window
    /// when full.
    pub fn insert(&self, dataset: &str, window: &BoundingWindow, index: Arc<JoinIndex>) {
        let Ok(mut datasets) = self.datasets.lock() else {
            log::warn!("Index cache lock poisoned, not caching {dataset}");
            return;
        };

        let cache = datasets
            .entry(dataset.to_string())
            .or_insert_with(|| LruCache::new(self.capacity));
        if let Some((evicted, _)) = cache.push(WindowKey::from(window), index) {
            if evicted != WindowKey::from(window) {
                log::debug!("Evicted a {dataset} join index from the cache");
            }
        }
    }

    /// Number of cached indexes across all datasets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.datasets
            .lock()
            .map_or(0, |datasets| datasets.values().map(LruCache::len).sum())
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached index.
    pub fn clear(&self) {
        if let Ok(mut datasets) = self.datasets.lock() {
            datasets.clear();
        }
    }
}

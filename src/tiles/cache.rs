use crate::core::geo::TileCoord;
use crate::prelude::{Arc, Mutex};
use image::RgbaImage;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

const DEFAULT_CAPACITY: usize = 256;

/// Hit/miss counters for a [`TileCache`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

/// In-memory tile cache using LRU eviction, shared by every render of a
/// renderer. Clones share the same storage.
///
/// Only successfully decoded tiles are stored. Two renders that miss on the
/// same tile both populate it with identical pixels, so concurrent
/// population is idempotent.
#[derive(Debug)]
pub struct TileCache {
    cache: Arc<Mutex<LruCache<TileCoord, Arc<RgbaImage>>>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl TileCache {
    /// Create a new tile cache with the given capacity
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create a new tile cache with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Get a tile from the cache, counting the lookup as a hit or a miss.
    pub fn get(&self, coord: &TileCoord) -> Option<Arc<RgbaImage>> {
        let found = self.cache.lock().ok()?.get(coord).cloned();
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Insert a tile into the cache
    pub fn put(&self, coord: TileCoord, tile: Arc<RgbaImage>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(coord, tile);
        }
    }

    /// Check if a tile is in the cache without touching its recency
    pub fn contains(&self, coord: &TileCoord) -> bool {
        self.cache
            .lock()
            .map(|cache| cache.contains(coord))
            .unwrap_or(false)
    }

    /// Clear all tiles from the cache
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    /// Get the current number of cached tiles
    pub fn len(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.len(),
        }
    }
}

impl Clone for TileCache {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            hits: Arc::clone(&self.hits),
            misses: Arc::clone(&self.misses),
        }
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

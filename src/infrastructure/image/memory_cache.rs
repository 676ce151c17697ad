//! In-memory LRU image cache implementation.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::{CacheEntry, CacheKey};
use crate::domain::ports::MemoryCachePort;

/// Default memory budget in bytes (50 MB).
pub const DEFAULT_MEMORY_CAPACITY: u64 = 50 * 1024 * 1024;

/// In-memory LRU cache for raw image bytes, bounded by total resident size.
///
/// Entries are evicted least-recently-used first. Entries that were never read
/// leave in insertion order. An entry larger than the whole budget is never admitted.
pub struct MemoryImageCache {
    state: Mutex<MemoryState>,
    capacity: u64,
    hits: AtomicU64,
    misses: AtomicU64,
}

struct MemoryState {
    entries: LruCache<CacheKey, CacheEntry>,
    resident: u64,
}

impl MemoryImageCache {
    /// Creates a new cache holding at most `capacity` bytes.
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                entries: LruCache::unbounded(),
                resident: 0,
            }),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a new cache with the default capacity.
    #[must_use]
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }

    /// Returns the byte budget.
    #[must_use]
    pub const fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Returns the total size of resident entries in bytes.
    #[must_use]
    pub fn resident_bytes(&self) -> u64 {
        self.state.lock().resident
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let state = self.state.lock();
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: state.entries.len(),
            resident_bytes: state.resident,
        }
    }

    /// Peeks at an entry without promoting it in the LRU.
    #[must_use]
    pub fn peek(&self, key: &CacheKey) -> Option<Bytes> {
        self.state.lock().entries.peek(key).map(|e| e.bytes.clone())
    }

    /// Removes a single entry.
    pub fn evict(&self, key: &CacheKey) -> bool {
        let mut state = self.state.lock();
        if let Some(entry) = state.entries.pop(key) {
            state.resident -= entry.size;
            debug!(key = %key, "Evicted image from memory cache");
            true
        } else {
            false
        }
    }
}

impl Default for MemoryImageCache {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl std::fmt::Debug for MemoryImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryImageCache")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached images.
    pub size: usize,
    /// Current resident size in bytes.
    pub resident_bytes: u64,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} images ({} bytes), {:.1}% hit rate ({} hits, {} misses)",
            self.size, self.resident_bytes, self.hit_rate, self.hits, self.misses
        )
    }
}

impl MemoryCachePort for MemoryImageCache {
    fn get(&self, key: &CacheKey) -> Option<Bytes> {
        let mut state = self.state.lock();
        if let Some(entry) = state.entries.get_mut(key) {
            entry.touch();
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache hit");
            Some(entry.bytes.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache miss");
            None
        }
    }

    fn put(&self, key: CacheKey, bytes: Bytes) {
        let entry = CacheEntry::new(key.clone(), bytes);
        let mut state = self.state.lock();

        if let Some(old) = state.entries.pop(&key) {
            state.resident -= old.size;
        }

        if entry.size > self.capacity {
            debug!(
                key = %key,
                size = entry.size,
                capacity = self.capacity,
                "Image larger than memory cache, not caching"
            );
            return;
        }

        state.resident += entry.size;
        debug!(key = %key, size = entry.size, "Storing image in memory cache");
        state.entries.put(key, entry);

        while state.resident > self.capacity {
            let Some((evicted, entry)) = state.entries.pop_lru() else {
                break;
            };
            state.resident -= entry.size;
            trace!(key = %evicted, size = entry.size, "Evicted least recently used image");
        }
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.resident = 0;
        debug!("Cleared memory image cache");
    }

    fn len(&self) -> usize {
        self.state.lock().entries.len()
    }
}

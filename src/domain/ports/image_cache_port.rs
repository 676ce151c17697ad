//! Port definitions for image cache tiers.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::entities::CacheKey;
use crate::domain::errors::CacheResult;

/// Port for the in-process cache tier.
///
/// Operations are synchronous: the memory tier must never suspend the caller.
/// Implementations must be thread-safe.
#[cfg_attr(test, mockall::automock)]
pub trait MemoryCachePort: Send + Sync {
    /// Returns the cached bytes and marks the entry as most recently used.
    /// Returns None if not cached.
    fn get(&self, key: &CacheKey) -> Option<Bytes>;

    /// Inserts or overwrites an entry, evicting as needed to stay within capacity.
    fn put(&self, key: CacheKey, bytes: Bytes);

    /// Removes every entry.
    fn clear(&self);

    /// Returns the current number of cached entries.
    fn len(&self) -> usize;

    /// Returns true if the cache is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Port for the persistent cache tier.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiskCachePort: Send + Sync {
    /// Reads the bytes stored under `key`.
    /// Missing or unreadable entries are a miss.
    async fn get(&self, key: &CacheKey) -> Option<Bytes>;

    /// Persists `bytes` under `key`, replacing any previous entry.
    async fn put(&self, key: &CacheKey, bytes: Bytes) -> CacheResult<()>;

    /// Removes every stored entry, continuing past individual failures.
    async fn clear(&self) -> CacheResult<()>;
}

//! Domain types for cached image data.

use std::time::Instant;

use bytes::Bytes;

/// Length of a cache key in hex characters (16 bytes of SHA-256).
pub const CACHE_KEY_LEN: usize = 32;

/// Stable identifier for a cached image.
/// Derived from a hash of the normalized request URL, so it is also safe to use as a file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Creates a `CacheKey` from a URL by hashing it.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(url.trim().as_bytes());
        let result = hasher.finalize();
        Self(hex::encode(&result[..CACHE_KEY_LEN / 2]))
    }

    /// Parses a key previously produced by [`CacheKey::from_url`], e.g. from a cache file name.
    #[must_use]
    pub fn from_hex(value: &str) -> Option<Self> {
        let valid = value.len() == CACHE_KEY_LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(value.to_string()))
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single resident entry of an in-process cache tier.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Key the entry is stored under.
    pub key: CacheKey,
    /// Raw image bytes.
    pub bytes: Bytes,
    /// Size of `bytes` in bytes.
    pub size: u64,
    /// Last time the entry was written or read.
    pub last_accessed: Instant,
}

impl CacheEntry {
    /// Creates a fresh entry, stamped with the current time.
    #[must_use]
    pub fn new(key: CacheKey, bytes: Bytes) -> Self {
        Self {
            key,
            size: bytes.len() as u64,
            bytes,
            last_accessed: Instant::now(),
        }
    }

    /// Marks the entry as just used.
    pub fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }
}

/// Where an image was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSource {
    /// Loaded from the in-memory LRU cache.
    MemoryCache,
    /// Loaded from the disk cache.
    DiskCache,
    /// Downloaded from the network.
    Network,
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MemoryCache => f.pad("memory"),
            Self::DiskCache => f.pad("disk"),
            Self::Network => f.pad("network"),
        }
    }
}

/// Image bytes together with where they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    /// Cache key of the image.
    pub key: CacheKey,
    /// Raw image bytes.
    pub bytes: Bytes,
    /// Tier that produced the bytes.
    pub source: ImageSource,
}

impl LoadedImage {
    /// Creates a new loaded image.
    #[must_use]
    pub const fn new(key: CacheKey, bytes: Bytes, source: ImageSource) -> Self {
        Self { key, bytes, source }
    }

    /// Returns the payload size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

//! Disk-based image cache for persistence across sessions.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::{debug, trace, warn};

use crate::domain::entities::CacheKey;
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::DiskCachePort;

/// Extension of committed cache files.
const ENTRY_EXTENSION: &str = "img";

/// Prefix of in-progress writes. Such files are never treated as entries.
const TEMP_PREFIX: &str = ".tmp-";

/// Disk-based image cache that persists raw image bytes, one file per key.
///
/// Writes land in a temporary file in the same directory and are renamed into
/// place once complete, so readers see either the previous entry, the new one,
/// or a miss. The store does not bound its own size.
#[derive(Debug, Clone)]
pub struct DiskImageCache {
    cache_dir: PathBuf,
}

/// Space used by the disk cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskUsage {
    /// Number of committed entries.
    pub entries: usize,
    /// Total size of committed entries in bytes.
    pub bytes: u64,
}

impl DiskImageCache {
    /// Creates a disk cache rooted at `cache_dir`.
    /// The directory is created on the first write.
    #[must_use]
    pub const fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Creates a cache in the default location (the platform cache dir + `images/`).
    #[must_use]
    pub fn default_location() -> Self {
        Self::new(default_cache_dir())
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path for a cached image.
    fn cache_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{ENTRY_EXTENSION}", key.as_str()))
    }

    /// Gets raw image bytes from disk cache.
    pub async fn get_bytes(&self, key: &CacheKey) -> Option<Bytes> {
        let path = self.cache_path(key);
        match fs::read(&path).await {
            Ok(bytes) => {
                trace!(key = %key, path = %path.display(), "Disk cache hit");
                Some(Bytes::from(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(key = %key, "Disk cache miss");
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read cache file, treating as miss");
                None
            }
        }
    }

    /// Stores raw bytes in the disk cache, replacing any previous entry.
    ///
    /// # Errors
    /// Returns error if the directory or file cannot be created, written or renamed.
    pub async fn put_bytes(&self, key: &CacheKey, bytes: Bytes) -> CacheResult<()> {
        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| CacheError::io(format!("Failed to create cache dir: {e}")))?;

        let dir = self.cache_dir.clone();
        let path = self.cache_path(key);
        let size = bytes.len();

        tokio::task::spawn_blocking(move || write_atomically(&dir, &path, &bytes))
            .await
            .map_err(|e| CacheError::io(format!("Cache write task panicked: {e}")))??;

        debug!(key = %key, size = size, "Stored image in disk cache");
        Ok(())
    }

    /// Removes an image from disk cache.
    /// Returns false if there was nothing to remove.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be removed.
    pub async fn remove(&self, key: &CacheKey) -> CacheResult<bool> {
        match fs::remove_file(self.cache_path(key)).await {
            Ok(()) => {
                debug!(key = %key, "Removed image from disk cache");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::io(format!("Failed to remove cache file: {e}"))),
        }
    }

    /// Checks if an image is cached.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        fs::try_exists(self.cache_path(key)).await.unwrap_or(false)
    }

    /// Lists the keys of all committed entries.
    ///
    /// # Errors
    /// Returns error if the cache directory cannot be read.
    pub async fn keys(&self) -> CacheResult<Vec<CacheKey>> {
        let mut keys = Vec::new();
        self.for_each_entry(|key, _| keys.push(key)).await?;
        keys.sort();
        Ok(keys)
    }

    /// Returns the number and total size of committed entries.
    ///
    /// # Errors
    /// Returns error if the cache directory cannot be read.
    pub async fn usage(&self) -> CacheResult<DiskUsage> {
        let mut usage = DiskUsage::default();
        self.for_each_entry(|_, len| {
            usage.entries += 1;
            usage.bytes += len;
        })
        .await?;
        Ok(usage)
    }

    /// Clears the entire disk cache, including abandoned temporary files.
    ///
    /// Every file is attempted even if some removals fail.
    ///
    /// # Errors
    /// Returns [`CacheError::PartialClear`] listing the files that could not be
    /// removed, or an I/O error if the directory cannot be read.
    pub async fn clear(&self) -> CacheResult<()> {
        let mut entries = match fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(CacheError::io(format!("Failed to read cache dir: {e}"))),
        };

        let mut removed = 0usize;
        let mut failures = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    failures.push(format!("{}: {e}", self.cache_dir.display()));
                    break;
                }
            };
            let path = entry.path();
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove cache file");
                    failures.push(format!("{}: {e}", path.display()));
                }
            }
        }

        if failures.is_empty() {
            debug!(removed = removed, "Cleared disk cache");
            Ok(())
        } else {
            warn!(
                removed = removed,
                failed = failures.len(),
                "Disk cache cleared partially"
            );
            Err(CacheError::partial_clear(failures))
        }
    }

    async fn for_each_entry(&self, mut f: impl FnMut(CacheKey, u64)) -> CacheResult<()> {
        let mut entries = match fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(CacheError::io(format!("Failed to read cache dir: {e}"))),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CacheError::io(format!("Failed to read entry: {e}")))?
        {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != ENTRY_EXTENSION) {
                continue;
            }
            let Some(key) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(CacheKey::from_hex)
            else {
                continue;
            };
            if let Ok(meta) = entry.metadata().await
                && meta.is_file()
            {
                f(key, meta.len());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DiskCachePort for DiskImageCache {
    async fn get(&self, key: &CacheKey) -> Option<Bytes> {
        self.get_bytes(key).await
    }

    async fn put(&self, key: &CacheKey, bytes: Bytes) -> CacheResult<()> {
        self.put_bytes(key, bytes).await
    }

    async fn clear(&self) -> CacheResult<()> {
        Self::clear(self).await
    }
}

/// Writes `bytes` to a temp file in `dir`, syncs it, then renames it over `path`.
fn write_atomically(dir: &Path, path: &Path, bytes: &[u8]) -> CacheResult<()> {
    let mut temp_file = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(dir)
        .map_err(|e| CacheError::io(format!("Failed to create cache file: {e}")))?;

    temp_file
        .write_all(bytes)
        .map_err(|e| CacheError::io(format!("Failed to write cache file: {e}")))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| CacheError::io(format!("Failed to flush cache file: {e}")))?;
    temp_file
        .persist(path)
        .map_err(|e| CacheError::io(format!("Failed to commit cache file: {}", e.error)))?;

    Ok(())
}

/// Returns the default cache directory path.
fn default_cache_dir() -> PathBuf {
    directories::ProjectDirs::from(crate::APP_QUALIFIER, crate::APP_ORGANIZATION, crate::NAME)
        .map_or_else(
            || std::env::temp_dir().join(crate::NAME).join("cache").join("images"),
            |dirs| dirs.cache_dir().join("images"),
        )
}

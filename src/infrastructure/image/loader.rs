//! Async image loading orchestrator.
//!
//! Implements a tiered cache: Memory -> Disk -> Network, with the active tiers
//! selected by [`CacheMode`]. Concurrent loads of the same key share a single
//! resolution.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::Shared;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{Semaphore, oneshot};
use tracing::{debug, error, info, trace, warn};

use crate::domain::entities::{CacheKey, CacheMode, ImageSource, LoadedImage};
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::{DiskCachePort, ImageFetchPort, ImageLoaderPort, MemoryCachePort};
use crate::infrastructure::config::CacheConfig;

use super::disk_cache::DiskImageCache;
use super::fetcher::{FetcherConfig, HttpImageFetcher};
use super::memory_cache::MemoryImageCache;

// The result is wrapped in a oneshot so every subscriber can await a clone of it.
type LoadChannel = Shared<oneshot::Receiver<CacheResult<LoadedImage>>>;

type InFlightMap = Arc<Mutex<HashMap<CacheKey, LoadChannel>>>;

/// Configuration for the image loader.
#[derive(Debug, Clone)]
pub struct ImageLoaderConfig {
    /// Cache tiers to use.
    pub mode: CacheMode,
    /// Maximum concurrent downloads.
    pub max_concurrent_downloads: usize,
}

impl Default for ImageLoaderConfig {
    fn default() -> Self {
        Self {
            mode: CacheMode::default(),
            max_concurrent_downloads: 4,
        }
    }
}

/// Counters describing how loads were served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// Loads answered by the memory tier.
    pub memory_hits: u64,
    /// Loads answered by the disk tier.
    pub disk_hits: u64,
    /// Fetches issued to the network.
    pub network_fetches: u64,
    /// Loads that joined a resolution already in flight.
    pub coalesced: u64,
    /// Resolutions that ended in an error.
    pub failures: u64,
}

impl std::fmt::Display for LoaderStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Loader: {} memory hits, {} disk hits, {} network fetches, {} coalesced, {} failures",
            self.memory_hits, self.disk_hits, self.network_fetches, self.coalesced, self.failures
        )
    }
}

#[derive(Default)]
struct LoaderCounters {
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    network_fetches: AtomicU64,
    coalesced: AtomicU64,
    failures: AtomicU64,
}

impl LoaderCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> LoaderStats {
        LoaderStats {
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            network_fetches: self.network_fetches.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Orchestrates image loading from memory, disk, and network.
///
/// Every resolution runs in its own spawned task. A caller that stops waiting
/// does not cancel it: the fetch runs to completion, populates the enabled
/// tiers, and its result is dropped if nobody is left to receive it.
#[derive(Clone)]
pub struct ImageLoader {
    memory_cache: Arc<dyn MemoryCachePort>,
    disk_cache: Arc<dyn DiskCachePort>,
    fetcher: Arc<dyn ImageFetchPort>,
    mode: Arc<RwLock<CacheMode>>,
    in_flight: InFlightMap,
    semaphore: Arc<Semaphore>,
    stats: Arc<LoaderCounters>,
    config: ImageLoaderConfig,
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("config", &self.config)
            .field("mode", &self.cache_mode())
            .finish_non_exhaustive()
    }
}

impl ImageLoader {
    /// Creates a new image loader over the given tiers.
    #[must_use]
    pub fn new(
        config: ImageLoaderConfig,
        memory_cache: Arc<dyn MemoryCachePort>,
        disk_cache: Arc<dyn DiskCachePort>,
        fetcher: Arc<dyn ImageFetchPort>,
    ) -> Self {
        let permits = config.max_concurrent_downloads.max(1);
        Self {
            memory_cache,
            disk_cache,
            fetcher,
            mode: Arc::new(RwLock::new(config.mode)),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            semaphore: Arc::new(Semaphore::new(permits)),
            stats: Arc::new(LoaderCounters::default()),
            config,
        }
    }

    /// Creates a loader backed by the real memory, disk and HTTP implementations.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn from_cache_config(config: &CacheConfig) -> CacheResult<Self> {
        let memory_cache = Arc::new(MemoryImageCache::new(config.memory_capacity));
        let disk_cache = Arc::new(DiskImageCache::new(config.effective_disk_cache_dir()));
        let fetcher = Arc::new(HttpImageFetcher::new(&FetcherConfig {
            timeout: Duration::from_secs(config.timeout_secs),
            user_agent: config.user_agent.clone(),
            validate_images: config.validate_images,
            ..FetcherConfig::default()
        })?);

        Ok(Self::new(
            ImageLoaderConfig {
                mode: config.mode,
                max_concurrent_downloads: config.max_concurrent_downloads,
            },
            memory_cache,
            disk_cache,
            fetcher,
        ))
    }

    /// Returns the active cache mode.
    #[must_use]
    pub fn cache_mode(&self) -> CacheMode {
        *self.mode.read()
    }

    /// Switches the active cache mode. Cached entries stay in the tier that holds them.
    pub fn set_cache_mode(&self, mode: CacheMode) {
        let previous = std::mem::replace(&mut *self.mode.write(), mode);
        if previous != mode {
            info!(from = %previous, to = %mode, "Switched image cache mode");
        }
    }

    /// Loads the bytes behind `url`.
    ///
    /// # Errors
    /// Returns error if the image is not cached and cannot be fetched.
    pub async fn load(&self, url: &str) -> CacheResult<Bytes> {
        self.load_image(url).await.map(|image| image.bytes)
    }

    /// Loads an image, checking caches first, and reports which tier served it.
    ///
    /// # Errors
    /// Returns error if the image is not cached and cannot be fetched.
    pub async fn load_image(&self, url: &str) -> CacheResult<LoadedImage> {
        let key = CacheKey::from_url(url);
        let mode = self.cache_mode();

        if mode.uses_memory()
            && let Some(bytes) = self.memory_cache.get(&key)
        {
            LoaderCounters::bump(&self.stats.memory_hits);
            trace!(key = %key, "Served image from memory cache");
            return Ok(LoadedImage::new(key, bytes, ImageSource::MemoryCache));
        }

        let channel = {
            let mut in_flight = self.in_flight.lock();
            if let Some(channel) = in_flight.get(&key) {
                LoaderCounters::bump(&self.stats.coalesced);
                debug!(key = %key, "Joining in-flight image load");
                channel.clone()
            } else {
                let channel = self.spawn_resolution(key.clone(), url.to_string(), mode);
                in_flight.insert(key, channel.clone());
                channel
            }
        };

        channel.await.unwrap_or(Err(CacheError::Cancelled))
    }

    /// Starts loading images in the background, discarding the results.
    pub fn prefetch<I, S>(&self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for url in urls {
            let url = url.into();
            let loader = self.clone();
            tokio::spawn(async move {
                if let Err(e) = loader.load(&url).await {
                    debug!(url = %url, error = %e, "Prefetch failed");
                }
            });
        }
    }

    /// Returns true if an image is currently being resolved.
    #[must_use]
    pub fn is_loading(&self, url: &str) -> bool {
        self.in_flight.lock().contains_key(&CacheKey::from_url(url))
    }

    /// Returns the number of resolutions in flight.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Returns load statistics.
    #[must_use]
    pub fn stats(&self) -> LoaderStats {
        self.stats.snapshot()
    }

    /// Clears the cache tiers enabled by the current mode.
    ///
    /// In-flight loads are left alone; they still deliver their result.
    ///
    /// # Errors
    /// Returns [`CacheError::PartialClear`] if some disk entries could not be removed.
    pub async fn clear_cache(&self) -> CacheResult<()> {
        let mode = self.cache_mode();
        if mode.uses_memory() {
            self.memory_cache.clear();
        }
        if mode.uses_disk() {
            self.disk_cache.clear().await?;
        }
        info!(mode = %mode, "Cleared image cache");
        Ok(())
    }

    /// Spawns the task that resolves `key` and returns the channel its result arrives on.
    /// A panic during resolution is delivered as [`CacheError::Cancelled`] and still
    /// clears the in-flight entry.
    /// Must be called with the in-flight lock held so the entry is registered before the task can remove it.
    fn spawn_resolution(&self, key: CacheKey, url: String, mode: CacheMode) -> LoadChannel {
        let (tx, rx) = oneshot::channel();
        let loader = self.clone();

        tokio::spawn(async move {
            let result = AssertUnwindSafe(loader.resolve(&key, &url, mode))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!(key = %key, url = %url, "Image load panicked");
                    Err(CacheError::Cancelled)
                });
            if let Err(e) = &result {
                LoaderCounters::bump(&loader.stats.failures);
                warn!(key = %key, url = %url, error = %e, "Image load failed");
            }

            loader.in_flight.lock().remove(&key);
            if tx.send(result).is_err() {
                trace!(key = %key, "Image load finished with no subscribers left");
            }
        });

        rx.shared()
    }

    async fn resolve(&self, key: &CacheKey, url: &str, mode: CacheMode) -> CacheResult<LoadedImage> {
        if mode.uses_disk()
            && let Some(bytes) = self.disk_cache.get(key).await
        {
            LoaderCounters::bump(&self.stats.disk_hits);
            if mode.uses_memory() {
                self.memory_cache.put(key.clone(), bytes.clone());
            }
            trace!(key = %key, "Served image from disk cache");
            return Ok(LoadedImage::new(key.clone(), bytes, ImageSource::DiskCache));
        }

        let bytes = {
            let _permit = self
                .semaphore
                .acquire()
                .await
                .map_err(|_| CacheError::Cancelled)?;
            LoaderCounters::bump(&self.stats.network_fetches);
            self.fetcher.fetch(url).await?
        };

        if mode.uses_memory() {
            self.memory_cache.put(key.clone(), bytes.clone());
        }
        if mode.uses_disk()
            && let Err(e) = self.disk_cache.put(key, bytes.clone()).await
        {
            warn!(key = %key, error = %e, "Failed to cache to disk");
        }

        debug!(key = %key, size = bytes.len(), source = "network", "Image loaded successfully");
        Ok(LoadedImage::new(key.clone(), bytes, ImageSource::Network))
    }
}

#[async_trait]
impl ImageLoaderPort for ImageLoader {
    async fn load_image(&self, url: &str) -> CacheResult<LoadedImage> {
        Self::load_image(self, url).await
    }

    async fn clear_cache(&self) -> CacheResult<()> {
        Self::clear_cache(self).await
    }

    fn cache_mode(&self) -> CacheMode {
        Self::cache_mode(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::mocks::{CountingFetcher, FakeDiskCache};
    use crate::domain::ports::{MockDiskCachePort, MockImageFetchPort, MockMemoryCachePort};
    use futures_util::future::join_all;
    use tokio_test::{assert_err, assert_ok};

    const URL: &str = "https://images.example.com/cat.png";

    struct Harness {
        loader: ImageLoader,
        memory: Arc<MemoryImageCache>,
        disk: Arc<FakeDiskCache>,
        fetcher: Arc<CountingFetcher>,
    }

    fn harness_with(mode: CacheMode, fetcher: CountingFetcher, disk: FakeDiskCache) -> Harness {
        let memory = Arc::new(MemoryImageCache::new(1024 * 1024));
        let disk = Arc::new(disk);
        let fetcher = Arc::new(fetcher);
        let loader = ImageLoader::new(
            ImageLoaderConfig {
                mode,
                max_concurrent_downloads: 4,
            },
            memory.clone(),
            disk.clone(),
            fetcher.clone(),
        );
        Harness {
            loader,
            memory,
            disk,
            fetcher,
        }
    }

    fn harness(mode: CacheMode) -> Harness {
        harness_with(mode, CountingFetcher::new(), FakeDiskCache::new())
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_fetch() {
        let h = harness(CacheMode::Memory);

        let results = join_all((0..8).map(|_| h.loader.load(URL))).await;

        assert_eq!(h.fetcher.calls(), 1);
        for result in results {
            assert_eq!(result.unwrap(), CountingFetcher::body_for(URL));
        }
        assert_eq!(h.loader.stats().coalesced, 7);
        assert_eq!(h.loader.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_failure() {
        let h = harness_with(
            CacheMode::Disk,
            CountingFetcher::failing(CacheError::network("HTTP 503: Service Unavailable")),
            FakeDiskCache::new(),
        );

        let results = join_all((0..5).map(|_| h.loader.load(URL))).await;

        assert_eq!(h.fetcher.calls(), 1);
        for result in results {
            assert_eq!(
                result.unwrap_err(),
                CacheError::network("HTTP 503: Service Unavailable")
            );
        }
        assert_eq!(h.loader.stats().failures, 1);
        assert_eq!(h.disk.len(), 0);
    }

    #[tokio::test]
    async fn test_coalescing_applies_without_caching() {
        let h = harness(CacheMode::None);

        let results = join_all((0..3).map(|_| h.loader.load(URL))).await;

        assert_eq!(h.fetcher.calls(), 1);
        assert!(results.iter().all(Result::is_ok));
    }

    #[tokio::test]
    async fn test_distinct_urls_fetch_independently() {
        let h = harness(CacheMode::Memory);
        let urls = ["https://a.example/1.png", "https://a.example/2.png"];

        let results = join_all(urls.iter().map(|url| h.loader.load(url))).await;

        assert_eq!(h.fetcher.calls(), 2);
        assert_eq!(results[0].as_ref().unwrap(), &CountingFetcher::body_for(urls[0]));
        assert_eq!(results[1].as_ref().unwrap(), &CountingFetcher::body_for(urls[1]));
    }

    #[tokio::test]
    async fn test_memory_hit_skips_disk_and_network() {
        let memory = Arc::new(MemoryImageCache::new(1024));
        memory.put(CacheKey::from_url(URL), Bytes::from_static(b"cached"));

        let mut disk = MockDiskCachePort::new();
        disk.expect_get().times(0);
        disk.expect_put().times(0);
        let mut fetcher = MockImageFetchPort::new();
        fetcher.expect_fetch().times(0);

        let loader = ImageLoader::new(
            ImageLoaderConfig {
                mode: CacheMode::Memory,
                max_concurrent_downloads: 1,
            },
            memory,
            Arc::new(disk),
            Arc::new(fetcher),
        );

        let image = loader.load_image(URL).await.unwrap();

        assert_eq!(image.source, ImageSource::MemoryCache);
        assert_eq!(image.bytes, Bytes::from_static(b"cached"));
        assert_eq!(loader.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_disk_mode_never_touches_memory_store() {
        let mut memory = MockMemoryCachePort::new();
        memory.expect_get().times(0);
        memory.expect_put().times(0);
        memory.expect_clear().times(0);
        let disk = Arc::new(FakeDiskCache::new());
        let loader = ImageLoader::new(
            ImageLoaderConfig {
                mode: CacheMode::Disk,
                max_concurrent_downloads: 1,
            },
            Arc::new(memory),
            disk.clone(),
            Arc::new(CountingFetcher::new()),
        );

        let first = loader.load_image(URL).await.unwrap();
        let second = loader.load_image(URL).await.unwrap();
        assert_ok!(loader.clear_cache().await);

        assert_eq!(first.source, ImageSource::Network);
        assert_eq!(second.source, ImageSource::DiskCache);
        assert!(!disk.contains(&CacheKey::from_url(URL)));
    }

    #[tokio::test]
    async fn test_disk_hit_skips_network() {
        let mut fetcher = MockImageFetchPort::new();
        fetcher.expect_fetch().times(0);
        let disk = Arc::new(FakeDiskCache::with_entry(
            CacheKey::from_url(URL),
            Bytes::from_static(b"on disk"),
        ));
        let memory = Arc::new(MemoryImageCache::new(1024));
        let loader = ImageLoader::new(
            ImageLoaderConfig {
                mode: CacheMode::Disk,
                max_concurrent_downloads: 1,
            },
            memory.clone(),
            disk.clone(),
            Arc::new(fetcher),
        );

        let image = loader.load_image(URL).await.unwrap();

        assert_eq!(image.source, ImageSource::DiskCache);
        assert_eq!(image.bytes, Bytes::from_static(b"on disk"));
        assert!(memory.is_empty());
        assert_eq!(loader.stats().disk_hits, 1);
    }

    #[tokio::test]
    async fn test_memory_mode_fetches_once() {
        let h = harness(CacheMode::Memory);

        let first = h.loader.load_image(URL).await.unwrap();
        for _ in 0..5 {
            let again = h.loader.load_image(URL).await.unwrap();
            assert_eq!(again.source, ImageSource::MemoryCache);
            assert_eq!(again.bytes, first.bytes);
        }

        assert_eq!(first.source, ImageSource::Network);
        assert_eq!(h.fetcher.calls(), 1);
        assert_eq!(h.disk.gets() + h.disk.puts(), 0);
    }

    #[tokio::test]
    async fn test_disk_mode_populates_only_disk() {
        let h = harness(CacheMode::Disk);

        let first = h.loader.load_image(URL).await.unwrap();
        let second = h.loader.load_image(URL).await.unwrap();

        assert_eq!(first.source, ImageSource::Network);
        assert_eq!(second.source, ImageSource::DiskCache);
        assert_eq!(h.fetcher.calls(), 1);
        assert!(h.disk.contains(&CacheKey::from_url(URL)));
        assert!(h.memory.is_empty());
    }

    #[tokio::test]
    async fn test_none_mode_always_fetches() {
        let h = harness(CacheMode::None);

        for _ in 0..3 {
            let image = h.loader.load_image(URL).await.unwrap();
            assert_eq!(image.source, ImageSource::Network);
        }

        assert_eq!(h.fetcher.calls(), 3);
        assert!(h.memory.is_empty());
        assert_eq!(h.disk.gets() + h.disk.puts(), 0);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_refetch() {
        for mode in [CacheMode::Memory, CacheMode::Disk] {
            let h = harness(mode);

            assert_ok!(h.loader.load(URL).await);
            assert_ok!(h.loader.clear_cache().await);
            let image = h.loader.load_image(URL).await.unwrap();

            assert_eq!(image.source, ImageSource::Network, "mode {mode}");
            assert_eq!(h.fetcher.calls(), 2, "mode {mode}");
        }
    }

    #[tokio::test]
    async fn test_clear_cache_only_touches_active_tiers() {
        let h = harness(CacheMode::Disk);
        h.memory
            .put(CacheKey::from_url(URL), Bytes::from_static(b"resident"));

        assert_ok!(h.loader.clear_cache().await);

        assert_eq!(h.memory.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_cache_reports_partial_failure() {
        let mut disk = MockDiskCachePort::new();
        disk.expect_clear()
            .times(1)
            .returning(|| Err(CacheError::partial_clear(vec!["a.img: busy".into()])));
        let loader = ImageLoader::new(
            ImageLoaderConfig {
                mode: CacheMode::Disk,
                max_concurrent_downloads: 1,
            },
            Arc::new(MemoryImageCache::new(1024)),
            Arc::new(disk),
            Arc::new(CountingFetcher::new()),
        );

        let err = assert_err!(loader.clear_cache().await);
        assert!(matches!(err, CacheError::PartialClear { failed: 1, .. }));
    }

    #[tokio::test]
    async fn test_modes_do_not_share_entries() {
        let h = harness(CacheMode::Disk);
        assert_ok!(h.loader.load(URL).await);

        h.loader.set_cache_mode(CacheMode::Memory);
        let in_memory_mode = h.loader.load_image(URL).await.unwrap();
        assert_eq!(in_memory_mode.source, ImageSource::Network);

        let other = "https://images.example.com/dog.png";
        assert_ok!(h.loader.load(other).await);
        h.loader.set_cache_mode(CacheMode::Disk);
        let in_disk_mode = h.loader.load_image(other).await.unwrap();
        assert_eq!(in_disk_mode.source, ImageSource::Network);

        assert_eq!(h.fetcher.calls(), 4);
        assert_eq!(h.loader.cache_mode(), CacheMode::Disk);
    }

    #[tokio::test]
    async fn test_failed_disk_write_still_returns_bytes() {
        let mut disk = MockDiskCachePort::new();
        disk.expect_get().times(1).returning(|_| None);
        disk.expect_put()
            .times(1)
            .returning(|_, _| Err(CacheError::io("No space left on device")));
        let fetcher = Arc::new(CountingFetcher::new());
        let loader = ImageLoader::new(
            ImageLoaderConfig {
                mode: CacheMode::Disk,
                max_concurrent_downloads: 1,
            },
            Arc::new(MemoryImageCache::new(1024)),
            Arc::new(disk),
            fetcher.clone(),
        );

        let bytes = loader.load(URL).await.unwrap();

        assert_eq!(bytes, CountingFetcher::body_for(URL));
        assert_eq!(loader.stats().failures, 0);
    }

    #[tokio::test]
    async fn test_dropped_subscriber_does_not_cancel_fetch() {
        let h = harness_with(CacheMode::Memory, CountingFetcher::gated(), FakeDiskCache::new());

        let loader = h.loader.clone();
        let waiter = tokio::spawn(async move { loader.load(URL).await });
        wait_until(|| h.fetcher.calls() == 1).await;

        waiter.abort();
        assert!(h.loader.is_loading(URL));
        h.fetcher.release(1);
        wait_until(|| h.loader.pending_count() == 0).await;

        assert!(h.memory.peek(&CacheKey::from_url(URL)).is_some());
        let image = h.loader.load_image(URL).await.unwrap();
        assert_eq!(image.source, ImageSource::MemoryCache);
        assert_eq!(h.fetcher.calls(), 1);
    }

    struct PanicOnceFetcher {
        calls: AtomicU64,
    }

    #[async_trait]
    impl ImageFetchPort for PanicOnceFetcher {
        async fn fetch(&self, url: &str) -> CacheResult<Bytes> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("fetcher blew up");
            }
            Ok(CountingFetcher::body_for(url))
        }
    }

    #[tokio::test]
    async fn test_panicked_resolution_leaves_key_loadable() {
        let fetcher = Arc::new(PanicOnceFetcher {
            calls: AtomicU64::new(0),
        });
        let loader = ImageLoader::new(
            ImageLoaderConfig {
                mode: CacheMode::Memory,
                max_concurrent_downloads: 1,
            },
            Arc::new(MemoryImageCache::new(1024)),
            Arc::new(FakeDiskCache::new()),
            fetcher.clone(),
        );

        let first = loader.load(URL).await;
        assert_eq!(first, Err(CacheError::Cancelled));
        assert_eq!(loader.pending_count(), 0);
        assert!(!loader.is_loading(URL));
        assert_eq!(loader.stats().failures, 1);

        let second = loader.load_image(URL).await.unwrap();
        assert_eq!(second.source, ImageSource::Network);
        assert_eq!(second.bytes, CountingFetcher::body_for(URL));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_during_flight_still_delivers() {
        let h = harness_with(CacheMode::Memory, CountingFetcher::gated(), FakeDiskCache::new());

        let loader = h.loader.clone();
        let waiter = tokio::spawn(async move { loader.load(URL).await });
        wait_until(|| h.fetcher.calls() == 1).await;

        assert_ok!(h.loader.clear_cache().await);
        h.fetcher.release(1);

        let bytes = waiter.await.unwrap().unwrap();
        assert_eq!(bytes, CountingFetcher::body_for(URL));
    }

    #[tokio::test]
    async fn test_download_concurrency_is_capped() {
        let memory = Arc::new(MemoryImageCache::new(1024));
        let fetcher = Arc::new(CountingFetcher::gated());
        let loader = ImageLoader::new(
            ImageLoaderConfig {
                mode: CacheMode::None,
                max_concurrent_downloads: 1,
            },
            memory,
            Arc::new(FakeDiskCache::new()),
            fetcher.clone(),
        );

        let first = tokio::spawn({
            let loader = loader.clone();
            async move { loader.load("https://a.example/1.png").await }
        });
        let second = tokio::spawn({
            let loader = loader.clone();
            async move { loader.load("https://a.example/2.png").await }
        });
        wait_until(|| fetcher.calls() == 1 && loader.pending_count() == 2).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(fetcher.calls(), 1);

        fetcher.release(2);
        assert_ok!(first.await.unwrap());
        assert_ok!(second.await.unwrap());
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_prefetch_warms_memory() {
        let h = harness(CacheMode::Memory);

        h.loader.prefetch([URL]);
        wait_until(|| h.memory.peek(&CacheKey::from_url(URL)).is_some()).await;

        let image = h.loader.load_image(URL).await.unwrap();
        assert_eq!(image.source, ImageSource::MemoryCache);
        assert_eq!(h.fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_works_through_port() {
        let h = harness(CacheMode::Memory);
        let port: Arc<dyn ImageLoaderPort> = Arc::new(h.loader.clone());

        assert_eq!(port.cache_mode(), CacheMode::Memory);
        assert_ok!(port.load_image(URL).await);
        assert_ok!(port.clear_cache().await);
        assert!(h.memory.is_empty());
    }
}

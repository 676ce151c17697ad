//! Infrastructure layer with external service adapters.

/// Application configuration.
pub mod config;
/// Image handling (caching, fetching, tiered loading).
pub mod image;
/// Image manifest client.
pub mod manifest;

pub use config::{AppConfig, CacheConfig, CliArgs, Command, ConfigError, LogLevel, StorageManager};
pub use image::{
    CacheStats, DiskImageCache, DiskUsage, FetcherConfig, HttpImageFetcher, ImageLoader,
    ImageLoaderConfig, LoaderStats, MemoryImageCache,
};
pub use manifest::{ManifestClient, ManifestRecord, parse_manifest, pick_urls};

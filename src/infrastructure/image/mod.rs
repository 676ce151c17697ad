//! Image handling infrastructure.
//!
//! This module provides:
//! - Memory caching with LRU eviction by byte budget
//! - Disk caching with atomic writes
//! - HTTP fetching with format sniffing
//! - The tiered, request-coalescing loader

pub mod disk_cache;
pub mod fetcher;
pub mod loader;
pub mod memory_cache;

pub use disk_cache::{DiskImageCache, DiskUsage};
pub use fetcher::{FetcherConfig, HttpImageFetcher, sniff_image_format};
pub use loader::{ImageLoader, ImageLoaderConfig, LoaderStats};
pub use memory_cache::{CacheStats, MemoryImageCache};

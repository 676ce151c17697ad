//! Domain layer with core cache entities and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{CacheKey, CacheMode, ImageSource, LoadedImage};
pub use errors::{CacheError, CacheModeError, CacheResult};
pub use ports::{DiskCachePort, ImageFetchPort, ImageLoaderPort, MemoryCachePort};

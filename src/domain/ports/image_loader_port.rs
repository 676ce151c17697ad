//! Port definition for the tiered image loader.

use async_trait::async_trait;

use crate::domain::entities::{CacheMode, LoadedImage};
use crate::domain::errors::CacheResult;

/// Port for loading images through the configured cache tiers.
#[async_trait]
pub trait ImageLoaderPort: Send + Sync {
    /// Loads an image, checking enabled caches first then the network.
    /// Returns the bytes with source information.
    async fn load_image(&self, url: &str) -> CacheResult<LoadedImage>;

    /// Clears the cache tiers enabled by the current mode.
    async fn clear_cache(&self) -> CacheResult<()>;

    /// Returns the active cache mode.
    fn cache_mode(&self) -> CacheMode;
}

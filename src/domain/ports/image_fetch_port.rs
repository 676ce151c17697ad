//! Port definition for network image retrieval.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::errors::CacheResult;

/// Port for downloading raw image bytes.
///
/// Each call is an independent network operation; caching is layered on top by the loader.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageFetchPort: Send + Sync {
    /// Downloads the bytes behind `url`.
    async fn fetch(&self, url: &str) -> CacheResult<Bytes>;
}

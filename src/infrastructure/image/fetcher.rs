//! HTTP image fetcher.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, trace};

use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::ImageFetchPort;

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Overall request timeout.
    pub timeout: Duration,
    /// Connection establishment timeout.
    pub connect_timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Reject bodies that are not a recognizable image format.
    pub validate_images: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: default_user_agent(),
            validate_images: true,
        }
    }
}

/// Returns the user agent string used when none is configured.
#[must_use]
pub fn default_user_agent() -> String {
    format!("{}/{}", crate::NAME, crate::VERSION)
}

/// Downloads raw image bytes over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: Client,
    validate_images: bool,
}

impl HttpImageFetcher {
    /// Creates a new fetcher.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &FetcherConfig) -> CacheResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| CacheError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            validate_images: config.validate_images,
        })
    }

    /// Downloads the response body for `url`.
    async fn download(&self, url: &str) -> CacheResult<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CacheError::network(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CacheError::network(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| CacheError::network(format!("Failed to read body: {e}")))
    }
}

#[async_trait]
impl ImageFetchPort for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> CacheResult<Bytes> {
        debug!(url = %url, "Downloading image from network");
        let bytes = self.download(url).await?;

        if self.validate_images {
            let format = sniff_image_format(&bytes)?;
            trace!(url = %url, format = ?format, size = bytes.len(), "Downloaded image");
        }

        Ok(bytes)
    }
}

/// Identifies the image format from magic bytes without decoding.
///
/// # Errors
/// Returns a decode error for empty or unrecognized payloads.
pub fn sniff_image_format(bytes: &[u8]) -> CacheResult<image::ImageFormat> {
    if bytes.is_empty() {
        return Err(CacheError::decode("Empty response body"));
    }
    image::guess_format(bytes).map_err(|e| CacheError::decode(format!("Unrecognized image data: {e}")))
}

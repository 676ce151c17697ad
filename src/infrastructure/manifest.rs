//! Image manifest client.
//!
//! A manifest is a JSON array of records, each with a `url` and arbitrary metadata.

use std::time::Duration;

use rand::seq::SliceRandom;
use rand::thread_rng;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::domain::errors::{CacheError, CacheResult};

/// One manifest record.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestRecord {
    /// Image URL.
    pub url: String,
    /// Any other fields of the record.
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Parses a manifest document.
///
/// # Errors
/// Returns a decode error if the document is not an array of records with a `url`.
pub fn parse_manifest(bytes: &[u8]) -> CacheResult<Vec<ManifestRecord>> {
    serde_json::from_slice(bytes).map_err(|e| CacheError::decode(format!("Invalid manifest: {e}")))
}

/// Selects up to `count` image URLs from a manifest.
///
/// Without `shuffle` the first records are taken in manifest order; with it a
/// random selection is made.
#[must_use]
pub fn pick_urls(mut records: Vec<ManifestRecord>, count: usize, shuffle: bool) -> Vec<String> {
    if shuffle {
        records.shuffle(&mut thread_rng());
    }
    records
        .into_iter()
        .take(count)
        .map(|record| record.url)
        .collect()
}

/// Fetches image manifests over HTTP.
#[derive(Debug, Clone)]
pub struct ManifestClient {
    client: Client,
}

impl ManifestClient {
    /// Creates a new manifest client.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(timeout: Duration, user_agent: &str) -> CacheResult<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Downloads and parses the manifest at `url`.
    ///
    /// # Errors
    /// Returns a network error if the download fails, or a decode error if it is malformed.
    pub async fn fetch(&self, url: &str) -> CacheResult<Vec<ManifestRecord>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CacheError::network(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CacheError::network(format!("HTTP {}", response.status())));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CacheError::network(format!("Failed to read body: {e}")))?;

        let records = parse_manifest(&body)?;
        debug!(url = %url, count = records.len(), "Loaded image manifest");
        Ok(records)
    }
}

//! Gallery load report DTOs.

use crate::domain::entities::ImageSource;
use crate::domain::errors::CacheError;

/// Result of loading one gallery image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageOutcome {
    /// Requested URL.
    pub url: String,
    /// Tier and payload size, or the load error.
    pub result: Result<(ImageSource, usize), CacheError>,
}

/// Summary of one pass over a gallery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GalleryReport {
    /// Per-image outcomes, in request order.
    pub outcomes: Vec<ImageOutcome>,
}

impl GalleryReport {
    /// Number of images served by `source`.
    #[must_use]
    pub fn count_from(&self, source: ImageSource) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, Ok((s, _)) if s == source))
            .count()
    }

    /// Number of images that failed to load.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    /// Total bytes delivered.
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|(_, size)| *size))
            .sum()
    }
}

impl std::fmt::Display for GalleryReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} images: {} memory, {} disk, {} network, {} failed ({} bytes)",
            self.outcomes.len(),
            self.count_from(ImageSource::MemoryCache),
            self.count_from(ImageSource::DiskCache),
            self.count_from(ImageSource::Network),
            self.failed(),
            self.total_bytes()
        )
    }
}

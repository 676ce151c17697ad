//! Gallery loading use case.

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, info};

use crate::application::dto::{GalleryReport, ImageOutcome};
use crate::domain::ports::ImageLoaderPort;

/// Loads a set of images concurrently through the image loader.
pub struct LoadGalleryUseCase {
    loader: Arc<dyn ImageLoaderPort>,
}

impl LoadGalleryUseCase {
    /// Creates new use case.
    #[must_use]
    pub fn new(loader: Arc<dyn ImageLoaderPort>) -> Self {
        Self { loader }
    }

    /// Loads every URL once and reports per-image outcomes.
    ///
    /// Individual failures are recorded in the report rather than aborting the pass.
    pub async fn execute(&self, urls: &[String]) -> GalleryReport {
        debug!(count = urls.len(), mode = %self.loader.cache_mode(), "Loading gallery");

        let outcomes = join_all(urls.iter().map(|url| async move {
            let result = self
                .loader
                .load_image(url)
                .await
                .map(|image| (image.source, image.size()));
            ImageOutcome {
                url: url.clone(),
                result,
            }
        }))
        .await;

        let report = GalleryReport { outcomes };
        info!(
            images = report.outcomes.len(),
            failed = report.failed(),
            "Gallery loaded"
        );
        report
    }
}

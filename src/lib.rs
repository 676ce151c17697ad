//! Pixload - a tiered image loader.
//!
//! Images are served from an in-memory LRU store, an on-disk store, or the
//! network, depending on the active cache mode. Concurrent requests for the
//! same URL share a single fetch.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing use cases and DTOs.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing caches, the fetcher, and configuration.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "pixload";

/// Qualifier used for platform directories.
pub const APP_QUALIFIER: &str = "dev";

/// Organization used for platform directories.
pub const APP_ORGANIZATION: &str = "pixload";

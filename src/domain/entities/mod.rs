//! Domain entity definitions.

mod cache_mode;
mod image;

pub use cache_mode::CacheMode;
pub use image::{CACHE_KEY_LEN, CacheEntry, CacheKey, ImageSource, LoadedImage};

//! Domain error types.

mod cache_error;
mod cache_mode_error;

pub use cache_error::{CacheError, CacheResult};
pub use cache_mode_error::CacheModeError;

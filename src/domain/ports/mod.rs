mod image_cache_port;
mod image_fetch_port;
mod image_loader_port;

pub use image_cache_port::{DiskCachePort, MemoryCachePort};
pub use image_fetch_port::ImageFetchPort;
pub use image_loader_port::ImageLoaderPort;

#[cfg(test)]
pub use image_cache_port::{MockDiskCachePort, MockMemoryCachePort};
#[cfg(test)]
pub use image_fetch_port::MockImageFetchPort;

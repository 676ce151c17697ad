//! Image cache and loading error types.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Errors that can occur while loading or caching images.
///
/// Cache misses are never errors; stores report them as `None`.
/// The type is `Clone` so one result can be handed to every caller waiting on the same load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum CacheError {
    #[error("network error: {message}")]
    Network { message: String },

    #[error("decode error: {message}")]
    Decode { message: String },

    #[error("io error: {message}")]
    Io { message: String },

    #[error("failed to remove {failed} cache file(s): {}", .errors.join("; "))]
    PartialClear { failed: usize, errors: Vec<String> },

    #[error("image load was cancelled before it completed")]
    Cancelled,
}

impl CacheError {
    /// Creates network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates I/O error.
    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates an aggregate error for a best-effort clear.
    #[must_use]
    pub fn partial_clear(errors: Vec<String>) -> Self {
        Self::PartialClear {
            failed: errors.len(),
            errors,
        }
    }

    /// Returns whether error is network related.
    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Returns whether error came from local storage.
    #[must_use]
    pub const fn is_io_error(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::PartialClear { .. })
    }
}

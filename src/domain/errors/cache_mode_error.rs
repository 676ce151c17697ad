//! Cache mode validation errors.

use thiserror::Error;

/// Raised when a configured cache mode does not map to a known tier set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheModeError {
    /// A mode name that is not `none`, `memory` or `disk`.
    #[error("unknown cache mode '{0}' (expected none, memory or disk)")]
    UnknownName(String),

    /// A legacy numeric index outside `0..=2`.
    #[error("cache mode index {0} is out of range (expected 0, 1 or 2)")]
    IndexOutOfRange(i64),
}

//! Cache tier selection.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::errors::CacheModeError;

/// Selects which cache tiers a loader uses.
///
/// Exactly one mode is active per loader. Switching modes never migrates
/// entries between tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "RawCacheMode")]
pub enum CacheMode {
    /// No caching; every load goes to the network.
    #[default]
    None,
    /// In-process LRU cache only.
    Memory,
    /// Persistent disk cache only.
    Disk,
}

impl CacheMode {
    /// All modes, ordered by their legacy index.
    pub const ALL: [Self; 3] = [Self::None, Self::Memory, Self::Disk];

    /// Returns true if the memory tier is active.
    #[must_use]
    pub const fn uses_memory(self) -> bool {
        matches!(self, Self::Memory)
    }

    /// Returns true if the disk tier is active.
    #[must_use]
    pub const fn uses_disk(self) -> bool {
        matches!(self, Self::Disk)
    }

    /// Returns the legacy numeric index of the mode.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Memory => 1,
            Self::Disk => 2,
        }
    }
}

impl std::fmt::Display for CacheMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Memory => write!(f, "memory"),
            Self::Disk => write!(f, "disk"),
        }
    }
}

impl TryFrom<i64> for CacheMode {
    type Error = CacheModeError;

    fn try_from(index: i64) -> Result<Self, Self::Error> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(CacheModeError::IndexOutOfRange(index))
    }
}

impl FromStr for CacheMode {
    type Err = CacheModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        match value.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "memory" => Ok(Self::Memory),
            "disk" => Ok(Self::Disk),
            other => other.parse::<i64>().map_or_else(
                |_| Err(CacheModeError::UnknownName(value.to_string())),
                Self::try_from,
            ),
        }
    }
}

/// Wire shape accepted for `CacheMode`: a name or a legacy index.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawCacheMode {
    Index(i64),
    Name(String),
}

impl TryFrom<RawCacheMode> for CacheMode {
    type Error = CacheModeError;

    fn try_from(raw: RawCacheMode) -> Result<Self, Self::Error> {
        match raw {
            RawCacheMode::Index(index) => Self::try_from(index),
            RawCacheMode::Name(name) => name.parse(),
        }
    }
}

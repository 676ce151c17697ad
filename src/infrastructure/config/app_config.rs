//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::args::CliArgs;
use crate::domain::entities::CacheMode;
use crate::infrastructure::image::disk_cache::DiskImageCache;
use crate::infrastructure::image::fetcher::default_user_agent;
use crate::infrastructure::image::memory_cache::DEFAULT_MEMORY_CAPACITY;
use crate::{APP_ORGANIZATION, APP_QUALIFIER, NAME};

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, read from `config.toml` and overridden by CLI flags.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path. Logs go to stderr when unset.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Image cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Image cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Active cache tiers. Accepts a name or the legacy index 0, 1 or 2.
    #[serde(default)]
    pub mode: CacheMode,

    /// Directory for persisted images. Defaults to the platform cache directory.
    #[serde(default)]
    pub disk_cache_directory: Option<PathBuf>,

    /// Memory cache budget in bytes.
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: u64,

    /// Maximum concurrent downloads.
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Reject downloads that are not a recognizable image format.
    #[serde(default = "default_true")]
    pub validate_images: bool,

    /// User agent for image requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl CacheConfig {
    /// Returns the disk cache directory, falling back to the platform default.
    #[must_use]
    pub fn effective_disk_cache_dir(&self) -> PathBuf {
        self.disk_cache_directory.clone().unwrap_or_else(|| {
            DiskImageCache::default_location()
                .cache_dir()
                .to_path_buf()
        })
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            mode: CacheMode::default(),
            disk_cache_directory: None,
            memory_capacity: default_memory_capacity(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
            timeout_secs: default_timeout_secs(),
            validate_images: true,
            user_agent: default_user_agent(),
        }
    }
}

const fn default_memory_capacity() -> u64 {
    DEFAULT_MEMORY_CAPACITY
}

const fn default_max_concurrent_downloads() -> usize {
    4
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(mode) = args.cache_mode {
            self.cache.mode = mode;
        }
        if let Some(dir) = &args.cache_dir {
            self.cache.disk_cache_directory = Some(dir.clone());
        }
        if let Some(capacity) = args.memory_capacity {
            self.cache.memory_capacity = capacity;
        }
        if let Some(max) = args.max_concurrent_downloads {
            self.cache.max_concurrent_downloads = max;
        }
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default config file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns effective config path.
    #[must_use]
    pub fn effective_config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(Self::default_config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
            log_level = "debug"

            [cache]
            mode = "disk"
            disk_cache_directory = "/var/cache/pixload"
            memory_capacity = 1024
        "#;

        let config: AppConfig = toml::from_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.cache.mode, CacheMode::Disk);
        assert_eq!(
            config.cache.effective_disk_cache_dir(),
            PathBuf::from("/var/cache/pixload")
        );
        assert_eq!(config.cache.memory_capacity, 1024);
        assert_eq!(config.cache.max_concurrent_downloads, 4);
        assert!(config.cache.validate_images);
    }

    #[test]
    fn test_legacy_mode_index() {
        let config: AppConfig = toml::from_str("[cache]\nmode = 1").unwrap();
        assert_eq!(config.cache.mode, CacheMode::Memory);
    }

    #[test]
    fn test_invalid_mode_is_rejected() {
        let err = toml::from_str::<AppConfig>("[cache]\nmode = 5").unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");

        assert!(toml::from_str::<AppConfig>("[cache]\nmode = \"turbo\"").is_err());
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.cache.mode, CacheMode::None);
        assert_eq!(config.cache.memory_capacity, DEFAULT_MEMORY_CAPACITY);
        assert!(config.cache.user_agent.starts_with(NAME));
    }

    #[test]
    fn test_merge_with_args() {
        let args = CliArgs::parse_from([
            NAME,
            "--cache-mode",
            "memory",
            "--memory-capacity",
            "2048",
            "--cache-dir",
            "/tmp/imgs",
            "info",
        ]);
        let mut config = AppConfig::default();

        config.merge_with_args(&args);

        assert_eq!(config.cache.mode, CacheMode::Memory);
        assert_eq!(config.cache.memory_capacity, 2048);
        assert_eq!(
            config.cache.disk_cache_directory,
            Some(PathBuf::from("/tmp/imgs"))
        );
        assert_eq!(config.log_level, LogLevel::Info);
    }
}

use super::app_config::LogLevel;
use crate::domain::entities::CacheMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "pixload",
    version,
    about = "Load images through a memory, disk or network cache",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH", global = true)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Cache tiers to use: none, memory or disk (or 0, 1, 2).
    #[arg(long, value_name = "MODE", global = true)]
    pub cache_mode: Option<CacheMode>,

    /// Disk cache directory.
    #[arg(long, value_name = "PATH", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Memory cache budget in bytes.
    #[arg(long, value_name = "BYTES", global = true)]
    pub memory_capacity: Option<u64>,

    /// Maximum concurrent downloads.
    #[arg(long, value_name = "N", global = true)]
    pub max_concurrent_downloads: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load one or more images and report where each came from.
    Load {
        /// Image URLs.
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,
    },

    /// Load images listed in a JSON manifest, several rounds in a row.
    Gallery {
        /// Manifest URL (a JSON array of objects with a `url` field).
        #[arg(value_name = "MANIFEST_URL")]
        manifest: String,

        /// Maximum number of images to take from the manifest.
        #[arg(long, default_value_t = 30)]
        count: usize,

        /// Number of times to load the gallery.
        #[arg(long, default_value_t = 2)]
        rounds: usize,

        /// Pick a random selection of images instead of the first ones.
        #[arg(long)]
        shuffle: bool,
    },

    /// Clear the cache tiers of the configured mode.
    Clear,

    /// Show the active cache configuration.
    Info,
}

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use pixload::application::LoadGalleryUseCase;
use pixload::domain::entities::CacheMode;
use pixload::infrastructure::{
    AppConfig, CliArgs, Command, DiskImageCache, ImageLoader, ManifestClient, StorageManager,
    pick_urls,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = &config.log_path {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

async fn run_load(loader: &ImageLoader, urls: &[String]) -> Result<()> {
    let use_case = LoadGalleryUseCase::new(Arc::new(loader.clone()));
    let report = use_case.execute(urls).await;

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok((source, size)) => println!("{source:>7}  {size:>10}  {}", outcome.url),
            Err(e) => println!("{:>7}  {e}  {}", "failed", outcome.url),
        }
    }
    println!("{report}");
    Ok(())
}

async fn run_gallery(
    loader: &ImageLoader,
    config: &AppConfig,
    manifest: &str,
    count: usize,
    rounds: usize,
    shuffle: bool,
) -> Result<()> {
    let client = ManifestClient::new(
        Duration::from_secs(config.cache.timeout_secs),
        &config.cache.user_agent,
    )?;
    let records = client
        .fetch(manifest)
        .await
        .wrap_err_with(|| format!("failed to load manifest {manifest}"))?;
    let urls = pick_urls(records, count, shuffle);

    if urls.is_empty() {
        warn!(manifest = %manifest, "Manifest lists no images");
        return Ok(());
    }

    let use_case = LoadGalleryUseCase::new(Arc::new(loader.clone()));
    for round in 1..=rounds {
        let started = Instant::now();
        let report = use_case.execute(&urls).await;
        println!(
            "round {round}: {report} in {:.2?}",
            started.elapsed()
        );
    }
    println!("{}", loader.stats());
    Ok(())
}

async fn run_info(config: &AppConfig) -> Result<()> {
    let cache_dir = config.cache.effective_disk_cache_dir();
    let usage = DiskImageCache::new(cache_dir.clone()).usage().await?;

    println!("{} {}", pixload::NAME, pixload::VERSION);
    if let Some(path) = config.effective_config_path() {
        println!("config:           {}", path.display());
    }
    println!(
        "cache mode:       {} ({})",
        config.cache.mode,
        config.cache.mode.index()
    );
    println!("memory capacity:  {} bytes", config.cache.memory_capacity);
    println!("disk cache:       {}", cache_dir.display());
    println!(
        "disk usage:       {} entries, {} bytes",
        usage.entries, usage.bytes
    );
    println!(
        "modes:            {}",
        CacheMode::ALL
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(version = pixload::VERSION, mode = %config.cache.mode, "Starting pixload");

    let loader = ImageLoader::from_cache_config(&config.cache)?;

    match &args.command {
        Command::Load { urls } => run_load(&loader, urls).await,
        Command::Gallery {
            manifest,
            count,
            rounds,
            shuffle,
        } => run_gallery(&loader, &config, manifest, *count, *rounds, *shuffle).await,
        Command::Clear => {
            loader.clear_cache().await?;
            println!("cleared {} cache", loader.cache_mode());
            Ok(())
        }
        Command::Info => run_info(&config).await,
    }
}

use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use precache::config::WorkerConfig;
use precache::contexts::{RegisterOutcome, Registration, ResponseSource, StaticAssetCache};
use precache::data::{CacheStorage, Request};
use precache::network::HttpNetwork;
use precache::stores::FileCacheStorage;

#[derive(Clone)]
pub struct Config {
    pub config_path: PathBuf,
    pub cache_dir: Option<PathBuf>,
    pub origin: Option<String>,
    pub verbose: bool,
    pub dry_run: bool,
}

type Worker = StaticAssetCache<FileCacheStorage, HttpNetwork>;

/// Reads the worker config, applies command line overrides, then validates
fn load_worker_config(config: &Config) -> Result<WorkerConfig> {
    let mut worker_config = WorkerConfig::read(&config.config_path)
        .with_context(|| format!("Failed to load config {}", config.config_path.display()))?;

    if let Some(dir) = &config.cache_dir {
        worker_config.cache_dir = dir.clone();
    }
    if let Some(origin) = &config.origin {
        worker_config.origin = origin.clone();
    }
    worker_config.validate().context("Invalid configuration")?;

    if config.verbose {
        println!(
            "Cache version: {} (origin {}, store {})",
            worker_config.cache_name,
            worker_config.origin,
            worker_config.cache_dir.display()
        );
    }

    Ok(worker_config)
}

fn build_worker(config: &Config) -> Result<Worker> {
    let worker_config = load_worker_config(config)?;
    let storage = FileCacheStorage::new(Some(worker_config.cache_dir.clone()));
    let network = HttpNetwork::new(Duration::from_secs(worker_config.timeout_secs))
        .context("Failed to create HTTP client")?;
    StaticAssetCache::new(worker_config, storage, network).context("Failed to create worker")
}

pub async fn install(config: &Config) -> Result<()> {
    let worker = build_worker(config)?;

    if config.dry_run {
        println!("Would pre-cache {} URL(s) into {}", worker.config().urls.len(), worker.cache_name());
        for entry in &worker.config().urls {
            println!("  {}", worker.resolve(entry).unwrap_or_else(|| entry.clone()));
        }
        return Ok(());
    }

    let outcome = worker
        .on_install()
        .await
        .with_context(|| format!("Install of {} failed", worker.cache_name()))?;

    println!("Installed {} ({} entries)", outcome.cache_name, outcome.entries);
    if config.verbose {
        println!("skip_waiting: {}", outcome.skip_waiting);
    }
    Ok(())
}

pub async fn activate(config: &Config) -> Result<()> {
    let worker = build_worker(config)?;

    if config.dry_run {
        let missing = worker.missing_entries().await?;
        if !missing.is_empty() {
            println!(
                "{} is not installed ({} manifest entries missing), activation would be refused",
                worker.cache_name(),
                missing.len()
            );
            return Ok(());
        }
        let stale: Vec<String> = worker
            .storage()
            .keys()
            .await?
            .into_iter()
            .filter(|name| name != worker.cache_name())
            .collect();
        if worker.config().cleanup {
            println!("Would delete {} stale cache(s): {:?}", stale.len(), stale);
        } else {
            println!("Cleanup disabled, nothing to delete");
        }
        return Ok(());
    }

    let outcome = worker
        .on_activate()
        .await
        .with_context(|| format!("Activation of {} failed", worker.cache_name()))?;

    println!("Activated {}", outcome.cache_name);
    for name in &outcome.deleted {
        println!("  deleted {}", name);
    }
    Ok(())
}

pub async fn update(config: &Config) -> Result<()> {
    if config.dry_run {
        install(config).await?;
        return activate(config).await;
    }

    let worker = build_worker(config)?;
    let network = HttpNetwork::new(Duration::from_secs(worker.config().timeout_secs))
        .context("Failed to create HTTP client")?;
    let mut registration = Registration::new(network);

    match registration.register(worker).await.context("Update failed")? {
        RegisterOutcome::Activated(install, activate) => {
            println!("Installed {} ({} entries)", install.cache_name, install.entries);
            println!("Activated {}", activate.cache_name);
            for name in &activate.deleted {
                println!("  deleted {}", name);
            }
        }
        RegisterOutcome::Waiting(install) => {
            println!("Installed {}, waiting for clients to close", install.cache_name);
        }
    }
    Ok(())
}

pub async fn fetch(path: &str, method: &str, body: bool, config: &Config) -> Result<()> {
    let worker = build_worker(config)?;
    let url = worker
        .resolve(path)
        .with_context(|| format!("Cannot resolve '{}' against {}", path, worker.config().origin))?;
    let request = Request::new(method, url);

    let outcome = worker
        .on_fetch(&request)
        .await
        .with_context(|| format!("Fetch of {} failed", request.url))?;

    let source = match outcome.source {
        ResponseSource::Cache => "cache",
        ResponseSource::Network => "network",
    };

    if body {
        std::io::stdout()
            .write_all(&outcome.response.body)
            .context("Failed to write response body")?;
    } else {
        println!(
            "{} {} {} ({} bytes, from {})",
            request.method,
            outcome.response.url,
            outcome.response.status,
            outcome.response.body.len(),
            source
        );
        if config.verbose {
            for (name, value) in &outcome.response.headers {
                println!("  {}: {}", name, value);
            }
        }
    }
    Ok(())
}

pub async fn keys(config: &Config) -> Result<()> {
    let worker_config = load_worker_config(config)?;
    let storage = FileCacheStorage::new(Some(worker_config.cache_dir.clone()));

    let names = storage.keys().await.context("Failed to list caches")?;
    if names.is_empty() {
        println!("No caches found");
        return Ok(());
    }
    for name in names {
        let marker = if name == worker_config.cache_name { "*" } else { " " };
        println!("{} {}", marker, name);
    }
    Ok(())
}

pub async fn entries(name: Option<String>, config: &Config) -> Result<()> {
    let worker_config = load_worker_config(config)?;
    let storage = FileCacheStorage::new(Some(worker_config.cache_dir.clone()));
    let name = name.unwrap_or_else(|| worker_config.cache_name.clone());

    let keys = storage
        .entries(&name)
        .await
        .with_context(|| format!("Failed to list entries of {}", name))?;
    println!("{} ({} entries)", name, keys.len());
    for key in keys {
        println!("  {}", key);
    }
    Ok(())
}

//! Worker configuration
//!
//! Loaded from an optional YAML file. A missing file yields the built-in
//! defaults, so a plain `precache install` works against a local origin.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "precache.yml";
pub const DEFAULT_CACHE_NAME: &str = "imd-cache-v2";
pub const DEFAULT_ORIGIN: &str = "http://localhost:8080";
pub const DEFAULT_CACHE_DIR: &str = ".precache";

/// Which stores `on_fetch` searches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupScope {
    /// Only the current version's store
    #[default]
    Current,
    /// Every store, oldest first
    All,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Name of the current cache version
    pub cache_name: String,
    /// Manifest: URLs pre-cached on install, relative to `origin`
    pub urls: Vec<String>,
    /// Origin the manifest and request paths resolve against
    pub origin: String,
    pub skip_waiting: bool,
    pub claim: bool,
    /// Delete every other cache version on activate
    pub cleanup: bool,
    pub lookup_scope: LookupScope,
    pub cache_dir: PathBuf,
    pub timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            urls: vec!["/".to_string(), "/manifest.json".to_string()],
            origin: DEFAULT_ORIGIN.to_string(),
            skip_waiting: true,
            claim: true,
            cleanup: true,
            lookup_scope: LookupScope::Current,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            timeout_secs: 30,
        }
    }
}

impl WorkerConfig {
    /// Loads and validates the config from `path`, falling back to defaults
    /// when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the config from `path` without validating it, so callers can
    /// apply overrides first. A missing file yields the defaults.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("[WorkerConfig] read, no file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: WorkerConfig =
            serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
                path: PathBuf::new(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_name.trim().is_empty() {
            return Err(ConfigError::Invalid("cache_name must not be empty".to_string()));
        }

        let origin = self.origin_url()?;
        for entry in &self.urls {
            origin.join(entry).map_err(|e| {
                ConfigError::Invalid(format!("manifest URL '{}' does not resolve: {}", entry, e))
            })?;
        }

        Ok(())
    }

    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid(format!("origin '{}': {}", self.origin, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::Invalid(format!(
                "origin '{}' has unsupported scheme '{}'",
                self.origin, other
            ))),
        }
    }
}

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a cache store
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache entry at {path} could not be (de)serialized: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised by the network capability
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("invalid request URL '{0}'")]
    InvalidUrl(String),

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Errors that reject an install
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("manifest URL '{0}' cannot be resolved against the origin")]
    InvalidUrl(String),

    #[error("failed to fetch manifest URL {url}")]
    Fetch {
        url: String,
        #[source]
        source: NetworkError,
    },

    #[error("manifest URL {url} answered with status {status}")]
    BadStatus { url: String, status: u16 },

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Errors that reject an activation
#[derive(Debug, Error)]
pub enum ActivateError {
    #[error("cache {cache_name} is not installed, missing manifest entries {missing:?}")]
    NotInstalled {
        cache_name: String,
        missing: Vec<String>,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Errors surfaced to the page that issued a fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Errors that stop a worker from taking control
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("install rejected: {0}")]
    Install(#[from] InstallError),

    #[error("activation rejected: {0}")]
    Activate(#[from] ActivateError),
}

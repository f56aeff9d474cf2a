use futures::future::try_join_all;
use std::collections::HashSet;
use url::Url;

use crate::config::{LookupScope, WorkerConfig};
use crate::data::{
    ActivateError, CacheStorage, FetchError, InstallError, Network, Request, Response,
};

/// Result of a successful install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub cache_name: String,
    /// Entries the current store holds after population
    pub entries: usize,
    /// Activate without waiting for pages on the previous worker to close
    pub skip_waiting: bool,
}

/// Result of a successful activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateOutcome {
    pub cache_name: String,
    /// Stale stores removed, in no particular order
    pub deleted: Vec<String>,
    /// Take control of already open pages
    pub claim: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub response: Response,
    pub source: ResponseSource,
}

/// StaticAssetCache context: a cache-first fetch interceptor with install-time
/// pre-population and optional activate-time cleanup of stale versions.
///
/// Handlers take `&self` and hold no mutable state of their own, so one
/// worker can serve any number of concurrent `on_fetch` calls.
pub struct StaticAssetCache<S, N>
where
    S: CacheStorage,
    N: Network,
{
    // Role players
    storage: S,
    network: N,

    // Props
    config: WorkerConfig,
    origin: Url,
}

impl<S, N> StaticAssetCache<S, N>
where
    S: CacheStorage,
    N: Network,
{
    /// Creates a new StaticAssetCache context
    ///
    /// # Arguments
    /// * `config` - Cache version name, manifest and lifecycle directives
    /// * `storage` - Cache storage shared with other worker versions
    /// * `network` - Network used for install population and cache misses
    pub fn new(config: WorkerConfig, storage: S, network: N) -> Result<Self, InstallError> {
        let origin = config
            .origin_url()
            .map_err(|_| InstallError::InvalidUrl(config.origin.clone()))?;
        Ok(Self {
            storage,
            network,
            config,
            origin,
        })
    }

    pub fn cache_name(&self) -> &str {
        &self.config.cache_name
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Resolves a path or URL against the worker's origin
    pub fn resolve(&self, path: &str) -> Option<String> {
        self.origin.join(path).ok().map(|url| url.to_string())
    }

    /// Lifecycle: install
    ///
    /// Opens the current version's store and populates it with every manifest
    /// URL. All manifest fetches must succeed with a 2xx status before anything
    /// is written; any failure rejects the install and leaves the store as it was.
    pub async fn on_install(&self) -> Result<InstallOutcome, InstallError> {
        let cache_name = &self.config.cache_name;
        tracing::info!(
            "[StaticAssetCache] on_install, cache={}, urls={}",
            cache_name,
            self.config.urls.len()
        );

        let requests = self.manifest_requests()?;
        self.storage.open(cache_name).await?;

        let fetched = try_join_all(requests.iter().map(|request| self.precache_one(request)))
            .await
            .map_err(|e| {
                tracing::error!("[StaticAssetCache] on_install, cache={}, error={}", cache_name, e);
                e
            })?;

        self.storage.put_all(cache_name, fetched).await?;
        let entries = self.storage.entries(cache_name).await?.len();

        tracing::info!(
            "[StaticAssetCache] on_install, cache={}, entries={}, skip_waiting={}",
            cache_name,
            entries,
            self.config.skip_waiting
        );

        Ok(InstallOutcome {
            cache_name: cache_name.clone(),
            entries,
            skip_waiting: self.config.skip_waiting,
        })
    }

    /// Manifest entries resolved against the origin, one request per cache key
    fn manifest_requests(&self) -> Result<Vec<Request>, InstallError> {
        let mut seen = HashSet::new();
        let mut requests = Vec::with_capacity(self.config.urls.len());
        for entry in &self.config.urls {
            let request = self
                .resolve(entry)
                .map(Request::get)
                .ok_or_else(|| InstallError::InvalidUrl(entry.clone()))?;
            if seen.insert(request.cache_key()) {
                requests.push(request);
            }
        }
        Ok(requests)
    }

    /// Manifest cache keys the current store has no entry for. Empty once an
    /// install has completed.
    pub async fn missing_entries(&self) -> Result<Vec<String>, ActivateError> {
        let requests = self.manifest_requests().map_err(|_| ActivateError::NotInstalled {
            cache_name: self.config.cache_name.clone(),
            missing: self.config.urls.clone(),
        })?;
        let stored: HashSet<String> = self
            .storage
            .entries(&self.config.cache_name)
            .await?
            .into_iter()
            .collect();

        Ok(requests
            .iter()
            .map(Request::cache_key)
            .filter(|key| !stored.contains(key))
            .collect())
    }

    async fn precache_one(&self, request: &Request) -> Result<(String, Response), InstallError> {
        let response = self
            .network
            .fetch(request)
            .await
            .map_err(|source| InstallError::Fetch {
                url: request.url.clone(),
                source,
            })?;

        if !response.ok() {
            return Err(InstallError::BadStatus {
                url: request.url.clone(),
                status: response.status,
            });
        }

        Ok((request.cache_key(), response))
    }

    /// Lifecycle: activate
    ///
    /// With cleanup enabled, deletes every store other than the current
    /// version. Deletions run concurrently and activation waits for all of
    /// them; the first failure fails the activation.
    ///
    /// A version whose store lacks any manifest entry never installed and is
    /// refused before anything is deleted.
    pub async fn on_activate(&self) -> Result<ActivateOutcome, ActivateError> {
        let cache_name = &self.config.cache_name;

        let missing = self.missing_entries().await?;
        if !missing.is_empty() {
            tracing::error!(
                "[StaticAssetCache] on_activate, not installed, cache={}, missing={:?}",
                cache_name,
                missing
            );
            return Err(ActivateError::NotInstalled {
                cache_name: cache_name.clone(),
                missing,
            });
        }

        let deleted = if self.config.cleanup {
            let stale: Vec<String> = self
                .storage
                .keys()
                .await?
                .into_iter()
                .filter(|name| name != cache_name)
                .collect();

            try_join_all(stale.iter().map(|name| self.storage.delete(name))).await?;
            stale
        } else {
            Vec::new()
        };

        tracing::info!(
            "[StaticAssetCache] on_activate, cache={}, deleted={:?}, claim={}",
            cache_name,
            deleted,
            self.config.claim
        );

        Ok(ActivateOutcome {
            cache_name: cache_name.clone(),
            deleted,
            claim: self.config.claim,
        })
    }

    /// Event: fetch
    ///
    /// Serves a stored response when one matches, otherwise forwards the
    /// request to the network once and returns whatever comes back. Never
    /// writes to the store.
    pub async fn on_fetch(&self, request: &Request) -> Result<FetchOutcome, FetchError> {
        if request.is_cacheable() {
            let key = request.cache_key();
            let hit = match self.config.lookup_scope {
                LookupScope::Current => self.storage.match_in(&self.config.cache_name, &key).await?,
                LookupScope::All => self.storage.match_any(&key).await?,
            };

            if let Some(response) = hit {
                tracing::debug!("[StaticAssetCache] on_fetch, hit, url={}", key);
                return Ok(FetchOutcome {
                    response,
                    source: ResponseSource::Cache,
                });
            }
        }

        tracing::debug!(
            "[StaticAssetCache] on_fetch, miss, method={}, url={}",
            request.method,
            request.url
        );
        let response = self.network.fetch(request).await?;
        Ok(FetchOutcome {
            response,
            source: ResponseSource::Network,
        })
    }
}

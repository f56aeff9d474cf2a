use std::collections::BTreeMap;
use std::sync::Arc;

use crate::contexts::{ActivateOutcome, FetchOutcome, InstallOutcome, ResponseSource, StaticAssetCache};
use crate::data::{CacheStorage, FetchError, Network, RegistrationError, Request};

/// What became of a worker handed to `Registration::register`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Installed and now in control
    Activated(InstallOutcome, ActivateOutcome),
    /// Installed, waiting for the pages of the active worker to close
    Waiting(InstallOutcome),
}

/// A page within the registration's scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(u64);

/// Registration context: drives workers through install and activate and
/// routes the fetches of open pages to whichever worker controls them.
///
/// A page opened while a worker is active is controlled by it. Pages opened
/// earlier stay uncontrolled until they navigate again, unless the activated
/// worker claims them. A worker whose install or activation fails is dropped;
/// the previously active worker keeps control.
pub struct Registration<S, N>
where
    S: CacheStorage,
    N: Network,
{
    active: Option<Arc<StaticAssetCache<S, N>>>,
    waiting: Option<Arc<StaticAssetCache<S, N>>>,
    /// Open pages and whether the active worker controls them
    clients: BTreeMap<ClientId, bool>,
    next_client: u64,
    /// Used for uncontrolled pages
    network: N,
}

impl<S, N> Registration<S, N>
where
    S: CacheStorage,
    N: Network,
{
    pub fn new(network: N) -> Self {
        Self {
            active: None,
            waiting: None,
            clients: BTreeMap::new(),
            next_client: 0,
            network,
        }
    }

    pub fn active(&self) -> Option<Arc<StaticAssetCache<S, N>>> {
        self.active.clone()
    }

    pub fn active_version(&self) -> Option<&str> {
        self.active.as_ref().map(|w| w.cache_name())
    }

    pub fn waiting_version(&self) -> Option<&str> {
        self.waiting.as_ref().map(|w| w.cache_name())
    }

    /// Opens a page. It is controlled if a worker is active.
    pub fn open_client(&mut self) -> ClientId {
        let id = ClientId(self.next_client);
        self.next_client += 1;
        self.clients.insert(id, self.active.is_some());
        tracing::debug!("[Registration] open_client, id={}, controlled={}", id.0, self.active.is_some());
        id
    }

    /// Reloads a page, which puts it under the active worker's control.
    ///
    /// # Returns
    /// Whether the page is now controlled. Unknown pages never are.
    pub fn navigate(&mut self, client: ClientId) -> bool {
        let controlled = self.active.is_some();
        match self.clients.get_mut(&client) {
            Some(state) => {
                *state = controlled;
                controlled
            }
            None => false,
        }
    }

    pub fn close_client(&mut self, client: ClientId) {
        self.clients.remove(&client);
    }

    pub fn is_controlled(&self, client: ClientId) -> bool {
        self.clients.get(&client).copied().unwrap_or(false)
    }

    /// Number of open pages under the active worker's control
    pub fn controlled_clients(&self) -> usize {
        self.clients.values().filter(|controlled| **controlled).count()
    }

    /// Installs `worker` and, when nothing holds it back, activates it.
    ///
    /// A worker activates immediately if no worker is active yet, if no page
    /// is controlled by the active worker, or if it asked to skip waiting.
    /// Otherwise it replaces any previously waiting worker and waits for
    /// `release_clients`.
    pub async fn register(
        &mut self,
        worker: StaticAssetCache<S, N>,
    ) -> Result<RegisterOutcome, RegistrationError> {
        let install = worker.on_install().await.map_err(|e| {
            tracing::warn!(
                "[Registration] register, install failed, version={}, active={:?}, error={}",
                worker.cache_name(),
                self.active_version(),
                e
            );
            e
        })?;

        let worker = Arc::new(worker);
        if self.active.is_none() || install.skip_waiting || self.controlled_clients() == 0 {
            let activate = self.activate(worker).await?;
            self.waiting = None;
            return Ok(RegisterOutcome::Activated(install, activate));
        }

        tracing::info!(
            "[Registration] register, waiting, version={}, active={:?}, clients={}",
            install.cache_name,
            self.active_version(),
            self.controlled_clients()
        );
        self.waiting = Some(worker);
        Ok(RegisterOutcome::Waiting(install))
    }

    /// Closes every page controlled by the active worker; a waiting worker
    /// then takes over.
    ///
    /// A waiting worker whose activation fails stays waiting.
    pub async fn release_clients(&mut self) -> Result<Option<ActivateOutcome>, RegistrationError> {
        self.clients.retain(|_, controlled| !*controlled);

        let Some(worker) = self.waiting.clone() else {
            return Ok(None);
        };
        let outcome = self.activate(worker).await?;
        self.waiting = None;
        Ok(Some(outcome))
    }

    async fn activate(
        &mut self,
        worker: Arc<StaticAssetCache<S, N>>,
    ) -> Result<ActivateOutcome, RegistrationError> {
        let outcome = worker.on_activate().await.map_err(|e| {
            tracing::warn!(
                "[Registration] activate, failed, version={}, error={}",
                worker.cache_name(),
                e
            );
            e
        })?;

        tracing::info!(
            "[Registration] activate, version={}, previous={:?}, claim={}",
            worker.cache_name(),
            self.active_version(),
            outcome.claim
        );
        self.active = Some(worker);
        if outcome.claim {
            self.clients.values_mut().for_each(|controlled| *controlled = true);
        }
        Ok(outcome)
    }

    /// Routes a page's request to the worker controlling it, or straight to
    /// the network when the page is uncontrolled.
    pub async fn handle_fetch(
        &self,
        client: ClientId,
        request: &Request,
    ) -> Result<FetchOutcome, FetchError> {
        match &self.active {
            Some(worker) if self.is_controlled(client) => worker.on_fetch(request).await,
            _ => {
                let response = self.network.fetch(request).await?;
                Ok(FetchOutcome {
                    response,
                    source: ResponseSource::Network,
                })
            }
        }
    }
}

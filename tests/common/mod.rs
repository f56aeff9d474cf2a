use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use precache::config::WorkerConfig;
use precache::data::{CacheError, CacheStorage, Network, NetworkError, Request, Response};
use precache::stores::MemoryCacheStorage;

/// Network fake: answers 200 with the URL as body, counts every call, and
/// fails the URLs it was told to fail.
#[derive(Default)]
pub struct FakeNetwork {
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
    offline: Mutex<HashSet<String>>,
    not_found: Mutex<HashSet<String>>,
}

#[allow(dead_code)]
impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    /// Requests to `url` fail at the transport level
    pub fn go_offline(&self, url: &str) {
        self.offline.lock().unwrap().insert(url.to_string());
    }

    pub fn answer_not_found(&self, url: &str) {
        self.not_found.lock().unwrap().insert(url.to_string());
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(request.url.clone());

        if self.offline.lock().unwrap().contains(&request.url) {
            return Err(NetworkError::Transport {
                url: request.url.clone(),
                message: "connection refused".to_string(),
            });
        }
        let status = if self.not_found.lock().unwrap().contains(&request.url) {
            404
        } else {
            200
        };
        Ok(Response::new(request.url.clone(), status, format!("body of {}", request.url))
            .with_header("content-type", "text/plain"))
    }
}

/// Storage fake over `MemoryCacheStorage` whose writes and deletions can be
/// switched to fail like a full disk.
#[derive(Default)]
pub struct FlakyStorage {
    inner: MemoryCacheStorage,
    fail_put_all: AtomicBool,
    fail_delete: AtomicBool,
}

#[allow(dead_code)]
impl FlakyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_put_all(&self) {
        self.fail_put_all.store(true, Ordering::SeqCst);
    }

    pub fn fail_delete(&self) {
        self.fail_delete.store(true, Ordering::SeqCst);
    }

    fn disk_full(store: &str) -> CacheError {
        CacheError::Io {
            path: PathBuf::from(store),
            source: std::io::Error::other("disk full"),
        }
    }
}

#[async_trait]
impl CacheStorage for FlakyStorage {
    async fn open(&self, store: &str) -> Result<(), CacheError> {
        self.inner.open(store).await
    }

    async fn put(&self, store: &str, key: &str, response: Response) -> Result<(), CacheError> {
        self.inner.put(store, key, response).await
    }

    async fn put_all(&self, store: &str, entries: Vec<(String, Response)>) -> Result<(), CacheError> {
        if self.fail_put_all.load(Ordering::SeqCst) {
            return Err(Self::disk_full(store));
        }
        self.inner.put_all(store, entries).await
    }

    async fn match_in(&self, store: &str, key: &str) -> Result<Option<Response>, CacheError> {
        self.inner.match_in(store, key).await
    }

    async fn match_any(&self, key: &str) -> Result<Option<Response>, CacheError> {
        self.inner.match_any(key).await
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        self.inner.keys().await
    }

    async fn delete(&self, store: &str) -> Result<bool, CacheError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Self::disk_full(store));
        }
        self.inner.delete(store).await
    }

    async fn entries(&self, store: &str) -> Result<Vec<String>, CacheError> {
        self.inner.entries(store).await
    }
}

pub const ORIGIN: &str = "http://localhost:8080";

pub fn url(path: &str) -> String {
    format!("{}{}", ORIGIN, path)
}

pub fn config(cache_name: &str, urls: &[&str]) -> WorkerConfig {
    WorkerConfig {
        cache_name: cache_name.to_string(),
        urls: urls.iter().map(|u| u.to_string()).collect(),
        origin: ORIGIN.to_string(),
        ..WorkerConfig::default()
    }
}

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use crate::data::{CacheError, CacheStorage, Response};

const STORES_FILE: &str = "stores.json";

/// A single cached response on disk, together with the key it is filed under
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    response: Response,
}

/// FileCacheStorage keeps every cache store as a directory on disk.
///
/// The layout is `{root}/{hash(store)}/{hash(key)}.json`; `{root}/stores.json`
/// records store names in creation order.
#[derive(Debug)]
pub struct FileCacheStorage {
    /// The root folder path for the cache (defaults to ".precache")
    root: PathBuf,
    /// Serializes mutations of the store list and of entry files
    write_lock: Mutex<()>,
}

impl FileCacheStorage {
    /// Creates a new FileCacheStorage
    ///
    /// # Arguments
    /// * `root` - Optional root folder path. If None, defaults to ".precache"
    pub fn new(root: Option<PathBuf>) -> Self {
        Self {
            root: root.unwrap_or_else(|| PathBuf::from(crate::config::DEFAULT_CACHE_DIR)),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn hash(value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn store_dir(&self, store: &str) -> PathBuf {
        self.root.join(Self::hash(store))
    }

    /// Path format: `{root}/{hash(store)}/{hash(key)}.json`
    fn entry_path(&self, store: &str, key: &str) -> PathBuf {
        self.store_dir(store).join(format!("{}.json", Self::hash(key)))
    }

    fn stores_path(&self) -> PathBuf {
        self.root.join(STORES_FILE)
    }

    async fn read_stores(&self) -> Result<Vec<String>, CacheError> {
        let path = self.stores_path();
        let read = fs::read(&path).await;
        match read {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|source| CacheError::Serialization { path, source }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }

    async fn write_stores(&self, stores: &[String]) -> Result<(), CacheError> {
        let path = self.stores_path();
        let content = serde_json::to_vec_pretty(stores).map_err(|source| {
            CacheError::Serialization {
                path: path.clone(),
                source,
            }
        })?;
        write_file(&path, &content).await
    }

    /// Creates the store directory and registers the name. Caller holds the write lock.
    async fn ensure_store(&self, store: &str) -> Result<(), CacheError> {
        let dir = self.store_dir(store);
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| CacheError::Io { path: dir, source })?;

        let mut stores = self.read_stores().await?;
        if !stores.iter().any(|s| s == store) {
            stores.push(store.to_string());
            self.write_stores(&stores).await?;
        }
        Ok(())
    }

    fn encode(path: &Path, key: &str, response: Response) -> Result<Vec<u8>, CacheError> {
        let entry = StoredEntry {
            key: key.to_string(),
            response,
        };
        serde_json::to_vec(&entry).map_err(|source| CacheError::Serialization {
            path: path.to_path_buf(),
            source,
        })
    }

    async fn read_entry(&self, path: PathBuf) -> Result<Option<StoredEntry>, CacheError> {
        let read = fs::read(&path).await;
        match read {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| CacheError::Serialization { path, source }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }
}

async fn write_file(path: &Path, content: &[u8]) -> Result<(), CacheError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).await.map_err(|source| CacheError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, content).await.map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn tmp_path(path: &Path) -> PathBuf {
    path.with_extension("json.tmp")
}

#[async_trait]
impl CacheStorage for FileCacheStorage {
    async fn open(&self, store: &str) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;
        self.ensure_store(store).await
    }

    async fn put(&self, store: &str, key: &str, mut response: Response) -> Result<(), CacheError> {
        response.stored_at = Some(Utc::now());
        let path = self.entry_path(store, key);
        let content = Self::encode(&path, key, response)?;

        let _guard = self.write_lock.lock().await;
        self.ensure_store(store).await?;
        write_file(&path, &content).await
    }

    async fn put_all(&self, store: &str, entries: Vec<(String, Response)>) -> Result<(), CacheError> {
        let now = Utc::now();
        // Later entries win when a key repeats
        let entries: BTreeMap<String, Response> = entries.into_iter().collect();
        let mut staged = Vec::with_capacity(entries.len());
        for (key, mut response) in entries {
            response.stored_at = Some(now);
            let path = self.entry_path(store, &key);
            let content = Self::encode(&path, &key, response)?;
            staged.push((path, content));
        }

        let _guard = self.write_lock.lock().await;
        self.ensure_store(store).await?;

        // Stage every entry next to its final name, then swap them in.
        let mut written = Vec::with_capacity(staged.len());
        for (path, content) in &staged {
            let tmp = tmp_path(path);
            if let Err(e) = write_file(&tmp, content).await {
                for leftover in &written {
                    let _ = fs::remove_file(leftover).await;
                }
                return Err(e);
            }
            written.push(tmp);
        }
        for (path, _) in &staged {
            fs::rename(tmp_path(path), path)
                .await
                .map_err(|source| CacheError::Io {
                    path: path.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    async fn match_in(&self, store: &str, key: &str) -> Result<Option<Response>, CacheError> {
        let entry = self.read_entry(self.entry_path(store, key)).await?;
        Ok(entry.map(|e| e.response))
    }

    async fn match_any(&self, key: &str) -> Result<Option<Response>, CacheError> {
        for store in self.read_stores().await? {
            if let Some(response) = self.match_in(&store, key).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        self.read_stores().await
    }

    async fn delete(&self, store: &str) -> Result<bool, CacheError> {
        let _guard = self.write_lock.lock().await;
        let mut stores = self.read_stores().await?;
        let Some(index) = stores.iter().position(|s| s == store) else {
            return Ok(false);
        };

        let dir = self.store_dir(store);
        let removed = fs::remove_dir_all(&dir).await;
        match removed {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(CacheError::Io { path: dir, source }),
        }

        stores.remove(index);
        self.write_stores(&stores).await?;
        Ok(true)
    }

    async fn entries(&self, store: &str) -> Result<Vec<String>, CacheError> {
        let dir = self.store_dir(store);
        let opened = fs::read_dir(&dir).await;
        let mut read_dir = match opened {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(CacheError::Io { path: dir, source }),
        };

        let mut keys = Vec::new();
        loop {
            let next = read_dir.next_entry().await.map_err(|source| CacheError::Io {
                path: dir.clone(),
                source,
            })?;
            let Some(item) = next else { break };
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(entry) = self.read_entry(path).await? {
                keys.push(entry.key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_entry_path_construction() {
        let storage = FileCacheStorage::new(Some(PathBuf::from("/tmp/cache")));
        let path = storage.entry_path("v1", "http://localhost/");
        assert!(path.starts_with("/tmp/cache"));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("json"));
        assert_eq!(path, storage.entry_path("v1", "http://localhost/"));
        assert_ne!(path, storage.entry_path("v2", "http://localhost/"));
    }

    #[test]
    fn test_default_folder() {
        let storage = FileCacheStorage::new(None);
        assert_eq!(storage.root(), Path::new(".precache"));
    }

    #[tokio::test]
    async fn test_put_get_and_overwrite() {
        let temp = tempdir().unwrap();
        let storage = FileCacheStorage::new(Some(temp.path().to_path_buf()));

        assert!(storage.match_in("v1", "k").await.unwrap().is_none());

        storage.put("v1", "k", Response::new("k", 200, "first")).await.unwrap();
        storage.put("v1", "k", Response::new("k", 200, "second")).await.unwrap();

        let hit = storage.match_in("v1", "k").await.unwrap().unwrap();
        assert_eq!(hit.body, b"second");
        assert_eq!(storage.entries("v1").await.unwrap(), vec!["k"]);
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let temp = tempdir().unwrap();
        {
            let storage = FileCacheStorage::new(Some(temp.path().to_path_buf()));
            storage
                .put_all(
                    "v1",
                    vec![
                        ("a".to_string(), Response::new("a", 200, "A")),
                        ("b".to_string(), Response::new("b", 200, "B")),
                    ],
                )
                .await
                .unwrap();
        }

        let reopened = FileCacheStorage::new(Some(temp.path().to_path_buf()));
        assert_eq!(reopened.keys().await.unwrap(), vec!["v1"]);
        assert_eq!(reopened.entries("v1").await.unwrap(), vec!["a", "b"]);
        let hit = reopened.match_any("b").await.unwrap().unwrap();
        assert_eq!(hit.body, b"B");
    }

    #[tokio::test]
    async fn test_delete_removes_store() {
        let temp = tempdir().unwrap();
        let storage = FileCacheStorage::new(Some(temp.path().to_path_buf()));
        storage.open("v1").await.unwrap();
        storage.put("v2", "k", Response::new("k", 200, "")).await.unwrap();

        assert!(storage.delete("v1").await.unwrap());
        assert!(!storage.delete("v1").await.unwrap());
        assert_eq!(storage.keys().await.unwrap(), vec!["v2"]);
        assert!(!storage.store_dir("v1").exists());
    }
}

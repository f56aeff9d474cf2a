use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::data::{CacheError, CacheStorage, Response};

/// In-memory cache storage. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    /// Stores in creation order
    stores: RwLock<Vec<(String, BTreeMap<String, Response>)>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn position(stores: &[(String, BTreeMap<String, Response>)], name: &str) -> Option<usize> {
    stores.iter().position(|(n, _)| n == name)
}

fn store_mut<'a>(
    stores: &'a mut Vec<(String, BTreeMap<String, Response>)>,
    name: &str,
) -> &'a mut BTreeMap<String, Response> {
    let index = match position(stores, name) {
        Some(index) => index,
        None => {
            stores.push((name.to_string(), BTreeMap::new()));
            stores.len() - 1
        }
    };
    &mut stores[index].1
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, store: &str) -> Result<(), CacheError> {
        let mut stores = self.stores.write().await;
        store_mut(&mut stores, store);
        Ok(())
    }

    async fn put(&self, store: &str, key: &str, mut response: Response) -> Result<(), CacheError> {
        response.stored_at = Some(Utc::now());
        let mut stores = self.stores.write().await;
        store_mut(&mut stores, store).insert(key.to_string(), response);
        Ok(())
    }

    async fn put_all(&self, store: &str, entries: Vec<(String, Response)>) -> Result<(), CacheError> {
        let now = Utc::now();
        let mut stores = self.stores.write().await;
        let target = store_mut(&mut stores, store);
        for (key, mut response) in entries {
            response.stored_at = Some(now);
            target.insert(key, response);
        }
        Ok(())
    }

    async fn match_in(&self, store: &str, key: &str) -> Result<Option<Response>, CacheError> {
        let stores = self.stores.read().await;
        Ok(position(&stores, store).and_then(|i| stores[i].1.get(key).cloned()))
    }

    async fn match_any(&self, key: &str) -> Result<Option<Response>, CacheError> {
        let stores = self.stores.read().await;
        Ok(stores.iter().find_map(|(_, entries)| entries.get(key).cloned()))
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let stores = self.stores.read().await;
        Ok(stores.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn delete(&self, store: &str) -> Result<bool, CacheError> {
        let mut stores = self.stores.write().await;
        match position(&stores, store) {
            Some(index) => {
                stores.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn entries(&self, store: &str) -> Result<Vec<String>, CacheError> {
        let stores = self.stores.read().await;
        Ok(position(&stores, store)
            .map(|i| stores[i].1.keys().cloned().collect())
            .unwrap_or_default())
    }
}

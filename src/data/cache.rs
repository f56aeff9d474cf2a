use async_trait::async_trait;
use std::sync::Arc;

use crate::data::{CacheError, Response};

/// A set of named, versioned key-value stores mapping a request's cache key
/// to a stored response.
///
/// Implementations serialize their own mutations; every method takes `&self`
/// so one storage can be shared between concurrently running handlers.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Opens the named store, creating it empty if absent.
    async fn open(&self, store: &str) -> Result<(), CacheError>;

    /// Stores a response under `key`, replacing any previous entry.
    /// Creates the store if absent.
    async fn put(&self, store: &str, key: &str, response: Response) -> Result<(), CacheError>;

    /// Stores every entry or, on error, leaves the store as it was before.
    async fn put_all(&self, store: &str, entries: Vec<(String, Response)>) -> Result<(), CacheError>;

    /// Looks up `key` in a single store. A missing store is a miss.
    async fn match_in(&self, store: &str, key: &str) -> Result<Option<Response>, CacheError>;

    /// Looks up `key` in every store, oldest store first.
    async fn match_any(&self, key: &str) -> Result<Option<Response>, CacheError>;

    /// Names of all stores in creation order.
    async fn keys(&self) -> Result<Vec<String>, CacheError>;

    /// Deletes a store and all of its entries.
    ///
    /// # Returns
    /// * `true` - The store existed and was removed
    /// * `false` - No store with that name exists
    async fn delete(&self, store: &str) -> Result<bool, CacheError>;

    /// Cache keys held by a store, sorted. A missing store has none.
    async fn entries(&self, store: &str) -> Result<Vec<String>, CacheError>;
}

#[async_trait]
impl<T: CacheStorage + ?Sized> CacheStorage for Arc<T> {
    async fn open(&self, store: &str) -> Result<(), CacheError> {
        (**self).open(store).await
    }

    async fn put(&self, store: &str, key: &str, response: Response) -> Result<(), CacheError> {
        (**self).put(store, key, response).await
    }

    async fn put_all(&self, store: &str, entries: Vec<(String, Response)>) -> Result<(), CacheError> {
        (**self).put_all(store, entries).await
    }

    async fn match_in(&self, store: &str, key: &str) -> Result<Option<Response>, CacheError> {
        (**self).match_in(store, key).await
    }

    async fn match_any(&self, key: &str) -> Result<Option<Response>, CacheError> {
        (**self).match_any(key).await
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        (**self).keys().await
    }

    async fn delete(&self, store: &str) -> Result<bool, CacheError> {
        (**self).delete(store).await
    }

    async fn entries(&self, store: &str) -> Result<Vec<String>, CacheError> {
        (**self).entries(store).await
    }
}

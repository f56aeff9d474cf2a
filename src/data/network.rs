use async_trait::async_trait;
use std::sync::Arc;

use crate::data::{NetworkError, Request, Response};

/// Issues requests to the network.
///
/// Every HTTP answer, whatever its status, is an `Ok` response. Only
/// transport failures are errors.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

#[async_trait]
impl<T: Network + ?Sized> Network for Arc<T> {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        (**self).fetch(request).await
    }
}

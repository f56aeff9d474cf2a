use async_trait::async_trait;
use reqwest::Method;
use std::time::Duration;

use crate::data::{Network, NetworkError, Request, Response};

/// Network capability backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    client: reqwest::Client,
}

impl HttpNetwork {
    pub fn new(timeout: Duration) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| NetworkError::InvalidUrl(format!("{} {}", request.method, request.url)))?;
        let url = reqwest::Url::parse(&request.url)
            .map_err(|_| NetworkError::InvalidUrl(request.url.clone()))?;

        let mut builder = self.client.request(method, url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        tracing::debug!("[HttpNetwork] fetch, method={}, url={}", request.method, request.url);

        let transport = |e: reqwest::Error| NetworkError::Transport {
            url: request.url.clone(),
            message: e.to_string(),
        };

        let answer = builder.send().await.map_err(transport)?;
        let status = answer.status().as_u16();
        let final_url = answer.url().to_string();
        let headers = answer
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = answer.bytes().await.map_err(transport)?;

        tracing::debug!(
            "[HttpNetwork] fetch, url={}, status={}, bytes={}",
            final_url,
            status,
            body.len()
        );

        Ok(Response {
            url: final_url,
            status,
            headers,
            body: body.to_vec(),
            stored_at: None,
        })
    }
}

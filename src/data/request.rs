use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A request issued by a controlled page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// Creates a GET request for an absolute URL
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Only GET requests are looked up in or written to a cache store.
    pub fn is_cacheable(&self) -> bool {
        self.method == "GET"
    }

    /// The identity a cache store files this request under.
    ///
    /// The fragment never reaches the network, so two URLs differing only in
    /// their fragment share an entry. Unparseable URLs key on their raw text.
    pub fn cache_key(&self) -> String {
        match Url::parse(&self.url) {
            Ok(mut url) => {
                url.set_fragment(None);
                url.to_string()
            }
            Err(_) => self.url.clone(),
        }
    }
}

/// A response, either fresh from the network or read back from a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub url: String,
    pub status: u16,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: Vec<u8>,
    /// Set when the response is put into a cache store
    #[serde(default)]
    pub stored_at: Option<DateTime<Utc>>,
}

impl Response {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status,
            headers: Vec::new(),
            body: body.into(),
            stored_at: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

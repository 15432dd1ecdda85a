//! Cached remote fetch.
//!
//! Fetches a remote document over the bound `GET` verb and keeps successful
//! bodies in the key-value store, so repeat lookups of the same URL skip the
//! network until the entry expires.

use std::sync::Arc;
use std::time::Duration;

use crate::environment::Environment;
use crate::infrastructure::ports::{HttpError, HttpRequest, HttpVerbPort, KvError, KvStorePort};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Fetch failed: {0}")]
    Http(#[from] HttpError),
    #[error("Cache unavailable: {0}")]
    Store(#[from] KvError),
    #[error("Remote returned status {status} for {url}")]
    Status { url: String, status: u16 },
}

/// Where a fetched body came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Cache,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub body: Vec<u8>,
    pub source: FetchSource,
}

/// Fetch-through cache over the environment's `GET` verb and store.
pub struct CachedFetcher {
    get: Arc<dyn HttpVerbPort>,
    store: Arc<dyn KvStorePort>,
}

impl CachedFetcher {
    /// Connect to the environment's configured store through its connector.
    pub async fn connect(env: &Environment) -> Result<Self, FetchError> {
        let store = env.connect_store().await?;
        Ok(Self::new(env.http.get.clone(), store))
    }

    pub fn new(get: Arc<dyn HttpVerbPort>, store: Arc<dyn KvStorePort>) -> Self {
        Self { get, store }
    }

    pub fn cache_key(url: &str) -> String {
        format!("fetch:{url}")
    }

    /// Return the cached body for `url`, or fetch it and cache it for `ttl`.
    ///
    /// Only 2xx bodies are cached.
    pub async fn fetch(&self, url: &str, ttl: Duration) -> Result<Fetched, FetchError> {
        let key = Self::cache_key(url);

        if let Some(body) = self.store.get(&key).await? {
            tracing::debug!(url, "Fetch served from cache");
            return Ok(Fetched {
                body,
                source: FetchSource::Cache,
            });
        }

        let response = self.get.send(HttpRequest::get(url)).await?;
        if !response.is_success() {
            tracing::warn!(url, status = response.status, "Fetch returned non-success status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }

        self.store.set(&key, &response.body, Some(ttl)).await?;
        tracing::debug!(url, bytes = response.body.len(), "Fetched and cached");

        Ok(Fetched {
            body: response.body,
            source: FetchSource::Remote,
        })
    }

    /// Drop the cached body for `url`. Returns whether anything was cached.
    pub async fn invalidate(&self, url: &str) -> Result<bool, FetchError> {
        Ok(self.store.delete(&Self::cache_key(url)).await?)
    }
}

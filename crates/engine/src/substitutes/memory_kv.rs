//! In-memory key-value store and its connector.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hermetic_domain::BindingKind;
use tokio::sync::RwLock;

use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::ports::{ClockPort, KvConnectorPort, KvError, KvStorePort};

/// Substitute store constructor.
///
/// Every `connect` hands back the same shared [`InMemoryKvStore`], so tests can
/// inspect what the code under test wrote regardless of the URL it used.
pub struct InMemoryKvConnector {
    store: Arc<InMemoryKvStore>,
    connected_urls: Mutex<Vec<String>>,
}

impl InMemoryKvConnector {
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryKvStore::new()))
    }

    pub fn with_store(store: Arc<InMemoryKvStore>) -> Self {
        Self {
            store,
            connected_urls: Mutex::new(Vec::new()),
        }
    }

    /// The store every connection resolves to.
    pub fn store(&self) -> Arc<InMemoryKvStore> {
        self.store.clone()
    }

    /// URLs passed to `connect`, in call order.
    pub fn connected_urls(&self) -> Vec<String> {
        self.connected_urls
            .lock()
            .map(|urls| urls.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl Default for InMemoryKvConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvConnectorPort for InMemoryKvConnector {
    fn kind(&self) -> BindingKind {
        BindingKind::Substitute
    }

    async fn connect(&self, url: &str) -> Result<Arc<dyn KvStorePort>, KvError> {
        self.connected_urls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(url.to_string());
        Ok(self.store.clone())
    }
}

struct Entry {
    value: Vec<u8>,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Thread-safe map with per-entry expiry.
///
/// Expired entries are invisible to reads but stay in memory until
/// `cleanup_expired()` is called.
pub struct InMemoryKvStore {
    entries: RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn ClockPort>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn ClockPort>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Remove all expired entries and return the count of removed entries.
    pub async fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let mut guard = self.entries.write().await;
        let before_count = guard.len();
        guard.retain(|_, entry| entry.is_live(now));
        before_count - guard.len()
    }

    /// Get the current number of entries (including expired ones not yet cleaned).
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// All live keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let now = self.clock.now();
        let guard = self.entries.read().await;
        let mut keys: Vec<String> = guard
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStorePort for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let now = self.clock.now();
        let guard = self.entries.read().await;
        Ok(guard
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), KvError> {
        // A TTL past the representable range never expires.
        let now = self.clock.now();
        let expires_at = ttl.map(|ttl| {
            chrono::Duration::from_std(ttl)
                .ok()
                .and_then(|ttl| now.checked_add_signed(ttl))
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        });
        let entry = Entry {
            value: value.to_vec(),
            expires_at,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, KvError> {
        let now = self.clock.now();
        let removed = self.entries.write().await.remove(key);
        Ok(removed.map_or(false, |entry| entry.is_live(now)))
    }

    async fn exists(&self, key: &str) -> Result<bool, KvError> {
        Ok(self.get(key).await?.is_some())
    }
}

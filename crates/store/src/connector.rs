use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use loader_core::config::redact_url;

use crate::{KeyValueStore, MemoryStore, RedisStore, StoreError};

/// Resolves a connection URL to a live store handle.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Arc<dyn KeyValueStore>, StoreError>;
}

/// Redis connector caching one connection per URL.
///
/// Sessions against the same URL share a multiplexed connection.
#[derive(Default)]
pub struct RedisConnector {
    cache: Mutex<HashMap<String, RedisStore>>,
}

impl RedisConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the cached connection for `url`.
    pub async fn evict(&self, url: &str) {
        self.cache.lock().await.remove(url);
    }
}

#[async_trait]
impl StoreConnector for RedisConnector {
    async fn connect(&self, url: &str) -> Result<Arc<dyn KeyValueStore>, StoreError> {
        let mut cache = self.cache.lock().await;
        if let Some(store) = cache.get(url) {
            // The manager reconnects on its own; a failed ping just means not yet.
            store.ping().await?;
            return Ok(Arc::new(store.clone()));
        }

        tracing::info!(url = %redact_url(url), "connecting to redis");
        let store = RedisStore::connect(url).await?;
        if let Err(e) = store.ping().await {
            tracing::warn!(url = %redact_url(url), error = %e, "redis ping failed");
            return Err(e);
        }
        cache.insert(url.to_string(), store.clone());
        Ok(Arc::new(store))
    }
}

/// In-memory connector: every URL maps to its own [`MemoryStore`].
#[derive(Clone, Default)]
pub struct MemoryConnector {
    stores: Arc<Mutex<HashMap<String, MemoryStore>>>,
    refused: Arc<Mutex<HashSet<String>>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The store behind `url`, created on first use.
    pub async fn store(&self, url: &str) -> MemoryStore {
        self.stores
            .lock()
            .await
            .entry(url.to_string())
            .or_default()
            .clone()
    }

    /// Refuse connections to `url` until [`MemoryConnector::accept`] is called.
    pub async fn refuse(&self, url: &str) {
        self.refused.lock().await.insert(url.to_string());
    }

    pub async fn accept(&self, url: &str) {
        self.refused.lock().await.remove(url);
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(&self, url: &str) -> Result<Arc<dyn KeyValueStore>, StoreError> {
        if self.refused.lock().await.contains(url) {
            return Err(StoreError::Connection(format!(
                "connection refused: {}",
                redact_url(url)
            )));
        }
        Ok(Arc::new(self.store(url).await))
    }
}

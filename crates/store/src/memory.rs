use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use loader_core::WriteMode;

use crate::{hash_fields, KeyValueStore, StoreError};

/// A value as it would sit in Redis.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    Json(Value),
    Hash(Vec<(String, String)>),
    String(String),
}

#[derive(Default)]
struct Faults {
    /// Keys whose writes fail with a command error.
    failing_keys: HashSet<String>,
    /// After this many successful writes every call fails with a connection error.
    drop_after: Option<usize>,
}

/// In-process store with fault injection.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<HashMap<String, StoredValue>>>,
    faults: Arc<Mutex<Faults>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write to `key` fail with [`StoreError::Command`].
    pub fn fail_key(&self, key: impl Into<String>) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.failing_keys.insert(key.into());
        }
    }

    /// Drop the "connection" once `n` writes have succeeded.
    pub fn drop_connection_after(&self, n: usize) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.drop_after = Some(n);
        }
    }

    /// Clear all injected faults.
    pub fn heal(&self) {
        if let Ok(mut faults) = self.faults.lock() {
            *faults = Faults::default();
        }
    }

    pub async fn get(&self, key: &str) -> Option<StoredValue> {
        self.data.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }

    /// All stored keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of successful writes, counting overwrites.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_faults(&self, key: &str) -> Result<(), StoreError> {
        let faults = self
            .faults
            .lock()
            .map_err(|_| StoreError::Command("fault table poisoned".to_string()))?;
        if let Some(limit) = faults.drop_after {
            if self.writes.load(Ordering::SeqCst) >= limit {
                return Err(StoreError::Connection("connection reset by peer".to_string()));
            }
        }
        if faults.failing_keys.contains(key) {
            return Err(StoreError::Command(format!("injected failure for {}", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn write(&self, key: &str, record: &Value, mode: WriteMode) -> Result<(), StoreError> {
        self.check_faults(key)?;
        let value = match mode {
            WriteMode::Json => StoredValue::Json(record.clone()),
            WriteMode::Hash => StoredValue::Hash(hash_fields(record)?),
            WriteMode::String => StoredValue::String(record.to_string()),
        };
        self.data.write().await.insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let faults = self
            .faults
            .lock()
            .map_err(|_| StoreError::Command("fault table poisoned".to_string()))?;
        match faults.drop_after {
            Some(limit) if self.writes.load(Ordering::SeqCst) >= limit => {
                Err(StoreError::Connection("connection reset by peer".to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn stores_per_mode() {
        let store = MemoryStore::new();
        let rec = json!({"id": 1, "name": "x"});
        store.write("j", &rec, WriteMode::Json).await.unwrap();
        store.write("s", &rec, WriteMode::String).await.unwrap();
        store.write("h", &rec, WriteMode::Hash).await.unwrap();

        assert_eq!(store.get("j").await, Some(StoredValue::Json(rec.clone())));
        assert_eq!(store.get("s").await, Some(StoredValue::String(rec.to_string())));
        assert!(matches!(store.get("h").await, Some(StoredValue::Hash(f)) if f.len() == 2));
        assert_eq!(store.keys().await, vec!["h", "j", "s"]);
        assert_eq!(store.write_count(), 3);
    }

    #[tokio::test]
    async fn failing_key_is_a_command_error() {
        let store = MemoryStore::new();
        store.fail_key("bad");
        let err = store.write("bad", &json!({}), WriteMode::Json).await.unwrap_err();
        assert!(!err.is_connection());
        assert!(store.write("good", &json!({}), WriteMode::Json).await.is_ok());
    }

    #[tokio::test]
    async fn dropped_connection_fails_everything_until_healed() {
        let store = MemoryStore::new();
        store.drop_connection_after(1);
        store.write("a", &json!({}), WriteMode::Json).await.unwrap();
        assert!(store.write("b", &json!({}), WriteMode::Json).await.unwrap_err().is_connection());
        assert!(store.ping().await.unwrap_err().is_connection());
        store.heal();
        assert!(store.write("b", &json!({}), WriteMode::Json).await.is_ok());
        assert_eq!(store.len().await, 2);
    }
}

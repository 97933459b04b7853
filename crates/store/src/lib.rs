//! Key-value store seam for the import pipeline.
//!
//! [`KeyValueStore`] writes one record under one key. [`StoreConnector`]
//! turns a connection URL into a store handle. Redis backs both in
//! production; the in-memory variants back the pipeline tests.

mod connector;
mod memory;
mod redis_store;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use loader_core::WriteMode;

pub use connector::{MemoryConnector, RedisConnector, StoreConnector};
pub use memory::{MemoryStore, StoredValue};
pub use redis_store::RedisStore;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store is unreachable or the connection dropped mid-command.
    #[error("store connection error: {0}")]
    Connection(String),

    /// The store rejected the command (wrong type, missing module, ...).
    #[error("store command failed: {0}")]
    Command(String),

    /// The record cannot be expressed in the configured write mode.
    #[error("cannot encode record: {0}")]
    Encode(String),
}

impl StoreError {
    /// Connection-class errors abort the whole import.
    pub fn is_connection(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Store `record` under `key` using `mode`.
    async fn write(&self, key: &str, record: &Value, mode: WriteMode) -> Result<(), StoreError>;

    /// Round-trip check used right after connecting.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Flatten a record into `HSET` field/value pairs.
///
/// String values are stored as-is; everything else is JSON-encoded.
pub fn hash_fields(record: &Value) -> Result<Vec<(String, String)>, StoreError> {
    let obj = record
        .as_object()
        .ok_or_else(|| StoreError::Encode("hash mode requires an object record".to_string()))?;
    if obj.is_empty() {
        return Err(StoreError::Encode("hash mode cannot store an empty object".to_string()));
    }
    Ok(obj
        .iter()
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), value)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_fields_encode_non_strings() {
        let mut fields = hash_fields(&json!({"name": "Shoe", "price": 49.5, "tags": ["a"], "ok": true})).unwrap();
        fields.sort();
        assert_eq!(
            fields,
            vec![
                ("name".to_string(), "Shoe".to_string()),
                ("ok".to_string(), "true".to_string()),
                ("price".to_string(), "49.5".to_string()),
                ("tags".to_string(), r#"["a"]"#.to_string()),
            ]
        );
    }

    #[test]
    fn hash_fields_reject_non_objects() {
        assert!(matches!(hash_fields(&json!([1, 2])), Err(StoreError::Encode(_))));
        assert!(matches!(hash_fields(&json!({})), Err(StoreError::Encode(_))));
    }

    #[test]
    fn only_connection_errors_are_connection_class() {
        assert!(StoreError::Connection("reset".into()).is_connection());
        assert!(!StoreError::Command("WRONGTYPE".into()).is_connection());
        assert!(!StoreError::Encode("x".into()).is_connection());
    }
}

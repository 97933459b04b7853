//! Batch writes against a [`KeyValueStore`].

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde_json::Value;

use loader_core::WriteMode;
use loader_store::{KeyValueStore, StoreError};

/// A transformed record waiting to be written.
#[derive(Debug, Clone)]
pub struct PendingWrite {
    /// 1-based position in the source.
    pub position: u64,
    /// Key suffix; the writer prepends the session's key prefix.
    pub key: String,
    pub record: Value,
}

#[derive(Debug, Clone)]
pub struct WriteFailure {
    pub position: u64,
    pub key: String,
    pub error: StoreError,
}

#[derive(Debug, Default)]
pub struct BatchResult {
    pub written: u64,
    pub failed: u64,
    /// Stop-on-error hit a failure; later records were not attempted.
    pub aborted: bool,
    pub failures: Vec<WriteFailure>,
    /// Set when the store became unreachable. The batch must not be committed.
    pub connection_error: Option<StoreError>,
}

impl BatchResult {
    /// Position of the write that aborted the batch.
    pub fn aborted_at(&self) -> Option<u64> {
        if self.aborted {
            self.failures.last().map(|f| f.position)
        } else {
            None
        }
    }

    fn record(&mut self, position: u64, key: String, outcome: Result<(), StoreError>) {
        match outcome {
            Ok(()) => self.written += 1,
            Err(error) if error.is_connection() => {
                if self.connection_error.is_none() {
                    self.connection_error = Some(error);
                }
            }
            Err(error) => {
                self.failed += 1;
                self.failures.push(WriteFailure { position, key, error });
            }
        }
    }
}

#[derive(Clone)]
pub struct BatchWriter {
    store: Arc<dyn KeyValueStore>,
    mode: WriteMode,
    concurrency: usize,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn KeyValueStore>, mode: WriteMode, concurrency: usize) -> Self {
        Self {
            store,
            mode,
            concurrency: concurrency.max(1),
        }
    }

    /// Write one batch under `key_prefix`.
    ///
    /// Without `stop_on_error` writes run concurrently and every failure is
    /// counted. With it, writes run in order and the first failure leaves
    /// the remaining records unattempted.
    pub async fn write_batch(&self, records: Vec<PendingWrite>, key_prefix: &str, stop_on_error: bool) -> BatchResult {
        let mut result = BatchResult::default();
        if records.is_empty() {
            return result;
        }

        if stop_on_error {
            for item in records {
                let key = format!("{}{}", key_prefix, item.key);
                let outcome = self.store.write(&key, &item.record, self.mode).await;
                let failed = outcome.is_err();
                result.record(item.position, key, outcome);
                if failed {
                    result.aborted = result.connection_error.is_none();
                    break;
                }
            }
            return result;
        }

        let outcomes: Vec<(u64, String, Result<(), StoreError>)> = stream::iter(records)
            .map(|item| {
                let store = Arc::clone(&self.store);
                let mode = self.mode;
                let key = format!("{}{}", key_prefix, item.key);
                async move {
                    let outcome = store.write(&key, &item.record, mode).await;
                    (item.position, key, outcome)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (position, key, outcome) in outcomes {
            result.record(position, key, outcome);
        }
        result.failures.sort_by_key(|f| f.position);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loader_store::{MemoryStore, StoredValue};
    use serde_json::json;

    fn pending(n: u64) -> Vec<PendingWrite> {
        (1..=n)
            .map(|i| PendingWrite {
                position: i,
                key: i.to_string(),
                record: json!({ "n": i }),
            })
            .collect()
    }

    #[tokio::test]
    async fn concurrent_writes_count_every_failure() {
        let store = MemoryStore::new();
        store.fail_key("p:2");
        store.fail_key("p:4");
        let writer = BatchWriter::new(Arc::new(store.clone()), WriteMode::Json, 4);

        let result = writer.write_batch(pending(5), "p:", false).await;
        assert_eq!(result.written, 3);
        assert_eq!(result.failed, 2);
        assert!(!result.aborted);
        assert_eq!(
            result.failures.iter().map(|f| f.position).collect::<Vec<_>>(),
            vec![2, 4]
        );
        assert_eq!(store.get("p:1").await, Some(StoredValue::Json(json!({"n": 1}))));
    }

    #[tokio::test]
    async fn stop_on_error_leaves_rest_unattempted() {
        let store = MemoryStore::new();
        store.fail_key("p:3");
        let writer = BatchWriter::new(Arc::new(store.clone()), WriteMode::Json, 4);

        let result = writer.write_batch(pending(5), "p:", true).await;
        assert_eq!(result.written, 2);
        assert_eq!(result.failed, 1);
        assert!(result.aborted);
        assert_eq!(result.aborted_at(), Some(3));
        assert_eq!(store.keys().await, vec!["p:1", "p:2"]);
    }

    #[tokio::test]
    async fn connection_loss_is_reported_not_counted() {
        let store = MemoryStore::new();
        store.drop_connection_after(2);
        let writer = BatchWriter::new(Arc::new(store), WriteMode::String, 1);

        let result = writer.write_batch(pending(4), "", false).await;
        assert_eq!(result.written, 2);
        assert_eq!(result.failed, 0);
        assert!(result.connection_error.is_some());
    }
}

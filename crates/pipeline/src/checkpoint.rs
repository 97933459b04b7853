//! Durable session checkpoints.
//!
//! A checkpoint is written after every committed batch and on every status
//! change. The file store keeps one `{session_id}.json` per session and
//! replaces it atomically (write to a temp file, then rename).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use loader_core::{ErrorInfo, ImportStats, ImportStatus};

use crate::session::SessionConfig;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("checkpoint I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid checkpoint {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub session_id: String,
    pub status: ImportStatus,
    pub cursor: u64,
    pub stats: ImportStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    pub config: SessionConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;
    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>, CheckpointError>;
    async fn remove(&self, session_id: &str) -> Result<(), CheckpointError>;
    async fn list(&self) -> Result<Vec<Checkpoint>, CheckpointError>;
}

// ── In-memory ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryCheckpointStore {
    entries: RwLock<HashMap<String, Checkpoint>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        self.entries
            .write()
            .await
            .insert(checkpoint.session_id.clone(), checkpoint.clone());
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        Ok(self.entries.read().await.get(session_id).cloned())
    }

    async fn remove(&self, session_id: &str) -> Result<(), CheckpointError> {
        self.entries.write().await.remove(session_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Checkpoint>, CheckpointError> {
        let mut all: Vec<Checkpoint> = self.entries.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }
}

// ── File-backed ───────────────────────────────────────────────────

pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    /// Create the store, making `dir` if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| CheckpointError::Io {
                path: dir.clone(),
                source,
            })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", session_id))
    }

    async fn read_file(path: &Path) -> Result<Checkpoint, CheckpointError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| CheckpointError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let path = self.path_for(&checkpoint.session_id);
        let tmp = self.dir.join(format!(".{}.json.tmp", checkpoint.session_id));
        let bytes = serde_json::to_vec_pretty(checkpoint).map_err(|source| CheckpointError::Parse {
            path: path.clone(),
            source,
        })?;
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|source| CheckpointError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| CheckpointError::Io { path, source })?;
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let path = self.path_for(session_id);
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Self::read_file(&path).await.map(Some),
            Ok(false) => Ok(None),
            Err(source) => Err(CheckpointError::Io { path, source }),
        }
    }

    async fn remove(&self, session_id: &str) -> Result<(), CheckpointError> {
        let path = self.path_for(session_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CheckpointError::Io { path, source }),
        }
    }

    /// All readable checkpoints. Unreadable files are logged and skipped.
    async fn list(&self) -> Result<Vec<Checkpoint>, CheckpointError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|source| CheckpointError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let mut all = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|source| CheckpointError::Io {
            path: self.dir.clone(),
            source,
        })? {
            let path = entry.path();
            let is_checkpoint = path.extension().map(|e| e == "json").unwrap_or(false)
                && !entry.file_name().to_string_lossy().starts_with('.');
            if !is_checkpoint {
                continue;
            }
            match Self::read_file(&path).await {
                Ok(cp) => all.push(cp),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable checkpoint"),
            }
        }
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }
}

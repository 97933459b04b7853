use thiserror::Error;

use loader_core::{ErrorInfo, ErrorKind, ImportStatus, ValidationError};
use loader_credential::CredentialError;
use loader_ingest::SourceError;
use loader_store::StoreError;
use loader_transform::TransformError;

use crate::checkpoint::CheckpointError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("import session '{0}' not found")]
    NotFound(String),

    #[error("import session '{0}' already has an active import loop")]
    Busy(String),

    #[error("import session '{id}' cannot go from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: ImportStatus,
        to: ImportStatus,
    },

    #[error("import session '{id}' is still {status}")]
    NotFinished { id: String, status: ImportStatus },
}

/// Any failure surfaced by the orchestrator.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("{0}")]
    Internal(String),
}

impl ImportError {
    /// Stable classification reported to clients.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImportError::Validation(_) => ErrorKind::Validation,
            ImportError::Credential(_) => ErrorKind::Credential,
            ImportError::Source(_) => ErrorKind::Source,
            ImportError::Transform(_) => ErrorKind::Transform,
            ImportError::Store(e) if e.is_connection() => ErrorKind::Connection,
            ImportError::Store(_) => ErrorKind::Write,
            ImportError::Session(_) => ErrorKind::Session,
            ImportError::Checkpoint(_) | ImportError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn info(&self) -> ErrorInfo {
        ErrorInfo::new(self.kind(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_split_into_write_and_connection() {
        let conn: ImportError = StoreError::Connection("reset".into()).into();
        let cmd: ImportError = StoreError::Command("WRONGTYPE".into()).into();
        assert_eq!(conn.kind(), ErrorKind::Connection);
        assert_eq!(cmd.kind(), ErrorKind::Write);
    }

    #[test]
    fn info_carries_kind_and_message() {
        let err: ImportError = CredentialError::Missing.into();
        let info = err.info();
        assert_eq!(info.kind, ErrorKind::Credential);
        assert_eq!(info.message, "no store connection URL supplied");

        let err: ImportError = SessionError::NotFound("abc".into()).into();
        assert_eq!(err.kind(), ErrorKind::Session);
        assert!(err.to_string().contains("abc"));
    }
}

//! Shared types for the Redis import pipeline: configuration, request
//! payloads, session statistics, error classification and the read-only
//! catalog.

pub mod catalog;
pub mod config;
pub mod error;
pub mod record;
pub mod request;
pub mod stats;

pub use catalog::{Catalog, CatalogError, DataSourceDefinition, QueryViewData, ResolvedQueryView};
pub use config::{Config, ConfigError, ImportConfig, TransformConfig, WriteMode, MAX_TRANSFORM_FUEL};
pub use error::{ErrorInfo, ErrorKind, ValidationError};
pub use record::{record_key, RawRecord};
pub use request::{validate_session_id, EncryptedCredential, ImportRequest, PreloadRequest, ResumeRequest};
pub use stats::{ImportStats, ImportStatus, ProgressSnapshot};

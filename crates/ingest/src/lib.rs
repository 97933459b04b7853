//! Source reading for bulk imports.
//!
//! [`open`] turns an upload path into a [`RecordSource`]: a lazy, restartable
//! iterator of raw JSON records. A record that fails to parse is yielded as a
//! [`RecordError`] and still occupies one cursor position, so a resumed read
//! lines up with the original one.

mod reader;
mod upload;

use std::path::{Path, PathBuf};

use thiserror::Error;

use loader_core::RawRecord;

pub use reader::RecordReader;
pub use upload::{resolve_upload_path, UploadType};

/// Failure that prevents a source from being read at all.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("upload path not found: {0}")]
    NotFound(PathBuf),

    #[error("upload path {path} is outside the upload root")]
    OutsideRoot { path: PathBuf },

    #[error("unsupported upload type: {0}")]
    Unsupported(String),

    #[error("upload type {upload_type} does not match {path}")]
    Mismatch {
        upload_type: UploadType,
        path: PathBuf,
    },

    #[error("failed to read CSV header of {path}: {reason}")]
    Header { path: PathBuf, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-record read failure; counted as a failed record, never fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("record {position} ({origin}): {reason}")]
pub struct RecordError {
    /// 1-based position in the source.
    pub position: u64,
    /// File name or line reference the record came from.
    pub origin: String,
    pub reason: String,
}

/// Lazy record iterator over one upload.
pub struct RecordSource {
    upload_type: UploadType,
    path: PathBuf,
    reader: Box<dyn RecordReader>,
    position: u64,
}

impl RecordSource {
    pub fn upload_type(&self) -> UploadType {
        self.upload_type
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records consumed so far (including failed ones).
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Total record count when it is known before reading.
    pub fn total_hint(&self) -> Option<u64> {
        self.reader.total_hint()
    }

    /// Fast-forward past the first `cursor` records of the source.
    ///
    /// Returns how many records were actually skipped, which is less than
    /// requested only when the source has fewer records than `cursor`.
    pub fn skip_to(&mut self, cursor: u64) -> u64 {
        if cursor <= self.position {
            return 0;
        }
        let wanted = cursor - self.position;
        let skipped = self.reader.skip(wanted);
        self.position += skipped;
        if skipped < wanted {
            tracing::warn!(
                path = %self.path.display(),
                cursor,
                available = self.position,
                "source ended before resume cursor"
            );
        }
        skipped
    }

    /// Read up to `max` records.
    pub fn next_batch(&mut self, max: usize) -> Vec<Result<RawRecord, RecordError>> {
        self.by_ref().take(max).collect()
    }
}

impl Iterator for RecordSource {
    type Item = Result<RawRecord, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        let position = self.position + 1;
        let item = self.reader.next_record(position)?;
        self.position = position;
        Some(item)
    }
}

impl std::fmt::Debug for RecordSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordSource")
            .field("upload_type", &self.upload_type)
            .field("path", &self.path)
            .field("position", &self.position)
            .finish()
    }
}

/// Open an upload for reading.
///
/// `upload_type` is parsed when given and inferred from the path otherwise.
/// `upload_root`, when set, confines the path to that directory.
pub fn open(
    upload_path: &str,
    upload_type: Option<&str>,
    upload_root: Option<&Path>,
) -> Result<RecordSource, SourceError> {
    let path = resolve_upload_path(upload_path, upload_root)?;
    let upload_type = match upload_type.map(str::trim).filter(|t| !t.is_empty()) {
        Some(raw) => raw.parse::<UploadType>()?,
        None => UploadType::infer(&path)?,
    };

    let reader: Box<dyn RecordReader> = match upload_type {
        UploadType::JsonFolder => {
            if !path.is_dir() {
                return Err(SourceError::Mismatch { upload_type, path });
            }
            Box::new(reader::JsonFolderReader::open(&path))
        }
        UploadType::JsonLines => {
            if !path.is_file() {
                return Err(SourceError::Mismatch { upload_type, path });
            }
            Box::new(reader::JsonLinesReader::open(&path)?)
        }
        UploadType::Csv => {
            if !path.is_file() {
                return Err(SourceError::Mismatch { upload_type, path });
            }
            Box::new(reader::CsvReader::open(&path)?)
        }
    };

    tracing::debug!(
        path = %path.display(),
        upload_type = %upload_type,
        total = ?reader.total_hint(),
        "opened record source"
    );

    Ok(RecordSource {
        upload_type,
        path,
        reader,
        position: 0,
    })
}

use std::path::{Path, PathBuf};

use crate::SourceError;

/// Shape of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadType {
    /// A directory of `*.json` files, one record per file.
    JsonFolder,
    /// One JSON value per non-blank line.
    JsonLines,
    /// Header row plus one record per row.
    Csv,
}

impl UploadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadType::JsonFolder => "json_folder",
            UploadType::JsonLines => "json_lines",
            UploadType::Csv => "csv",
        }
    }

    /// Guess the type from what is on disk.
    pub fn infer(path: &Path) -> Result<Self, SourceError> {
        if path.is_dir() {
            return Ok(UploadType::JsonFolder);
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "jsonl" | "ndjson" => Ok(UploadType::JsonLines),
            "csv" => Ok(UploadType::Csv),
            "" => Err(SourceError::Unsupported(format!(
                "cannot infer upload type of {}",
                path.display()
            ))),
            other => Err(SourceError::Unsupported(format!(".{}", other))),
        }
    }
}

impl std::fmt::Display for UploadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UploadType {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "json_folder" => Ok(UploadType::JsonFolder),
            "json_lines" | "jsonl" | "ndjson" => Ok(UploadType::JsonLines),
            "csv" => Ok(UploadType::Csv),
            other => Err(SourceError::Unsupported(other.to_string())),
        }
    }
}

/// Canonicalize an upload path, optionally confining it to `upload_root`.
pub fn resolve_upload_path(raw: &str, upload_root: Option<&Path>) -> Result<PathBuf, SourceError> {
    let candidate = match upload_root {
        // Relative paths are taken relative to the root.
        Some(root) if Path::new(raw).is_relative() => root.join(raw),
        _ => PathBuf::from(raw),
    };

    let path = candidate
        .canonicalize()
        .map_err(|_| SourceError::NotFound(candidate.clone()))?;

    if let Some(root) = upload_root {
        let root = root.canonicalize().map_err(|source| SourceError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        if !path.starts_with(&root) {
            return Err(SourceError::OutsideRoot { path });
        }
    }

    Ok(path)
}

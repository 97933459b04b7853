use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use loader_core::RawRecord;

use crate::{RecordError, SourceError};

/// One upload format. Implementations never look back: a reader is
/// consumed front to back exactly once.
pub trait RecordReader: Send {
    /// Produce the record at 1-based `position`, or `None` when exhausted.
    fn next_record(&mut self, position: u64) -> Option<Result<RawRecord, RecordError>>;

    /// Total record count if known without reading.
    fn total_hint(&self) -> Option<u64> {
        None
    }

    /// Discard up to `n` records without parsing them. Returns the number
    /// actually discarded.
    fn skip(&mut self, n: u64) -> u64;
}

// ── JSON folder ───────────────────────────────────────────────────

pub(crate) struct JsonFolderReader {
    root: PathBuf,
    files: Vec<PathBuf>,
    next: usize,
}

impl JsonFolderReader {
    pub(crate) fn open(root: &Path) -> Self {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("json"))
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        files.sort();

        tracing::debug!(root = %root.display(), files = files.len(), "scanned json folder");
        Self {
            root: root.to_path_buf(),
            files,
            next: 0,
        }
    }

    fn origin(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

impl RecordReader for JsonFolderReader {
    fn next_record(&mut self, position: u64) -> Option<Result<RawRecord, RecordError>> {
        let path = self.files.get(self.next)?.clone();
        self.next += 1;
        let origin = self.origin(&path);

        let result = std::fs::read(&path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).map_err(|e| e.to_string()));

        Some(result.map_err(|reason| RecordError {
            position,
            origin,
            reason,
        }))
    }

    fn total_hint(&self) -> Option<u64> {
        Some(self.files.len() as u64)
    }

    fn skip(&mut self, n: u64) -> u64 {
        let remaining = (self.files.len() - self.next) as u64;
        let skipped = n.min(remaining);
        self.next += skipped as usize;
        skipped
    }
}

// ── JSON Lines ────────────────────────────────────────────────────

/// Lines are read as raw bytes: a line that is not valid UTF-8 is one
/// malformed record, not the end of the file.
pub(crate) struct JsonLinesReader {
    reader: BufReader<File>,
    buf: Vec<u8>,
    line_no: u64,
    done: bool,
}

impl JsonLinesReader {
    pub(crate) fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            reader: BufReader::new(file),
            buf: Vec::new(),
            line_no: 0,
            done: false,
        })
    }

    /// Advance to the next non-blank line, leaving it in `buf`. Returns its
    /// line number.
    fn next_line(&mut self) -> Option<Result<u64, (u64, String)>> {
        if self.done {
            return None;
        }
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {
                    self.line_no += 1;
                    if self.buf.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    return Some(Ok(self.line_no));
                }
                Err(e) => {
                    // A read error leaves the stream position undefined.
                    self.done = true;
                    return Some(Err((self.line_no + 1, e.to_string())));
                }
            }
        }
    }
}

impl RecordReader for JsonLinesReader {
    fn next_record(&mut self, position: u64) -> Option<Result<RawRecord, RecordError>> {
        Some(match self.next_line()? {
            Ok(line_no) => serde_json::from_slice::<Value>(&self.buf).map_err(|e| RecordError {
                position,
                origin: format!("line {}", line_no),
                reason: e.to_string(),
            }),
            Err((line_no, reason)) => Err(RecordError {
                position,
                origin: format!("line {}", line_no),
                reason,
            }),
        })
    }

    fn skip(&mut self, n: u64) -> u64 {
        let mut skipped = 0;
        while skipped < n && self.next_line().is_some() {
            skipped += 1;
        }
        skipped
    }
}

// ── CSV ───────────────────────────────────────────────────────────

pub(crate) struct CsvReader {
    reader: csv::Reader<File>,
    headers: Vec<String>,
    row: csv::StringRecord,
    done: bool,
}

impl CsvReader {
    pub(crate) fn open(path: &Path) -> Result<Self, SourceError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_path(path)
            .map_err(|e| SourceError::Header {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| SourceError::Header {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
            .iter()
            // Strip a UTF-8 BOM from the first column name.
            .map(|h| h.trim_start_matches('\u{FEFF}').trim().to_string())
            .collect();

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(SourceError::Header {
                path: path.to_path_buf(),
                reason: "missing header row".to_string(),
            });
        }

        Ok(Self {
            reader,
            headers,
            row: csv::StringRecord::new(),
            done: false,
        })
    }

    /// Advance to the next row. `Ok(false)` means exhausted.
    fn advance(&mut self) -> Result<bool, csv::Error> {
        if self.done {
            return Ok(false);
        }
        match self.reader.read_record(&mut self.row) {
            Ok(more) => {
                self.done = !more;
                Ok(more)
            }
            Err(e) => {
                if e.is_io_error() {
                    self.done = true;
                }
                Err(e)
            }
        }
    }

    fn current_line(&self) -> String {
        self.row
            .position()
            .map(|p| format!("line {}", p.line()))
            .unwrap_or_else(|| "row".to_string())
    }
}

impl RecordReader for CsvReader {
    fn next_record(&mut self, position: u64) -> Option<Result<RawRecord, RecordError>> {
        match self.advance() {
            Ok(false) => None,
            Ok(true) => {
                let mut obj = Map::with_capacity(self.headers.len());
                for (name, value) in self.headers.iter().zip(self.row.iter()) {
                    obj.insert(name.clone(), Value::String(value.to_string()));
                }
                Some(Ok(Value::Object(obj)))
            }
            Err(e) => {
                let origin = e
                    .position()
                    .map(|p| format!("line {}", p.line()))
                    .unwrap_or_else(|| self.current_line());
                Some(Err(RecordError {
                    position,
                    origin,
                    reason: e.to_string(),
                }))
            }
        }
    }

    fn skip(&mut self, n: u64) -> u64 {
        let mut skipped = 0;
        while skipped < n {
            match self.advance() {
                Ok(false) => break,
                // Malformed rows still count as consumed positions.
                Ok(true) | Err(_) => skipped += 1,
            }
            if self.done {
                break;
            }
        }
        skipped
    }
}

//! Tabular data reader: loads the product CSV, fingerprints it for change
//! detection and checks its header.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::contract::RowRecord;
use crate::error::ReaderError;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// SHA-256 digest of the data file bytes, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Fingerprint(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reader for one CSV data file. Holds the last-seen fingerprint.
#[derive(Debug, Clone)]
pub struct DataFileReader {
    path: PathBuf,
    baseline: Option<Fingerprint>,
}

impl DataFileReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            baseline: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn read_bytes(&self) -> Result<Vec<u8>, ReaderError> {
        fs::read(&self.path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ReaderError::NotFound(self.path.clone())
            } else {
                ReaderError::Io {
                    path: self.path.clone(),
                    source: e,
                }
            }
        })
    }

    /// Digest of the current file contents.
    pub fn fingerprint(&self) -> Result<Fingerprint, ReaderError> {
        let bytes = self.read_bytes()?;
        Ok(Fingerprint::of(&bytes))
    }

    /// True when the file differs from the last call that returned true.
    ///
    /// The first successful call has no baseline to compare against and always
    /// reports a change. A missing or unreadable file reports no change and
    /// leaves the baseline alone.
    pub fn has_changed(&mut self) -> bool {
        let current = match self.fingerprint() {
            Ok(fp) => fp,
            Err(ReaderError::NotFound(path)) => {
                warn!(path = %path.display(), "Data file not found while checking for changes");
                return false;
            }
            Err(e) => {
                error!(error = %e, "Failed to fingerprint data file");
                return false;
            }
        };

        if self.baseline.as_ref() == Some(&current) {
            debug!(fingerprint = %current, "Data file unchanged");
            return false;
        }

        info!(
            path = %self.path.display(),
            previous = self.baseline.as_ref().map(Fingerprint::as_str).unwrap_or("<none>"),
            current = %current,
            "Data file fingerprint changed"
        );
        self.baseline = Some(current);
        true
    }

    pub fn baseline(&self) -> Option<&Fingerprint> {
        self.baseline.as_ref()
    }

    fn csv_reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
        let data = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(data)
    }

    fn csv_error(&self, source: csv::Error) -> ReaderError {
        ReaderError::Csv {
            path: self.path.clone(),
            source,
        }
    }

    /// Header names of the data file, in file order.
    pub fn headers(&self) -> Result<Vec<String>, ReaderError> {
        let bytes = self.read_bytes()?;
        let mut reader = Self::csv_reader(&bytes);
        let headers = reader.headers().map_err(|e| self.csv_error(e))?;
        Ok(headers.iter().map(str::to_string).collect())
    }

    /// Parse every data line into a [`RowRecord`], skipping rows whose cells are all empty.
    pub fn read_rows(&self) -> Result<Vec<RowRecord>, ReaderError> {
        let bytes = self.read_bytes()?;
        let mut reader = Self::csv_reader(&bytes);
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| self.csv_error(e))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record.map_err(|e| {
                error!(error = %e, path = %self.path.display(), "Malformed CSV record");
                self.csv_error(e)
            })?;
            let line_number = record
                .position()
                .map(|pos| pos.line() as usize)
                .unwrap_or(idx + 2);
            // Short records leave their trailing columns absent; long ones are malformed.
            if record.len() > headers.len() {
                error!(
                    line = line_number,
                    expected = headers.len(),
                    found = record.len(),
                    path = %self.path.display(),
                    "Record has more fields than the header"
                );
                return Err(ReaderError::TooManyFields {
                    path: self.path.clone(),
                    line: line_number,
                    expected: headers.len(),
                    found: record.len(),
                });
            }
            let row = RowRecord::new(
                line_number,
                headers.iter().cloned().zip(record.iter().map(str::to_string)),
            );
            if row.is_blank() {
                debug!(line = row.line_number, "Skipping empty row");
                continue;
            }
            rows.push(row);
        }

        info!(path = %self.path.display(), rows = rows.len(), "Read data file");
        Ok(rows)
    }

    /// Fails with the full list of `required` columns the header lacks.
    pub fn validate_columns(&self, required: &[&str]) -> Result<(), ReaderError> {
        let headers = self.headers()?;
        let missing: Vec<String> = required
            .iter()
            .filter(|col| !headers.iter().any(|h| h == *col))
            .map(|col| col.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            error!(missing = ?missing, path = %self.path.display(), "Data file lacks required columns");
            Err(ReaderError::MissingColumns(missing))
        }
    }

    /// Last modification time of the data file.
    pub fn modified_at(&self) -> Result<DateTime<Local>, ReaderError> {
        let meta = fs::metadata(&self.path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ReaderError::NotFound(self.path.clone())
            } else {
                ReaderError::Io {
                    path: self.path.clone(),
                    source: e,
                }
            }
        })?;
        let modified = meta.modified().map_err(|e| ReaderError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(DateTime::<Local>::from(modified))
    }
}

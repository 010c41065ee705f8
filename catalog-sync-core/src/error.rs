//! Error types shared by the reader, the catalog contract and the orchestrator.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while fingerprinting, validating or parsing the data file.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("data file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read data file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("line {line} of {path} has {found} fields, but the header has {expected}")]
    TooManyFields {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// A row that cannot be mapped to a product payload.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PayloadError {
    #[error("row has no value for required column '{0}'")]
    MissingField(&'static str),

    #[error("column '{field}' is not a number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

/// Failures talking to the remote catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("catalog answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected catalog response: {0}")]
    Response(String),
}

/// Why a single row did not make it into the catalog.
#[derive(Debug, Error)]
pub enum RowError {
    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Setup problems detected before any write is issued.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("data file check failed: {0}")]
    DataFile(#[from] ReaderError),

    #[error("catalog authentication failed: {0}")]
    Auth(#[source] CatalogError),
}

/// Errors that end a synchronisation run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error("could not read rows: {0}")]
    Read(#[from] ReaderError),

    #[error("data file {0} contains no rows")]
    NoRows(PathBuf),

    #[error("file watcher failed: {0}")]
    Watch(#[from] notify::Error),
}

// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

use crate::classifier::ClassifyError;

/// Errors that can occur when reading or appending the completion store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on completion store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed entry at line {line} in {path}: {message}")]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Failed to encode entry {id}: {message}")]
    Encode { id: String, message: String },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors that can occur while fetching records from the row source.
/// All of them abort the run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Cannot read credentials file {path}: {message}")]
    Credentials { path: PathBuf, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Spreadsheet not found: {0}")]
    SpreadsheetNotFound(String),

    #[error("Worksheet {worksheet:?} not found in spreadsheet {spreadsheet:?}")]
    WorksheetNotFound {
        spreadsheet: String,
        worksheet: String,
    },

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
}

/// Fatal errors that end a batch run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Classification failed for record {id}: {source}")]
    Classification {
        id: String,
        #[source]
        source: ClassifyError,
    },
}

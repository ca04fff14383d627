use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the data store and its codec
#[derive(Debug, Error)]
pub enum StoreError {
    /// Index out of `[0, n)` or an identifier that cannot address a record
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    /// Malformed or headerless source file
    #[error("Malformed data file {}: {reason}", path.display())]
    Format { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StoreError::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

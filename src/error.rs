// File: ./src/error.rs
// Typed failures surfaced across the store boundary and by the review engine.
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no daily log exists for {0}")]
    NotFound(NaiveDate),
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed value for settings key '{key}': {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Malformed {
            key: String::new(),
            source: value,
        }
    }
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("task {0} is not in the review queue")]
    UnknownTask(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type StoreResult<T> = Result<T, StoreError>;

use std::path::PathBuf;

use thiserror::Error;

/// Failures from the persistent mistake and history stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("history database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv export error: {0}")]
    Csv(#[from] csv::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures while reading the bundled course catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("course file not found: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("failed to parse {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown course `{0}`")]
    UnknownCourse(String),
}

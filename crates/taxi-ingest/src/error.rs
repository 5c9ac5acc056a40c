//! Failure taxonomy of the load pipeline
//!
//! Each stage returns its own error type so the caller decides how far a
//! failure reaches: a chunk, a file, or the whole run.

use std::path::PathBuf;
use thiserror::Error;

/// Pre-flight check failed; nothing may be processed
#[derive(Debug, Error)]
pub enum ConnectivityError {
    #[error("Database query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Table {table} is not reachable: {source}")]
    MissingTable {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Database unavailable: {0}")]
    Unavailable(String),
}

/// A file could not be downloaded; the file is skipped
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file could not be read as gzip CSV; its remaining chunks are skipped
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("File has no header row")]
    MissingHeader,

    #[error("Corrupt input: {0}")]
    Corrupt(String),
}

/// A chunk could not be appended; only that chunk is lost
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Chunk has no columns")]
    NoColumns,

    #[error("Rejected: {0}")]
    Rejected(String),
}

/// Temporary storage could not be removed; logged, never propagated
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("Failed to remove file {}: {source}", path.display())]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove directory {}: {source}", path.display())]
    RemoveDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

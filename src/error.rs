//! Error types for the memory engine.
//!
//! The taxonomy is deliberately small and closed:
//!
//! - [`EngineError::Configuration`] — invalid settings. Fatal, surfaced
//!   immediately, never retried.
//! - [`EngineError::FileAccess`] — an unreadable file or denied path.
//!   Recovered locally during batch work: the file is logged and skipped.
//! - [`EngineError::BackendUnavailable`] — the embedding or store backend
//!   cannot be reached or initialized. Fatal for the operation that needed
//!   it, but a watch loop logs it and keeps waiting for the next event.
//! - [`EngineError::Store`] — a vector-store read/write failure.
//!
//! "No files matched" and "no duplicates found" are not errors; they are
//! empty reports.

use std::path::PathBuf;

use thiserror::Error;

/// Domain errors for memorybank operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A configuration value is invalid (e.g. `chunk_overlap >= chunk_chars`).
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A file could not be read or removed.
    #[error("cannot access {path}: {source}")]
    FileAccess {
        /// The path that failed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The selected embedding backend (or its runtime/weights) is missing
    /// or unreachable. Embedding dimensionality differs between providers,
    /// so callers must surface this rather than silently degrade.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The vector store failed to persist or load a collection.
    #[error("vector store failure: {0}")]
    Store(String),
}

impl EngineError {
    pub(crate) fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::FileAccess {
            path: path.into(),
            source,
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, EngineError>;

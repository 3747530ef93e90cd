//! Error types for document loading.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for document operations.
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Errors that can occur while loading or decoding a document.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// I/O error reading a document file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON decode error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML decode error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The payload decoded, but its root is not a mapping.
    #[error("document root must be a mapping, got {0}")]
    NotAMapping(&'static str),
}

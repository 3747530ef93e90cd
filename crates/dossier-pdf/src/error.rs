//! Error types for PDF generation.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Errors that can occur while producing or inspecting a PDF.
#[derive(Error, Debug)]
pub enum PdfError {
    /// I/O error on a specific file.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// PDF object model error.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Serializing the finished document failed.
    #[error("cannot serialize PDF: {0}")]
    Serialize(#[source] std::io::Error),

    /// An embedded image could not be loaded.
    #[error("cannot embed image {src}: {reason}")]
    Image { src: String, reason: String },

    /// Encryption failed; the unencrypted artifact is left in place.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// The file is not a PDF this crate can read.
    #[error("not a readable PDF: {0}")]
    Unreadable(String),
}

impl PdfError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PdfError::Io {
            path: path.into(),
            source,
        }
    }
}

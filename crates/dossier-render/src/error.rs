//! Error types for template rendering.

use thiserror::Error;

/// Result type for render operations.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Errors that can occur while rendering a report.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The configured fallback template does not exist.
    #[error("unknown default template '{0}'")]
    UnknownDefaultTemplate(String),

    /// Template rendering error.
    #[error("template error: {0}")]
    TemplateError(String),
}

impl From<askama::Error> for RenderError {
    fn from(err: askama::Error) -> Self {
        RenderError::TemplateError(err.to_string())
    }
}

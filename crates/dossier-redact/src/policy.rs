//! Redaction policy configuration.

use serde::{Deserialize, Serialize};

/// Limits and presentation settings for redaction spans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionPolicy {
    /// More spans than this in a single field is a validation error.
    #[serde(default = "default_max_redactions")]
    pub max_redactions_per_field: usize,

    /// Spans longer than this (in chars) draw a warning.
    #[serde(default = "default_max_span_chars")]
    pub max_span_chars: usize,

    /// CSS class put on rendered spans.
    #[serde(default = "default_css_class")]
    pub css_class: String,
}

fn default_max_redactions() -> usize {
    1000
}

fn default_max_span_chars() -> usize {
    1000
}

fn default_css_class() -> String {
    "redacted".to_string()
}

impl Default for RedactionPolicy {
    fn default() -> Self {
        Self {
            max_redactions_per_field: default_max_redactions(),
            max_span_chars: default_max_span_chars(),
            css_class: default_css_class(),
        }
    }
}

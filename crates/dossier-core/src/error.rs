//! Pipeline failure values.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The pipeline step that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// The document (or its input file) was rejected.
    Validation,
    Render,
    Pdf,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Validation => "validation",
            Stage::Render => "render",
            Stage::Pdf => "pdf",
            Stage::Persist => "persist",
        })
    }
}

/// No artifact was produced; `reasons` says why.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{stage} failed: {}", reasons.join("; "))]
pub struct GenerationError {
    pub stage: Stage,
    pub reasons: Vec<String>,
    /// Known once the document passed validation.
    pub report_id: Option<String>,
}

impl GenerationError {
    pub fn new(stage: Stage, reasons: Vec<String>) -> Self {
        Self {
            stage,
            reasons,
            report_id: None,
        }
    }

    pub fn single(stage: Stage, reason: impl fmt::Display) -> Self {
        Self::new(stage, vec![reason.to_string()])
    }

    pub fn for_report(mut self, report_id: &str) -> Self {
        self.report_id = Some(report_id.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_reasons() {
        let err = GenerationError::new(
            Stage::Validation,
            vec!["Missing author".to_string(), "Bad date".to_string()],
        );
        assert_eq!(err.to_string(), "validation failed: Missing author; Bad date");
        assert_eq!(
            serde_json::to_value(Stage::Persist).unwrap(),
            serde_json::json!("persist")
        );
    }
}

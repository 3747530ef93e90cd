//! Requests and results of the report pipeline.

use crate::error::{GenerationError, Stage};
use chrono::{DateTime, Utc};
use dossier_common::Document;
use dossier_image::{ImageArtifact, ImageFailure};
use dossier_pdf::PdfArtifact;
use dossier_redact::RedactionStats;
use dossier_render::TemplateName;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One document to turn into a report.
///
/// Unset options fall back to the engine's configuration.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub document: Document,
    /// Defaults to `<paths.output_dir>/<report_id>.pdf`.
    pub output: Option<PathBuf>,
    pub template: Option<String>,
    pub encrypt: Option<bool>,
    pub password: Option<String>,
    pub strip_exif: Option<bool>,
    /// Overrides the configured watermark text.
    pub watermark: Option<String>,
    pub persist: bool,
}

impl GenerateRequest {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            output: None,
            template: None,
            encrypt: None,
            password: None,
            strip_exif: None,
            watermark: None,
            persist: true,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_encryption(mut self, encrypt: bool) -> Self {
        self.encrypt = Some(encrypt);
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_strip_exif(mut self, strip: bool) -> Self {
        self.strip_exif = Some(strip);
        self
    }

    pub fn with_watermark(mut self, text: impl Into<String>) -> Self {
        self.watermark = Some(text.into());
        self
    }

    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }
}

/// What happened to the report record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceStatus {
    /// Persistence was not requested.
    Skipped,
    Created,
    /// The id was already stored; the existing record was kept.
    Existing,
}

/// A successfully generated report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedReport {
    pub report_id: String,
    pub pdf: PdfArtifact,
    pub template: TemplateName,
    /// The requested template was unknown and the default was used.
    pub template_fell_back: bool,
    pub redaction_stats: RedactionStats,
    pub images: Vec<ImageArtifact>,
    /// Images dropped from the report because they could not be processed.
    pub image_failures: Vec<ImageFailure>,
    pub warnings: Vec<String>,
    pub persistence: PersistenceStatus,
    /// Version of the stored record, when persisted.
    pub record_version: Option<u32>,
}

/// Per-item outcome inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    /// 1-based position in the batch.
    pub index: usize,
    pub label: String,
    pub success: bool,
    pub report_id: Option<String>,
    pub output_path: Option<PathBuf>,
    pub stage: Option<Stage>,
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl BatchItem {
    pub(crate) fn from_outcome(
        index: usize,
        label: String,
        outcome: &Result<GeneratedReport, GenerationError>,
    ) -> Self {
        match outcome {
            Ok(report) => Self {
                index,
                label,
                success: true,
                report_id: Some(report.report_id.clone()),
                output_path: Some(report.pdf.path.clone()),
                stage: None,
                reasons: Vec::new(),
            },
            Err(err) => Self {
                index,
                label,
                success: false,
                report_id: err.report_id.clone(),
                output_path: None,
                stage: Some(err.stage),
                reasons: err.reasons.clone(),
            },
        }
    }
}

/// Summary of a sequential batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub generated_files: Vec<PathBuf>,
    /// `<label>: <reason>` lines for failed items.
    pub errors: Vec<String>,
    pub items: Vec<BatchItem>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl BatchResult {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

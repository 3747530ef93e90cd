//! The report pipeline.
//!
//! validate → sanitize images → count redactions → render → PDF → persist.
//!
//! Validation is the only fail-fast step that looks at the whole document.
//! Image failures are isolated to the image: it is dropped from the report
//! and listed in the result. Anything failing after that turns into a
//! [`GenerationError`] and no artifact is reported.

use crate::error::{GenerationError, Stage};
use crate::identity::{derive_report_id, pdf_file_name};
use crate::model::{BatchItem, BatchResult, GenerateRequest, GeneratedReport, PersistenceStatus};
use chrono::{Datelike, Utc};
use dossier_common::{Document, ValidationResult};
use dossier_config::DossierConfig;
use dossier_image::{ImageArtifact, ImageFailure, ImageSanitizer};
use dossier_pdf::{PdfArtifact, PdfEncryptor, PdfGenerator, PdfOptions};
use dossier_redact::{RedactionEngine, RedactionStats};
use dossier_render::TemplateRenderer;
use dossier_store::{InsertOutcome, NewAuditEvent, NewReport, ReportStore, StoreError};
use dossier_validate::DocumentValidator;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, info_span, warn};

/// Sequences validation, image sanitizing, rendering, PDF generation and
/// persistence for single documents and batches.
pub struct ReportEngine {
    config: DossierConfig,
    redaction: RedactionEngine,
    validator: DocumentValidator,
    images: ImageSanitizer,
    renderer: TemplateRenderer,
    pdf: PdfGenerator,
    store: Option<ReportStore>,
}

impl ReportEngine {
    /// An engine without a store; requests asking for persistence fail at
    /// the persist stage.
    pub fn new(config: DossierConfig) -> Self {
        let redaction = RedactionEngine::new(config.redaction.clone());
        Self {
            validator: DocumentValidator::new(redaction.clone()),
            images: ImageSanitizer::new(
                config.images.clone(),
                config.paths.processed_images_dir.clone(),
            ),
            renderer: TemplateRenderer::new(&config.templates, &config.redaction),
            pdf: PdfGenerator::new(config.pdf.clone(), config.redaction.css_class.clone()),
            redaction,
            store: None,
            config,
        }
    }

    /// An engine backed by the store named in `config.database`.
    pub fn open(config: DossierConfig) -> Result<Self, StoreError> {
        let store = ReportStore::open(&config.database, config.retention.clone())?
            .with_audit_logging(config.security.audit_logging);
        Ok(Self::new(config).with_store(store))
    }

    pub fn with_store(mut self, store: ReportStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_encryptor(mut self, encryptor: Box<dyn PdfEncryptor>) -> Self {
        self.pdf = self.pdf.with_encryptor(encryptor);
        self
    }

    pub fn config(&self) -> &DossierConfig {
        &self.config
    }

    pub fn store(&self) -> Option<&ReportStore> {
        self.store.as_ref()
    }

    /// Full document validation without generating anything.
    pub fn validate(&self, doc: &Document) -> ValidationResult {
        self.validator.validate(doc)
    }

    /// Run one document through the pipeline.
    pub fn generate(&self, request: GenerateRequest) -> Result<GeneratedReport, GenerationError> {
        let GenerateRequest {
            mut document,
            output,
            template,
            encrypt,
            password,
            strip_exif,
            watermark,
            persist,
        } = request;

        let validation = self.validator.validate(&document);
        if !validation.is_valid {
            warn!(errors = validation.errors.len(), "document failed validation");
            return Err(GenerationError::new(Stage::Validation, validation.errors));
        }
        let mut warnings = validation.warnings;

        let report_id = match document.report_id() {
            Some(id) => id.to_string(),
            None => {
                let id = derive_report_id(&document, Utc::now().year());
                set_meta_report_id(&mut document, &id);
                debug!(report_id = %id, "derived report id");
                id
            }
        };
        let span = info_span!("generate", report_id = %report_id);
        let _enter = span.enter();
        let fail = |stage: Stage, reason: String| {
            GenerationError::single(stage, reason).for_report(&report_id)
        };

        let strip_exif = strip_exif.unwrap_or(self.config.security.strip_exif);
        let (images, image_failures) = self.splice_images(&mut document, strip_exif);
        warnings.extend(
            image_failures
                .iter()
                .map(|f| format!("image dropped: {}: {}", f.path.display(), f.error)),
        );

        let stats = self.redaction.document_stats(&document);
        info!(
            redactions = stats.total_redactions,
            fields = stats.fields_with_redactions.len(),
            "redaction statistics computed"
        );

        let rendered = self
            .renderer
            .render(&document, template.as_deref())
            .map_err(|e| fail(Stage::Render, e.to_string()))?;

        let output = output.unwrap_or_else(|| {
            self.config.paths.output_dir.join(pdf_file_name(&report_id))
        });
        let output = self.unclaimed_output(&report_id, output, &mut warnings);
        let options = PdfOptions {
            watermark: watermark.or_else(|| self.watermark_for(&document)),
            encrypt: encrypt.unwrap_or(self.config.security.encrypt_by_default),
            password: password.or_else(|| Some(self.config.security.default_password.clone())),
        };
        let pdf = self
            .pdf
            .generate(&rendered.html, &output, &options)
            .map_err(|e| fail(Stage::Pdf, e.to_string()))?;
        if let Some(reason) = &pdf.encryption_error {
            warnings.push(format!("PDF left unencrypted: {reason}"));
        }

        let (persistence, record_version) = if persist {
            self.persist(&report_id, &document, &pdf, &stats, rendered.template.as_str())?
        } else {
            (PersistenceStatus::Skipped, None)
        };

        info!(
            path = %pdf.path.display(),
            pages = pdf.page_count,
            encrypted = pdf.is_encrypted,
            persistence = ?persistence,
            "report generation complete"
        );
        Ok(GeneratedReport {
            report_id,
            pdf,
            template: rendered.template,
            template_fell_back: rendered.fell_back,
            redaction_stats: stats,
            images,
            image_failures,
            warnings,
            persistence,
            record_version,
        })
    }

    /// Run every request in order. One item's failure never stops the rest.
    pub fn generate_batch(&self, requests: Vec<GenerateRequest>) -> BatchResult {
        let start_time = Utc::now();
        let total = requests.len();
        let mut items = Vec::with_capacity(total);

        for (index, request) in requests.into_iter().enumerate() {
            let index = index + 1;
            let label = batch_label(index, &request);
            info!(index, total, label = %label, "generating batch item");
            let outcome = self.generate(request);
            if let Err(e) = &outcome {
                warn!(index, label = %label, error = %e, "batch item failed");
            }
            items.push(BatchItem::from_outcome(index, label, &outcome));
        }

        let successful = items.iter().filter(|i| i.success).count();
        let result = BatchResult {
            total,
            successful,
            failed: total - successful,
            generated_files: items.iter().filter_map(|i| i.output_path.clone()).collect(),
            errors: items
                .iter()
                .filter(|i| !i.success)
                .map(|i| format!("{}: {}", i.label, i.reasons.join("; ")))
                .collect(),
            items,
            start_time,
            end_time: Utc::now(),
        };
        info!(
            successful = result.successful,
            total = result.total,
            "batch generation complete"
        );
        result
    }

    /// Explicit request text wins; otherwise the configured text or the
    /// classification marking, when watermarking is enabled.
    fn watermark_for(&self, doc: &Document) -> Option<String> {
        if !self.config.pdf.enable_watermark {
            return None;
        }
        self.config
            .pdf
            .watermark_text
            .clone()
            .or_else(|| Some(doc.classification().unwrap_or("UNCLASSIFIED").to_string()))
    }

    /// Keep a stored record's hash true to its file: when `output` is the
    /// artifact an existing record points at, write beside it instead.
    fn unclaimed_output(
        &self,
        report_id: &str,
        output: PathBuf,
        warnings: &mut Vec<String>,
    ) -> PathBuf {
        let Some(store) = &self.store else {
            return output;
        };
        let recorded = match store.recorded_file(report_id) {
            Ok(Some(path)) => path,
            Ok(None) => return output,
            Err(e) => {
                warn!(error = %e, "could not look up the recorded artifact");
                return output;
            }
        };
        if recorded != output {
            return output;
        }
        let diverted = timestamped_path(&output);
        warn!(
            recorded = %recorded.display(),
            output = %diverted.display(),
            "report id already stored; not overwriting its artifact"
        );
        warnings.push(format!(
            "{} belongs to the stored record; wrote {} instead",
            recorded.display(),
            diverted.display()
        ));
        diverted
    }

    /// Sanitize every entry of the `images` section and point the payload
    /// at the processed files. Entries that fail are removed.
    fn splice_images(
        &self,
        doc: &mut Document,
        strip_exif: bool,
    ) -> (Vec<ImageArtifact>, Vec<ImageFailure>) {
        let mut artifacts = Vec::new();
        let mut failures = Vec::new();
        let Some(section) = doc.section_mut("images") else {
            return (artifacts, failures);
        };

        let mut spliced = Map::new();
        for (key, value) in std::mem::take(section) {
            let Some(src) = image_source(&value) else {
                spliced.insert(key, value);
                continue;
            };
            match self.images.process(Path::new(&src), strip_exif) {
                Ok(artifact) => {
                    let processed = artifact.output_path.display().to_string();
                    info!(image = %key, output = %artifact.filename, "image processed");
                    let value = match value {
                        Value::Object(mut entry) => {
                            entry.insert("path".to_string(), Value::String(processed));
                            entry.insert("original_path".to_string(), Value::String(src));
                            Value::Object(entry)
                        }
                        _ => Value::String(processed),
                    };
                    spliced.insert(key, value);
                    artifacts.push(artifact);
                }
                Err(e) => {
                    warn!(image = %key, error = %e, "image dropped from report");
                    failures.push(ImageFailure {
                        path: PathBuf::from(src),
                        error: e.to_string(),
                    });
                }
            }
        }
        *section = spliced;
        (artifacts, failures)
    }

    fn persist(
        &self,
        report_id: &str,
        doc: &Document,
        pdf: &PdfArtifact,
        stats: &RedactionStats,
        template: &str,
    ) -> Result<(PersistenceStatus, Option<u32>), GenerationError> {
        let Some(store) = &self.store else {
            return Err(self.persist_failed(report_id, pdf, "no report store configured"));
        };

        let mut new = NewReport::from_document(report_id, doc);
        new.file_path = Some(pdf.path.display().to_string());
        new.file_hash = Some(pdf.file_hash.clone());
        new.page_count = u32::try_from(pdf.page_count).unwrap_or(u32::MAX);
        new.is_encrypted = pdf.is_encrypted;
        new.custom_metadata = match serde_json::to_value(stats) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let author = new.author.clone();

        let outcome = store
            .insert(new)
            .map_err(|e| self.persist_failed(report_id, pdf, &e.to_string()))?;
        let status = match &outcome {
            InsertOutcome::Created(_) => PersistenceStatus::Created,
            InsertOutcome::Existing(_) => PersistenceStatus::Existing,
        };
        store.log_audit(
            NewAuditEvent::new("REPORT_GENERATION", "PDF_CREATED", &author)
                .for_report(report_id)
                .with_details(json!({
                    "filename": pdf.path.file_name().map(|n| n.to_string_lossy().into_owned()),
                    "encrypted": pdf.is_encrypted,
                    "redactions": stats.total_redactions,
                    "template": template,
                    "file_hash": pdf.file_hash,
                    "record": status,
                })),
        );
        Ok((status, Some(outcome.record().version)))
    }

    /// Build the persist-stage error, deleting the artifact first when
    /// compensation is configured.
    fn persist_failed(&self, report_id: &str, pdf: &PdfArtifact, reason: &str) -> GenerationError {
        error!(error = reason, "persisting report failed");
        let mut reasons = vec![reason.to_string()];
        if self.config.pipeline.compensate_on_persist_failure {
            match std::fs::remove_file(&pdf.path) {
                Ok(()) => info!(path = %pdf.path.display(), "removed unpersisted artifact"),
                Err(e) => {
                    warn!(path = %pdf.path.display(), error = %e, "could not remove artifact");
                    reasons.push(format!("artifact {} not removed: {e}", pdf.path.display()));
                }
            }
        } else {
            reasons.push(format!("artifact left at {}", pdf.path.display()));
        }
        GenerationError::new(Stage::Persist, reasons).for_report(report_id)
    }
}

fn set_meta_report_id(doc: &mut Document, report_id: &str) {
    let id = Value::String(report_id.to_string());
    match doc.section_mut("meta") {
        Some(meta) => {
            meta.insert("report_id".to_string(), id);
        }
        None => {
            doc.insert("meta", json!({ "report_id": id }));
        }
    }
}

/// Image entries are `name: path` or `name: {path, caption}`.
fn image_source(value: &Value) -> Option<String> {
    let path = match value {
        Value::String(path) => path.as_str(),
        Value::Object(entry) => entry.get("path")?.as_str()?,
        _ => return None,
    };
    let path = path.trim();
    (!path.is_empty()).then(|| path.to_string())
}

/// `<dir>/<stem>_<UTC timestamp>.pdf`.
fn timestamped_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%6f");
    path.with_file_name(format!("{stem}_{stamp}.pdf"))
}

fn batch_label(index: usize, request: &GenerateRequest) -> String {
    request
        .output
        .as_deref()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| request.document.report_id().map(str::to_string))
        .unwrap_or_else(|| format!("item {index}"))
}

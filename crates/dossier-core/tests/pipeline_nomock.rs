//! End-to-end pipeline runs against real files and a real database.

use dossier_common::Document;
use dossier_config::{DossierConfig, RetentionConfig};
use dossier_core::{GenerateRequest, PersistenceStatus, ReportEngine, Stage};
use dossier_pdf::{inspect, PdfEncryptor, PdfError};
use dossier_store::ReportStore;
use image::{Rgb, RgbImage};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::path::Path;
use tempfile::TempDir;

fn jane_doe(report_id: &str) -> Value {
    json!({
        "meta": {
            "report_id": report_id,
            "classification": "SECRET",
            "tlp": "AMBER",
            "author": "Field Officer",
            "date": "2024-01-31",
        },
        "target": {
            "name": "Jane Doe",
            "dob": "1990-01-15",
            "nationality": "Testland",
            "status": "Active",
        },
        "summary": "Last seen in ||Berlin||",
    })
}

fn document(value: Value) -> Document {
    Document::from_value(value).unwrap()
}

fn engine(dir: &TempDir) -> ReportEngine {
    let mut config = DossierConfig::default();
    config.paths.output_dir = dir.path().join("output");
    config.paths.processed_images_dir = dir.path().join("output/images");
    config.database.path = dir.path().join("db/dossier.db");
    let store = ReportStore::open(&config.database, RetentionConfig::default()).unwrap();
    ReportEngine::new(config).with_store(store)
}

struct FailingEncryptor;

impl PdfEncryptor for FailingEncryptor {
    fn encrypt(&self, _path: &Path, _password: &str) -> dossier_pdf::Result<()> {
        Err(PdfError::Encryption("encryption backend unavailable".to_string()))
    }
}

#[test]
fn test_jane_doe_end_to_end() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    let request = GenerateRequest::new(document(jane_doe("OP-2024-001"))).with_encryption(false);

    let report = engine.generate(request).unwrap();
    assert_eq!(report.report_id, "OP-2024-001");
    assert_eq!(report.redaction_stats.total_redactions, 1);
    assert_eq!(report.persistence, PersistenceStatus::Created);
    assert_eq!(report.record_version, Some(1));
    assert!(!report.pdf.is_encrypted);

    let bytes = std::fs::read(&report.pdf.path).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    assert_eq!(report.pdf.file_hash, hex::encode(Sha256::digest(&bytes)));

    let store = engine.store().unwrap();
    let record = store.get("OP-2024-001").unwrap().unwrap();
    assert_eq!(record.redaction_count, 1);
    assert_eq!(record.version, 1);
    assert_eq!(record.title, "Dossier: Jane Doe");
    assert_eq!(record.file_hash.as_deref(), Some(report.pdf.file_hash.as_str()));
    assert_eq!(record.custom_metadata["total_redactions"], json!(1));

    let versions = store.versions("OP-2024-001").unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].change_summary.as_deref(), Some("Initial version"));

    let events = store.audit_events(Some("OP-2024-001"), 10).unwrap();
    let generation = events
        .iter()
        .find(|e| e.event_type == "REPORT_GENERATION")
        .expect("generation audited");
    assert_eq!(generation.action, "PDF_CREATED");
    assert_eq!(generation.details["redactions"], json!(1));
    assert_eq!(generation.details["encrypted"], json!(false));
}

#[test]
fn test_regenerating_same_id_keeps_first_record() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    engine
        .generate(GenerateRequest::new(document(jane_doe("OP-1"))))
        .unwrap();

    let mut changed = jane_doe("OP-1");
    changed["summary"] = json!("Now in ||Oslo|| and ||Rome||");
    let second = engine.generate(GenerateRequest::new(document(changed))).unwrap();
    assert_eq!(second.persistence, PersistenceStatus::Existing);
    assert_eq!(second.record_version, Some(1));

    let record = engine.store().unwrap().get("OP-1").unwrap().unwrap();
    assert_eq!(record.redaction_count, 1);
    assert_eq!(record.summary.as_deref(), Some("Last seen in ||Berlin||"));

    // The stored hash still describes the file the record points at.
    let recorded = record.file_path.as_deref().unwrap();
    let on_disk = std::fs::read(recorded).unwrap();
    assert_eq!(
        record.file_hash.as_deref(),
        Some(hex::encode(Sha256::digest(&on_disk)).as_str())
    );
    assert_ne!(second.pdf.path, Path::new(recorded));
    assert!(second.pdf.path.exists());
    assert!(second
        .warnings
        .iter()
        .any(|w| w.contains("belongs to the stored record")));
}

#[test]
fn test_batch_isolates_invalid_item() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    let mut invalid = jane_doe("OP-B2");
    invalid["target"]["dob"] = json!("not a date");
    invalid["meta"]["author"] = json!("");

    let requests = vec![
        GenerateRequest::new(document(jane_doe("OP-B1"))).with_output(dir.path().join("one.pdf")),
        GenerateRequest::new(document(invalid)).with_output(dir.path().join("two.pdf")),
        GenerateRequest::new(document(jane_doe("OP-B3"))).with_output(dir.path().join("three.pdf")),
    ];
    let result = engine.generate_batch(requests);

    assert_eq!(result.total, 3);
    assert_eq!(result.successful, 2);
    assert_eq!(result.failed, 1);
    assert!(!result.all_succeeded());
    assert_eq!(result.generated_files.len(), 2);
    assert!(result.end_time >= result.start_time);

    let failed = &result.items[1];
    assert_eq!(failed.index, 2);
    assert_eq!(failed.label, "two.pdf");
    assert!(!failed.success);
    assert_eq!(failed.stage, Some(Stage::Validation));
    assert!(failed.reasons.len() >= 2, "{:?}", failed.reasons);
    assert!(result.errors[0].starts_with("two.pdf: "));
    assert!(!dir.path().join("two.pdf").exists());
    assert!(dir.path().join("three.pdf").exists());
}

#[test]
fn test_encryption_failure_is_downgraded() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir).with_encryptor(Box::new(FailingEncryptor));
    let request = GenerateRequest::new(document(jane_doe("OP-ENC-FAIL")))
        .with_encryption(true)
        .with_password("CLASSIFIED");

    let report = engine.generate(request).unwrap();
    assert!(!report.pdf.is_encrypted);
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("encryption backend unavailable")));
    assert!(!inspect(&report.pdf.path).unwrap().is_encrypted);

    let record = engine.store().unwrap().get("OP-ENC-FAIL").unwrap().unwrap();
    assert!(!record.is_encrypted);
}

#[test]
fn test_encrypted_report() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    let report = engine
        .generate(GenerateRequest::new(document(jane_doe("OP-ENC"))).with_encryption(true))
        .unwrap();
    assert!(report.pdf.is_encrypted);
    assert!(inspect(&report.pdf.path).unwrap().is_encrypted);
    let record = engine.store().unwrap().get("OP-ENC").unwrap().unwrap();
    assert!(record.is_encrypted);
    assert_eq!(record.page_count as usize, report.pdf.page_count);
}

#[test]
fn test_images_are_sanitized_and_spliced() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    let photo = dir.path().join("photo.png");
    RgbImage::from_pixel(320, 240, Rgb([90, 140, 200]))
        .save(&photo)
        .unwrap();

    let mut value = jane_doe("OP-IMG");
    value["images"] = json!({
        "surveillance_photo": photo.display().to_string(),
        "passport": {"path": "/missing/passport.jpg", "caption": "Passport"},
    });
    let report = engine
        .generate(GenerateRequest::new(document(value)))
        .unwrap();

    assert_eq!(report.images.len(), 1);
    assert_eq!(report.image_failures.len(), 1);
    let processed = &report.images[0].output_path;
    assert!(processed.starts_with(dir.path().join("output/images")));

    let record = engine.store().unwrap().get("OP-IMG").unwrap().unwrap();
    let images = record.payload["images"].as_object().unwrap();
    assert_eq!(
        images["surveillance_photo"],
        json!(processed.display().to_string())
    );
    assert!(!images.contains_key("passport"));

    let bytes = std::fs::read(&report.pdf.path).unwrap();
    assert!(bytes.windows(b"DCTDecode".len()).any(|w| w == b"DCTDecode"));
}

#[test]
fn test_unknown_template_falls_back() {
    let dir = TempDir::new().unwrap();
    let report = engine(&dir)
        .generate(
            GenerateRequest::new(document(jane_doe("OP-T")))
                .with_template("glossy")
                .with_persist(false),
        )
        .unwrap();
    assert!(report.template_fell_back);
    assert_eq!(report.template.as_str(), "dossier");
}

//! End-to-end PDF generation against real files.

use dossier_config::PdfConfig;
use dossier_pdf::{inspect, PdfEncryptor, PdfError, PdfGenerator, PdfOptions};
use image::{Rgb, RgbImage};
use regex::bytes::Regex;
use sha2::{Digest, Sha256};
use std::path::Path;
use tempfile::TempDir;

const MARKUP: &str = r##"<!DOCTYPE html>
<html><head><title>Dossier: Jane Doe</title></head>
<body>
<div class="banner" data-color="#FFCC00">SECRET // TLP:AMBER</div>
<h1>Dossier: Jane Doe</h1>
<p class="control">Document Control Number: DCN-0123456789AB</p>
<h2>INTELLIGENCE SUMMARY</h2>
<p>Last seen in <span class="redacted" data-redaction-length="6">Berlin</span> in late 2023.</p>
<table class="fields">
<tr><td class="head">Name</td><td>Jane Doe</td></tr>
<tr><td class="head">Nationality</td><td>Testland</td></tr>
</table>
<hr>
<p class="footer">SECRET // Generated 2024-02-01 09:30 UTC</p>
</body></html>"##;

fn uncompressed() -> PdfConfig {
    PdfConfig {
        compress: false,
        ..PdfConfig::default()
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

struct FailingEncryptor;

impl PdfEncryptor for FailingEncryptor {
    fn encrypt(&self, _path: &Path, _password: &str) -> dossier_pdf::Result<()> {
        Err(PdfError::Encryption("backend unavailable".to_string()))
    }
}

#[test]
fn test_generate_plain_pdf() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("reports/jane.pdf");
    let generator = PdfGenerator::new(PdfConfig::default(), "redacted");

    let artifact = generator
        .generate(MARKUP, &out, &PdfOptions::default())
        .unwrap();

    let bytes = std::fs::read(&out).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    assert_eq!(artifact.page_count, 1);
    assert_eq!(artifact.file_size, bytes.len() as u64);
    assert_eq!(artifact.file_hash, hex::encode(Sha256::digest(&bytes)));
    assert!(!artifact.is_encrypted);
    assert!(artifact.encryption_error.is_none());

    let doc = lopdf::Document::load(&out).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
}

#[test]
fn test_redacted_text_not_in_file_and_watermark_first() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("w.pdf");
    let generator = PdfGenerator::new(uncompressed(), "redacted");
    let options = PdfOptions {
        watermark: Some("CONFIDENTIAL".to_string()),
        ..PdfOptions::default()
    };
    generator.generate(MARKUP, &out, &options).unwrap();

    let bytes = std::fs::read(&out).unwrap();
    assert!(contains(&bytes, b"Last seen in"));
    assert!(!contains(&bytes, b"Berlin"));
    assert!(contains(&bytes, b"CONFIDENTIAL"));

    let gs = Regex::new(r"/GS1\s+gs").unwrap().find(&bytes).unwrap().start();
    let first_body_text = bytes
        .windows(b"Last seen in".len())
        .position(|w| w == b"Last seen in")
        .unwrap();
    assert!(gs < first_body_text, "watermark must be painted first");

    let opacity = Regex::new(r"/ca\s*0\.15").unwrap();
    assert!(opacity.is_match(&bytes));
}

#[test]
fn test_watermark_on_every_page() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("long.pdf");
    let body: String = (0..150)
        .map(|i| format!("<p>Paragraph number {i} of the narrative.</p>"))
        .collect();
    let generator = PdfGenerator::new(uncompressed(), "redacted");
    let options = PdfOptions {
        watermark: Some("DRAFT".to_string()),
        ..PdfOptions::default()
    };
    let artifact = generator.generate(&body, &out, &options).unwrap();
    assert!(artifact.page_count > 1);

    let bytes = std::fs::read(&out).unwrap();
    let watermarks = bytes.windows(b"(DRAFT)".len()).filter(|w| w == b"(DRAFT)").count();
    assert_eq!(watermarks, artifact.page_count);
    assert_eq!(inspect(&out).unwrap().page_count, artifact.page_count);
}

#[test]
fn test_encrypted_pdf() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("enc.pdf");
    let generator = PdfGenerator::new(uncompressed(), "redacted");
    let options = PdfOptions {
        watermark: None,
        encrypt: true,
        password: Some("CLASSIFIED".to_string()),
    };
    let artifact = generator.generate(MARKUP, &out, &options).unwrap();
    assert!(artifact.is_encrypted);
    assert!(artifact.encryption_error.is_none());

    let bytes = std::fs::read(&out).unwrap();
    assert_eq!(artifact.file_hash, hex::encode(Sha256::digest(&bytes)));
    assert!(!contains(&bytes, b"Last seen in"));
    assert!(Regex::new(r"/Filter\s*/Standard").unwrap().is_match(&bytes));
    assert!(Regex::new(r"/R\s+3").unwrap().is_match(&bytes));
    assert!(Regex::new(r"/Length\s+128").unwrap().is_match(&bytes));

    let info = inspect(&out).unwrap();
    assert!(info.is_encrypted);
    assert_eq!(info.page_count, 1);
    assert_eq!(info.file_size, bytes.len() as u64);
}

#[test]
fn test_encryption_failure_keeps_plain_artifact() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("fail.pdf");
    let generator = PdfGenerator::new(PdfConfig::default(), "redacted")
        .with_encryptor(Box::new(FailingEncryptor));
    let options = PdfOptions {
        watermark: None,
        encrypt: true,
        password: Some("CLASSIFIED".to_string()),
    };
    let artifact = generator.generate(MARKUP, &out, &options).unwrap();
    assert!(!artifact.is_encrypted);
    assert!(artifact
        .encryption_error
        .as_deref()
        .unwrap()
        .contains("backend unavailable"));

    let info = inspect(&out).unwrap();
    assert!(!info.is_encrypted);
    assert_eq!(info.page_count, 1);
    lopdf::Document::load(&out).unwrap();
}

#[test]
fn test_encrypt_without_password_is_downgraded() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("nopw.pdf");
    let options = PdfOptions {
        watermark: None,
        encrypt: true,
        password: None,
    };
    let artifact = PdfGenerator::new(PdfConfig::default(), "redacted")
        .generate(MARKUP, &out, &options)
        .unwrap();
    assert!(!artifact.is_encrypted);
    assert!(artifact.encryption_error.is_some());
}

#[test]
fn test_embeds_images() {
    let dir = TempDir::new().unwrap();
    let img = dir.path().join("photo.jpg");
    RgbImage::from_pixel(600, 300, Rgb([120, 120, 120]))
        .save(&img)
        .unwrap();
    let markup = format!(
        r#"<h2>IMAGERY</h2><img src="{}" alt="Photo"><p class="caption">Photo</p>"#,
        img.display()
    );
    let out = dir.path().join("img.pdf");
    PdfGenerator::new(PdfConfig::default(), "redacted")
        .generate(&markup, &out, &PdfOptions::default())
        .unwrap();
    let bytes = std::fs::read(&out).unwrap();
    assert!(Regex::new(r"/Filter\s*/DCTDecode").unwrap().is_match(&bytes));
}

#[test]
fn test_missing_image_aborts() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("bad.pdf");
    let err = PdfGenerator::new(PdfConfig::default(), "redacted")
        .generate(
            r#"<img src="/definitely/not/here.jpg" alt="x">"#,
            &out,
            &PdfOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(err, PdfError::Image { .. }));
    assert!(!out.exists());
}

#[test]
fn test_inspect_detects_encryption_with_default_config() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("default.pdf");
    let options = PdfOptions {
        watermark: Some("SECRET".to_string()),
        encrypt: true,
        password: Some("CLASSIFIED".to_string()),
    };
    let artifact = PdfGenerator::new(PdfConfig::default(), "redacted")
        .generate(MARKUP, &out, &options)
        .unwrap();
    assert!(artifact.is_encrypted);

    let info = inspect(&out).unwrap();
    assert!(info.is_encrypted);
    assert_eq!(info.page_count, artifact.page_count);
}

#[test]
fn test_encrypted_pdf_opens_with_user_password() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("roundtrip.pdf");
    let options = PdfOptions {
        watermark: None,
        encrypt: true,
        password: Some("CLASSIFIED".to_string()),
    };
    PdfGenerator::new(uncompressed(), "redacted")
        .generate(MARKUP, &out, &options)
        .unwrap();

    let mut wrong = lopdf::Document::load(&out).unwrap();
    assert!(wrong.is_encrypted());
    assert!(wrong.decrypt("classified").is_err());

    let mut doc = lopdf::Document::load(&out).unwrap();
    doc.decrypt("CLASSIFIED").unwrap();
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 1);
    let page_id = *pages.values().next().unwrap();
    let content = doc.get_page_content(page_id).unwrap();
    assert!(contains(&content, b"Last seen in"));
    assert!(!contains(&content, b"Berlin"));
}

//! Report identifiers and output file names.

use dossier_common::Document;
use dossier_config::classification;

/// Class code used when the marking is not in the classification table.
const UNKNOWN_CLASS_CODE: &str = "X";

/// `DOC-<year>-<class code>-<8 hex of the payload hash>`.
///
/// Deterministic for a given payload and year. A missing classification
/// counts as `UNCLASSIFIED`.
pub fn derive_report_id(doc: &Document, year: i32) -> String {
    let code = match doc.classification() {
        None => "U",
        Some(name) => classification(name)
            .map(|c| c.code)
            .unwrap_or(UNKNOWN_CLASS_CODE),
    };
    let hash = doc.content_hash();
    format!("DOC-{year}-{code}-{}", hash[..8].to_ascii_uppercase())
}

/// A file name derived from a report id: anything outside `[A-Za-z0-9_-]`
/// becomes `_`.
pub fn pdf_file_name(report_id: &str) -> String {
    let stem: String = report_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = if stem.is_empty() { "report".to_string() } else { stem };
    format!("{stem}.pdf")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        Document::from_value(value).unwrap()
    }

    #[test]
    fn test_derive_report_id_shape() {
        let d = doc(json!({"meta": {"classification": "secret"}, "summary": "x"}));
        let id = derive_report_id(&d, 2024);
        assert!(id.starts_with("DOC-2024-S-"), "{id}");
        let hex = &id["DOC-2024-S-".len()..];
        assert_eq!(hex.len(), 8);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert_eq!(id, derive_report_id(&d, 2024));
    }

    #[test]
    fn test_derive_report_id_codes() {
        assert!(derive_report_id(&doc(json!({})), 2025).starts_with("DOC-2025-U-"));
        let odd = doc(json!({"meta": {"classification": "COSMIC"}}));
        assert!(derive_report_id(&odd, 2025).starts_with("DOC-2025-X-"));
        let a = doc(json!({"summary": "a"}));
        let b = doc(json!({"summary": "b"}));
        assert_ne!(derive_report_id(&a, 2025), derive_report_id(&b, 2025));
    }

    #[test]
    fn test_pdf_file_name() {
        assert_eq!(pdf_file_name("INT-2024-001"), "INT-2024-001.pdf");
        assert_eq!(pdf_file_name("../etc/passwd"), "___etc_passwd.pdf");
        assert_eq!(pdf_file_name(""), "report.pdf");
    }
}

//! Document-level validation.
//!
//! Sections are checked only when present. Problems accumulate across the
//! whole document so a single pass reports everything the author must fix.

use crate::date::validate_date;
use crate::field::{validate_name, validate_reliability_code};
use dossier_common::alias::{
    self, ADMIRALTY_CODE, EVENT_DESCRIPTION, META_DATE, PLATFORM, TIMELINE_DATE,
};
use dossier_common::document::{LIST_SECTIONS, MAPPING_SECTIONS};
use dossier_common::{Document, ValidationResult};
use dossier_redact::RedactionEngine;
use serde_json::{Map, Value};

const META_REQUIRED: &[&str] = &["classification", "report_id", "author", "tlp"];
const TARGET_REQUIRED: &[&str] = &["name", "status", "dob", "nationality"];

/// Validates whole documents and their individual sections.
#[derive(Debug, Clone, Default)]
pub struct DocumentValidator {
    redaction: RedactionEngine,
}

impl DocumentValidator {
    pub fn new(redaction: RedactionEngine) -> Self {
        Self { redaction }
    }

    /// Validate every present section plus redaction limits on all fields.
    pub fn validate(&self, doc: &Document) -> ValidationResult {
        let mut result = ValidationResult::valid();

        for name in MAPPING_SECTIONS {
            match doc.get(name) {
                None | Some(Value::Object(_)) => {}
                Some(_) => result.add_error(format!("Section '{name}' must be a mapping")),
            }
        }
        for name in LIST_SECTIONS {
            match doc.get(name) {
                None | Some(Value::Array(_)) => {}
                Some(_) => result.add_error(format!("Section '{name}' must be a list")),
            }
        }

        if let Some(meta) = doc.section("meta") {
            result.merge(self.validate_meta(meta));
        }
        if let Some(target) = doc.section("target") {
            result.merge(self.validate_target(target));
        }
        if let Some(entries) = doc.list("digital_footprint") {
            result.merge(self.validate_digital_footprint(entries));
        }
        if let Some(entries) = doc.list("timeline") {
            result.merge(self.validate_timeline(entries));
        }
        if let Some(entries) = doc.list("incidents") {
            result.merge(validate_entries_are_mappings("incidents", entries));
        }

        result.merge(self.redaction.validate_value(&doc.to_value()));
        result
    }

    /// Report metadata: required keys, then author name and date.
    pub fn validate_meta(&self, meta: &Map<String, Value>) -> ValidationResult {
        let mut result = ValidationResult::valid();

        for field in META_REQUIRED {
            if !meta.contains_key(*field) {
                result.add_error(format!("Missing required field: {field}"));
            }
        }
        let date = META_DATE.resolve(meta);
        if date.is_none() {
            result.add_error("Missing required field: date or date_created");
        }
        if !result.is_valid {
            return result;
        }

        if let Some(author) = meta.get("author").and_then(Value::as_str) {
            result.absorb("Author: ", validate_name(author));
        }
        if let Some(date) = date {
            let date_result = validate_date(date);
            if let Some(iso) = date_result.sanitized_str("date") {
                result = result.with_sanitized("date", iso.to_string());
            }
            result.absorb("Date: ", date_result);
        }

        result
    }

    /// Target profile: non-empty required keys, then name and date of birth.
    pub fn validate_target(&self, target: &Map<String, Value>) -> ValidationResult {
        let mut result = ValidationResult::valid();

        for field in TARGET_REQUIRED {
            if alias::first_non_empty(target, &[*field]).is_none() {
                result.add_error(format!("Missing required field: {field}"));
            }
        }

        if let Some(name) = alias::first_non_empty(target, &["name"]) {
            result.absorb("Name: ", validate_name(name));
        }
        if let Some(dob) = alias::first_non_empty(target, &["dob"]) {
            result.absorb("DOB: ", validate_date(dob));
        }

        result
    }

    /// Online identities: platform required, reliability code checked when given.
    pub fn validate_digital_footprint(&self, entries: &[Value]) -> ValidationResult {
        let mut result = ValidationResult::valid();

        for (idx, entry) in entries.iter().enumerate() {
            let Some(entry) = entry.as_object() else {
                result.add_error(format!("Entry {idx}: must be a mapping"));
                continue;
            };
            if PLATFORM.resolve(entry).is_none() {
                result.add_error(format!("Entry {idx}: Missing {}", PLATFORM.label));
            }
            if let Some(code) = ADMIRALTY_CODE.resolve(entry) {
                result.absorb(&format!("Entry {idx}: "), validate_reliability_code(code));
            }
        }

        result
    }

    /// Chronology: each event needs a valid date; a missing description warns.
    pub fn validate_timeline(&self, entries: &[Value]) -> ValidationResult {
        let mut result = ValidationResult::valid();

        for (idx, entry) in entries.iter().enumerate() {
            let Some(entry) = entry.as_object() else {
                result.add_error(format!("Event {idx}: must be a mapping"));
                continue;
            };
            match TIMELINE_DATE.resolve(entry) {
                Some(date) => result.absorb(&format!("Event {idx}: "), validate_date(date)),
                None => result.add_error(format!("Event {idx}: Missing {}", TIMELINE_DATE.label)),
            }
            if EVENT_DESCRIPTION.resolve(entry).is_none() {
                result.add_warning(format!(
                    "Event {idx}: Missing {}",
                    EVENT_DESCRIPTION.label
                ));
            }
        }

        result
    }
}

fn validate_entries_are_mappings(section: &str, entries: &[Value]) -> ValidationResult {
    let mut result = ValidationResult::valid();
    for (idx, entry) in entries.iter().enumerate() {
        if !entry.is_object() {
            result.add_error(format!("{section} entry {idx}: must be a mapping"));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        Document::from_value(v).unwrap()
    }

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_meta_missing_fields_listed() {
        let v = DocumentValidator::default();
        let r = v.validate_meta(&map(json!({"classification": "SECRET"})));
        assert_eq!(
            r.errors,
            vec![
                "Missing required field: report_id",
                "Missing required field: author",
                "Missing required field: tlp",
                "Missing required field: date or date_created",
            ]
        );
    }

    #[test]
    fn test_meta_date_created_alias() {
        let v = DocumentValidator::default();
        let r = v.validate_meta(&map(json!({
            "classification": "SECRET",
            "report_id": "R-1",
            "author": "Agent Smith",
            "tlp": "AMBER",
            "date_created": "31.01.2024"
        })));
        assert!(r.is_valid, "{:?}", r.errors);
        assert_eq!(r.sanitized_str("date"), Some("2024-01-31"));
    }

    #[test]
    fn test_meta_author_checked_once_present() {
        let v = DocumentValidator::default();
        let r = v.validate_meta(&map(json!({
            "classification": "SECRET",
            "report_id": "R-1",
            "author": "4g3nt",
            "tlp": "AMBER",
            "date": "2024-01-31"
        })));
        assert_eq!(r.errors, vec!["Author: Name contains invalid characters"]);
    }

    #[test]
    fn test_meta_date_errors_are_prefixed() {
        let v = DocumentValidator::default();
        let r = v.validate_meta(&map(json!({
            "classification": "SECRET",
            "report_id": "R-1",
            "author": "Agent Smith",
            "tlp": "AMBER",
            "date": "sometime"
        })));
        assert_eq!(r.errors.len(), 1);
        assert!(r.errors[0].starts_with("Date: Invalid date format"), "{:?}", r.errors);
    }

    #[test]
    fn test_target_empty_values_are_missing() {
        let v = DocumentValidator::default();
        let r = v.validate_target(&map(json!({
            "name": "Jane Doe",
            "status": "  ",
            "dob": "1990-01-15",
            "nationality": "Testland"
        })));
        assert_eq!(r.errors, vec!["Missing required field: status"]);
    }

    #[test]
    fn test_footprint_aliases() {
        let v = DocumentValidator::default();
        let r = v.validate_digital_footprint(&[
            json!({"platform": "Telegram", "admiralty_code": "b2"}),
            json!({"Admiralty Code": "Z9"}),
            json!("not a mapping"),
        ]);
        assert_eq!(r.errors.len(), 3);
        assert_eq!(r.errors[0], "Entry 1: Missing Platform");
        assert!(r.errors[1].starts_with("Entry 1: Invalid Admiralty code: Z9"));
        assert_eq!(r.errors[2], "Entry 2: must be a mapping");
    }

    #[test]
    fn test_timeline_missing_description_warns() {
        let v = DocumentValidator::default();
        let r = v.validate_timeline(&[json!({"Date": "2020-05-01"}), json!({"event": "x"})]);
        assert_eq!(r.errors, vec!["Event 1: Missing Date"]);
        assert_eq!(r.warnings, vec!["Event 0: Missing Event Description"]);
    }

    #[test]
    fn test_document_accumulates_across_sections() {
        let v = DocumentValidator::default();
        let r = v.validate(&doc(json!({
            "meta": {"classification": "SECRET"},
            "target": {"name": "Jane Doe"},
            "timeline": [{"Date": "not a date", "Event Description": "x"}],
            "digital_footprint": {"oops": true}
        })));
        assert!(!r.is_valid);
        assert!(r.errors.contains(&"Section 'digital_footprint' must be a list".to_string()));
        assert!(r.errors.contains(&"Missing required field: author".to_string()));
        assert!(r.errors.contains(&"Missing required field: dob".to_string()));
        assert!(r.errors.iter().any(|e| e.starts_with("Event 0: Invalid date format")));
    }

    #[test]
    fn test_minimal_document_without_meta_is_valid() {
        let v = DocumentValidator::default();
        let r = v.validate(&doc(json!({
            "target": {
                "name": "Jane Doe",
                "status": "Active",
                "dob": "1990-01-15",
                "nationality": "Testland"
            },
            "summary": "Last seen in ||Berlin||"
        })));
        assert!(r.is_valid, "{:?}", r.errors);
    }
}

//! Flattened view model handed to templates.
//!
//! Templates never walk the raw payload. Everything they print is reduced to
//! label/value strings here, in presentation order, with redaction markers
//! still intact so the `redact` filter can mark them at render time.

use dossier_common::alias::{
    self, ADMIRALTY_CODE, EVENT_DESCRIPTION, IDENTITY, META_DATE, PLATFORM, TIMELINE_DATE,
    TIMELINE_TIME,
};
use crate::markings::Markings;
use dossier_common::document::{LIST_SECTIONS, MAPPING_SECTIONS};
use dossier_common::Document;
use dossier_config::tables::{self, UNKNOWN_COLOR};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// One printed label/value pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldView {
    pub label: String,
    pub value: String,
}

/// A titled group of fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionView {
    pub key: String,
    pub title: String,
    pub fields: Vec<FieldView>,
}

/// A titled grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub key: String,
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// An embedded image reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageView {
    pub src: String,
    pub caption: String,
}

/// Everything a template needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DossierView {
    pub title: String,
    pub report_id: String,
    pub control_number: String,
    pub classification: String,
    pub classification_color: String,
    pub tlp: String,
    pub tlp_color: String,
    /// `CLASSIFICATION // TLP:LEVEL`
    pub banner: String,
    pub meta: Vec<FieldView>,
    pub summary: String,
    pub sections: Vec<SectionView>,
    pub tables: Vec<TableView>,
    pub images: Vec<ImageView>,
    pub markings: Markings,
}

/// `DCN-` followed by the first 12 hex digits of SHA-256(report_id), upper-cased.
pub fn control_number(report_id: &str) -> String {
    let digest = hex::encode(Sha256::digest(report_id.as_bytes()));
    format!("DCN-{}", digest[..12].to_uppercase())
}

const TARGET_ORDER: &[&str] = &["name", "alias", "dob", "nationality", "status"];
const META_ORDER: &[&str] = &["report_id", "classification", "tlp", "author", "organization"];

impl DossierView {
    pub fn from_document(doc: &Document) -> Self {
        let meta = doc.section("meta");
        let meta_str = |key: &str| {
            meta.and_then(|m| alias::first_non_empty(m, &[key]))
                .map(str::to_string)
        };

        let report_id = doc.report_id().unwrap_or("UNASSIGNED").to_string();
        let classification = doc.classification().unwrap_or("UNCLASSIFIED").to_string();
        let tlp = meta_str("tlp").unwrap_or_else(|| "WHITE".to_string());

        let classification_color = tables::classification(&classification)
            .map_or(UNKNOWN_COLOR, |c| c.color)
            .to_string();
        let tlp_color = tables::tlp(&tlp)
            .map_or(UNKNOWN_COLOR, |t| t.color)
            .to_string();

        let title = meta_str("title").unwrap_or_else(|| match doc.target_name() {
            Some(name) => format!("Dossier: {name}"),
            None => "Intelligence Report".to_string(),
        });

        let mut meta_fields = Vec::new();
        if let Some(m) = meta {
            meta_fields = ordered_fields(m, META_ORDER, &["title"]);
            if let Some(date) = META_DATE.resolve(m) {
                // Both spellings collapse into one printed row.
                meta_fields.retain(|f| f.label != "Date" && f.label != "Date Created");
                meta_fields.push(FieldView {
                    label: "Date".to_string(),
                    value: date.to_string(),
                });
            }
        }

        let mut sections = Vec::new();
        let mut tables = Vec::new();

        for key in MAPPING_SECTIONS.iter().filter(|k| !matches!(**k, "meta" | "images")) {
            if let Some(map) = doc.section(key) {
                let order: &[&str] = if *key == "target" { TARGET_ORDER } else { &[] };
                let fields = ordered_fields(map, order, &[]);
                if !fields.is_empty() {
                    sections.push(SectionView {
                        key: key.to_string(),
                        title: section_title(key),
                        fields,
                    });
                }
            }
        }

        if let Some(entries) = doc.list("digital_footprint") {
            tables.push(footprint_table(entries));
        }
        if let Some(entries) = doc.list("timeline") {
            tables.push(timeline_table(entries));
        }
        if let Some(entries) = doc.list("incidents") {
            for (idx, entry) in entries.iter().enumerate() {
                if let Some(map) = entry.as_object() {
                    sections.push(SectionView {
                        key: format!("incidents[{idx}]"),
                        title: format!("Incident {}", idx + 1),
                        fields: ordered_fields(map, &[], &[]),
                    });
                }
            }
        }

        // Sections outside the known set still print, so no marked span is lost.
        for (key, value) in doc.as_map() {
            let known = MAPPING_SECTIONS.contains(&key.as_str())
                || LIST_SECTIONS.contains(&key.as_str())
                || alias::SUMMARY.keys.contains(&key.as_str());
            if known {
                continue;
            }
            let fields = match value {
                Value::Object(map) => ordered_fields(map, &[], &[]),
                other => vec![FieldView {
                    label: humanize(key),
                    value: value_text(other),
                }],
            };
            if !fields.is_empty() {
                sections.push(SectionView {
                    key: key.clone(),
                    title: section_title(key),
                    fields,
                });
            }
        }

        Self {
            control_number: control_number(&report_id),
            banner: format!("{} // TLP:{}", classification, tlp.to_uppercase()),
            title,
            report_id,
            classification,
            classification_color,
            tlp,
            tlp_color,
            meta: meta_fields,
            summary: doc.summary().unwrap_or_default().to_string(),
            sections,
            tables,
            images: doc.section("images").map(image_views).unwrap_or_default(),
            markings: Markings::from_document(doc),
        }
    }
}

/// Fields in `order` first, then the rest in payload order, minus `skip`.
fn ordered_fields(map: &Map<String, Value>, order: &[&str], skip: &[&str]) -> Vec<FieldView> {
    let mut fields = Vec::new();
    for key in order {
        if let Some(value) = map.get(*key) {
            fields.push(field(key, value));
        }
    }
    for (key, value) in map {
        if order.contains(&key.as_str()) || skip.contains(&key.as_str()) {
            continue;
        }
        fields.push(field(key, value));
    }
    fields
}

fn field(key: &str, value: &Value) -> FieldView {
    FieldView {
        label: humanize(key),
        value: value_text(value),
    }
}

fn footprint_table(entries: &[Value]) -> TableView {
    let rows = entries
        .iter()
        .filter_map(Value::as_object)
        .map(|entry| {
            let code = ADMIRALTY_CODE.resolve(entry).unwrap_or_default();
            let grade = tables::reliability(code)
                .map(|r| format!("{} / {}", r.source, r.information))
                .unwrap_or_default();
            vec![
                PLATFORM.resolve(entry).unwrap_or_default().to_string(),
                IDENTITY.resolve(entry).unwrap_or_default().to_string(),
                code.to_uppercase(),
                grade,
            ]
        })
        .collect();
    TableView {
        key: "digital_footprint".to_string(),
        title: section_title("digital_footprint"),
        columns: ["Platform", "Username/IP", "Admiralty Code", "Reliability"]
            .map(String::from)
            .to_vec(),
        rows,
    }
}

fn timeline_table(entries: &[Value]) -> TableView {
    let rows = entries
        .iter()
        .filter_map(Value::as_object)
        .map(|entry| {
            [TIMELINE_DATE, TIMELINE_TIME, EVENT_DESCRIPTION]
                .iter()
                .map(|a| a.resolve(entry).unwrap_or_default().to_string())
                .collect()
        })
        .collect();
    TableView {
        key: "timeline".to_string(),
        title: section_title("timeline"),
        columns: ["Date", "Time", "Event"].map(String::from).to_vec(),
        rows,
    }
}

/// Image entries are either `caption: path` or `caption: {path, caption}`.
fn image_views(map: &Map<String, Value>) -> Vec<ImageView> {
    map.iter()
        .filter_map(|(key, value)| {
            let (src, caption) = match value {
                Value::String(path) => (path.clone(), humanize(key)),
                Value::Object(obj) => (
                    alias::first_non_empty(obj, &["path", "processed_path"])?.to_string(),
                    alias::first_non_empty(obj, &["caption"])
                        .map(str::to_string)
                        .unwrap_or_else(|| humanize(key)),
                ),
                _ => return None,
            };
            (!src.trim().is_empty()).then_some(ImageView { src, caption })
        })
        .collect()
}

/// Flatten any JSON value to one printable line.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => (if *b { "Yes" } else { "No" }).to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", humanize(k), value_text(v)))
            .collect::<Vec<_>>()
            .join("; "),
    }
}

fn section_title(key: &str) -> String {
    match key {
        "target" => "Target Profile".to_string(),
        "biometrics" => "Biometrics".to_string(),
        "osint" => "Open Source Intelligence (OSINT)".to_string(),
        "sigint" => "Signals Intelligence (SIGINT)".to_string(),
        "humint" => "Human Intelligence (HUMINT)".to_string(),
        "financial" => "Financial Intelligence".to_string(),
        "connections" => "Known Associates".to_string(),
        "recommendations" => "Recommendations".to_string(),
        "digital_footprint" => "Digital Footprint".to_string(),
        "timeline" => "Timeline of Events".to_string(),
        other => humanize(other),
    }
}

/// `date_of_birth` → `Date Of Birth`; already-capitalized keys pass through.
fn humanize(key: &str) -> String {
    match key {
        "dob" => return "Date of Birth".to_string(),
        "tlp" => return "TLP".to_string(),
        "report_id" => return "Report ID".to_string(),
        _ => {}
    }
    key.split(['_', '-'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

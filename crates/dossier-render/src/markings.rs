//! Handling and assessment blocks derived from report metadata.
//!
//! Everything here is a pure function of the document: the same payload
//! always produces the same statements, so re-rendering a stored report is
//! reproducible. Values copied out of the payload keep their redaction
//! markers; templates pass every line through the `redact` filter.

use chrono::{Months, NaiveDate};
use dossier_common::alias::{self, META_DATE};
use dossier_common::Document;
use dossier_config::tables;
use serde::Serialize;
use serde_json::Value;

const DEFAULT_RECIPIENTS: u64 = 5;
const DEFAULT_SOURCES: &str = "OSINT, SIGINT, HUMINT";
const DEFAULT_CONFIDENCE: &str = "HIGH";
const DEFAULT_THREAT: &str = "MEDIUM";
const DEFAULT_THREAT_RATING: u64 = 5;
const DECLASSIFY_AFTER_YEARS: u32 = 10;

pub const LEGAL_NOTICE: &[&str] = &[
    "This document contains classified information. Unauthorized disclosure is prohibited \
     and may result in criminal prosecution.",
    "Recipients are responsible for safeguarding this material in accordance with \
     established security protocols. Report any suspected unauthorized disclosure to your \
     security officer.",
    "PRIVACY ACT STATEMENT: This document may contain personally identifiable information. \
     Unauthorized use or disclosure may subject violators to civil and criminal penalties.",
];

/// One labelled line of a statement block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub label: String,
    pub text: String,
}

fn line(label: &str, text: impl Into<String>) -> Line {
    Line {
        label: label.to_string(),
        text: text.into(),
    }
}

/// Threat summary for the target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreatAssessment {
    pub level: String,
    pub rating: String,
    pub priority: String,
    pub description: String,
    pub response_time: String,
    pub recommended_action: String,
}

/// Intelligence markings printed around the report body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Markings {
    /// `CLASSIFICATION // HANDLING`
    pub handling: String,
    pub caveat: String,
    pub tlp_description: String,
    pub declassification: Vec<Line>,
    pub distribution: Vec<Line>,
    pub sources: Vec<Line>,
    pub threat: ThreatAssessment,
    /// Generated only when the payload has no summary of its own.
    pub executive_summary: Vec<String>,
    pub analyst: Vec<Line>,
    pub legal_notice: Vec<String>,
}

impl Markings {
    pub fn from_document(doc: &Document) -> Self {
        let meta = doc.section("meta");
        let meta_str = |key: &str| meta.and_then(|m| alias::first_non_empty(m, &[key]));
        let classification = doc.classification().unwrap_or("UNCLASSIFIED");
        let level = tables::classification(classification);
        let tlp = meta_str("tlp").unwrap_or("WHITE");

        let handling = match level {
            Some(l) => format!("{} // {}", classification.trim().to_uppercase(), l.handling),
            None => classification.trim().to_uppercase(),
        };

        let recipients = meta
            .and_then(|m| m.get("distribution_recipients"))
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_RECIPIENTS);

        let threat = threat_assessment(doc);
        let executive_summary = if doc.summary().is_some_and(|s| !s.trim().is_empty()) {
            Vec::new()
        } else {
            executive_summary(doc.target_name().unwrap_or("Unknown Subject"), &threat.level)
        };

        Self {
            handling,
            caveat: level
                .map_or("Handle in accordance with originator instructions", |l| l.caveat)
                .to_string(),
            tlp_description: tables::tlp(tlp)
                .map_or("Sharing terms set by the originator", |t| t.description)
                .to_string(),
            declassification: declassification(
                classification,
                meta.and_then(|m| META_DATE.resolve(m)),
            ),
            distribution: distribution(classification, recipients),
            sources: source_statement(
                meta_str("source_channels").unwrap_or(DEFAULT_SOURCES),
                meta_str("confidence").unwrap_or(DEFAULT_CONFIDENCE),
            ),
            threat,
            executive_summary,
            analyst: analyst(doc),
            legal_notice: LEGAL_NOTICE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Declassification instructions, dated ten years after the report date.
pub fn declassification(classification: &str, report_date: Option<&str>) -> Vec<Line> {
    if classification.trim().eq_ignore_ascii_case("UNCLASSIFIED") {
        return vec![line("Declassification", "PUBLIC RELEASE AUTHORIZED")];
    }
    let on = report_date
        .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
        .and_then(|d| d.checked_add_months(Months::new(12 * DECLASSIFY_AFTER_YEARS)))
        .map(|d| d.format("%d %B %Y").to_string())
        .unwrap_or_else(|| format!("{DECLASSIFY_AFTER_YEARS} years from date of origin"));
    vec![
        line("Declassification", format!("Declassify on {on}")),
        line("Authority", "Executive Order 13526, Section 1.4"),
        line("Review", "Subject to automatic declassification review"),
    ]
}

pub fn distribution(classification: &str, recipients: u64) -> Vec<Line> {
    let level = tables::classification(classification).map_or(0, |c| c.level);
    match level {
        4..=u8::MAX => vec![
            line("Distribution", format!("Limited to {recipients} authorized recipients")),
            line("Handling", "ORCON - no further dissemination without originator approval"),
            line("Reproduction", "Prohibited without express written authorization"),
            line("Destruction", "Classified waste procedures"),
        ],
        3 => vec![
            line(
                "Distribution",
                format!("Limited to {recipients} authorized personnel with appropriate clearance"),
            ),
            line("Handling", "NOFORN - not releasable to foreign nationals"),
            line("Reproduction", "Authorized for official use only"),
            line("Destruction", "Shred or burn per security protocols"),
        ],
        _ => vec![
            line("Distribution", "Authorized personnel with need-to-know"),
            line("Handling", "For Official Use Only (FOUO)"),
            line("Reproduction", "Permitted for official purposes"),
        ],
    }
}

/// `channels` is a comma-separated list of discipline abbreviations.
pub fn source_statement(channels: &str, confidence: &str) -> Vec<Line> {
    let described = channels
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| match tables::source_type(c) {
            Some(name) => format!("{} ({name})", c.to_uppercase()),
            None => c.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ");
    vec![
        line("Source Channels", described),
        line("Assessment Confidence", confidence.trim().to_uppercase()),
        line(
            "Reliability",
            tables::confidence(confidence).unwrap_or("Information from undisclosed sources"),
        ),
    ]
}

/// Unknown levels are assessed as LOW; ratings are clamped to 0..=10.
pub fn threat_assessment(doc: &Document) -> ThreatAssessment {
    let target = doc.section("target");
    let named = target
        .and_then(|t| alias::first_non_empty(t, &["threat_level"]))
        .unwrap_or(DEFAULT_THREAT);
    let level = tables::threat_level(named)
        .or_else(|| tables::threat_level("LOW"))
        .copied();
    let rating = target
        .and_then(|t| t.get("threat_rating"))
        .and_then(|v| v.as_u64().or_else(|| v.as_str()?.trim().parse().ok()))
        .unwrap_or(DEFAULT_THREAT_RATING)
        .min(10);

    match level {
        Some(l) => ThreatAssessment {
            level: l.name.to_string(),
            rating: format!("{rating}/10"),
            priority: l.priority.to_string(),
            description: l.description.to_string(),
            response_time: l.response_time.to_string(),
            recommended_action: l.action.to_string(),
        },
        None => ThreatAssessment {
            level: named.to_uppercase(),
            rating: format!("{rating}/10"),
            priority: String::new(),
            description: String::new(),
            response_time: String::new(),
            recommended_action: "Assess and monitor".to_string(),
        },
    }
}

fn executive_summary(subject: &str, threat_level: &str) -> Vec<String> {
    vec![
        format!(
            "Subject {subject} represents a {threat_level} threat. Assessment is based on \
             multi-source collection."
        ),
        "Continued monitoring and collection are recommended to maintain situational \
         awareness."
            .to_string(),
    ]
}

fn analyst(doc: &Document) -> Vec<Line> {
    let meta = doc.section("meta");
    let mut lines = vec![line(
        "Prepared By",
        doc.author().unwrap_or("Intelligence Analyst"),
    )];
    if let Some(date) = meta.and_then(|m| META_DATE.resolve(m)) {
        lines.push(line("Assessment Date", date));
    }
    let assessment = doc
        .get("analyst_assessment")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(
            "This assessment is based on currently available intelligence and may be revised \
             as additional information becomes available.",
        );
    lines.push(line("Assessment", assessment));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        Document::from_value(v).unwrap()
    }

    fn text<'a>(lines: &'a [Line], label: &str) -> &'a str {
        lines
            .iter()
            .find(|l| l.label == label)
            .map(|l| l.text.as_str())
            .unwrap_or_default()
    }

    #[test]
    fn test_declassification_date_from_report_date() {
        let lines = declassification("SECRET", Some("2024-01-31"));
        assert_eq!(text(&lines, "Declassification"), "Declassify on 31 January 2034");
        let undated = declassification("SECRET", Some("sometime"));
        assert!(text(&undated, "Declassification").contains("10 years from date of origin"));
        assert_eq!(
            declassification("unclassified", None),
            vec![line("Declassification", "PUBLIC RELEASE AUTHORIZED")]
        );
    }

    #[test]
    fn test_distribution_tightens_with_level() {
        assert!(text(&distribution("TOP SECRET", 3), "Distribution").contains("3 authorized"));
        assert!(text(&distribution("SECRET", 5), "Handling").starts_with("NOFORN"));
        assert_eq!(distribution("COSMIC", 5).len(), 3);
    }

    #[test]
    fn test_source_statement_expands_disciplines() {
        let lines = source_statement("osint, SIGINT, rumor mill", "moderate");
        assert_eq!(
            text(&lines, "Source Channels"),
            "OSINT (Open Source Intelligence), SIGINT (Signals Intelligence), rumor mill"
        );
        assert_eq!(text(&lines, "Assessment Confidence"), "MODERATE");
    }

    #[test]
    fn test_threat_defaults_and_fallback() {
        let t = threat_assessment(&doc(json!({})));
        assert_eq!((t.level.as_str(), t.rating.as_str()), ("MEDIUM", "5/10"));

        let t = threat_assessment(&doc(json!({"target": {
            "threat_level": "apocalyptic", "threat_rating": "42"
        }})));
        assert_eq!(t.level, "LOW");
        assert_eq!(t.rating, "10/10");
        assert_eq!(t.priority, "P4");
    }

    #[test]
    fn test_executive_summary_only_without_payload_summary() {
        let with = Markings::from_document(&doc(json!({"summary": "Known courier."})));
        assert!(with.executive_summary.is_empty());

        let without = Markings::from_document(&doc(json!({
            "target": {"name": "||Jane Doe||", "threat_level": "HIGH"}
        })));
        assert!(without.executive_summary[0].starts_with("Subject ||Jane Doe|| represents a HIGH"));
    }

    #[test]
    fn test_markings_are_deterministic() {
        let payload = json!({"meta": {
            "classification": "SECRET", "tlp": "AMBER", "author": "Field Officer",
            "date": "2024-01-31", "report_id": "OP-1"
        }});
        let a = Markings::from_document(&doc(payload.clone()));
        assert_eq!(a, Markings::from_document(&doc(payload)));
        assert_eq!(a.handling, "SECRET // NOFORN");
        assert!(a.tlp_description.starts_with("Limited sharing"));
        assert_eq!(text(&a.analyst, "Prepared By"), "Field Officer");
        assert_eq!(a.legal_notice.len(), LEGAL_NOTICE.len());
    }
}

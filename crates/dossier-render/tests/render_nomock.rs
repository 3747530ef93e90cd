//! Rendering tests over real templates and documents.

use chrono::{TimeZone, Utc};
use dossier_common::Document;
use dossier_config::TemplateConfig;
use dossier_redact::RedactionPolicy;
use dossier_render::{control_number, RenderError, TemplateName, TemplateRenderer};

const JANE_DOE: &str = r#"
meta:
  report_id: OP-2024-001
  classification: SECRET
  tlp: AMBER
  author: Field Officer
  date: "2024-01-31"
summary: Subject relocated to ||Berlin|| in late 2023.
target:
  name: Jane Doe
  dob: "1990-01-15"
  nationality: "||German||"
digital_footprint:
  - Platform: Twitter
    Username: "@jdoe"
    Admiralty Code: B2
timeline:
  - Date: "2024-01-10"
    Time: "14:30"
    Event Description: Met ||Source A|| at cafe
humint:
  source: "||ASSET-7||"
custom_notes:
  handler: "||Case Officer K||"
"#;

fn renderer() -> TemplateRenderer {
    TemplateRenderer::new(&TemplateConfig::default(), &RedactionPolicy::default())
}

fn jane_doe() -> Document {
    Document::from_yaml_str(JANE_DOE).expect("fixture parses")
}

#[test]
fn test_summary_span_is_marked() {
    let report = renderer().render(&jane_doe(), None).unwrap();
    assert_eq!(report.template, TemplateName::Dossier);
    assert!(!report.fell_back);
    assert!(report
        .html
        .contains(r#"<span class="redacted" data-redaction-length="6">Berlin</span>"#));
    assert!(!report.html.contains("||"));
}

#[test]
fn test_markers_in_every_section_are_marked() {
    let html = renderer().render(&jane_doe(), None).unwrap().html;
    for (content, len) in [
        ("German", 6),
        ("Source A", 8),
        ("ASSET-7", 7),
        ("Case Officer K", 14),
    ] {
        let expected =
            format!(r#"<span class="redacted" data-redaction-length="{len}">{content}</span>"#);
        assert!(html.contains(&expected), "missing {expected}");
    }
}

#[test]
fn test_payload_markup_is_escaped() {
    let doc = Document::from_yaml_str(
        r#"
target:
  name: "<script>alert(1)</script>"
"#,
    )
    .unwrap();
    let html = renderer().render(&doc, None).unwrap().html;
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;"));
}

#[test]
fn test_unknown_template_falls_back_to_default() {
    let r = TemplateRenderer::new(
        &TemplateConfig {
            default_template: "scroll".to_string(),
        },
        &RedactionPolicy::default(),
    );
    let report = r.render(&jane_doe(), Some("nonexistent")).unwrap();
    assert_eq!(report.template, TemplateName::Scroll);
    assert!(report.fell_back);
}

#[test]
fn test_unknown_default_template_errors() {
    let r = TemplateRenderer::new(
        &TemplateConfig {
            default_template: "missing".to_string(),
        },
        &RedactionPolicy::default(),
    );
    let err = r.render(&jane_doe(), None).unwrap_err();
    assert!(matches!(err, RenderError::UnknownDefaultTemplate(_)));
}

#[test]
fn test_scroll_template_renders_sections() {
    let report = renderer().render(&jane_doe(), Some("scroll")).unwrap();
    assert_eq!(report.template, TemplateName::Scroll);
    assert!(report.html.contains("SECRET // TLP:AMBER"));
    assert!(report
        .html
        .contains(r#"<span class="redacted" data-redaction-length="7">ASSET-7</span>"#));
}

#[test]
fn test_markings_and_timestamp() {
    let at = Utc.with_ymd_and_hms(2024, 2, 1, 9, 30, 0).unwrap();
    let report = renderer().render_at(&jane_doe(), None, at).unwrap();
    assert_eq!(report.control_number, control_number("OP-2024-001"));
    assert!(report.html.contains(&report.control_number));
    assert!(report.html.contains("SECRET // TLP:AMBER"));
    assert!(report.html.contains("2024-02-01 09:30 UTC"));
    assert_eq!(report.title, "Dossier: Jane Doe");
}

#[test]
fn test_custom_css_class() {
    let policy = RedactionPolicy {
        css_class: "blackout".to_string(),
        ..RedactionPolicy::default()
    };
    let r = TemplateRenderer::new(&TemplateConfig::default(), &policy);
    let html = r.render(&jane_doe(), None).unwrap().html;
    assert!(html.contains(r#"<span class="blackout" data-redaction-length="6">Berlin</span>"#));
}

#[test]
fn test_markers_in_markings_never_leak() {
    let doc = Document::from_yaml_str(
        r#"
meta:
  report_id: "OP-||7731||"
  title: "Op ||Nightfall||"
  classification: "||SECRET||"
  tlp: "||amber||"
images:
  courier:
    path: /tmp/courier.jpg
    caption: "Courier at ||Gate 4||"
"#,
    )
    .unwrap();
    for template in ["dossier", "scroll"] {
        let html = renderer().render(&doc, Some(template)).unwrap().html;
        assert!(!html.contains("||"), "{template} leaked a marker");
        assert!(!html.contains("Nightfall</title>"));
        assert!(!html.contains("alt=\"Courier at Gate 4\""));
        assert!(html.contains(r#"<span class="redacted" data-redaction-length="6">SECRET</span>"#));
        assert!(html.contains(r#"<span class="redacted" data-redaction-length="5">AMBER</span>"#));
    }
}

#[test]
fn test_handling_blocks_follow_metadata() {
    let at = Utc.with_ymd_and_hms(2024, 2, 1, 9, 30, 0).unwrap();
    for template in ["dossier", "scroll"] {
        let html = renderer()
            .render_at(&jane_doe(), Some(template), at)
            .unwrap()
            .html;
        assert!(html.contains("SECRET // NOFORN"), "{template}");
        assert!(html.contains("Declassify on 31 January 2034"), "{template}");
        assert!(html.contains("NOFORN - not releasable to foreign nationals"), "{template}");
        assert!(html.contains("OSINT (Open Source Intelligence)"), "{template}");
        assert!(html.contains("Field Officer"), "{template}");
        assert!(html.contains("PRIVACY ACT STATEMENT"), "{template}");
        // The payload has its own summary, so none is generated.
        assert!(!html.contains("represents a MEDIUM threat"), "{template}");
    }
}

#[test]
fn test_generated_summary_marks_subject() {
    let doc = Document::from_yaml_str(
        r#"
meta:
  classification: TOP SECRET
target:
  name: "||Jane Doe||"
  threat_level: critical
  threat_rating: 9
"#,
    )
    .unwrap();
    let html = renderer().render(&doc, None).unwrap().html;
    assert!(html.contains("EXECUTIVE SUMMARY"));
    assert!(html.contains(
        r#"Subject <span class="redacted" data-redaction-length="8">Jane Doe</span> represents a CRITICAL threat"#
    ));
    assert!(html.contains("9/10"));
    assert!(html.contains("Limited to 5 authorized recipients"));
    assert!(!html.contains("||"));
}

//! Main redaction engine.
//!
//! The engine is stateless apart from its policy, so one instance can be
//! shared by the validator, the template renderer and the orchestrator.

use crate::marker::{count_spans, find_spans, rewrite};
use crate::{RedactionPolicy, RedactionStats};
use dossier_common::{Document, ValidationResult};
use serde_json::Value;
use std::ops::Range;

const MASK_CHAR: char = '\u{2588}';

/// Marks, counts and validates redaction spans.
#[derive(Debug, Clone, Default)]
pub struct RedactionEngine {
    policy: RedactionPolicy,
}

impl RedactionEngine {
    pub fn new(policy: RedactionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RedactionPolicy {
        &self.policy
    }

    /// Replace each span with a tagged wrapper carrying its length.
    ///
    /// Text is copied as-is; use [`apply_html`](Self::apply_html) when the
    /// result is embedded in markup.
    pub fn apply(&self, text: &str) -> String {
        rewrite(text, |content| self.wrap(content, content), str::to_string)
    }

    /// Like [`apply`](Self::apply), but HTML-escapes all literal text first.
    pub fn apply_html(&self, text: &str) -> String {
        rewrite(
            text,
            |content| self.wrap(content, &escape_html(content)),
            escape_html,
        )
    }

    fn wrap(&self, raw: &str, body: &str) -> String {
        format!(
            r#"<span class="{}" data-redaction-length="{}">{}</span>"#,
            self.policy.css_class,
            raw.chars().count(),
            body
        )
    }

    /// Replace each span with a run of block characters of the same length.
    ///
    /// For places that cannot carry markup, like a document title or an
    /// attribute value.
    pub fn mask(&self, text: &str) -> String {
        rewrite(
            text,
            |content| MASK_CHAR.to_string().repeat(content.chars().count()),
            str::to_string,
        )
    }

    /// Number of well-formed spans in one string.
    pub fn count(&self, text: &str) -> usize {
        count_spans(text)
    }

    /// Byte ranges of each span's content, for layouts that draw their own bars.
    pub fn spans(&self, text: &str) -> Vec<Range<usize>> {
        find_spans(text).into_iter().map(|s| s.inner).collect()
    }

    /// Recursive statistics over any JSON-shaped value.
    pub fn stats(&self, value: &Value) -> RedactionStats {
        RedactionStats::collect(value)
    }

    /// Statistics over a whole document.
    pub fn document_stats(&self, doc: &Document) -> RedactionStats {
        self.stats(&doc.to_value())
    }

    /// Check span limits in one field.
    pub fn validate(&self, text: &str) -> ValidationResult {
        let mut result = ValidationResult::valid();
        let spans = find_spans(text);

        if spans.len() > self.policy.max_redactions_per_field {
            result.add_error(format!(
                "Too many redactions. Maximum: {}",
                self.policy.max_redactions_per_field
            ));
        }

        for (idx, span) in spans.iter().enumerate() {
            let content = span.content(text);
            if content.trim().is_empty() {
                result.add_warning(format!("Redaction {idx} is empty"));
            }
            let len = span.char_len(text);
            if len > self.policy.max_span_chars {
                result.add_warning(format!("Redaction {idx} is very long ({len} chars)"));
            }
        }

        result
    }

    /// Check span limits in every string leaf, prefixing messages with the
    /// leaf's path.
    pub fn validate_value(&self, value: &Value) -> ValidationResult {
        let mut result = ValidationResult::valid();
        self.validate_walk(value, "data", &mut result);
        result
    }

    fn validate_walk(&self, value: &Value, path: &str, out: &mut ValidationResult) {
        match value {
            Value::String(s) => {
                if s.contains(crate::MARKER) {
                    out.absorb(&format!("{path}: "), self.validate(s));
                }
            }
            Value::Object(map) => {
                for (key, child) in map {
                    self.validate_walk(child, &format!("{path}.{key}"), out);
                }
            }
            Value::Array(items) => {
                for (idx, child) in items.iter().enumerate() {
                    self.validate_walk(child, &format!("{path}[{idx}]"), out);
                }
            }
            _ => {}
        }
    }
}

/// HTML-escape text with the same rules askama applies to template output.
pub fn escape_html(text: &str) -> String {
    askama_escape::escape(text, askama_escape::Html).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_matches_template_escaping() {
        assert_eq!(
            escape_html(r#"<a href="x/y">'&'</a>"#),
            "&lt;a href=&quot;x/y&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain text"), "plain text");
    }

    #[test]
    fn test_mask_hides_span_content() {
        let engine = RedactionEngine::default();
        assert_eq!(
            engine.mask("Op ||Nightfall|| brief"),
            format!("Op {} brief", "\u{2588}".repeat(9))
        );
        assert_eq!(engine.mask("no spans"), "no spans");
    }

    #[test]
    fn test_spans_are_content_ranges() {
        let engine = RedactionEngine::default();
        let text = "in ||Berlin|| and ||Oslo";
        let spans = engine.spans(text);
        assert_eq!(spans, vec![5..11]);
        assert_eq!(&text[spans[0].clone()], "Berlin");
    }

    #[test]
    fn test_apply_wraps_with_length() {
        let engine = RedactionEngine::default();
        assert_eq!(
            engine.apply("Last seen in ||Berlin||"),
            r#"Last seen in <span class="redacted" data-redaction-length="6">Berlin</span>"#
        );
    }

    #[test]
    fn test_apply_leaves_unmatched_marker() {
        let engine = RedactionEngine::default();
        assert_eq!(engine.apply("a ||b"), "a ||b");
    }

    #[test]
    fn test_apply_html_escapes_inside_and_outside() {
        let engine = RedactionEngine::default();
        let out = engine.apply_html("<b> ||x & y||");
        assert_eq!(
            out,
            r#"&lt;b&gt; <span class="redacted" data-redaction-length="5">x &amp; y</span>"#
        );
    }

    #[test]
    fn test_custom_css_class() {
        let engine = RedactionEngine::new(RedactionPolicy {
            css_class: "blackout".into(),
            ..RedactionPolicy::default()
        });
        assert!(engine.apply("||a||").contains(r#"class="blackout""#));
    }

    #[test]
    fn test_validate_limits() {
        let engine = RedactionEngine::new(RedactionPolicy {
            max_redactions_per_field: 2,
            max_span_chars: 3,
            ..RedactionPolicy::default()
        });
        let result = engine.validate("|| || ||abcd|| ||c||");
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.warnings.iter().any(|w| w.contains("is empty")));
        assert!(result.warnings.iter().any(|w| w.contains("very long (4 chars)")));
    }

    #[test]
    fn test_validate_value_prefixes_path() {
        let engine = RedactionEngine::new(RedactionPolicy {
            max_redactions_per_field: 0,
            ..RedactionPolicy::default()
        });
        let result = engine.validate_value(&json!({"target": {"name": "||x||"}}));
        assert_eq!(
            result.errors,
            vec!["data.target.name: Too many redactions. Maximum: 0"]
        );
    }
}
